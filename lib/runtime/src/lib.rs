// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Flatchat runtime support
//!
//! Process-wide concerns shared by the transcoder crates: logging setup, environment
//! driven configuration helpers and the [`protocols::annotated::Annotated`] stream envelope.

pub mod config;
pub mod logging;
pub mod protocols;
