// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;

use flatchat_run::Flags;
use flatchat_runtime::logging;

fn main() -> anyhow::Result<()> {
    let flags = Flags::parse();

    match flags.log_directive() {
        Some(directive) => logging::init_with_filter(directive),
        None => logging::init(),
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(flatchat_run::run(flags))
}
