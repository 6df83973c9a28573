// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup for the `run` subcommand, grounded on the teacher's
//! `ojd::setup_logging`: a non-blocking file appender plus an env filter
//! defaulting to `info`.

use std::path::Path;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::CliError;

pub fn init(log_path: &Path) -> Result<tracing_appender::non_blocking::WorkerGuard, CliError> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("prloom.log"));
    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
