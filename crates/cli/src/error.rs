// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not read {path}: {source}")]
    ConfigRead { path: String, source: std::io::Error },
    #[error("could not parse {path}: {source}")]
    ConfigParse { path: String, source: serde_json::Error },
    #[error(transparent)]
    Dispatcher(#[from] prloom_dispatcher::DispatcherError),
    #[error(transparent)]
    Logging(#[from] std::io::Error),
}
