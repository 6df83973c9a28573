// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves `prloom/config.json` (§6) into the [`prloom_core::Config`] the
//! dispatcher loop runs with. The core crate never parses config files
//! itself (§1 Non-goals) — this is the one place in the workspace that
//! does, the way the teacher's CLI resolves flags/env before constructing
//! `RuntimeConfig`.

use std::path::Path;

use prloom_core::Config;

use crate::error::CliError;

pub fn load_config(path: &Path) -> Result<Config, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::ConfigRead {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| CliError::ConfigParse {
        path: path.display().to_string(),
        source,
    })
}
