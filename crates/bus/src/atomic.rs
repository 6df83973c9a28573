// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-temp-then-rename JSON persistence (§5 "Shared-resource policy":
//! `state.json` is rewritten atomically at the end of each tick). Grounded
//! on the teacher's checkpoint writer (`checkpoint.rs`): write `.tmp`,
//! fsync it, rename over the final path.

use std::path::Path;

use serde::Serialize;

use crate::BusError;

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), BusError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    let bytes = serde_json::to_vec_pretty(value)?;
    {
        let mut tmp = std::fs::File::create(&tmp_path)?;
        std::io::Write::write_all(&mut tmp, &bytes)?;
        tmp.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read and parse a JSON file, returning `default` if it doesn't exist yet
/// (first tick against a fresh bus root).
pub fn read_json_or_default<T>(path: &Path) -> Result<T, BusError>
where
    T: for<'de> serde::Deserialize<'de> + Default,
{
    match std::fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
