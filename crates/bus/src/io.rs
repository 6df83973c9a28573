// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Byte-safe JSONL append/read primitives (§4.4). Grounded on the
//! teacher's WAL (`wal.rs`): a single `write` per append, and reads that
//! track byte offsets rather than character offsets so a reader never
//! regresses and never returns a malformed record (§3 invariants 7-8, §8
//! properties 1-2).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::BusError;

/// Append a single already-serialized line (without its trailing newline)
/// to `path`, creating the file and its parent directory if needed. This
/// performs exactly one `write_all` call in append mode (§4.4 write
/// contract) plus the newline — never an in-place edit.
pub fn append_line(path: &Path, line: &[u8]) -> Result<(), BusError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line);
    buf.push(b'\n');
    file.write_all(&buf)?;
    Ok(())
}

/// Read every complete line in `path` starting at byte `offset`.
///
/// Returns `(lines, new_offset)` where `new_offset` points at the first
/// byte after the last `\n` seen. A trailing partial line (no terminating
/// `\n` yet) is neither returned nor consumed — the next call re-reads it
/// once the writer completes it (§4.4 read contract, §8 property 2).
///
/// Operates purely on bytes: a line containing multi-byte UTF-8 never
/// causes the offset arithmetic to skew, because we never convert the
/// whole buffer to `&str` before finding newlines.
pub fn read_lines_from(path: &Path, offset: u64) -> Result<(Vec<Vec<u8>>, u64), BusError> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), offset)),
        Err(e) => return Err(e.into()),
    };

    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;

    let mut lines = Vec::new();
    let mut consumed: u64 = 0;
    let mut start = 0usize;
    for (i, byte) in buf.iter().enumerate() {
        if *byte == b'\n' {
            let line = &buf[start..i];
            if !line.is_empty() {
                lines.push(line.to_vec());
            }
            consumed = (i + 1) as u64;
            start = i + 1;
        }
    }

    Ok((lines, offset + consumed))
}

#[cfg(test)]
#[path = "io_tests.rs"]
mod tests;
