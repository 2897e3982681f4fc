// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded capture of a child's diagnostic stream.

use parking_lot::Mutex;
use std::sync::Arc;

struct LimitedBuf {
    buf: Vec<u8>,
    cap: usize,
    total_written: u64,
}

/// Write-only sink bounded by a byte cap.
///
/// Writes past the cap are reported as successful but discarded, so a
/// chatty child cannot grow memory without bound. Cloning shares the
/// underlying buffer.
#[derive(Clone)]
pub struct LimitedWriter {
    inner: Arc<Mutex<LimitedBuf>>,
}

impl LimitedWriter {
    /// Default capacity: 64 KiB.
    pub const DEFAULT_CAP: usize = 64 * 1024;

    pub fn new(cap: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LimitedBuf {
                buf: Vec::new(),
                cap,
                total_written: 0,
            })),
        }
    }

    /// Independent copy of the captured bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.lock().buf.clone()
    }

    /// Number of bytes retained (at most the cap).
    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().buf.is_empty()
    }

    /// Total bytes accepted, including discarded ones.
    pub fn total_written(&self) -> u64 {
        self.inner.lock().total_written
    }

    /// Lossy UTF-8 rendering of the capture, for error reports.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().buf).into_owned()
    }
}

impl Default for LimitedWriter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAP)
    }
}

impl std::io::Write for LimitedWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        let mut inner = self.inner.lock();
        inner.total_written += data.len() as u64;
        let room = inner.cap.saturating_sub(inner.buf.len());
        let keep = room.min(data.len());
        if keep > 0 {
            inner.buf.extend_from_slice(&data[..keep]);
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "limited_tests.rs"]
mod tests;
