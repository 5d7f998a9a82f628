//! Line reader for files that are still being written.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Hands out complete lines only.
///
/// A trailing fragment without a newline stays buffered until the rest of the
/// line arrives; [`TailReader::take_partial`] drains it at end of input.
/// Lines rewritten with carriage returns keep only the text after the last
/// `\r`.
pub struct TailReader<R> {
    reader: R,
    pending: Vec<u8>,
}

impl<R: BufRead> TailReader<R> {
    pub fn new(reader: R) -> Self {
        TailReader {
            reader,
            pending: Vec::new(),
        }
    }

    /// Next complete line, or `None` when nothing complete is available yet
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let n = self.reader.read_until(b'\n', &mut self.pending)?;
        if n == 0 || self.pending.last() != Some(&b'\n') {
            return Ok(None);
        }
        let raw = std::mem::take(&mut self.pending);
        Ok(Some(clean_line(&raw)))
    }

    /// Buffered fragment of an unterminated last line, if any
    pub fn take_partial(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(clean_line(&raw))
    }

    pub fn has_partial(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn clean_line(raw: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(raw);
    let text: &str = &decoded;
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = text.strip_suffix('\r').unwrap_or(text);
    match text.rfind('\r') {
        Some(i) => text[i + 1..].to_string(),
        None => text.to_string(),
    }
}

/// Cooperative stop request for the follow loop
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
