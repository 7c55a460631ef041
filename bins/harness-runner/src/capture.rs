//! Output Capture - per-test stdout/stderr buffers
//!
//! Every test invocation gets its own `Capture`. Candidates write into it
//! instead of the process-wide streams, and the executor consumes it with
//! [`Capture::finish`] once the invocation is over, so nothing written for
//! one test case can show up in the next.

use std::io::{self, Write};

/// Fresh, empty stdout/stderr buffers for one invocation
#[derive(Debug, Default)]
pub struct Capture {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Text read back from a finished capture
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapturedStreams {
    pub stdout: String,
    pub stderr: String,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout(&mut self) -> StreamWriter<'_> {
        StreamWriter(&mut self.stdout)
    }

    pub fn stderr(&mut self) -> StreamWriter<'_> {
        StreamWriter(&mut self.stderr)
    }

    /// Consume the capture. Invalid UTF-8 is replaced rather than rejected.
    pub fn finish(self) -> CapturedStreams {
        CapturedStreams {
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
        }
    }
}

/// Write handle into one of the capture buffers
pub struct StreamWriter<'a>(&'a mut Vec<u8>);

impl Write for StreamWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedStreams {
    /// Trimmed stdout split into lines; empty output yields no lines
    pub fn stdout_lines(&self) -> Vec<String> {
        let trimmed = self.stdout.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        trimmed.lines().map(str::to_string).collect()
    }

    /// Trimmed stderr, or `None` when nothing but whitespace was written
    pub fn stderr_text(&self) -> Option<&str> {
        let trimmed = self.stderr.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}
