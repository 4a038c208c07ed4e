use std::io;

use taskstream::exec::OutputObserver;

/// What a [`RecordingObserver`] was handed, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Stdout(String),
    Stderr(String),
}

/// An observer that:
/// - records every chunk it receives
/// - optionally starts failing after a number of deliveries, like a
///   consumer that went away.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub chunks: Vec<Chunk>,
    fail_after: Option<usize>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `n` chunks, then fail every delivery with `BrokenPipe`.
    pub fn failing_after(n: usize) -> Self {
        Self {
            chunks: Vec::new(),
            fail_after: Some(n),
        }
    }

    pub fn stdout(&self) -> Vec<&str> {
        self.chunks
            .iter()
            .filter_map(|c| match c {
                Chunk::Stdout(s) => Some(s.as_str()),
                Chunk::Stderr(_) => None,
            })
            .collect()
    }

    pub fn stderr(&self) -> Vec<&str> {
        self.chunks
            .iter()
            .filter_map(|c| match c {
                Chunk::Stderr(s) => Some(s.as_str()),
                Chunk::Stdout(_) => None,
            })
            .collect()
    }

    fn record(&mut self, chunk: Chunk) -> io::Result<()> {
        if self.fail_after.is_some_and(|n| self.chunks.len() >= n) {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.chunks.push(chunk);
        Ok(())
    }
}

impl OutputObserver for RecordingObserver {
    fn on_stdout(&mut self, chunk: &str) -> io::Result<()> {
        self.record(Chunk::Stdout(chunk.to_string()))
    }

    fn on_stderr(&mut self, chunk: &str) -> io::Result<()> {
        self.record(Chunk::Stderr(chunk.to_string()))
    }
}
