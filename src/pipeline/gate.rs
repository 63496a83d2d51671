//! Acknowledgment gate between steps.

use std::io::{self, BufRead, BufReader, Stdin};

use anyhow::{Context, Result};
use tracing::debug;

use crate::printer::Sink;

pub trait Gate {
    /// Blocks until the user lets the run move on to `next`.
    fn acknowledge(&mut self, sink: &Sink, next: &str) -> Result<()>;
}

/// Waits for one line of input. End of input counts as acknowledgment.
pub struct LineGate<R> {
    input: R,
}

impl LineGate<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R: BufRead> LineGate<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> Gate for LineGate<R> {
    fn acknowledge(&mut self, sink: &Sink, next: &str) -> Result<()> {
        sink.blank()?;
        sink.prompt(&format!("Next: {}. Press Enter to continue... ", next))?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read acknowledgment from stdin")?;
        // Terminates the prompt line in the log, which never sees the echo.
        sink.blank()?;
        debug!(next, eof = (read == 0), "acknowledged");
        Ok(())
    }
}

/// Never blocks; still records the transition.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPause;

impl Gate for NoPause {
    fn acknowledge(&mut self, sink: &Sink, next: &str) -> Result<()> {
        sink.blank()?;
        sink.info(&format!("Next: {}", next))?;
        Ok(())
    }
}
