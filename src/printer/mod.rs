//! Output sink: one writer, two destinations (console and session log).
//!
//! Every component that prints receives a [`Sink`]. The console copy may be
//! colored; the log copy is always plain text.

use std::{
    fmt,
    io::{self, Write},
    sync::{Arc, Mutex, MutexGuard},
};

use owo_colors::OwoColorize;
use tracing::warn;

const RULE_WIDTH: usize = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    Banner,
    Command,
    Info,
    Success,
    Warning,
}

impl Style {
    fn paint(self, text: &str) -> String {
        match self {
            Style::Plain => text.to_string(),
            Style::Banner => format!("{}", text.bold().cyan()),
            Style::Command => format!("{}", text.magenta()),
            Style::Info => format!("{}", text.blue()),
            Style::Success => format!("{}", text.bold().green()),
            Style::Warning => format!("{}", text.bold().yellow()),
        }
    }
}

struct Inner {
    /// `None` once a console write has failed.
    console: Option<Box<dyn Write + Send>>,
    log: Option<Box<dyn Write + Send>>,
    color: bool,
    console_error: Option<io::Error>,
}

impl Inner {
    /// The log copy goes first and its errors propagate; console errors
    /// only detach the console.
    fn emit(&mut self, style: Style, text: &str, newline: bool) -> io::Result<()> {
        let end = if newline { "\n" } else { "" };
        if let Some(log) = self.log.as_mut() {
            write!(log, "{}{}", text, end)?;
            log.flush()?;
        }
        let painted = if self.color { style.paint(text) } else { text.to_string() };
        self.to_console(|console| {
            write!(console, "{}{}", painted, end)?;
            console.flush()
        });
        Ok(())
    }

    fn emit_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        if let Some(log) = self.log.as_mut() {
            log.write_all(bytes)?;
            log.flush()?;
        }
        self.to_console(|console| {
            console.write_all(bytes)?;
            console.flush()
        });
        Ok(())
    }

    fn to_console(&mut self, write: impl FnOnce(&mut Box<dyn Write + Send>) -> io::Result<()>) {
        if let Some(console) = self.console.as_mut() {
            if let Err(e) = write(console) {
                self.console = None;
                self.console_error = Some(e);
            }
        }
    }
}

/// Cloneable handle; clones share the same destinations and ordering.
#[derive(Clone)]
pub struct Sink {
    inner: Arc<Mutex<Inner>>,
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Sink")
            .field("color", &inner.color)
            .field("has_console", &inner.console.is_some())
            .field("has_log", &inner.log.is_some())
            .finish()
    }
}

impl Sink {
    pub fn new(
        console: Box<dyn Write + Send>,
        log: Option<Box<dyn Write + Send>>,
        color: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                console: Some(console),
                log,
                color,
                console_error: None,
            })),
        }
    }

    /// Console-only sink on stdout.
    pub fn stdout(color: bool) -> Self {
        Self::new(Box::new(io::stdout()), None, color)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` under the lock, then reports a lost console. The warning is
    /// emitted after unlocking since the tracing writer may be this sink.
    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> io::Result<R>) -> io::Result<R> {
        let (result, lost) = {
            let mut inner = self.lock();
            let result = f(&mut *inner);
            (result, inner.console_error.take())
        };
        if let Some(e) = lost {
            warn!(error = %e, "console output failed; continuing with the log file only");
        }
        result
    }

    /// False once the console copy has been dropped.
    pub fn has_console(&self) -> bool {
        self.lock().console.is_some()
    }

    pub fn line(&self, style: Style, text: &str) -> io::Result<()> {
        self.with_inner(|inner| inner.emit(style, text, true))
    }

    /// Writes without a trailing newline (used for prompts).
    pub fn prompt(&self, text: &str) -> io::Result<()> {
        self.with_inner(|inner| inner.emit(Style::Info, text, false))
    }

    pub fn blank(&self) -> io::Result<()> {
        self.line(Style::Plain, "")
    }

    pub fn plain(&self, text: &str) -> io::Result<()> {
        self.line(Style::Plain, text)
    }

    pub fn info(&self, text: &str) -> io::Result<()> {
        self.line(Style::Info, text)
    }

    pub fn success(&self, text: &str) -> io::Result<()> {
        self.line(Style::Success, text)
    }

    pub fn warn(&self, text: &str) -> io::Result<()> {
        self.line(Style::Warning, text)
    }

    pub fn command(&self, command_line: &str) -> io::Result<()> {
        self.line(Style::Command, &format!("$ {}", command_line))
    }

    /// Three-line banner framing `title`.
    pub fn banner(&self, title: &str) -> io::Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        self.with_inner(|inner| {
            inner.emit(Style::Plain, "", true)?;
            inner.emit(Style::Banner, &rule, true)?;
            inner.emit(Style::Banner, &format!("==> {}", title), true)?;
            inner.emit(Style::Banner, &rule, true)
        })
    }

    /// Raw bytes, written unstyled to both destinations.
    pub fn write_raw(&self, bytes: &[u8]) -> io::Result<()> {
        self.with_inner(|inner| inner.emit_raw(bytes))
    }

    /// Raw bytes for the log copy only.
    pub fn write_log(&self, bytes: &[u8]) -> io::Result<()> {
        self.with_inner(|inner| match inner.log.as_mut() {
            Some(log) => {
                log.write_all(bytes)?;
                log.flush()
            }
            None => Ok(()),
        })
    }

    pub fn writer(&self) -> SinkWriter {
        SinkWriter { sink: self.clone() }
    }
}

/// `io::Write` adapter over a [`Sink`], used by the tracing subscriber.
pub struct SinkWriter {
    sink: Sink,
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write_raw(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
