#![allow(dead_code)]

use std::{
    fs,
    io::{self, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use ramcheck::{pipeline::Gate, printer::Sink, session::Session};

/// Console stand-in that keeps everything written to it.
#[derive(Clone, Default)]
pub struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Console that takes `lines` flushed lines, then fails like a closed pipe.
pub struct ClosingConsole {
    pub lines: usize,
}

impl Write for ClosingConsole {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.lines == 0 {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lines = self.lines.saturating_sub(1);
        Ok(())
    }
}

/// Gate that never blocks and remembers what it was asked about.
#[derive(Default)]
pub struct RecordingGate {
    pub seen: Vec<String>,
}

impl Gate for RecordingGate {
    fn acknowledge(&mut self, _sink: &Sink, next: &str) -> Result<()> {
        self.seen.push(next.to_string());
        Ok(())
    }
}

pub fn session_in(dir: &Path) -> (Session, Buffer) {
    let console = Buffer::default();
    let session = Session::start(dir, "ramcheck", "20240102_030405", Box::new(console.clone()), false)
        .expect("session starts");
    (session, console)
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("log readable")
}
