//! Diagnostics subscriber.
//!
//! The global subscriber writes through a swappable target. Until a session
//! is attached, events go to stderr and are kept; [`attach`] replays them
//! into the session log and routes everything after it through the session
//! sink. Attaching a new session replaces the previous one, so with several
//! sessions in one process the most recent one receives the events.

use std::{
    io::{self, Write},
    sync::{Mutex, MutexGuard},
};

use tracing_subscriber::EnvFilter;

use crate::printer::Sink;

/// Filter directives, e.g. `RAMCHECK_LOG=debug`.
pub const FILTER_ENV: &str = "RAMCHECK_LOG";

enum Target {
    Early(Vec<u8>),
    Session(Sink),
}

static TARGET: Mutex<Target> = Mutex::new(Target::Early(Vec::new()));

fn target() -> MutexGuard<'static, Target> {
    TARGET.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Installs the global subscriber once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(|| TargetWriter)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .try_init();
}

/// Routes diagnostics into `sink`, after replaying earlier events into its
/// log copy (the console already showed them on stderr).
pub fn attach(sink: &Sink) -> io::Result<()> {
    let mut current = target();
    if let Target::Early(pending) = &*current {
        sink.write_log(pending)?;
    }
    *current = Target::Session(sink.clone());
    Ok(())
}

struct TargetWriter;

impl Write for TargetWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The sink is cloned out so its lock is never taken under TARGET.
        let sink = {
            let mut current = target();
            match &mut *current {
                Target::Early(pending) => {
                    pending.extend_from_slice(buf);
                    None
                }
                Target::Session(sink) => Some(sink.clone()),
            }
        };
        match sink {
            Some(sink) => sink.write_raw(buf)?,
            None => io::stderr().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
