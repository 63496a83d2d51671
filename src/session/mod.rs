//! Session log: a timestamped file that receives a plain copy of everything
//! the run prints.

use std::{
    fmt::Display,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};

use crate::printer::Sink;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    sink: Sink,
}

impl Session {
    /// Creates `dir` if needed, opens the log for appending and announces it.
    pub fn start(
        dir: &Path,
        prefix: &str,
        stamp: &str,
        console: Box<dyn Write + Send>,
        color: bool,
    ) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create log directory {}", dir.display()))?;
        let path = log_path(dir, prefix, stamp);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open session log {}", path.display()))?;

        let sink = Sink::new(console, Some(Box::new(file)), color);
        sink.info(&format!("Session log: {}", path.display()))?;
        sink.info(&format!("Review it later with: less {}", path.display()))?;
        Ok(Self { path, sink })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }
}

/// `<dir>/<prefix>_<stamp>.log`
pub fn log_path(dir: &Path, prefix: &str, stamp: &str) -> PathBuf {
    dir.join(format!("{}_{}.log", prefix, stamp))
}

pub fn timestamp<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    now.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn log_path_is_deterministic() {
        let dir = Path::new("/tmp/logs");
        assert_eq!(
            log_path(dir, "ramcheck", "20240102_030405"),
            PathBuf::from("/tmp/logs/ramcheck_20240102_030405.log")
        );
        assert_eq!(log_path(dir, "ramcheck", "x"), log_path(dir, "ramcheck", "x"));
    }

    #[test]
    fn timestamp_uses_compact_format() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(timestamp(&now), "20240102_030405");
    }

    #[test]
    fn start_creates_nested_directory_and_announces_path() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b");
        let session =
            Session::start(&dir, "ramcheck", "20240102_030405", Box::new(std::io::sink()), false)
                .unwrap();

        assert!(session.path().starts_with(&dir));
        let text = fs::read_to_string(session.path()).unwrap();
        assert!(text.starts_with("Session log: "));
        assert!(text.contains("ramcheck_20240102_030405.log"));
    }

    #[test]
    fn unusable_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        let err = Session::start(&blocker.join("logs"), "p", "s", Box::new(std::io::sink()), false)
            .unwrap_err();
        assert!(err.to_string().contains("cannot create log directory"));
    }
}
