//! Step runner: executes one external command with uniform banners and a
//! non-fatal failure policy.

use std::{
    ffi::OsStr,
    io,
    os::unix::process::ExitStatusExt,
    process::{ExitStatus, Stdio},
};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
};
use tracing::debug;

use crate::printer::Sink;

/// Status reported when the child cannot be started at all.
pub const SPAWN_FAILURE_CODE: i32 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub code: i32,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    fn from_status(status: ExitStatus) -> Self {
        let code = status
            .code()
            .or_else(|| status.signal().map(|sig| 128 + sig))
            .unwrap_or(1);
        Self { code }
    }
}

/// Runs `program args...`, streaming its stdout and stderr through `sink`.
///
/// A non-zero exit or a failed spawn is reported as a warning and returned
/// as an [`ExecutionResult`]; only sink I/O errors become `Err`.
pub async fn run_step<P, S>(sink: &Sink, title: &str, program: P, args: &[S]) -> Result<ExecutionResult>
where
    P: AsRef<OsStr>,
    S: AsRef<str>,
{
    let program = program.as_ref();
    sink.banner(title)?;
    sink.command(&command_line(&program.to_string_lossy(), args))?;

    let spawned = Command::new(program)
        .args(args.iter().map(|a| a.as_ref()))
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            sink.warn(&format!("Could not start {}: {}", program.to_string_lossy(), e))?;
            let result = ExecutionResult { code: SPAWN_FAILURE_CODE };
            report(sink, title, result)?;
            return Ok(result);
        }
    };

    let stdout = child.stdout.take().context("child stdout was not captured")?;
    let stderr = child.stderr.take().context("child stderr was not captured")?;
    forward_output(sink, stdout, stderr).await?;

    let status = match child.wait().await {
        Ok(status) => ExecutionResult::from_status(status),
        Err(e) => {
            sink.warn(&format!("Lost track of {}: {}", program.to_string_lossy(), e))?;
            ExecutionResult { code: 1 }
        }
    };
    debug!(title, code = status.code, "step finished");
    report(sink, title, status)?;
    Ok(status)
}

/// Copies both pipes line by line into the sink, in arrival order.
///
/// A pipe that fails to read is reported and its reader dropped, so the
/// child sees a closed pipe instead of blocking on a full one.
async fn forward_output<O, E>(sink: &Sink, stdout: O, stderr: E) -> Result<()>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = Some(BufReader::new(stdout));
    let mut err = Some(BufReader::new(stderr));
    // read_until keeps partial data in the buffer when the other branch wins,
    // so lines are never split or lost.
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();

    while out.is_some() || err.is_some() {
        tokio::select! {
            read = next_chunk(&mut out, &mut out_buf), if out.is_some() => {
                settle(sink, "stdout", read, &mut out, &mut out_buf)?;
            }
            read = next_chunk(&mut err, &mut err_buf), if err.is_some() => {
                settle(sink, "stderr", read, &mut err, &mut err_buf)?;
            }
        }
    }
    Ok(())
}

async fn next_chunk<R>(reader: &mut Option<R>, buf: &mut Vec<u8>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    match reader {
        Some(reader) => reader.read_until(b'\n', buf).await,
        None => std::future::pending().await,
    }
}

/// Emits what was read; closes the reader on EOF or error.
fn settle<R>(
    sink: &Sink,
    stream: &str,
    read: io::Result<usize>,
    reader: &mut Option<R>,
    buf: &mut Vec<u8>,
) -> Result<()> {
    match read {
        Ok(0) => *reader = None,
        Ok(_) => {}
        Err(e) => {
            *reader = None;
            flush_line(sink, buf)?;
            sink.warn(&format!("Stopped reading {} of the step: {}", stream, e))?;
            return Ok(());
        }
    }
    flush_line(sink, buf)
}

fn flush_line(sink: &Sink, buf: &mut Vec<u8>) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    let text = String::from_utf8_lossy(buf);
    sink.plain(text.trim_end_matches(['\n', '\r']))?;
    buf.clear();
    Ok(())
}

fn report(sink: &Sink, title: &str, result: ExecutionResult) -> Result<()> {
    if result.success() {
        sink.success(&format!("[ OK ] {} completed (exit code {})", title, result.code))?;
    } else {
        sink.warn(&format!(
            "[WARN] {} reported a problem (exit code {}); continuing",
            title, result.code
        ))?;
    }
    Ok(())
}

/// Shell-style rendering of a command for the log.
pub fn command_line<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(|a| a.as_ref()))
        .map(quote)
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,%+@".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
