//! Top-level run: privilege check, session log, step table, sequencer.

use std::{fmt, io::Write};

use anyhow::Result;
use chrono::Local;
use tracing::warn;

use crate::{
    config::Config,
    locate::Locator,
    logging,
    pipeline::{standard, Gate, Pipeline, RunReport},
    printer::{Sink, Style},
    privilege,
    session::{self, Session},
};

/// An error that has already been written to the session log.
#[derive(Debug)]
pub struct Logged(pub anyhow::Error);

impl fmt::Display for Logged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl std::error::Error for Logged {}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub skip_install: bool,
    pub color: bool,
}

/// Builds the step table for this machine and configuration.
pub fn plan(cfg: &Config, locator: &Locator, skip_install: bool) -> Result<Pipeline> {
    let pm = if skip_install {
        None
    } else {
        standard::package_manager(cfg, locator)?
    };
    if pm.is_none() && !skip_install && cfg.get("PACKAGE_MANAGER").as_deref() != Some("none") {
        warn!("no supported package manager found; installation steps omitted");
    }
    standard::build(cfg, pm)
}

pub fn list_steps(sink: &Sink, pipeline: &Pipeline) -> Result<()> {
    for (i, step) in pipeline.steps().iter().enumerate() {
        sink.plain(&format!("{:>2}. [{}] {}", i + 1, step.phase, step.title))?;
        sink.line(Style::Command, &format!("      $ {}", step.command_line()))?;
    }
    Ok(())
}

/// Runs the whole evaluation. Fails only on insufficient privileges or an
/// unusable environment; step failures are reported in the returned
/// [`RunReport`] and never turn into `Err`. Errors raised after the session
/// log exists are written to it and come back wrapped in [`Logged`].
pub async fn run(
    cfg: &Config,
    opts: &RunOptions,
    euid: u32,
    locator: &Locator,
    console: Box<dyn Write + Send>,
    gate: &mut dyn Gate,
) -> Result<RunReport> {
    privilege::check(euid)?;

    let stamp = session::timestamp(&Local::now());
    let session = Session::start(&cfg.log_dir(), &cfg.log_prefix(), &stamp, console, opts.color)?;
    logging::attach(session.sink())?;

    let outcome = match plan(cfg, locator, opts.skip_install) {
        Ok(pipeline) => pipeline.run(&session, locator, gate).await,
        Err(e) => Err(e),
    };
    outcome.map_err(|e| {
        // A failing log write leaves the error for main to print.
        match session.sink().warn(&format!("error: {:#}", e)) {
            Ok(()) => anyhow::Error::new(Logged(e)),
            Err(_) => e,
        }
    })
}
