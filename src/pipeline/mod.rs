//! Step table and sequencer.
//!
//! A [`Pipeline`] is an ordered list of [`Step`]s grouped by [`Phase`]. Running
//! it visits every step exactly once, in table order, with a [`Gate`] between
//! adjacent steps, and always finishes with the summary.

use std::fmt;

use anyhow::{bail, Result};
use tracing::debug;

use crate::{
    locate::Locator,
    runner::{self, ExecutionResult},
    session::Session,
};

pub mod gate;
pub mod standard;
pub mod summary;

pub use gate::{Gate, LineGate, NoPause};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Installing,
    CollectingIdentity,
    StabilityTesting,
    ThroughputTesting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Installing => "install",
            Phase::CollectingIdentity => "identity",
            Phase::StabilityTesting => "stability",
            Phase::ThroughputTesting => "throughput",
        };
        f.write_str(s)
    }
}

/// Sequencer states; the chain is linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    NotStarted,
    Installing,
    CollectingIdentity,
    StabilityTesting,
    ThroughputTesting,
    Summarizing,
    Done,
}

impl From<Phase> for State {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Installing => State::Installing,
            Phase::CollectingIdentity => State::CollectingIdentity,
            Phase::StabilityTesting => State::StabilityTesting,
            Phase::ThroughputTesting => State::ThroughputTesting,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub title: String,
    pub phase: Phase,
    pub program: String,
    pub args: Vec<String>,
    /// Tools that must be present; the step is skipped otherwise.
    pub requires: Vec<String>,
}

impl Step {
    pub fn builder(title: impl Into<String>, phase: Phase) -> StepBuilder {
        StepBuilder {
            title: title.into(),
            phase,
            program: String::new(),
            args: Vec::new(),
            requires: Vec::new(),
        }
    }

    pub fn command_line(&self) -> String {
        runner::command_line(&self.program, self.args.as_slice())
    }
}

pub struct StepBuilder {
    title: String,
    phase: Phase,
    program: String,
    args: Vec<String>,
    requires: Vec<String>,
}

impl StepBuilder {
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn requires(mut self, tool: impl Into<String>) -> Self {
        self.requires.push(tool.into());
        self
    }

    /// The program itself is always required.
    pub fn build(self) -> Step {
        let mut requires = vec![self.program.clone()];
        for tool in self.requires {
            if !requires.contains(&tool) {
                requires.push(tool);
            }
        }
        Step {
            title: self.title,
            phase: self.phase,
            program: self.program,
            args: self.args,
            requires,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Ran(ExecutionResult),
    Skipped { missing: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub title: String,
    pub phase: Phase,
    pub outcome: StepOutcome,
}

/// What happened, in visit order. Informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub records: Vec<StepRecord>,
    pub state: State,
}

impl RunReport {
    pub fn skipped(&self) -> impl Iterator<Item = &StepRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &StepRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Ran(res) if !res.success()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
}

#[derive(Debug, Default)]
pub struct PipelineBuilder {
    steps: Vec<Step>,
}

impl PipelineBuilder {
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Rejects empty programs and phases that go backwards.
    pub fn build(self) -> Result<Pipeline> {
        for step in &self.steps {
            if step.program.trim().is_empty() {
                bail!("step '{}' has no program", step.title);
            }
        }
        for pair in self.steps.windows(2) {
            if pair[1].phase < pair[0].phase {
                bail!(
                    "step '{}' ({}) cannot follow '{}' ({})",
                    pair[1].title,
                    pair[1].phase,
                    pair[0].title,
                    pair[0].phase
                );
            }
        }
        Ok(Pipeline { steps: self.steps })
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub async fn run(
        &self,
        session: &Session,
        locator: &Locator,
        gate: &mut dyn Gate,
    ) -> Result<RunReport> {
        let sink = session.sink();
        let total = self.steps.len();
        let mut state = State::NotStarted;
        let mut records = Vec::with_capacity(total);

        for (i, step) in self.steps.iter().enumerate() {
            let title = format!("[{}/{}] {}", i + 1, total, step.title);
            if i > 0 {
                gate.acknowledge(sink, &title)?;
            }
            let next = State::from(step.phase);
            if next != state {
                debug!(from = ?state, to = ?next, "phase change");
                state = next;
            }

            let missing: Vec<String> = step
                .requires
                .iter()
                .filter(|tool| locator.locate(tool).is_none())
                .cloned()
                .collect();

            let outcome = if missing.is_empty() {
                let program = locator
                    .locate(&step.program)
                    .unwrap_or_else(|| step.program.clone().into());
                // Step failures are never fatal: the status is only recorded.
                let result = runner::run_step(sink, &title, &program, step.args.as_slice()).await?;
                StepOutcome::Ran(result)
            } else {
                sink.banner(&title)?;
                sink.warn(&format!(
                    "[SKIP] {} not found; skipping this step",
                    missing.join(", ")
                ))?;
                StepOutcome::Skipped { missing }
            };

            records.push(StepRecord {
                title: step.title.clone(),
                phase: step.phase,
                outcome,
            });
        }

        if total > 0 {
            gate.acknowledge(sink, "Summary")?;
        }
        state = State::Summarizing;
        debug!(?state, "summarizing");
        let mut report = RunReport { records, state };
        summary::print(sink, &report, session.path())?;
        report.state = State::Done;
        Ok(report)
    }
}
