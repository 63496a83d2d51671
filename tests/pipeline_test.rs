mod common;

use std::path::Path;

use common::{read, session_in, ClosingConsole, RecordingGate};
use ramcheck::{
    locate::Locator,
    pipeline::{Phase, Pipeline, State, Step, StepOutcome},
    session::Session,
};

fn traced(title: &str, phase: Phase, trace: &Path, exit: i32) -> Step {
    let script = format!("echo '{}' >> '{}'; exit {}", title, trace.display(), exit);
    Step::builder(title, phase)
        .program("sh")
        .args(["-c".to_string(), script])
        .build()
}

#[tokio::test]
async fn every_step_runs_once_in_table_order() {
    let tmp = tempfile::tempdir().unwrap();
    let trace = tmp.path().join("trace");
    let (session, _console) = session_in(&tmp.path().join("logs"));

    let pipeline = Pipeline::builder()
        .step(traced("install", Phase::Installing, &trace, 0))
        .step(traced("identity-a", Phase::CollectingIdentity, &trace, 0))
        .step(traced("identity-b", Phase::CollectingIdentity, &trace, 0))
        .step(traced("stability", Phase::StabilityTesting, &trace, 0))
        .step(traced("throughput", Phase::ThroughputTesting, &trace, 0))
        .build()
        .unwrap();

    let mut gate = RecordingGate::default();
    let report = pipeline
        .run(&session, &Locator::from_env(), &mut gate)
        .await
        .unwrap();

    assert_eq!(
        read(&trace).lines().collect::<Vec<_>>(),
        vec!["install", "identity-a", "identity-b", "stability", "throughput"]
    );
    assert_eq!(report.records.len(), 5);
    assert_eq!(report.state, State::Done);
    // one gate between each adjacent pair, plus one before the summary
    assert_eq!(gate.seen.len(), 5);
    assert_eq!(gate.seen[0], "[2/5] identity-a");
    assert_eq!(gate.seen[4], "Summary");
}

#[tokio::test]
async fn failing_step_does_not_stop_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let trace = tmp.path().join("trace");
    let (session, console) = session_in(tmp.path());

    let pipeline = Pipeline::builder()
        .step(traced("broken", Phase::StabilityTesting, &trace, 1))
        .step(traced("after", Phase::ThroughputTesting, &trace, 0))
        .build()
        .unwrap();

    let report = pipeline
        .run(&session, &Locator::from_env(), &mut RecordingGate::default())
        .await
        .unwrap();

    assert_eq!(read(&trace).lines().collect::<Vec<_>>(), vec!["broken", "after"]);
    assert!(matches!(report.records[0].outcome, StepOutcome::Ran(r) if r.code == 1));
    assert!(matches!(report.records[1].outcome, StepOutcome::Ran(r) if r.code == 0));
    assert_eq!(report.failed().count(), 1);
    let text = console.text();
    assert!(text.contains("exit code 1"));
    assert!(text.contains("==> Summary"));
}

#[tokio::test]
async fn missing_tool_is_skipped_and_summary_still_reached() {
    let tmp = tempfile::tempdir().unwrap();
    let trace = tmp.path().join("trace");
    let (session, console) = session_in(tmp.path());

    let pipeline = Pipeline::builder()
        .step(
            Step::builder("needs ghost", Phase::CollectingIdentity)
                .program("ramcheck-ghost-tool")
                .arg("--memory")
                .build(),
        )
        .step(traced("still runs", Phase::ThroughputTesting, &trace, 0))
        .build()
        .unwrap();

    let locator = Locator::new(std::env::var_os("PATH"), Vec::new());
    let report = pipeline
        .run(&session, &locator, &mut RecordingGate::default())
        .await
        .unwrap();

    assert_eq!(
        report.records[0].outcome,
        StepOutcome::Skipped { missing: vec!["ramcheck-ghost-tool".to_string()] }
    );
    assert_eq!(report.skipped().count(), 1);
    assert_eq!(read(&trace).trim(), "still runs");
    let text = console.text();
    assert!(text.contains("[SKIP] ramcheck-ghost-tool not found"));
    assert!(text.contains("==> Summary"));
    assert!(text.contains("skipped  needs ghost (missing: ramcheck-ghost-tool)"));
}

#[tokio::test]
async fn log_file_mirrors_console_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let trace = tmp.path().join("trace");
    let (session, console) = session_in(&tmp.path().join("logs"));

    let pipeline = Pipeline::builder()
        .step(traced("one", Phase::CollectingIdentity, &trace, 0))
        .step(traced("two", Phase::StabilityTesting, &trace, 3))
        .build()
        .unwrap();
    pipeline
        .run(&session, &Locator::from_env(), &mut RecordingGate::default())
        .await
        .unwrap();

    let log = read(session.path());
    assert_eq!(log, console.text());
    let one = log.find("==> [1/2] one").unwrap();
    let two = log.find("==> [2/2] two").unwrap();
    let summary = log.find("==> Summary").unwrap();
    assert!(one < two && two < summary);
    assert!(log.ends_with(&format!("Review with: less {}\n", session.path().display())));
}

#[tokio::test]
async fn empty_pipeline_goes_straight_to_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let (session, console) = session_in(tmp.path());
    let mut gate = RecordingGate::default();

    let report = Pipeline::builder()
        .build()
        .unwrap()
        .run(&session, &Locator::from_env(), &mut gate)
        .await
        .unwrap();

    assert!(report.records.is_empty());
    assert!(gate.seen.is_empty());
    assert!(console.text().contains("==> Summary"));
}

#[tokio::test]
async fn closed_console_does_not_stop_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let trace = tmp.path().join("trace");
    let session = Session::start(
        &tmp.path().join("logs"),
        "ramcheck",
        "20240102_030405",
        Box::new(ClosingConsole { lines: 10 }),
        false,
    )
    .unwrap();

    let pipeline = Pipeline::builder()
        .step(traced("first", Phase::CollectingIdentity, &trace, 0))
        .step(traced("second", Phase::StabilityTesting, &trace, 0))
        .step(traced("third", Phase::ThroughputTesting, &trace, 0))
        .build()
        .unwrap();
    let report = pipeline
        .run(&session, &Locator::from_env(), &mut RecordingGate::default())
        .await
        .unwrap();

    assert_eq!(report.state, State::Done);
    assert_eq!(read(&trace).lines().collect::<Vec<_>>(), vec!["first", "second", "third"]);
    assert!(!session.sink().has_console());
    let log = read(session.path());
    assert!(log.contains("[ OK ] [3/3] third completed (exit code 0)"));
    assert!(log.contains("==> Summary"));
}
