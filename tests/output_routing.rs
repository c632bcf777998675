// tests/output_routing.rs
//
// Bytes a real child writes, as seen by the parent's stdout/stderr sinks.

#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout};

use std::sync::Arc;

use command_runner::dag::ScheduledCommand;
use command_runner::engine::{ExitOutcome, RuntimeEvent};
use command_runner::exec::{supervise, ChannelObserver, LiveProcesses, ParentOutput, SupervisorContext};
use command_runner::plugins::LogStrategy;
use command_runner::types::StreamSelection;
use tokio::sync::mpsc;

struct Captured {
    stdout: String,
    stderr: String,
}

/// Supervise `argv` with a parent log of `selection`, returning what reached
/// each parent sink by the time the exit was reported.
async fn run_with_parent_log(argv: &[&str], selection: StreamSelection) -> Captured {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let (err_tx, mut err_rx) = mpsc::unbounded_channel();
    let ctx = SupervisorContext {
        observer: Arc::new(ChannelObserver::new(event_tx)),
        processes: LiveProcesses::new(),
        parent: ParentOutput::from_sinks(out_tx, err_tx),
    };
    let command = ScheduledCommand {
        name: "talker".to_string(),
        argv: argv.iter().map(|a| a.to_string()).collect(),
        working_directory: None,
        wait: None,
        log: Some(LogStrategy::Parent(selection)),
        exit_on_success: false,
        abort_on_error: true,
    };
    let supervisor = tokio::spawn(supervise(command, ctx));

    loop {
        match with_timeout(event_rx.recv()).await {
            Some(RuntimeEvent::CommandExited { outcome, .. }) => {
                assert_eq!(outcome, ExitOutcome::Success);
                break;
            }
            Some(_) => {}
            None => panic!("supervisor stopped without reporting an exit"),
        }
    }

    // No waiting here: the exit is only reported once the pumps are done.
    let mut stdout = Vec::new();
    while let Ok(chunk) = out_rx.try_recv() {
        stdout.extend(chunk);
    }
    let mut stderr = Vec::new();
    while let Ok(chunk) = err_rx.try_recv() {
        stderr.extend(chunk);
    }
    with_timeout(supervisor).await.unwrap();

    Captured {
        stdout: String::from_utf8(stdout).unwrap(),
        stderr: String::from_utf8(stderr).unwrap(),
    }
}

const TALKER: &[&str] = &["sh", "-c", "echo out; echo err >&2"];

#[tokio::test]
async fn output_log_forwards_both_streams_to_their_counterparts() {
    init_tracing();
    let captured = run_with_parent_log(TALKER, StreamSelection::Output).await;
    assert_eq!(captured.stdout, "out\n");
    assert_eq!(captured.stderr, "err\n");
}

#[tokio::test]
async fn stdout_log_forwards_only_stdout() {
    init_tracing();
    let captured = run_with_parent_log(TALKER, StreamSelection::Stdout).await;
    assert_eq!(captured.stdout, "out\n");
    assert_eq!(captured.stderr, "");
}

#[tokio::test]
async fn stderr_log_forwards_only_stderr() {
    init_tracing();
    let captured = run_with_parent_log(TALKER, StreamSelection::Stderr).await;
    assert_eq!(captured.stdout, "");
    assert_eq!(captured.stderr, "err\n");
}

#[tokio::test]
async fn output_log_delivers_a_large_burst_before_the_exit() {
    init_tracing();
    let captured = run_with_parent_log(&["seq", "1", "100000"], StreamSelection::Output).await;
    assert_eq!(captured.stdout.lines().count(), 100_000);
    assert!(captured.stdout.ends_with("99999\n100000\n"));
    assert_eq!(captured.stderr, "");
}
