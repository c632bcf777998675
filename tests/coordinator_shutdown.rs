// tests/coordinator_shutdown.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use command_runner::dag::ScheduledCommand;
use command_runner::engine::{
    Coordinator, CoordinatorState, ExitOutcome, Failure, RuntimeEvent, ShutdownTrigger,
    TerminationSignal,
};
use command_runner::exec::{supervise, ChannelObserver, LiveProcesses, ParentOutput, SupervisorContext};
use tokio::sync::mpsc;

#[tokio::test]
async fn concurrent_triggers_run_cleanup_once() {
    init_tracing();

    let processes = LiveProcesses::new();
    let kill_rx = processes.register("server", Some(4242)).unwrap();
    let responder = tokio::spawn(async move {
        if let Ok(request) = kill_rx.await {
            let _ = request.ack.send(Ok(()));
        }
    });

    let coordinator = Coordinator::new(processes.clone());
    let (first, second) = tokio::join!(
        coordinator.trigger(ShutdownTrigger::Abort(Failure::of("db", "boom"))),
        coordinator.trigger(ShutdownTrigger::Signal(TerminationSignal::Terminate)),
    );
    responder.await.unwrap();

    assert_eq!([first, second].iter().filter(|c| c.is_some()).count(), 1);
    assert_eq!(coordinator.exit_code(), Some(1));
    assert_eq!(coordinator.kill_requests_sent(), 1);
    assert_eq!(coordinator.state(), CoordinatorState::Exiting);
    assert!(processes.is_closed());
    assert!(matches!(coordinator.first_trigger(), Some(ShutdownTrigger::Abort(_))));
}

#[tokio::test]
async fn registration_after_shutdown_is_refused() {
    let processes = LiveProcesses::new();
    let coordinator = Coordinator::new(processes.clone());
    coordinator
        .trigger(ShutdownTrigger::Exit {
            reason: "done".to_string(),
        })
        .await;

    assert!(processes.register("late", Some(1)).is_none());
    assert!(processes.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn cleanup_kills_a_supervised_process() {
    init_tracing();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (out_tx, _out_rx) = mpsc::unbounded_channel();
    let (err_tx, _err_rx) = mpsc::unbounded_channel();
    let processes = LiveProcesses::new();
    let ctx = SupervisorContext {
        observer: Arc::new(ChannelObserver::new(tx)),
        processes: processes.clone(),
        parent: ParentOutput::from_sinks(out_tx, err_tx),
    };

    let command = ScheduledCommand {
        name: "sleeper".to_string(),
        argv: vec!["sleep".to_string(), "30".to_string()],
        working_directory: None,
        wait: None,
        log: None,
        exit_on_success: false,
        abort_on_error: true,
    };
    let supervisor = tokio::spawn(supervise(command, ctx));

    let spawned = with_timeout(rx.recv()).await;
    assert!(matches!(spawned, Some(RuntimeEvent::CommandSpawned { ref command, pid: Some(_) }) if command == "sleeper"));
    assert!(matches!(with_timeout(rx.recv()).await, Some(RuntimeEvent::CommandReady { .. })));
    assert_eq!(processes.names(), vec!["sleeper".to_string()]);

    let coordinator = Coordinator::new(processes.clone()).with_grace(Duration::from_secs(2));
    let code = with_timeout(coordinator.trigger(ShutdownTrigger::Signal(
        TerminationSignal::Interrupt,
    )))
    .await;
    assert_eq!(code, Some(0));

    let exited = with_timeout(rx.recv()).await;
    assert!(
        matches!(
            exited,
            Some(RuntimeEvent::CommandExited {
                outcome: ExitOutcome::Failed(None),
                ..
            })
        ),
        "got: {exited:?}"
    );
    with_timeout(supervisor).await.unwrap();
    assert!(processes.is_empty());
}
