use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use crate::engine::ExitOutcome;
use crate::errors::{describe_exit_code, Result, RunnerError};
use crate::plugins::options::{get_u64, Options};
use crate::plugins::wait::{WaitProbe, WaitStrategy};

/// Smallest accepted `timeout`, in milliseconds.
pub const MIN_TIMEOUT_MS: u64 = 100;

/// Ready once the process itself has exited with code 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoneWait {
    /// No deadline when `None`.
    pub timeout: Option<Duration>,
}

pub fn from_options(opts: &Options) -> std::result::Result<WaitStrategy, String> {
    let timeout = match get_u64(opts, "timeout")? {
        // A zero timeout is the same as none at all.
        None | Some(0) => None,
        Some(ms) if ms >= MIN_TIMEOUT_MS => Some(Duration::from_millis(ms)),
        Some(_) => return Err("Timeout option is invalid (must be >= 100 ms)".to_string()),
    };
    Ok(WaitStrategy::Done(DoneWait { timeout }))
}

impl DoneWait {
    pub async fn wait(&self, probe: WaitProbe) -> Result<()> {
        let mut exit = probe.exit.clone();
        let command = probe.command.clone();

        let exited = async move {
            match exit.wait_for(Option::is_some).await {
                Ok(outcome) => *outcome,
                // Supervisor went away without reporting an exit.
                Err(_) => None,
            }
        };

        let outcome = match self.timeout {
            Some(limit) => timeout(limit, exited).await.map_err(|_| RunnerError::WaitTimeout {
                command: command.clone(),
                message: "Process run timed out".to_string(),
            })?,
            None => exited.await,
        };

        match outcome {
            Some(ExitOutcome::Success) => {
                debug!(command = %command, "process exited successfully");
                Ok(())
            }
            Some(ExitOutcome::Failed(code)) => Err(RunnerError::WaitTimeout {
                command,
                message: format!("Process exited with code {}", describe_exit_code(code)),
            }),
            None => Err(RunnerError::WaitTimeout {
                command,
                message: "Process exit was never observed".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::watch;

    fn probe(exit: watch::Receiver<Option<ExitOutcome>>) -> WaitProbe {
        WaitProbe {
            command: "job".to_string(),
            output: None,
            exit,
        }
    }

    #[test]
    fn short_timeout_is_rejected() {
        assert!(from_options(json!({ "timeout": 50 }).as_object().unwrap()).is_err());
        assert!(from_options(json!({}).as_object().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn succeeds_on_zero_exit() {
        let (tx, rx) = watch::channel(None);
        let wait = DoneWait { timeout: None };
        let handle = tokio::spawn(async move { wait.wait(probe(rx)).await });
        tx.send(Some(ExitOutcome::Success)).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn fails_on_non_zero_exit() {
        let (tx, rx) = watch::channel(None);
        tx.send(Some(ExitOutcome::Failed(Some(3)))).unwrap();
        let err = DoneWait { timeout: None }.wait(probe(rx)).await.unwrap_err();
        assert!(err.to_string().contains("code 3"), "got: {err}");
    }

    #[tokio::test]
    async fn times_out_when_process_keeps_running() {
        let (_tx, rx) = watch::channel(None);
        let wait = DoneWait {
            timeout: Some(Duration::from_millis(100)),
        };
        let err = wait.wait(probe(rx)).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "got: {err}");
    }
}
