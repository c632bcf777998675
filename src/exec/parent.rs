// src/exec/parent.rs

//! The run's own stdout/stderr, shared by every command that asked for them.

use tokio::io::{self, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::exec::output::{join_until, OutputRouter, OutputSink};
use crate::types::StreamSelection;

/// Sinks feeding one writer task per parent stream.
///
/// Chunks from different commands are interleaved in arrival order; there is
/// no ordering across commands.
#[derive(Debug, Clone)]
pub struct ParentOutput {
    stdout: OutputSink,
    stderr: OutputSink,
}

/// The writer tasks behind a [`ParentOutput`].
///
/// They finish once every clone of the `ParentOutput` (and every router sink
/// taken from it) has been dropped and the remaining bytes are flushed.
#[derive(Debug)]
pub struct ParentWriters {
    tasks: Vec<JoinHandle<()>>,
}

impl ParentWriters {
    /// Wait for both writers, giving up at `deadline`.
    pub async fn finish(self, deadline: Instant) -> bool {
        join_until("<parent>", self.tasks, deadline).await
    }
}

impl ParentOutput {
    /// Start writer tasks for the process's real stdout and stderr.
    pub fn spawn() -> (Self, ParentWriters) {
        let (stdout, out_task) = spawn_writer("stdout", io::stdout());
        let (stderr, err_task) = spawn_writer("stderr", io::stderr());
        (
            Self { stdout, stderr },
            ParentWriters {
                tasks: vec![out_task, err_task],
            },
        )
    }

    /// Build from arbitrary sinks (used by tests to capture output).
    pub fn from_sinks(stdout: OutputSink, stderr: OutputSink) -> Self {
        Self { stdout, stderr }
    }

    /// Register the parent streams requested by `selection` on `router`.
    ///
    /// A command's stdout goes to the parent's stdout and its stderr to the
    /// parent's stderr.
    pub fn route(&self, selection: StreamSelection, router: &mut OutputRouter) {
        match selection {
            StreamSelection::Output => {
                router.add(StreamSelection::Stdout, self.stdout.clone());
                router.add(StreamSelection::Stderr, self.stderr.clone());
            }
            StreamSelection::Stdout => router.add(StreamSelection::Stdout, self.stdout.clone()),
            StreamSelection::Stderr => router.add(StreamSelection::Stderr, self.stderr.clone()),
        }
    }
}

fn spawn_writer<W>(label: &'static str, mut writer: W) -> (OutputSink, JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let task = tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            if writer.write_all(&chunk).await.is_err() || writer.flush().await.is_err() {
                debug!(stream = label, "parent stream closed; dropping further output");
                return;
            }
        }
        debug!(stream = label, "parent writer finished");
    });
    (tx, task)
}
