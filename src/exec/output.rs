// src/exec/output.rs

//! Fan-out of a child's stdout/stderr to every interested sink.
//!
//! Each piped stream gets one pump task that reads raw chunks and forwards a
//! copy to each registered sink. A stream nobody listens to is still drained
//! (and traced) so the child never blocks on a full pipe.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace, warn};

use crate::types::{StreamKind, StreamSelection};

/// Receiving end of a command's output: raw byte chunks in arrival order.
pub type OutputSink = mpsc::UnboundedSender<Vec<u8>>;

const CHUNK_SIZE: usize = 8 * 1024;

/// How long a finished command's output may take to reach its sinks.
pub const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Sinks per stream, assembled before the pumps start.
#[derive(Debug, Default)]
pub struct OutputRouter {
    stdout: Vec<OutputSink>,
    stderr: Vec<OutputSink>,
}

impl OutputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route the selected stream(s) into `sink`.
    pub fn add(&mut self, selection: StreamSelection, sink: OutputSink) {
        if selection.includes(StreamKind::Stdout) {
            self.stdout.push(sink.clone());
        }
        if selection.includes(StreamKind::Stderr) {
            self.stderr.push(sink);
        }
    }

    pub fn sink_count(&self, stream: StreamKind) -> usize {
        match stream {
            StreamKind::Stdout => self.stdout.len(),
            StreamKind::Stderr => self.stderr.len(),
        }
    }

    /// Start one pump task per available stream.
    ///
    /// Each pump ends at end-of-stream and drops its sinks; the returned
    /// handles finish once every byte has been handed to them.
    pub fn spawn_pumps(
        self,
        command: &str,
        stdout: Option<ChildStdout>,
        stderr: Option<ChildStderr>,
    ) -> Vec<JoinHandle<()>> {
        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = stdout {
            pumps.push(tokio::spawn(pump(
                command.to_string(),
                StreamKind::Stdout,
                stdout,
                self.stdout,
            )));
        }
        if let Some(stderr) = stderr {
            pumps.push(tokio::spawn(pump(
                command.to_string(),
                StreamKind::Stderr,
                stderr,
                self.stderr,
            )));
        }
        pumps
    }
}

/// Await output tasks (pumps, then writers) until `deadline`.
///
/// Returns `false` if some task was still running at the deadline.
pub async fn join_until(command: &str, tasks: Vec<JoinHandle<()>>, deadline: Instant) -> bool {
    for task in tasks {
        match timeout_at(deadline, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(command = %command, error = %e, "output task failed"),
            Err(_) => {
                warn!(command = %command, "output still open after grace period; remaining bytes may be lost");
                return false;
            }
        }
    }
    true
}

async fn pump<R>(command: String, stream: StreamKind, mut reader: R, mut sinks: Vec<OutputSink>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(command = %command, %stream, error = %e, "read error; stopping pump");
                break;
            }
        };

        if sinks.is_empty() {
            trace!(
                command = %command,
                %stream,
                "{}",
                String::from_utf8_lossy(&buf[..n])
            );
            continue;
        }

        // Closed sinks (a matched wait, a failed log writer) are dropped.
        sinks.retain(|sink| sink.send(buf[..n].to_vec()).is_ok());
    }
    debug!(command = %command, %stream, "stream closed");
}
