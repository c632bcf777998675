// src/plugins/log/mod.rs

//! Output-routing strategies.
//!
//! A log strategy is attached once, right after spawn, and describes where a
//! command's stdout/stderr bytes go for the rest of its life. Sharing the
//! run's own stdout/stderr is only ever *requested* here
//! ([`LogTarget::Parent`]); the run owns those handles and does the routing.

pub mod file;
pub mod parent;

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::errors::Result;
use crate::exec::output::OutputSink;
use crate::types::StreamSelection;

pub use file::FileLog;

/// Where a command's output should be sent.
#[derive(Debug)]
pub enum LogTarget {
    /// Forward the selected stream(s) to the run's own stdout/stderr.
    Parent(StreamSelection),
    /// Forward the selected stream(s) into a sink owned by the strategy.
    Sink {
        streams: StreamSelection,
        sink: OutputSink,
        /// Task consuming `sink`; it must finish once every sender is gone.
        writer: Option<JoinHandle<()>>,
    },
}

/// Extension point for log kinds registered at startup.
pub trait LogHandler: Send + Sync {
    fn attach(&self, command: &str) -> Result<LogTarget>;
}

/// A log descriptor resolved to its kind, options bound.
#[derive(Clone)]
pub enum LogStrategy {
    File(FileLog),
    /// `output`, `stdout` or `stderr`.
    Parent(StreamSelection),
    Custom {
        kind: String,
        handler: Arc<dyn LogHandler>,
    },
}

impl LogStrategy {
    pub fn kind(&self) -> &str {
        match self {
            LogStrategy::File(_) => "file",
            LogStrategy::Parent(StreamSelection::Output) => "output",
            LogStrategy::Parent(StreamSelection::Stdout) => "stdout",
            LogStrategy::Parent(StreamSelection::Stderr) => "stderr",
            LogStrategy::Custom { kind, .. } => kind,
        }
    }

    /// Wire the strategy for one command.
    pub async fn attach(&self, command: &str) -> Result<LogTarget> {
        match self {
            LogStrategy::File(file) => file.attach(command).await,
            LogStrategy::Parent(streams) => Ok(LogTarget::Parent(*streams)),
            LogStrategy::Custom { handler, .. } => handler.attach(command),
        }
    }
}

impl fmt::Debug for LogStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogStrategy::File(file) => f.debug_tuple("File").field(file).finish(),
            LogStrategy::Parent(streams) => f.debug_tuple("Parent").field(streams).finish(),
            LogStrategy::Custom { kind, .. } => {
                f.debug_struct("Custom").field("kind", kind).finish_non_exhaustive()
            }
        }
    }
}
