// src/plugins/wait/mod.rs

//! Readiness strategies.
//!
//! A wait runs exactly once per command and resolves exactly once: `Ok(())`
//! marks the command Ready, an error fails the command's task. Each built-in
//! races its own condition against its deadline inside a single future, so a
//! timeout and a success can never both be reported.

pub mod done;
pub mod output;
pub mod socket;
pub mod timer;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::engine::ExitOutcome;
use crate::errors::Result;

pub use done::DoneWait;
pub use output::OutputWait;
pub use socket::SocketWait;
pub use timer::TimerWait;

/// Everything a wait strategy may observe about its command.
#[derive(Debug)]
pub struct WaitProbe {
    /// Command name, for error messages and logs.
    pub command: String,
    /// Chunks from stdout and stderr, in arrival order. Only present when the
    /// strategy asked for output.
    pub output: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
    /// Becomes `Some` once the process has exited.
    pub exit: watch::Receiver<Option<ExitOutcome>>,
}

/// Boxed readiness future, as driven by the supervisor.
pub type WaitFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Extension point for wait kinds registered at startup.
pub trait WaitHandler: Send + Sync {
    /// Whether the supervisor should feed process output into the probe.
    fn needs_output(&self) -> bool {
        false
    }

    /// Resolve once the command is ready, or fail.
    fn wait(&self, probe: WaitProbe) -> WaitFuture;
}

/// A wait descriptor resolved to its kind, options bound.
#[derive(Clone)]
pub enum WaitStrategy {
    Timer(TimerWait),
    Socket(SocketWait),
    Output(OutputWait),
    Done(DoneWait),
    Custom {
        kind: String,
        handler: Arc<dyn WaitHandler>,
    },
}

impl WaitStrategy {
    pub fn kind(&self) -> &str {
        match self {
            WaitStrategy::Timer(_) => "timer",
            WaitStrategy::Socket(_) => "socket",
            WaitStrategy::Output(_) => "output",
            WaitStrategy::Done(_) => "done",
            WaitStrategy::Custom { kind, .. } => kind,
        }
    }

    pub fn needs_output(&self) -> bool {
        match self {
            WaitStrategy::Output(_) => true,
            WaitStrategy::Custom { handler, .. } => handler.needs_output(),
            _ => false,
        }
    }

    /// Start waiting. The returned future owns everything it needs.
    pub fn into_future(self, probe: WaitProbe) -> WaitFuture {
        match self {
            WaitStrategy::Timer(w) => Box::pin(async move { w.wait(probe).await }),
            WaitStrategy::Socket(w) => Box::pin(async move { w.wait(probe).await }),
            WaitStrategy::Output(w) => Box::pin(async move { w.wait(probe).await }),
            WaitStrategy::Done(w) => Box::pin(async move { w.wait(probe).await }),
            WaitStrategy::Custom { handler, .. } => handler.wait(probe),
        }
    }
}

impl fmt::Debug for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitStrategy::Timer(w) => f.debug_tuple("Timer").field(w).finish(),
            WaitStrategy::Socket(w) => f.debug_tuple("Socket").field(w).finish(),
            WaitStrategy::Output(w) => f.debug_tuple("Output").field(w).finish(),
            WaitStrategy::Done(w) => f.debug_tuple("Done").field(w).finish(),
            WaitStrategy::Custom { kind, .. } => {
                f.debug_struct("Custom").field("kind", kind).finish_non_exhaustive()
            }
        }
    }
}
