use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use crate::errors::{Result, RunnerError};
use crate::plugins::options::{millis_or, require_str, Options};
use crate::plugins::wait::{WaitProbe, WaitStrategy};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Ready once `pattern` appears, literally, in the combined stdout/stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputWait {
    pub pattern: String,
    pub timeout: Duration,
}

pub fn from_options(opts: &Options) -> std::result::Result<WaitStrategy, String> {
    let pattern = require_str(opts, "match")
        .map_err(|_| "Match option is missing or invalid".to_string())?;

    Ok(WaitStrategy::Output(OutputWait {
        pattern: pattern.to_string(),
        timeout: millis_or(opts, "timeout", DEFAULT_TIMEOUT_MS)?,
    }))
}

impl OutputWait {
    pub async fn wait(&self, probe: WaitProbe) -> Result<()> {
        let Some(mut output) = probe.output else {
            return Err(RunnerError::WaitTimeout {
                command: probe.command,
                message: "Streams option is missing or invalid".to_string(),
            });
        };

        let mut matcher = StreamMatcher::new(self.pattern.as_bytes());
        let scan = async {
            while let Some(chunk) = output.recv().await {
                if matcher.push(&chunk) {
                    return;
                }
            }
            // Both streams closed without a match: only the deadline can end this.
            std::future::pending::<()>().await
        };

        let outcome = timeout(self.timeout, scan).await;
        match outcome {
            Ok(()) => {
                debug!(command = %probe.command, pattern = %self.pattern, "output matched");
                Ok(())
            }
            Err(_) => Err(RunnerError::WaitTimeout {
                command: probe.command.clone(),
                message: "Streams match timed out".to_string(),
            }),
        }
    }
}

/// Incremental literal substring search across chunk boundaries.
///
/// Only the last `pattern.len() - 1` bytes are kept between chunks, which is
/// enough for a match that straddles any number of writes.
#[derive(Debug)]
pub struct StreamMatcher {
    pattern: Vec<u8>,
    buffer: Vec<u8>,
    matched: bool,
}

impl StreamMatcher {
    pub fn new(pattern: &[u8]) -> Self {
        Self {
            pattern: pattern.to_vec(),
            buffer: Vec::new(),
            matched: false,
        }
    }

    /// Feed a chunk; returns `true` once the pattern has been seen.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        if self.matched {
            return true;
        }
        if self.pattern.is_empty() {
            self.matched = true;
            return true;
        }

        self.buffer.extend_from_slice(chunk);
        if self
            .buffer
            .windows(self.pattern.len())
            .any(|window| window == self.pattern.as_slice())
        {
            self.matched = true;
            self.buffer = Vec::new();
            return true;
        }

        let keep = self.pattern.len() - 1;
        if self.buffer.len() > keep {
            self.buffer.drain(..self.buffer.len() - keep);
        }
        false
    }
}
