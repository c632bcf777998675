use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, trace};

use crate::errors::{Result, RunnerError};
use crate::plugins::options::{get_str, get_u64, millis_or, Options};
use crate::plugins::wait::{WaitProbe, WaitStrategy};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_INTERVAL_MS: u64 = 200;

/// Ready once a TCP connection to `host:port` succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketWait {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub interval: Duration,
}

pub fn from_options(opts: &Options) -> std::result::Result<WaitStrategy, String> {
    let port = match get_u64(opts, "port")? {
        Some(port) if (1..=u64::from(u16::MAX)).contains(&port) => port as u16,
        Some(port) => return Err(format!("Port option is out of range: {port}")),
        None => return Err("Port option is missing".to_string()),
    };
    let host = match get_str(opts, "host")? {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => DEFAULT_HOST.to_string(),
    };

    Ok(WaitStrategy::Socket(SocketWait {
        host,
        port,
        timeout: millis_or(opts, "timeout", DEFAULT_TIMEOUT_MS)?,
        interval: millis_or(opts, "interval", DEFAULT_INTERVAL_MS)?,
    }))
}

impl SocketWait {
    pub async fn wait(&self, probe: WaitProbe) -> Result<()> {
        let attempts = async {
            let mut attempt: u64 = 0;
            loop {
                attempt += 1;
                match TcpStream::connect((self.host.as_str(), self.port)).await {
                    Ok(stream) => {
                        drop(stream);
                        return attempt;
                    }
                    Err(e) => {
                        trace!(
                            command = %probe.command,
                            host = %self.host,
                            port = self.port,
                            attempt,
                            error = %e,
                            "socket not available yet"
                        );
                        sleep(self.interval).await;
                    }
                }
            }
        };

        let outcome = timeout(self.timeout, attempts).await;
        match outcome {
            Ok(attempts) => {
                debug!(
                    command = %probe.command,
                    host = %self.host,
                    port = self.port,
                    attempts,
                    "socket is available"
                );
                Ok(())
            }
            Err(_) => Err(RunnerError::WaitTimeout {
                command: probe.command.clone(),
                message: "Socket connection timed out".to_string(),
            }),
        }
    }
}
