use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::errors::Result;
use crate::plugins::options::{get_u64, Options};
use crate::plugins::wait::{WaitProbe, WaitStrategy};

/// Smallest accepted `duration`, in milliseconds.
pub const MIN_DURATION_MS: u64 = 100;

/// Ready after a fixed delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerWait {
    pub duration: Duration,
}

pub fn from_options(opts: &Options) -> std::result::Result<WaitStrategy, String> {
    match get_u64(opts, "duration")? {
        Some(ms) if ms >= MIN_DURATION_MS => Ok(WaitStrategy::Timer(TimerWait {
            duration: Duration::from_millis(ms),
        })),
        _ => Err("Duration option is missing or invalid (must be >= 100 ms)".to_string()),
    }
}

impl TimerWait {
    pub async fn wait(&self, probe: WaitProbe) -> Result<()> {
        sleep(self.duration).await;
        debug!(command = %probe.command, duration_ms = self.duration.as_millis() as u64, "timer elapsed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_short_and_missing_durations() {
        for options in [json!({}), json!({ "duration": 99 }), json!({ "duration": 0 })] {
            assert!(from_options(options.as_object().unwrap()).is_err(), "{options}");
        }
    }

    #[test]
    fn accepts_minimum_duration() {
        let strategy = from_options(json!({ "duration": 100 }).as_object().unwrap()).unwrap();
        assert!(matches!(
            strategy,
            WaitStrategy::Timer(TimerWait { duration }) if duration == Duration::from_millis(100)
        ));
    }
}
