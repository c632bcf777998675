//! `output`, `stdout` and `stderr` log kinds: route to the run's own streams.

use crate::plugins::log::LogStrategy;
use crate::plugins::options::Options;
use crate::types::StreamSelection;

pub fn output_from_options(_opts: &Options) -> Result<LogStrategy, String> {
    Ok(LogStrategy::Parent(StreamSelection::Output))
}

pub fn stdout_from_options(_opts: &Options) -> Result<LogStrategy, String> {
    Ok(LogStrategy::Parent(StreamSelection::Stdout))
}

pub fn stderr_from_options(_opts: &Options) -> Result<LogStrategy, String> {
    Ok(LogStrategy::Parent(StreamSelection::Stderr))
}
