use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// One of the two output streams of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// Which stream(s) of a command a log target captures.
///
/// - `Output`: stdout and stderr combined (default).
/// - `Stdout` / `Stderr`: only that one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSelection {
    Output,
    Stdout,
    Stderr,
}

impl Default for StreamSelection {
    fn default() -> Self {
        StreamSelection::Output
    }
}

impl StreamSelection {
    /// Whether this selection captures the given stream.
    pub fn includes(self, stream: StreamKind) -> bool {
        match self {
            StreamSelection::Output => true,
            StreamSelection::Stdout => stream == StreamKind::Stdout,
            StreamSelection::Stderr => stream == StreamKind::Stderr,
        }
    }
}

impl FromStr for StreamSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "output" => Ok(StreamSelection::Output),
            "stdout" => Ok(StreamSelection::Stdout),
            "stderr" => Ok(StreamSelection::Stderr),
            other => Err(format!(
                "invalid input: {other} (expected \"output\", \"stdout\" or \"stderr\")"
            )),
        }
    }
}

/// How a log file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Create or truncate (`flags = "w"`).
    Truncate,
    /// Create or append (`flags = "a"`).
    Append,
}

impl Default for FileMode {
    fn default() -> Self {
        FileMode::Truncate
    }
}

impl FromStr for FileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "w" => Ok(FileMode::Truncate),
            "a" => Ok(FileMode::Append),
            other => Err(format!(
                "invalid stream_options.flags: {other} (expected \"w\" or \"a\")"
            )),
        }
    }
}
