use std::path::PathBuf;

use serde_json::Value;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::{Result, RunnerError};
use crate::plugins::log::{LogStrategy, LogTarget};
use crate::plugins::options::{get_str, require_str, Options};
use crate::types::{FileMode, StreamSelection};

/// Write the selected stream(s) verbatim to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLog {
    pub path: PathBuf,
    pub input: StreamSelection,
    pub mode: FileMode,
}

pub fn from_options(opts: &Options) -> std::result::Result<LogStrategy, String> {
    let path = require_str(opts, "name")?;

    let input = match get_str(opts, "input")? {
        None | Some("") => StreamSelection::default(),
        Some(s) => s.parse()?,
    };

    let mode = match opts.get("stream_options") {
        None | Some(Value::Null) => FileMode::default(),
        Some(Value::Object(stream_opts)) => match get_str(stream_opts, "flags")? {
            None => FileMode::default(),
            Some(flags) => flags.parse()?,
        },
        Some(_) => return Err("\"stream_options\" option must be an object".to_string()),
    };

    Ok(LogStrategy::File(FileLog {
        path: PathBuf::from(path),
        input,
        mode,
    }))
}

impl FileLog {
    /// Open the file and start a writer task fed by the returned sink.
    pub async fn attach(&self, command: &str) -> Result<LogTarget> {
        let mut open = OpenOptions::new();
        open.create(true);
        match self.mode {
            FileMode::Truncate => open.write(true).truncate(true),
            FileMode::Append => open.append(true),
        };

        let mut file = open.open(&self.path).await.map_err(|e| RunnerError::Spawn {
            command: command.to_string(),
            message: format!("cannot open log file {}: {e}", self.path.display()),
        })?;

        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let command = command.to_string();
        let path = self.path.clone();

        let writer = tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                if let Err(e) = file.write_all(&chunk).await {
                    warn!(command = %command, path = %path.display(), error = %e, "failed writing log file");
                    return;
                }
            }
            if let Err(e) = file.flush().await {
                warn!(command = %command, path = %path.display(), error = %e, "failed flushing log file");
            }
            debug!(command = %command, path = %path.display(), "log file closed");
        });

        Ok(LogTarget::Sink {
            streams: self.input,
            sink: tx,
            writer: Some(writer),
        })
    }
}
