use crate::types::pipewire::ChannelPosition;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {field} = {value} (allowed: {allowed})")]
    InvalidConfiguration {
        field: &'static str,
        value: String,
        allowed: String,
    },

    #[error("executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("permission denied while executing {0}")]
    PermissionDenied(String),

    #[error("`{command}` failed ({}): {}", exit_description(.code), .stderr.trim())]
    ProcessFailed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("node {node} has no {channel} channel")]
    ChannelNotFound {
        node: String,
        channel: ChannelPosition,
    },

    #[error("another playback or recording is still running on this controller")]
    Busy,

    #[error("failed to obtain config dir")]
    ConfigDirNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "killed by signal".to_string(),
    }
}

impl Error {
    pub(crate) fn invalid(
        field: &'static str,
        value: impl ToString,
        allowed: impl Into<String>,
    ) -> Self {
        Error::InvalidConfiguration {
            field,
            value: value.to_string(),
            allowed: allowed.into(),
        }
    }
}
