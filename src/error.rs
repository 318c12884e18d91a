use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExifToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Failed to start exiftool at '{}': {source}", executable.display())]
    SpawnFailed {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {}. command={command}", path.display())]
    FileNotFound { path: PathBuf, command: String },

    #[error("ExifTool error: {message}. command={command}")]
    ExifTool { message: String, command: String },

    #[error("Argument contains a line break and cannot be sent to exiftool: {arg:?}")]
    InvalidArgument { arg: String },

    #[error("Process terminated unexpectedly. command={command}")]
    ProcessTerminated { command: String },

    #[error("Operation timed out after {timeout:?}. command={command}")]
    Timeout { command: String, timeout: Duration },

    #[error("exiftool crashed {restarts} times within a minute, not restarting")]
    RestartLimit { restarts: usize },

    #[error("ExifTool has been ended")]
    Ended,

    #[error("Expected different format from exiftool. path={path}, command={command}")]
    UnexpectedFormat { path: String, command: String },

    #[error("Tag not found. path={}, tag={tag}", path.display())]
    TagNotFound { path: PathBuf, tag: String },

    #[error("Failed to deserialize tag '{tag}' of {}: {source}", path.display())]
    TagDeserialization {
        path: PathBuf,
        tag: String,
        source: serde_json::Error,
    },

    #[error("Deserialization error at path '{path}': {source}")]
    Deserialization {
        path: String,
        source: serde_json::Error,
    },
}

impl From<serde_path_to_error::Error<serde_json::Error>> for ExifToolError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        ExifToolError::Deserialization {
            path: err.path().to_string(),
            source: err.into_inner(),
        }
    }
}
