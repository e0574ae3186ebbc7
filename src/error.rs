use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("CONFIGURATION_NOT_FOUND: No launch configuration named '{0}' in the workspace. Add it to .vscode/launch.json or set debug.configuration.")]
    ConfigurationNotFound(String),

    #[error("SPAWN_FAILED: Test runner failed to start: {0}")]
    SpawnFailed(String),

    #[error("SOCKET_ERROR: Debug sync listener failed: {0}")]
    SocketError(String),

    #[error("DEBUG_START_FAILED: Debugger could not be started: {0}")]
    DebugStartFailed(String),

    #[error("NOTHING_TO_RUN: {0}")]
    NothingToRun(String),

    #[error("WATCH_FAILED: {0}")]
    WatchFailed(String),

    #[error("VALIDATION_ERROR: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
