use thiserror::Error;

pub type Result<T> = core::result::Result<T, ChatError>;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Snapshot fetch failed: {0}")]
    SnapshotFetch(#[from] reqwest::Error),

    #[error("Push connection error: {0}")]
    PushConnection(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Logging setup error: {0}")]
    LoggingSetup(String),

    #[error("Invalid group: {0}")]
    InvalidGroup(String),

    #[error("Not connected")]
    NotConnected,
}
