use thiserror::Error;

pub type PlayerResult<T> = ::std::result::Result<T, PlayerError>;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Could not resolve the request: {0}")]
    Resolution(#[from] ResolveError),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Failed to start playback after {attempts} attempt(s), last error: {last}")]
    PlaybackStart {
        attempts: usize,
        last: SinkError,
    },
    #[error("There is no voice connection for this guild.")]
    NotConnected,
    #[error("The request was dropped because the player was stopped.")]
    Cancelled,
    #[error("Voice connection error: {0}")]
    Voice(#[from] SinkError),
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

pub type ResolveResult<T> = ::std::result::Result<T, ResolveError>;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No matches found for `{0}`")]
    NoMatches(String),
    #[error("The media server failed to load the track: {0}")]
    LoadFailed(String),
    #[error("Playlist is empty or contains no valid tracks")]
    EmptyPlaylist,
    #[error("Error while querying the media server: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Catalog lookup failed: {0}")]
    Catalog(String),
    #[error("Unsupported request: {0}")]
    Unsupported(String),
    #[error("Invalid resolver configuration: {0}")]
    Config(String),
}

pub type SinkResult<T> = ::std::result::Result<T, SinkError>;

#[derive(Debug, Clone, Error)]
pub enum SinkError {
    #[error("The audio sink is not connected.")]
    NotConnected,
    #[error("Failed to start stream: {0}")]
    Start(String),
    #[error("Failed to connect to voice channel: {0}")]
    Connect(String),
}

pub type StoreResult<T> = ::std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Queue store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Queue store serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Queue store is corrupt: {0}")]
    Corrupt(String),
}
