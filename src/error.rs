use thiserror::Error;

use crate::kernel::state::Source;

#[derive(Debug, Error)]
pub enum GuardianError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("{channel:?} transport error: {message}")]
    Transport { channel: Source, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("engine channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, GuardianError>;
