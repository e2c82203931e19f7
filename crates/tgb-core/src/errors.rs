use std::path::PathBuf;

/// Core error type for the bot client.
///
/// Adapter crates map their transport errors into this type. The public
/// `BotSession` surface never returns it: every failure inside a poll cycle
/// is logged and degraded to a `bool`/`Option`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid path: {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("http error: {0}")]
    Http(String),

    #[error("telegram api error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, Error>;
