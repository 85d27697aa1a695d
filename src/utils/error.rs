use thiserror::Error;

#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("MediaWiki API error: {code}: {info}")]
    ApiError { code: String, info: String },

    #[error("Unparseable API timestamp: {0}")]
    TimestampError(String),

    #[error("Recent-changes stream error: {message}")]
    StreamError { message: String },

    #[error("No stream event for {seconds}s, watchdog expired")]
    StreamStalled { seconds: u64 },

    #[error("Proxy check via {provider} failed: {message}")]
    CheckError { provider: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, SentinelError>;
