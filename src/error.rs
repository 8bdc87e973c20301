use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("credentials error: {0}")]
    Credentials(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tracker error: {0}")]
    Tracker(#[from] crate::sources::FetchError),

    #[error("template error: {0}")]
    Template(String),

    #[error("state error: {0}")]
    State(String),
}

pub type Result<T> = std::result::Result<T, Error>;
