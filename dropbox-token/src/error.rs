use dropbox_api::DropboxApiError;
use std::fmt;
use thiserror::Error;

/// Console input the flow cannot continue without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Credentials,
    AuthorizationCode,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Credentials => write!(f, "Client ID and Secret are"),
            Field::AuthorizationCode => write!(f, "Authorization code is"),
        }
    }
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0} required")]
    MissingInput(Field),

    #[error("Dropbox API error: {0}")]
    Api(#[from] DropboxApiError),

    #[error("Token storage error: {0}")]
    TokenStorage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for FlowError {
    fn from(err: config::ConfigError) -> Self {
        FlowError::Configuration(err.to_string())
    }
}
