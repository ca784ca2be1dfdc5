use thiserror::Error;

use crate::app::domain::module_id::ModuleId;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] minreq::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Invalid settings schema for {module}: {reason}")]
    Schema { module: ModuleId, reason: String },

    #[error("Unknown settings key '{key}' for {module}")]
    UnknownSettingsKey { module: ModuleId, key: String },

    #[error("Module {0} is not registered")]
    UnknownModule(ModuleId),
}

/// Convenience type alias for Results with AppError
pub type Result<T> = std::result::Result<T, AppError>;
