//! Client config loader (strict parsing).

pub mod schema;

use std::fs;

use thiserror::Error;

pub use schema::{ActorSection, ClientConfig, ClientSection, RuntimeSection, WorkflowSection};

/// Config failures stay separate from protocol failures; they happen before
/// any connection exists.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path} failed: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid yaml: {0}")]
    Parse(String),
    #[error("unsupported config version {0}")]
    UnsupportedVersion(u32),
    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub fn load_from_file(path: &str) -> Result<ClientConfig> {
    let s = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_string(),
        source: e,
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ClientConfig> {
    let cfg: ClientConfig =
        serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
    cfg.validate()?;
    Ok(cfg)
}
