use serde::Deserialize;

use crate::config::{ConfigError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    pub runtime: RuntimeSection,

    pub actor: ActorSection,

    #[serde(default)]
    pub client: ClientSection,

    #[serde(default)]
    pub workflow: WorkflowSection,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        self.runtime.validate()?;
        self.actor.validate()?;
        self.client.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    #[serde(default = "default_host")]
    pub host: String,

    pub port: u16,
}

impl RuntimeSection {
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("runtime.host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("runtime.port must not be 0".into()));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActorSection {
    /// Manifest path handed verbatim to `StartActor`; the Runtime resolves
    /// it, not this client.
    pub manifest: String,

    /// Free-form initial state forwarded to the actor as JSON bytes.
    #[serde(default = "default_initial_state")]
    pub initial_state: serde_json::Value,
}

impl ActorSection {
    pub fn validate(&self) -> Result<()> {
        if self.manifest.is_empty() {
            return Err(ConfigError::Invalid("actor.manifest must not be empty".into()));
        }
        Ok(())
    }
}

fn default_initial_state() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Generous by default: completion turns can run long.
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,

    #[serde(default = "default_channel_open_timeout_ms")]
    pub channel_open_timeout_ms: u64,

    #[serde(default = "default_restart_backoff_ms")]
    pub restart_backoff_ms: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            receive_timeout_ms: default_receive_timeout_ms(),
            channel_open_timeout_ms: default_channel_open_timeout_ms(),
            restart_backoff_ms: default_restart_backoff_ms(),
        }
    }
}

impl ClientSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60_000).contains(&self.connect_timeout_ms) {
            return Err(ConfigError::Invalid(
                "client.connect_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if !(1_000..=600_000).contains(&self.receive_timeout_ms) {
            return Err(ConfigError::Invalid(
                "client.receive_timeout_ms must be between 1000 and 600000".into(),
            ));
        }
        if !(1_000..=60_000).contains(&self.channel_open_timeout_ms) {
            return Err(ConfigError::Invalid(
                "client.channel_open_timeout_ms must be between 1000 and 60000".into(),
            ));
        }
        if !(100..=30_000).contains(&self.restart_backoff_ms) {
            return Err(ConfigError::Invalid(
                "client.restart_backoff_ms must be between 100 and 30000".into(),
            ));
        }
        Ok(())
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_receive_timeout_ms() -> u64 {
    120_000
}
fn default_channel_open_timeout_ms() -> u64 {
    10_000
}
fn default_restart_backoff_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowSection {
    /// Send `StartChat` right after the domain actor is resolved.
    #[serde(default)]
    pub auto_start: bool,
}
