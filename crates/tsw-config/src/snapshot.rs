//! Resolved-config snapshot with an integrity digest.
//!
//! Logged once at startup so operators can tell which settings a running
//! sink actually picked up.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::resolve::ConfigSource;
use crate::sink::SinkConfig;
use crate::CONFIG_SCHEMA_VERSION;

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub schema_version: String,
    pub source: ConfigSource,
    /// SHA-256 hex digest of the canonical JSON of `config`.
    pub digest: String,
    pub config: SinkConfig,
}

impl ConfigSnapshot {
    pub fn new(config: SinkConfig, source: ConfigSource) -> Result<Self, serde_json::Error> {
        let digest = config_digest(&config)?;
        Ok(Self {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            source,
            digest,
            config,
        })
    }

    /// First 12 hex characters of the digest, for log lines.
    pub fn short_digest(&self) -> &str {
        &self.digest[..self.digest.len().min(12)]
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn config_digest(config: &SinkConfig) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(config)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
