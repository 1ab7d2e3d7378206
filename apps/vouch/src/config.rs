//! # Configuration
//!
//! Registry genesis, ledger allocations and server address, read from a
//! TOML file.
//!
//! ```toml
//! administrator = "admin"
//! submission_charge = 1000
//!
//! [balances]
//! alice = 5000
//! bob = 5000
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```
//!
//! `--config <path>` must point to an existing file. Without it,
//! `vouch.toml` in the working directory is used if present, otherwise
//! the built-in defaults apply.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use vouch_core::primitives::DEFAULT_SUBMISSION_CHARGE;
use vouch_core::{Balances, Genesis, Participant, VouchError};

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "vouch.toml";

/// Largest configuration file accepted.
const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VouchConfig {
    /// Administrator fixed at genesis.
    pub administrator: String,
    /// Submission charge at genesis. Ignored once the registry exists.
    pub submission_charge: u64,
    /// Topic catalog at genesis. `None` keeps the built-in catalog.
    pub topics: Option<Vec<String>>,
    /// Opening ledger balances, applied on every start.
    pub balances: BTreeMap<String, u64>,
    pub server: ServerConfig,
}

impl Default for VouchConfig {
    fn default() -> Self {
        Self {
            administrator: "admin".to_string(),
            submission_charge: DEFAULT_SUBMISSION_CHARGE,
            topics: None,
            balances: BTreeMap::new(),
            server: ServerConfig::default(),
        }
    }
}

impl VouchConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, VouchError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| VouchError::InvalidInput(format!("Invalid config: {}", e)))?;
        if config.administrator.trim().is_empty() {
            return Err(VouchError::InvalidInput(
                "Invalid config: administrator must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Load the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self, VouchError> {
        let path = match path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(VouchError::IoError(format!(
                        "Config file not found: {}",
                        explicit.display()
                    )));
                }
                explicit.to_path_buf()
            }
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                fallback.to_path_buf()
            }
        };

        let size = std::fs::metadata(&path)
            .map_err(|e| VouchError::IoError(format!("Cannot stat config: {}", e)))?
            .len();
        if size > MAX_CONFIG_SIZE {
            return Err(VouchError::InvalidInput(format!(
                "Config file too large: {} bytes (max {} bytes)",
                size, MAX_CONFIG_SIZE
            )));
        }

        let text = std::fs::read_to_string(&path)
            .map_err(|e| VouchError::IoError(format!("Cannot read config: {}", e)))?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Genesis parameters for an uninitialized registry.
    pub fn genesis(&self) -> Genesis {
        let mut genesis = Genesis::new(Participant::new(self.administrator.trim()))
            .with_charge(self.submission_charge);
        if let Some(topics) = &self.topics {
            genesis.topics = topics.clone();
        }
        genesis
    }

    /// Opening ledger built from `[balances]`.
    pub fn ledger(&self) -> Result<Balances, VouchError> {
        Balances::with_allocations(
            self.balances
                .iter()
                .map(|(who, amount)| (Participant::new(who.as_str()), *amount)),
        )
    }

    /// `host:port` to bind the HTTP server to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use vouch_core::ValueTransfer;

    #[test]
    fn empty_text_gives_defaults() {
        let config = VouchConfig::from_toml_str("").expect("parse");
        assert_eq!(config, VouchConfig::default());
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.genesis().submission_charge, DEFAULT_SUBMISSION_CHARGE);
    }

    #[test]
    fn full_config_parses() {
        let text = r#"
            administrator = "root"
            submission_charge = 7
            topics = ["rust", "news"]

            [balances]
            alice = 10
            bob = 20

            [server]
            port = 9000
        "#;
        let config = VouchConfig::from_toml_str(text).expect("parse");
        let genesis = config.genesis();
        assert_eq!(genesis.administrator, Participant::new("root"));
        assert_eq!(genesis.submission_charge, 7);
        assert_eq!(genesis.topics, vec!["rust".to_string(), "news".to_string()]);

        let ledger = config.ledger().expect("ledger");
        assert_eq!(ledger.balance(&Participant::new("alice")), 10);
        assert_eq!(ledger.balance(&Participant::new("bob")), 20);
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }

    #[test]
    fn blank_administrator_rejected() {
        let result = VouchConfig::from_toml_str("administrator = \"  \"");
        assert!(matches!(result, Err(VouchError::InvalidInput(_))));
    }

    #[test]
    fn malformed_toml_rejected() {
        let result = VouchConfig::from_toml_str("administrator = ");
        assert!(matches!(result, Err(VouchError::InvalidInput(_))));
    }

    #[test]
    fn explicit_path_must_exist() {
        let temp = tempdir().expect("temp dir");
        let missing = temp.path().join("missing.toml");
        assert!(matches!(
            VouchConfig::load(Some(&missing)),
            Err(VouchError::IoError(_))
        ));

        let present = temp.path().join("vouch.toml");
        std::fs::write(&present, "submission_charge = 3").expect("write");
        let config = VouchConfig::load(Some(&present)).expect("load");
        assert_eq!(config.submission_charge, 3);
    }
}
