use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::CipherSuite;

/// Top-level configuration (loaded from aenc.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AencConfig {
    pub crypto: CryptoConfig,
    pub keys: KeysConfig,
    pub logging: LoggingConfig,
}

impl AencConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Encryption defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Body construction for new containers: "single" or "dual" (default: dual)
    pub suite: CipherSuite,
    /// Key identifier written into public-key containers
    pub key_name: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            suite: CipherSuite::Dual,
            key_name: "rsa_key1".into(),
        }
    }
}

/// RSA key file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// PEM public key (SPKI or PKCS#1)
    pub public_key_file: Option<PathBuf>,
    /// PEM private key (PKCS#8, optionally password-protected)
    pub private_key_file: Option<PathBuf>,
    /// Modulus size for newly generated key pairs (default: 4096)
    pub rsa_key_bits: usize,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            public_key_file: None,
            private_key_file: None,
            rsa_key_bits: 4096,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive when RUST_LOG is unset (default: info)
    pub level: String,
    /// Output format: "text" or "json"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}
