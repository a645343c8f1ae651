use serde::{Deserialize, Serialize};
use std::fmt;

/// Body construction used inside a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherSuite {
    /// AES-256-CBC over the whole plaintext stream
    Single,
    /// Per-chunk random mask: ChaCha20(mask) + AES-256-CBC(mask XOR plaintext)
    Dual,
}

impl CipherSuite {
    pub fn as_str(&self) -> &'static str {
        match self {
            CipherSuite::Single => "single",
            CipherSuite::Dual => "dual",
        }
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the symmetric secrets of a container are established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    /// Random secrets wrapped under an RSA public key (OAEP)
    PublicKey,
    /// Secrets derived from a password and per-key salts (PBKDF2)
    Password,
}

impl fmt::Display for KeyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMode::PublicKey => f.write_str("public-key"),
            KeyMode::Password => f.write_str("password"),
        }
    }
}

/// Where in a container an error was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Magic, version, or key-envelope fields
    Header,
    /// Unwrapped or derived key material
    Key,
    /// Single-cipher ciphertext body
    Body,
    /// Dual-cipher chunk record (zero-based)
    Chunk(u64),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Header => f.write_str("header"),
            Stage::Key => f.write_str("key"),
            Stage::Body => f.write_str("body"),
            Stage::Chunk(index) => write!(f, "chunk {index}"),
        }
    }
}
