//! aenc-crypto: streaming, length-framed hybrid file encryption
//!
//! Container layout (all lengths 4-byte signed little-endian, LV = length + value):
//! ```text
//! magic        AENCR! | AENCP! | CAENCR! | CAENCP!
//! version      0x05
//! key envelope public key: LV(key name) LV(RSA-OAEP(LV(secret)..))
//!              password:   LV(salt) LV(iv)                        (single)
//!                          LV(salt) LV(nonce) LV(salt) LV(iv)      (dual)
//! body         single: raw AES-256-CBC ciphertext, PKCS#7 on the last block
//!              dual:   { LV(ChaCha20(mask)) LV(AES-CBC(mask ^ chunk)) }* LV("")
//! ```
//!
//! Plaintext is consumed in 4096-byte chunks. The final chunk (empty when the
//! input length is a multiple of 4096) is always PKCS#7-padded, so every
//! body ends in exactly one padding block.
//!
//! The format has no MAC. Tampering outside the last block is not detected.

pub mod chunker;
pub mod container;
pub mod dual;
pub mod kdf;
pub mod kem;
pub mod keys;
pub mod lv;
pub mod padding;
pub mod pubkey;
pub mod single;

pub use container::{
    decrypt, decrypt_file, decrypt_with_progress, encrypt, encrypt_file, encrypt_with_progress,
    read_header, ContainerHeader, ContainerKind, Credential, Recipient, StreamSummary,
};
pub use kem::{KeyEnvelope, PasswordParams};
pub use keys::{DualKeys, SessionKeys, SingleKeys, SymmetricKey};
pub use pubkey::{generate_key_pair, RsaPrivateKey, RsaPublicKey};

pub use aenc_core::{AencError, AencResult, CipherSuite, KeyMode, Stage};

/// Format version written and accepted
pub const VERSION: u8 = 0x05;

/// Plaintext bytes per chunk
pub const CHUNK_SIZE: usize = 4096;

/// AES block size; PKCS#7 pads to this
pub const BLOCK_SIZE: usize = 16;

/// AES-256 and ChaCha20 key size
pub const KEY_SIZE: usize = 32;

/// AES-CBC initialization vector size
pub const IV_SIZE: usize = 16;

/// ChaCha20 (RFC 7539) nonce size
pub const NONCE_SIZE: usize = 12;

/// PBKDF2 salt size, one salt per derived key
pub const SALT_SIZE: usize = 16;

/// PBKDF2-HMAC-SHA1 iteration count
pub const PBKDF2_ITERATIONS: u32 = 60_000;
