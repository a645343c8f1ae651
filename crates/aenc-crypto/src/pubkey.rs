//! RSA key handling: generation, PEM import/export, OAEP wrap/unwrap
//!
//! OAEP uses SHA-1 for both the label hash and MGF1, giving a plaintext
//! capacity of `k - 42` bytes for a `k`-byte modulus.

use std::path::Path;

use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::Oaep;
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

pub use rsa::{RsaPrivateKey, RsaPublicKey};

use aenc_core::config::KeysConfig;
use aenc_core::{AencError, AencResult, Stage};

/// SHA-1 digest length, used twice in the OAEP overhead
const OAEP_HASH_LEN: usize = 20;

/// Generate a new RSA key pair with a `bits`-bit modulus.
pub fn generate_key_pair(bits: usize) -> AencResult<RsaPrivateKey> {
    tracing::debug!(bits, "generating RSA key pair");
    RsaPrivateKey::new(&mut rand::thread_rng(), bits)
        .map_err(|e| AencError::Key(format!("RSA key generation failed: {e}")))
}

/// Largest plaintext OAEP-SHA1 can wrap under `key`.
pub fn oaep_capacity(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(2 * OAEP_HASH_LEN + 2)
}

/// Encrypt `plaintext` under `key` with RSA-OAEP-SHA1.
///
/// Fails with `Encapsulation` before touching the RNG if the plaintext does
/// not fit the modulus.
pub fn wrap(key: &RsaPublicKey, plaintext: &[u8]) -> AencResult<Vec<u8>> {
    let capacity = oaep_capacity(key);
    if plaintext.len() > capacity {
        return Err(AencError::Encapsulation(format!(
            "{}-byte key bundle exceeds OAEP capacity of {capacity} bytes for a {}-bit key",
            plaintext.len(),
            key.size() * 8
        )));
    }
    key.encrypt(&mut rand::thread_rng(), Oaep::new::<Sha1>(), plaintext)
        .map_err(|e| AencError::Encapsulation(format!("RSA-OAEP encryption failed: {e}")))
}

/// Decrypt an RSA-OAEP-SHA1 ciphertext. Any failure means the wrong key.
pub fn unwrap(key: &RsaPrivateKey, ciphertext: &[u8]) -> AencResult<Zeroizing<Vec<u8>>> {
    key.decrypt(Oaep::new::<Sha1>(), ciphertext)
        .map(Zeroizing::new)
        .map_err(|e| AencError::KeyMismatch {
            stage: Stage::Key,
            reason: format!("RSA-OAEP decryption failed: {e}"),
        })
}

/// Parse a public key from SPKI (`PUBLIC KEY`) or PKCS#1 (`RSA PUBLIC KEY`) PEM.
pub fn public_key_from_pem(pem: &str) -> AencResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|spki_err| {
            RsaPublicKey::from_pkcs1_pem(pem).map_err(|_| {
                AencError::Key(format!("cannot parse RSA public key PEM: {spki_err}"))
            })
        })
}

/// Parse a private key from PKCS#8 PEM, encrypted when `password` is given.
///
/// Unencrypted PKCS#1 (`RSA PRIVATE KEY`) is accepted as a fallback.
pub fn private_key_from_pem(pem: &str, password: Option<&SecretString>) -> AencResult<RsaPrivateKey> {
    match password {
        Some(pw) => RsaPrivateKey::from_pkcs8_encrypted_pem(pem, pw.expose_secret().as_bytes())
            .map_err(|e| AencError::Key(format!("cannot decrypt private key PEM: {e}"))),
        None => RsaPrivateKey::from_pkcs8_pem(pem).or_else(|pkcs8_err| {
            RsaPrivateKey::from_pkcs1_pem(pem).map_err(|_| {
                AencError::Key(format!("cannot parse RSA private key PEM: {pkcs8_err}"))
            })
        }),
    }
}

/// SPKI `PUBLIC KEY` PEM.
pub fn public_key_to_pem(key: &RsaPublicKey) -> AencResult<String> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| AencError::Key(format!("public key PEM encoding failed: {e}")))
}

/// PKCS#8 PEM, `ENCRYPTED PRIVATE KEY` when `password` is given.
pub fn private_key_to_pem(
    key: &RsaPrivateKey,
    password: Option<&SecretString>,
) -> AencResult<Zeroizing<String>> {
    let pem = match password {
        Some(pw) => key.to_pkcs8_encrypted_pem(
            &mut rand::thread_rng(),
            pw.expose_secret().as_bytes(),
            LineEnding::LF,
        ),
        None => key.to_pkcs8_pem(LineEnding::LF),
    };
    pem.map_err(|e| AencError::Key(format!("private key PEM encoding failed: {e}")))
}

pub fn load_public_key(path: &Path) -> AencResult<RsaPublicKey> {
    let pem = read_pem(path)?;
    public_key_from_pem(&pem)
}

pub fn load_private_key(path: &Path, password: Option<&SecretString>) -> AencResult<RsaPrivateKey> {
    let pem = Zeroizing::new(read_pem(path)?);
    private_key_from_pem(&pem, password)
}

/// Load the public key named by `keys.public_key_file`.
pub fn load_configured_public_key(keys: &KeysConfig) -> AencResult<RsaPublicKey> {
    let path = keys
        .public_key_file
        .as_deref()
        .ok_or_else(|| AencError::Config("keys.public_key_file is not set".into()))?;
    load_public_key(path)
}

/// Load the private key named by `keys.private_key_file`.
pub fn load_configured_private_key(
    keys: &KeysConfig,
    password: Option<&SecretString>,
) -> AencResult<RsaPrivateKey> {
    let path = keys
        .private_key_file
        .as_deref()
        .ok_or_else(|| AencError::Config("keys.private_key_file is not set".into()))?;
    load_private_key(path, password)
}

/// SHA-256 of the public key's SPKI DER, lower-case hex.
pub fn fingerprint(key: &RsaPublicKey) -> AencResult<String> {
    let der = key
        .to_public_key_der()
        .map_err(|e| AencError::Key(format!("public key DER encoding failed: {e}")))?;
    Ok(hex::encode(&Sha256::digest(der.as_bytes())))
}

fn read_pem(path: &Path) -> AencResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| AencError::Key(format!("reading key file {}: {e}", path.display())))
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
