//! Key encapsulation: turns a recipient credential into session secrets plus
//! the header fields a reader needs to recover them.
//!
//! Public-key mode wraps a random key bundle under RSA-OAEP. Password mode
//! persists only salts and IVs/nonces and re-derives the keys with PBKDF2.

use secrecy::SecretString;

use aenc_core::{AencError, AencResult, CipherSuite, KeyMode, Stage};

use crate::kdf::derive_key;
use crate::keys::{random_array, DualKeys, SessionKeys, SingleKeys};
use crate::pubkey::{self, RsaPrivateKey, RsaPublicKey};
use crate::{IV_SIZE, NONCE_SIZE, SALT_SIZE};

/// Header fields that carry (or let a reader re-derive) the session secrets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEnvelope {
    /// `LV(key name) LV(RSA-OAEP ciphertext of the key bundle)`
    Wrapped { key_name: String, ciphertext: Vec<u8> },
    /// Salts and IVs for password-derived keys
    Derived(PasswordParams),
}

/// Non-secret password-mode parameters, in header order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordParams {
    Single {
        salt: [u8; SALT_SIZE],
        iv: [u8; IV_SIZE],
    },
    Dual {
        stream_salt: [u8; SALT_SIZE],
        stream_nonce: [u8; NONCE_SIZE],
        block_salt: [u8; SALT_SIZE],
        block_iv: [u8; IV_SIZE],
    },
}

impl KeyEnvelope {
    pub fn mode(&self) -> KeyMode {
        match self {
            KeyEnvelope::Wrapped { .. } => KeyMode::PublicKey,
            KeyEnvelope::Derived(_) => KeyMode::Password,
        }
    }

    /// Key identifier, present in public-key mode only
    pub fn key_name(&self) -> Option<&str> {
        match self {
            KeyEnvelope::Wrapped { key_name, .. } => Some(key_name),
            KeyEnvelope::Derived(_) => None,
        }
    }
}

impl PasswordParams {
    pub fn suite(&self) -> CipherSuite {
        match self {
            PasswordParams::Single { .. } => CipherSuite::Single,
            PasswordParams::Dual { .. } => CipherSuite::Dual,
        }
    }
}

/// Generate random secrets for `suite` and wrap them under `public_key`.
///
/// Nothing is written anywhere; an oversized bundle fails here, before the
/// caller has emitted a single byte.
pub fn encapsulate_asymmetric(
    suite: CipherSuite,
    public_key: &RsaPublicKey,
    key_name: &str,
) -> AencResult<(KeyEnvelope, SessionKeys)> {
    if !key_name.is_ascii() {
        return Err(AencError::Encapsulation(format!(
            "key name {key_name:?} is not ASCII"
        )));
    }

    let keys = SessionKeys::generate(suite);
    let bundle = keys.to_bundle()?;
    let ciphertext = pubkey::wrap(public_key, &bundle)?;

    tracing::debug!(
        %suite,
        key_name,
        bundle_len = bundle.len(),
        wrapped_len = ciphertext.len(),
        "wrapped session keys"
    );

    Ok((
        KeyEnvelope::Wrapped {
            key_name: key_name.to_string(),
            ciphertext,
        },
        keys,
    ))
}

/// Draw fresh salts and IVs for `suite` and derive the keys from `password`.
pub fn encapsulate_password(
    suite: CipherSuite,
    password: &SecretString,
) -> AencResult<(KeyEnvelope, SessionKeys)> {
    let params = match suite {
        CipherSuite::Single => PasswordParams::Single {
            salt: random_array(),
            iv: random_array(),
        },
        CipherSuite::Dual => PasswordParams::Dual {
            stream_salt: random_array(),
            stream_nonce: random_array(),
            block_salt: random_array(),
            block_iv: random_array(),
        },
    };
    let keys = decapsulate_password(&params, password)?;
    tracing::debug!(%suite, "derived session keys from password");
    Ok((KeyEnvelope::Derived(params), keys))
}

/// Recover the session secrets from a wrapped envelope.
pub fn decapsulate_private(
    envelope: &KeyEnvelope,
    suite: CipherSuite,
    private_key: &RsaPrivateKey,
) -> AencResult<SessionKeys> {
    let KeyEnvelope::Wrapped {
        key_name,
        ciphertext,
    } = envelope
    else {
        return Err(AencError::KeyMismatch {
            stage: Stage::Key,
            reason: "container is password-protected, got a private key".into(),
        });
    };

    let bundle = pubkey::unwrap(private_key, ciphertext)?;
    let keys = SessionKeys::from_bundle(suite, &bundle)?;
    tracing::debug!(%suite, key_name = key_name.as_str(), "unwrapped session keys");
    Ok(keys)
}

/// Re-derive the session secrets from `password` and the stored parameters.
///
/// Always succeeds for well-formed parameters; a wrong password is only
/// caught when the body fails to unpad.
pub fn decapsulate_password(
    params: &PasswordParams,
    password: &SecretString,
) -> AencResult<SessionKeys> {
    let keys = match params {
        PasswordParams::Single { salt, iv } => SessionKeys::Single(SingleKeys {
            key: derive_key(password, salt),
            iv: *iv,
        }),
        PasswordParams::Dual {
            stream_salt,
            stream_nonce,
            block_salt,
            block_iv,
        } => SessionKeys::Dual(DualKeys {
            stream_key: derive_key(password, stream_salt),
            stream_nonce: *stream_nonce,
            block_key: derive_key(password, block_salt),
            block_iv: *block_iv,
        }),
    };
    Ok(keys)
}
