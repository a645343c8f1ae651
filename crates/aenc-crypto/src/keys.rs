//! Per-container session secrets and their LV key-bundle encoding
//!
//! A bundle only exists between header construction/parsing and the first
//! body chunk; everything here is zeroized on drop and never logged.

use std::io::Cursor;

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use aenc_core::{AencError, AencResult, CipherSuite, Stage};

use crate::lv::{read_lv, write_lv};
use crate::{IV_SIZE, KEY_SIZE, NONCE_SIZE};

/// A 256-bit symmetric key (AES-256 or ChaCha20). Zeroized on drop.
#[derive(Clone)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Secrets for the single-cipher body
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SingleKeys {
    #[zeroize(skip)]
    pub key: SymmetricKey,
    pub iv: [u8; IV_SIZE],
}

/// Secrets for the dual-cipher body
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DualKeys {
    #[zeroize(skip)]
    pub stream_key: SymmetricKey,
    pub stream_nonce: [u8; NONCE_SIZE],
    #[zeroize(skip)]
    pub block_key: SymmetricKey,
    pub block_iv: [u8; IV_SIZE],
}

/// Session secrets for either body construction
#[derive(Clone)]
pub enum SessionKeys {
    Single(SingleKeys),
    Dual(DualKeys),
}

impl SessionKeys {
    /// Fresh random secrets sized for `suite`.
    pub fn generate(suite: CipherSuite) -> Self {
        match suite {
            CipherSuite::Single => SessionKeys::Single(SingleKeys {
                key: SymmetricKey::generate(),
                iv: random_array(),
            }),
            CipherSuite::Dual => SessionKeys::Dual(DualKeys {
                stream_key: SymmetricKey::generate(),
                stream_nonce: random_array(),
                block_key: SymmetricKey::generate(),
                block_iv: random_array(),
            }),
        }
    }

    pub fn suite(&self) -> CipherSuite {
        match self {
            SessionKeys::Single(_) => CipherSuite::Single,
            SessionKeys::Dual(_) => CipherSuite::Dual,
        }
    }

    /// Serialize as concatenated LV records: `key, iv` or
    /// `stream_key, stream_nonce, block_key, block_iv`.
    pub fn to_bundle(&self) -> AencResult<Zeroizing<Vec<u8>>> {
        let mut out = Zeroizing::new(Vec::with_capacity(self.bundle_len()));
        let fields: Vec<&[u8]> = match self {
            SessionKeys::Single(k) => vec![k.key.as_bytes() as &[u8], &k.iv],
            SessionKeys::Dual(k) => vec![
                k.stream_key.as_bytes() as &[u8],
                &k.stream_nonce,
                k.block_key.as_bytes(),
                &k.block_iv,
            ],
        };
        for field in fields {
            write_lv(&mut *out, field).map_err(|e| e.at(Stage::Key))?;
        }
        Ok(out)
    }

    /// Parse a decrypted key bundle for `suite`, checking every field size.
    pub fn from_bundle(suite: CipherSuite, bundle: &[u8]) -> AencResult<Self> {
        let mut cursor = Cursor::new(bundle);
        let keys = match suite {
            CipherSuite::Single => SessionKeys::Single(SingleKeys {
                key: SymmetricKey::from_bytes(read_field(&mut cursor, "key")?),
                iv: read_field(&mut cursor, "iv")?,
            }),
            CipherSuite::Dual => SessionKeys::Dual(DualKeys {
                stream_key: SymmetricKey::from_bytes(read_field(&mut cursor, "stream key")?),
                stream_nonce: read_field(&mut cursor, "stream nonce")?,
                block_key: SymmetricKey::from_bytes(read_field(&mut cursor, "block key")?),
                block_iv: read_field(&mut cursor, "block iv")?,
            }),
        };
        if (cursor.position() as usize) != bundle.len() {
            return Err(AencError::malformed(
                Stage::Key,
                "trailing bytes after key bundle",
            ));
        }
        Ok(keys)
    }

    /// Serialized bundle size: 4-byte prefix per field plus the field bytes.
    pub fn bundle_len(&self) -> usize {
        bundle_len(self.suite())
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("suite", &self.suite())
            .field("secrets", &"[REDACTED]")
            .finish()
    }
}

/// Serialized key-bundle size for `suite`
pub fn bundle_len(suite: CipherSuite) -> usize {
    match suite {
        CipherSuite::Single => 2 * 4 + KEY_SIZE + IV_SIZE,
        CipherSuite::Dual => 4 * 4 + KEY_SIZE + NONCE_SIZE + KEY_SIZE + IV_SIZE,
    }
}

fn read_field<const N: usize>(cursor: &mut Cursor<&[u8]>, name: &str) -> AencResult<[u8; N]> {
    let value = Zeroizing::new(read_lv(cursor).map_err(|e| e.at(Stage::Key))?);
    value.as_slice().try_into().map_err(|_| {
        AencError::malformed(
            Stage::Key,
            format!("{name} is {} bytes, expected {N}", value.len()),
        )
    })
}

pub(crate) fn random_array<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_differ() {
        let k1 = SymmetricKey::generate();
        let k2 = SymmetricKey::generate();
        assert_ne!(k1.as_bytes(), k2.as_bytes(), "random keys must differ");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let keys = SessionKeys::generate(CipherSuite::Dual);
        let shown = format!("{keys:?} {:?}", SymmetricKey::from_bytes([0xAB; KEY_SIZE]));
        assert!(shown.contains("REDACTED"));
        assert!(!shown.contains("171"), "key bytes must not be printed");
    }

    #[test]
    fn test_bundle_sizes() {
        // 32-byte key + 16-byte iv, each with a 4-byte prefix
        assert_eq!(bundle_len(CipherSuite::Single), 56);
        // 32 + 12 + 32 + 16 = 92 secret bytes, plus four prefixes
        assert_eq!(bundle_len(CipherSuite::Dual), 108);

        let keys = SessionKeys::generate(CipherSuite::Dual);
        assert_eq!(keys.to_bundle().unwrap().len(), 108);
    }

    #[test]
    fn test_bundle_roundtrip_dual() {
        let keys = SessionKeys::generate(CipherSuite::Dual);
        let bundle = keys.to_bundle().unwrap();
        let parsed = SessionKeys::from_bundle(CipherSuite::Dual, &bundle).unwrap();

        match (&keys, &parsed) {
            (SessionKeys::Dual(a), SessionKeys::Dual(b)) => {
                assert_eq!(a.stream_key.as_bytes(), b.stream_key.as_bytes());
                assert_eq!(a.stream_nonce, b.stream_nonce);
                assert_eq!(a.block_key.as_bytes(), b.block_key.as_bytes());
                assert_eq!(a.block_iv, b.block_iv);
            }
            _ => panic!("suite changed across bundle roundtrip"),
        }
    }

    #[test]
    fn test_bundle_wrong_suite_rejected() {
        let keys = SessionKeys::generate(CipherSuite::Single);
        let bundle = keys.to_bundle().unwrap();

        // key(32) parses, then the 16-byte iv is read where a 12-byte nonce is expected
        let err = SessionKeys::from_bundle(CipherSuite::Dual, &bundle).unwrap_err();
        assert!(matches!(err, AencError::Malformed { stage: Stage::Key, .. }));
    }

    #[test]
    fn test_bundle_trailing_bytes_rejected() {
        let keys = SessionKeys::generate(CipherSuite::Single);
        let mut bundle = keys.to_bundle().unwrap().to_vec();
        bundle.push(0);
        assert!(SessionKeys::from_bundle(CipherSuite::Single, &bundle).is_err());
    }

    #[test]
    fn test_bundle_truncated_rejected() {
        let keys = SessionKeys::generate(CipherSuite::Single);
        let bundle = keys.to_bundle().unwrap();
        let err = SessionKeys::from_bundle(CipherSuite::Single, &bundle[..30]).unwrap_err();
        assert!(matches!(
            err,
            AencError::TruncatedStream {
                stage: Stage::Key,
                ..
            }
        ));
    }
}
