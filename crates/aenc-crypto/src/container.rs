//! Container writer/reader: magic, version, key envelope, then the body
//!
//! ```text
//! AENCR!  | 0x05 | LV(key name) LV(wrapped bundle)          | single body
//! AENCP!  | 0x05 | LV(salt) LV(iv)                           | single body
//! CAENCR! | 0x05 | LV(key name) LV(wrapped bundle)          | dual body
//! CAENCP! | 0x05 | LV(salt) LV(nonce) LV(salt) LV(iv)        | dual body
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use secrecy::SecretString;

use aenc_core::{AencError, AencResult, CipherSuite, KeyMode, Stage};

use crate::kem::{self, KeyEnvelope, PasswordParams};
use crate::keys::SessionKeys;
use crate::lv::{read_lv, read_up_to, write_lv};
use crate::pubkey::{RsaPrivateKey, RsaPublicKey};
use crate::{dual, single, VERSION};

/// Suite and key mode, as encoded by the magic tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerKind {
    pub suite: CipherSuite,
    pub mode: KeyMode,
}

impl ContainerKind {
    pub fn new(suite: CipherSuite, mode: KeyMode) -> Self {
        Self { suite, mode }
    }

    pub fn magic(&self) -> &'static [u8] {
        match (self.suite, self.mode) {
            (CipherSuite::Single, KeyMode::PublicKey) => b"AENCR!",
            (CipherSuite::Single, KeyMode::Password) => b"AENCP!",
            (CipherSuite::Dual, KeyMode::PublicKey) => b"CAENCR!",
            (CipherSuite::Dual, KeyMode::Password) => b"CAENCP!",
        }
    }

    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        let kind = match magic {
            b"AENCR!" => Self::new(CipherSuite::Single, KeyMode::PublicKey),
            b"AENCP!" => Self::new(CipherSuite::Single, KeyMode::Password),
            b"CAENCR!" => Self::new(CipherSuite::Dual, KeyMode::PublicKey),
            b"CAENCP!" => Self::new(CipherSuite::Dual, KeyMode::Password),
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.magic()))
    }
}

/// Everything before the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub suite: CipherSuite,
    pub version: u8,
    pub envelope: KeyEnvelope,
}

impl ContainerHeader {
    pub fn kind(&self) -> ContainerKind {
        ContainerKind::new(self.suite, self.envelope.mode())
    }
}

/// Who a new container is encrypted for
#[derive(Clone, Copy)]
pub enum Recipient<'a> {
    PublicKey {
        key: &'a RsaPublicKey,
        key_name: &'a str,
    },
    Password(&'a SecretString),
}

/// What opens an existing container
#[derive(Clone, Copy)]
pub enum Credential<'a> {
    PrivateKey(&'a RsaPrivateKey),
    Password(&'a SecretString),
}

/// Totals for one encryption or decryption call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub plaintext_bytes: u64,
    /// Chunks processed, including the final padded one
    pub chunks: u64,
}

pub fn write_header<W: Write + ?Sized>(writer: &mut W, header: &ContainerHeader) -> AencResult<()> {
    writer.write_all(header.kind().magic())?;
    writer.write_all(&[header.version])?;

    match &header.envelope {
        KeyEnvelope::Wrapped {
            key_name,
            ciphertext,
        } => {
            header_lv(writer, key_name.as_bytes())?;
            header_lv(writer, ciphertext)?;
        }
        KeyEnvelope::Derived(params) => {
            if params.suite() != header.suite {
                return Err(AencError::Encapsulation(format!(
                    "{} password parameters in a {} container",
                    params.suite(),
                    header.suite
                )));
            }
            match params {
                PasswordParams::Single { salt, iv } => {
                    header_lv(writer, salt)?;
                    header_lv(writer, iv)?;
                }
                PasswordParams::Dual {
                    stream_salt,
                    stream_nonce,
                    block_salt,
                    block_iv,
                } => {
                    header_lv(writer, stream_salt)?;
                    header_lv(writer, stream_nonce)?;
                    header_lv(writer, block_salt)?;
                    header_lv(writer, block_iv)?;
                }
            }
        }
    }
    Ok(())
}

fn header_lv<W: Write + ?Sized>(writer: &mut W, value: &[u8]) -> AencResult<()> {
    write_lv(writer, value).map_err(|e| e.at(Stage::Header))
}

/// Parse magic, version and key envelope, leaving `reader` at the body.
///
/// Needs no credentials, so the key name can be inspected before choosing a
/// private key.
pub fn read_header<R: Read + ?Sized>(reader: &mut R) -> AencResult<ContainerHeader> {
    let mut magic = [0u8; 7];
    read_header_bytes(reader, &mut magic[..6])?;
    let magic_len = if magic.starts_with(b"CAENC") {
        read_header_bytes(reader, &mut magic[6..])?;
        7
    } else {
        6
    };
    let kind = ContainerKind::from_magic(&magic[..magic_len]).ok_or_else(|| {
        AencError::unsupported(format!(
            "unknown magic {:?}",
            String::from_utf8_lossy(&magic[..magic_len])
        ))
    })?;

    let mut version = [0u8; 1];
    read_header_bytes(reader, &mut version)?;
    if version[0] != VERSION {
        return Err(AencError::unsupported(format!(
            "version {} (expected {VERSION})",
            version[0]
        )));
    }

    let envelope = match kind.mode {
        KeyMode::PublicKey => {
            let name = read_field(reader)?;
            let key_name = String::from_utf8(name)
                .map_err(|_| AencError::malformed(Stage::Header, "key name is not UTF-8"))?;
            let ciphertext = read_field(reader)?;
            KeyEnvelope::Wrapped {
                key_name,
                ciphertext,
            }
        }
        KeyMode::Password => KeyEnvelope::Derived(match kind.suite {
            CipherSuite::Single => PasswordParams::Single {
                salt: read_array(reader, "salt")?,
                iv: read_array(reader, "iv")?,
            },
            CipherSuite::Dual => PasswordParams::Dual {
                stream_salt: read_array(reader, "stream salt")?,
                stream_nonce: read_array(reader, "stream nonce")?,
                block_salt: read_array(reader, "block salt")?,
                block_iv: read_array(reader, "block iv")?,
            },
        }),
    };

    tracing::debug!(%kind, key_name = envelope.key_name(), "read container header");
    Ok(ContainerHeader {
        suite: kind.suite,
        version: version[0],
        envelope,
    })
}

fn read_header_bytes<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> AencResult<()> {
    let got = read_up_to(reader, buf)?;
    if got < buf.len() {
        return Err(AencError::TruncatedStream {
            stage: Stage::Header,
            declared: buf.len(),
            available: got,
        });
    }
    Ok(())
}

fn read_field<R: Read + ?Sized>(reader: &mut R) -> AencResult<Vec<u8>> {
    read_lv(reader).map_err(|e| e.at(Stage::Header))
}

fn read_array<R: Read + ?Sized, const N: usize>(
    reader: &mut R,
    name: &str,
) -> AencResult<[u8; N]> {
    let value = read_field(reader)?;
    value.as_slice().try_into().map_err(|_| {
        AencError::malformed(
            Stage::Header,
            format!("{name} is {} bytes, expected {N}", value.len()),
        )
    })
}

/// Encrypt `reader` into a complete container on `writer`.
pub fn encrypt<R: Read, W: Write>(
    reader: R,
    writer: W,
    suite: CipherSuite,
    recipient: Recipient<'_>,
) -> AencResult<StreamSummary> {
    encrypt_with_progress(reader, writer, suite, recipient, |_| {})
}

/// [`encrypt`] with a callback receiving the plaintext bytes of each chunk.
///
/// Key encapsulation happens before the first byte is written, so an
/// encapsulation failure leaves `writer` untouched.
pub fn encrypt_with_progress<R: Read, W: Write>(
    reader: R,
    mut writer: W,
    suite: CipherSuite,
    recipient: Recipient<'_>,
    mut progress: impl FnMut(usize),
) -> AencResult<StreamSummary> {
    let (envelope, keys) = match recipient {
        Recipient::PublicKey { key, key_name } => kem::encapsulate_asymmetric(suite, key, key_name)?,
        Recipient::Password(password) => kem::encapsulate_password(suite, password)?,
    };
    let header = ContainerHeader {
        suite,
        version: VERSION,
        envelope,
    };
    write_header(&mut writer, &header)?;

    let summary = match &keys {
        SessionKeys::Single(k) => single::encrypt_body(reader, &mut writer, k, &mut progress)?,
        SessionKeys::Dual(k) => dual::encrypt_body(reader, &mut writer, k, &mut progress)?,
    };
    writer.flush()?;

    tracing::debug!(
        kind = %header.kind(),
        bytes = summary.plaintext_bytes,
        chunks = summary.chunks,
        "encrypted container"
    );
    Ok(summary)
}

/// Decrypt a complete container from `reader` onto `writer`.
pub fn decrypt<R: Read, W: Write>(
    reader: R,
    writer: W,
    credential: Credential<'_>,
) -> AencResult<StreamSummary> {
    decrypt_with_progress(reader, writer, credential, |_| {})
}

/// [`decrypt`] with a callback receiving the container bytes of each body
/// chunk consumed.
pub fn decrypt_with_progress<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    credential: Credential<'_>,
    mut progress: impl FnMut(usize),
) -> AencResult<StreamSummary> {
    let header = read_header(&mut reader)?;

    let keys = match (credential, &header.envelope) {
        (Credential::PrivateKey(key), envelope) => {
            kem::decapsulate_private(envelope, header.suite, key)?
        }
        (Credential::Password(password), KeyEnvelope::Derived(params)) => {
            kem::decapsulate_password(params, password)?
        }
        (Credential::Password(_), KeyEnvelope::Wrapped { key_name, .. }) => {
            return Err(AencError::KeyMismatch {
                stage: Stage::Key,
                reason: format!("container is wrapped for key {key_name:?}, got a password"),
            });
        }
    };

    let summary = match &keys {
        SessionKeys::Single(k) => single::decrypt_body(&mut reader, &mut writer, k, &mut progress)?,
        SessionKeys::Dual(k) => dual::decrypt_body(&mut reader, &mut writer, k, &mut progress)?,
    };
    writer.flush()?;

    tracing::debug!(
        kind = %header.kind(),
        bytes = summary.plaintext_bytes,
        chunks = summary.chunks,
        "decrypted container"
    );
    Ok(summary)
}

/// Encrypt the file at `input` into a new container file at `output`.
///
/// A partially written `output` is removed on failure.
pub fn encrypt_file(
    input: &Path,
    output: &Path,
    suite: CipherSuite,
    recipient: Recipient<'_>,
) -> AencResult<StreamSummary> {
    let reader = BufReader::new(File::open(input)?);
    with_output_file(output, |writer| encrypt(reader, writer, suite, recipient))
}

/// Decrypt the container file at `input` into `output`.
///
/// A partially written `output` is removed on failure, so a wrong key
/// never leaves garbage plaintext behind.
pub fn decrypt_file(
    input: &Path,
    output: &Path,
    credential: Credential<'_>,
) -> AencResult<StreamSummary> {
    let reader = BufReader::new(File::open(input)?);
    with_output_file(output, |writer| decrypt(reader, writer, credential))
}

fn with_output_file<F>(output: &Path, f: F) -> AencResult<StreamSummary>
where
    F: FnOnce(&mut BufWriter<File>) -> AencResult<StreamSummary>,
{
    let mut writer = BufWriter::new(File::create(output)?);
    let result = f(&mut writer).and_then(|summary| {
        writer.flush()?;
        Ok(summary)
    });
    drop(writer);

    if result.is_err() {
        if let Err(e) = std::fs::remove_file(output) {
            tracing::warn!("failed to remove partial output {}: {e}", output.display());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn password() -> SecretString {
        SecretString::from("hunter2")
    }

    #[test]
    fn test_magic_roundtrip() {
        for suite in [CipherSuite::Single, CipherSuite::Dual] {
            for mode in [KeyMode::PublicKey, KeyMode::Password] {
                let kind = ContainerKind::new(suite, mode);
                assert_eq!(ContainerKind::from_magic(kind.magic()), Some(kind));
            }
        }
        assert_eq!(ContainerKind::new(CipherSuite::Dual, KeyMode::Password).to_string(), "CAENCP!");
        assert_eq!(ContainerKind::from_magic(b"AENCX!"), None);
    }

    #[test]
    fn test_password_header_layout() {
        let header = ContainerHeader {
            suite: CipherSuite::Single,
            version: VERSION,
            envelope: KeyEnvelope::Derived(PasswordParams::Single {
                salt: [1; 16],
                iv: [2; 16],
            }),
        };
        let mut out = Vec::new();
        write_header(&mut out, &header).unwrap();

        let mut expected = b"AENCP!\x05".to_vec();
        expected.extend_from_slice(&[16, 0, 0, 0]);
        expected.extend_from_slice(&[1; 16]);
        expected.extend_from_slice(&[16, 0, 0, 0]);
        expected.extend_from_slice(&[2; 16]);
        assert_eq!(out, expected);

        assert_eq!(read_header(&mut Cursor::new(out)).unwrap(), header);
    }

    #[test]
    fn test_wrapped_header_roundtrip() {
        let header = ContainerHeader {
            suite: CipherSuite::Dual,
            version: VERSION,
            envelope: KeyEnvelope::Wrapped {
                key_name: "rsa_key1".into(),
                ciphertext: vec![0xAA; 512],
            },
        };
        let mut out = Vec::new();
        write_header(&mut out, &header).unwrap();
        assert!(out.starts_with(b"CAENCR!\x05\x08\x00\x00\x00rsa_key1"));

        let mut cursor = Cursor::new(out);
        assert_eq!(read_header(&mut cursor).unwrap(), header);
        assert_eq!(cursor.position() as usize, cursor.get_ref().len());
    }

    #[test]
    fn test_mismatched_password_params_rejected() {
        let header = ContainerHeader {
            suite: CipherSuite::Dual,
            version: VERSION,
            envelope: KeyEnvelope::Derived(PasswordParams::Single {
                salt: [0; 16],
                iv: [0; 16],
            }),
        };
        assert!(write_header(&mut Vec::new(), &header).is_err());
    }

    #[test]
    fn test_unknown_magic() {
        for input in [&b"ZIPZIP\x05"[..], b"CAENCX!\x05", b"AENC!!\x05"] {
            let err = read_header(&mut Cursor::new(input)).unwrap_err();
            assert!(
                matches!(err, AencError::UnsupportedFormat { .. }),
                "{input:?} must be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_unsupported_version() {
        let err = read_header(&mut Cursor::new(b"AENCP!\x04")).unwrap_err();
        assert!(matches!(err, AencError::UnsupportedFormat { .. }));
        assert!(err.to_string().contains("version 4"));
    }

    #[test]
    fn test_short_header_is_truncated() {
        for input in [&b""[..], b"AEN", b"CAENCP", b"AENCP!"] {
            let err = read_header(&mut Cursor::new(input)).unwrap_err();
            assert!(
                matches!(
                    err,
                    AencError::TruncatedStream {
                        stage: Stage::Header,
                        ..
                    }
                ),
                "{input:?} should be truncated, got {err:?}"
            );
        }
    }

    #[test]
    fn test_wrong_salt_size_is_malformed() {
        let mut input = b"AENCP!\x05".to_vec();
        write_lv(&mut input, &[0u8; 8]).unwrap();
        write_lv(&mut input, &[0u8; 16]).unwrap();
        let err = read_header(&mut Cursor::new(input)).unwrap_err();
        assert!(matches!(
            err,
            AencError::Malformed {
                stage: Stage::Header,
                ..
            }
        ));
    }

    #[test]
    fn test_non_utf8_key_name_is_malformed() {
        let mut input = b"AENCR!\x05".to_vec();
        write_lv(&mut input, &[0xFF, 0xFE]).unwrap();
        write_lv(&mut input, &[0u8; 256]).unwrap();
        let err = read_header(&mut Cursor::new(input)).unwrap_err();
        assert!(matches!(
            err,
            AencError::Malformed {
                stage: Stage::Header,
                ..
            }
        ));
    }

    #[test]
    fn test_password_container_roundtrip() {
        for suite in [CipherSuite::Single, CipherSuite::Dual] {
            let mut container = Vec::new();
            let written = encrypt(
                &b"plain text"[..],
                &mut container,
                suite,
                Recipient::Password(&password()),
            )
            .unwrap();
            assert_eq!(written.plaintext_bytes, 10);

            let header = read_header(&mut Cursor::new(&container)).unwrap();
            assert_eq!(header.kind(), ContainerKind::new(suite, KeyMode::Password));

            let mut plain = Vec::new();
            let read = decrypt(&container[..], &mut plain, Credential::Password(&password())).unwrap();
            assert_eq!(plain, b"plain text");
            assert_eq!(read, written);
        }
    }

    #[test]
    fn test_encrypt_with_progress_reports_plaintext() {
        let mut seen = 0usize;
        let mut container = Vec::new();
        encrypt_with_progress(
            &[3u8; 10_000][..],
            &mut container,
            CipherSuite::Single,
            Recipient::Password(&password()),
            |n| seen += n,
        )
        .unwrap();
        assert_eq!(seen, 10_000);
    }

    #[test]
    fn test_file_helpers_remove_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plain.bin");
        let sealed = dir.path().join("plain.bin.aenc");
        let opened = dir.path().join("plain.out");
        std::fs::write(&input, vec![0xC3u8; 9000]).unwrap();

        encrypt_file(&input, &sealed, CipherSuite::Dual, Recipient::Password(&password())).unwrap();
        decrypt_file(&sealed, &opened, Credential::Password(&password())).unwrap();
        assert_eq!(std::fs::read(&opened).unwrap(), vec![0xC3u8; 9000]);

        // corrupt the final block so unpadding fails
        let mut bytes = std::fs::read(&sealed).unwrap();
        let n = bytes.len();
        bytes[n - 20] ^= 0xFF;
        std::fs::write(&sealed, bytes).unwrap();
        std::fs::remove_file(&opened).unwrap();

        match decrypt_file(&sealed, &opened, Credential::Password(&password())) {
            Err(_) => assert!(!opened.exists(), "partial output must be removed"),
            Ok(_) => assert_ne!(std::fs::read(&opened).unwrap(), vec![0xC3u8; 9000]),
        }
    }
}
