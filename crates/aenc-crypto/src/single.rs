//! Single-cipher body: one AES-256-CBC stream over the chunked, padded plaintext
//!
//! The body is raw ciphertext with no framing. Chunks exist only on the
//! plaintext side; CBC chaining runs unbroken across chunk boundaries, so the
//! body equals a one-shot AES-256-CBC encryption of the padded plaintext.

use std::io::{Read, Write};

use aes::Aes256;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use aenc_core::{AencError, AencResult, Stage};

use crate::chunker::ChunkReader;
use crate::container::StreamSummary;
use crate::keys::SingleKeys;
use crate::lv::read_up_to;
use crate::padding::unpad;
use crate::{BLOCK_SIZE, CHUNK_SIZE};

pub(crate) type CbcEncryptor = cbc::Encryptor<Aes256>;
pub(crate) type CbcDecryptor = cbc::Decryptor<Aes256>;

/// Encrypt `data` in place, continuing the chain held by `enc`.
pub(crate) fn cbc_encrypt(enc: &mut CbcEncryptor, data: &mut [u8]) {
    debug_assert_eq!(data.len() % BLOCK_SIZE, 0);
    for block in data.chunks_exact_mut(BLOCK_SIZE) {
        enc.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

/// Decrypt `data` in place, continuing the chain held by `dec`.
pub(crate) fn cbc_decrypt(dec: &mut CbcDecryptor, data: &mut [u8]) {
    debug_assert_eq!(data.len() % BLOCK_SIZE, 0);
    for block in data.chunks_exact_mut(BLOCK_SIZE) {
        dec.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

/// Encrypt all of `reader` into `writer`.
///
/// `progress` receives the plaintext byte count of each chunk as it is
/// written.
pub fn encrypt_body<R: Read, W: Write + ?Sized>(
    reader: R,
    writer: &mut W,
    keys: &SingleKeys,
    progress: &mut dyn FnMut(usize),
) -> AencResult<StreamSummary> {
    let mut enc = CbcEncryptor::new(keys.key.as_bytes().into(), (&keys.iv).into());
    let mut chunks = ChunkReader::new(reader);
    let mut summary = StreamSummary::default();

    while let Some(chunk) = chunks.next_chunk()? {
        cbc_encrypt(&mut enc, chunk.data);
        writer.write_all(chunk.data)?;
        tracing::trace!(index = chunk.index, len = chunk.data.len(), "encrypted chunk");

        summary.plaintext_bytes += chunk.plaintext_len as u64;
        summary.chunks += 1;
        progress(chunk.plaintext_len);
    }

    tracing::debug!(
        chunks = summary.chunks,
        bytes = summary.plaintext_bytes,
        "encrypted single-cipher body"
    );
    Ok(summary)
}

/// Decrypt a single-cipher body, consuming `reader` to EOF.
///
/// Each decrypted piece is held back until the next one arrives so that
/// padding is only ever stripped from the true end of the stream.
/// `progress` receives the ciphertext byte count of each piece read.
pub fn decrypt_body<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    keys: &SingleKeys,
    progress: &mut dyn FnMut(usize),
) -> AencResult<StreamSummary> {
    let mut dec = CbcDecryptor::new(keys.key.as_bytes().into(), (&keys.iv).into());
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut held: Vec<u8> = Vec::with_capacity(CHUNK_SIZE);
    let mut consumed = 0usize;
    let mut summary = StreamSummary::default();

    loop {
        let n = read_up_to(reader, &mut buf)?;
        if n == 0 {
            break;
        }
        consumed += n;
        if n % BLOCK_SIZE != 0 {
            return Err(AencError::TruncatedStream {
                stage: Stage::Body,
                declared: consumed.next_multiple_of(BLOCK_SIZE),
                available: consumed,
            });
        }

        cbc_decrypt(&mut dec, &mut buf[..n]);
        if !held.is_empty() {
            writer.write_all(&held)?;
            summary.plaintext_bytes += held.len() as u64;
        }
        held.clear();
        held.extend_from_slice(&buf[..n]);
        summary.chunks += 1;
        progress(n);

        if n < CHUNK_SIZE {
            break;
        }
    }

    if held.is_empty() {
        return Err(AencError::TruncatedStream {
            stage: Stage::Body,
            declared: BLOCK_SIZE,
            available: 0,
        });
    }

    let tail = unpad(&held).map_err(|_| AencError::Padding { stage: Stage::Body })?;
    writer.write_all(tail)?;
    summary.plaintext_bytes += tail.len() as u64;

    tracing::debug!(
        chunks = summary.chunks,
        bytes = summary.plaintext_bytes,
        "decrypted single-cipher body"
    );
    Ok(summary)
}
