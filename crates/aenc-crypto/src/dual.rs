//! Dual-cipher body: per-chunk random mask split across ChaCha20 and AES-256-CBC
//!
//! For each padded plaintext chunk `P` a fresh random mask `R` is drawn and the
//! chunk record is written as
//! ```text
//! LV(ChaCha20(R)) LV(AES-CBC(P ^ R))
//! ```
//! Recovering `P` needs both keys. One ChaCha20 keystream and one CBC chain
//! span the whole body; neither is restarted per chunk. The body ends with a
//! record whose first field is empty, and nothing after it is read.
//!
//! Every record but the last carries exactly [`CHUNK_SIZE`] bytes per field;
//! the last carries at most that. The IETF ChaCha20 counter is 32 bits, so a
//! body is limited to 256 GiB of keystream, past which
//! [`AencError::KeystreamExhausted`] is returned.

use std::io::{Read, Write};

use chacha20::ChaCha20;
use cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;
use zeroize::Zeroizing;

use aenc_core::{AencError, AencResult, Stage};

use crate::chunker::ChunkReader;
use crate::container::StreamSummary;
use crate::keys::DualKeys;
use crate::lv::{read_lv_bounded, write_lv, LENGTH_SIZE};
use crate::padding::unpad;
use crate::single::{cbc_decrypt, cbc_encrypt, CbcDecryptor, CbcEncryptor};
use crate::{BLOCK_SIZE, CHUNK_SIZE};

fn xor_in_place(data: &mut [u8], mask: &[u8]) {
    for (d, m) in data.iter_mut().zip(mask) {
        *d ^= m;
    }
}

fn apply_keystream(stream: &mut ChaCha20, mask: &mut [u8], stage: Stage) -> AencResult<()> {
    stream
        .try_apply_keystream(mask)
        .map_err(|_| AencError::KeystreamExhausted { stage })
}

/// Encrypt all of `reader` into a sequence of chunk records plus terminator.
///
/// `progress` receives the plaintext byte count of each chunk as it is
/// written.
pub fn encrypt_body<R: Read, W: Write + ?Sized>(
    reader: R,
    writer: &mut W,
    keys: &DualKeys,
    progress: &mut dyn FnMut(usize),
) -> AencResult<StreamSummary> {
    let mut stream = ChaCha20::new(keys.stream_key.as_bytes().into(), (&keys.stream_nonce).into());
    let mut block = CbcEncryptor::new(keys.block_key.as_bytes().into(), (&keys.block_iv).into());
    let mut rng = rand::thread_rng();
    let mut mask_buf = Zeroizing::new(vec![0u8; CHUNK_SIZE + BLOCK_SIZE]);

    let mut chunks = ChunkReader::new(reader);
    let mut summary = StreamSummary::default();

    while let Some(chunk) = chunks.next_chunk()? {
        let stage = Stage::Chunk(chunk.index);
        let mask = &mut mask_buf[..chunk.data.len()];
        rng.fill_bytes(mask);

        xor_in_place(chunk.data, mask);
        apply_keystream(&mut stream, mask, stage)?;
        cbc_encrypt(&mut block, chunk.data);

        write_lv(writer, mask).map_err(|e| e.at(stage))?;
        write_lv(writer, chunk.data).map_err(|e| e.at(stage))?;
        tracing::trace!(index = chunk.index, len = chunk.data.len(), "wrote chunk record");

        summary.plaintext_bytes += chunk.plaintext_len as u64;
        summary.chunks += 1;
        progress(chunk.plaintext_len);
    }
    write_lv(writer, &[]).map_err(|e| e.at(Stage::Chunk(summary.chunks)))?;

    tracing::debug!(
        chunks = summary.chunks,
        bytes = summary.plaintext_bytes,
        "encrypted dual-cipher body"
    );
    Ok(summary)
}

/// Decrypt chunk records from `reader` up to and including the terminator.
///
/// Bytes after the terminator are left unread. `progress` receives the
/// container bytes consumed by each chunk record.
pub fn decrypt_body<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    keys: &DualKeys,
    progress: &mut dyn FnMut(usize),
) -> AencResult<StreamSummary> {
    let mut stream = ChaCha20::new(keys.stream_key.as_bytes().into(), (&keys.stream_nonce).into());
    let mut block = CbcDecryptor::new(keys.block_key.as_bytes().into(), (&keys.block_iv).into());
    let mut held: Zeroizing<Vec<u8>> = Zeroizing::new(Vec::new());
    let mut summary = StreamSummary::default();

    loop {
        let stage = Stage::Chunk(summary.chunks);
        let mut mask = Zeroizing::new(read_field(reader, stage)?);
        if mask.is_empty() {
            break;
        }
        // only the record before the terminator may be short
        if summary.chunks > 0 && held.len() < CHUNK_SIZE {
            return Err(AencError::malformed(
                Stage::Chunk(summary.chunks - 1),
                format!("{}-byte record is followed by another record", held.len()),
            ));
        }
        let mut data = Zeroizing::new(read_field(reader, stage)?);

        if mask.len() != data.len() {
            return Err(AencError::malformed(
                stage,
                format!("field lengths differ: {} and {}", mask.len(), data.len()),
            ));
        }
        if data.len() % BLOCK_SIZE != 0 {
            return Err(AencError::malformed(
                stage,
                format!("{}-byte field is not block aligned", data.len()),
            ));
        }

        apply_keystream(&mut stream, &mut mask, stage)?;
        cbc_decrypt(&mut block, &mut data);
        xor_in_place(&mut data, &mask);

        if !held.is_empty() {
            writer.write_all(&held)?;
            summary.plaintext_bytes += held.len() as u64;
        }
        held = data;
        tracing::trace!(index = summary.chunks, len = held.len(), "read chunk record");
        summary.chunks += 1;
        progress(2 * LENGTH_SIZE + 2 * held.len());
    }

    let Some(last) = summary.chunks.checked_sub(1) else {
        return Err(AencError::malformed(
            Stage::Chunk(0),
            "terminator before any chunk record",
        ));
    };
    let tail = unpad(&held).map_err(|_| AencError::Padding {
        stage: Stage::Chunk(last),
    })?;
    writer.write_all(tail)?;
    summary.plaintext_bytes += tail.len() as u64;

    tracing::debug!(
        chunks = summary.chunks,
        bytes = summary.plaintext_bytes,
        "decrypted dual-cipher body"
    );
    Ok(summary)
}

fn read_field<R: Read + ?Sized>(reader: &mut R, stage: Stage) -> AencResult<Vec<u8>> {
    read_lv_bounded(reader, CHUNK_SIZE).map_err(|e| e.at(stage))
}
