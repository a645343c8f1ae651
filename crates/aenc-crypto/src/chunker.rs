//! Splits a plaintext stream into 4096-byte chunks with a padded final chunk.
//!
//! Every stream yields zero or more full chunks followed by exactly one final
//! chunk holding the remaining 0..4095 bytes plus PKCS#7 padding. An input
//! that is a multiple of 4096 (including empty) therefore ends in a chunk
//! that is pure padding.

use std::io::{self, Read};

use crate::lv::read_up_to;
use crate::padding::pad_in_place;
use crate::{BLOCK_SIZE, CHUNK_SIZE};

/// One chunk ready for encryption. `data` is block-aligned.
#[derive(Debug)]
pub struct Chunk<'a> {
    pub index: u64,
    pub data: &'a mut [u8],
    /// Plaintext bytes in this chunk, excluding padding
    pub plaintext_len: usize,
    pub last: bool,
}

pub struct ChunkReader<R> {
    inner: R,
    buf: Vec<u8>,
    index: u64,
    finished: bool,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: vec![0u8; CHUNK_SIZE + BLOCK_SIZE],
            index: 0,
            finished: false,
        }
    }

    /// Next chunk, or `None` once the padded final chunk has been returned.
    pub fn next_chunk(&mut self) -> io::Result<Option<Chunk<'_>>> {
        if self.finished {
            return Ok(None);
        }

        let read = read_up_to(&mut self.inner, &mut self.buf[..CHUNK_SIZE])?;
        let index = self.index;
        self.index += 1;

        if read == CHUNK_SIZE {
            return Ok(Some(Chunk {
                index,
                data: &mut self.buf[..CHUNK_SIZE],
                plaintext_len: CHUNK_SIZE,
                last: false,
            }));
        }

        self.finished = true;
        let padded_len = pad_in_place(&mut self.buf, read);
        Ok(Some(Chunk {
            index,
            data: &mut self.buf[..padded_len],
            plaintext_len: read,
            last: true,
        }))
    }
}
