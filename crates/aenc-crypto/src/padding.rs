//! PKCS#7 padding: append `n` bytes of value `n`, 1 <= n <= block size

use thiserror::Error;

use crate::BLOCK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid PKCS#7 padding")]
pub struct InvalidPadding;

/// Pad `data` to a multiple of [`BLOCK_SIZE`]. Always adds at least one byte.
pub fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

/// Pad `buf[..len]` in place and return the padded length.
///
/// `buf` must have room for `len` rounded up to the next full block.
pub fn pad_in_place(buf: &mut [u8], len: usize) -> usize {
    let pad_len = BLOCK_SIZE - len % BLOCK_SIZE;
    buf[len..len + pad_len].fill(pad_len as u8);
    len + pad_len
}

/// Strip PKCS#7 padding, returning the unpadded prefix of `padded`.
pub fn unpad(padded: &[u8]) -> Result<&[u8], InvalidPadding> {
    if padded.is_empty() || padded.len() % BLOCK_SIZE != 0 {
        return Err(InvalidPadding);
    }
    let pad_len = padded[padded.len() - 1] as usize;
    if pad_len == 0 || pad_len > BLOCK_SIZE {
        return Err(InvalidPadding);
    }
    let (data, trailer) = padded.split_at(padded.len() - pad_len);
    if trailer.iter().any(|&b| b as usize != pad_len) {
        return Err(InvalidPadding);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pad_empty_is_full_block() {
        assert_eq!(pad(b""), vec![16u8; 16]);
    }

    #[test]
    fn test_pad_partial_block() {
        let padded = pad(b"hello");
        assert_eq!(padded.len(), 16);
        assert_eq!(&padded[..5], b"hello");
        assert!(padded[5..].iter().all(|&b| b == 11));
    }

    #[test]
    fn test_pad_aligned_input_gets_extra_block() {
        let padded = pad(&[0u8; 32]);
        assert_eq!(padded.len(), 48);
        assert_eq!(&padded[32..], &[16u8; 16]);
    }

    #[test]
    fn test_unpad_rejects_zero_pad_byte() {
        let mut block = [1u8; 16];
        block[15] = 0;
        assert_eq!(unpad(&block), Err(InvalidPadding));
    }

    #[test]
    fn test_unpad_rejects_oversized_pad_byte() {
        assert_eq!(unpad(&[17u8; 16]), Err(InvalidPadding));
    }

    #[test]
    fn test_unpad_rejects_inconsistent_trailer() {
        let mut padded = pad(b"abc");
        padded[10] ^= 1;
        assert_eq!(unpad(&padded), Err(InvalidPadding));
    }

    #[test]
    fn test_unpad_rejects_unaligned() {
        assert_eq!(unpad(&[1u8; 15]), Err(InvalidPadding));
        assert_eq!(unpad(&[]), Err(InvalidPadding));
    }

    proptest! {
        #[test]
        fn prop_pad_unpad(data in proptest::collection::vec(any::<u8>(), 0..100)) {
            let padded = pad(&data);
            prop_assert_eq!(padded.len() % BLOCK_SIZE, 0);
            prop_assert!(padded.len() > data.len());
            prop_assert_eq!(unpad(&padded).unwrap(), &data[..]);
        }
    }
}
