//! Length-value records: `[i32 LE length][length bytes]`
//!
//! The framer knows nothing about where in a container it is reading, so it
//! returns [`LvError`]; callers attach a [`Stage`] with [`LvError::at`].

use std::io::{self, Read, Write};

use aenc_core::{AencError, Stage};
use thiserror::Error;

/// Size of the length prefix
pub const LENGTH_SIZE: usize = 4;

#[derive(Debug, Error)]
pub enum LvError {
    #[error("record declares {declared} bytes, {available} available")]
    Truncated { declared: usize, available: usize },

    #[error("negative record length {0}")]
    NegativeLength(i32),

    #[error("record declares {declared} bytes, at most {max} allowed")]
    Oversized { declared: usize, max: usize },

    #[error("record of {0} bytes does not fit a 32-bit length")]
    TooLong(usize),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl LvError {
    pub fn at(self, stage: Stage) -> AencError {
        match self {
            LvError::Truncated {
                declared,
                available,
            } => AencError::TruncatedStream {
                stage,
                declared,
                available,
            },
            LvError::NegativeLength(n) => {
                AencError::malformed(stage, format!("negative record length {n}"))
            }
            LvError::Oversized { declared, max } => AencError::malformed(
                stage,
                format!("record declares {declared} bytes, at most {max} allowed"),
            ),
            LvError::TooLong(n) => {
                AencError::malformed(stage, format!("record of {n} bytes exceeds i32 length"))
            }
            LvError::Io(e) => AencError::Io(e),
        }
    }
}

/// Write a bare length prefix with no payload.
pub fn write_length<W: Write + ?Sized>(w: &mut W, length: i32) -> Result<(), LvError> {
    w.write_all(&length.to_le_bytes())?;
    Ok(())
}

/// Read a bare length prefix. Negative values are returned as-is.
pub fn read_length<R: Read + ?Sized>(r: &mut R) -> Result<i32, LvError> {
    let mut prefix = [0u8; LENGTH_SIZE];
    let got = read_up_to(r, &mut prefix)?;
    if got < LENGTH_SIZE {
        return Err(LvError::Truncated {
            declared: LENGTH_SIZE,
            available: got,
        });
    }
    Ok(i32::from_le_bytes(prefix))
}

/// Write `value` as one LV record.
pub fn write_lv<W: Write + ?Sized>(w: &mut W, value: &[u8]) -> Result<(), LvError> {
    let length = i32::try_from(value.len()).map_err(|_| LvError::TooLong(value.len()))?;
    write_length(w, length)?;
    w.write_all(value)?;
    Ok(())
}

/// Read one LV record, failing if the stream ends before the declared length.
///
/// The payload buffer grows with the bytes actually read, so a corrupt
/// length cannot force a large allocation up front.
pub fn read_lv<R: Read + ?Sized>(r: &mut R) -> Result<Vec<u8>, LvError> {
    read_lv_bounded(r, i32::MAX as usize)
}

/// Like [`read_lv`], but rejects a declared length above `max` before reading
/// any payload.
pub fn read_lv_bounded<R: Read + ?Sized>(r: &mut R, max: usize) -> Result<Vec<u8>, LvError> {
    let length = read_length(r)?;
    if length < 0 {
        return Err(LvError::NegativeLength(length));
    }
    let declared = length as usize;
    if declared > max {
        return Err(LvError::Oversized { declared, max });
    }

    let mut value = Vec::new();
    (&mut *r).take(declared as u64).read_to_end(&mut value)?;
    if value.len() != declared {
        return Err(LvError::Truncated {
            declared,
            available: value.len(),
        });
    }
    Ok(value)
}

/// Fill `buf` until it is full or the reader hits EOF; returns bytes read.
pub(crate) fn read_up_to<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
