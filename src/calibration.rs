//! Deliberately malformed PKCS#1 v1.5 blocks
//!
//! Used to probe a candidate system before an attack: encrypt one block of
//! every [`Category`], send them, and look for a response that tells the
//! conformant ones apart.

use alloc::vec::Vec;
use core::fmt;

use rand::RngCore;

use crate::pkcs1::{self, DELIMITER, HEADER, MIN_PAD_LEN};

/// Zero bytes written by [`Generator::generate`] for [`Category::ConsecutiveNulls`]
pub const DEFAULT_EXTRA_NULLS: usize = 2;

/// Header written by [`Generator::generate`] for [`Category::WrongHeader`]
pub const DEFAULT_WRONG_HEADER: [u8; 2] = [0x00, 0x01];

/// 1-based padding position zeroed for [`Category::NullInPadding`]
pub const DEFAULT_NULL_POSITION: usize = 4;

/// Byte replacing the delimiter for [`Category::NoDelimiter`]
pub const DEFAULT_REPLACEMENT: u8 = 0xff;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Encoding(#[from] pkcs1::Error),
    #[error("index {index} is out of bounds for a block of {len} bytes")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Kind of calibration block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Valid block
    Conforming,
    /// Valid block with a run of zero bytes in front of the delimiter
    ConsecutiveNulls,
    /// Block starting with something other than 00 02
    WrongHeader,
    /// Zero byte inside the eight mandatory padding bytes
    NullInPadding,
    /// Delimiter overwritten, no zero byte after the padding
    NoDelimiter,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Conforming,
        Category::ConsecutiveNulls,
        Category::WrongHeader,
        Category::NullInPadding,
        Category::NoDelimiter,
    ];

    /// Whether a strict PKCS#1 decoder accepts blocks of this category
    ///
    /// Assumes the default parameters and a message without zero bytes.
    pub fn expected(self) -> bool {
        match self {
            Category::Conforming | Category::ConsecutiveNulls => true,
            Category::WrongHeader | Category::NullInPadding | Category::NoDelimiter => false,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Conforming => "conforming",
            Category::ConsecutiveNulls => "consecutive null bytes",
            Category::WrongHeader => "wrong header",
            Category::NullInPadding => "null byte in padding",
            Category::NoDelimiter => "no delimiter",
        };
        f.write_str(name)
    }
}

/// Calibration block generator for a k-byte modulus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generator {
    k: usize,
}

impl Generator {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Generate a block of the given category with the default parameters
    pub fn generate<R: RngCore + ?Sized>(
        &self,
        category: Category,
        data: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>, Error> {
        match category {
            Category::Conforming => self.conforming(data, rng),
            Category::ConsecutiveNulls => {
                self.consecutive_nulls(data, None, DEFAULT_EXTRA_NULLS, true, rng)
            }
            Category::WrongHeader => self.wrong_header(data, DEFAULT_WRONG_HEADER, rng),
            Category::NullInPadding => self.null_in_padding(data, DEFAULT_NULL_POSITION, rng),
            Category::NoDelimiter => self.no_delimiter(data, DEFAULT_REPLACEMENT, rng),
        }
    }

    /// A valid block
    pub fn conforming<R: RngCore + ?Sized>(&self, data: &[u8], rng: &mut R) -> Result<Vec<u8>, Error> {
        Ok(pkcs1::encode(data, self.k, rng)?)
    }

    /// A valid block overwritten with `extra_nulls` zero bytes at `index`
    ///
    /// `index` defaults to the byte after the delimiter. With `pad_back` the
    /// run is moved back so it ends right before that index.
    pub fn consecutive_nulls<R: RngCore + ?Sized>(
        &self,
        data: &[u8],
        index: Option<usize>,
        extra_nulls: usize,
        pad_back: bool,
        rng: &mut R,
    ) -> Result<Vec<u8>, Error> {
        let mut block = self.conforming(data, rng)?;
        let len = block.len();

        let index = match index {
            Some(i) => i,
            None => delimiter(&block) + 1,
        };
        let start = if pad_back {
            index.checked_sub(extra_nulls + 1)
        } else {
            Some(index)
        };

        match start {
            Some(start) if start + extra_nulls < len => {
                for b in block[start..start + extra_nulls].iter_mut() {
                    *b = 0;
                }
                Ok(block)
            }
            _ => Err(Error::IndexOutOfBounds { index, len }),
        }
    }

    /// A block with the header replaced
    pub fn wrong_header<R: RngCore + ?Sized>(
        &self,
        data: &[u8],
        header: [u8; 2],
        rng: &mut R,
    ) -> Result<Vec<u8>, Error> {
        let mut block = self.conforming(data, rng)?;
        block[..HEADER.len()].copy_from_slice(&header);
        Ok(block)
    }

    /// A block with a zero at the 1-based `position` of the mandatory padding
    pub fn null_in_padding<R: RngCore + ?Sized>(
        &self,
        data: &[u8],
        position: usize,
        rng: &mut R,
    ) -> Result<Vec<u8>, Error> {
        let mut block = self.conforming(data, rng)?;
        if position == 0 || position > MIN_PAD_LEN {
            return Err(Error::IndexOutOfBounds {
                index: position,
                len: MIN_PAD_LEN,
            });
        }
        block[HEADER.len() + position - 1] = 0;
        Ok(block)
    }

    /// A block with the delimiter replaced
    pub fn no_delimiter<R: RngCore + ?Sized>(
        &self,
        data: &[u8],
        replacement: u8,
        rng: &mut R,
    ) -> Result<Vec<u8>, Error> {
        let mut block = self.conforming(data, rng)?;
        let i = delimiter(&block);
        block[i] = replacement;
        Ok(block)
    }
}

// Padding bytes are non-zero, so the first zero past the header is the delimiter
fn delimiter(block: &[u8]) -> usize {
    block[1..]
        .iter()
        .position(|&b| b == DELIMITER)
        .map_or(block.len(), |i| i + 1)
}
