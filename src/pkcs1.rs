//! PKCS#1 v1.5 block type 2 encoding
//!
//! `00 02 || PS || 00 || M`, exactly k bytes, with PS at least eight non-zero bytes.

use alloc::vec;
use alloc::vec::Vec;

use rand::RngCore;

/// Leading bytes of an encryption block
pub const HEADER: [u8; 2] = [0x00, 0x02];

/// Padding / message delimiter
pub const DELIMITER: u8 = 0x00;

/// Minimum number of random padding bytes
pub const MIN_PAD_LEN: usize = 8;

/// Shortest possible block: header, mandatory padding and delimiter
pub const MIN_LEN: usize = HEADER.len() + MIN_PAD_LEN + 1;

// Index of the first byte after the mandatory padding
const PAD_END: usize = HEADER.len() + MIN_PAD_LEN;

/// PKCS#1 v1.5 structural errors
///
/// Variants are ordered by the precedence in which [`check`] reports them.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("block of {0} bytes is shorter than the minimum of {min}", min = MIN_LEN)]
    TooShort(usize),
    #[error("block does not start with 00 02: found {0:02x?}")]
    BadHeader([u8; 2]),
    #[error("zero byte at offset {0} inside the mandatory padding")]
    NullInPadding(usize),
    #[error("no 00 delimiter after the padding")]
    NoDelimiter,
    #[error("message of {actual} bytes exceeds the maximum of {max}")]
    MessageTooLong { max: usize, actual: usize },
}

/// Pad a message into a k-byte encryption block with random non-zero padding
pub fn encode<R: RngCore + ?Sized>(msg: &[u8], k: usize, rng: &mut R) -> Result<Vec<u8>, Error> {
    let max = k.saturating_sub(MIN_LEN);
    if k < MIN_LEN || msg.len() > max {
        return Err(Error::MessageTooLong {
            max,
            actual: msg.len(),
        });
    }

    let pad_len = k - msg.len() - HEADER.len() - 1;

    let mut block = Vec::with_capacity(k);
    block.extend_from_slice(&HEADER);
    block.extend_from_slice(&random_nonzero(rng, pad_len));
    block.push(DELIMITER);
    block.extend_from_slice(msg);

    Ok(block)
}

/// Fill len bytes from rng, redrawing zero bytes
pub fn random_nonzero<R: RngCore + ?Sized>(rng: &mut R, len: usize) -> Vec<u8> {
    let mut res = vec![0_u8; len];
    for b in res.iter_mut() {
        let mut byte = [0_u8; 1];
        while byte[0] == 0 {
            rng.fill_bytes(&mut byte);
        }
        *b = byte[0];
    }
    res
}

/// Whether the block starts with 00 02
///
/// This is the only property Bleichenbacher's oracle definition requires.
pub fn has_header(block: &[u8]) -> bool {
    block.len() >= HEADER.len() && block[..HEADER.len()] == HEADER
}

/// Full structural check of a decrypted block
///
/// Returns the index of the delimiter on success.
pub fn check(block: &[u8]) -> Result<usize, Error> {
    if block.len() < MIN_LEN {
        return Err(Error::TooShort(block.len()));
    }

    if !has_header(block) {
        return Err(Error::BadHeader([block[0], block[1]]));
    }

    if let Some(i) = block[HEADER.len()..PAD_END].iter().position(|&b| b == DELIMITER) {
        return Err(Error::NullInPadding(HEADER.len() + i));
    }

    block[PAD_END..]
        .iter()
        .position(|&b| b == DELIMITER)
        .map(|i| PAD_END + i)
        .ok_or(Error::NoDelimiter)
}

/// Strip the padding from a decrypted block, returning the message
pub fn unpad(block: &[u8]) -> Result<&[u8], Error> {
    let delim = check(block)?;
    Ok(&block[delim + 1..])
}
