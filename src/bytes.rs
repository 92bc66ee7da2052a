use alloc::vec;
use alloc::vec::Vec;

use num::bigint::BigUint;

/// Big-endian encoding of x, left-padded with zeros to len bytes
///
/// Values wider than len bytes are returned unpadded
pub fn to_fixed_be(x: &BigUint, len: usize) -> Vec<u8> {
    left_pad(&x.to_bytes_be(), len)
}

/// Left-pad a byte slice with zeros up to len bytes
pub fn left_pad(bytes: &[u8], len: usize) -> Vec<u8> {
    if len <= bytes.len() {
        return bytes.to_vec();
    }
    let mut padded = vec![0_u8; len - bytes.len()];
    padded.extend_from_slice(bytes);
    padded
}
