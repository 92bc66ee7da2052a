use alloc::string::String;
use alloc::vec::Vec;

use num::bigint::BigUint;
use num::Num;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("empty integer string")]
    Empty,
    #[error("hex string has odd or zero length")]
    HexLength,
    #[error("invalid hex digit")]
    ParseHex,
    #[error("not a decimal or hexadecimal integer")]
    ParseInt,
}

const HEX_ALPHABET: &[u8; 16] = b"0123456789abcdef";

/// Hex-decode a string
///
/// errors: returns Error on odd length and empty hex strings
pub fn from_hex(hex: &str) -> Result<Vec<u8>, Error> {
    let hex_len = hex.len();
    if hex_len % 2 != 0 || hex_len == 0 {
        return Err(Error::HexLength);
    }

    let mut res = Vec::with_capacity(hex_len / 2);
    for i in 0..(hex_len / 2) {
        let pair = hex.get(i * 2..=i * 2 + 1).ok_or(Error::ParseHex)?;
        res.push(u8::from_str_radix(pair, 16).map_err(|_| Error::ParseHex)?);
    }
    Ok(res)
}

/// Lowercase hex-encode a byte slice
pub fn to_hex(bytes: &[u8]) -> String {
    let mut res = String::with_capacity(bytes.len() * 2);
    for &b in bytes.iter() {
        res.push(HEX_ALPHABET[(b >> 4) as usize] as char);
        res.push(HEX_ALPHABET[(b & 0x0f) as usize] as char);
    }
    res
}

/// Parse an integer given in decimal, falling back to hexadecimal
///
/// A leading "0x" forces hexadecimal. Surrounding whitespace is ignored.
pub fn parse_int(val: &str) -> Result<BigUint, Error> {
    let val = val.trim();
    if val.is_empty() {
        return Err(Error::Empty);
    }

    if let Some(hex) = val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        return BigUint::from_str_radix(hex, 16).map_err(|_| Error::ParseInt);
    }

    BigUint::from_str_radix(val, 10)
        .or_else(|_| BigUint::from_str_radix(val, 16))
        .map_err(|_| Error::ParseInt)
}
