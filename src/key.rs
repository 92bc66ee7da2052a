use alloc::vec::Vec;

use num::bigint::BigUint;
use num::{Integer, One, Zero};

use crate::bytes;
use crate::encoding;
use crate::math;

/// Smallest modulus length that leaves room for the 00 02 header
pub const MIN_MODULUS_LEN: usize = 3;

/// Key material errors
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("modulus is zero")]
    ZeroModulus,
    #[error("modulus is even")]
    EvenModulus,
    #[error("modulus occupies {actual} bytes, expected {expected}")]
    ModulusLength { expected: usize, actual: usize },
    #[error("modulus of {0} bytes is too short, need at least {min}", min = MIN_MODULUS_LEN)]
    ModulusTooShort(usize),
    #[error("public exponent must be odd and greater than one")]
    InvalidExponent,
    #[error("private exponent does not exist for the supplied primes")]
    NoPrivateExponent,
    #[error("ciphertext is not below the modulus")]
    CiphertextOutOfRange,
    #[error("cannot parse {field}: {source}")]
    Parse {
        field: &'static str,
        source: encoding::Error,
    },
}

/// RSA public key with the constants of the PKCS#1 v1.5 conformant range
///
/// Immutable after construction; every conformant plaintext lies in [2B, 3B - 1].
#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey {
    n: BigUint,
    e: BigUint,
    k: usize,
    b: BigUint,
    two_b: BigUint,
    three_b: BigUint,
}

impl PublicKey {
    /// Create a public key from the modulus, exponent and modulus byte length
    ///
    /// errors: k must equal the byte length of n, n must be odd, e must be odd and > 1
    pub fn new(n: BigUint, e: BigUint, k: usize) -> Result<Self, ConfigError> {
        if n.is_zero() {
            return Err(ConfigError::ZeroModulus);
        }
        if n.is_even() {
            return Err(ConfigError::EvenModulus);
        }

        let actual = byte_len(&n);
        if actual != k {
            return Err(ConfigError::ModulusLength { expected: k, actual });
        }
        if k < MIN_MODULUS_LEN {
            return Err(ConfigError::ModulusTooShort(k));
        }
        if e <= BigUint::one() || e.is_even() {
            return Err(ConfigError::InvalidExponent);
        }

        // B = 2^(8(k - 2))
        let b = BigUint::one() << (8 * (k - 2));
        let two_b = &b + &b;
        let three_b = &two_b + &b;

        Ok(Self {
            n,
            e,
            k,
            b,
            two_b,
            three_b,
        })
    }

    /// Create a public key, deriving k from the modulus
    pub fn from_modulus(n: BigUint, e: BigUint) -> Result<Self, ConfigError> {
        let k = byte_len(&n);
        Self::new(n, e, k)
    }

    /// Parse a public key from textual integers (decimal, or hexadecimal fallback)
    pub fn parse(n: &str, e: &str) -> Result<Self, ConfigError> {
        let n = encoding::parse_int(n).map_err(|source| ConfigError::Parse {
            field: "modulus",
            source,
        })?;
        let e = encoding::parse_int(e).map_err(|source| ConfigError::Parse {
            field: "exponent",
            source,
        })?;
        Self::from_modulus(n, e)
    }

    /// Get the modulus n
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// Get the public exponent e
    pub fn e(&self) -> &BigUint {
        &self.e
    }

    /// Get the modulus length in bytes
    pub fn k(&self) -> usize {
        self.k
    }

    /// Get B = 2^(8(k - 2))
    pub fn b(&self) -> &BigUint {
        &self.b
    }

    /// Get 2B, the smallest conformant plaintext
    pub fn two_b(&self) -> &BigUint {
        &self.two_b
    }

    /// Get 3B, one past the largest conformant plaintext
    pub fn three_b(&self) -> &BigUint {
        &self.three_b
    }

    /// Raw RSA encryption m^e mod n
    pub fn encrypt(&self, m: &BigUint) -> BigUint {
        m.modpow(&self.e, &self.n)
    }

    /// Blind a ciphertext with multiplier s: c * s^e mod n
    ///
    /// Decrypts to m * s mod n when c decrypts to m
    pub fn blind(&self, c: &BigUint, s: &BigUint) -> BigUint {
        (c * self.encrypt(s)) % &self.n
    }

    /// Encode an integer as a k-byte big-endian block
    pub fn to_block(&self, x: &BigUint) -> Vec<u8> {
        bytes::to_fixed_be(x, self.k)
    }

    /// Decode a captured ciphertext given as 2k hex digits
    ///
    /// errors: ConfigError::Parse on bad hex, ConfigError::CiphertextOutOfRange
    /// when the width is not k bytes or the value is not below n
    pub fn parse_ciphertext(&self, hex: &str) -> Result<BigUint, ConfigError> {
        let bytes = encoding::from_hex(hex.trim()).map_err(|source| ConfigError::Parse {
            field: "ciphertext",
            source,
        })?;
        if bytes.len() != self.k {
            return Err(ConfigError::CiphertextOutOfRange);
        }

        let c = BigUint::from_bytes_be(&bytes);
        self.check_ciphertext(&c)?;
        Ok(c)
    }

    /// Check that a ciphertext is a valid residue for this key
    pub fn check_ciphertext(&self, c: &BigUint) -> Result<(), ConfigError> {
        if c >= &self.n {
            Err(ConfigError::CiphertextOutOfRange)
        } else {
            Ok(())
        }
    }
}

/// RSA private key, used by local oracles to decide conformance
#[derive(Clone, Debug)]
pub struct PrivateKey {
    public: PublicKey,
    d: BigUint,
}

impl PrivateKey {
    /// Create a private key from a public key and its private exponent
    pub fn new(public: PublicKey, d: BigUint) -> Self {
        Self { public, d }
    }

    /// Derive the private key from two supplied primes and the public exponent
    pub fn from_primes(p: &BigUint, q: &BigUint, e: BigUint) -> Result<Self, ConfigError> {
        let n = p * q;
        let one = BigUint::one();
        let phi = (p - &one) * (q - &one);
        let d = math::inv_mod(&e, &phi).ok_or(ConfigError::NoPrivateExponent)?;
        let public = PublicKey::from_modulus(n, e)?;
        Ok(Self { public, d })
    }

    /// Get the matching public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Raw RSA decryption c^d mod n
    pub fn decrypt(&self, c: &BigUint) -> BigUint {
        c.modpow(&self.d, self.public.n())
    }

    /// Decrypt into a k-byte block
    pub fn decrypt_block(&self, c: &BigUint) -> Vec<u8> {
        self.public.to_block(&self.decrypt(c))
    }
}

fn byte_len(n: &BigUint) -> usize {
    ((n.bits() + 7) / 8) as usize
}
