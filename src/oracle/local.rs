use core::sync::atomic::{AtomicU64, Ordering};

use num::bigint::BigUint;

use crate::key::PrivateKey;
use crate::pkcs1;

use super::{PaddingOracle, Response};

/// Which decryption checks a local oracle leaks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strictness {
    /// Only the leading 00 02 is checked (Bleichenbacher '98, Definition 1 without PS rules)
    HeaderOnly,
    /// Full PKCS#1 v1.5 structure: header, mandatory padding and delimiter
    Full,
}

/// Padding oracle that decrypts with a known private key
///
/// Stands in for a vulnerable system when calibrating or testing.
#[derive(Debug)]
pub struct DecryptionOracle {
    key: PrivateKey,
    strictness: Strictness,
    queries: AtomicU64,
}

impl DecryptionOracle {
    /// Create a new oracle deciding conformance with the given strictness
    pub fn new(key: PrivateKey, strictness: Strictness) -> Self {
        Self {
            key,
            strictness,
            queries: AtomicU64::new(0),
        }
    }

    /// Get the oracle's private key
    pub fn key(&self) -> &PrivateKey {
        &self.key
    }

    /// Number of queries answered so far
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    /// Decrypt and run the full structural check
    ///
    /// Mirrors the error a strict server would report for the ciphertext.
    pub fn classify(&self, ciphertext: &BigUint) -> Result<usize, pkcs1::Error> {
        pkcs1::check(&self.key.decrypt_block(ciphertext))
    }
}

impl PaddingOracle for DecryptionOracle {
    fn query(&self, ciphertext: &BigUint) -> Response {
        self.queries.fetch_add(1, Ordering::Relaxed);

        if ciphertext >= self.key.public_key().n() {
            return Response::Inconclusive;
        }

        let block = self.key.decrypt_block(ciphertext);
        let conformant = match self.strictness {
            Strictness::HeaderOnly => pkcs1::has_header(&block),
            Strictness::Full => pkcs1::check(&block).is_ok(),
        };
        Response::from(conformant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::key::PublicKey;

    fn toy_key() -> PrivateKey {
        PrivateKey::from_primes(
            &BigUint::from(257_u32),
            &BigUint::from(263_u32),
            BigUint::from(65_537_u32),
        )
        .unwrap()
    }

    #[test]
    fn header_only() {
        let oracle = DecryptionOracle::new(toy_key(), Strictness::HeaderOnly);
        let key: PublicKey = oracle.key().public_key().clone();

        for m in [511_u32, 512, 677, 767, 768].iter() {
            let c = key.encrypt(&BigUint::from(*m));
            let expected = *m >= 512 && *m < 768;
            assert_eq!(oracle.query(&c), Response::from(expected), "m: {}", m);
        }
        assert_eq!(oracle.queries(), 5);

        // the strict check never passes on a 3-byte block
        assert!(oracle.classify(&key.encrypt(&BigUint::from(677_u32))).is_err());

        assert_eq!(oracle.query(key.n()), Response::Inconclusive);
    }
}
