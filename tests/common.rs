use std::cell::RefCell;

use num::bigint::BigUint;
use num::ToPrimitive;

use bleichenbacher::encoding::parse_int;
use bleichenbacher::{PaddingOracle, PrivateKey, Progress, Response};

#[allow(dead_code)]
pub const TOY_PLAINTEXT: u32 = 677;

/// 257 * 263, small enough to check every residue
#[allow(dead_code)]
pub fn toy_key() -> PrivateKey {
    PrivateKey::from_primes(
        &BigUint::from(257_u32),
        &BigUint::from(263_u32),
        BigUint::from(65_537_u32),
    )
    .unwrap()
}

/// 24-byte modulus, large enough for a padded message
#[allow(dead_code)]
pub fn key_24() -> PrivateKey {
    let p = parse_int("0x14d3c1a6f2a74de452e6b49b").unwrap();
    let q = parse_int("0xc4aa88a18579b168f41fd2d").unwrap();
    PrivateKey::from_primes(&p, &q, BigUint::from(65_537_u32)).unwrap()
}

/// Multipliers and answers seen through the progress callback
#[allow(dead_code)]
#[derive(Default)]
pub struct Transcript {
    pub queries: RefCell<Vec<(BigUint, Response)>>,
}

#[allow(dead_code)]
impl Transcript {
    pub fn record(&self, p: &Progress<'_>) {
        self.queries.borrow_mut().push((p.multiplier.clone(), p.response));
    }

    pub fn len(&self) -> usize {
        self.queries.borrow().len()
    }

    /// Every x in [0, n) that would have produced the same answers
    pub fn consistent_plaintexts(&self, n: u64, b: u64) -> Vec<u64> {
        let queries: Vec<(u64, bool)> = self
            .queries
            .borrow()
            .iter()
            .filter(|(_, r)| !r.is_inconclusive())
            .map(|(s, r)| (s.to_u64().unwrap(), r.is_conformant()))
            .collect();

        (0..n)
            .filter(|x| {
                queries.iter().all(|(s, ok)| {
                    let xs = x * s % n;
                    (xs >= 2 * b && xs < 3 * b) == *ok
                })
            })
            .collect()
    }
}

/// Oracle answering inconclusive on every nth call, truthfully otherwise
#[allow(dead_code)]
pub struct Flaky<O> {
    pub inner: O,
    pub every: u64,
    pub calls: RefCell<u64>,
}

#[allow(dead_code)]
impl<O> Flaky<O> {
    pub fn new(inner: O, every: u64) -> Self {
        Self {
            inner,
            every,
            calls: RefCell::new(0),
        }
    }
}

impl<O: PaddingOracle> PaddingOracle for Flaky<O> {
    fn query(&self, ciphertext: &BigUint) -> Response {
        let mut calls = self.calls.borrow_mut();
        *calls += 1;
        if *calls % self.every == 0 {
            Response::Inconclusive
        } else {
            self.inner.query(ciphertext)
        }
    }
}
