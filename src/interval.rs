use alloc::vec::Vec;
use core::fmt;

use num::bigint::BigUint;
use num::One;

use crate::error::{Error, Result};
use crate::key::PublicKey;
use crate::math::{ceil_div, floor_div, saturating_sub};

/// Closed range [low, high] known to contain the plaintext
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    low: BigUint,
    high: BigUint,
}

impl Interval {
    /// Create a new interval, None if low > high
    pub fn new(low: BigUint, high: BigUint) -> Option<Self> {
        if low <= high {
            Some(Self { low, high })
        } else {
            None
        }
    }

    pub fn low(&self) -> &BigUint {
        &self.low
    }

    pub fn high(&self) -> &BigUint {
        &self.high
    }

    pub fn contains(&self, x: &BigUint) -> bool {
        &self.low <= x && x <= &self.high
    }

    /// Number of integers in the interval
    pub fn width(&self) -> BigUint {
        &self.high - &self.low + 1_u8
    }

    pub fn is_point(&self) -> bool {
        self.low == self.high
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}

/// Disjoint, coalesced set of intervals containing the plaintext
///
/// Ranges are kept sorted by their lower bound. Overlapping and adjacent
/// ranges are merged on every update, so no two held ranges touch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntervalSet {
    ranges: Vec<Interval>,
}

impl IntervalSet {
    /// Create an empty (uninitialized) set
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with the conformant range [2B, 3B - 1]
    pub fn initialize(&mut self, key: &PublicKey) {
        self.ranges.clear();
        self.ranges.push(Interval {
            low: key.two_b().clone(),
            high: key.three_b() - 1_u8,
        });
    }

    /// Narrow the set after multiplier s produced a conformant response
    ///
    /// For each held [a, b] and each r in
    /// ceil((a*s - 3B + 1) / n) ..= floor((b*s - 2B) / n), keeps
    /// [max(a, ceil((2B + r*n) / s)), min(b, floor((3B - 1 + r*n) / s))].
    ///
    /// errors: returns Error::InvariantViolation if nothing survives. The set
    /// is left untouched in that case.
    pub fn narrow(&mut self, s: &BigUint, key: &PublicKey) -> Result<()> {
        let n = key.n();
        let two_b = key.two_b();
        let three_b_1 = key.three_b() - 1_u8;

        let mut next: Vec<Interval> = Vec::new();
        for iv in self.ranges.iter() {
            let a_s = &iv.low * s;
            let b_s = &iv.high * s;
            if &b_s < two_b {
                continue;
            }

            // r = floor(m*s / n) >= 0 for the true plaintext, so clamp at zero
            let mut r = ceil_div(&saturating_sub(&(&a_s + 1_u8), key.three_b()), n);
            let r_hi = floor_div(&(&b_s - two_b), n);

            while r <= r_hi {
                let rn = &r * n;
                let lo = core::cmp::max(iv.low.clone(), ceil_div(&(two_b + &rn), s));
                let hi = core::cmp::min(iv.high.clone(), floor_div(&(&three_b_1 + &rn), s));

                if let Some(iv) = Interval::new(lo, hi) {
                    next.push(iv);
                }
                r += BigUint::one();
            }
        }

        if next.is_empty() {
            return Err(Error::InvariantViolation {
                multiplier: s.clone(),
            });
        }

        self.ranges = coalesce(next);
        Ok(())
    }

    /// True when exactly one range remains and it holds a single integer
    pub fn is_singleton(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_point()
    }

    /// The recovered integer once the set is a singleton
    pub fn singleton(&self) -> Option<&BigUint> {
        if self.is_singleton() {
            Some(&self.ranges[0].low)
        } else {
            None
        }
    }

    /// Number of disjoint ranges
    pub fn count(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether any held range contains x
    pub fn contains(&self, x: &BigUint) -> bool {
        self.ranges.iter().any(|iv| iv.contains(x))
    }

    /// Total number of candidate integers
    pub fn size(&self) -> BigUint {
        self.ranges.iter().map(Interval::width).sum()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Interval> {
        self.ranges.iter()
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.ranges
    }
}

impl<'a> IntoIterator for &'a IntervalSet {
    type Item = &'a Interval;
    type IntoIter = core::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, iv) in self.ranges.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", iv)?;
        }
        f.write_str("}")
    }
}

// Sort by lower bound and merge overlapping or adjacent ranges
fn coalesce(mut ranges: Vec<Interval>) -> Vec<Interval> {
    ranges.sort();

    let mut merged: Vec<Interval> = Vec::with_capacity(ranges.len());
    for iv in ranges.into_iter() {
        match merged.last_mut() {
            Some(last) if iv.low <= &last.high + 1_u8 => {
                if iv.high > last.high {
                    last.high = iv.high;
                }
            }
            _ => merged.push(iv),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> PublicKey {
        PublicKey::new(BigUint::from(67_591_u32), BigUint::from(65_537_u32), 3).unwrap()
    }

    fn iv(low: u32, high: u32) -> Interval {
        Interval::new(BigUint::from(low), BigUint::from(high)).unwrap()
    }

    #[test]
    fn coalesce_ranges() {
        let merged = coalesce([iv(10, 12), iv(1, 3), iv(4, 5), iv(11, 20), iv(30, 30)].to_vec());
        assert_eq!(merged, [iv(1, 5), iv(10, 20), iv(30, 30)]);

        let nested = coalesce([iv(1, 10), iv(2, 3)].to_vec());
        assert_eq!(nested, [iv(1, 10)]);

        assert!(Interval::new(BigUint::from(2_u8), BigUint::from(1_u8)).is_none());
    }

    #[test]
    fn initialize() {
        let mut set = IntervalSet::new();
        assert!(set.is_empty());

        set.initialize(&toy());
        assert_eq!(set.as_slice(), [iv(512, 767)]);
        assert_eq!(set.count(), 1);
        assert!(!set.is_singleton());
        assert_eq!(set.size(), BigUint::from(256_u32));
    }

    #[test]
    fn narrowing_keeps_plaintext() {
        let key = toy();
        let n = 67_591_u64;

        // every conformant plaintext, every multiplier that keeps it conformant
        for m in 512_u64..768 {
            for s in 89_u64..1_500 {
                let ms = m * s % n;
                if ms < 512 || ms >= 768 {
                    continue;
                }
                let mut set = IntervalSet::new();
                set.initialize(&key);
                set.narrow(&BigUint::from(s), &key).unwrap();
                assert!(set.contains(&BigUint::from(m)), "m: {}, s: {}, set: {}", m, s, set);
            }
        }
    }

    #[test]
    fn narrowing_coalesces() {
        let key = toy();
        let mut set = IntervalSet::new();
        set.initialize(&key);
        set.narrow(&BigUint::from(500_u32), &key).unwrap();

        assert_eq!(set.as_slice(), [iv(542, 542), iv(677, 677)]);
        assert_eq!(set.count(), 2);
        assert!(!set.is_singleton());
        assert_eq!(set.singleton(), None);
    }

    #[test]
    fn inconsistent_responses() {
        let key = toy();
        let mut set = IntervalSet::new();
        set.initialize(&key);

        // no plaintext in [512, 767] stays conformant under both 500 and 501
        set.narrow(&BigUint::from(500_u32), &key).unwrap();
        let before = set.clone();
        match set.narrow(&BigUint::from(501_u32), &key) {
            Err(Error::InvariantViolation { multiplier }) => {
                assert_eq!(multiplier, BigUint::from(501_u32))
            }
            other => panic!("expected an invariant violation, got {:?}", other),
        }
        assert_eq!(set, before);

        // no plaintext at all is conformant under 134
        let mut set = IntervalSet::new();
        set.initialize(&key);
        assert!(set.narrow(&BigUint::from(134_u32), &key).is_err());
    }
}
