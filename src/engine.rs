use core::fmt;

use num::bigint::BigUint;

use crate::error::Result;
use crate::interval::IntervalSet;
use crate::key::PublicKey;
use crate::math::{ceil_div, floor_div, saturating_sub};
use crate::oracle::Response;

/// Multiplier search state
///
/// Each searching phase holds the multiplier that will be tried next.
#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    /// Step 2a: s counts up from ceil(n / 3B) until the first conformant hit
    Initial { s: BigUint },
    /// Step 2b: s counts up from the last conformant multiplier
    MultiInterval { s: BigUint },
    /// Step 2c: s walks [ceil((2B + rn) / b), floor((3B - 1 + rn) / a)], then r moves on
    SingleInterval {
        r: BigUint,
        s: BigUint,
        s_max: BigUint,
    },
    /// The interval set holds a single integer
    Converged,
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Initial { .. } => PhaseKind::Initial,
            Phase::MultiInterval { .. } => PhaseKind::MultiInterval,
            Phase::SingleInterval { .. } => PhaseKind::SingleInterval,
            Phase::Converged => PhaseKind::Converged,
        }
    }
}

/// Phase tag without the search state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Initial,
    MultiInterval,
    SingleInterval,
    Converged,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseKind::Initial => "initial search",
            PhaseKind::MultiInterval => "multi-interval search",
            PhaseKind::SingleInterval => "single-interval search",
            PhaseKind::Converged => "converged",
        };
        f.write_str(name)
    }
}

/// Effect of one oracle response on the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed, the same multiplier is up next
    Unchanged,
    /// The candidate multiplier moved on
    Advanced,
    /// A conformant response narrowed the set to `count` ranges
    Narrowed { count: usize },
    /// The set collapsed to the plaintext
    Converged,
}

/// Bleichenbacher's three step search over a target's interval set
///
/// The engine never talks to an oracle itself. Callers fetch the candidate
/// with [`next_multiplier`](Self::next_multiplier), blind the target with it,
/// and feed the oracle's answer back through [`observe`](Self::observe).
#[derive(Clone, Debug)]
pub struct NarrowingEngine {
    key: PublicKey,
    intervals: IntervalSet,
    phase: Phase,
}

impl NarrowingEngine {
    /// Create a new engine in the initial search phase
    pub fn new(key: &PublicKey) -> Self {
        let s = ceil_div(key.n(), key.three_b());
        Self {
            key: key.clone(),
            intervals: IntervalSet::new(),
            phase: Phase::Initial { s },
        }
    }

    pub fn key(&self) -> &PublicKey {
        &self.key
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn intervals(&self) -> &IntervalSet {
        &self.intervals
    }

    pub fn is_converged(&self) -> bool {
        self.phase == Phase::Converged
    }

    /// Multiplier to query next, None once converged
    pub fn next_multiplier(&self) -> Option<&BigUint> {
        match &self.phase {
            Phase::Initial { s } | Phase::MultiInterval { s } | Phase::SingleInterval { s, .. } => {
                Some(s)
            }
            Phase::Converged => None,
        }
    }

    /// The recovered plaintext integer once converged
    pub fn plaintext(&self) -> Option<&BigUint> {
        if self.is_converged() {
            self.intervals.singleton()
        } else {
            None
        }
    }

    /// Feed the oracle's answer for the current multiplier
    ///
    /// Inconclusive answers leave the engine untouched, so the same multiplier
    /// can be asked again.
    ///
    /// errors: returns Error::InvariantViolation when a conformant answer
    /// contradicts the earlier ones. State is unchanged in that case.
    pub fn observe(&mut self, response: Response) -> Result<Transition> {
        match response {
            Response::Inconclusive => Ok(Transition::Unchanged),
            Response::NonConformant => Ok(self.advance()),
            Response::Conformant => self.narrow(),
        }
    }

    fn advance(&mut self) -> Transition {
        let r = match &mut self.phase {
            Phase::Initial { s } | Phase::MultiInterval { s } => {
                *s += 1_u8;
                return Transition::Advanced;
            }
            Phase::SingleInterval { r, s, s_max } => {
                *s += 1_u8;
                if s <= s_max {
                    return Transition::Advanced;
                }
                r.clone() + 1_u8
            }
            Phase::Converged => return Transition::Unchanged,
        };

        if let Some(iv) = self.intervals.as_slice().first() {
            self.phase = single_interval(&self.key, iv.low(), iv.high(), r);
            if let Phase::SingleInterval { r, s, s_max } = &self.phase {
                tracing::debug!(r = %r, s = %s, s_max = %s_max, "multiplier range exhausted");
            }
        }
        Transition::Advanced
    }

    fn narrow(&mut self) -> Result<Transition> {
        let s = match &self.phase {
            Phase::Initial { s } | Phase::MultiInterval { s } | Phase::SingleInterval { s, .. } => {
                s.clone()
            }
            Phase::Converged => return Ok(Transition::Unchanged),
        };

        if let Phase::Initial { .. } = self.phase {
            let mut set = IntervalSet::new();
            set.initialize(&self.key);
            set.narrow(&s, &self.key)?;
            self.intervals = set;
        } else {
            self.intervals.narrow(&s, &self.key)?;
        }

        let before = self.phase.kind();
        let count = self.intervals.count();
        self.phase = match self.intervals.as_slice() {
            [iv] if iv.is_point() => Phase::Converged,
            [iv] => {
                // r = ceil(2 (b*s - 2B) / n)
                let bs = iv.high() * &s;
                let r = ceil_div(&(saturating_sub(&bs, self.key.two_b()) * 2_u8), self.key.n());
                single_interval(&self.key, iv.low(), iv.high(), r)
            }
            _ => Phase::MultiInterval { s: s + 1_u8 },
        };

        let after = self.phase.kind();
        if before != after {
            tracing::debug!(from = %before, to = %after, "phase change");
        }

        if self.is_converged() {
            Ok(Transition::Converged)
        } else {
            Ok(Transition::Narrowed { count })
        }
    }
}

// First r at or past the given one whose multiplier range for [a, b] is non-empty
fn single_interval(key: &PublicKey, a: &BigUint, b: &BigUint, mut r: BigUint) -> Phase {
    let three_b_1 = key.three_b() - 1_u8;
    loop {
        let rn = &r * key.n();
        let s = ceil_div(&(key.two_b() + &rn), b);
        let s_max = floor_div(&(&three_b_1 + &rn), a);
        if s <= s_max {
            return Phase::SingleInterval { r, s, s_max };
        }
        r += 1_u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use num::ToPrimitive;

    use crate::error::Error;
    use crate::interval::Interval;

    fn toy() -> PublicKey {
        PublicKey::new(BigUint::from(67_591_u32), BigUint::from(65_537_u32), 3).unwrap()
    }

    fn big(x: u32) -> BigUint {
        BigUint::from(x)
    }

    // m * s mod n lands in [2B, 3B)
    fn conformant(m: u64, s: &BigUint) -> Response {
        let s = s.to_u64().unwrap();
        let ms = m * s % 67_591;
        Response::from(ms >= 512 && ms < 768)
    }

    #[test]
    fn initial_search() {
        let mut engine = NarrowingEngine::new(&toy());
        assert_eq!(engine.phase(), &Phase::Initial { s: big(89) });
        assert!(engine.intervals().is_empty());

        assert_eq!(engine.observe(Response::Inconclusive).unwrap(), Transition::Unchanged);
        assert_eq!(engine.next_multiplier(), Some(&big(89)));

        assert_eq!(engine.observe(Response::NonConformant).unwrap(), Transition::Advanced);
        assert_eq!(engine.next_multiplier(), Some(&big(90)));
    }

    #[test]
    fn first_hit_narrows() {
        let mut engine = NarrowingEngine::new(&toy());
        engine.phase = Phase::Initial { s: big(500) };

        assert_eq!(
            engine.observe(Response::Conformant).unwrap(),
            Transition::Narrowed { count: 2 }
        );
        assert_eq!(engine.phase(), &Phase::MultiInterval { s: big(501) });
        assert!(engine.intervals().contains(&big(677)));
    }

    #[test]
    fn single_interval_search() {
        let key = toy();
        let mut engine = NarrowingEngine::new(&key);
        engine.intervals.initialize(&key);

        // [512, 767] after a hit on 500: r = 12, s in [1059, 1585]
        let bs = big(767 * 500);
        let r = ceil_div(&((bs - key.two_b()) * 2_u8), key.n());
        engine.phase = single_interval(&key, &big(512), &big(767), r);
        assert_eq!(
            engine.phase(),
            &Phase::SingleInterval { r: big(12), s: big(1059), s_max: big(1585) }
        );

        engine.phase = Phase::SingleInterval { r: big(12), s: big(1585), s_max: big(1585) };
        assert_eq!(engine.observe(Response::NonConformant).unwrap(), Transition::Advanced);
        assert_eq!(
            engine.phase(),
            &Phase::SingleInterval { r: big(13), s: big(1147), s_max: big(1717) }
        );
    }

    #[test]
    fn converges_on_plaintext() {
        let mut engine = NarrowingEngine::new(&toy());
        let mut queries = 0;

        while let Some(s) = engine.next_multiplier() {
            let response = conformant(677, s);
            engine.observe(response).unwrap();
            queries += 1;
            assert!(engine.intervals().is_empty() || engine.intervals().contains(&big(677)));
            assert!(queries < 10_000);
        }

        assert!(engine.is_converged());
        assert_eq!(engine.plaintext(), Some(&big(677)));
        assert_eq!(engine.intervals().as_slice(), [Interval::new(big(677), big(677)).unwrap()]);
        assert_eq!(engine.observe(Response::Conformant).unwrap(), Transition::Unchanged);
    }

    #[test]
    fn contradiction_keeps_state() {
        let mut engine = NarrowingEngine::new(&toy());
        engine.phase = Phase::Initial { s: big(500) };
        engine.observe(Response::Conformant).unwrap();

        let before = engine.intervals().clone();
        match engine.observe(Response::Conformant) {
            Err(Error::InvariantViolation { multiplier }) => assert_eq!(multiplier, big(501)),
            other => panic!("expected an invariant violation, got {:?}", other),
        }
        assert_eq!(engine.intervals(), &before);
        assert_eq!(engine.phase(), &Phase::MultiInterval { s: big(501) });
    }
}
