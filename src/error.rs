use num::bigint::BigUint;

use crate::key::ConfigError;
use crate::pkcs1;

/// Attack errors
///
/// Cancellation and an exhausted query budget are not errors, see [`crate::Outcome`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed key material or target, never retried
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The oracle could not classify a query within the configured retry budget
    #[error("oracle inconclusive at iteration {iteration} after {attempts} attempt(s)")]
    OracleInconclusive { iteration: u64, attempts: u32 },

    /// A conformant response left no integer consistent with all prior responses
    #[error(
        "interval set emptied by conformant multiplier {multiplier}: \
         oracle is inconsistent or the narrowing arithmetic is wrong"
    )]
    InvariantViolation { multiplier: BigUint },

    /// The target ciphertext was checked and the oracle reported it non-conformant
    #[error("target ciphertext is not conformant according to the oracle")]
    TargetNotConformant,

    /// The converged plaintext does not carry a PKCS#1 v1.5 structure
    #[error("recovered block is not PKCS#1 v1.5 conformant: {0}")]
    PaddingStructure(#[from] pkcs1::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
