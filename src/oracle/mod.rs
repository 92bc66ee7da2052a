use alloc::boxed::Box;
use alloc::sync::Arc;

use num::bigint::BigUint;

mod local;
#[cfg(feature = "std")]
mod command;

pub use local::*;
#[cfg(feature = "std")]
pub use command::*;

/// Answer of a padding oracle for one ciphertext
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Response {
    /// Decryption starts with 00 02
    Conformant,
    /// Decryption does not start with 00 02
    NonConformant,
    /// The query could not be classified (transport failure, ambiguous signal)
    Inconclusive,
}

impl Response {
    pub fn is_conformant(self) -> bool {
        self == Response::Conformant
    }

    pub fn is_inconclusive(self) -> bool {
        self == Response::Inconclusive
    }
}

impl From<bool> for Response {
    fn from(conformant: bool) -> Self {
        if conformant {
            Response::Conformant
        } else {
            Response::NonConformant
        }
    }
}

/// A system leaking whether a ciphertext decrypts to a 00 02 prefixed block
///
/// Implementations must answer consistently: the same ciphertext always gets
/// the same conformant / non-conformant answer. Anything that cannot be
/// decided must be reported as [`Response::Inconclusive`], never guessed.
pub trait PaddingOracle {
    /// Query the oracle with a ciphertext integer below the modulus
    fn query(&self, ciphertext: &BigUint) -> Response;
}

/// Oracle backed by a closure, see [`from_fn`]
#[derive(Clone, Copy, Debug)]
pub struct FnOracle<F>(F);

/// Wrap a closure as a padding oracle
pub fn from_fn<F>(f: F) -> FnOracle<F>
where
    F: Fn(&BigUint) -> Response,
{
    FnOracle(f)
}

impl<F> PaddingOracle for FnOracle<F>
where
    F: Fn(&BigUint) -> Response,
{
    fn query(&self, ciphertext: &BigUint) -> Response {
        (self.0)(ciphertext)
    }
}

impl<O: PaddingOracle + ?Sized> PaddingOracle for &O {
    fn query(&self, ciphertext: &BigUint) -> Response {
        (**self).query(ciphertext)
    }
}

impl<O: PaddingOracle + ?Sized> PaddingOracle for Box<O> {
    fn query(&self, ciphertext: &BigUint) -> Response {
        (**self).query(ciphertext)
    }
}

impl<O: PaddingOracle + ?Sized> PaddingOracle for Arc<O> {
    fn query(&self, ciphertext: &BigUint) -> Response {
        (**self).query(ciphertext)
    }
}
