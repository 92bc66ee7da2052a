#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod bytes;
pub mod calibration;
pub mod controller;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod interval;
pub mod key;
pub mod math;
pub mod oracle;
pub mod pkcs1;

pub use controller::{CancelToken, Outcome, Progress, Recovery, SearchConfig, SearchController, Snapshot};
pub use engine::{NarrowingEngine, Phase, PhaseKind, Transition};
pub use error::{Error, Result};
pub use interval::{Interval, IntervalSet};
pub use key::{ConfigError, PrivateKey, PublicKey};
pub use oracle::{PaddingOracle, Response};
