use std::boxed::Box;
use std::ffi::OsString;
use std::process::{Command, Output, Stdio};
use std::string::String;
use std::vec::Vec;

use num::bigint::BigUint;

use crate::bytes;
use crate::encoding;

use super::{PaddingOracle, Response};

/// Argument placeholder replaced by the hex-encoded ciphertext
pub const CIPHERTEXT_PLACEHOLDER: &str = "{}";

type Classifier = Box<dyn Fn(&Output) -> Response + Send + Sync>;

/// Padding oracle that runs an external program once per query
///
/// Every argument equal to `{}` is replaced by the ciphertext as 2k lowercase
/// hex digits. The finished process is mapped to a [`Response`] by the
/// classifier; a program that cannot be spawned is inconclusive.
pub struct CommandOracle {
    program: OsString,
    args: Vec<String>,
    k: usize,
    classify: Classifier,
}

impl CommandOracle {
    /// Create a new oracle running program for a k-byte modulus
    ///
    /// Defaults to treating exit code 2 as a bad header.
    pub fn new<S: Into<OsString>>(program: S, k: usize) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            k,
            classify: Box::new(exit_code_classifier(2)),
        }
    }

    /// Append an argument, `{}` is substituted with the ciphertext
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replace the process classifier
    pub fn classifier<F>(mut self, f: F) -> Self
    where
        F: Fn(&Output) -> Response + Send + Sync + 'static,
    {
        self.classify = Box::new(f);
        self
    }

    fn render(&self, ciphertext: &BigUint) -> Vec<String> {
        let hex = encoding::to_hex(&bytes::to_fixed_be(ciphertext, self.k));
        self.args
            .iter()
            .map(|a| {
                if a == CIPHERTEXT_PLACEHOLDER {
                    hex.clone()
                } else {
                    a.clone()
                }
            })
            .collect()
    }
}

impl PaddingOracle for CommandOracle {
    fn query(&self, ciphertext: &BigUint) -> Response {
        let output = Command::new(&self.program)
            .args(self.render(ciphertext))
            .stdin(Stdio::null())
            .output();

        match output {
            Ok(out) => (self.classify)(&out),
            Err(err) => {
                tracing::warn!(error = %err, "oracle process failed to run");
                Response::Inconclusive
            }
        }
    }
}

/// Classifier keyed on the exit code of the oracle process
///
/// `bad_header` is non-conformant, any other exit code is conformant, and a
/// process killed by a signal is inconclusive.
pub fn exit_code_classifier(bad_header: i32) -> impl Fn(&Output) -> Response + Send + Sync {
    move |out: &Output| match out.status.code() {
        Some(code) if code == bad_header => Response::NonConformant,
        Some(_) => Response::Conformant,
        None => Response::Inconclusive,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let c = BigUint::from(0x02a5_u32);

        let bad = CommandOracle::new("sh", 3).arg("-c").arg("exit 2");
        assert_eq!(bad.query(&c), Response::NonConformant);

        let good = CommandOracle::new("sh", 3).arg("-c").arg("exit 3");
        assert_eq!(good.query(&c), Response::Conformant);

        let missing = CommandOracle::new("/nonexistent/oracle", 3);
        assert_eq!(missing.query(&c), Response::Inconclusive);
    }

    #[test]
    fn ciphertext_argument() {
        let c = BigUint::from(0x02a5_u32);

        // "$1" is the first argument after the script when run via sh -c
        let oracle = CommandOracle::new("sh", 3)
            .arg("-c")
            .arg("test \"$1\" = 0002a5")
            .arg("sh")
            .arg(CIPHERTEXT_PLACEHOLDER)
            .classifier(|out: &Output| Response::from(out.status.success()));
        assert_eq!(oracle.query(&c), Response::Conformant);
        assert_eq!(oracle.query(&BigUint::from(1_u8)), Response::NonConformant);
    }
}
