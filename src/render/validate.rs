//! Denylist check for formula source
//!
//! A coarse substring filter run before any file is written or process
//! spawned. It does not parse LaTeX.

use crate::error::{TracMathError, TracMathResult};

/// Substring denylist applied to untrusted formula source
#[derive(Debug, Clone)]
pub struct Validator {
    denylist: Vec<String>,
}

impl Validator {
    /// Create a validator for the given command substrings
    pub fn new(denylist: Vec<String>) -> Self {
        let denylist = denylist.into_iter().filter(|c| !c.is_empty()).collect();
        Self { denylist }
    }

    /// Reject source containing a denylisted command
    ///
    /// Literal `\\` pairs are removed from a scratch copy first, so a
    /// command preceded by a line break (`\\input`) is not matched.
    pub fn validate(&self, source: &str) -> TracMathResult<()> {
        match self.offending_command(source) {
            Some(command) => Err(TracMathError::Validation {
                command: command.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// First denylisted command found in `source`, in denylist order
    pub fn offending_command(&self, source: &str) -> Option<&str> {
        let unescaped = source.replace(r"\\", "");
        self.denylist
            .iter()
            .find(|command| unescaped.contains(command.as_str()))
            .map(String::as_str)
    }
}
