use std::fmt;

use super::script::SignatureCounter;
use crate::error::{Result, WalletCliError};

/// Signatures present versus signatures required for one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SigningProgress {
    pub have: usize,
    pub need: usize,
}

impl SigningProgress {
    pub fn new(have: usize, need: usize) -> Self {
        SigningProgress { have, need }
    }

    /// No further signatures are needed. Covers both an assembled
    /// verification payload `(0, 0)` and a fully signed `(n, n)`.
    pub fn is_complete(&self) -> bool {
        self.have == self.need
    }
}

impl fmt::Display for SigningProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} / {}]", self.have, self.need)
    }
}

/// Classify a redeem script and its signature parameter.
pub fn classify(counter: &dyn SignatureCounter, code: &[u8], param: &[u8]) -> Result<SigningProgress> {
    let (have, need) = counter.raw_counts(code, param)?;
    if have > 0 || need > 0 {
        return Ok(SigningProgress::new(have, need));
    }
    match (code.is_empty(), param.is_empty()) {
        // Smart contract verification script still waiting for its parameter.
        (false, true) => Ok(SigningProgress::new(0, 1)),
        (false, false) => Ok(SigningProgress::new(0, 0)),
        _ => Err(WalletCliError::ScriptClassification(
            "invalid script type".into(),
        )),
    }
}
