//! Error types for floor-stack design.
//!
//! Every error here is fatal to the design that raised it. The only retry in
//! the crate is the candidate-exhaustion loop of the weighted tag selector.

/// Errors raised while designing a building's floor stack.
#[derive(Debug, thiserror::Error)]
pub enum DesignError {
    /// No candidate tag set resolved to a script.
    #[error("no script found for any of {candidates} candidate tag sets")]
    SelectionFailed { candidates: usize },

    /// A `SingleOrFail` reference did not resolve to exactly one match.
    #[error("reference expected exactly one match, found {matches}")]
    AmbiguousReference { matches: usize },

    /// An integer value generator's bounds admit no integer.
    #[error("value range [{min}, {max}] contains no integer")]
    InvalidRange { min: f32, max: f32 },

    /// The spec graph has an invalid shape.
    #[error("malformed building spec: {0}")]
    MalformedSpec(String),

    /// A regex id reference failed to compile.
    #[error("invalid id pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl DesignError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedSpec(message.into())
    }
}

pub type DesignResult<T> = Result<T, DesignError>;
