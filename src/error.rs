//! Error types surfaced by the builder (precondition violations) and the
//! solver (runtime violations). Nothing is retried; the first failure wins.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A fully-determined constraint does not hold. The index refers to the
    /// global constraint numbering, so the debug map can point back at the
    /// user code that emitted it.
    #[error("constraint #{index} is not satisfied: {lhs} != {rhs}")]
    UnsatisfiedConstraint {
        index: u32,
        lhs: String,
        rhs: String,
    },

    /// No instruction can assign this wire; the solver made a full pass over
    /// the remaining instructions without progress.
    #[error("wire {wire_id} cannot be determined by any instruction")]
    UnderdeterminedWire { wire_id: u32 },

    /// A wire would be overwritten with a different value. Wire assignment is
    /// write-once.
    #[error("wire {wire_id} assigned twice with different values")]
    DoubleAssignment { wire_id: u32 },

    /// A hint function returned an error. Fatal; no fallback oracle exists.
    #[error("hint {hint_id:#018x} failed: {cause}")]
    HintFailed { hint_id: u64, cause: Box<Error> },

    /// Calldata does not round-trip through the blueprint, or references data
    /// outside the buffer.
    #[error("blueprint {blueprint_id}: invalid encoding: {reason}")]
    InvalidEncoding { blueprint_id: u32, reason: String },

    /// A bit-size divisibility precondition was violated at builder time.
    #[error("invalid bit size: {0}")]
    InvalidBitSize(String),

    /// A value does not fit in the declared number of bits.
    #[error("value {value} does not fit in {nb_bits} bits")]
    OutOfRange { value: String, nb_bits: usize },

    /// A lookup query index is outside the table.
    #[error("lookup index {index} out of bounds for table of {table_size} entries")]
    LookupOutOfBounds { index: String, table_size: usize },

    /// An unknown hint id was encountered at solve time.
    #[error("hint {hint_id:#018x} is not registered")]
    UnknownHint { hint_id: u64 },

    /// Free-form message for hint implementations that fail for reasons the
    /// other variants do not cover.
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Wraps an error coming out of a hint function.
    pub fn hint(hint_id: u64, cause: Error) -> Self {
        Error::HintFailed {
            hint_id,
            cause: Box::new(cause),
        }
    }
}
