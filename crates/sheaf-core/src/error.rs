use std::fmt;

use crate::partitioning::Partitioning;

/// Coarse classification of an [`Error`].
///
/// Every error this workspace produces is a local logic error: the caller
/// asked for something the current container layout cannot satisfy. The kind
/// says which rule was broken so callers can react without matching on every
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Two containers that must share a layout do not, or an input violated a
    /// documented precondition.
    PreconditionViolation,
    /// A batch or element index beyond the current bounds.
    OutOfRange,
    /// A malformed argument such as a split offset or an index set entry.
    InvalidArgument,
    /// Lock poisoning and other failures not caused by the arguments.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::PreconditionViolation => "precondition violation",
            ErrorKind::OutOfRange => "out of range",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// All errors that can occur within sheaf.
///
/// A single error type is shared by every container so that structural
/// operations on composite containers (labeled, weighted) can propagate
/// failures from either side with `?`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two co-located containers have different batch layouts.
    #[error("partitioning mismatch in {context}: {left} vs {right}")]
    PartitioningMismatch {
        context: &'static str,
        left: Partitioning,
        right: Partitioning,
    },

    /// Two element sequences that must have the same length do not.
    #[error("element count mismatch in {context}: expected {expected}, got {got}")]
    ElementCountMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// A class label is not below the declared number of classes.
    #[error("label {label} out of range for {num_classes} classes")]
    LabelOutOfRange { label: usize, num_classes: usize },

    /// Batch index beyond the number of batches.
    #[error("batch index {index} out of range for container with {size} batches")]
    BatchOutOfRange { index: usize, size: usize },

    /// Element index beyond the number of elements.
    #[error("element index {index} out of range for container with {len} elements")]
    ElementOutOfRange { index: usize, len: usize },

    /// Split offset not strictly inside the batch.
    #[error("cannot split batch {batch} of size {size} at offset {offset}")]
    InvalidSplit {
        batch: usize,
        offset: usize,
        size: usize,
    },

    /// An index set entry does not address an element.
    #[error("index set entry {index} out of range for container with {len} elements")]
    InvalidIndex { index: usize, len: usize },

    /// A batch lock was poisoned by a panicking writer.
    #[error("batch storage lock poisoned")]
    Poisoned,

    /// A batch is already locked, usually through a guard obtained from an
    /// aliasing container. Container operations never block.
    #[error("batch storage is locked elsewhere")]
    Busy,

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PartitioningMismatch { .. }
            | Error::ElementCountMismatch { .. }
            | Error::LabelOutOfRange { .. } => ErrorKind::PreconditionViolation,
            Error::BatchOutOfRange { .. } | Error::ElementOutOfRange { .. } => {
                ErrorKind::OutOfRange
            }
            Error::InvalidSplit { .. } | Error::InvalidIndex { .. } => ErrorKind::InvalidArgument,
            Error::Poisoned | Error::Busy | Error::Msg(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience Result type used throughout sheaf.
pub type Result<T> = std::result::Result<T, Error>;

/// Macro for early return with a formatted error message.
/// Usage: `bail!("something went wrong: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}
