//! Failure type for operations that allocate a bucket array or an entry.
//!
//! Allocation is the only fallible step in the set. Every method that may grow
//! comes in two versions: a `try_xxx` one returning `Result<_, Failure>`, and
//! a plain `xxx` one that panics with the `Failure` message, as `Vec` does.

use std::collections::TryReserveError;
use std::{error, fmt};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    /// The bucket count needed for the request does not fit in `usize`.
    CapacityOverflow,
    /// The allocator refused the new bucket array or room for a new entry.
    Alloc(TryReserveError),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::CapacityOverflow => f.write_str("bucket count overflows usize"),
            Failure::Alloc(e) => write!(f, "bucket array allocation failed: {}", e),
        }
    }
}

impl error::Error for Failure {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Failure::CapacityOverflow => None,
            Failure::Alloc(e) => Some(e),
        }
    }
}

impl From<TryReserveError> for Failure {
    fn from(e: TryReserveError) -> Self {
        Failure::Alloc(e)
    }
}

pub type Result<T> = core::result::Result<T, Failure>;
