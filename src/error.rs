use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Failures surfaced by the WOTS+ / XMSS core.
///
/// Verification mismatches are *not* errors: `verify` returns `Ok(false)`
/// for a wrong root or a tampered signature. Errors are reserved for
/// caller-side precondition violations, hash primitive failures, and
/// internal invariant violations that indicate a bug.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// A caller-side precondition was violated (wrong buffer size, index
    /// out of range, unsupported parameter). Raised before any hashing.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Every WOTS+ leaf of the stateful XMSS private key has been used.
    #[error("WOTS+ leaves have been exhausted")]
    KeyExhausted,

    /// The caller-supplied hash primitive failed.
    #[error("hash primitive failed in {primitive}: {source}")]
    Hash {
        /// The keyed-hash primitive that invoked the hash function.
        primitive: &'static str,
        #[source]
        source: HashError,
    },

    /// An internal invariant was violated. This indicates a bug in the
    /// library, not bad input.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        Error::Argument(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Error::Invariant(msg.into())
    }

    pub(crate) fn hash(primitive: &'static str, source: HashError) -> Self {
        Error::Hash { primitive, source }
    }
}

/// Failure of a single hash instance, reported by a [`crate::hash::HashInstance`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HashError {
    /// `absorb` or `finalize` was called after the instance was finalized.
    #[error("hash instance already finalized")]
    AlreadyFinalized,

    /// The destination buffer cannot hold a full digest.
    #[error("digest destination too short: expected {expected} bytes, found {found}")]
    ShortDestination { expected: usize, found: usize },

    /// The underlying implementation failed.
    #[error("{0}")]
    Backend(String),
}
