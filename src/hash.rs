//! The hash primitive seam.
//!
//! The core never depends on a concrete digest. Every hashed value goes
//! through a fresh [`HashInstance`] obtained from a [`HashFunction`]
//! factory, so any fixed-output digest (SHA-256, SHA-512, BLAKE2, a
//! truncated XOF) can back the scheme as long as its output length equals
//! the configured `n`.
//!
//! Instances are single-use and not thread safe; the core creates one per
//! hashed value and never shares them across threads.

use crate::error::HashError;

pub mod sha2;
pub mod shake;

/// Factory for hash instances with a fixed digest length.
pub trait HashFunction: Send + Sync {
    /// Digest length in bytes. Must equal the configured WOTS+ parameter `n`.
    fn digest_length(&self) -> usize;

    /// Creates a fresh instance ready to absorb input.
    fn new_instance(&self) -> Box<dyn HashInstance>;
}

/// A single-use, stateful hash computation.
///
/// Accepts repeated [`absorb`](Self::absorb) calls followed by exactly one
/// [`finalize`](Self::finalize). Misuse fails distinctly so callers can
/// surface the violation: operating on a finalized instance yields
/// [`HashError::AlreadyFinalized`], and a destination shorter than the
/// digest yields [`HashError::ShortDestination`].
pub trait HashInstance {
    /// Feeds `data` into the hash state.
    fn absorb(&mut self, data: &[u8]) -> Result<(), HashError>;

    /// Writes the digest into the front of `dest` and consumes the state.
    fn finalize(&mut self, dest: &mut [u8]) -> Result<(), HashError>;
}
