//! # xmss
//!
//! Hash-based digital signatures per RFC 8391: **WOTS+** (Winternitz
//! One-Time Signature Plus) and **XMSS** (eXtended Merkle Signature
//! Scheme), built over a caller-supplied hash primitive.
//!
//! Unlike signature schemes that rely on conjectured hardness of number-
//! theoretic problems, these schemes reduce to the security of a hash
//! function alone, which makes them a conservative choice against quantum
//! adversaries. WOTS+ signs exactly one message per key; XMSS turns `2^h`
//! WOTS+ keys into one stateful key whose public key is a Merkle root.
//!
//! The crate is purely computational: callers supply raw seed bytes and
//! carry the responsibility of durably advancing the XMSS leaf index after
//! every signature. There is no entropy source, no transport and no
//! persistence in here.
//!
//! ## Hash primitive
//!
//! Every digest is produced through the [`hash::HashFunction`] /
//! [`hash::HashInstance`] seam, so the schemes are generic over the
//! underlying hash. Adapters for SHA-256, SHA-512 and SHAKE-256 ship in
//! [`hash::sha2`] and [`hash::shake`].
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use xmss::hash::sha2::Sha256Hash;
//! use xmss::{Xmss, XmssConfig, WotsConfig};
//!
//! # fn main() -> xmss::Result<()> {
//! let wots = WotsConfig::compact_32(Arc::new(Sha256Hash))?;
//! let config = XmssConfig::new(None, wots, 4)?;
//!
//! // Seeds come from the caller; use a real entropy source.
//! let compact_seeds = vec![7u8; config.compact_private_keys_length()];
//! let sk_prf = vec![8u8; 32];
//! let public_seed = vec![9u8; 32];
//!
//! let pair = Xmss::key_pair(&config, &compact_seeds, &sk_prf, &public_seed, false, 1)?;
//!
//! let msg = [0u8; 32];
//! let signature = Xmss::sign(&config, &msg, &pair.private_key, None)?;
//! // Persist the advanced key BEFORE releasing the signature.
//! let _next_key = pair.private_key.increment_idx()?;
//!
//! assert!(Xmss::verify(&config, &msg, &signature, &pair.public_key)?);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod hash;
pub mod utils;
pub mod wots_plus;
pub mod xmss;

pub use error::{Error, HashError, Result};
pub use wots_plus::{WotsConfig, WotsPlus};
pub use xmss::config::XmssConfig;
pub use xmss::keys::{XmssPrivateKey, XmssPublicKey, XmssSignature, XmssTree};
pub use xmss::{KeyPair, Xmss};
