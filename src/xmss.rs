//! # eXtended Merkle Signature Scheme (XMSS)
//!
//! XMSS (RFC 8391) turns `2^h` one-time WOTS+ keys into one stateful,
//! many-time key: each WOTS+ public key is compressed through an L-tree
//! into a Merkle leaf, and the Merkle root — together with the public seed
//! — is the public key. A signature carries the index of the WOTS+ leaf it
//! spent, message-hash randomness `r`, the WOTS+ signature, and the `h`
//! sibling nodes (the authentication path) that let the verifier rebuild
//! the root from the leaf.
//!
//! ## Statefulness
//!
//! Security rests entirely on never signing twice with the same leaf.
//! [`Xmss::sign`] does not mutate the private key; the caller MUST replace
//! its stored key with [`XmssPrivateKey::increment_idx`]'s result before
//! releasing the signature. Index durability across restarts is the
//! caller's responsibility.
//!
//! ## Tree cache
//!
//! Key generation can retain every Merkle node as an [`XmssTree`]. Signing
//! with the cache reads the authentication path in `h` node copies;
//! signing without it recomputes each sibling sub-tree, which is cheap in
//! memory and expensive in hashing. Both paths produce identical
//! signatures.

use subtle::ConstantTimeEq;

use crate::error::{Error, Result};
use crate::utils::to_byte;
use crate::wots_plus::adrs::Adrs;
use crate::xmss::config::XmssConfig;
use crate::xmss::keys::{XmssPrivateKey, XmssPublicKey, XmssSignature, XmssTree};
use crate::xmss::tree_hash::TreeHash;

pub mod config;
pub mod keys;
pub(crate) mod rfc;
pub(crate) mod tree_hash;

/// The result of XMSS key generation.
pub struct KeyPair {
    pub private_key: XmssPrivateKey,
    pub public_key: XmssPublicKey,
    /// The cached Merkle tree, present when `store_tree` was requested.
    pub tree: Option<XmssTree>,
}

/// XMSS key generation, signing and verification.
pub struct Xmss;

impl Xmss {
    /// Generates an XMSS key pair from caller-supplied seed material.
    ///
    /// `compact_private_seeds` holds one `n`-byte seed per WOTS+ leaf
    /// (`2^h * n` bytes); `sk_prf` keys the per-signature randomness;
    /// `public_seed` keys every PRF in the tree. With `store_tree` the
    /// full Merkle tree is kept for O(1) authentication-path reads. With
    /// `parallelism >= 2` the tree is built on that many worker threads;
    /// both paths yield byte-identical results.
    pub fn key_pair(
        config: &XmssConfig,
        compact_private_seeds: &[u8],
        sk_prf: &[u8],
        public_seed: &[u8],
        store_tree: bool,
        parallelism: usize,
    ) -> Result<KeyPair> {
        let n = config.wots().n();
        Self::check_compact_length(config, compact_private_seeds)?;
        Self::check_length("SK_PRF seed", sk_prf, n)?;
        Self::check_length("public seed", public_seed, n)?;

        let (root, tree) = if parallelism <= 1 {
            if store_tree {
                let mut flat = vec![0u8; config.tree_node_count() * n];
                let mut adrs = Adrs::new();
                rfc::tree_hash(
                    config,
                    0,
                    config.h(),
                    compact_private_seeds,
                    public_seed,
                    &mut adrs,
                    Some(&mut flat),
                )?;
                let tree = XmssTree::new(config.h(), n, flat)?;
                (tree.root().to_vec(), Some(tree))
            } else {
                let root = rfc::compute_root(config, compact_private_seeds, public_seed)?;
                (root, None)
            }
        } else {
            let builder = TreeHash::new(config, compact_private_seeds, public_seed);
            builder.run(store_tree, parallelism)?;
            let root = builder.root()?;
            let tree = if store_tree {
                let tree = builder.to_tree()?;
                if tree.root() != root.as_slice() {
                    return Err(Error::invariant(
                        "stored tree root does not match the computed root",
                    ));
                }
                Some(tree)
            } else {
                None
            };
            (root, tree)
        };

        let private_key = XmssPrivateKey::new(
            config,
            0,
            compact_private_seeds.to_vec(),
            sk_prf.to_vec(),
            root.clone(),
            public_seed.to_vec(),
        )?;
        let public_key = XmssPublicKey::new(config.oid(), root, public_seed.to_vec())?;

        Ok(KeyPair {
            private_key,
            public_key,
            tree,
        })
    }

    /// Computes the Merkle root without retaining any node.
    pub fn compute_root(
        config: &XmssConfig,
        compact_private_seeds: &[u8],
        public_seed: &[u8],
    ) -> Result<Vec<u8>> {
        Self::check_compact_length(config, compact_private_seeds)?;
        Self::check_length("public seed", public_seed, config.wots().n())?;
        rfc::compute_root(config, compact_private_seeds, public_seed)
    }

    /// Signs an `n`-byte message with the next unused WOTS+ leaf,
    /// RFC 8391 Algorithm 12.
    ///
    /// Fails with [`Error::KeyExhausted`] when every leaf is spent. The
    /// caller MUST advance the key with [`XmssPrivateKey::increment_idx`]
    /// before releasing the returned signature; handing out two signatures
    /// for one index forfeits security.
    pub fn sign(
        config: &XmssConfig,
        msg: &[u8],
        private_key: &XmssPrivateKey,
        tree: Option<&XmssTree>,
    ) -> Result<XmssSignature> {
        let n = config.wots().n();
        Self::check_length("message", msg, n)?;

        let idx = private_key.next_idx();
        if u64::from(idx) >= config.wotsp_count() {
            return Err(Error::KeyExhausted);
        }

        if let Some(tree) = tree {
            if tree.h() != config.h() || tree.n() != n {
                return Err(Error::argument(format!(
                    "tree cache shape (h = {}, n = {}) does not match the \
                     configuration (h = {}, n = {n})",
                    tree.h(),
                    tree.n(),
                    config.h()
                )));
            }
        }

        // r = PRF(SK_PRF, toByte(idx, 32)); M' = H_msg(r || root || toByte(idx, n), M)
        let mut key = vec![0u8; 3 * n];
        config
            .wots()
            .prf(private_key.sk_prf(), &to_byte(u64::from(idx), 32)?, &mut key[..n])?;
        key[n..2 * n].copy_from_slice(private_key.root());
        key[2 * n..].copy_from_slice(&to_byte(u64::from(idx), n)?);

        let mut msg_prime = vec![0u8; n];
        rfc::h_msg(config, &key, msg, &mut msg_prime)?;

        let mut wots_signature = vec![0u8; config.wots().key_length()];
        let mut auth = vec![0u8; config.auth_length()];
        let mut adrs = Adrs::new();
        rfc::tree_sig(
            config,
            &msg_prime,
            u64::from(idx),
            private_key.compact_private_seeds(),
            private_key.public_seed(),
            &mut adrs,
            tree,
            &mut wots_signature,
            &mut auth,
        )?;

        XmssSignature::new(config, idx, key[..n].to_vec(), wots_signature, auth)
    }

    /// Verifies a signature, RFC 8391 Algorithm 14.
    ///
    /// Size and range violations fail with [`Error::Argument`] before any
    /// hashing; a signature that does not lead back to the public root
    /// yields `Ok(false)`. The final root comparison is constant-time.
    pub fn verify(
        config: &XmssConfig,
        msg: &[u8],
        signature: &XmssSignature,
        public_key: &XmssPublicKey,
    ) -> Result<bool> {
        let n = config.wots().n();
        Self::check_length("message", msg, n)?;
        Self::check_length("public key root", public_key.root(), n)?;
        Self::check_length("public seed", public_key.public_seed(), n)?;
        Self::check_length("randomness r", signature.randomness(), n)?;
        Self::check_length(
            "WOTS+ signature",
            signature.wotsp_signature(),
            config.wots().key_length(),
        )?;
        Self::check_length(
            "authentication path",
            signature.authentication_path(),
            config.auth_length(),
        )?;

        let idx = signature.wotsp_index();
        if u64::from(idx) >= config.wotsp_count() {
            return Err(Error::argument(format!(
                "WOTS+ index {idx} is outside the leaves range {}",
                config.wotsp_count()
            )));
        }

        let mut key = vec![0u8; 3 * n];
        key[..n].copy_from_slice(signature.randomness());
        key[n..2 * n].copy_from_slice(public_key.root());
        key[2 * n..].copy_from_slice(&to_byte(u64::from(idx), n)?);

        let mut msg_prime = vec![0u8; n];
        rfc::h_msg(config, &key, msg, &mut msg_prime)?;

        let mut adrs = Adrs::new();
        let node = rfc::root_from_sig(
            config,
            &msg_prime,
            u64::from(idx),
            signature.wotsp_signature(),
            signature.authentication_path(),
            public_key.public_seed(),
            &mut adrs,
        )?;

        Ok(node.ct_eq(public_key.root()).into())
    }

    /// Registered OID for SHA-256 parameter sets, by tree height.
    pub fn oid_sha256(h: u32) -> Option<u32> {
        match h {
            10 => Some(1),
            16 => Some(2),
            20 => Some(3),
            _ => None,
        }
    }

    /// Registered OID for SHA-512 parameter sets, by tree height.
    pub fn oid_sha512(h: u32) -> Option<u32> {
        match h {
            10 => Some(4),
            16 => Some(5),
            20 => Some(6),
            _ => None,
        }
    }

    fn check_compact_length(config: &XmssConfig, compact: &[u8]) -> Result<()> {
        if compact.len() != config.compact_private_keys_length() {
            return Err(Error::argument(format!(
                "compact WOTS+ private seeds must be {} bytes long \
                 ({} leaves of {} bytes), was {}",
                config.compact_private_keys_length(),
                config.wotsp_count(),
                config.wots().n(),
                compact.len()
            )));
        }
        Ok(())
    }

    fn check_length(what: &str, buf: &[u8], expected: usize) -> Result<()> {
        if buf.len() != expected {
            return Err(Error::argument(format!(
                "{what} must be {expected} bytes long, was {}",
                buf.len()
            )));
        }
        Ok(())
    }
}
