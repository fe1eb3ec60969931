//! XMSS key, signature and tree-cache value types.
//!
//! All four types are immutable records with explicit big-endian,
//! byte-exact wire formats. Deserialization validates every length against
//! the configuration before accepting bytes.

use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::{bytes_to_u32, u32_to_bytes};
use crate::xmss::config::XmssConfig;
use crate::xmss::rfc;

fn check_available(bytes: &[u8], offset: usize, needed: usize, what: &str) -> Result<()> {
    if bytes.len() < offset + needed {
        return Err(Error::argument(format!(
            "serialized {what} needs {needed} bytes at offset {offset}, found {}",
            bytes.len().saturating_sub(offset)
        )));
    }
    Ok(())
}

/// XMSS private key:
/// `next_idx || compact WOTS+ seeds || SK_PRF || root || public seed`.
///
/// The key is stateful through `next_idx` alone. Signing does not mutate
/// the key; the caller must replace it with [`increment_idx`]'s result
/// before releasing a signature. `next_idx == 2^h` marks an exhausted key.
///
/// [`increment_idx`]: Self::increment_idx
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct XmssPrivateKey {
    next_idx: u32,
    compact_private_seeds: Vec<u8>,
    sk_prf: Vec<u8>,
    root: Vec<u8>,
    public_seed: Vec<u8>,
}

impl XmssPrivateKey {
    pub fn new(
        config: &XmssConfig,
        next_idx: u32,
        compact_private_seeds: Vec<u8>,
        sk_prf: Vec<u8>,
        root: Vec<u8>,
        public_seed: Vec<u8>,
    ) -> Result<Self> {
        let n = config.wots().n();
        if compact_private_seeds.len() != config.compact_private_keys_length() {
            return Err(Error::argument(format!(
                "compact WOTS+ private seeds must be {} bytes long, was {}",
                config.compact_private_keys_length(),
                compact_private_seeds.len()
            )));
        }
        for (name, buf) in [("SK_PRF", &sk_prf), ("root", &root), ("public seed", &public_seed)] {
            if buf.len() != n {
                return Err(Error::argument(format!(
                    "{name} must be {n} bytes long, was {}",
                    buf.len()
                )));
            }
        }
        if u64::from(next_idx) > config.wotsp_count() {
            return Err(Error::argument(format!(
                "next index {next_idx} is outside [0, {}]",
                config.wotsp_count()
            )));
        }

        Ok(Self {
            next_idx,
            compact_private_seeds,
            sk_prf,
            root,
            public_seed,
        })
    }

    /// Index of the next unused WOTS+ leaf.
    pub fn next_idx(&self) -> u32 {
        self.next_idx
    }

    /// Leaves still available for signing.
    pub fn remaining_leaves(&self) -> u64 {
        let wotsp_count = (self.compact_private_seeds.len() / self.root.len()) as u64;
        wotsp_count - u64::from(self.next_idx)
    }

    /// A copy of this key with the leaf index advanced by one.
    ///
    /// Fails with [`Error::KeyExhausted`] once every leaf is spent. The
    /// original key is unchanged; the caller is responsible for durably
    /// replacing it before the matching signature leaves its control.
    pub fn increment_idx(&self) -> Result<Self> {
        if self.remaining_leaves() == 0 {
            return Err(Error::KeyExhausted);
        }
        Ok(Self {
            next_idx: self.next_idx + 1,
            compact_private_seeds: self.compact_private_seeds.clone(),
            sk_prf: self.sk_prf.clone(),
            root: self.root.clone(),
            public_seed: self.public_seed.clone(),
        })
    }

    pub fn compact_private_seeds(&self) -> &[u8] {
        &self.compact_private_seeds
    }

    pub fn sk_prf(&self) -> &[u8] {
        &self.sk_prf
    }

    pub fn root(&self) -> &[u8] {
        &self.root
    }

    pub fn public_seed(&self) -> &[u8] {
        &self.public_seed
    }

    /// Serialized length in bytes: `4 + 2^h * n + 3n`.
    pub fn length(&self) -> usize {
        4 + self.compact_private_seeds.len()
            + self.sk_prf.len()
            + self.root.len()
            + self.public_seed.len()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        out.extend_from_slice(&u32_to_bytes(self.next_idx));
        out.extend_from_slice(&self.compact_private_seeds);
        out.extend_from_slice(&self.sk_prf);
        out.extend_from_slice(&self.root);
        out.extend_from_slice(&self.public_seed);
        out
    }

    pub fn deserialize(config: &XmssConfig, bytes: &[u8], offset: usize) -> Result<Self> {
        let n = config.wots().n();
        let compact_len = config.compact_private_keys_length();
        check_available(bytes, offset, 4 + compact_len + 3 * n, "private key")?;

        let mut o = offset;
        let next_idx = bytes_to_u32(&bytes[o..]);
        o += 4;
        let compact_private_seeds = bytes[o..o + compact_len].to_vec();
        o += compact_len;
        let sk_prf = bytes[o..o + n].to_vec();
        o += n;
        let root = bytes[o..o + n].to_vec();
        o += n;
        let public_seed = bytes[o..o + n].to_vec();

        Self::new(
            config,
            next_idx,
            compact_private_seeds,
            sk_prf,
            root,
            public_seed,
        )
    }
}

/// XMSS public key: `oid || root || public seed`.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmssPublicKey {
    oid: u32,
    root: Vec<u8>,
    public_seed: Vec<u8>,
}

impl XmssPublicKey {
    pub fn new(oid: u32, root: Vec<u8>, public_seed: Vec<u8>) -> Result<Self> {
        if root.len() != public_seed.len() {
            return Err(Error::argument(format!(
                "root ({} bytes) and public seed ({} bytes) must be of same length",
                root.len(),
                public_seed.len()
            )));
        }
        Ok(Self {
            oid,
            root,
            public_seed,
        })
    }

    pub fn oid(&self) -> u32 {
        self.oid
    }

    pub fn root(&self) -> &[u8] {
        &self.root
    }

    pub fn public_seed(&self) -> &[u8] {
        &self.public_seed
    }

    /// Serialized length in bytes: `4 + 2n`.
    pub fn length(&self) -> usize {
        4 + self.root.len() + self.public_seed.len()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        out.extend_from_slice(&u32_to_bytes(self.oid));
        out.extend_from_slice(&self.root);
        out.extend_from_slice(&self.public_seed);
        out
    }

    pub fn deserialize(config: &XmssConfig, bytes: &[u8], offset: usize) -> Result<Self> {
        let n = config.wots().n();
        check_available(bytes, offset, 4 + 2 * n, "public key")?;

        let mut o = offset;
        let oid = bytes_to_u32(&bytes[o..]);
        o += 4;
        let root = bytes[o..o + n].to_vec();
        o += n;
        let public_seed = bytes[o..o + n].to_vec();

        Self::new(oid, root, public_seed)
    }
}

/// XMSS signature:
/// `wotsp index || r || WOTS+ signature || authentication path`.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmssSignature {
    wotsp_index: u32,
    randomness: Vec<u8>,
    wotsp_signature: Vec<u8>,
    authentication_path: Vec<u8>,
}

impl XmssSignature {
    pub fn new(
        config: &XmssConfig,
        wotsp_index: u32,
        randomness: Vec<u8>,
        wotsp_signature: Vec<u8>,
        authentication_path: Vec<u8>,
    ) -> Result<Self> {
        let n = config.wots().n();
        if randomness.len() != n {
            return Err(Error::argument(format!(
                "randomness r must be {n} bytes long, was {}",
                randomness.len()
            )));
        }
        if wotsp_signature.len() != config.wots().key_length() {
            return Err(Error::argument(format!(
                "WOTS+ signature must be {} bytes long, was {}",
                config.wots().key_length(),
                wotsp_signature.len()
            )));
        }
        if authentication_path.len() != config.auth_length() {
            return Err(Error::argument(format!(
                "authentication path must be {} bytes long, was {}",
                config.auth_length(),
                authentication_path.len()
            )));
        }

        Ok(Self {
            wotsp_index,
            randomness,
            wotsp_signature,
            authentication_path,
        })
    }

    /// Index of the WOTS+ leaf that produced this signature.
    pub fn wotsp_index(&self) -> u32 {
        self.wotsp_index
    }

    /// The message-hash randomness `r`.
    pub fn randomness(&self) -> &[u8] {
        &self.randomness
    }

    pub fn wotsp_signature(&self) -> &[u8] {
        &self.wotsp_signature
    }

    pub fn authentication_path(&self) -> &[u8] {
        &self.authentication_path
    }

    /// Serialized length in bytes: `4 + n + len * n + h * n`.
    pub fn length(&self) -> usize {
        4 + self.randomness.len() + self.wotsp_signature.len() + self.authentication_path.len()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        out.extend_from_slice(&u32_to_bytes(self.wotsp_index));
        out.extend_from_slice(&self.randomness);
        out.extend_from_slice(&self.wotsp_signature);
        out.extend_from_slice(&self.authentication_path);
        out
    }

    pub fn deserialize(config: &XmssConfig, bytes: &[u8], offset: usize) -> Result<Self> {
        let n = config.wots().n();
        let wots_len = config.wots().key_length();
        let auth_len = config.auth_length();
        check_available(bytes, offset, config.signature_length(), "signature")?;

        let mut o = offset;
        let wotsp_index = bytes_to_u32(&bytes[o..]);
        o += 4;
        let randomness = bytes[o..o + n].to_vec();
        o += n;
        let wotsp_signature = bytes[o..o + wots_len].to_vec();
        o += wots_len;
        let authentication_path = bytes[o..o + auth_len].to_vec();

        Self::new(
            config,
            wotsp_index,
            randomness,
            wotsp_signature,
            authentication_path,
        )
    }
}

/// Dense cache of every Merkle node, leaves first, root last.
///
/// Holding the tree turns authentication-path construction during signing
/// into `h` reads instead of `h` sub-tree recomputations. The layout is
/// level 0 (the `2^h` leaves), then level 1, and so on up to the root at
/// byte offset `(2^(h+1) - 2) * n`.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmssTree {
    h: u32,
    n: usize,
    flat_tree: Vec<u8>,
}

impl XmssTree {
    pub fn new(h: u32, n: usize, flat_tree: Vec<u8>) -> Result<Self> {
        if h == 0 || h >= 32 {
            return Err(Error::argument(format!("h must be in [1, 31], was {h}")));
        }
        if n == 0 || !n.is_power_of_two() {
            return Err(Error::argument(format!("n must be a power of 2, was {n}")));
        }
        let expected = ((1usize << (h + 1)) - 1) * n;
        if flat_tree.len() != expected {
            return Err(Error::argument(format!(
                "flat tree must be {expected} bytes long, was {}",
                flat_tree.len()
            )));
        }
        Ok(Self { h, n, flat_tree })
    }

    pub fn h(&self) -> u32 {
        self.h
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn flat_tree(&self) -> &[u8] {
        &self.flat_tree
    }

    /// The Merkle root, stored in the last `n` bytes.
    pub fn root(&self) -> &[u8] {
        &self.flat_tree[self.flat_tree.len() - self.n..]
    }

    /// Copies the node at `(tree_height, tree_index)` into `dest`.
    pub fn read_node(&self, tree_height: u32, tree_index: u64, dest: &mut [u8]) -> Result<()> {
        if dest.len() < self.n {
            return Err(Error::argument(format!(
                "node destination must hold {} bytes, was {}",
                self.n,
                dest.len()
            )));
        }
        if tree_height > self.h || tree_index >= 1u64 << (self.h - tree_height) {
            return Err(Error::argument(format!(
                "node ({tree_height}, {tree_index}) is outside a tree of height {}",
                self.h
            )));
        }
        let index = rfc::flat_tree_index(tree_height, tree_index, 0, self.h, self.n)?;
        dest[..self.n].copy_from_slice(&self.flat_tree[index..index + self.n]);
        Ok(())
    }

    /// Serialized length in bytes: `8 + (2^(h+1) - 1) * n`.
    pub fn length(&self) -> usize {
        8 + self.flat_tree.len()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        out.extend_from_slice(&u32_to_bytes(self.h));
        out.extend_from_slice(&u32_to_bytes(self.n as u32));
        out.extend_from_slice(&self.flat_tree);
        out
    }

    pub fn deserialize(config: &XmssConfig, bytes: &[u8], offset: usize) -> Result<Self> {
        check_available(bytes, offset, 8, "tree cache header")?;
        let h = bytes_to_u32(&bytes[offset..]);
        let n = bytes_to_u32(&bytes[offset + 4..]) as usize;

        if h != config.h() {
            return Err(Error::argument(format!(
                "h mismatch (config = {}, serial = {h})",
                config.h()
            )));
        }
        if n != config.wots().n() {
            return Err(Error::argument(format!(
                "n mismatch (config = {}, serial = {n})",
                config.wots().n()
            )));
        }

        let flat_len = config.tree_node_count() * n;
        check_available(bytes, offset + 8, flat_len, "tree cache")?;
        let flat_tree = bytes[offset + 8..offset + 8 + flat_len].to_vec();

        Self::new(h, n, flat_tree)
    }
}
