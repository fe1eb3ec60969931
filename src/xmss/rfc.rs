//! The single-threaded XMSS core of RFC 8391: randomized tree hashing,
//! L-tree compression, Merkle tree construction and root recovery.
//!
//! Everything here works on raw byte slices against an [`XmssConfig`]; the
//! typed public surface lives in [`crate::xmss::Xmss`]. The treeHash walk,
//! the ADRS discipline and the flat-tree layout are shared verbatim by the
//! parallel builder in [`crate::xmss::tree_hash`], which is why the flat
//! destination is threaded through as an option instead of a separate
//! storing variant.

use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::wots_plus::adrs::{Adrs, AdrsType};
use crate::wots_plus::{with_inflated_private_key, WotsPlus};
use crate::xmss::config::XmssConfig;
use crate::xmss::keys::XmssTree;

/// `H(key, m)`, RFC 8391 keyed hash, domain 1.
pub(crate) fn h(config: &XmssConfig, key: &[u8], m: &[u8], dest: &mut [u8]) -> Result<()> {
    config.wots().function_template(1, key, m, dest, "H")
}

/// `H_msg(key, m)`, RFC 8391 message hash, domain 2. The key is
/// `r || root || toByte(idx, n)`.
pub(crate) fn h_msg(config: &XmssConfig, key: &[u8], m: &[u8], dest: &mut [u8]) -> Result<()> {
    config.wots().function_template(2, key, m, dest, "H_msg")
}

/// `RAND_HASH(left, right, SEED, ADRS)`, RFC 8391 Algorithm 7: hashes two
/// children under a PRF-derived key after masking each with its own
/// PRF-derived bitmask.
pub(crate) fn rand_hash(
    config: &XmssConfig,
    left: &[u8],
    right: &[u8],
    public_seed: &[u8],
    adrs: &mut Adrs,
    dest: &mut [u8],
) -> Result<()> {
    let n = config.wots().n();
    let wots = config.wots();

    let mut key = vec![0u8; n];
    let mut bm0 = vec![0u8; n];
    let mut bm1 = vec![0u8; n];

    adrs.set_key_and_mask(0);
    wots.prf(public_seed, &adrs.to_bytes(), &mut key)?;
    adrs.set_key_and_mask(1);
    wots.prf(public_seed, &adrs.to_bytes(), &mut bm0)?;
    adrs.set_key_and_mask(2);
    wots.prf(public_seed, &adrs.to_bytes(), &mut bm1)?;

    let mut masked = vec![0u8; 2 * n];
    for i in 0..n {
        masked[i] = left[i] ^ bm0[i];
        masked[n + i] = right[i] ^ bm1[i];
    }

    h(config, &key, &masked, dest)
}

/// `ltree(pk, SEED, ADRS)`, RFC 8391 Algorithm 8: compresses a `len * n`
/// WOTS+ public key to a single `n`-byte leaf through an unbalanced binary
/// hash tree. Odd nodes are promoted unchanged.
pub(crate) fn ltree(
    config: &XmssConfig,
    wots_public_key: &[u8],
    public_seed: &[u8],
    adrs: &mut Adrs,
    dest: &mut [u8],
) -> Result<()> {
    let n = config.wots().n();
    let mut pk = wots_public_key.to_vec();
    let mut parent = vec![0u8; n];

    let mut lenp = config.wots().len();
    adrs.set_tree_height(0);
    while lenp > 1 {
        for i in 0..lenp / 2 {
            adrs.set_tree_index(i as u32);
            rand_hash(
                config,
                &pk[2 * i * n..(2 * i + 1) * n],
                &pk[(2 * i + 1) * n..(2 * i + 2) * n],
                public_seed,
                adrs,
                &mut parent,
            )?;
            pk[i * n..(i + 1) * n].copy_from_slice(&parent);
        }
        if lenp % 2 == 1 {
            pk.copy_within((lenp - 1) * n..lenp * n, (lenp / 2) * n);
        }
        lenp = (lenp + 1) / 2;
        adrs.set_tree_height(adrs.tree_height() + 1);
    }

    dest[..n].copy_from_slice(&pk[..n]);
    Ok(())
}

/// Byte offset of the node `(tree_height, tree_index)` within the flat
/// buffer of a sub-tree of height `root_height` whose leftmost leaf is
/// `s`. Levels are stored bottom-up, leaves first.
pub(crate) fn flat_tree_index(
    tree_height: u32,
    tree_index: u64,
    s: u64,
    root_height: u32,
    n: usize,
) -> Result<usize> {
    if tree_height > root_height {
        return Err(Error::invariant(format!(
            "node height {tree_height} above sub-tree root height {root_height}"
        )));
    }
    let local_index = tree_index
        .checked_sub(s >> tree_height)
        .ok_or_else(|| Error::invariant(format!(
            "node index {tree_index} precedes sub-tree start {s} at height {tree_height}"
        )))?;

    let mut level_base = 0u64;
    for i in 0..tree_height {
        level_base += 1u64 << (root_height - i);
    }

    Ok((level_base + local_index) as usize * n)
}

/// `treeHash(SK, s, t, ADRS)`, RFC 8391 Algorithm 9: root of the height-`t`
/// sub-tree whose leftmost leaf is `s`, via a LIFO stack of at most `t`
/// nodes. Requires `s % 2^t == 0`. When `flat_dest` is given, every node
/// (leaves included) is also written at its [`flat_tree_index`] offset.
pub(crate) fn tree_hash(
    config: &XmssConfig,
    s: u64,
    t: u32,
    compact_private_seeds: &[u8],
    public_seed: &[u8],
    adrs: &mut Adrs,
    mut flat_dest: Option<&mut [u8]>,
) -> Result<Vec<u8>> {
    if t > 0 && s % (1u64 << t) != 0 {
        return Err(Error::argument(format!(
            "inputs must verify s % 2^t == 0 (s = {s}, t = {t})"
        )));
    }

    let n = config.wots().n();
    let key_length = config.wots().key_length();
    let wots = WotsPlus::new(config.wots().clone());

    let mut sk = vec![0u8; key_length];
    let mut pk = vec![0u8; key_length];
    let mut leaf = vec![0u8; n];
    let mut scratch = vec![0u8; n];
    // LIFO stack of (value, height), at most t deep.
    let mut stack: Vec<(Vec<u8>, u32)> = Vec::with_capacity(t as usize + 1);

    for i in 0..1u64 << t {
        let si = s + i;

        adrs.set_type(AdrsType::Ots);
        adrs.set_ots_address(si as u32);
        let leaf_seed = &compact_private_seeds[si as usize * n..(si as usize + 1) * n];
        wots.inflate_private_key(leaf_seed, &mut sk)?;
        wots.public_key_with_adrs(&sk, public_seed, adrs, &mut pk)?;

        adrs.set_type(AdrsType::LTree);
        adrs.set_ltree_address(si as u32);
        ltree(config, &pk, public_seed, adrs, &mut leaf)?;

        adrs.set_type(AdrsType::HashTree);
        adrs.set_tree_height(0);
        adrs.set_tree_index(si as u32);

        let mut node = leaf.clone();
        let mut node_height = 0u32;
        if let Some(flat) = flat_dest.as_deref_mut() {
            let offset = flat_tree_index(0, si, s, t, n)?;
            flat[offset..offset + n].copy_from_slice(&node);
        }

        while stack.last().map_or(false, |(_, height)| *height == node_height) {
            adrs.set_tree_index((adrs.tree_index() - 1) >> 1);
            if let Some((lower, _)) = stack.pop() {
                rand_hash(config, &lower, &node, public_seed, adrs, &mut scratch)?;
                node.copy_from_slice(&scratch);
            }
            node_height += 1;
            adrs.set_tree_height(node_height);

            if let Some(flat) = flat_dest.as_deref_mut() {
                let offset = flat_tree_index(node_height, u64::from(adrs.tree_index()), s, t, n)?;
                flat[offset..offset + n].copy_from_slice(&node);
            }
        }
        stack.push((node, node_height));
    }

    sk.zeroize();

    if stack.len() != 1 {
        return Err(Error::invariant(format!(
            "treeHash stack held {} nodes at the end, expected exactly 1",
            stack.len()
        )));
    }
    stack
        .pop()
        .map(|(value, _)| value)
        .ok_or_else(|| Error::invariant("treeHash stack empty at the end"))
}

/// Root of the full tree, `treeHash(0, h)`.
pub(crate) fn compute_root(
    config: &XmssConfig,
    compact_private_seeds: &[u8],
    public_seed: &[u8],
) -> Result<Vec<u8>> {
    let mut adrs = Adrs::new();
    tree_hash(
        config,
        0,
        config.h(),
        compact_private_seeds,
        public_seed,
        &mut adrs,
        None,
    )
}

/// Recomputes the authentication path of leaf `idx`: for each height `j`,
/// the sibling `floor(idx / 2^j) XOR 1` rebuilt with `treeHash`.
pub(crate) fn compute_auth(
    config: &XmssConfig,
    idx: u64,
    compact_private_seeds: &[u8],
    public_seed: &[u8],
    adrs: &mut Adrs,
    dest: &mut [u8],
) -> Result<()> {
    let n = config.wots().n();
    for j in 0..config.h() {
        let k = (idx >> j) ^ 1;
        let node = tree_hash(config, k << j, j, compact_private_seeds, public_seed, adrs, None)?;
        dest[j as usize * n..(j as usize + 1) * n].copy_from_slice(&node);
    }
    Ok(())
}

/// Reads the authentication path of leaf `idx` out of a cached tree.
pub(crate) fn read_auth(
    config: &XmssConfig,
    idx: u64,
    tree: &XmssTree,
    dest: &mut [u8],
) -> Result<()> {
    let n = config.wots().n();
    for j in 0..config.h() {
        let k = (idx >> j) ^ 1;
        tree.read_node(j, k, &mut dest[j as usize * n..(j as usize + 1) * n])?;
    }
    Ok(())
}

/// `treeSig(M', SK, idx, ADRS)`: authentication path (read from the cache
/// when one is supplied, recomputed otherwise) plus the WOTS+ signature of
/// the inflated leaf key.
#[allow(clippy::too_many_arguments)]
pub(crate) fn tree_sig(
    config: &XmssConfig,
    msg_prime: &[u8],
    idx: u64,
    compact_private_seeds: &[u8],
    public_seed: &[u8],
    adrs: &mut Adrs,
    tree: Option<&XmssTree>,
    wots_sig_dest: &mut [u8],
    auth_dest: &mut [u8],
) -> Result<()> {
    match tree {
        Some(tree) => read_auth(config, idx, tree, auth_dest)?,
        None => compute_auth(config, idx, compact_private_seeds, public_seed, adrs, auth_dest)?,
    }

    adrs.set_type(AdrsType::Ots);
    adrs.set_ots_address(idx as u32);

    let n = config.wots().n();
    let wots = WotsPlus::new(config.wots().clone());
    let leaf_seed = &compact_private_seeds[idx as usize * n..(idx as usize + 1) * n];
    with_inflated_private_key(&wots, leaf_seed, |sk| {
        wots.sign_with_adrs(msg_prime, sk, public_seed, adrs, wots_sig_dest)
    })
}

/// `XMSS_rootFromSig`, RFC 8391 Algorithm 13: recovers the candidate root
/// from a WOTS+ signature and its authentication path. The verifier
/// compares the result against the known public root.
pub(crate) fn root_from_sig(
    config: &XmssConfig,
    msg_prime: &[u8],
    idx: u64,
    wots_signature: &[u8],
    auth: &[u8],
    public_seed: &[u8],
    adrs: &mut Adrs,
) -> Result<Vec<u8>> {
    let n = config.wots().n();
    let wots = WotsPlus::new(config.wots().clone());

    adrs.set_type(AdrsType::Ots);
    adrs.set_ots_address(idx as u32);
    let mut wots_public_key = vec![0u8; config.wots().key_length()];
    wots.signature_to_public_key_with_adrs(
        msg_prime,
        wots_signature,
        public_seed,
        adrs,
        &mut wots_public_key,
    )?;

    adrs.set_type(AdrsType::LTree);
    adrs.set_ltree_address(idx as u32);
    let mut node = vec![0u8; n];
    ltree(config, &wots_public_key, public_seed, adrs, &mut node)?;

    adrs.set_type(AdrsType::HashTree);
    adrs.set_tree_index(idx as u32);
    let mut next = vec![0u8; n];
    for k in 0..config.h() {
        adrs.set_tree_height(k);
        let sibling = &auth[k as usize * n..(k as usize + 1) * n];
        if (idx >> k) & 1 == 0 {
            adrs.set_tree_index(adrs.tree_index() >> 1);
            rand_hash(config, &node, sibling, public_seed, adrs, &mut next)?;
        } else {
            adrs.set_tree_index((adrs.tree_index() - 1) >> 1);
            rand_hash(config, sibling, &node, public_seed, adrs, &mut next)?;
        }
        node.copy_from_slice(&next);
    }

    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha2::Sha256Hash;
    use crate::wots_plus::WotsConfig;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};
    use std::sync::Arc;

    fn config(h: u32) -> XmssConfig {
        let wots = WotsConfig::compact_32(Arc::new(Sha256Hash)).unwrap();
        XmssConfig::new(None, wots, h).unwrap()
    }

    fn seeds(config: &XmssConfig, seed: u64) -> (Vec<u8>, Vec<u8>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut compact = vec![0u8; config.compact_private_keys_length()];
        let mut public_seed = vec![0u8; config.wots().n()];
        rng.fill_bytes(&mut compact);
        rng.fill_bytes(&mut public_seed);
        (compact, public_seed)
    }

    #[test]
    fn flat_tree_index_walks_levels_bottom_up() {
        // Full tree of height 3: 8 leaves at base 0, then levels of 4, 2, 1.
        assert_eq!(flat_tree_index(0, 5, 0, 3, 32).unwrap(), 5 * 32);
        assert_eq!(flat_tree_index(1, 2, 0, 3, 32).unwrap(), (8 + 2) * 32);
        assert_eq!(flat_tree_index(2, 1, 0, 3, 32).unwrap(), (8 + 4 + 1) * 32);
        assert_eq!(flat_tree_index(3, 0, 0, 3, 32).unwrap(), (8 + 4 + 2) * 32);

        // Sub-tree of height 2 starting at leaf 4: absolute indexes are
        // translated to local ones.
        assert_eq!(flat_tree_index(0, 4, 4, 2, 32).unwrap(), 0);
        assert_eq!(flat_tree_index(1, 3, 4, 2, 32).unwrap(), (4 + 1) * 32);
        assert_eq!(flat_tree_index(2, 1, 4, 2, 32).unwrap(), (4 + 2) * 32);
    }

    #[test]
    fn flat_tree_index_rejects_nodes_outside_the_sub_tree() {
        assert!(flat_tree_index(0, 3, 4, 2, 32).is_err());
        assert!(flat_tree_index(3, 0, 0, 2, 32).is_err());
    }

    #[test]
    fn tree_hash_rejects_unaligned_start() {
        let config = config(2);
        let (compact, public_seed) = seeds(&config, 1);
        let mut adrs = Adrs::new();
        let err = tree_hash(&config, 1, 1, &compact, &public_seed, &mut adrs, None).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn tree_hash_is_deterministic() {
        let config = config(3);
        let (compact, public_seed) = seeds(&config, 2);

        let mut adrs = Adrs::new();
        let first = tree_hash(&config, 0, 3, &compact, &public_seed, &mut adrs, None).unwrap();
        let mut adrs = Adrs::new();
        let second = tree_hash(&config, 0, 3, &compact, &public_seed, &mut adrs, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn stored_tree_matches_computed_root_and_sub_trees() {
        let config = config(3);
        let (compact, public_seed) = seeds(&config, 3);
        let n = config.wots().n();

        let mut flat = vec![0u8; config.tree_node_count() * n];
        let mut adrs = Adrs::new();
        let root = tree_hash(
            &config,
            0,
            3,
            &compact,
            &public_seed,
            &mut adrs,
            Some(&mut flat),
        )
        .unwrap();

        // Root lands in the last n bytes of the flat layout.
        assert_eq!(root, flat[flat.len() - n..]);

        // Every stored node equals the root of its own sub-tree.
        for height in 0..=3u32 {
            for index in 0..(1u64 << (3 - height)) {
                let mut adrs = Adrs::new();
                let expected = tree_hash(
                    &config,
                    index << height,
                    height,
                    &compact,
                    &public_seed,
                    &mut adrs,
                    None,
                )
                .unwrap();
                let offset = flat_tree_index(height, index, 0, 3, n).unwrap();
                assert_eq!(expected, flat[offset..offset + n], "node ({height}, {index})");
            }
        }
    }

    #[test]
    fn read_auth_equals_compute_auth_for_every_leaf() {
        let config = config(3);
        let (compact, public_seed) = seeds(&config, 4);
        let n = config.wots().n();

        let mut flat = vec![0u8; config.tree_node_count() * n];
        let mut adrs = Adrs::new();
        tree_hash(
            &config,
            0,
            3,
            &compact,
            &public_seed,
            &mut adrs,
            Some(&mut flat),
        )
        .unwrap();
        let tree = XmssTree::new(3, n, flat).unwrap();

        for idx in 0..config.wotsp_count() {
            let mut computed = vec![0u8; config.auth_length()];
            let mut adrs = Adrs::new();
            compute_auth(&config, idx, &compact, &public_seed, &mut adrs, &mut computed).unwrap();

            let mut read = vec![0u8; config.auth_length()];
            read_auth(&config, idx, &tree, &mut read).unwrap();

            assert_eq!(computed, read, "leaf {idx}");
        }
    }

    #[test]
    fn ltree_compresses_to_leaf_width() {
        let config = config(2);
        let (compact, public_seed) = seeds(&config, 5);
        let wots = WotsPlus::new(config.wots().clone());
        let n = config.wots().n();

        let mut sk = vec![0u8; config.wots().key_length()];
        wots.inflate_private_key(&compact[..n], &mut sk).unwrap();
        let mut pk = vec![0u8; config.wots().key_length()];
        let mut adrs = Adrs::from(AdrsType::Ots);
        wots.public_key_with_adrs(&sk, &public_seed, &mut adrs, &mut pk)
            .unwrap();

        let mut adrs = Adrs::from(AdrsType::LTree);
        adrs.set_ltree_address(0);
        let mut leaf = vec![0u8; n];
        ltree(&config, &pk, &public_seed, &mut adrs, &mut leaf).unwrap();

        let mut adrs = Adrs::from(AdrsType::LTree);
        adrs.set_ltree_address(0);
        let mut again = vec![0u8; n];
        ltree(&config, &pk, &public_seed, &mut adrs, &mut again).unwrap();
        assert_eq!(leaf, again);
        assert_ne!(leaf, vec![0u8; n]);
    }

    #[test]
    fn rand_hash_depends_on_address_words() {
        let config = config(2);
        let (_, public_seed) = seeds(&config, 6);
        let left = [1u8; 32];
        let right = [2u8; 32];

        let mut adrs = Adrs::from(AdrsType::HashTree);
        adrs.set_tree_height(0);
        adrs.set_tree_index(0);
        let mut first = [0u8; 32];
        rand_hash(&config, &left, &right, &public_seed, &mut adrs, &mut first).unwrap();

        let mut adrs = Adrs::from(AdrsType::HashTree);
        adrs.set_tree_height(0);
        adrs.set_tree_index(1);
        let mut second = [0u8; 32];
        rand_hash(&config, &left, &right, &public_seed, &mut adrs, &mut second).unwrap();

        assert_ne!(first, second);
    }
}
