//! XMSS parameter set.

use std::fmt;

use crate::error::{Error, Result};
use crate::wots_plus::WotsConfig;

/// Immutable XMSS parameter set: an OID registry tag, the inner WOTS+
/// configuration, and the tree height `h` (the tree signs `2^h` messages).
#[derive(Clone)]
pub struct XmssConfig {
    oid: u32,
    wots: WotsConfig,
    h: u32,

    wotsp_count: u64,
    compact_private_keys_length: usize,
    auth_length: usize,
    signature_length: usize,
    tree_node_count: usize,
}

impl fmt::Debug for XmssConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmssConfig")
            .field("oid", &self.oid)
            .field("h", &self.h)
            .field("wots", &self.wots)
            .finish()
    }
}

impl XmssConfig {
    /// Builds a configuration. `oid` is the registry tag (`None` for
    /// unregistered parameter combinations, stored as 0); `h` must be in
    /// `[1, 31]` so every index fits the 32-bit wire fields.
    pub fn new(oid: Option<u32>, wots: WotsConfig, h: u32) -> Result<Self> {
        if h == 0 {
            return Err(Error::argument("h must be greater than 0"));
        }
        if h >= 32 {
            return Err(Error::argument(format!(
                "h must be less than 32, was {h}"
            )));
        }

        let n = wots.n();
        let wotsp_count = 1u64 << h;
        Ok(Self {
            oid: oid.unwrap_or(0),
            h,
            wotsp_count,
            compact_private_keys_length: wotsp_count as usize * n,
            auth_length: h as usize * n,
            signature_length: 4 + n + wots.key_length() + h as usize * n,
            tree_node_count: 2 * wotsp_count as usize - 1,
            wots,
        })
    }

    pub fn oid(&self) -> u32 {
        self.oid
    }

    pub fn wots(&self) -> &WotsConfig {
        &self.wots
    }

    pub fn h(&self) -> u32 {
        self.h
    }

    /// Number of WOTS+ leaves, `2^h`.
    pub fn wotsp_count(&self) -> u64 {
        self.wotsp_count
    }

    /// Length in bytes of the compact per-leaf seed table, `2^h * n`.
    pub fn compact_private_keys_length(&self) -> usize {
        self.compact_private_keys_length
    }

    /// Length in bytes of an authentication path, `h * n`.
    pub fn auth_length(&self) -> usize {
        self.auth_length
    }

    /// Length in bytes of a serialized signature,
    /// `4 + n + len * n + h * n`.
    pub fn signature_length(&self) -> usize {
        self.signature_length
    }

    /// Number of nodes in the full Merkle tree, `2^(h+1) - 1`.
    pub fn tree_node_count(&self) -> usize {
        self.tree_node_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha2::Sha256Hash;
    use std::sync::Arc;

    fn wots() -> WotsConfig {
        WotsConfig::compact_32(Arc::new(Sha256Hash)).unwrap()
    }

    #[test]
    fn derived_sizes() {
        let config = XmssConfig::new(Some(1), wots(), 10).unwrap();
        assert_eq!(config.oid(), 1);
        assert_eq!(config.h(), 10);
        assert_eq!(config.wotsp_count(), 1024);
        assert_eq!(config.compact_private_keys_length(), 1024 * 32);
        assert_eq!(config.auth_length(), 320);
        assert_eq!(config.signature_length(), 4 + 32 + 2144 + 320);
        assert_eq!(config.tree_node_count(), 2047);
    }

    #[test]
    fn missing_oid_stores_zero() {
        let config = XmssConfig::new(None, wots(), 4).unwrap();
        assert_eq!(config.oid(), 0);
    }

    #[test]
    fn rejects_degenerate_heights() {
        assert!(XmssConfig::new(None, wots(), 0).is_err());
        assert!(XmssConfig::new(None, wots(), 32).is_err());
    }
}
