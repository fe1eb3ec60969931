//! The 32-byte hash-function address (`ADRS`) of RFC 8391.
//!
//! Every hash call in the scheme is made position-unique by an address that
//! encodes where in the structure the call happens. Three variants share a
//! common prefix and specialize the three words after the type:
//!
//! ```text
//! OTS                        L-tree                     Hash tree
//! +----------------------+   +----------------------+   +----------------------+
//! | layer address (32)   |   | layer address (32)   |   | layer address (32)   |
//! | tree address  (64)   |   | tree address  (64)   |   | tree address  (64)   |
//! | type = 0      (32)   |   | type = 1      (32)   |   | type = 2      (32)   |
//! | OTS address   (32)   |   | L-tree address (32)  |   | padding = 0   (32)   |
//! | chain address (32)   |   | tree height   (32)   |   | tree height   (32)   |
//! | hash address  (32)   |   | tree index    (32)   |   | tree index    (32)   |
//! | keyAndMask    (32)   |   | keyAndMask    (32)   |   | keyAndMask    (32)   |
//! +----------------------+   +----------------------+   +----------------------+
//! ```
//!
//! All words are big-endian. Setting the type zeroes every word after it;
//! stale fields from a previous variant must never leak into a PRF input.
//!
//! The variant-specific setters and getters check the current type and
//! panic on a mismatch. That check is a debugging aid for library bugs,
//! not a security property; no input data reaches it.

use crate::utils::{bytes_to_u32, u32_to_bytes};

/// Serialized length of an address in bytes.
pub const ADRS_LENGTH: usize = 32;

const OFFSET_LAYER: usize = 0;
const OFFSET_TREE: usize = 4;
const OFFSET_TYPE: usize = 12;
const OFFSET_WORD3: usize = 16;
const OFFSET_WORD4: usize = 20;
const OFFSET_WORD5: usize = 24;
const OFFSET_KEY_AND_MASK: usize = 28;

/// Address variants, by RFC 8391 type id.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AdrsType {
    /// Type 0: hashing along a WOTS+ chain.
    Ots,
    /// Type 1: compressing a WOTS+ public key through an L-tree.
    LTree,
    /// Type 2: hashing inside the main Merkle tree.
    HashTree,
}

impl AdrsType {
    fn id(self) -> u32 {
        match self {
            AdrsType::Ots => 0,
            AdrsType::LTree => 1,
            AdrsType::HashTree => 2,
        }
    }
}

/// A typed 32-byte hash-function address.
#[derive(Copy, Clone, Debug)]
pub struct Adrs {
    buffer: [u8; ADRS_LENGTH],
    adrs_type: Option<AdrsType>,
}

impl Default for Adrs {
    fn default() -> Self {
        Self::new()
    }
}

impl From<AdrsType> for Adrs {
    fn from(adrs_type: AdrsType) -> Self {
        let mut adrs = Self::new();
        adrs.set_type(adrs_type);
        adrs
    }
}

impl Adrs {
    /// A zeroed, untyped address. Call [`set_type`](Self::set_type) before
    /// touching any variant-specific word.
    pub fn new() -> Self {
        Self {
            buffer: [0u8; ADRS_LENGTH],
            adrs_type: None,
        }
    }

    fn set_word(&mut self, offset: usize, value: u32) {
        self.buffer[offset..offset + 4].copy_from_slice(&u32_to_bytes(value));
    }

    fn word(&self, offset: usize) -> u32 {
        bytes_to_u32(&self.buffer[offset..offset + 4])
    }

    fn require(&self, expected: &[AdrsType], word: &str) {
        match self.adrs_type {
            Some(t) if expected.contains(&t) => {}
            current => panic!(
                "{word} requires address type {expected:?} but the current type is {current:?}"
            ),
        }
    }

    pub fn set_layer_address(&mut self, layer: u32) {
        self.set_word(OFFSET_LAYER, layer);
    }

    /// The tree address is a 64-bit field, but a single-tree XMSS never
    /// addresses more than one tree, so only its leading word is written
    /// and the rest stays zero.
    pub fn set_tree_address(&mut self, tree: u32) {
        self.set_word(OFFSET_TREE, tree);
    }

    /// Switches the variant and zeroes every word after the type field.
    pub fn set_type(&mut self, adrs_type: AdrsType) -> &mut Self {
        self.set_word(OFFSET_TYPE, adrs_type.id());
        self.adrs_type = Some(adrs_type);
        self.buffer[OFFSET_WORD3..].fill(0);
        self
    }

    pub fn adrs_type(&self) -> Option<AdrsType> {
        self.adrs_type
    }

    pub fn set_ots_address(&mut self, ots_address: u32) {
        self.require(&[AdrsType::Ots], "OTS address");
        self.set_word(OFFSET_WORD3, ots_address);
    }

    pub fn set_ltree_address(&mut self, ltree_address: u32) {
        self.require(&[AdrsType::LTree], "L-tree address");
        self.set_word(OFFSET_WORD3, ltree_address);
    }

    pub fn set_padding(&mut self, padding: u32) {
        self.require(&[AdrsType::HashTree], "padding");
        self.set_word(OFFSET_WORD3, padding);
    }

    pub fn set_chain_address(&mut self, chain_address: u32) {
        self.require(&[AdrsType::Ots], "chain address");
        self.set_word(OFFSET_WORD4, chain_address);
    }

    pub fn tree_height(&self) -> u32 {
        self.require(&[AdrsType::LTree, AdrsType::HashTree], "tree height");
        self.word(OFFSET_WORD4)
    }

    pub fn set_tree_height(&mut self, tree_height: u32) {
        self.require(&[AdrsType::LTree, AdrsType::HashTree], "tree height");
        self.set_word(OFFSET_WORD4, tree_height);
    }

    pub fn set_hash_address(&mut self, hash_address: u32) {
        self.require(&[AdrsType::Ots], "hash address");
        self.set_word(OFFSET_WORD5, hash_address);
    }

    pub fn tree_index(&self) -> u32 {
        self.require(&[AdrsType::LTree, AdrsType::HashTree], "tree index");
        self.word(OFFSET_WORD5)
    }

    pub fn set_tree_index(&mut self, tree_index: u32) {
        self.require(&[AdrsType::LTree, AdrsType::HashTree], "tree index");
        self.set_word(OFFSET_WORD5, tree_index);
    }

    pub fn set_key_and_mask(&mut self, key_and_mask: u32) {
        self.set_word(OFFSET_KEY_AND_MASK, key_and_mask);
    }

    /// The serialized 32-byte address, seven big-endian words in wire order.
    pub fn to_bytes(&self) -> [u8; ADRS_LENGTH] {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_words_are_big_endian_in_fixed_order() {
        let mut adrs = Adrs::from(AdrsType::Ots);
        adrs.set_layer_address(0x01020304);
        adrs.set_tree_address(0x05060708);
        adrs.set_ots_address(0x0a0b0c0d);
        adrs.set_chain_address(0x11121314);
        adrs.set_hash_address(0x15161718);
        adrs.set_key_and_mask(1);

        let bytes = adrs.to_bytes();
        assert_eq!(bytes[0..4], [1, 2, 3, 4]);
        assert_eq!(bytes[4..8], [5, 6, 7, 8]);
        assert_eq!(bytes[8..12], [0, 0, 0, 0]);
        assert_eq!(bytes[12..16], [0, 0, 0, 0]);
        assert_eq!(bytes[16..20], [0x0a, 0x0b, 0x0c, 0x0d]);
        assert_eq!(bytes[20..24], [0x11, 0x12, 0x13, 0x14]);
        assert_eq!(bytes[24..28], [0x15, 0x16, 0x17, 0x18]);
        assert_eq!(bytes[28..32], [0, 0, 0, 1]);
    }

    #[test]
    fn set_type_clears_typed_words() {
        let mut adrs = Adrs::from(AdrsType::Ots);
        adrs.set_ots_address(9);
        adrs.set_chain_address(7);
        adrs.set_hash_address(5);
        adrs.set_key_and_mask(2);

        adrs.set_type(AdrsType::HashTree);
        let bytes = adrs.to_bytes();
        assert_eq!(bytes[12..16], [0, 0, 0, 2]);
        assert_eq!(bytes[16..32], [0u8; 16]);
        assert_eq!(adrs.tree_index(), 0);
        assert_eq!(adrs.tree_height(), 0);
    }

    #[test]
    fn type_ids_match_rfc() {
        assert_eq!(Adrs::from(AdrsType::Ots).to_bytes()[15], 0);
        assert_eq!(Adrs::from(AdrsType::LTree).to_bytes()[15], 1);
        assert_eq!(Adrs::from(AdrsType::HashTree).to_bytes()[15], 2);
    }

    #[test]
    #[should_panic(expected = "OTS address requires")]
    fn ots_accessor_rejects_ltree_variant() {
        let mut adrs = Adrs::from(AdrsType::LTree);
        adrs.set_ots_address(1);
    }

    #[test]
    #[should_panic(expected = "tree height requires")]
    fn tree_height_rejects_ots_variant() {
        let mut adrs = Adrs::from(AdrsType::Ots);
        adrs.set_tree_height(1);
    }

    #[test]
    #[should_panic(expected = "tree index requires")]
    fn untyped_address_rejects_typed_access() {
        let adrs = Adrs::new();
        adrs.tree_index();
    }
}
