//! # Winternitz One-Time Signature Plus (WOTS+)
//!
//! WOTS+ is a one-time, hash-based signature scheme and the leaf primitive
//! of XMSS (RFC 8391). A private key is `len` chains of `n`-byte values;
//! signing releases an intermediate point of each chain and verification
//! walks the chains to their ends and compares against the public key.
//!
//! All keyed hashes are domain-separated instances of one template,
//! `Hash(toByte(domain, n) || key || msg)`: `F` (domain 0) drives the
//! chains and `PRF` (domain 3) derives per-step keys and bitmasks from the
//! public seed and the current [`Adrs`]. The same template also backs the
//! XMSS-level `H` and `H_msg`.
//!
//! A WOTS+ key must sign exactly one message. Reuse leaks enough chain
//! intermediates to forge; the XMSS layer enforces one-time use through
//! its monotone leaf index.

use std::fmt;
use std::sync::Arc;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::hash::HashFunction;
use crate::utils::to_byte;
use crate::wots_plus::adrs::{Adrs, AdrsType};

pub mod adrs;

/// Immutable WOTS+ parameter set.
///
/// `len1` base-`w` digits carry the message, `len2` carry the checksum,
/// and `len = len1 + len2` chains of `n` bytes make up a key.
#[derive(Clone)]
pub struct WotsConfig {
    w: u32,
    log_w: u32,
    n: usize,
    len1: usize,
    len2: usize,
    len: usize,
    key_length: usize,
    hash: Arc<dyn HashFunction>,
}

impl fmt::Debug for WotsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WotsConfig")
            .field("w", &self.w)
            .field("n", &self.n)
            .field("len1", &self.len1)
            .field("len2", &self.len2)
            .finish()
    }
}

impl WotsConfig {
    /// Builds a configuration for the tested Winternitz parameter `w = 16`.
    ///
    /// `n` must be a power of two and equal the digest length of `hash`.
    pub fn new(w: u32, n: usize, hash: Arc<dyn HashFunction>) -> Result<Self> {
        if w == 4 {
            return Err(Error::argument(
                "w = 4 is declared by RFC 8391 but has no vetted test vectors; \
                 use new_untested_w4 to opt in",
            ));
        }
        Self::build(w, n, hash)
    }

    /// Builds a `w = 4` configuration. This parameter set is untested
    /// against independent vectors; keys made with it are not known to
    /// interoperate with anything.
    pub fn new_untested_w4(n: usize, hash: Arc<dyn HashFunction>) -> Result<Self> {
        Self::build(4, n, hash)
    }

    /// The 32-byte compact-signature preset: `w = 16`, `n = 32`,
    /// `len1 = 64`, `len2 = 3`, 67 chains, 2144-byte keys.
    pub fn compact_32(hash: Arc<dyn HashFunction>) -> Result<Self> {
        Self::new(16, 32, hash)
    }

    fn build(w: u32, n: usize, hash: Arc<dyn HashFunction>) -> Result<Self> {
        if w != 4 && w != 16 {
            return Err(Error::argument(format!("w must be 4 or 16, was {w}")));
        }
        if n == 0 || !n.is_power_of_two() {
            return Err(Error::argument(format!("n must be a power of 2, was {n}")));
        }
        if hash.digest_length() != n {
            return Err(Error::argument(format!(
                "digest length {} must equal n = {n}",
                hash.digest_length()
            )));
        }

        let log_w = w.trailing_zeros();
        let len1 = 8 * n / log_w as usize;
        let len2 = ((len1 as u32 * (w - 1)).ilog2() / log_w) as usize + 1;
        let len = len1 + len2;

        Ok(Self {
            w,
            log_w,
            n,
            len1,
            len2,
            len,
            key_length: len * n,
            hash,
        })
    }

    pub fn w(&self) -> u32 {
        self.w
    }

    pub fn log_w(&self) -> u32 {
        self.log_w
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn len1(&self) -> usize {
        self.len1
    }

    pub fn len2(&self) -> usize {
        self.len2
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Length in bytes of a full private key, public key, and signature.
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// `Hash(toByte(domain, n) || key || msg)`, the shared shape of every
    /// keyed hash in the scheme. `primitive` names the caller for error
    /// context.
    pub(crate) fn function_template(
        &self,
        domain: u32,
        key: &[u8],
        msg: &[u8],
        dest: &mut [u8],
        primitive: &'static str,
    ) -> Result<()> {
        let prefix = to_byte(u64::from(domain), self.n)?;
        let mut instance = self.hash.new_instance();
        instance
            .absorb(&prefix)
            .and_then(|_| instance.absorb(key))
            .and_then(|_| instance.absorb(msg))
            .and_then(|_| instance.finalize(&mut dest[..self.n]))
            .map_err(|source| Error::hash(primitive, source))
    }

    /// Chain hash `F`, domain 0.
    pub(crate) fn f(&self, key: &[u8], msg: &[u8], dest: &mut [u8]) -> Result<()> {
        self.function_template(0, key, msg, dest, "F")
    }

    /// Pseudorandom function `PRF`, domain 3. The message is always a
    /// 32-byte value: a serialized [`Adrs`] or `toByte(idx, 32)`.
    pub(crate) fn prf(&self, key: &[u8], msg: &[u8], dest: &mut [u8]) -> Result<()> {
        self.function_template(3, key, msg, dest, "PRF")
    }
}

/// WOTS+ keygen, signing and verification over a [`WotsConfig`].
#[derive(Clone, Debug)]
pub struct WotsPlus {
    config: WotsConfig,
}

impl WotsPlus {
    pub fn new(config: WotsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WotsConfig {
        &self.config
    }

    /// Derives the public key for `private_key` into `dest`.
    pub fn generate(&self, private_key: &[u8], public_seed: &[u8], dest: &mut [u8]) -> Result<()> {
        self.check_key_length("private key", private_key)?;
        self.check_seed_length(public_seed)?;
        self.check_key_length("public key destination", dest)?;

        let mut adrs = Adrs::from(AdrsType::Ots);
        self.public_key_with_adrs(private_key, public_seed, &mut adrs, dest)
    }

    /// Signs an `n`-byte message with the full `len * n`-byte private key.
    pub fn sign(
        &self,
        msg: &[u8],
        private_key: &[u8],
        public_seed: &[u8],
        dest: &mut [u8],
    ) -> Result<()> {
        self.check_message_length(msg)?;
        self.check_key_length("private key", private_key)?;
        self.check_seed_length(public_seed)?;
        self.check_key_length("signature destination", dest)?;

        let mut adrs = Adrs::from(AdrsType::Ots);
        self.sign_with_adrs(msg, private_key, public_seed, &mut adrs, dest)
    }

    /// Recovers the public key a signature commits to. Verification is a
    /// constant-time comparison of this value against the known key.
    pub fn signature_to_public_key(
        &self,
        msg: &[u8],
        signature: &[u8],
        public_seed: &[u8],
    ) -> Result<Vec<u8>> {
        self.check_message_length(msg)?;
        self.check_key_length("signature", signature)?;
        self.check_seed_length(public_seed)?;

        let mut adrs = Adrs::from(AdrsType::Ots);
        let mut derived = vec![0u8; self.config.key_length];
        self.signature_to_public_key_with_adrs(msg, signature, public_seed, &mut adrs, &mut derived)?;
        Ok(derived)
    }

    /// Verifies a signature against a known public key.
    ///
    /// Size mismatches fail with [`Error::Argument`] before any hashing; a
    /// wrong signature yields `Ok(false)`.
    pub fn verify(
        &self,
        msg: &[u8],
        signature: &[u8],
        public_key: &[u8],
        public_seed: &[u8],
    ) -> Result<bool> {
        self.check_key_length("public key", public_key)?;
        let derived = self.signature_to_public_key(msg, signature, public_seed)?;
        Ok(derived.ct_eq(public_key).into())
    }

    /// Expands a compact `n`-byte seed into the full `len * n`-byte private
    /// key: chain `i` starts at `PRF(seed, toByte(i, 32))`.
    ///
    /// This derivation is fixed; every root and signature byte of an XMSS
    /// key depends on it.
    pub fn inflate_private_key(&self, seed: &[u8], dest: &mut [u8]) -> Result<()> {
        let n = self.config.n;
        self.check_seed_length(seed)?;
        self.check_key_length("private key destination", dest)?;

        for i in 0..self.config.len {
            let index = to_byte(i as u64, 32)?;
            self.config.prf(seed, &index, &mut dest[i * n..(i + 1) * n])?;
        }
        Ok(())
    }

    /// Keygen body, RFC 8391 Algorithm 4. `adrs` must be an OTS address
    /// with its OTS address word already set by the caller.
    pub(crate) fn public_key_with_adrs(
        &self,
        private_key: &[u8],
        public_seed: &[u8],
        adrs: &mut Adrs,
        dest: &mut [u8],
    ) -> Result<()> {
        let n = self.config.n;
        for i in 0..self.config.len {
            adrs.set_chain_address(i as u32);
            self.gen_chain(
                &mut dest[i * n..(i + 1) * n],
                &private_key[i * n..(i + 1) * n],
                0,
                self.config.w - 1,
                public_seed,
                adrs,
            )?;
        }
        Ok(())
    }

    /// Signing body, RFC 8391 Algorithm 5.
    pub(crate) fn sign_with_adrs(
        &self,
        msg: &[u8],
        private_key: &[u8],
        public_seed: &[u8],
        adrs: &mut Adrs,
        dest: &mut [u8],
    ) -> Result<()> {
        let n = self.config.n;
        let digits = self.chain_lengths(msg)?;
        for i in 0..self.config.len {
            adrs.set_chain_address(i as u32);
            self.gen_chain(
                &mut dest[i * n..(i + 1) * n],
                &private_key[i * n..(i + 1) * n],
                0,
                digits[i],
                public_seed,
                adrs,
            )?;
        }
        Ok(())
    }

    /// Verification body, RFC 8391 Algorithm 6: completes each chain from
    /// the signature point to its end.
    pub(crate) fn signature_to_public_key_with_adrs(
        &self,
        msg: &[u8],
        signature: &[u8],
        public_seed: &[u8],
        adrs: &mut Adrs,
        dest: &mut [u8],
    ) -> Result<()> {
        let n = self.config.n;
        let digits = self.chain_lengths(msg)?;
        for i in 0..self.config.len {
            adrs.set_chain_address(i as u32);
            self.gen_chain(
                &mut dest[i * n..(i + 1) * n],
                &signature[i * n..(i + 1) * n],
                digits[i],
                self.config.w - 1 - digits[i],
                public_seed,
                adrs,
            )?;
        }
        Ok(())
    }

    /// The chaining function, RFC 8391 Algorithm 2. Interprets `input` as
    /// the `start`-th chain value and applies `steps` rounds of
    /// `x <- F(key, x XOR bm)` with PRF-derived key and bitmask. With
    /// `steps = 0` the input is copied unchanged.
    fn gen_chain(
        &self,
        output: &mut [u8],
        input: &[u8],
        start: u32,
        steps: u32,
        public_seed: &[u8],
        adrs: &mut Adrs,
    ) -> Result<()> {
        let n = self.config.n;
        if start + steps > self.config.w - 1 {
            return Err(Error::argument(format!(
                "chain walk start {start} + steps {steps} exceeds w - 1 = {}",
                self.config.w - 1
            )));
        }

        output[..n].copy_from_slice(&input[..n]);

        let mut key = vec![0u8; n];
        let mut bitmask = vec![0u8; n];
        let mut xored = vec![0u8; n];
        for i in start..start + steps {
            adrs.set_hash_address(i);

            adrs.set_key_and_mask(0);
            self.config.prf(public_seed, &adrs.to_bytes(), &mut key)?;

            adrs.set_key_and_mask(1);
            self.config.prf(public_seed, &adrs.to_bytes(), &mut bitmask)?;

            for (x, (&value, &mask)) in xored.iter_mut().zip(output.iter().zip(bitmask.iter())) {
                *x = value ^ mask;
            }
            self.config.f(&key, &xored, output)?;
        }
        Ok(())
    }

    /// Splits `input` into `out_len` base-`w` digits, most significant
    /// digit of each byte first.
    fn base_w(&self, input: &[u8], output: &mut [u32]) {
        let log_w = self.config.log_w;
        let mut bits = 0u32;
        let mut total = 0u8;
        let mut input_index = 0;

        for digit in output.iter_mut() {
            if bits == 0 {
                total = input[input_index];
                input_index += 1;
                bits = 8;
            }
            bits -= log_w;
            *digit = u32::from(total >> bits) & (self.config.w - 1);
        }
    }

    /// Message digits followed by checksum digits, RFC 8391 Algorithm 5
    /// steps 1-7: `csum = sum(w - 1 - digit)`, left-aligned in its byte
    /// block and base-`w` expanded to `len2` digits.
    fn chain_lengths(&self, msg: &[u8]) -> Result<Vec<u32>> {
        let config = &self.config;
        let mut digits = vec![0u32; config.len];
        self.base_w(msg, &mut digits[..config.len1]);

        let mut csum: u32 = digits[..config.len1].iter().map(|&d| config.w - 1 - d).sum();

        let shift = (8 - (config.len2 as u32 * config.log_w) % 8) % 8;
        csum <<= shift;

        let csum_bytes_len = (config.len2 * config.log_w as usize + 7) / 8;
        let csum_bytes = to_byte(u64::from(csum), csum_bytes_len)?;

        self.base_w(&csum_bytes, &mut digits[config.len1..]);
        Ok(digits)
    }

    fn check_key_length(&self, what: &str, buf: &[u8]) -> Result<()> {
        if buf.len() != self.config.key_length {
            return Err(Error::argument(format!(
                "{what} must be {} bytes long, was {}",
                self.config.key_length,
                buf.len()
            )));
        }
        Ok(())
    }

    fn check_seed_length(&self, buf: &[u8]) -> Result<()> {
        if buf.len() != self.config.n {
            return Err(Error::argument(format!(
                "seed must be {} bytes long, was {}",
                self.config.n,
                buf.len()
            )));
        }
        Ok(())
    }

    fn check_message_length(&self, msg: &[u8]) -> Result<()> {
        if msg.len() != self.config.n {
            return Err(Error::argument(format!(
                "message must be {} bytes long, was {}",
                self.config.n,
                msg.len()
            )));
        }
        Ok(())
    }
}

/// Expands a compact seed, runs the closure over the full private key, and
/// zeroizes the expansion before returning.
pub(crate) fn with_inflated_private_key<T>(
    wots: &WotsPlus,
    seed: &[u8],
    body: impl FnOnce(&[u8]) -> Result<T>,
) -> Result<T> {
    let mut private_key = vec![0u8; wots.config().key_length()];
    let result = wots
        .inflate_private_key(seed, &mut private_key)
        .and_then(|_| body(&private_key));
    private_key.zeroize();
    result
}
