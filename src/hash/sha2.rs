//! SHA-2 adapters for the hash primitive seam.

use sha2::{Digest, Sha256, Sha512};

use crate::error::HashError;
use crate::hash::{HashFunction, HashInstance};

/// SHA-256 hash primitive (`n = 32`).
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hash;

impl HashFunction for Sha256Hash {
    fn digest_length(&self) -> usize {
        32
    }

    fn new_instance(&self) -> Box<dyn HashInstance> {
        Box::new(Sha256Instance {
            inner: Some(Sha256::new()),
        })
    }
}

struct Sha256Instance {
    inner: Option<Sha256>,
}

impl HashInstance for Sha256Instance {
    fn absorb(&mut self, data: &[u8]) -> Result<(), HashError> {
        match self.inner.as_mut() {
            Some(hasher) => {
                hasher.update(data);
                Ok(())
            }
            None => Err(HashError::AlreadyFinalized),
        }
    }

    fn finalize(&mut self, dest: &mut [u8]) -> Result<(), HashError> {
        let hasher = self.inner.take().ok_or(HashError::AlreadyFinalized)?;
        if dest.len() < 32 {
            return Err(HashError::ShortDestination {
                expected: 32,
                found: dest.len(),
            });
        }
        dest[..32].copy_from_slice(&hasher.finalize());
        Ok(())
    }
}

/// SHA-512 hash primitive (`n = 64`).
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha512Hash;

impl HashFunction for Sha512Hash {
    fn digest_length(&self) -> usize {
        64
    }

    fn new_instance(&self) -> Box<dyn HashInstance> {
        Box::new(Sha512Instance {
            inner: Some(Sha512::new()),
        })
    }
}

struct Sha512Instance {
    inner: Option<Sha512>,
}

impl HashInstance for Sha512Instance {
    fn absorb(&mut self, data: &[u8]) -> Result<(), HashError> {
        match self.inner.as_mut() {
            Some(hasher) => {
                hasher.update(data);
                Ok(())
            }
            None => Err(HashError::AlreadyFinalized),
        }
    }

    fn finalize(&mut self, dest: &mut [u8]) -> Result<(), HashError> {
        let hasher = self.inner.take().ok_or(HashError::AlreadyFinalized)?;
        if dest.len() < 64 {
            return Err(HashError::ShortDestination {
                expected: 64,
                found: dest.len(),
            });
        }
        dest[..64].copy_from_slice(&hasher.finalize());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_digest() {
        // SHA-256("abc")
        let mut instance = Sha256Hash.new_instance();
        instance.absorb(b"abc").unwrap();
        let mut digest = [0u8; 32];
        instance.finalize(&mut digest).unwrap();
        assert_eq!(
            crate::utils::to_base16(&digest),
            "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"
        );
    }

    #[test]
    fn incremental_absorb_equals_one_shot() {
        let mut a = Sha256Hash.new_instance();
        a.absorb(b"ab").unwrap();
        a.absorb(b"c").unwrap();
        let mut left = [0u8; 32];
        a.finalize(&mut left).unwrap();

        let mut b = Sha256Hash.new_instance();
        b.absorb(b"abc").unwrap();
        let mut right = [0u8; 32];
        b.finalize(&mut right).unwrap();

        assert_eq!(left, right);
    }

    #[test]
    fn misuse_fails_distinctly() {
        let mut instance = Sha256Hash.new_instance();
        let mut short = [0u8; 16];
        assert_eq!(
            instance.finalize(&mut short),
            Err(HashError::ShortDestination {
                expected: 32,
                found: 16
            })
        );

        let mut instance = Sha256Hash.new_instance();
        let mut digest = [0u8; 32];
        instance.finalize(&mut digest).unwrap();
        assert_eq!(instance.absorb(b"x"), Err(HashError::AlreadyFinalized));
        assert_eq!(
            instance.finalize(&mut digest),
            Err(HashError::AlreadyFinalized)
        );
    }

    #[test]
    fn sha512_digest_length() {
        let mut instance = Sha512Hash.new_instance();
        instance.absorb(b"").unwrap();
        let mut digest = [0u8; 64];
        instance.finalize(&mut digest).unwrap();
        assert_eq!(Sha512Hash.digest_length(), 64);
        // SHA-512 of the empty string starts with cf83e135.
        assert_eq!(digest[..4], [0xcf, 0x83, 0xe1, 0x35]);
    }
}
