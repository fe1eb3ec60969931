//! SHAKE-256 adapter for the hash primitive seam.

use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};

use crate::error::HashError;
use crate::hash::{HashFunction, HashInstance};

/// SHAKE-256 hash primitive with a caller-chosen output length.
///
/// The XOF is read for exactly `digest_length` bytes, so the same primitive
/// serves `n = 32` and `n = 64` configurations.
#[derive(Clone, Copy, Debug)]
pub struct Shake256Hash {
    digest_length: usize,
}

impl Shake256Hash {
    pub fn new(digest_length: usize) -> Self {
        Self { digest_length }
    }
}

impl HashFunction for Shake256Hash {
    fn digest_length(&self) -> usize {
        self.digest_length
    }

    fn new_instance(&self) -> Box<dyn HashInstance> {
        Box::new(Shake256Instance {
            inner: Some(Shake256::default()),
            digest_length: self.digest_length,
        })
    }
}

struct Shake256Instance {
    inner: Option<Shake256>,
    digest_length: usize,
}

impl HashInstance for Shake256Instance {
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
        if dest.len() < self.digest_length {
            return Err(HashError::ShortDestination {
                expected: self.digest_length,
                found: dest.len(),
            });
        }
        let mut reader = hasher.finalize_xof();
        reader.read(&mut dest[..self.digest_length]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_length_is_configurable() {
        for n in [32usize, 64] {
            let hash = Shake256Hash::new(n);
            assert_eq!(hash.digest_length(), n);

            let mut instance = hash.new_instance();
            instance.absorb(b"shake").unwrap();
            let mut digest = vec![0u8; n];
            instance.finalize(&mut digest).unwrap();
            assert_ne!(digest, vec![0u8; n]);
        }
    }

    #[test]
    fn longer_output_extends_shorter_one() {
        let mut short = vec![0u8; 32];
        let mut instance = Shake256Hash::new(32).new_instance();
        instance.absorb(b"prefix property").unwrap();
        instance.finalize(&mut short).unwrap();

        let mut long = vec![0u8; 64];
        let mut instance = Shake256Hash::new(64).new_instance();
        instance.absorb(b"prefix property").unwrap();
        instance.finalize(&mut long).unwrap();

        assert_eq!(short, long[..32]);
    }

    #[test]
    fn double_finalize_fails() {
        let mut instance = Shake256Hash::new(32).new_instance();
        let mut digest = [0u8; 32];
        instance.finalize(&mut digest).unwrap();
        assert_eq!(
            instance.finalize(&mut digest),
            Err(HashError::AlreadyFinalized)
        );
    }
}
