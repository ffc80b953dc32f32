//! Hashing for [`Map`](crate::Map) and [`Set`](crate::Set) keys.
//!
//! By default keys are hashed with a CRC32 checksum of the bytes their
//! [`Hash`] implementation writes: integers contribute their little-endian
//! bytes, strings and byte slices their contents, and composite types the
//! concatenation of their fields. Any other [`BuildHasher`] can be plugged in
//! instead.

use std::hash::{BuildHasher, Hash, Hasher};

/// A [`Hasher`] computing the CRC32 (IEEE) checksum of everything written
/// to it.
#[derive(Clone, Default)]
pub struct Crc32Hasher {
    inner: crc32fast::Hasher,
}

impl Hasher for Crc32Hasher {
    fn finish(&self) -> u64 {
        u64::from(self.inner.clone().finalize())
    }

    fn write(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    // The default implementations use native endianness; we want the same
    // hashes on every platform.
    fn write_u16(&mut self, i: u16) {
        self.write(&i.to_le_bytes());
    }

    fn write_u32(&mut self, i: u32) {
        self.write(&i.to_le_bytes());
    }

    fn write_u64(&mut self, i: u64) {
        self.write(&i.to_le_bytes());
    }

    fn write_u128(&mut self, i: u128) {
        self.write(&i.to_le_bytes());
    }

    fn write_usize(&mut self, i: usize) {
        self.write_u64(i as u64);
    }
}

/// Builds [`Crc32Hasher`]s. This is the default hasher of [`Map`](crate::Map).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildCrc32Hasher;

impl BuildHasher for BuildCrc32Hasher {
    type Hasher = Crc32Hasher;

    fn build_hasher(&self) -> Crc32Hasher {
        Crc32Hasher::default()
    }
}

/// A floating-point number usable as a map key.
///
/// Keys are compared and hashed by their bit pattern, so `0.0` and `-0.0`
/// are different keys and a `NaN` key can be found again.
#[derive(Clone, Copy, Debug)]
pub struct FloatKey<F>(pub F);

macro_rules! float_key {
    ($float:ty) => {
        impl PartialEq for FloatKey<$float> {
            fn eq(&self, other: &Self) -> bool {
                self.0.to_bits() == other.0.to_bits()
            }
        }

        impl Eq for FloatKey<$float> {}

        impl Hash for FloatKey<$float> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.to_bits().hash(state)
            }
        }

        impl From<$float> for FloatKey<$float> {
            fn from(x: $float) -> Self {
                FloatKey(x)
            }
        }
    };
}

float_key!(f32);
float_key!(f64);

/// Which of `bucket_count` buckets `key` belongs in.
pub(crate) fn bucket_index<K: Hash + ?Sized, S: BuildHasher>(
    hasher: &S,
    key: &K,
    bucket_count: usize,
) -> usize {
    debug_assert!(bucket_count > 0);
    (hasher.hash_one(key) % bucket_count as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checksum<K: Hash + ?Sized>(key: &K) -> u64 {
        BuildCrc32Hasher.hash_one(key)
    }

    #[test]
    fn integers_hash_their_bytes() {
        assert_eq!(
            checksum(&0x0102_0304_u32),
            u64::from(crc32fast::hash(&[4, 3, 2, 1]))
        );
        assert_eq!(checksum(&7_u8), u64::from(crc32fast::hash(&[7])));
        assert_eq!(checksum(&-1_i16), u64::from(crc32fast::hash(&[0xff, 0xff])));
    }

    #[test]
    fn strings() {
        assert_eq!(checksum("abc"), checksum(&String::from("abc")));
        assert_ne!(checksum("abc"), checksum("abd"));
    }

    #[test]
    fn fits_in_32_bits() {
        for i in 0..1000_u64 {
            assert!(checksum(&i) <= u64::from(u32::MAX));
        }
    }

    #[test]
    fn floats() {
        assert_eq!(FloatKey(1.5_f64), FloatKey(1.5_f64));
        assert_ne!(FloatKey(0.0_f64), FloatKey(-0.0_f64));
        assert_eq!(FloatKey(f32::NAN), FloatKey(f32::NAN));
        assert_eq!(
            checksum(&FloatKey(2.0_f32)),
            checksum(&2.0_f32.to_bits())
        );
    }

    #[test]
    fn bucket_indices() {
        for i in 0..100_u32 {
            assert!(bucket_index(&BuildCrc32Hasher, &i, 7) < 7);
            assert_eq!(bucket_index(&BuildCrc32Hasher, &i, 1), 0);
        }
    }
}
