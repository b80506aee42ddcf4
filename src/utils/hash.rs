//! Content hashing using FxHash.
//!
//! Used to skip config reloads when the file content did not change.

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Compute 64-bit hash from byte data.
#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_ref());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_is_deterministic() {
        assert_eq!(compute("[resolver]"), compute("[resolver]"));
        assert_ne!(compute("[resolver]"), compute("[mapping]"));
    }
}
