//! OS randomness for serial numbers, salts and IVs.
//!
//! `OsRng` holds no state, so any number of connection tasks can draw from it
//! at once without coordination.

use rand::rngs::OsRng;
use rand::RngCore;

/// Fill `dest` from the operating system CSPRNG.
pub fn fill(dest: &mut [u8]) {
    OsRng.fill_bytes(dest);
}

/// A fixed-size array of fresh random bytes.
pub fn random_array<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    fill(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_mutates_buffer() {
        let mut buf = [0u8; 64];
        fill(&mut buf);
        assert!(buf.iter().any(|&b| b != 0));
    }

    #[test]
    fn draws_differ() {
        let a: [u8; 16] = random_array();
        let b: [u8; 16] = random_array();
        assert_ne!(a, b, "two 128-bit draws should differ");
    }

    #[test]
    fn empty_array_is_fine() {
        let empty: [u8; 0] = random_array();
        assert!(empty.is_empty());
    }
}
