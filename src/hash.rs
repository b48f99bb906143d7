//! Bit-string hashes and the three extractors that produce them.
//!
//! All extractors read a [`LumaBuffer`] and never modify it:
//! - aHash: one bit per pixel, set when the pixel is brighter than the mean
//! - dHash: one bit per horizontally adjacent pair, set when left > right
//! - pHash: one bit per low-frequency DCT coefficient (DC excluded), set when
//!   the coefficient is above the mean of the band

use crate::dct::Dct2d;
use crate::error::{DedupError, Result};
use crate::luma::LumaBuffer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Side of the low-frequency DCT block the perceptual hash samples.
pub const LOW_FREQ_SIZE: usize = 8;

/// Bits in a perceptual hash: the low-frequency block minus its DC term.
pub const PERCEPTUAL_HASH_BITS: usize = LOW_FREQ_SIZE * LOW_FREQ_SIZE - 1;

/// A fixed-length bit string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitHash {
    /// Bits packed MSB-first; unused trailing bits are zero.
    bytes: Vec<u8>,
    len: usize,
}

impl BitHash {
    pub fn from_bools(bits: &[bool]) -> Self {
        let bytes = bits
            .chunks(8)
            .map(|chunk| {
                chunk
                    .iter()
                    .enumerate()
                    .fold(0u8, |acc, (i, &bit)| if bit { acc | (1 << (7 - i)) } else { acc })
            })
            .collect();
        Self {
            bytes,
            len: bits.len(),
        }
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        (index < self.len).then(|| self.bytes[index / 8] & (1 << (7 - index % 8)) != 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    pub fn count_ones(&self) -> u32 {
        self.bytes.iter().map(|b| b.count_ones()).sum()
    }

    /// Number of differing bit positions.
    ///
    /// Returns `None` when the lengths differ.
    pub fn hamming(&self, other: &BitHash) -> Option<u32> {
        if self.len != other.len {
            return None;
        }
        Some(
            self.bytes
                .iter()
                .zip(&other.bytes)
                .map(|(a, b)| (a ^ b).count_ones())
                .sum(),
        )
    }

    /// Hamming distance divided by the bit length. Zero-length hashes are at distance 0.
    pub fn normalized_distance(&self, other: &BitHash) -> Option<f64> {
        let distance = self.hamming(other)?;
        if self.len == 0 {
            return Some(0.0);
        }
        Some(f64::from(distance) / self.len as f64)
    }

    /// Packed bytes as lowercase hex.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for BitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for BitHash {
    type Err = DedupError;

    /// Parse a string of `0` and `1` characters.
    fn from_str(s: &str) -> Result<Self> {
        let bits = s
            .trim()
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(DedupError::InvalidBits(format!(
                    "unexpected character {other:?}"
                ))),
            })
            .collect::<Result<Vec<bool>>>()?;
        Ok(Self::from_bools(&bits))
    }
}

impl Serialize for BitHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BitHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Average hash: bit `i` is set iff `luma[i] > mean`. Length = pixel count.
pub fn average_hash(luma: &LumaBuffer) -> BitHash {
    let pixels = luma.pixels();
    if pixels.is_empty() {
        return BitHash::from_bools(&[]);
    }
    let sum: u64 = pixels.iter().map(|&p| u64::from(p)).sum();
    let mean = sum as f64 / pixels.len() as f64;

    let bits: Vec<bool> = pixels.iter().map(|&p| f64::from(p) > mean).collect();
    BitHash::from_bools(&bits)
}

/// Difference hash: per row, bit set iff `luma[y][x] > luma[y][x + 1]`.
/// Length = `height * (width - 1)`.
pub fn difference_hash(luma: &LumaBuffer) -> BitHash {
    let bits: Vec<bool> = luma
        .rows()
        .flat_map(|row| row.windows(2).map(|pair| pair[0] > pair[1]))
        .collect();
    BitHash::from_bools(&bits)
}

/// Perceptual hash extractor bound to one grid size.
///
/// Keeps the cosine table around so batch fingerprinting does not rebuild it.
#[derive(Debug, Clone)]
pub struct PerceptualHasher {
    dct: Dct2d,
}

impl PerceptualHasher {
    /// # Panics
    /// If `grid_size` is smaller than [`LOW_FREQ_SIZE`].
    pub fn new(grid_size: usize) -> Self {
        assert!(
            grid_size >= LOW_FREQ_SIZE,
            "perceptual hash grid must be at least {LOW_FREQ_SIZE}x{LOW_FREQ_SIZE}"
        );
        Self {
            dct: Dct2d::new(grid_size),
        }
    }

    pub fn grid_size(&self) -> usize {
        self.dct.size()
    }

    /// Hash a square buffer matching this hasher's grid size.
    ///
    /// The threshold is the arithmetic mean of the 63 low-frequency
    /// coefficients, not their median.
    pub fn hash(&self, luma: &LumaBuffer) -> Result<BitHash> {
        let n = self.grid_size();
        if !luma.is_square() || luma.width() as usize != n {
            return Err(DedupError::GridShape {
                width: luma.width(),
                height: luma.height(),
                min: n as u32,
            });
        }

        let matrix: Vec<f64> = luma.pixels().iter().map(|&p| f64::from(p)).collect();
        let coeffs = self.dct.transform(&matrix);

        let band: Vec<f64> = (0..LOW_FREQ_SIZE)
            .flat_map(|u| (0..LOW_FREQ_SIZE).map(move |v| (u, v)))
            .filter(|&(u, v)| (u, v) != (0, 0))
            .map(|(u, v)| coeffs[u * n + v])
            .collect();
        let mean = band.iter().sum::<f64>() / band.len() as f64;

        let bits: Vec<bool> = band.iter().map(|&c| c > mean).collect();
        Ok(BitHash::from_bools(&bits))
    }
}

/// Perceptual hash of any square buffer of at least 8x8.
pub fn perceptual_hash(luma: &LumaBuffer) -> Result<BitHash> {
    let n = luma.width();
    if !luma.is_square() || (n as usize) < LOW_FREQ_SIZE {
        return Err(DedupError::GridShape {
            width: luma.width(),
            height: luma.height(),
            min: LOW_FREQ_SIZE as u32,
        });
    }
    PerceptualHasher::new(n as usize).hash(luma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn noise(n: u32, seed: u32) -> LumaBuffer {
        let mut state = seed.wrapping_mul(2654435761).wrapping_add(12345);
        let data = (0..n * n)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                (state >> 16) as u8
            })
            .collect();
        LumaBuffer::new(n, n, data).unwrap()
    }

    #[test]
    fn test_bit_string_roundtrip() {
        let text = "1011001110001";
        let hash: BitHash = text.parse().unwrap();
        assert_eq!(hash.len(), 13);
        assert_eq!(hash.to_string(), text);
        assert_eq!(hash.get(0), Some(true));
        assert_eq!(hash.get(1), Some(false));
        assert_eq!(hash.get(13), None);
        assert_eq!(hash.to_hex(), "b388");
    }

    #[test]
    fn test_invalid_bit_string() {
        assert!(matches!(
            "01x1".parse::<BitHash>(),
            Err(DedupError::InvalidBits(_))
        ));
    }

    #[test]
    fn test_hamming_distance() {
        let h1: BitHash = "11110000".parse().unwrap();
        let h2: BitHash = "11110000".parse().unwrap();
        assert_eq!(h1.hamming(&h2), Some(0));

        let h3: BitHash = "11110001".parse().unwrap();
        assert_eq!(h1.hamming(&h3), Some(1));
        assert_eq!(h1.normalized_distance(&h3), Some(0.125));

        let short: BitHash = "1111000".parse().unwrap();
        assert_eq!(h1.hamming(&short), None);
    }

    #[test]
    fn test_average_hash_ties_are_zero() {
        // mean is 20; the two 20s sit exactly on it
        let luma = LumaBuffer::new(2, 2, vec![10, 20, 20, 30]).unwrap();
        assert_eq!(average_hash(&luma).to_string(), "0001");

        let flat = LumaBuffer::new(8, 8, vec![128; 64]).unwrap();
        assert_eq!(average_hash(&flat).count_ones(), 0);
    }

    #[test]
    fn test_difference_hash_row_major() {
        let luma = LumaBuffer::new(3, 2, vec![3, 2, 2, 1, 2, 3]).unwrap();
        // row 0: 3>2, 2>2 ; row 1: 1>2, 2>3
        assert_eq!(difference_hash(&luma).to_string(), "1000");
    }

    #[test]
    fn test_hash_lengths_for_8x8() {
        let luma = noise(8, 1);
        assert_eq!(average_hash(&luma).len(), 64);
        assert_eq!(difference_hash(&luma).len(), 56);
        assert_eq!(perceptual_hash(&luma).unwrap().len(), PERCEPTUAL_HASH_BITS);
    }

    #[test]
    fn test_perceptual_hash_on_larger_grid() {
        let luma = noise(16, 3);
        assert_eq!(perceptual_hash(&luma).unwrap().len(), 63);
        assert_eq!(average_hash(&luma).len(), 256);
        assert_eq!(difference_hash(&luma).len(), 240);
    }

    #[test]
    fn test_perceptual_hash_rejects_bad_shapes() {
        let wide = LumaBuffer::new(16, 8, vec![0; 128]).unwrap();
        assert!(matches!(
            perceptual_hash(&wide),
            Err(DedupError::GridShape { width: 16, height: 8, .. })
        ));

        let small = LumaBuffer::new(4, 4, vec![0; 16]).unwrap();
        assert!(perceptual_hash(&small).is_err());

        let hasher = PerceptualHasher::new(8);
        assert!(hasher.hash(&noise(16, 2)).is_err());
    }

    #[test]
    fn test_perceptual_hash_uses_mean_threshold() {
        let luma = noise(8, 7);
        let hash = perceptual_hash(&luma).unwrap();

        let matrix: Vec<f64> = luma.pixels().iter().map(|&p| f64::from(p)).collect();
        let coeffs = crate::dct::dct_2d(&matrix, 8);
        let band = &coeffs[1..];
        let mean = band.iter().sum::<f64>() / 63.0;
        let expected: Vec<bool> = band.iter().map(|&c| c > mean).collect();
        assert_eq!(hash, BitHash::from_bools(&expected));
    }

    #[test]
    fn test_bit_hash_serializes_as_bit_string() {
        let hash: BitHash = "0110".parse().unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, "\"0110\"");
        let back: BitHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    fn luma_strategy() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(0u8..=200, 64)
    }

    proptest! {
        #[test]
        fn prop_hashes_are_deterministic(data in luma_strategy()) {
            let a = LumaBuffer::new(8, 8, data.clone()).unwrap();
            let b = LumaBuffer::new(8, 8, data).unwrap();
            prop_assert_eq!(average_hash(&a), average_hash(&b));
            prop_assert_eq!(difference_hash(&a), difference_hash(&b));
            prop_assert_eq!(perceptual_hash(&a).unwrap(), perceptual_hash(&b).unwrap());
        }

        #[test]
        fn prop_lengths_are_fixed(data in luma_strategy()) {
            let luma = LumaBuffer::new(8, 8, data).unwrap();
            prop_assert_eq!(average_hash(&luma).len(), 64);
            prop_assert_eq!(difference_hash(&luma).len(), 56);
            prop_assert_eq!(perceptual_hash(&luma).unwrap().len(), 63);
        }
    }

    #[test]
    fn test_perceptual_hash_ignores_uniform_brightness_offset() {
        for seed in 0..16 {
            let base = noise(8, seed);
            let clipped: Vec<u8> = base.pixels().iter().map(|&p| p / 2).collect();
            let dark = LumaBuffer::new(8, 8, clipped.clone()).unwrap();
            let bright =
                LumaBuffer::new(8, 8, clipped.iter().map(|&p| p + 40).collect()).unwrap();

            assert_eq!(perceptual_hash(&dark).unwrap(), perceptual_hash(&bright).unwrap());
        }
    }
}
