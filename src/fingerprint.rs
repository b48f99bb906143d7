//! Per-image fingerprints and the weighted multi-hash similarity score.

use crate::config::SimilarityWeights;
use crate::error::{DedupError, HashKind, Result};
use crate::hash::{average_hash, difference_hash, BitHash, PerceptualHasher, LOW_FREQ_SIZE};
use crate::luma::LumaBuffer;
use serde::{Deserialize, Serialize};

/// The three hashes of one image plus its source dimensions.
///
/// `width` and `height` are for display; they never affect similarity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub average_hash: BitHash,
    pub difference_hash: BitHash,
    pub perceptual_hash: BitHash,
    pub width: u32,
    pub height: u32,
}

impl Fingerprint {
    /// Hash an already-reduced luminance grid.
    pub fn from_luma(luma: &LumaBuffer, width: u32, height: u32) -> Result<Self> {
        check_grid(luma)?;
        let hasher = PerceptualHasher::new(luma.width() as usize);
        Self::with_hasher(luma, &hasher, width, height)
    }

    /// Like [`Fingerprint::from_luma`] but reuses a prepared perceptual hasher.
    pub fn with_hasher(
        luma: &LumaBuffer,
        hasher: &PerceptualHasher,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        Ok(Self {
            perceptual_hash: hasher.hash(luma)?,
            average_hash: average_hash(luma),
            difference_hash: difference_hash(luma),
            width,
            height,
        })
    }

    /// Similarity under the default weights.
    pub fn similarity(&self, other: &Fingerprint) -> Result<f64> {
        SimilarityWeights::default().score(self, other)
    }
}

/// Fingerprint an RGBA raster that has already been resized to the hashing grid.
///
/// `rgba` is `width * height * 4` bytes and the grid must be square and at
/// least 8x8. Callers that know the original image size should go through
/// [`Fingerprint::from_luma`] to record it instead of the grid size.
pub fn compute_fingerprint(rgba: &[u8], width: u32, height: u32) -> Result<Fingerprint> {
    let luma = LumaBuffer::from_rgba(rgba, width, height)?;
    Fingerprint::from_luma(&luma, width, height)
}

fn check_grid(luma: &LumaBuffer) -> Result<()> {
    if luma.is_square() && luma.width() as usize >= LOW_FREQ_SIZE {
        Ok(())
    } else {
        Err(DedupError::GridShape {
            width: luma.width(),
            height: luma.height(),
            min: LOW_FREQ_SIZE as u32,
        })
    }
}

impl SimilarityWeights {
    /// `1 - (wa * dA + wd * dD + wp * dP)` over normalized Hamming distances.
    ///
    /// Not clamped: weights that do not sum to 1 can push the result outside [0, 1].
    pub fn score(&self, a: &Fingerprint, b: &Fingerprint) -> Result<f64> {
        let average = distance(HashKind::Average, &a.average_hash, &b.average_hash)?;
        let difference = distance(HashKind::Difference, &a.difference_hash, &b.difference_hash)?;
        let perceptual = distance(HashKind::Perceptual, &a.perceptual_hash, &b.perceptual_hash)?;

        Ok(1.0
            - (self.average * average
                + self.difference * difference
                + self.perceptual * perceptual))
    }
}

/// Similarity of two fingerprints under the default 0.30 / 0.30 / 0.40 weights.
pub fn similarity(a: &Fingerprint, b: &Fingerprint) -> Result<f64> {
    a.similarity(b)
}

fn distance(kind: HashKind, left: &BitHash, right: &BitHash) -> Result<f64> {
    left.normalized_distance(right)
        .ok_or_else(|| DedupError::HashLengthMismatch {
            kind,
            left: left.len(),
            right: right.len(),
        })
}
