//! Error types shared by the hashing and clustering code.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which of the three fingerprint hashes an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Average,
    Difference,
    Perceptual,
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashKind::Average => write!(f, "average"),
            HashKind::Difference => write!(f, "difference"),
            HashKind::Perceptual => write!(f, "perceptual"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("pixel buffer holds {actual} bytes, expected {width}x{height} with {channels} channels")]
    BufferSize {
        width: u32,
        height: u32,
        channels: usize,
        actual: usize,
    },

    #[error("perceptual hash needs a square grid of at least {min}x{min}, got {width}x{height}")]
    GridShape { width: u32, height: u32, min: u32 },

    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{kind} hash length mismatch: {left} vs {right} bits")]
    HashLengthMismatch {
        kind: HashKind,
        left: usize,
        right: usize,
    },

    #[error("invalid bit string: {0}")]
    InvalidBits(String),

    #[error("invalid configuration: {field} - {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl DedupError {
    /// True for failures caused by the input raster rather than by a comparison.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            DedupError::BufferSize { .. } | DedupError::GridShape { .. } | DedupError::Decode { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DedupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_error_grouping() {
        let shape = DedupError::GridShape {
            width: 8,
            height: 4,
            min: 8,
        };
        assert!(shape.is_shape_error());

        let mismatch = DedupError::HashLengthMismatch {
            kind: HashKind::Perceptual,
            left: 63,
            right: 255,
        };
        assert!(!mismatch.is_shape_error());
        assert_eq!(
            mismatch.to_string(),
            "perceptual hash length mismatch: 63 vs 255 bits"
        );
    }
}
