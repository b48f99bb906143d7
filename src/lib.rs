//! Multi-Hash Perceptual Duplicate Detection
//!
//! Reduces images to three perceptual fingerprints and groups images whose
//! fingerprints are similar enough to count as duplicates:
//! - aHash (Average Hash): pixel vs. global mean
//! - dHash (Difference Hash): left vs. right neighbour
//! - pHash (Perceptual Hash): low-frequency DCT coefficients vs. their mean
//!
//! The hashes are combined into one similarity score,
//! `1 - (0.30 * aHash + 0.30 * dHash + 0.40 * pHash)` over normalized Hamming
//! distances, and images are grouped greedily around the first unclaimed one.
//!
//! The two entry points are [`compute_fingerprint`] (an RGBA buffer already
//! resized to the hashing grid) and [`find_duplicate_groups`]. The [`raster`]
//! module covers the file side through the `image` crate, and the `python`
//! feature exposes the same operations to Python.
//!
//! ```
//! use phashdup_rs::{compute_fingerprint, find_duplicate_groups, ImageRecord};
//!
//! let rgba: Vec<u8> = (0..64u32)
//!     .flat_map(|i| [(i * 4) as u8, (255 - i * 3) as u8, (i * 7 % 256) as u8, 255])
//!     .collect();
//! let fp = compute_fingerprint(&rgba, 8, 8).unwrap();
//!
//! let records = vec![
//!     ImageRecord::new("a.jpg", fp.clone()),
//!     ImageRecord::new("a (1).jpg", fp),
//! ];
//! let groups = find_duplicate_groups(&records, 0.75).unwrap();
//! assert_eq!(groups[0].ids(), ["a.jpg", "a (1).jpg"]);
//! ```

pub mod config;
pub mod dct;
pub mod duplicate;
pub mod error;
pub mod fingerprint;
pub mod hash;
pub mod luma;
pub mod raster;

#[cfg(feature = "python")]
mod python;

pub use config::{ClusterStrategy, DedupConfig, SimilarityWeights, DEFAULT_THRESHOLD};
pub use duplicate::{find_duplicate_groups, DuplicateFinder, DuplicateGroup, ImageRecord};
pub use error::{DedupError, HashKind, Result};
pub use fingerprint::{compute_fingerprint, similarity, Fingerprint};
pub use hash::BitHash;
pub use luma::LumaBuffer;
