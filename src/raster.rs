//! Decoding and resizing through the `image` crate.
//!
//! The hashing core only sees fixed-size pixel buffers; this module is the
//! bridge from files and [`DynamicImage`]s to those buffers. Fingerprinting is
//! independent per image, so batches run on the rayon pool and are joined
//! before clustering.

use crate::config::DedupConfig;
use crate::duplicate::{DuplicateFinder, DuplicateGroup, ImageRecord};
use crate::error::{DedupError, Result};
use crate::fingerprint::Fingerprint;
use crate::hash::PerceptualHasher;
use crate::luma::LumaBuffer;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Caller-side metadata attached to records built from files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    /// File size on disk in bytes, 0 when unavailable.
    pub byte_size: u64,
}

/// Reduce a decoded image to a `grid_size` square and fingerprint it.
///
/// The recorded width and height are those of `img`, not of the grid.
pub fn fingerprint_image(img: &DynamicImage, grid_size: u32) -> Result<Fingerprint> {
    let hasher = grid_hasher(grid_size)?;
    fingerprint_with(img, &hasher)
}

/// Open, decode and fingerprint one file.
pub fn fingerprint_path<P: AsRef<Path>>(path: P, grid_size: u32) -> Result<Fingerprint> {
    let hasher = grid_hasher(grid_size)?;
    fingerprint_file(path.as_ref(), &hasher)
}

/// Fingerprint many files in parallel. One result per input, in input order.
pub fn fingerprint_paths<P>(paths: &[P], grid_size: u32) -> Result<Vec<(PathBuf, Result<Fingerprint>)>>
where
    P: AsRef<Path> + Sync,
{
    let hasher = grid_hasher(grid_size)?;
    let results: Vec<(PathBuf, Result<Fingerprint>)> = paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            (path.to_path_buf(), fingerprint_file(path, &hasher))
        })
        .collect();

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    log::info!("Fingerprinted {} images ({} failed)", results.len() - failed, failed);
    Ok(results)
}

/// Fingerprint `paths` and group the ones that decode.
///
/// Files that cannot be decoded are skipped with a warning; everything else
/// is clustered in input order under `config`.
pub fn find_duplicates_in_paths<P>(
    paths: &[P],
    config: &DedupConfig,
) -> Result<Vec<DuplicateGroup<SourceFile>>>
where
    P: AsRef<Path> + Sync,
{
    config.validate()?;

    let records: Vec<ImageRecord<SourceFile>> = fingerprint_paths(paths, config.grid_size)?
        .into_iter()
        .filter_map(|(path, result)| match result {
            Ok(fingerprint) => {
                let byte_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                let id = path.to_string_lossy().into_owned();
                Some(ImageRecord::with_metadata(
                    id,
                    fingerprint,
                    SourceFile { path, byte_size },
                ))
            }
            Err(e) => {
                log::warn!("Failed to hash {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    DuplicateFinder::from_config(config).find(&records)
}

fn grid_hasher(grid_size: u32) -> Result<PerceptualHasher> {
    if (grid_size as usize) < crate::hash::LOW_FREQ_SIZE {
        return Err(DedupError::GridShape {
            width: grid_size,
            height: grid_size,
            min: crate::hash::LOW_FREQ_SIZE as u32,
        });
    }
    Ok(PerceptualHasher::new(grid_size as usize))
}

fn fingerprint_file(path: &Path, hasher: &PerceptualHasher) -> Result<Fingerprint> {
    let img = image::open(path).map_err(|source| DedupError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    fingerprint_with(&img, hasher)
}

fn fingerprint_with(img: &DynamicImage, hasher: &PerceptualHasher) -> Result<Fingerprint> {
    let (width, height) = img.dimensions();
    let grid = hasher.grid_size() as u32;
    let resized = img.resize_exact(grid, grid, FilterType::Lanczos3).to_rgba8();
    let luma = LumaBuffer::from_rgba(resized.as_raw(), grid, grid)?;
    Fingerprint::with_hasher(&luma, hasher, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};
    use tempfile::TempDir;

    fn checkerboard(size: u32, cell: u32) -> RgbImage {
        ImageBuffer::from_fn(size, size, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Rgb([230, 230, 230])
            } else {
                Rgb([20, 20, 20])
            }
        })
    }

    fn gradient(size: u32) -> RgbImage {
        ImageBuffer::from_fn(size, size, |x, y| {
            let v = ((x + y) * 255 / (2 * size)) as u8;
            Rgb([v, 255 - v, v / 2])
        })
    }

    #[test]
    fn test_fingerprint_image_records_source_size() {
        let img = DynamicImage::ImageRgb8(checkerboard(64, 8));
        let fp = fingerprint_image(&img, 8).unwrap();
        assert_eq!((fp.width, fp.height), (64, 64));
        assert_eq!(fp.average_hash.len(), 64);
        assert_eq!(fp.difference_hash.len(), 56);
        assert_eq!(fp.perceptual_hash.len(), 63);
    }

    #[test]
    fn test_grid_below_minimum_is_rejected() {
        let img = DynamicImage::ImageRgb8(checkerboard(32, 4));
        let err = fingerprint_image(&img, 4).unwrap_err();
        assert!(matches!(err, DedupError::GridShape { .. }));
    }

    #[test]
    fn test_rescaled_copy_is_similar() {
        let small = DynamicImage::ImageRgb8(gradient(64));
        let large = small.resize_exact(256, 256, FilterType::Triangle);

        let a = fingerprint_image(&small, 8).unwrap();
        let b = fingerprint_image(&large, 8).unwrap();
        assert!(a.similarity(&b).unwrap() >= 0.75);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let err = fingerprint_path(dir.path().join("nope.png"), 8).unwrap_err();
        assert!(matches!(err, DedupError::Decode { .. }));
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_find_duplicates_in_paths() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("original.png");
        let copy = dir.path().join("copy.png");
        let other = dir.path().join("other.png");
        let broken = dir.path().join("broken.png");

        checkerboard(64, 8).save(&original).unwrap();
        checkerboard(64, 8).save(&copy).unwrap();
        gradient(64).save(&other).unwrap();
        std::fs::write(&broken, b"not an image").unwrap();

        let paths = vec![original.clone(), broken, other, copy.clone()];
        let groups = find_duplicates_in_paths(&paths, &DedupConfig::default()).unwrap();

        assert_eq!(groups.len(), 1);
        let files: Vec<&PathBuf> = groups[0].iter().map(|r| &r.metadata.path).collect();
        assert_eq!(files, vec![&original, &copy]);
        assert!(groups[0].seed().metadata.byte_size > 0);
    }

    #[test]
    fn test_fingerprint_paths_keeps_order_and_failures() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.png");
        checkerboard(32, 4).save(&good).unwrap();
        let missing = dir.path().join("missing.png");

        let results = fingerprint_paths(&[missing.clone(), good.clone()], 8).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, missing);
        assert!(results[0].1.is_err());
        assert_eq!(results[1].0, good);
        assert!(results[1].1.is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected_before_io() {
        let config = DedupConfig::default().with_threshold(2.0);
        let paths: Vec<PathBuf> = Vec::new();
        assert!(matches!(
            find_duplicates_in_paths(&paths, &config),
            Err(DedupError::InvalidConfig { .. })
        ));
    }
}
