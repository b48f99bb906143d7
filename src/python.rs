//! Python bindings, built with the `python` feature.

use crate::config::{ClusterStrategy, DedupConfig, DEFAULT_GRID_SIZE, DEFAULT_THRESHOLD};
use crate::error::DedupError;
use crate::fingerprint::{compute_fingerprint as compute, Fingerprint};
use crate::raster::{find_duplicates_in_paths, fingerprint_path};
use pyo3::conversion::ToPyObject;
use pyo3::prelude::*;
use std::collections::HashMap;

impl From<DedupError> for PyErr {
    fn from(err: DedupError) -> Self {
        match err {
            DedupError::Decode { .. } => pyo3::exceptions::PyIOError::new_err(err.to_string()),
            _ => pyo3::exceptions::PyValueError::new_err(err.to_string()),
        }
    }
}

fn to_dict(py: Python<'_>, fp: &Fingerprint) -> HashMap<String, PyObject> {
    let mut map = HashMap::new();
    map.insert("averageHash".to_string(), fp.average_hash.to_string().to_object(py));
    map.insert("differenceHash".to_string(), fp.difference_hash.to_string().to_object(py));
    map.insert("perceptualHash".to_string(), fp.perceptual_hash.to_string().to_object(py));
    map.insert("width".to_string(), fp.width.to_object(py));
    map.insert("height".to_string(), fp.height.to_object(py));
    map
}

/// Fingerprint an RGBA buffer already resized to a square grid (8x8 or larger).
///
/// Returns a dict with "averageHash", "differenceHash" and "perceptualHash"
/// as 0/1 strings, plus "width" and "height".
#[pyfunction]
fn compute_fingerprint(
    py: Python<'_>,
    rgba: Vec<u8>,
    width: u32,
    height: u32,
) -> PyResult<HashMap<String, PyObject>> {
    let fp = compute(&rgba, width, height)?;
    Ok(to_dict(py, &fp))
}

/// Decode, resize and fingerprint an image file.
#[pyfunction]
#[pyo3(signature = (path, grid_size = DEFAULT_GRID_SIZE))]
fn fingerprint_file(
    py: Python<'_>,
    path: &str,
    grid_size: u32,
) -> PyResult<HashMap<String, PyObject>> {
    let fp = fingerprint_path(path, grid_size)?;
    Ok(to_dict(py, &fp))
}

/// Weighted multi-hash similarity of two image files (1.0 = identical).
#[pyfunction]
fn similarity(path1: &str, path2: &str) -> PyResult<f64> {
    let a = fingerprint_path(path1, DEFAULT_GRID_SIZE)?;
    let b = fingerprint_path(path2, DEFAULT_GRID_SIZE)?;
    Ok(a.similarity(&b)?)
}

/// True when the similarity of two image files reaches `threshold`.
#[pyfunction]
#[pyo3(signature = (path1, path2, threshold = DEFAULT_THRESHOLD))]
fn are_similar(path1: &str, path2: &str, threshold: f64) -> PyResult<bool> {
    Ok(similarity(path1, path2)? >= threshold)
}

/// Group duplicate images among `paths`.
///
/// Returns a list of dicts with "paths" (seed first) and "best" (highest resolution).
/// Unreadable files are skipped.
#[pyfunction]
#[pyo3(signature = (paths, threshold = DEFAULT_THRESHOLD, transitive = false))]
fn find_duplicate_images(
    py: Python<'_>,
    paths: Vec<String>,
    threshold: f64,
    transitive: bool,
) -> PyResult<Vec<HashMap<String, PyObject>>> {
    let strategy = if transitive {
        ClusterStrategy::Transitive
    } else {
        ClusterStrategy::Star
    };
    let config = DedupConfig::default()
        .with_threshold(threshold)
        .with_strategy(strategy);

    let groups = py.allow_threads(|| find_duplicates_in_paths(&paths, &config))?;

    Ok(groups
        .iter()
        .map(|group| {
            let members: Vec<String> = group.ids().into_iter().map(String::from).collect();
            let mut map = HashMap::new();
            map.insert("paths".to_string(), members.to_object(py));
            map.insert("best".to_string(), group.best_by_resolution().id.to_object(py));
            map
        })
        .collect())
}

#[pymodule]
fn phashdup_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(compute_fingerprint, m)?)?;
    m.add_function(wrap_pyfunction!(fingerprint_file, m)?)?;
    m.add_function(wrap_pyfunction!(similarity, m)?)?;
    m.add_function(wrap_pyfunction!(are_similar, m)?)?;
    m.add_function(wrap_pyfunction!(find_duplicate_images, m)?)?;

    m.add("DEFAULT_THRESHOLD", DEFAULT_THRESHOLD)?;
    m.add("DEFAULT_GRID_SIZE", DEFAULT_GRID_SIZE)?;

    Ok(())
}
