//! Orthonormal 2D DCT-II.
//!
//! Computed separably (rows, then columns) from a precomputed cosine table,
//! which gives the same coefficients as the direct quadruple sum in O(N^3).

use std::f64::consts::PI;

/// DCT-II of a fixed square size. Reusable across images.
#[derive(Debug, Clone)]
pub struct Dct2d {
    size: usize,
    /// `cos_table[u * size + x] = cos((2x + 1) u pi / 2N)`
    cos_table: Vec<f64>,
}

impl Dct2d {
    pub fn new(size: usize) -> Self {
        let n = size as f64;
        let cos_table = (0..size)
            .flat_map(|u| {
                (0..size).map(move |x| ((2 * x + 1) as f64 * u as f64 * PI / (2.0 * n)).cos())
            })
            .collect();
        Self { size, cos_table }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Transform a row-major `size x size` matrix. Output coefficient `(u, v)`
    /// lives at `u * size + v`, with `u` the vertical frequency.
    ///
    /// # Panics
    /// If `matrix.len() != size * size`.
    pub fn transform(&self, matrix: &[f64]) -> Vec<f64> {
        let n = self.size;
        assert_eq!(matrix.len(), n * n, "DCT input must be {n}x{n}");

        // Along each row: temp[r][v]
        let mut temp = vec![0.0; n * n];
        for r in 0..n {
            let row = &matrix[r * n..(r + 1) * n];
            for v in 0..n {
                let basis = &self.cos_table[v * n..(v + 1) * n];
                let sum: f64 = row.iter().zip(basis).map(|(p, c)| p * c).sum();
                temp[r * n + v] = sum * self.scale(v);
            }
        }

        // Down each column: out[u][v]
        let mut out = vec![0.0; n * n];
        for v in 0..n {
            for u in 0..n {
                let basis = &self.cos_table[u * n..(u + 1) * n];
                let sum: f64 = (0..n).map(|r| temp[r * n + v] * basis[r]).sum();
                out[u * n + v] = sum * self.scale(u);
            }
        }

        out
    }

    /// `1/sqrt(N)` for the zero frequency, `sqrt(2/N)` otherwise.
    fn scale(&self, k: usize) -> f64 {
        let n = self.size as f64;
        if k == 0 {
            (1.0 / n).sqrt()
        } else {
            (2.0 / n).sqrt()
        }
    }
}

/// One-shot convenience over [`Dct2d`].
pub fn dct_2d(matrix: &[f64], size: usize) -> Vec<f64> {
    Dct2d::new(size).transform(matrix)
}
