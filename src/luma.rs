//! Luminance buffers and the RGB(A) to grayscale reduction.

use crate::error::{DedupError, Result};

/// Weights applied to the red, green and blue channels.
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Immutable single-channel raster, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl LumaBuffer {
    /// Wrap already-reduced luminance values.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        check_len(width, height, 1, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Reduce an RGBA buffer (4 bytes per pixel). Alpha is ignored.
    pub fn from_rgba(rgba: &[u8], width: u32, height: u32) -> Result<Self> {
        Self::from_interleaved(rgba, width, height, 4)
    }

    /// Reduce an RGB buffer (3 bytes per pixel).
    pub fn from_rgb(rgb: &[u8], width: u32, height: u32) -> Result<Self> {
        Self::from_interleaved(rgb, width, height, 3)
    }

    fn from_interleaved(bytes: &[u8], width: u32, height: u32, channels: usize) -> Result<Self> {
        check_len(width, height, channels, bytes.len())?;
        let data = bytes
            .chunks_exact(channels)
            .map(|px| luminance(px[0], px[1], px[2]))
            .collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pixel rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.width.max(1) as usize)
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }
}

/// `floor(0.299 R + 0.587 G + 0.114 B)`.
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let [wr, wg, wb] = LUMA_WEIGHTS;
    let y = f64::from(r) * wr + f64::from(g) * wg + f64::from(b) * wb;
    y.floor() as u8
}

fn check_len(width: u32, height: u32, channels: usize, actual: usize) -> Result<()> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels));
    if expected == Some(actual) {
        Ok(())
    } else {
        Err(DedupError::BufferSize {
            width,
            height,
            channels,
            actual,
        })
    }
}
