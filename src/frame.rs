//! Camera frames.
//!
//! - `Frame`: owned RGB8 pixel buffer, handed from a source to one phase
//!   iteration and dropped before the next one.
//! - `PixelRect`: integer crop rectangle derived from a normalized `Roi`.

use anyhow::{anyhow, Result};

use crate::Roi;

/// Bytes per pixel (packed RGB).
pub const CHANNELS: usize = 3;

// ----------------------------------------------------------------------------
// Frame: opaque pixel container
// ----------------------------------------------------------------------------

/// Opaque RGB8 frame, row-major, no padding between rows.
///
/// Frames are never cloned by the gate; each one lives for a single
/// classification or inference call.
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap packed RGB bytes. Fails when the length does not match the
    /// dimensions.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(CHANNELS))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "frame length mismatch: {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    /// Frame filled with a single color.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            pixels.extend_from_slice(&rgb);
        }
        Self {
            pixels,
            width,
            height,
        }
    }

    pub fn from_rgb_image(image: image::RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            pixels: image.into_raw(),
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True when the frame has no pixels at all.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Packed RGB bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    /// Grayscale value at (x, y) using ITU-R BT.601 weights.
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        let [r, g, b] = self.rgb_at(x, y);
        luma(r, g, b)
    }

    /// Paint a rectangle (diagnostics and synthetic scenes).
    pub fn fill_rect(&mut self, rect: PixelRect, rgb: [u8; 3]) {
        let rect = rect.clamp_to(self.width, self.height);
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
                self.pixels[i..i + CHANNELS].copy_from_slice(&rgb);
            }
        }
    }

    /// Copy into an `image` buffer for resampling.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }
}

/// BT.601 luma, rounded, integer arithmetic.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000) as u8
}

// ----------------------------------------------------------------------------
// PixelRect: integer crop window
// ----------------------------------------------------------------------------

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    /// Scale a normalized ROI to pixel bounds, truncating toward zero.
    pub fn from_roi(roi: &Roi, width: u32, height: u32) -> Self {
        let scale = |fraction: f32, extent: u32| (extent as f32 * fraction) as u32;
        Self {
            x0: scale(roi.left(), width),
            x1: scale(roi.right(), width),
            y0: scale(roi.top(), height),
            y1: scale(roi.bottom(), height),
        }
        .clamp_to(width, height)
    }

    pub fn clamp_to(self, width: u32, height: u32) -> Self {
        let x1 = self.x1.min(width);
        let y1 = self.y1.min(height);
        Self {
            x0: self.x0.min(x1),
            y0: self.y0.min(y1),
            x1,
            y1,
        }
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
