use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};

use super::DepthError;

/// Dense per-pixel depth, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl DepthMap {
    /// Wrap engine output. The length must match the dimensions and the map
    /// must not be empty.
    pub fn new(values: Vec<f32>, width: u32, height: u32) -> Result<Self, DepthError> {
        if width == 0 || height == 0 {
            return Err(DepthError::BadOutput(format!(
                "empty depth map {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(DepthError::BadOutput(format!(
                "depth map {}x{} needs {} values, got {}",
                width,
                height,
                expected,
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Map with the same depth everywhere.
    pub fn uniform(width: u32, height: u32, depth: f32) -> Self {
        Self {
            width,
            height,
            values: vec![depth; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// Resample to `width` x `height` with bilinear filtering.
    ///
    /// `imageops` clamps float samples to [0, 1], so values are mapped onto
    /// that range around the resample and mapped back afterwards.
    /// Non-finite samples are treated as the farthest finite depth.
    pub fn resized(&self, width: u32, height: u32) -> DepthMap {
        if (width, height) == self.dimensions() {
            return self.clone();
        }
        if width == 0 || height == 0 {
            return Self {
                width,
                height,
                values: Vec::new(),
            };
        }

        let finite = self.values.iter().copied().filter(|v| v.is_finite());
        let (lo, hi) = finite.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !lo.is_finite() {
            return Self::uniform(width, height, f32::INFINITY);
        }
        let span = hi - lo;
        if span <= 0.0 {
            return Self::uniform(width, height, lo);
        }

        let unit: Vec<f32> = self
            .values
            .iter()
            .map(|v| if v.is_finite() { (v - lo) / span } else { 1.0 })
            .collect();
        let Some(source) = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(self.width, self.height, unit)
        else {
            return Self::uniform(width, height, hi);
        };
        let resampled = imageops::resize(&source, width, height, FilterType::Triangle);
        let values = resampled
            .into_raw()
            .into_iter()
            .map(|v| lo + v * span)
            .collect();

        Self {
            width,
            height,
            values,
        }
    }
}
