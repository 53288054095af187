//! Door-open classification.
//!
//! With the door open the lintel area in the upper-center of the frame is
//! washed out by daylight, so a bright-pixel ratio over that ROI is enough.

use log::debug;

use crate::frame::{Frame, PixelRect};
use crate::Roi;

/// Per-frame door classifier: `is_open(frame, roi) -> bool`.
pub trait DoorClassifier {
    fn is_open(&self, frame: &Frame, roi: &Roi) -> bool;
}

impl<C: DoorClassifier + ?Sized> DoorClassifier for Box<C> {
    fn is_open(&self, frame: &Frame, roi: &Roi) -> bool {
        (**self).is_open(frame, roi)
    }
}

pub const DEFAULT_BRIGHTNESS_THRESHOLD: u8 = 210;
pub const DEFAULT_MIN_BRIGHT_RATIO: f32 = 0.4;

/// ROI crop -> grayscale -> bright mask -> ratio compare.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrightnessDoorClassifier {
    /// Pixels with luma strictly above this count as bright.
    pub brightness_threshold: u8,
    /// Door is open when the bright fraction strictly exceeds this.
    pub min_bright_ratio: f32,
}

impl BrightnessDoorClassifier {
    pub fn new(brightness_threshold: u8, min_bright_ratio: f32) -> Self {
        Self {
            brightness_threshold,
            min_bright_ratio,
        }
    }

    /// Fraction of bright pixels inside `rect`. `None` for an empty crop.
    pub fn bright_ratio(&self, frame: &Frame, rect: PixelRect) -> Option<f32> {
        let area = rect.area();
        if area == 0 {
            return None;
        }
        let mut bright = 0u64;
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                if frame.luma_at(x, y) > self.brightness_threshold {
                    bright += 1;
                }
            }
        }
        Some((bright as f64 / area as f64) as f32)
    }
}

impl Default for BrightnessDoorClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_BRIGHTNESS_THRESHOLD, DEFAULT_MIN_BRIGHT_RATIO)
    }
}

impl DoorClassifier for BrightnessDoorClassifier {
    fn is_open(&self, frame: &Frame, roi: &Roi) -> bool {
        let rect = PixelRect::from_roi(roi, frame.width(), frame.height());
        match self.bright_ratio(frame, rect) {
            Some(ratio) => {
                debug!("door roi bright ratio {:.3}", ratio);
                ratio > self.min_bright_ratio
            }
            None => false,
        }
    }
}
