//! Synthetic door scene (`stub://`).
//!
//! Gray frames with light sensor noise. After `door_open_after` frames the
//! door band (`door_roi`, upper-center by default) turns white and stays that
//! way, which is what the brightness classifier looks for.
//!
//! - `stub://closed` never opens the door.
//! - any other `stub://` name opens it after the default delay.

use anyhow::Result;
use rand::Rng;

use super::{FrameSource, SourceStats};
use crate::frame::{Frame, PixelRect, CHANNELS};
use crate::Roi;

const BACKGROUND: u8 = 90;
const DOOR_LIGHT: [u8; 3] = [250, 250, 250];

/// Configuration for a synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    /// Frames before the door band lights up; `None` keeps it closed.
    pub door_open_after: Option<u64>,
    /// End of stream after this many frames.
    pub frame_limit: Option<u64>,
    /// Maximum per-channel noise amplitude.
    pub noise: u8,
    /// Region painted white once the door opens.
    pub door_roi: Roi,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            uri: "stub://bench".to_string(),
            width: 640,
            height: 480,
            door_open_after: Some(10),
            frame_limit: None,
            noise: 6,
            door_roi: Roi::door_default(),
        }
    }
}

impl SyntheticConfig {
    pub fn from_uri(uri: &str, width: u32, height: u32) -> Self {
        let door_open_after = match uri.trim_start_matches("stub://") {
            "closed" => None,
            _ => Some(10),
        };
        Self {
            uri: uri.to_string(),
            width,
            height,
            door_open_after,
            ..Self::default()
        }
    }
}

/// Synthetic frame source for bench runs and tests.
pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    fn door_open(&self) -> bool {
        self.config
            .door_open_after
            .is_some_and(|after| self.frame_count > after)
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let count = self.config.width as usize * self.config.height as usize * CHANNELS;
        if self.config.noise == 0 {
            return vec![BACKGROUND; count];
        }
        let mut rng = rand::thread_rng();
        let noise = self.config.noise;
        (0..count)
            .map(|_| BACKGROUND.saturating_add(rng.gen_range(0..=noise)))
            .collect()
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!("SyntheticSource: connected to {}", self.config.uri);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self
            .config
            .frame_limit
            .is_some_and(|limit| self.frame_count >= limit)
        {
            return Ok(None);
        }
        self.frame_count += 1;

        let mut frame = Frame::new(self.generate_pixels(), self.config.width, self.config.height)?;
        if self.door_open() {
            let band = PixelRect::from_roi(&self.config.door_roi, frame.width(), frame.height());
            frame.fill_rect(band, DOOR_LIGHT);
        }
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.uri.clone(),
        }
    }
}
