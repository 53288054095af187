//! Frame ingestion sources.
//!
//! This module provides different sources for camera frames:
//! - Stub source (`stub://`) with a synthetic door scene
//! - Image directory replay (`dir://<path>`)
//! - USB/V4L2 devices (`/dev/...`, feature: ingest-v4l2)
//!
//! `next_frame` returns `Ok(None)` at end of stream and `Err` for a failed
//! acquisition. Callers treat a failure as a skipped iteration, not a fatal
//! error.

pub mod file;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};

use crate::config::CameraSettings;
use crate::frame::Frame;
use crate::Roi;

pub use file::ImageDirSource;
pub use synthetic::{SyntheticConfig, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

/// A blocking camera frame source.
pub trait FrameSource {
    /// Open the underlying device or stream.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame. `Ok(None)` is end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool;

    /// Get frame statistics.
    fn stats(&self) -> SourceStats;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Open the source named by `settings.source`, by URI scheme. Synthetic
/// scenes light up `door_roi` so they agree with the door classifier.
pub fn open_source(settings: &CameraSettings, door_roi: &Roi) -> Result<Box<dyn FrameSource>> {
    let uri = settings.source.trim();
    if uri.starts_with("stub://") {
        let config = SyntheticConfig {
            door_roi: *door_roi,
            ..SyntheticConfig::from_uri(uri, settings.width, settings.height)
        };
        return Ok(Box::new(SyntheticSource::new(config)));
    }
    if let Some(path) = uri.strip_prefix("dir://") {
        return Ok(Box::new(ImageDirSource::new(path, settings.loop_replay)?));
    }
    if uri.starts_with("/dev/") {
        return open_device(settings);
    }
    Err(anyhow!("unsupported camera source '{}'", uri))
}

#[cfg(feature = "ingest-v4l2")]
fn open_device(settings: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    let config = v4l2::V4l2Config {
        device: settings.source.trim().to_string(),
        target_fps: settings.fps,
        width: settings.width,
        height: settings.height,
    };
    Ok(Box::new(V4l2Source::new(config)))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_device(settings: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    Err(anyhow!(
        "camera {} requires the ingest-v4l2 feature",
        settings.source.trim()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(source: &str) -> CameraSettings {
        CameraSettings {
            source: source.to_string(),
            ..CameraSettings::default()
        }
    }

    fn open(source: &str) -> Result<Box<dyn FrameSource>> {
        open_source(&camera(source), &Roi::door_default())
    }

    #[test]
    fn stub_scheme_opens_synthetic_source() -> Result<()> {
        let mut source = open("stub://bench")?;
        source.connect()?;
        let frame = source.next_frame()?.ok_or_else(|| anyhow!("no frame"))?;
        assert_eq!(frame.dimensions(), (640, 480));
        assert_eq!(source.stats().frames_captured, 1);
        assert_eq!(source.stats().source, "stub://bench");
        Ok(())
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(open("rtsp://10.0.0.2/stream").is_err());
        assert!(open("").is_err());
    }

    #[test]
    fn missing_replay_directory_is_rejected() {
        assert!(open("dir:///nonexistent/boarding-gate-frames").is_err());
    }

    #[test]
    fn stub_source_lights_the_configured_door_roi() -> Result<()> {
        use crate::door::{BrightnessDoorClassifier, DoorClassifier};

        let roi = Roi::new(0.5, 0.8, 0.1, 0.4)?;
        let mut source = open_source(&camera("stub://bench"), &roi)?;
        let classifier = BrightnessDoorClassifier::default();
        let mut opened = false;
        for _ in 0..15 {
            let frame = source.next_frame()?.ok_or_else(|| anyhow!("no frame"))?;
            opened |= classifier.is_open(&frame, &roi);
            assert!(!classifier.is_open(&frame, &Roi::door_default()));
        }
        assert!(opened);
        Ok(())
    }
}
