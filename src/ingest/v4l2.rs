//! V4L2 frame source.
//!
//! Captures from a local device node (e.g. /dev/video0). RGB24 is requested;
//! when the driver insists on YUYV or NV12 the frames are converted to RGB
//! before they leave this module.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;
use std::time::{Duration, Instant};

use super::normalize::{normalize_to_rgb, PixelFormat};
use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const STREAM_BUFFERS: u32 = 4;
const MIN_HEALTH_GRACE: Duration = Duration::from_secs(2);
/// Frames that may be missed before the source reports unhealthy.
const MISSED_FRAMES_TOLERATED: u32 = 6;

/// Configuration for a V4L2 source.
#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Requested frame rate; 0 leaves the driver default.
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// What the driver actually agreed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ActiveFormat {
    width: u32,
    height: u32,
    pixels: PixelFormat,
}

#[self_referencing]
struct Capture {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

/// USB camera via libv4l memory-mapped streaming.
pub struct V4l2Source {
    config: V4l2Config,
    capture: Option<Capture>,
    format: ActiveFormat,
    frames: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
}

impl V4l2Source {
    /// Nothing is opened until [`FrameSource::connect`].
    pub fn new(config: V4l2Config) -> Self {
        Self {
            format: ActiveFormat {
                width: config.width,
                height: config.height,
                pixels: PixelFormat::Rgb24,
            },
            config,
            capture: None,
            frames: 0,
            last_frame_at: None,
            last_error: None,
        }
    }

    fn health_grace(&self) -> Duration {
        if self.config.target_fps == 0 {
            return MIN_HEALTH_GRACE;
        }
        let interval = Duration::from_millis(1000 / u64::from(self.config.target_fps));
        (interval * MISSED_FRAMES_TOLERATED).max(MIN_HEALTH_GRACE)
    }

    fn record_error(&mut self, err: &anyhow::Error) {
        self.last_error = Some(format!("{:#}", err));
    }
}

/// Ask for RGB24 at the configured size and accept whatever the driver
/// settles on, as long as we can convert it.
fn negotiate(device: &v4l::Device, config: &V4l2Config) -> Result<ActiveFormat> {
    use v4l::video::Capture as _;

    let mut wanted = device.format().context("read v4l2 format")?;
    wanted.width = config.width;
    wanted.height = config.height;
    wanted.fourcc = v4l::FourCC::new(b"RGB3");

    let granted = device.set_format(&wanted).or_else(|err| {
        log::warn!(
            "V4l2Source: {} refused RGB24 {}x{}: {}",
            config.device,
            config.width,
            config.height,
            err
        );
        device.format().context("read v4l2 format after refusal")
    })?;
    let pixels = PixelFormat::from_fourcc(&granted.fourcc.repr).ok_or_else(|| {
        anyhow!(
            "v4l2 device {} delivers unsupported pixel format {}",
            config.device,
            granted.fourcc
        )
    })?;

    if config.target_fps > 0 {
        let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
        if let Err(err) = device.set_params(&params) {
            log::warn!(
                "V4l2Source: {} ignores {} fps: {}",
                config.device,
                config.target_fps,
                err
            );
        }
    }

    Ok(ActiveFormat {
        width: granted.width,
        height: granted.height,
        pixels,
    })
}

impl FrameSource for V4l2Source {
    fn connect(&mut self) -> Result<()> {
        let opened = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device))
            .and_then(|device| {
                let format = negotiate(&device, &self.config)?;
                let capture = Capture::try_new(device, |device| {
                    v4l::prelude::MmapStream::with_buffers(
                        device,
                        v4l::buffer::Type::VideoCapture,
                        STREAM_BUFFERS,
                    )
                    .context("create v4l2 buffer stream")
                })?;
                Ok((format, capture))
            });

        let (format, capture) = opened.map_err(|err| {
            self.record_error(&err);
            err
        })?;
        self.format = format;
        self.capture = Some(capture);
        self.last_error = None;

        log::info!(
            "V4l2Source: streaming {} at {}x{} ({:?})",
            self.config.device,
            format.width,
            format.height,
            format.pixels
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let format = self.format;
        let capture = self.capture.as_mut().context("v4l2 device not connected")?;
        let converted = capture.with_mut(|fields| -> Result<Vec<u8>> {
            let (buf, meta) = fields.stream.next().context("capture v4l2 frame")?;
            // Drivers may hand back a larger buffer than the payload.
            let used = (meta.bytesused as usize).min(buf.len());
            let payload = if used == 0 { buf } else { &buf[..used] };
            normalize_to_rgb(payload, format.width, format.height, format.pixels)
        });

        let rgb = converted.map_err(|err| {
            self.record_error(&err);
            err
        })?;
        self.frames += 1;
        self.last_frame_at = Some(Instant::now());
        self.last_error = None;
        Frame::new(rgb, format.width, format.height).map(Some)
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        self.last_frame_at
            .map_or(true, |at| at.elapsed() <= self.health_grace())
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frames,
            source: self.config.device.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconnected_source_reports_error() {
        let mut source = V4l2Source::new(V4l2Config {
            device: "/dev/video-missing".to_string(),
            ..V4l2Config::default()
        });
        assert!(source.next_frame().is_err());
        assert!(source.connect().is_err());
        assert!(!source.is_healthy());
        assert_eq!(source.stats().frames_captured, 0);
    }

    #[test]
    fn health_grace_scales_with_frame_rate() {
        let slow = V4l2Source::new(V4l2Config {
            target_fps: 1,
            ..V4l2Config::default()
        });
        assert_eq!(slow.health_grace(), Duration::from_secs(6));

        let fast = V4l2Source::new(V4l2Config::default());
        assert_eq!(fast.health_grace(), MIN_HEALTH_GRACE);
    }
}
