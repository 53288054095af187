//! Image directory replay (`dir://<path>`).
//!
//! Replays JPEG/PNG stills in file-name order. Used to re-run recorded door
//! sequences on a bench without the camera attached.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Replays still images from a local directory.
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
    looping: bool,
    frame_count: u64,
    last_error: Option<String>,
}

impl ImageDirSource {
    /// List the directory once. Fails when it holds no supported images.
    pub fn new<P: AsRef<Path>>(dir: P, looping: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let mut files = Vec::new();
        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("read image directory {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_supported_image(&path) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(anyhow!("no jpeg/png images in {}", dir.display()));
        }
        files.sort();
        Ok(Self {
            dir,
            files,
            position: 0,
            looping,
            frame_count: 0,
            last_error: None,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageDirSource {
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "ImageDirSource: replaying {} images from {}{}",
            self.files.len(),
            self.dir.display(),
            if self.looping { " (looping)" } else { "" }
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.position >= self.files.len() {
            if !self.looping {
                return Ok(None);
            }
            self.position = 0;
        }
        let path = &self.files[self.position];
        self.position += 1;

        let image = image::open(path)
            .with_context(|| format!("decode {}", path.display()))
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                err
            })?;
        self.last_error = None;
        self.frame_count += 1;
        Ok(Some(Frame::from_rgb_image(image.to_rgb8())))
    }

    fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: format!("dir://{}", self.dir.display()),
        }
    }
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
