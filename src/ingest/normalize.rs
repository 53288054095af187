//! Camera pixel formats to packed RGB24.

use anyhow::{anyhow, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    /// Packed 4:2:2, `Y0 U Y1 V` per pixel pair.
    Yuyv,
    /// Full Y plane followed by an interleaved half-resolution UV plane.
    Nv12,
}

impl PixelFormat {
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(PixelFormat::Rgb24),
            b"YUYV" => Some(PixelFormat::Yuyv),
            b"NV12" => Some(PixelFormat::Nv12),
            _ => None,
        }
    }

    /// Exact payload size of one frame, `None` on overflow or a geometry the
    /// format cannot represent.
    fn frame_len(self, width: u32, height: u32) -> Option<usize> {
        let pixels = (width as usize).checked_mul(height as usize)?;
        match self {
            PixelFormat::Rgb24 => pixels.checked_mul(3),
            PixelFormat::Yuyv if width % 2 == 0 => pixels.checked_mul(2),
            PixelFormat::Yuyv => None,
            PixelFormat::Nv12 if width % 2 == 0 && height % 2 == 0 => {
                pixels.checked_add(pixels / 2)
            }
            PixelFormat::Nv12 => None,
        }
    }
}

pub(crate) fn normalize_to_rgb(
    payload: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    let expected = format
        .frame_len(width, height)
        .ok_or_else(|| anyhow!("{:?} frame of {}x{} is not representable", format, width, height))?;
    if payload.len() != expected {
        return Err(anyhow!(
            "{:?} frame length mismatch: expected {}, got {}",
            format,
            expected,
            payload.len()
        ));
    }

    let w = width as usize;
    Ok(match format {
        PixelFormat::Rgb24 => payload.to_vec(),
        PixelFormat::Yuyv => payload
            .chunks_exact(4)
            .flat_map(|pair| {
                let (u, v) = chroma(pair[1], pair[3]);
                [pair[0], pair[2]].map(|y| yuv_to_rgb(y, u, v))
            })
            .flatten()
            .collect(),
        PixelFormat::Nv12 => {
            let (luma, uv) = payload.split_at(w * height as usize);
            luma.chunks_exact(w.max(1))
                .enumerate()
                .flat_map(move |(row, ys)| {
                    let uv_row = &uv[(row / 2) * w..];
                    ys.iter().enumerate().map(move |(col, &y)| {
                        let at = (col / 2) * 2;
                        let (u, v) = chroma(uv_row[at], uv_row[at + 1]);
                        yuv_to_rgb(y, u, v)
                    })
                })
                .flatten()
                .collect()
        }
    })
}

fn chroma(u: u8, v: u8) -> (f32, f32) {
    (u as f32 - 128.0, v as f32 - 128.0)
}

/// BT.601 full-range.
fn yuv_to_rgb(y: u8, u: f32, v: f32) -> [u8; 3] {
    let y = y as f32;
    [
        to_channel(y + 1.402 * v),
        to_channel(y - 0.344_136 * u - 0.714_136 * v),
        to_channel(y + 1.772 * u),
    ]
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
