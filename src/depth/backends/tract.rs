#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::depth::engine::{DepthEngine, DepthError};
use crate::depth::DepthMap;
use crate::frame::Frame;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Tract-based monocular depth engine.
///
/// Loads a local ONNX model once and runs it on RGB frames resized to the
/// square model input. No network I/O.
pub struct TractDepthEngine {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
}

impl TractDepthEngine {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)))
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, input_size })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor, DepthError> {
        let image = frame
            .to_rgb_image()
            .ok_or_else(|| DepthError::Inference("frame buffer size mismatch".to_string()))?;
        let side = self.input_size;
        let resized = imageops::resize(&image, side, side, FilterType::Triangle);

        let side = side as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            let value = resized.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0;
            (value - MEAN[c]) / STD[c]
        });
        Ok(input.into_tensor())
    }

    fn extract_depth(&self, outputs: TVec<TValue>) -> Result<DepthMap, DepthError> {
        let output = outputs
            .first()
            .ok_or_else(|| DepthError::BadOutput("model produced no outputs".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| DepthError::BadOutput(format!("output tensor was not f32: {}", e)))?;
        let shape = view.shape();
        if shape.len() < 2 || shape[..shape.len() - 2].iter().any(|d| *d != 1) {
            return Err(DepthError::BadOutput(format!(
                "unexpected output shape {:?}",
                shape
            )));
        }
        let height = shape[shape.len() - 2] as u32;
        let width = shape[shape.len() - 1] as u32;
        DepthMap::new(view.iter().copied().collect(), width, height)
    }
}

impl DepthEngine for TractDepthEngine {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, frame: &Frame) -> Result<DepthMap, DepthError> {
        if frame.is_empty() {
            return Err(DepthError::EmptyFrame);
        }
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| DepthError::Inference(e.to_string()))?;
        self.extract_depth(outputs)
    }

    fn warm_up(&mut self) -> Result<(), DepthError> {
        let side = self.input_size;
        let blank = Frame::solid(side, side, [0, 0, 0]);
        self.infer(&blank).map(|_| ())
    }
}
