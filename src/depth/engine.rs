use thiserror::Error;

use crate::depth::DepthMap;
use crate::frame::Frame;

/// Failure modes of a depth engine.
///
/// Every variant is recoverable: the crowd phase records the frame as STOP
/// and keeps going.
#[derive(Debug, Error)]
pub enum DepthError {
    #[error("frame has no pixels")]
    EmptyFrame,
    #[error("depth engine unavailable: {0}")]
    Unavailable(String),
    #[error("depth inference failed: {0}")]
    Inference(String),
    #[error("depth output malformed: {0}")]
    BadOutput(String),
}

/// Depth engine trait: `Frame -> DepthMap`.
///
/// Engines are constructed once at startup and owned by the gate. Smaller
/// values mean closer to the camera.
pub trait DepthEngine: Send {
    /// Engine identifier.
    fn name(&self) -> &'static str;

    /// Estimate a dense depth map for one frame.
    ///
    /// The frame is borrowed for the duration of the call only.
    fn infer(&mut self, frame: &Frame) -> Result<DepthMap, DepthError>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<(), DepthError> {
        Ok(())
    }
}

impl<E: DepthEngine + ?Sized> DepthEngine for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn infer(&mut self, frame: &Frame) -> Result<DepthMap, DepthError> {
        (**self).infer(frame)
    }

    fn warm_up(&mut self) -> Result<(), DepthError> {
        (**self).warm_up()
    }
}
