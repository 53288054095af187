use crate::depth::engine::{DepthEngine, DepthError};
use crate::depth::DepthMap;
use crate::frame::Frame;

/// Depth of an empty corridor: beyond every occupancy level.
pub const DEFAULT_STUB_DEPTH: f32 = 3.0;

/// Stub engine for bench runs. Reports the same depth for every pixel.
pub struct StubDepthEngine {
    depth: f32,
    calls: u64,
}

impl StubDepthEngine {
    pub fn new(depth: f32) -> Self {
        Self { depth, calls: 0 }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for StubDepthEngine {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_DEPTH)
    }
}

impl DepthEngine for StubDepthEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, frame: &Frame) -> Result<DepthMap, DepthError> {
        if frame.is_empty() {
            return Err(DepthError::EmptyFrame);
        }
        self.calls += 1;
        Ok(DepthMap::uniform(frame.width(), frame.height(), self.depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_reports_uniform_depth_at_frame_size() {
        let mut engine = StubDepthEngine::new(1.25);
        let map = engine.infer(&Frame::solid(8, 6, [10, 10, 10])).unwrap();
        assert_eq!(map.dimensions(), (8, 6));
        assert!(map.values().iter().all(|v| *v == 1.25));
        assert_eq!(engine.calls(), 1);
    }

    #[test]
    fn stub_rejects_empty_frame() {
        let mut engine = StubDepthEngine::default();
        let empty = Frame::new(Vec::new(), 0, 0).unwrap();
        assert!(matches!(engine.infer(&empty), Err(DepthError::EmptyFrame)));
        assert_eq!(engine.calls(), 0);
    }
}
