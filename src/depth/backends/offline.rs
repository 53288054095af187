use crate::depth::engine::{DepthEngine, DepthError};
use crate::depth::DepthMap;
use crate::frame::Frame;

/// Stand-in used when the configured engine could not be loaded.
///
/// Every inference fails with `Unavailable`, so every crowd frame is STOP.
pub struct OfflineDepthEngine {
    reason: String,
}

impl OfflineDepthEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl DepthEngine for OfflineDepthEngine {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn infer(&mut self, _frame: &Frame) -> Result<DepthMap, DepthError> {
        Err(DepthError::Unavailable(self.reason.clone()))
    }
}
