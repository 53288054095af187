//! Depth estimation.
//!
//! The depth engine is a black box `Frame -> DepthMap`. Its failures are
//! typed (`DepthError`) so the crowd phase can fail closed per frame.

mod backends;
mod engine;
mod map;

use anyhow::{anyhow, Result};
use log::info;

pub use backends::{OfflineDepthEngine, StubDepthEngine, DEFAULT_STUB_DEPTH};
#[cfg(feature = "backend-tract")]
pub use backends::TractDepthEngine;
pub use engine::{DepthEngine, DepthError};
pub use map::DepthMap;

use crate::config::DepthSettings;

/// Build the configured depth engine.
///
/// Errors here are startup errors; callers decide whether to fall back to
/// `OfflineDepthEngine`.
pub fn build_engine(settings: &DepthSettings) -> Result<Box<dyn DepthEngine>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(StubDepthEngine::new(settings.stub_depth))),
        "offline" => Ok(Box::new(OfflineDepthEngine::new("configured offline"))),
        "tract" => build_tract(settings),
        other => Err(anyhow!("unknown depth backend '{}'", other)),
    }
}

#[cfg(feature = "backend-tract")]
fn build_tract(settings: &DepthSettings) -> Result<Box<dyn DepthEngine>> {
    info!(
        "loading depth model {} (input {}x{})",
        settings.model_path.display(),
        settings.input_size,
        settings.input_size
    );
    let engine = TractDepthEngine::new(&settings.model_path, settings.input_size)?;
    Ok(Box::new(engine))
}

#[cfg(not(feature = "backend-tract"))]
fn build_tract(settings: &DepthSettings) -> Result<Box<dyn DepthEngine>> {
    info!(
        "depth model {} requested but backend-tract is not compiled in",
        settings.model_path.display()
    );
    Err(anyhow!(
        "depth backend 'tract' requires the backend-tract feature"
    ))
}
