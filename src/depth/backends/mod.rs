pub mod offline;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use offline::OfflineDepthEngine;
pub use stub::{StubDepthEngine, DEFAULT_STUB_DEPTH};

#[cfg(feature = "backend-tract")]
pub use tract::TractDepthEngine;
