//! Boarding Gate Kernel
//!
//! Decides whether passengers may board through a door. One cycle runs per
//! trigger from the external controller (HMI):
//!
//! 1. **AwaitingTrigger**: wait for the exact trigger packet from the HMI.
//! 2. **DoorCheck**: debounce per-frame "door open" classifications until a
//!    streak confirms the door is open, or give up silently.
//! 3. **Settle**: short pause so door motion does not pollute depth frames.
//! 4. **CrowdCheck**: score each frame's depth map for clutter and debounce
//!    GO/STOP decisions within a fixed frame budget.
//! 5. **CommandSent**: exactly one GO or STOP packet back to the HMI.
//!
//! STOP is the answer whenever evidence is missing: failed inference, a
//! short stream, or an exhausted budget all end in STOP.
//!
//! # Module Structure
//!
//! - `frame`: camera frames and ROI pixel bounds
//! - `ingest`: frame sources (synthetic, image replay, V4L2)
//! - `door`: door-open classification
//! - `depth`: depth maps and depth engines
//! - `occupancy`: depth-band silhouette clutter score
//! - `phase`: streak-debounced door and crowd phase controllers
//! - `protocol`: HMI packet codec and datagram link
//! - `gate`: the cycle orchestrator
//! - `config`: file and environment configuration
//! - Core types: Decision, Roi

use anyhow::{anyhow, Result};

pub mod config;
pub mod depth;
pub mod door;
pub mod frame;
pub mod gate;
pub mod ingest;
pub mod occupancy;
pub mod phase;
pub mod protocol;

pub use depth::{DepthEngine, DepthError, DepthMap, OfflineDepthEngine, StubDepthEngine};
#[cfg(feature = "backend-tract")]
pub use depth::TractDepthEngine;
pub use door::{BrightnessDoorClassifier, DoorClassifier};
pub use frame::{Frame, PixelRect};
pub use gate::{BoardingGate, CycleOutcome, GateSettings, GateStats};
pub use ingest::{
    open_source, FrameSource, ImageDirSource, SourceStats, SyntheticConfig, SyntheticSource,
};
#[cfg(feature = "ingest-v4l2")]
pub use ingest::{v4l2::V4l2Config, V4l2Source};
pub use occupancy::{DepthLevels, OccupancyScorer};
pub use phase::{
    CrowdOutcome, CrowdPhase, CrowdPolicy, CrowdState, DoorOutcome, DoorPhase, DoorPolicy,
    DoorState, StreakCounter,
};
pub use protocol::{
    ControlPacket, HmiLink, Inbound, ParseError, StatusPayload, UdpHmiLink, UdpLinkConfig,
};

// -------------------- Decision --------------------

/// Crowdedness verdict reported to the HMI.
///
/// `Stop` is the default: any missing evidence resolves to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Decision {
    Go,
    #[default]
    Stop,
}

impl Decision {
    /// Crowdedness byte on the wire.
    pub fn wire_value(self) -> u8 {
        match self {
            Decision::Go => 1,
            Decision::Stop => 2,
        }
    }

    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            1 => Some(Decision::Go),
            2 => Some(Decision::Stop),
            _ => None,
        }
    }

    /// GO when the clutter score does not exceed the threshold.
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score <= threshold {
            Decision::Go
        } else {
            Decision::Stop
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Go => "GO",
            Decision::Stop => "STOP",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// -------------------- Region of Interest --------------------

/// Normalized crop rectangle; each edge is a fraction of the frame size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Roi {
    top: f32,
    bottom: f32,
    left: f32,
    right: f32,
}

impl Roi {
    /// Build a ROI. Every fraction must lie in [0, 1] with top <= bottom and
    /// left <= right.
    pub fn new(top: f32, bottom: f32, left: f32, right: f32) -> Result<Self> {
        for (name, value) in [
            ("top", top),
            ("bottom", bottom),
            ("left", left),
            ("right", right),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("roi {} must be within [0, 1], got {}", name, value));
            }
        }
        if bottom < top {
            return Err(anyhow!("roi bottom ({}) is above top ({})", bottom, top));
        }
        if right < left {
            return Err(anyhow!("roi right ({}) is left of left ({})", right, left));
        }
        Ok(Self {
            top,
            bottom,
            left,
            right,
        })
    }

    /// Upper-center band where the door lintel shows when the door is open.
    pub fn door_default() -> Self {
        Self {
            top: 0.0,
            bottom: 0.2,
            left: 0.35,
            right: 0.65,
        }
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn right(&self) -> f32 {
        self.right
    }
}

impl Default for Roi {
    fn default() -> Self {
        Self::door_default()
    }
}
