//! Phase controllers.
//!
//! Each phase owns its own streak counter and is constructed fresh at
//! phase entry, so no debounce state survives from one cycle to the next.
//!
//! - `DoorPhase`: consecutive "door open" frames within an iteration cap
//! - `CrowdPhase`: consecutive GO frames within a frame budget

mod crowd;
mod door;
mod streak;

pub use crowd::{CrowdOutcome, CrowdPhase, CrowdPolicy, CrowdState};
pub use door::{DoorOutcome, DoorPhase, DoorPolicy, DoorState};
pub use streak::StreakCounter;
