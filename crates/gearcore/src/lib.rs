//! Shared types for the gear-train engine
//!
//! - `GearSpec` and its derived dimensions
//! - `Gear`, `GearId` and the per-gear `ErrorState`
//! - `EngineConfig` meshing thresholds
//! - Error type and observer traits

pub mod config;
pub mod error;
pub mod gear;
pub mod spec;
pub mod traits;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use gear::{ErrorState, Gear, GearId, RotationDirection};
pub use spec::{GearDimensions, GearSpec};
pub use traits::{FrameContext, GearEvent, GearObserver};
