//! Error types shared by the gear-train crates.
//!
//! Geometric problems (overlap, module mismatch, jamming) are not errors in
//! this sense; they live on each gear as an `ErrorState`.

use thiserror::Error;

use crate::gear::GearId;

/// Result type for gear-train operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The id does not name a gear in the registry (stale reference).
    #[error("{0} is not in the registry")]
    GearNotFound(GearId),

    /// Playback was requested but no gear is the driver.
    #[error("no driver gear is designated")]
    NoDriver,

    /// Playback refused because a gear is jamming.
    #[error("{gear} is jamming against {with}")]
    Jammed { gear: GearId, with: GearId },
}
