//! Gear entity and its per-gear state.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::spec::GearSpec;

/// Stable gear identifier, assigned monotonically and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GearId(pub u32);

impl fmt::Display for GearId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gear #{}", self.0)
    }
}

/// Direction of rotation about the gear axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationDirection {
    /// +1
    #[default]
    CounterClockwise,
    /// -1
    Clockwise,
}

impl RotationDirection {
    /// +1.0 or -1.0
    pub fn sign(self) -> f64 {
        match self {
            RotationDirection::CounterClockwise => 1.0,
            RotationDirection::Clockwise => -1.0,
        }
    }

    /// Direction of a gear meshed with this one
    pub fn reversed(self) -> Self {
        match self {
            RotationDirection::CounterClockwise => RotationDirection::Clockwise,
            RotationDirection::Clockwise => RotationDirection::CounterClockwise,
        }
    }
}

/// Persistent error condition carried by a gear.
///
/// Exactly one state at a time; every failing state names the other gear
/// involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorState {
    #[default]
    None,
    /// Module mismatch with a gear inside meshing range
    Incompatible { with: GearId },
    /// Meshing with `with` would close an odd cycle
    Jamming { with: GearId },
    /// Centres closer than the overlap limit
    Overlapping { with: GearId },
}

impl ErrorState {
    pub fn is_none(&self) -> bool {
        matches!(self, ErrorState::None)
    }

    pub fn is_jamming(&self) -> bool {
        matches!(self, ErrorState::Jamming { .. })
    }

    /// The other gear named by this state, if any
    pub fn other(&self) -> Option<GearId> {
        match *self {
            ErrorState::None => None,
            ErrorState::Incompatible { with }
            | ErrorState::Jamming { with }
            | ErrorState::Overlapping { with } => Some(with),
        }
    }

    pub fn references(&self, id: GearId) -> bool {
        self.other() == Some(id)
    }

    /// Jamming and overlap are re-derived from positions on every rebuild
    pub fn is_position_dependent(&self) -> bool {
        matches!(
            self,
            ErrorState::Jamming { .. } | ErrorState::Overlapping { .. }
        )
    }
}

/// A spur gear placed in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gear {
    pub id: GearId,
    pub spec: GearSpec,
    pub position: Point3<f64>,
    /// Speed magnitude in revolutions per minute
    pub rpm: f64,
    pub direction: RotationDirection,
    /// Meshed neighbours in the order the edges were made
    pub connected_to: Vec<GearId>,
    pub is_driver: bool,
    pub error_state: ErrorState,
    /// Accumulated animation angle in radians
    pub rotation_angle: f64,
}

impl Gear {
    pub fn new(id: GearId, spec: GearSpec, position: Point3<f64>) -> Self {
        Gear {
            id,
            spec,
            position,
            rpm: 0.0,
            direction: RotationDirection::default(),
            connected_to: Vec::new(),
            is_driver: false,
            error_state: ErrorState::None,
            rotation_angle: 0.0,
        }
    }

    pub fn is_connected_to(&self, other: GearId) -> bool {
        self.connected_to.contains(&other)
    }

    /// Add a neighbour; returns false if it was already present
    pub fn connect(&mut self, other: GearId) -> bool {
        if self.is_connected_to(other) {
            return false;
        }
        self.connected_to.push(other);
        true
    }

    /// Remove a neighbour; returns false if it was not present
    pub fn disconnect(&mut self, other: GearId) -> bool {
        let before = self.connected_to.len();
        self.connected_to.retain(|&id| id != other);
        self.connected_to.len() != before
    }

    /// Centre-to-centre distance
    pub fn distance_to(&self, other: &Gear) -> f64 {
        nalgebra::distance(&self.position, &other.position)
    }

    /// Centre distance at which the two pitch circles are tangent
    pub fn ideal_distance_to(&self, other: &Gear) -> f64 {
        (self.spec.pitch_diameter() + other.spec.pitch_diameter()) / 2.0
    }

    /// Signed angular velocity in rad/s
    pub fn angular_velocity(&self) -> f64 {
        self.rpm * 2.0 * PI / 60.0 * self.direction.sign()
    }
}
