//! Gear Specification
//!
//! Parametric description of a spur gear and the dimensions derived from it.
//! Requested values outside the supported ranges are clamped to the nearest
//! bound rather than rejected, so every `GearSpec` handed out by `clamped()`
//! describes a buildable gear.

use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Allowed tooth count range (inclusive)
pub const TEETH_RANGE: (u32, u32) = (8, 100);
/// Allowed module range, linear units per tooth pitch
pub const MODULE_RANGE: (f64, f64) = (0.5, 10.0);
/// Allowed pressure angle range in degrees
pub const PRESSURE_ANGLE_RANGE: (f64, f64) = (14.5, 25.0);
/// Allowed face width range
pub const THICKNESS_RANGE: (f64, f64) = (1.0, 20.0);
/// Allowed bore diameter range, before the root-circle limit is applied
pub const BORE_DIAMETER_RANGE: (f64, f64) = (1.0, 20.0);

/// Addendum as a multiple of module
pub const ADDENDUM_COEFF: f64 = 1.0;
/// Dedendum as a multiple of module
pub const DEDENDUM_COEFF: f64 = 1.25;
/// Largest bore radius as a fraction of the root radius
pub const BORE_ROOT_FRACTION: f64 = 0.5;

/// Parametric spur gear description
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearSpec {
    /// Number of teeth
    pub teeth: u32,
    /// Module (pitch diameter per tooth)
    pub module: f64,
    /// Pressure angle in degrees
    pub pressure_angle_deg: f64,
    /// Face width (extrusion depth)
    pub thickness: f64,
    /// Requested bore diameter; the effective bore is limited by the root circle
    pub bore_diameter: f64,
}

impl Default for GearSpec {
    fn default() -> Self {
        GearSpec {
            teeth: 20,
            module: 2.0,
            pressure_angle_deg: 20.0,
            thickness: 5.0,
            bore_diameter: 5.0,
        }
    }
}

fn clamp_finite(value: f64, range: (f64, f64), fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(range.0, range.1)
    } else {
        fallback
    }
}

impl GearSpec {
    /// Create a spec from raw values, clamping each into its valid range
    pub fn new(
        teeth: u32,
        module: f64,
        pressure_angle_deg: f64,
        thickness: f64,
        bore_diameter: f64,
    ) -> Self {
        GearSpec {
            teeth,
            module,
            pressure_angle_deg,
            thickness,
            bore_diameter,
        }
        .clamped()
    }

    /// Set tooth count (builder pattern)
    pub fn with_teeth(mut self, teeth: u32) -> Self {
        self.teeth = teeth.clamp(TEETH_RANGE.0, TEETH_RANGE.1);
        self
    }

    /// Set module
    pub fn with_module(mut self, module: f64) -> Self {
        self.module = clamp_finite(module, MODULE_RANGE, Self::default().module);
        self
    }

    /// Set pressure angle in degrees
    pub fn with_pressure_angle(mut self, degrees: f64) -> Self {
        self.pressure_angle_deg =
            clamp_finite(degrees, PRESSURE_ANGLE_RANGE, Self::default().pressure_angle_deg);
        self
    }

    /// Set face width
    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = clamp_finite(thickness, THICKNESS_RANGE, Self::default().thickness);
        self
    }

    /// Set requested bore diameter
    pub fn with_bore_diameter(mut self, diameter: f64) -> Self {
        self.bore_diameter =
            clamp_finite(diameter, BORE_DIAMETER_RANGE, Self::default().bore_diameter);
        self
    }

    /// Return the closest achievable spec: every field clamped into range and
    /// non-finite values replaced by the default for that field.
    pub fn clamped(self) -> Self {
        let clamped = GearSpec::default()
            .with_teeth(self.teeth)
            .with_module(self.module)
            .with_pressure_angle(self.pressure_angle_deg)
            .with_thickness(self.thickness)
            .with_bore_diameter(self.bore_diameter);

        if clamped != self {
            debug!("clamped gear spec {:?} -> {:?}", self, clamped);
        }
        clamped
    }

    /// True when no field would change under `clamped()`
    pub fn is_within_limits(&self) -> bool {
        self.clamped() == *self
    }

    /// Two specs can mesh when their modules agree within `tolerance`
    pub fn is_compatible_with(&self, other: &GearSpec, tolerance: f64) -> bool {
        (self.module - other.module).abs() < tolerance
    }

    // === Derived dimensions ===

    pub fn pitch_diameter(&self) -> f64 {
        self.teeth as f64 * self.module
    }

    pub fn pitch_radius(&self) -> f64 {
        self.pitch_diameter() / 2.0
    }

    /// Pressure angle in radians
    pub fn pressure_angle(&self) -> f64 {
        self.pressure_angle_deg.to_radians()
    }

    pub fn base_radius(&self) -> f64 {
        self.pitch_radius() * self.pressure_angle().cos()
    }

    pub fn addendum(&self) -> f64 {
        ADDENDUM_COEFF * self.module
    }

    pub fn dedendum(&self) -> f64 {
        DEDENDUM_COEFF * self.module
    }

    pub fn outer_radius(&self) -> f64 {
        self.pitch_radius() + self.addendum()
    }

    pub fn root_radius(&self) -> f64 {
        self.pitch_radius() - self.dedendum()
    }

    /// Effective bore radius, always strictly inside the root circle
    pub fn bore_radius(&self) -> f64 {
        (self.bore_diameter / 2.0).min(self.root_radius() * BORE_ROOT_FRACTION)
    }

    /// Arc length between adjacent teeth along the pitch circle
    pub fn circular_pitch(&self) -> f64 {
        PI * self.module
    }

    /// Angle between adjacent teeth in radians
    pub fn angular_pitch(&self) -> f64 {
        2.0 * PI / self.teeth as f64
    }

    /// Snapshot of every derived dimension, for presentation layers
    pub fn dimensions(&self) -> GearDimensions {
        GearDimensions {
            pitch_diameter: self.pitch_diameter(),
            pitch_radius: self.pitch_radius(),
            base_radius: self.base_radius(),
            addendum: self.addendum(),
            dedendum: self.dedendum(),
            outer_radius: self.outer_radius(),
            root_radius: self.root_radius(),
            bore_radius: self.bore_radius(),
            circular_pitch: self.circular_pitch(),
        }
    }
}

/// Read-only derived dimensions of a `GearSpec`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GearDimensions {
    pub pitch_diameter: f64,
    pub pitch_radius: f64,
    pub base_radius: f64,
    pub addendum: f64,
    pub dedendum: f64,
    pub outer_radius: f64,
    pub root_radius: f64,
    pub bore_radius: f64,
    pub circular_pitch: f64,
}
