//! Gear-train kinematics
//!
//! Provides:
//! - `GearMesh`: speed coupling across one meshed pair
//! - `propagate`: breadth-first speed/direction propagation from the driver
//! - `advance_rotation`: per-frame integration of each gear's visible angle

use gearcore::{FrameContext, GearId, GearSpec, Result, RotationDirection};
use log::debug;
use std::collections::{BTreeSet, VecDeque};
use std::f64::consts::TAU;

use crate::registry::GearRegistry;

/// Speed coupling between two meshed spur gears
///
/// Convention: gear A drives gear B
/// - ratio = velocity_A / velocity_B = teeth_B / teeth_A
/// - the pair always turns in opposite directions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GearMesh {
    pub teeth_a: u32,
    pub teeth_b: u32,
}

impl GearMesh {
    pub fn new(a: &GearSpec, b: &GearSpec) -> Self {
        Self {
            teeth_a: a.teeth,
            teeth_b: b.teeth,
        }
    }

    /// velocity_A / velocity_B. E.g. 2.0 means A spins twice as fast as B
    pub fn ratio(&self) -> f64 {
        self.teeth_b as f64 / self.teeth_a as f64
    }

    /// Convert speed from A to B
    pub fn velocity_a_to_b(&self, velocity_a: f64) -> f64 {
        velocity_a / self.ratio()
    }

    /// Convert speed from B to A
    pub fn velocity_b_to_a(&self, velocity_b: f64) -> f64 {
        velocity_b * self.ratio()
    }
}

/// Drive the train from `driver` at `input_rpm`.
///
/// Every gear's rpm is zeroed first, so gears not reachable from the driver
/// end up stationary; their direction is left as it was. Returns the gears in
/// visiting order, driver first.
pub fn propagate(registry: &mut GearRegistry, driver: GearId, input_rpm: f64) -> Result<Vec<GearId>> {
    registry.get(driver)?;

    for gear in registry.iter_mut() {
        gear.rpm = 0.0;
    }
    let root = registry.get_mut(driver)?;
    root.rpm = input_rpm.max(0.0);
    root.direction = RotationDirection::CounterClockwise;

    let mut visited = BTreeSet::from([driver]);
    let mut order = vec![driver];
    let mut queue = VecDeque::from([driver]);

    while let Some(current) = queue.pop_front() {
        let gear = registry.get(current)?;
        let (rpm, direction, spec) = (gear.rpm, gear.direction, gear.spec);
        let neighbors = gear.connected_to.clone();

        for next in neighbors {
            if !visited.insert(next) {
                continue;
            }
            let follower = registry.get_mut(next)?;
            follower.rpm = GearMesh::new(&spec, &follower.spec).velocity_a_to_b(rpm);
            follower.direction = direction.reversed();
            queue.push_back(next);
            order.push(next);
        }
    }

    debug!("propagated {:.2} rpm from {} to {} gears", input_rpm, driver, order.len());
    Ok(order)
}

/// Advance each gear's rotation angle by `rpm * 2pi/60 * direction * dt`.
///
/// `ctx.dt` is the wall-clock time since the previous frame; non-positive or
/// non-finite deltas are ignored.
pub fn advance_rotation(registry: &mut GearRegistry, ctx: FrameContext) {
    if !(ctx.dt.is_finite() && ctx.dt > 0.0) {
        return;
    }
    for gear in registry.iter_mut() {
        gear.rotation_angle = (gear.rotation_angle + gear.angular_velocity() * ctx.dt).rem_euclid(TAU);
    }
}

/// Set every rotation angle back to zero
pub fn reset_rotation(registry: &mut GearRegistry) {
    for gear in registry.iter_mut() {
        gear.rotation_angle = 0.0;
    }
}
