//! Gear Profile Generation
//!
//! Turns a `GearSpec` into 2D outlines suitable for extrusion:
//! - an outer boundary (root circle with one lobe per tooth)
//! - a bore hole
//! - a pitch circle for overlays
//!
//! Two generators are provided behind the `ProfileGenerator` trait. The
//! involute generator samples true involute flanks; the trapezoid generator
//! replaces each flank with a straight line for scenes with many gears.
//! Meshing never reads these outlines, so the two are interchangeable.

use gearcore::GearSpec;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Open list of points; the last point implicitly joins the first
pub type Polyline = Vec<Point2<f64>>;

/// Smallest tooth-tip half-width, as a fraction of the angular pitch
const MIN_TIP_HALF_WIDTH: f64 = 0.02;
/// Largest tooth-root half-width, as a fraction of the angular pitch
const MAX_ROOT_HALF_WIDTH: f64 = 0.45;
/// Consecutive points closer than this are merged
const POINT_EPSILON: f64 = 1e-9;

/// Which generator builds the tooth outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileFidelity {
    /// Sampled involute flanks
    #[default]
    Involute,
    /// Straight flanks
    Trapezoid,
}

/// Sampling density of generated outlines
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileResolution {
    /// Segments along each involute flank
    pub flank_samples: usize,
    /// Interior points on each tip arc
    pub tip_samples: usize,
    /// Interior points on each root arc
    pub root_samples: usize,
    /// Segments in bore and pitch circles
    pub circle_segments: usize,
}

impl Default for ProfileResolution {
    fn default() -> Self {
        ProfileResolution {
            flank_samples: 8,
            tip_samples: 3,
            root_samples: 4,
            circle_segments: 48,
        }
    }
}

/// Outline of one gear, centred on the origin
#[derive(Debug, Clone, PartialEq)]
pub struct GearProfile {
    /// Toothed boundary, counter-clockwise
    pub outer: Polyline,
    /// Bore hole, clockwise so it can be used directly as a hole
    pub bore: Polyline,
}

/// Strategy for building a tooth outline
pub trait ProfileGenerator: Send + Sync {
    /// Build the outline for an already-clamped spec
    fn build_profile(&self, spec: &GearSpec) -> GearProfile;

    fn fidelity(&self) -> ProfileFidelity;

    /// Clone this generator into a boxed trait object
    fn box_clone(&self) -> Box<dyn ProfileGenerator>;
}

impl Clone for Box<dyn ProfileGenerator> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Create the generator for a fidelity level
pub fn generator_for(
    fidelity: ProfileFidelity,
    resolution: ProfileResolution,
) -> Box<dyn ProfileGenerator> {
    match fidelity {
        ProfileFidelity::Involute => Box::new(InvoluteProfile::new(resolution)),
        ProfileFidelity::Trapezoid => Box::new(TrapezoidProfile::new(resolution)),
    }
}

/// Circle of radius `pitch_radius`, for overlay and debug display
pub fn pitch_circle(spec: &GearSpec, segments: usize) -> Polyline {
    circle(spec.pitch_radius(), segments)
}

fn polar(radius: f64, angle: f64) -> Point2<f64> {
    Point2::new(radius * angle.cos(), radius * angle.sin())
}

fn circle(radius: f64, segments: usize) -> Polyline {
    let segments = segments.max(3);
    (0..segments)
        .map(|k| polar(radius, 2.0 * PI * k as f64 / segments as f64))
        .collect()
}

fn push_point(polyline: &mut Polyline, point: Point2<f64>) {
    let duplicate = polyline
        .last()
        .map(|last| nalgebra::distance(last, &point) < POINT_EPSILON)
        .unwrap_or(false);
    if !duplicate {
        polyline.push(point);
    }
}

/// Points strictly between `from` and `to` on a circular arc
fn push_arc_interior(polyline: &mut Polyline, radius: f64, from: f64, to: f64, samples: usize) {
    for k in 1..=samples {
        let angle = from + (to - from) * k as f64 / (samples + 1) as f64;
        push_point(polyline, polar(radius, angle));
    }
}

fn bore(spec: &GearSpec, resolution: &ProfileResolution) -> Polyline {
    let mut hole = circle(spec.bore_radius(), resolution.circle_segments);
    hole.reverse();
    hole
}

/// The involute function, inv(t) = t - atan(t)
fn involute(t: f64) -> f64 {
    t - t.atan()
}

/// Involute roll parameter at which the curve reaches `radius`
fn involute_param(base_radius: f64, radius: f64) -> f64 {
    ((radius / base_radius).powi(2) - 1.0).max(0.0).sqrt()
}

/// Polar form (radius, angle) of the involute
/// x = rb (cos t + t sin t), y = rb (sin t - t cos t)
fn involute_polar(base_radius: f64, t: f64) -> (f64, f64) {
    (base_radius * (1.0 + t * t).sqrt(), involute(t))
}

/// Half the angular tooth thickness at the pitch circle.
/// Angular tooth thickness is circular_pitch / (2 * pitch_radius).
fn half_tooth_angle(spec: &GearSpec) -> f64 {
    spec.circular_pitch() / (2.0 * spec.pitch_radius()) / 2.0
}

/// Involute flanks joined by tip and root arcs
#[derive(Debug, Clone, Copy, Default)]
pub struct InvoluteProfile {
    pub resolution: ProfileResolution,
}

impl InvoluteProfile {
    pub fn new(resolution: ProfileResolution) -> Self {
        Self { resolution }
    }
}

impl ProfileGenerator for InvoluteProfile {
    fn build_profile(&self, spec: &GearSpec) -> GearProfile {
        let res = &self.resolution;
        let pitch_angle = spec.angular_pitch();
        let base_radius = spec.base_radius();
        let root_radius = spec.root_radius();
        let outer_radius = spec.outer_radius();

        // Flank offset so that each flank crosses the pitch circle at +/- half_tooth
        let flank_offset = half_tooth_angle(spec) + involute(spec.pressure_angle().tan());
        let min_half = MIN_TIP_HALF_WIDTH * pitch_angle;
        let max_half = MAX_ROOT_HALF_WIDTH * pitch_angle;
        let half_width = |t: f64| (flank_offset - involute(t)).clamp(min_half, max_half);

        let t_start = involute_param(base_radius, root_radius.max(base_radius));
        let t_max = involute_param(base_radius, outer_radius);
        let steps = res.flank_samples.max(1);
        let flank: Vec<(f64, f64)> = (0..=steps)
            .map(|k| {
                let t = t_start + (t_max - t_start) * k as f64 / steps as f64;
                let (radius, _) = involute_polar(base_radius, t);
                (radius, half_width(t))
            })
            .collect();

        let root_half = half_width(t_start);
        let tip_half = half_width(t_max);
        let radial_root = root_radius < base_radius;

        let mut outer = Polyline::with_capacity(spec.teeth as usize * (2 * steps + 8));
        for i in 0..spec.teeth {
            let centre = i as f64 * pitch_angle;

            if radial_root {
                push_point(&mut outer, polar(root_radius, centre - root_half));
            }
            for &(radius, half) in &flank {
                push_point(&mut outer, polar(radius, centre - half));
            }
            push_arc_interior(
                &mut outer,
                outer_radius,
                centre - tip_half,
                centre + tip_half,
                res.tip_samples,
            );
            for &(radius, half) in flank.iter().rev() {
                push_point(&mut outer, polar(radius, centre + half));
            }
            if radial_root {
                push_point(&mut outer, polar(root_radius, centre + root_half));
            }
            push_arc_interior(
                &mut outer,
                root_radius,
                centre + root_half,
                centre + pitch_angle - root_half,
                res.root_samples,
            );
        }

        GearProfile {
            outer,
            bore: bore(spec, res),
        }
    }

    fn fidelity(&self) -> ProfileFidelity {
        ProfileFidelity::Involute
    }

    fn box_clone(&self) -> Box<dyn ProfileGenerator> {
        Box::new(*self)
    }
}

/// Straight-flanked teeth: four corners per tooth plus arcs
#[derive(Debug, Clone, Copy, Default)]
pub struct TrapezoidProfile {
    pub resolution: ProfileResolution,
}

impl TrapezoidProfile {
    pub fn new(resolution: ProfileResolution) -> Self {
        Self { resolution }
    }
}

impl ProfileGenerator for TrapezoidProfile {
    fn build_profile(&self, spec: &GearSpec) -> GearProfile {
        let res = &self.resolution;
        let pitch_angle = spec.angular_pitch();
        let pitch_radius = spec.pitch_radius();
        let root_radius = spec.root_radius();
        let outer_radius = spec.outer_radius();

        // Flanks lean by the pressure angle either side of the pitch circle
        let half_tooth = half_tooth_angle(spec);
        let lean = spec.pressure_angle().tan() / pitch_radius;
        let root_half = (half_tooth + spec.dedendum() * lean).min(MAX_ROOT_HALF_WIDTH * pitch_angle);
        let tip_half = (half_tooth - spec.addendum() * lean).max(MIN_TIP_HALF_WIDTH * pitch_angle);

        let mut outer = Polyline::with_capacity(spec.teeth as usize * (4 + res.root_samples));
        for i in 0..spec.teeth {
            let centre = i as f64 * pitch_angle;
            push_point(&mut outer, polar(root_radius, centre - root_half));
            push_point(&mut outer, polar(outer_radius, centre - tip_half));
            push_point(&mut outer, polar(outer_radius, centre + tip_half));
            push_point(&mut outer, polar(root_radius, centre + root_half));
            push_arc_interior(
                &mut outer,
                root_radius,
                centre + root_half,
                centre + pitch_angle - root_half,
                res.root_samples,
            );
        }

        GearProfile {
            outer,
            bore: bore(spec, res),
        }
    }

    fn fidelity(&self) -> ProfileFidelity {
        ProfileFidelity::Trapezoid
    }

    fn box_clone(&self) -> Box<dyn ProfileGenerator> {
        Box::new(*self)
    }
}
