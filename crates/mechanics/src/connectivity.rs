//! Mesh Compatibility & Connectivity
//!
//! Decides how pairs of gears relate and rebuilds the mesh graph:
//! - overlap: centres closer than `overlap_ratio * ideal`
//! - incompatible: in meshing range but with different modules
//! - jamming: meshing would close an odd cycle (each mesh flips direction,
//!   so an odd cycle asks some gear to turn both ways at once)
//! - connect: otherwise, within range
//!
//! `rebuild` clears every edge and re-derives the whole graph from positions.
//! While a gear is being dragged, `snap` only touches that gear's edges: the
//! ones it has moved out of range of are dropped before a new mesh is tried.

use gearcore::{EngineConfig, ErrorState, Gear, GearId, Result};
use log::debug;
use std::collections::{BTreeMap, VecDeque};

use crate::registry::GearRegistry;

/// How two gears relate at their current positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRelation {
    Overlapping,
    Incompatible,
    /// Compatible and within range; may still jam
    InRange,
    OutOfRange,
}

/// Actual and ideal centre distance of a pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairGeometry {
    pub distance: f64,
    pub ideal: f64,
}

impl PairGeometry {
    pub fn of(a: &Gear, b: &Gear) -> Self {
        PairGeometry {
            distance: a.distance_to(b),
            ideal: ideal_distance(a, b),
        }
    }

    /// |distance - ideal|
    pub fn deviation(&self) -> f64 {
        (self.distance - self.ideal).abs()
    }

    pub fn is_overlapping(&self, config: &EngineConfig) -> bool {
        self.distance < config.overlap_ratio * self.ideal
    }
}

/// Centre distance at which two gears mesh: (D1 + D2) / 2
pub fn ideal_distance(a: &Gear, b: &Gear) -> f64 {
    a.ideal_distance_to(b)
}

/// Classify a pair against a range threshold, first match wins
pub fn classify_pair(a: &Gear, b: &Gear, threshold: f64, config: &EngineConfig) -> PairRelation {
    let geometry = PairGeometry::of(a, b);

    if geometry.is_overlapping(config) {
        PairRelation::Overlapping
    } else if geometry.deviation() >= threshold {
        PairRelation::OutOfRange
    } else if !a.spec.is_compatible_with(&b.spec, config.module_tolerance) {
        PairRelation::Incompatible
    } else {
        PairRelation::InRange
    }
}

/// Number of edges on the shortest path between two gears, if connected
pub fn path_length(registry: &GearRegistry, from: GearId, to: GearId) -> Option<usize> {
    if from == to {
        return Some(0);
    }

    let mut depth: BTreeMap<GearId, usize> = BTreeMap::new();
    let mut queue = VecDeque::new();
    depth.insert(from, 0);
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        let next_depth = depth[&current] + 1;
        let Ok(neighbors) = registry.neighbors(current) else {
            continue;
        };
        for &next in neighbors {
            if depth.contains_key(&next) {
                continue;
            }
            if next == to {
                return Some(next_depth);
            }
            depth.insert(next, next_depth);
            queue.push_back(next);
        }
    }
    None
}

/// True if an edge a-b would close an odd-length cycle
pub fn would_cause_jamming(registry: &GearRegistry, a: GearId, b: GearId) -> bool {
    path_length(registry, a, b)
        .map(|edges| (edges + 1) % 2 == 1)
        .unwrap_or(false)
}

/// The gear that displays a pair's error, followed by the other gear
fn flag_carrier(a: GearId, b: GearId, selected: Option<GearId>) -> (GearId, GearId) {
    if selected == Some(b) { (b, a) } else { (a, b) }
}

/// What a full rebuild found; pairs are (flag carrier, other gear)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildReport {
    /// Edges made, closest pair first
    pub connected: Vec<(GearId, GearId)>,
    pub incompatible: Vec<(GearId, GearId)>,
    /// The single surfaced overlap
    pub overlap: Option<(GearId, GearId)>,
    /// The single surfaced jam, only when there is no overlap
    pub jamming: Option<(GearId, GearId)>,
}

/// Outcome of snapping a dragged gear
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapOutcome {
    /// The gear was moved to the ideal distance and meshed
    Snapped { with: GearId },
    /// A candidate was found but could not mesh; the gear did not move
    Refused { with: GearId, state: ErrorState },
    NoCandidate,
}

impl SnapOutcome {
    pub fn snapped(&self) -> bool {
        matches!(self, SnapOutcome::Snapped { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    a: GearId,
    b: GearId,
    distance: f64,
    relation: PairRelation,
}

/// Builds and maintains the mesh graph over a registry
#[derive(Debug, Clone, Default)]
pub struct ConnectivityEngine {
    pub config: EngineConfig,
}

impl ConnectivityEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Whether a held incompatible flag against `other` still applies
    fn still_incompatible(&self, gear: &Gear, other: Option<&Gear>) -> bool {
        let Some(other) = other else {
            return false;
        };
        if gear.spec.is_compatible_with(&other.spec, self.config.module_tolerance) {
            return false;
        }
        PairGeometry::of(gear, other).deviation() <= self.config.incompatible_hysteresis
    }

    /// Drop position-dependent errors and stale incompatible flags
    fn refresh_error_states(&self, registry: &mut GearRegistry) {
        let cleared: Vec<GearId> = registry
            .iter()
            .filter(|gear| match gear.error_state {
                ErrorState::Incompatible { with } => {
                    !self.still_incompatible(gear, registry.get(with).ok())
                }
                state => state.is_position_dependent(),
            })
            .map(|gear| gear.id)
            .collect();

        for id in cleared {
            if let Ok(gear) = registry.get_mut(id) {
                gear.error_state = ErrorState::None;
            }
        }
    }

    /// Pairs that overlap or sit within `mesh_threshold`, closest first
    fn collect_candidates(&self, registry: &GearRegistry) -> Vec<Candidate> {
        let gears: Vec<&Gear> = registry.iter().collect();
        let mut candidates = Vec::new();

        for (i, a) in gears.iter().enumerate() {
            for b in &gears[i + 1..] {
                let relation = classify_pair(a, b, self.config.mesh_threshold, &self.config);
                if relation != PairRelation::OutOfRange {
                    candidates.push(Candidate {
                        a: a.id,
                        b: b.id,
                        distance: a.distance_to(b),
                        relation,
                    });
                }
            }
        }

        // Stable sort keeps enumeration order between equal distances
        candidates.sort_by(|x, y| x.distance.total_cmp(&y.distance));
        candidates
    }

    /// Rebuild the whole mesh graph from current positions.
    ///
    /// `selected` is the gear the user is interacting with; it carries the
    /// error flag when it is part of a failing pair.
    pub fn rebuild(&self, registry: &mut GearRegistry, selected: Option<GearId>) -> RebuildReport {
        registry.clear_connections();
        self.refresh_error_states(registry);

        let mut report = RebuildReport::default();
        for candidate in self.collect_candidates(registry) {
            let (a, b) = (candidate.a, candidate.b);
            match candidate.relation {
                PairRelation::Overlapping => {
                    debug!("{} overlaps {} (d={:.3})", a, b, candidate.distance);
                    if report.overlap.is_none() {
                        report.overlap = Some(flag_carrier(a, b, selected));
                    }
                }
                PairRelation::Incompatible => {
                    debug!("{} and {} differ in module", a, b);
                    let (carrier, other) = flag_carrier(a, b, selected);
                    if let Ok(gear) = registry.get_mut(carrier) {
                        if gear.error_state.is_none() {
                            gear.error_state = ErrorState::Incompatible { with: other };
                        }
                    }
                    report.incompatible.push((carrier, other));
                }
                PairRelation::InRange => {
                    if would_cause_jamming(registry, a, b) {
                        debug!("{} and {} would close an odd cycle", a, b);
                        if report.jamming.is_none() {
                            report.jamming = Some(flag_carrier(a, b, selected));
                        }
                    } else if registry.connect(a, b).is_ok() {
                        report.connected.push((a, b));
                    }
                }
                PairRelation::OutOfRange => {}
            }
        }

        if let Some((carrier, other)) = report.overlap {
            report.jamming = None;
            if let Ok(gear) = registry.get_mut(carrier) {
                gear.error_state = ErrorState::Overlapping { with: other };
            }
        } else if let Some((carrier, other)) = report.jamming {
            if let Ok(gear) = registry.get_mut(carrier) {
                gear.error_state = ErrorState::Jamming { with: other };
            }
        }

        debug!(
            "rebuild: {} edges, {} incompatible, overlap={:?}, jamming={:?}",
            report.connected.len(),
            report.incompatible.len(),
            report.overlap,
            report.jamming
        );
        report
    }

    /// Drop the edges of `moving` whose pair is no longer in mesh range.
    ///
    /// Returns the gears it was disconnected from.
    pub fn drop_stale_edges(&self, registry: &mut GearRegistry, moving: GearId) -> Result<Vec<GearId>> {
        let mover = registry.get(moving)?;
        let stale: Vec<GearId> = mover
            .connected_to
            .iter()
            .copied()
            .filter(|&other| {
                registry.get(other).map_or(true, |other| {
                    classify_pair(mover, other, self.config.mesh_threshold, &self.config)
                        != PairRelation::InRange
                })
            })
            .collect();

        for &other in &stale {
            debug!("{} moved out of mesh with {}", moving, other);
            if registry.contains(other) {
                registry.disconnect(moving, other)?;
            } else {
                registry.get_mut(moving)?.disconnect(other);
            }
        }
        Ok(stale)
    }

    /// Pull a dragged gear into mesh with the first gear near its ideal
    /// distance.
    ///
    /// Pairs already within `snap_floor` of ideal are skipped so a settled
    /// pair is not re-snapped every frame. On refusal the moving gear keeps its
    /// position and carries the error flag.
    pub fn snap(&self, registry: &mut GearRegistry, moving: GearId) -> Result<SnapOutcome> {
        self.drop_stale_edges(registry, moving)?;
        let mover = registry.get(moving)?;

        let candidate = registry.iter().filter(|g| g.id != moving).find_map(|other| {
            let geometry = PairGeometry::of(mover, other);
            let deviation = geometry.deviation();
            let in_window =
                deviation < self.config.snap_threshold && deviation > self.config.snap_floor;
            (in_window && !geometry.is_overlapping(&self.config)).then(|| {
                let compatible = mover
                    .spec
                    .is_compatible_with(&other.spec, self.config.module_tolerance);
                (other.id, other.position, compatible, geometry)
            })
        });

        let Some((other, anchor, compatible, geometry)) = candidate else {
            return Ok(SnapOutcome::NoCandidate);
        };

        let refusal = if !compatible {
            Some(ErrorState::Incompatible { with: other })
        } else if would_cause_jamming(registry, moving, other) {
            Some(ErrorState::Jamming { with: other })
        } else {
            None
        };

        let gear = registry.get_mut(moving)?;
        if let Some(state) = refusal {
            debug!("{} cannot snap to {}: {:?}", moving, other, state);
            gear.error_state = state;
            return Ok(SnapOutcome::Refused { with: other, state });
        }

        let offset = gear.position - anchor;
        gear.position = anchor + offset * (geometry.ideal / geometry.distance);
        if gear.error_state.references(other) {
            gear.error_state = ErrorState::None;
        }
        registry.connect(moving, other)?;

        debug!("{} snapped to {} at d={:.3}", moving, other, geometry.ideal);
        Ok(SnapOutcome::Snapped { with: other })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gearcore::GearSpec;
    use nalgebra::Point3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn spec(teeth: u32, module: f64) -> GearSpec {
        GearSpec::default().with_teeth(teeth).with_module(module)
    }

    fn place(registry: &mut GearRegistry, teeth: u32, module: f64, x: f64, y: f64) -> GearId {
        registry.insert(spec(teeth, module), Point3::new(x, y, 0.0))
    }

    fn engine() -> ConnectivityEngine {
        ConnectivityEngine::default()
    }

    fn error_of(registry: &GearRegistry, id: GearId) -> ErrorState {
        registry.get(id).unwrap().error_state
    }

    #[test]
    fn test_equal_modules_at_ideal_distance_connect() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let module = rng.gen_range(0.5..10.0);
            let mut registry = GearRegistry::new();
            let a = place(&mut registry, rng.gen_range(8..=100), module, 0.0, 0.0);
            let teeth_b = rng.gen_range(8..=100);
            let ideal = (registry.get(a).unwrap().spec.pitch_diameter()
                + spec(teeth_b, module).pitch_diameter())
                / 2.0;
            let angle: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
            let b = place(&mut registry, teeth_b, module, ideal * angle.cos(), ideal * angle.sin());

            let (ga, gb) = (registry.get(a).unwrap(), registry.get(b).unwrap());
            assert_eq!(
                classify_pair(ga, gb, engine().config.mesh_threshold, &engine().config),
                PairRelation::InRange
            );
            assert!(!would_cause_jamming(&registry, a, b));

            let report = engine().rebuild(&mut registry, None);
            assert_eq!(report.connected, vec![(a, b)]);
            assert!(registry.get(a).unwrap().is_connected_to(b));
            assert!(registry.get(b).unwrap().is_connected_to(a));
        }
    }

    #[test]
    fn test_overlap_detected_regardless_of_module() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let mut registry = GearRegistry::new();
            let a = place(&mut registry, rng.gen_range(8..=100), rng.gen_range(0.5..10.0), 0.0, 0.0);
            let b = place(&mut registry, rng.gen_range(8..=100), rng.gen_range(0.5..10.0), 0.0, 0.0);
            let ideal = ideal_distance(registry.get(a).unwrap(), registry.get(b).unwrap());
            let distance = rng.gen_range(0.0..0.9 * ideal);
            registry.get_mut(b).unwrap().position = Point3::new(distance, 0.0, 0.0);

            let (ga, gb) = (registry.get(a).unwrap(), registry.get(b).unwrap());
            assert_eq!(classify_pair(ga, gb, 3.0, &engine().config), PairRelation::Overlapping);

            let report = engine().rebuild(&mut registry, None);
            assert_eq!(report.overlap, Some((a, b)));
            assert!(report.connected.is_empty());
            assert_eq!(error_of(&registry, a), ErrorState::Overlapping { with: b });
        }
    }

    #[test]
    fn test_different_modules_flag_incompatible() {
        let mut registry = GearRegistry::new();
        let a = place(&mut registry, 20, 2.0, 0.0, 0.0);
        // pitch diameters 40 and 60, ideal 50
        let b = place(&mut registry, 20, 3.0, 50.0, 0.0);

        let report = engine().rebuild(&mut registry, None);
        assert!(report.connected.is_empty());
        assert_eq!(report.incompatible, vec![(a, b)]);
        assert_eq!(error_of(&registry, a), ErrorState::Incompatible { with: b });
        assert!(registry.edges().is_empty());
    }

    #[test]
    fn test_selected_gear_carries_the_flag() {
        let mut registry = GearRegistry::new();
        let a = place(&mut registry, 20, 2.0, 0.0, 0.0);
        let b = place(&mut registry, 20, 3.0, 50.0, 0.0);

        engine().rebuild(&mut registry, Some(b));
        assert_eq!(error_of(&registry, b), ErrorState::Incompatible { with: a });
        assert_eq!(error_of(&registry, a), ErrorState::None);
    }

    #[test]
    fn test_incompatible_flag_has_hysteresis() {
        let mut registry = GearRegistry::new();
        let a = place(&mut registry, 20, 2.0, 0.0, 0.0);
        let b = place(&mut registry, 20, 3.0, 50.0, 0.0);
        engine().rebuild(&mut registry, None);
        assert!(!error_of(&registry, a).is_none());

        // Out of mesh range but inside the hysteresis margin: flag stays
        registry.get_mut(b).unwrap().position = Point3::new(57.0, 0.0, 0.0);
        engine().rebuild(&mut registry, None);
        assert_eq!(error_of(&registry, a), ErrorState::Incompatible { with: b });

        registry.get_mut(b).unwrap().position = Point3::new(61.0, 0.0, 0.0);
        engine().rebuild(&mut registry, None);
        assert_eq!(error_of(&registry, a), ErrorState::None);
    }

    #[test]
    fn test_incompatible_flag_clears_when_modules_match() {
        let mut registry = GearRegistry::new();
        let a = place(&mut registry, 20, 2.0, 0.0, 0.0);
        let b = place(&mut registry, 20, 3.0, 50.0, 0.0);
        engine().rebuild(&mut registry, None);

        registry.get_mut(b).unwrap().spec = spec(30, 2.0);
        let report = engine().rebuild(&mut registry, None);
        assert_eq!(error_of(&registry, a), ErrorState::None);
        assert_eq!(report.connected, vec![(a, b)]);
    }

    #[test]
    fn test_triangle_jams() {
        let mut registry = GearRegistry::new();
        let a = place(&mut registry, 20, 2.0, 0.0, 0.0);
        let b = place(&mut registry, 20, 2.0, 40.0, 0.0);
        let c = place(&mut registry, 20, 2.0, 80.0, 0.0);
        registry.connect(a, b).unwrap();
        registry.connect(b, c).unwrap();

        assert_eq!(path_length(&registry, a, c), Some(2));
        assert!(would_cause_jamming(&registry, a, c));

        // Fourth gear closing a square is fine
        let d = place(&mut registry, 20, 2.0, 40.0, 40.0);
        registry.connect(c, d).unwrap();
        assert_eq!(path_length(&registry, d, a), Some(3));
        assert!(!would_cause_jamming(&registry, d, a));
    }

    #[test]
    fn test_rebuild_rejects_odd_cycle() {
        let mut registry = GearRegistry::new();
        let height = 40.0 * 3f64.sqrt() / 2.0;
        let ids = [
            place(&mut registry, 20, 2.0, 0.0, 0.0),
            place(&mut registry, 20, 2.0, 40.0, 0.0),
            place(&mut registry, 20, 2.0, 20.0, height),
        ];

        let report = engine().rebuild(&mut registry, None);
        assert_eq!(report.connected.len(), 2);
        assert!(report.jamming.is_some());
        let jammed: Vec<_> = ids
            .iter()
            .filter(|&&id| error_of(&registry, id).is_jamming())
            .collect();
        assert_eq!(jammed.len(), 1);
    }

    #[test]
    fn test_rebuild_accepts_even_cycle() {
        let mut registry = GearRegistry::new();
        let ids = [
            place(&mut registry, 20, 2.0, 0.0, 0.0),
            place(&mut registry, 20, 2.0, 40.0, 0.0),
            place(&mut registry, 20, 2.0, 40.0, 40.0),
            place(&mut registry, 20, 2.0, 0.0, 40.0),
        ];

        let report = engine().rebuild(&mut registry, None);
        assert_eq!(report.connected.len(), 4);
        assert_eq!(report.jamming, None);
        for id in ids {
            assert_eq!(registry.neighbors(id).unwrap().len(), 2);
            assert_eq!(error_of(&registry, id), ErrorState::None);
        }
    }

    #[test]
    fn test_overlap_takes_priority_over_jamming() {
        let mut registry = GearRegistry::new();
        let height = 40.0 * 3f64.sqrt() / 2.0;
        place(&mut registry, 20, 2.0, 0.0, 0.0);
        place(&mut registry, 20, 2.0, 40.0, 0.0);
        place(&mut registry, 20, 2.0, 20.0, height);
        let d = place(&mut registry, 20, 2.0, 200.0, 0.0);
        let e = place(&mut registry, 20, 2.0, 210.0, 0.0);

        let report = engine().rebuild(&mut registry, None);
        assert_eq!(report.overlap, Some((d, e)));
        assert_eq!(report.jamming, None);

        let flagged: Vec<_> = registry.iter().filter(|g| !g.error_state.is_none()).collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].error_state, ErrorState::Overlapping { with: e });
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut registry = GearRegistry::new();
        let height = 40.0 * 3f64.sqrt() / 2.0;
        place(&mut registry, 20, 2.0, 0.0, 0.0);
        place(&mut registry, 20, 2.0, 40.0, 0.0);
        place(&mut registry, 20, 2.0, 20.0, height);
        place(&mut registry, 30, 3.0, 120.0, 0.0);
        place(&mut registry, 20, 2.0, 170.0, 0.0);
        place(&mut registry, 10, 2.0, 300.0, 0.0);
        place(&mut registry, 15, 2.0, 325.0, 0.0);

        let first_report = engine().rebuild(&mut registry, None);
        let first: Vec<Gear> = registry.iter().cloned().collect();
        let second_report = engine().rebuild(&mut registry, None);
        let second: Vec<Gear> = registry.iter().cloned().collect();

        assert_eq!(first, second);
        assert_eq!(first_report, second_report);
    }

    #[test]
    fn test_deleted_middle_gear_does_not_reconnect_ends() {
        let mut registry = GearRegistry::new();
        let a = place(&mut registry, 20, 2.0, 0.0, 0.0);
        let b = place(&mut registry, 20, 2.0, 40.0, 0.0);
        let c = place(&mut registry, 20, 2.0, 80.0, 0.0);
        engine().rebuild(&mut registry, None);
        assert_eq!(registry.edges().len(), 2);

        registry.remove(b).unwrap();
        assert!(registry.neighbors(a).unwrap().is_empty());
        assert!(registry.neighbors(c).unwrap().is_empty());

        engine().rebuild(&mut registry, None);
        assert!(registry.edges().is_empty());
    }

    #[test]
    fn test_closest_pair_connects_first() {
        // c is within range of both a and b but closer to b; a-b also mesh
        let mut registry = GearRegistry::new();
        let a = place(&mut registry, 20, 2.0, 0.0, 0.0);
        let b = place(&mut registry, 20, 2.0, 41.0, 0.0);
        let c = place(&mut registry, 20, 2.0, 20.25, 34.6);

        let report = engine().rebuild(&mut registry, None);
        let d_ab = registry.get(a).unwrap().distance_to(registry.get(b).unwrap());
        let d_bc = registry.get(b).unwrap().distance_to(registry.get(c).unwrap());
        let d_ac = registry.get(a).unwrap().distance_to(registry.get(c).unwrap());
        assert!(d_ac < d_bc && d_bc < d_ab);
        assert_eq!(report.connected, vec![(a, c), (b, c)]);
        assert_eq!(report.jamming, Some((a, b)));
    }

    #[test]
    fn test_snap_pulls_gear_to_ideal_distance() {
        let mut registry = GearRegistry::new();
        let a = place(&mut registry, 20, 2.0, 0.0, 0.0);
        let b = place(&mut registry, 30, 2.0, 0.0, 53.0);

        let outcome = engine().snap(&mut registry, b).unwrap();
        assert_eq!(outcome, SnapOutcome::Snapped { with: a });
        assert!(outcome.snapped());
        let moved = registry.get(b).unwrap();
        assert_relative_eq!(moved.position.y, 50.0, epsilon = 1e-9);
        assert_relative_eq!(moved.position.x, 0.0, epsilon = 1e-9);
        assert!(moved.is_connected_to(a));

        // Already settled: nothing to do
        assert_eq!(engine().snap(&mut registry, b).unwrap(), SnapOutcome::NoCandidate);
    }

    #[test]
    fn test_snap_refuses_incompatible_without_moving() {
        let mut registry = GearRegistry::new();
        let a = place(&mut registry, 20, 2.0, 0.0, 0.0);
        let b = place(&mut registry, 20, 3.0, 52.0, 0.0);

        let outcome = engine().snap(&mut registry, b).unwrap();
        assert_eq!(
            outcome,
            SnapOutcome::Refused { with: a, state: ErrorState::Incompatible { with: a } }
        );
        assert!(!outcome.snapped());
        assert_relative_eq!(registry.get(b).unwrap().position.x, 52.0);
        assert_eq!(error_of(&registry, b), ErrorState::Incompatible { with: a });
    }

    #[test]
    fn test_snap_refuses_odd_cycle() {
        let mut registry = GearRegistry::new();
        let height = 40.0 * 3f64.sqrt() / 2.0;
        let a = place(&mut registry, 20, 2.0, 0.0, 0.0);
        let b = place(&mut registry, 20, 2.0, 40.0, 0.0);
        let c = place(&mut registry, 20, 2.0, 20.0, height + 2.0);
        registry.connect(a, b).unwrap();
        registry.connect(b, c).unwrap();

        let outcome = engine().snap(&mut registry, c).unwrap();
        assert!(matches!(outcome, SnapOutcome::Refused { state: ErrorState::Jamming { .. }, .. }));
        assert!(error_of(&registry, c).is_jamming());
    }

    #[test]
    fn test_snap_drops_edges_left_behind() {
        let mut registry = GearRegistry::new();
        let a = place(&mut registry, 20, 2.0, 0.0, 0.0);
        let b = place(&mut registry, 20, 2.0, 40.0, 0.0);
        let c = place(&mut registry, 20, 2.0, -40.0, 0.0);
        engine().rebuild(&mut registry, None);
        assert!(registry.get(a).unwrap().is_connected_to(b));

        // 58 from a, 42 from c: the old a-b mesh must not make b-c look like a triangle
        registry.get_mut(b).unwrap().position = Point3::new(-40.0, 42.0, 0.0);
        let outcome = engine().snap(&mut registry, b).unwrap();

        assert_eq!(outcome, SnapOutcome::Snapped { with: c });
        assert_eq!(registry.neighbors(b).unwrap(), &[c]);
        assert_eq!(registry.neighbors(a).unwrap(), &[c]);
        assert_eq!(error_of(&registry, b), ErrorState::None);
        assert_relative_eq!(registry.get(b).unwrap().position.y, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_snap_keeps_edges_still_in_range() {
        let mut registry = GearRegistry::new();
        let a = place(&mut registry, 20, 2.0, 0.0, 0.0);
        let b = place(&mut registry, 20, 2.0, 40.0, 0.0);
        engine().rebuild(&mut registry, None);

        registry.get_mut(b).unwrap().position = Point3::new(41.0, 0.0, 0.0);
        assert!(engine().drop_stale_edges(&mut registry, b).unwrap().is_empty());
        registry.get_mut(b).unwrap().position = Point3::new(44.0, 0.0, 0.0);
        assert_eq!(engine().drop_stale_edges(&mut registry, b).unwrap(), vec![a]);
        assert!(registry.edges().is_empty());
    }

    #[test]
    fn test_snap_ignores_overlapping_and_unknown_gears() {
        let mut registry = GearRegistry::new();
        place(&mut registry, 20, 2.0, 0.0, 0.0);
        let b = place(&mut registry, 20, 2.0, 10.0, 0.0);
        assert_eq!(engine().snap(&mut registry, b).unwrap(), SnapOutcome::NoCandidate);
        assert!(engine().snap(&mut registry, GearId(99)).is_err());
    }
}
