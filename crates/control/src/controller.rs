//! Gear Lifecycle Controller
//!
//! The single entry point for changing the scene. Every mutating call runs to
//! completion and leaves geometry, connectivity and speeds consistent before
//! returning; observers are told what changed afterwards.

use gearcore::{
    EngineConfig, Error, ErrorState, FrameContext, Gear, GearDimensions, GearEvent, GearId,
    GearObserver, GearSpec, Result, RotationDirection,
};
use log::{info, warn};
use mechanics::connectivity::{ConnectivityEngine, RebuildReport, SnapOutcome};
use mechanics::kinematics;
use mechanics::profile::{
    GearProfile, Polyline, ProfileFidelity, ProfileGenerator, ProfileResolution, generator_for,
    pitch_circle,
};
use mechanics::registry::GearRegistry;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for a gear-train controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Meshing thresholds
    pub engine: EngineConfig,
    /// Which profile generator builds outlines
    pub fidelity: ProfileFidelity,
    pub resolution: ProfileResolution,
    /// Upper limit for the commanded input speed (rpm)
    pub max_rpm: f64,
    /// When the driver is deleted, promote the first remaining gear
    pub driver_fallback: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            fidelity: ProfileFidelity::Involute,
            resolution: ProfileResolution::default(),
            max_rpm: 1000.0,
            driver_fallback: false,
        }
    }
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the meshing thresholds
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_fidelity(mut self, fidelity: ProfileFidelity) -> Self {
        self.fidelity = fidelity;
        self
    }

    pub fn with_resolution(mut self, resolution: ProfileResolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_max_rpm(mut self, max_rpm: f64) -> Self {
        self.max_rpm = max_rpm.max(0.0);
        self
    }

    pub fn with_driver_fallback(mut self, enabled: bool) -> Self {
        self.driver_fallback = enabled;
        self
    }
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Paused,
    Playing,
}

/// Per-gear values observers are told about
#[derive(Debug, Clone, Copy, PartialEq)]
struct GearSnapshot {
    error_state: ErrorState,
    rpm: f64,
    direction: RotationDirection,
}

/// State captured before a mutation, diffed afterwards to raise events
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    edges: Vec<(GearId, GearId)>,
    gears: BTreeMap<GearId, GearSnapshot>,
}

/// Owns the gear registry and keeps profiles, mesh graph and speeds in step
pub struct GearTrainController {
    config: ControllerConfig,
    registry: GearRegistry,
    engine: ConnectivityEngine,
    generator: Box<dyn ProfileGenerator>,
    profiles: BTreeMap<GearId, GearProfile>,
    state: PlayState,
    input_rpm: f64,
    selected: Option<GearId>,
    /// Seconds of playback so far
    elapsed: f64,
    observers: Vec<Box<dyn GearObserver>>,
}

impl Default for GearTrainController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl GearTrainController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            registry: GearRegistry::new(),
            engine: ConnectivityEngine::new(config.engine.clone()),
            generator: generator_for(config.fidelity, config.resolution),
            profiles: BTreeMap::new(),
            state: PlayState::Paused,
            input_rpm: 0.0,
            selected: None,
            elapsed: 0.0,
            observers: Vec::new(),
            config,
        }
    }

    /// Register an observer for change notifications
    pub fn subscribe<O: GearObserver + 'static>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    // === Gear lifecycle ===

    /// Add a gear. `spec` is clamped into range; connectivity is not rebuilt.
    pub fn add_gear(&mut self, spec: GearSpec, position: Point3<f64>) -> GearId {
        let spec = spec.clamped();
        let id = self.registry.insert(spec, position);
        self.profiles.insert(id, self.generator.build_profile(&spec));

        info!("added {} ({} teeth, module {})", id, spec.teeth, spec.module);
        self.emit(GearEvent::GearAdded { gear: id });
        if self.registry.driver() == Some(id) {
            self.emit(GearEvent::DriverChanged { gear: Some(id) });
        }
        id
    }

    /// Remove a gear and every reference to it
    pub fn delete_gear(&mut self, id: GearId) -> Result<()> {
        let before = self.snapshot();
        let removed = self.registry.remove(id)?;
        self.profiles.remove(&id);
        if self.selected == Some(id) {
            self.selected = None;
        }

        info!("deleted {}", id);
        self.emit(GearEvent::GearRemoved { gear: id });

        if removed.is_driver {
            if self.config.driver_fallback {
                if let Some(first) = self.registry.ids().first().copied() {
                    self.registry.set_driver(first)?;
                }
            }
            let driver = self.registry.driver();
            info!("driver removed, new driver: {:?}", driver);
            self.emit(GearEvent::DriverChanged { gear: driver });
        }

        self.refresh_speeds()?;
        self.emit_changes(&before);
        Ok(())
    }

    /// Replace a gear's spec, rebuilding its outline and the mesh graph
    pub fn update_gear_spec(&mut self, id: GearId, spec: GearSpec) -> Result<()> {
        let spec = spec.clamped();
        let before = self.snapshot();
        self.registry.get_mut(id)?.spec = spec;
        self.profiles.insert(id, self.generator.build_profile(&spec));

        info!("updated {} to {:?}", id, spec);
        self.rebuild(Some(id))?;
        self.emit_changes(&before);
        Ok(())
    }

    /// Move a gear and rebuild the mesh graph
    pub fn move_gear(&mut self, id: GearId, position: Point3<f64>) -> Result<()> {
        let before = self.snapshot();
        self.registry.get_mut(id)?.position = position;

        self.rebuild(Some(id))?;
        self.emit_changes(&before);
        Ok(())
    }

    /// Move a gear as part of an ongoing drag.
    ///
    /// Only the dragged gear is checked (see `ConnectivityEngine::snap`):
    /// meshes it has left are dropped, then it may snap to a new one.
    /// Returns true when it snapped.
    pub fn drag_gear(&mut self, id: GearId, position: Point3<f64>) -> Result<bool> {
        let before = self.snapshot();
        self.registry.get_mut(id)?.position = position;

        let outcome = self.engine.snap(&mut self.registry, id)?;
        if let SnapOutcome::Snapped { with } = outcome {
            self.emit(GearEvent::Snapped { gear: id, with });
        }
        self.refresh_speeds()?;
        self.emit_changes(&before);
        Ok(outcome.snapped())
    }

    /// End a drag: rebuild the mesh graph from final positions
    pub fn release_gear(&mut self, id: GearId) -> Result<()> {
        self.registry.get(id)?;
        let before = self.snapshot();
        self.rebuild(Some(id))?;
        self.emit_changes(&before);
        Ok(())
    }

    /// Rebuild the mesh graph from current positions
    pub fn rebuild_connectivity(&mut self) -> Result<RebuildReport> {
        let before = self.snapshot();
        let report = self.rebuild(None)?;
        self.emit_changes(&before);
        Ok(report)
    }

    /// Make `id` the only driver
    pub fn set_driver(&mut self, id: GearId) -> Result<()> {
        let before = self.snapshot();
        self.registry.set_driver(id)?;

        info!("{} is now the driver", id);
        self.emit(GearEvent::DriverChanged { gear: Some(id) });
        self.refresh_speeds()?;
        self.emit_changes(&before);
        Ok(())
    }

    /// Mark a gear as the one the user is interacting with, or clear it
    pub fn select_gear(&mut self, id: Option<GearId>) -> Result<()> {
        if let Some(id) = id {
            self.registry.get(id)?;
        }
        self.selected = id;
        Ok(())
    }

    // === Playback ===

    /// Start driving the train at `rpm`.
    ///
    /// Refused while any gear is jamming or when there is no driver; nothing
    /// is changed in that case.
    pub fn play(&mut self, rpm: f64) -> Result<()> {
        if let Some(jammed) = self.registry.iter().find(|g| g.error_state.is_jamming()) {
            let with = jammed.error_state.other().unwrap_or(jammed.id);
            warn!("refusing to play: {} is jamming against {}", jammed.id, with);
            return Err(Error::Jammed { gear: jammed.id, with });
        }

        let driver = match self.registry.driver() {
            Some(driver) => driver,
            None => {
                warn!("refusing to play: no driver");
                return Err(Error::NoDriver);
            }
        };

        let before = self.snapshot();
        self.input_rpm = self.clamp_rpm(rpm);
        kinematics::propagate(&mut self.registry, driver, self.input_rpm)?;

        info!("playing at {:.2} rpm from {}", self.input_rpm, driver);
        self.set_state(PlayState::Playing);
        self.emit_changes(&before);
        Ok(())
    }

    /// Stop animating; speeds are kept for the next `play`
    pub fn pause(&mut self) {
        if self.state == PlayState::Playing {
            info!("paused");
        }
        self.set_state(PlayState::Paused);
    }

    /// Change the commanded speed; takes effect immediately while playing
    pub fn set_input_rpm(&mut self, rpm: f64) -> Result<()> {
        let before = self.snapshot();
        self.input_rpm = self.clamp_rpm(rpm);
        self.refresh_speeds()?;
        self.emit_changes(&before);
        Ok(())
    }

    /// Zero every gear's rotation angle
    pub fn reset_rotations(&mut self) {
        kinematics::reset_rotation(&mut self.registry);
        self.elapsed = 0.0;
    }

    /// Advance rotation angles by the wall-clock time since the last frame
    pub fn advance_frame(&mut self, dt: f64) {
        if self.state != PlayState::Playing || !(dt.is_finite() && dt > 0.0) {
            return;
        }
        self.elapsed += dt;
        kinematics::advance_rotation(
            &mut self.registry,
            FrameContext { dt },
        );
    }

    /// Swap the profile generator and rebuild every outline
    pub fn set_fidelity(&mut self, fidelity: ProfileFidelity) {
        if self.generator.fidelity() == fidelity {
            return;
        }
        self.config.fidelity = fidelity;
        self.generator = generator_for(fidelity, self.config.resolution);
        for gear in self.registry.iter() {
            self.profiles.insert(gear.id, self.generator.build_profile(&gear.spec));
        }
        info!("profile fidelity set to {:?}", fidelity);
    }

    // === Queries ===

    /// Gears in insertion order
    pub fn gears(&self) -> impl Iterator<Item = &Gear> {
        self.registry.iter()
    }

    pub fn gear(&self, id: GearId) -> Result<&Gear> {
        self.registry.get(id)
    }

    pub fn registry(&self) -> &GearRegistry {
        &self.registry
    }

    pub fn profile(&self, id: GearId) -> Result<&GearProfile> {
        self.profiles.get(&id).ok_or(Error::GearNotFound(id))
    }

    pub fn pitch_circle(&self, id: GearId) -> Result<Polyline> {
        let gear = self.registry.get(id)?;
        Ok(pitch_circle(&gear.spec, self.config.resolution.circle_segments))
    }

    pub fn dimensions(&self, id: GearId) -> Result<GearDimensions> {
        self.registry.get(id).map(|g| g.spec.dimensions())
    }

    /// Ids of meshed neighbours
    pub fn connections(&self, id: GearId) -> Result<Vec<GearId>> {
        self.registry.neighbors(id).map(|n| n.to_vec())
    }

    pub fn driver(&self) -> Option<GearId> {
        self.registry.driver()
    }

    pub fn selected(&self) -> Option<GearId> {
        self.selected
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    /// Seconds of playback since the last `reset_rotations`
    pub fn playback_time(&self) -> f64 {
        self.elapsed
    }

    pub fn input_rpm(&self) -> f64 {
        self.input_rpm
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // === Internals ===

    fn clamp_rpm(&self, rpm: f64) -> f64 {
        if rpm.is_finite() {
            rpm.clamp(0.0, self.config.max_rpm)
        } else {
            0.0
        }
    }

    /// Full rebuild. Errors go on the selected gear, else on `touched`.
    fn rebuild(&mut self, touched: Option<GearId>) -> Result<RebuildReport> {
        let carrier = self.selected.or(touched);
        let report = self.engine.rebuild(&mut self.registry, carrier);
        if let Some((gear, with)) = report.jamming {
            if self.is_playing() {
                warn!("{} jams against {} while playing; that mesh is left open", gear, with);
            }
        }
        self.refresh_speeds()?;
        Ok(report)
    }

    /// Re-run propagation after the graph or input speed changed.
    ///
    /// Without a driver there is nothing to propagate from, so playback stops.
    fn refresh_speeds(&mut self) -> Result<()> {
        if !self.is_playing() {
            return Ok(());
        }
        match self.registry.driver() {
            Some(driver) => {
                kinematics::propagate(&mut self.registry, driver, self.input_rpm)?;
            }
            None => {
                warn!("no driver while playing; pausing");
                self.set_state(PlayState::Paused);
            }
        }
        Ok(())
    }

    fn set_state(&mut self, state: PlayState) {
        if self.state != state {
            self.state = state;
            self.emit(GearEvent::PlaybackChanged {
                playing: state == PlayState::Playing,
            });
        }
    }

    fn snapshot(&self) -> Snapshot {
        let mut edges = self.registry.edges();
        edges.sort();
        let gears = self
            .registry
            .iter()
            .map(|g| {
                (
                    g.id,
                    GearSnapshot {
                        error_state: g.error_state,
                        rpm: g.rpm,
                        direction: g.direction,
                    },
                )
            })
            .collect();
        Snapshot { edges, gears }
    }

    fn emit_changes(&mut self, before: &Snapshot) {
        let after = self.snapshot();
        if after.edges != before.edges {
            self.emit(GearEvent::ConnectivityChanged);
        }

        for (&id, now) in &after.gears {
            let was = before.gears.get(&id);
            if was.map(|w| w.error_state) != Some(now.error_state) {
                self.emit(GearEvent::ErrorStateChanged {
                    gear: id,
                    state: now.error_state,
                });
            }
            if was.map(|w| (w.rpm, w.direction)) != Some((now.rpm, now.direction)) {
                self.emit(GearEvent::SpeedChanged {
                    gear: id,
                    rpm: now.rpm,
                    direction: now.direction,
                });
            }
        }
    }

    fn emit(&mut self, event: GearEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }
}
