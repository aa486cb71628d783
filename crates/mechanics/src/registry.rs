//! Gear Registry
//!
//! Owns every `Gear` in the scene. Gears are stored by `GearId`; since ids are
//! handed out in increasing order, iteration follows insertion order. All
//! cross-gear references (`connected_to`, error states) are ids, so removing a
//! gear only needs a purge pass over the survivors.

use gearcore::{Error, ErrorState, Gear, GearId, GearSpec, Result};
use log::debug;
use nalgebra::Point3;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct GearRegistry {
    gears: BTreeMap<GearId, Gear>,
    next_id: u32,
}

impl GearRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new gear and return its id.
    ///
    /// The first gear in an empty registry becomes the driver.
    pub fn insert(&mut self, spec: GearSpec, position: Point3<f64>) -> GearId {
        self.next_id += 1;
        let id = GearId(self.next_id);

        let mut gear = Gear::new(id, spec, position);
        gear.is_driver = self.gears.is_empty();
        self.gears.insert(id, gear);

        debug!("registered {} at {:?}", id, position);
        id
    }

    /// Remove a gear, purging every edge and error state that names it
    pub fn remove(&mut self, id: GearId) -> Result<Gear> {
        let removed = self.gears.remove(&id).ok_or(Error::GearNotFound(id))?;

        for gear in self.gears.values_mut() {
            gear.disconnect(id);
            if gear.error_state.references(id) {
                gear.error_state = ErrorState::None;
            }
        }
        Ok(removed)
    }

    pub fn contains(&self, id: GearId) -> bool {
        self.gears.contains_key(&id)
    }

    pub fn get(&self, id: GearId) -> Result<&Gear> {
        self.gears.get(&id).ok_or(Error::GearNotFound(id))
    }

    pub fn get_mut(&mut self, id: GearId) -> Result<&mut Gear> {
        self.gears.get_mut(&id).ok_or(Error::GearNotFound(id))
    }

    /// Gears in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Gear> {
        self.gears.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Gear> {
        self.gears.values_mut()
    }

    /// Ids in insertion order
    pub fn ids(&self) -> Vec<GearId> {
        self.gears.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.gears.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gears.is_empty()
    }

    /// The current driver, if one is designated
    pub fn driver(&self) -> Option<GearId> {
        self.gears.values().find(|g| g.is_driver).map(|g| g.id)
    }

    /// Make `id` the only driver
    pub fn set_driver(&mut self, id: GearId) -> Result<()> {
        if !self.contains(id) {
            return Err(Error::GearNotFound(id));
        }
        for gear in self.gears.values_mut() {
            gear.is_driver = gear.id == id;
        }
        Ok(())
    }

    /// Add a symmetric edge between two gears
    pub fn connect(&mut self, a: GearId, b: GearId) -> Result<()> {
        if a == b {
            return Ok(());
        }
        if !self.contains(b) {
            return Err(Error::GearNotFound(b));
        }
        self.get_mut(a)?.connect(b);
        self.get_mut(b)?.connect(a);
        Ok(())
    }

    /// Remove the edge between two gears, if present
    pub fn disconnect(&mut self, a: GearId, b: GearId) -> Result<()> {
        if !self.contains(b) {
            return Err(Error::GearNotFound(b));
        }
        self.get_mut(a)?.disconnect(b);
        self.get_mut(b)?.disconnect(a);
        Ok(())
    }

    /// Remove every edge in the graph
    pub fn clear_connections(&mut self) {
        for gear in self.gears.values_mut() {
            gear.connected_to.clear();
        }
    }

    /// Neighbours of `id` in edge order
    pub fn neighbors(&self, id: GearId) -> Result<&[GearId]> {
        self.get(id).map(|g| g.connected_to.as_slice())
    }

    /// Every undirected edge once, as (lower id, higher id)
    pub fn edges(&self) -> Vec<(GearId, GearId)> {
        self.gears
            .values()
            .flat_map(|g| {
                g.connected_to
                    .iter()
                    .filter(move |&&other| g.id < other)
                    .map(move |&other| (g.id, other))
            })
            .collect()
    }
}
