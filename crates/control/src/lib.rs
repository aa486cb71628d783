//! Gear-train lifecycle control
//!
//! This crate provides:
//! - `GearTrainController`, the single owner of a gear scene
//! - `ControllerConfig` and its builder

pub mod controller;

pub use controller::{ControllerConfig, GearTrainController, PlayState};
