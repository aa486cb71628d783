use serde::{Deserialize, Serialize};

use crate::gear::{ErrorState, GearId, RotationDirection};

/// Timing for one rendered frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameContext {
    /// Wall-clock seconds since the previous frame
    pub dt: f64,
}

/// Change notifications for presentation layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GearEvent {
    GearAdded { gear: GearId },
    GearRemoved { gear: GearId },
    /// Some edge was added or removed
    ConnectivityChanged,
    ErrorStateChanged { gear: GearId, state: ErrorState },
    SpeedChanged { gear: GearId, rpm: f64, direction: RotationDirection },
    DriverChanged { gear: Option<GearId> },
    PlaybackChanged { playing: bool },
    /// A dragged gear was pulled into mesh
    Snapped { gear: GearId, with: GearId },
}

/// Receives `GearEvent`s as they happen
pub trait GearObserver {
    fn on_event(&mut self, event: &GearEvent);
}

impl<F> GearObserver for F
where
    F: FnMut(&GearEvent),
{
    fn on_event(&mut self, event: &GearEvent) {
        self(event)
    }
}
