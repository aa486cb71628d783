pub mod connectivity;
pub mod kinematics;
pub mod profile;
pub mod registry;

pub use connectivity::{ConnectivityEngine, PairGeometry, PairRelation, RebuildReport, SnapOutcome};
pub use kinematics::{GearMesh, advance_rotation, propagate, reset_rotation};
pub use profile::{
    GearProfile, InvoluteProfile, Polyline, ProfileFidelity, ProfileGenerator, ProfileResolution,
    TrapezoidProfile, generator_for, pitch_circle,
};
pub use registry::GearRegistry;
