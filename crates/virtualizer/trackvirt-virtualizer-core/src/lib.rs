//! Trackvirt Virtualizer Core
//!
//! Pluggable strategies that turn a ground-truth pose source into a simulated tracked
//! animation curve. The IMU-simulation strategy drives an external trajectory estimator
//! and corrects its drift against sparse ground-truth checkpoints.
//!
//! Typical flow: pick a strategy from [`VirtualizerRegistry`], adjust its parameters, then
//! call [`Virtualizer::create_output_animation`] with a [`TrackerHandle`].

pub mod drift;
pub mod error;
pub mod estimator;
pub mod process;
pub mod registry;
pub mod runtime;
pub mod tracker;
pub mod virtualizer;
pub mod virtualizers;

pub use drift::{Checkpoint, GroundTruthSample, MIN_GROUND_TRUTH_SAMPLES};
pub use error::{ReconstructionError, RegistryError};
pub use estimator::{
    parse_estimator_output, EstimatedTrajectory, EstimatorBackend, EstimatorConfig,
    EstimatorInput,
};
pub use process::{ProcessBackend, ProcessBackendConfig};
pub use registry::{VirtualizerFactory, VirtualizerRegistry};
pub use runtime::{EstimatorRuntime, RuntimeLease};
pub use tracker::{CurveTracker, TrackerHandle};
pub use virtualizer::{Virtualizer, NAME_PARAM};
pub use virtualizers::{
    ImuSimTrackingVirtualizer, NoiseTrackingVirtualizer, OrientationFilter,
    PerfectTrackingVirtualizer, SensorModel,
};
