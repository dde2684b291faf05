//! Fake estimator backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use trackvirt_virtualizer_core::{EstimatorBackend, EstimatorInput, ReconstructionError};

/// Returns its input as the estimate, shifted by `position_offset` and optionally with
/// samples cut from either end.
#[derive(Clone, Debug, Default)]
pub struct EchoBackend {
    /// Added to every position, in `x, y, z` order.
    pub position_offset: [f32; 3],
    pub skip_leading: usize,
    pub skip_trailing: usize,
}

impl EchoBackend {
    pub fn perfect() -> Self {
        Self::default()
    }

    pub fn shifted(position_offset: [f32; 3]) -> Self {
        Self {
            position_offset,
            ..Self::default()
        }
    }

    pub fn truncated(skip_leading: usize, skip_trailing: usize) -> Self {
        Self {
            skip_leading,
            skip_trailing,
            ..Self::default()
        }
    }
}

impl EstimatorBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    fn invoke(&self, input: &EstimatorInput) -> Result<JsonValue, ReconstructionError> {
        let end = input.len().saturating_sub(self.skip_trailing);
        let range = self.skip_leading.min(end)..end;
        let [dx, dy, dz] = self.position_offset.map(|v| v as f64);
        let [px, pz, py] = &input.positions;
        let [qw, qx, qy, qz] = &input.rotations;

        let timestamps: Vec<f64> = input.timestamps[range.clone()].to_vec();
        let rotations: Vec<[f64; 4]> = range.clone().map(|i| [qw[i], qx[i], qy[i], qz[i]]).collect();
        let positions: Vec<[f64; 3]> = range
            .map(|i| [px[i] + dx, pz[i] + dz, py[i] + dy])
            .collect();
        Ok(json!([timestamps, rotations, positions]))
    }
}

/// Always answers with the same JSON.
#[derive(Clone, Debug)]
pub struct ScriptedBackend(pub JsonValue);

impl EstimatorBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn invoke(&self, _input: &EstimatorInput) -> Result<JsonValue, ReconstructionError> {
        Ok(self.0.clone())
    }
}

/// Fails every call, or activation too when `fail_activation` is set.
#[derive(Clone, Debug)]
pub struct FailingBackend {
    pub error: ReconstructionError,
    pub fail_activation: bool,
}

impl FailingBackend {
    pub fn on_invoke(error: ReconstructionError) -> Self {
        Self {
            error,
            fail_activation: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            error: ReconstructionError::EstimatorUnavailable {
                reason: "estimator module missing".to_string(),
            },
            fail_activation: true,
        }
    }
}

impl EstimatorBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    fn activate(&self) -> Result<(), ReconstructionError> {
        if self.fail_activation {
            Err(self.error.clone())
        } else {
            Ok(())
        }
    }

    fn invoke(&self, _input: &EstimatorInput) -> Result<JsonValue, ReconstructionError> {
        Err(self.error.clone())
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub activations: AtomicUsize,
    pub deactivations: AtomicUsize,
    pub invocations: AtomicUsize,
}

impl Counters {
    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Activated and not yet torn down.
    pub fn is_live(&self) -> bool {
        self.activations() > self.deactivations()
    }
}

/// Wraps another backend and counts lifecycle calls.
pub struct CountingBackend<B> {
    inner: B,
    counters: Arc<Counters>,
}

impl<B: EstimatorBackend> CountingBackend<B> {
    pub fn new(inner: B) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            Self {
                inner,
                counters: Arc::clone(&counters),
            },
            counters,
        )
    }
}

impl<B: EstimatorBackend> EstimatorBackend for CountingBackend<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn activate(&self) -> Result<(), ReconstructionError> {
        self.inner.activate()?;
        self.counters.activations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn deactivate(&self) {
        self.inner.deactivate();
        self.counters.deactivations.fetch_add(1, Ordering::SeqCst);
    }

    fn invoke(&self, input: &EstimatorInput) -> Result<JsonValue, ReconstructionError> {
        self.counters.invocations.fetch_add(1, Ordering::SeqCst);
        self.inner.invoke(input)
    }
}
