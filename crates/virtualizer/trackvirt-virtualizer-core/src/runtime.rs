//! Shared estimator runtime.
//!
//! One backend serves every virtualizer that holds a [`RuntimeLease`]. The backend is
//! activated when the live lease count goes from zero to one and deactivated when it drops
//! back to zero. A failed activation is retried on the next estimator call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use once_cell::sync::Lazy;
use serde_json::Value as JsonValue;

use crate::error::ReconstructionError;
use crate::estimator::{EstimatorBackend, EstimatorInput};
use crate::process::{ProcessBackend, ProcessBackendConfig};

#[derive(Debug, Default)]
struct RuntimeState {
    live: usize,
    active: bool,
}

pub struct EstimatorRuntime {
    backend: Box<dyn EstimatorBackend>,
    state: Mutex<RuntimeState>,
}

static PROCESS_RUNTIME: Lazy<Arc<EstimatorRuntime>> = Lazy::new(|| {
    EstimatorRuntime::new(ProcessBackend::new(ProcessBackendConfig::from_env()))
});

impl EstimatorRuntime {
    pub fn new(backend: impl EstimatorBackend + 'static) -> Arc<Self> {
        Self::from_boxed(Box::new(backend))
    }

    pub fn from_boxed(backend: Box<dyn EstimatorBackend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            state: Mutex::new(RuntimeState::default()),
        })
    }

    /// Process-wide runtime around the child-process estimator configured from the
    /// environment.
    pub fn process_default() -> Arc<Self> {
        Arc::clone(&PROCESS_RUNTIME)
    }

    fn state(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Register one more user of the backend.
    pub fn acquire(self: &Arc<Self>) -> RuntimeLease {
        let mut state = self.state();
        state.live += 1;
        if state.live == 1 && !state.active {
            self.try_activate(&mut state);
        }
        RuntimeLease {
            runtime: Arc::clone(self),
        }
    }

    fn release(&self) {
        let mut state = self.state();
        state.live = state.live.saturating_sub(1);
        if state.live == 0 && state.active {
            debug!("estimator '{}': last lease released, tearing down", self.backend.name());
            self.backend.deactivate();
            state.active = false;
        }
    }

    fn try_activate(&self, state: &mut RuntimeState) -> Option<ReconstructionError> {
        debug!("estimator '{}': activating", self.backend.name());
        match self.backend.activate() {
            Ok(()) => {
                state.active = true;
                None
            }
            Err(err) => {
                debug!("estimator '{}': activation failed: {err}", self.backend.name());
                Some(err)
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    pub fn live_count(&self) -> usize {
        self.state().live
    }

    fn invoke(&self, input: &EstimatorInput) -> Result<JsonValue, ReconstructionError> {
        {
            let mut state = self.state();
            if !state.active {
                if let Some(err) = self.try_activate(&mut state) {
                    return Err(match err {
                        unavailable @ ReconstructionError::EstimatorUnavailable { .. } => {
                            unavailable
                        }
                        other => ReconstructionError::EstimatorUnavailable {
                            reason: other.to_string(),
                        },
                    });
                }
            }
        }
        debug!(
            "estimator '{}': invoking with {} samples",
            self.backend.name(),
            input.len()
        );
        self.backend.invoke(input)
    }
}

impl std::fmt::Debug for EstimatorRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("EstimatorRuntime")
            .field("backend", &self.backend.name())
            .field("live", &state.live)
            .field("active", &state.active)
            .finish()
    }
}

/// Scoped share of an [`EstimatorRuntime`]. Cloning takes a new share; dropping releases it.
#[derive(Debug)]
pub struct RuntimeLease {
    runtime: Arc<EstimatorRuntime>,
}

impl RuntimeLease {
    pub fn runtime(&self) -> &Arc<EstimatorRuntime> {
        &self.runtime
    }

    pub fn invoke(&self, input: &EstimatorInput) -> Result<JsonValue, ReconstructionError> {
        self.runtime.invoke(input)
    }
}

impl Clone for RuntimeLease {
    fn clone(&self) -> Self {
        self.runtime.acquire()
    }
}

impl Drop for RuntimeLease {
    fn drop(&mut self) {
        self.runtime.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Flaky {
        attempts: AtomicUsize,
        fail_first: usize,
        deactivations: AtomicUsize,
    }

    impl EstimatorBackend for Arc<Flaky> {
        fn activate(&self) -> Result<(), ReconstructionError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(ReconstructionError::EstimatorCallFailed {
                    reason: "not yet".into(),
                })
            } else {
                Ok(())
            }
        }

        fn deactivate(&self) {
            self.deactivations.fetch_add(1, Ordering::SeqCst);
        }

        fn invoke(&self, _input: &EstimatorInput) -> Result<JsonValue, ReconstructionError> {
            Ok(JsonValue::Null)
        }
    }

    fn empty_input() -> EstimatorInput {
        EstimatorInput {
            sampling_period: 0.01,
            timestamps: vec![],
            positions: Default::default(),
            rotations: Default::default(),
            sensor_model: 0,
            orientation_filter: 0,
            calibrate: false,
        }
    }

    #[test]
    fn lease_clone_and_drop_track_live_count() {
        let backend = Arc::new(Flaky::default());
        let runtime = EstimatorRuntime::new(Arc::clone(&backend));
        assert!(!runtime.is_active());

        let a = runtime.acquire();
        let b = a.clone();
        assert_eq!(runtime.live_count(), 2);
        assert!(runtime.is_active());

        drop(a);
        assert!(runtime.is_active());
        drop(b);
        assert!(!runtime.is_active());
        assert_eq!(runtime.live_count(), 0);
        assert_eq!(backend.deactivations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_activation_surfaces_as_unavailable_then_recovers() {
        let backend = Arc::new(Flaky {
            fail_first: 2,
            ..Flaky::default()
        });
        let runtime = EstimatorRuntime::new(Arc::clone(&backend));
        let lease = runtime.acquire();
        assert!(!runtime.is_active());

        let err = lease.invoke(&empty_input()).unwrap_err();
        assert!(err.is_retryable());

        assert!(lease.invoke(&empty_input()).is_ok());
        assert!(runtime.is_active());
        drop(lease);
        assert!(!runtime.is_active());
    }
}
