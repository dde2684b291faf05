use approx::assert_relative_eq;
use serde_json::json;
use trackvirt_api_core::blend::quat_angle_between;
use trackvirt_test_fixtures::backends::{EchoBackend, ScriptedBackend};
use trackvirt_test_fixtures::{estimator_results, trackers};
use trackvirt_virtualizer_core::virtualizers::imu::CHECKPOINT_RATE;
use trackvirt_virtualizer_core::{
    CurveTracker, EstimatorRuntime, ImuSimTrackingVirtualizer, PerfectTrackingVirtualizer,
    TrackerHandle, Virtualizer, VirtualizerRegistry,
};

#[test]
fn perfect_virtualizer_round_trips_fixture_curves() {
    let registry = VirtualizerRegistry::with_builtins();
    let mut perfect = registry
        .create(PerfectTrackingVirtualizer::TYPE_NAME)
        .unwrap();
    perfect.configure(&json!({"SampleRate": 4})).unwrap();

    for name in trackers::keys() {
        let tracker = trackers::load(&name).unwrap();
        let curve = perfect.create_output_animation(&tracker).unwrap();
        assert!(curve.validate().is_ok(), "{name}");
        assert_eq!(curve.positions.last().unwrap().time, tracker.animation_length());

        // Feeding the output back in reproduces the source at every output key.
        let replay = CurveTracker::new(curve.clone());
        for key in &curve.positions {
            let u = key.time / replay.animation_length();
            let a = replay.position(u);
            let b = tracker.position(u);
            for axis in 0..3 {
                assert_relative_eq!(a[axis], b[axis], epsilon = 1e-4);
            }
        }
    }
}

#[test]
fn imu_virtualizer_on_fixture_trackers() {
    let runtime = EstimatorRuntime::new(EchoBackend::perfect());
    let mut imu: Box<dyn Virtualizer> = Box::new(ImuSimTrackingVirtualizer::with_runtime(&runtime));
    imu.configure(&json!({
        "Name": "wave",
        "Checkpoint Rate": 30,
        "Sensor Model": "Orient3",
        "Orientation Filter": "YunEKF",
        "Calibrate": true,
    }))
    .unwrap();
    assert_eq!(imu.name().unwrap(), "wave");

    let tracker = trackers::load("wave-hand").unwrap();
    let curve = imu.create_output_animation(&tracker).unwrap();
    assert_eq!(curve.name, "wave");
    assert_eq!(curve.positions.len(), 120);
    for key in &curve.rotations {
        let expected = tracker.rotation(key.time / tracker.animation_length());
        assert!(quat_angle_between(key.value, expected) < 0.05);
    }
}

#[test]
fn strict_configuration_rejects_wrong_kinds() {
    let mut imu = VirtualizerRegistry::with_builtins()
        .create(ImuSimTrackingVirtualizer::TYPE_NAME)
        .unwrap();
    assert!(imu.configure(&json!({"Input Sampling Rate": 59.5})).is_err());
    assert!(imu.configure(&json!({"Sensor Model": "Perfect"})).is_err());
    assert!(imu.configure(&json!({"Calibrate": 1})).is_err());
    assert_eq!(imu.get::<i32>("Input Sampling Rate").unwrap(), 60);
}

#[test]
fn scripted_results_flow_through_the_pipeline() {
    let tracker = trackers::load("head-turn").unwrap();

    let two = estimator_results::load("two-samples").unwrap();
    let imu = ImuSimTrackingVirtualizer::with_runtime(&EstimatorRuntime::new(ScriptedBackend(two)));
    let curve = imu.create_output_animation(&tracker).unwrap();
    // Estimate spans [0, 1]; later output keys are ground truth.
    for key in curve.positions.iter().filter(|k| k.time > 1.0) {
        let gt = tracker.position(key.time / tracker.animation_length());
        for axis in 0..3 {
            assert_relative_eq!(key.value[axis], gt[axis], epsilon = 1e-5);
        }
    }

    let shuffled = estimator_results::load("shuffled").unwrap();
    let mut imu =
        ImuSimTrackingVirtualizer::with_runtime(&EstimatorRuntime::new(ScriptedBackend(shuffled)));
    imu.parameters_mut().set(CHECKPOINT_RATE, 2i32).unwrap();
    let curve = imu.create_output_animation(&tracker).unwrap();
    assert_eq!(curve.positions.len(), 180);

    // Accepted samples are x = 0, 0.5, 1 at t = 0, 0.5, 1; checkpoints at 0 and 0.5.
    for key in curve.positions.iter().filter(|k| k.time < 0.99) {
        let checkpoint = if key.time >= 0.5 { 0.5 } else { 0.0 };
        let gt = tracker.position(key.time / tracker.animation_length());
        assert_relative_eq!(key.value[0], key.time - checkpoint, epsilon = 1e-4);
        assert_relative_eq!(key.value[1], gt[1], epsilon = 1e-4);
        assert!((key.value[2] - gt[2]).abs() < 0.03, "{key:?}");
    }
    // The out-of-order [9, 9, 9] samples never reach the output.
    assert!(curve
        .positions
        .iter()
        .all(|k| k.value.iter().all(|v| v.abs() < 2.0)));
}
