//! Shared test fixtures: JSON tracker curves listed in `fixtures/manifest.json`, analytic
//! trackers, and fake estimator backends.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

pub mod analytic;
pub mod backends;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    trackers: HashMap<String, TrackerEntry>,
    #[serde(rename = "estimator-results")]
    estimator_results: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct TrackerEntry {
    path: String,
    /// Overrides the curve's last key time.
    #[serde(default)]
    length: Option<f32>,
}

impl Manifest {
    fn tracker(&self, name: &str) -> Result<&TrackerEntry> {
        self.trackers
            .get(name)
            .ok_or_else(|| anyhow!("unknown tracker fixture '{name}'"))
    }

    fn estimator_result(&self, name: &str) -> Result<&str> {
        self.estimator_results
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("unknown estimator result fixture '{name}'"))
    }
}

fn sorted_names<T>(map: &HashMap<String, T>) -> Vec<String> {
    let mut names: Vec<String> = map.keys().cloned().collect();
    names.sort();
    names
}

/// Fixture files live in the workspace-level `fixtures/` directory.
fn fixture_path(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../../fixtures")
        .join(rel)
}

fn read_fixture(rel: &str) -> Result<String> {
    let path = fixture_path(rel);
    fs::read_to_string(&path).with_context(|| format!("fixture {} is unreadable", path.display()))
}

pub mod trackers {
    use super::*;
    use trackvirt_animation_core::AnimationCurve;
    use trackvirt_virtualizer_core::CurveTracker;

    pub fn keys() -> Vec<String> {
        sorted_names(&MANIFEST.trackers)
    }

    pub fn json(name: &str) -> Result<String> {
        read_fixture(&MANIFEST.tracker(name)?.path)
    }

    /// The validated curve behind a tracker fixture.
    pub fn curve(name: &str) -> Result<AnimationCurve> {
        AnimationCurve::from_json_str(&json(name)?)
            .with_context(|| format!("tracker fixture '{name}' is not a valid curve"))
    }

    /// Curve tracker, with the manifest's length override applied.
    pub fn load(name: &str) -> Result<CurveTracker> {
        let entry = MANIFEST.tracker(name)?;
        let curve = curve(name)?;
        Ok(match entry.length {
            Some(length) => CurveTracker::with_length(curve, length),
            None => CurveTracker::new(curve),
        })
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(fixture_path(&MANIFEST.tracker(name)?.path))
    }
}

/// Canned estimator results, for scripting backends.
pub mod estimator_results {
    use super::*;
    use serde_json::Value as JsonValue;
    use trackvirt_virtualizer_core::{parse_estimator_output, EstimatedTrajectory};

    pub fn keys() -> Vec<String> {
        sorted_names(&MANIFEST.estimator_results)
    }

    /// Raw result exactly as an estimator would return it.
    pub fn load(name: &str) -> Result<JsonValue> {
        let text = read_fixture(MANIFEST.estimator_result(name)?)?;
        serde_json::from_str(&text)
            .with_context(|| format!("estimator result fixture '{name}' is not JSON"))
    }

    /// The result after the adapter's validation and timestamp filtering.
    pub fn trajectory(name: &str) -> Result<EstimatedTrajectory> {
        parse_estimator_output(&load(name)?)
            .with_context(|| format!("estimator result fixture '{name}' is malformed"))
    }
}
