pub mod frame;
pub mod heading;
pub mod resolver;
pub mod route;

use serde::{Deserialize, Serialize};

use crate::api::TravelMode;
use crate::error::{AnimatorError, Result};
use crate::geo::Location;

/// Largest field of view the image provider accepts.
const MAX_FOV: f64 = 120.0;

/// Scene generation strategy, as written in scene descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SceneType {
    Auto,
    Sweep,
    Manual,
}

/// Scene descriptor as it arrives from JSON. Every field is optional so the
/// same shape doubles as a partial update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SceneType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_mode: Option<TravelMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fov: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<String>>,
}

impl SceneConfig {
    pub fn new(id: impl Into<String>, kind: SceneType) -> Self {
        Self {
            id: id.into(),
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Overlays every field set in `patch`. The id never changes.
    pub fn merge(&mut self, patch: SceneConfig) {
        fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        overlay(&mut self.kind, patch.kind);
        overlay(&mut self.origin, patch.origin);
        overlay(&mut self.destination, patch.destination);
        overlay(&mut self.target, patch.target);
        overlay(&mut self.start_heading, patch.start_heading);
        overlay(&mut self.finish_heading, patch.finish_heading);
        overlay(&mut self.travel_mode, patch.travel_mode);
        overlay(&mut self.duration, patch.duration);
        overlay(&mut self.pitch, patch.pitch);
        overlay(&mut self.fov, patch.fov);
        overlay(&mut self.frames, patch.frames);
    }
}

/// Route-driven camera path from `origin` to `destination`.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoScene {
    pub origin: Location,
    pub destination: Location,
    pub target: Option<Location>,
    pub travel_mode: TravelMode,
    pub duration: f64,
}

/// Fixed-point angular sweep between two headings.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepScene {
    pub origin: Location,
    pub target: Option<Location>,
    pub start_heading: f64,
    pub finish_heading: f64,
    pub duration: f64,
}

/// Explicit list of frame URLs.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualScene {
    pub frames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneKind {
    Auto(AutoScene),
    Sweep(SweepScene),
    Manual(ManualScene),
}

impl SceneKind {
    pub fn scene_type(&self) -> SceneType {
        match self {
            SceneKind::Auto(_) => SceneType::Auto,
            SceneKind::Sweep(_) => SceneType::Sweep,
            SceneKind::Manual(_) => SceneType::Manual,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneStatus {
    NeedsGeneration,
    Generating,
    Generated,
    /// Generation ran and failed; the scene still counts as generated so a
    /// movie pass always terminates.
    Failed(String),
}

/// One named segment of a movie.
#[derive(Debug, Clone)]
pub struct Scene {
    id: String,
    kind: SceneKind,
    pitch: f64,
    fov: Option<f64>,
    frames: Vec<String>,
    status: SceneStatus,
    config: SceneConfig,
    revision: u64,
}

impl Scene {
    /// Validates a descriptor and builds the scene. Errors here are fatal:
    /// the scene is never constructed.
    pub fn from_config(config: SceneConfig) -> Result<Self> {
        let id = config.id.trim().to_string();
        if id.is_empty() {
            return Err(AnimatorError::invalid_scene("<unnamed>", "scene id is required"));
        }
        let invalid = |reason: &str| AnimatorError::invalid_scene(&id, reason);

        let kind_type = config.kind.ok_or_else(|| invalid("scene type is required"))?;

        let pitch = config.pitch.unwrap_or(0.0);
        if !pitch.is_finite() || !(-90.0..=90.0).contains(&pitch) {
            return Err(invalid("pitch must be within [-90, 90]"));
        }
        if let Some(fov) = config.fov {
            if !fov.is_finite() || fov <= 0.0 || fov > MAX_FOV {
                return Err(invalid("fov must be within (0, 120]"));
            }
        }

        let required_location = |value: &Option<Location>, name: &str| -> Result<Location> {
            match value {
                Some(location) if !location.is_empty() => Ok(location.clone()),
                _ => Err(invalid(&format!("{} is required", name))),
            }
        };
        let positive_duration = || -> Result<f64> {
            match config.duration {
                Some(d) if d.is_finite() && d > 0.0 => Ok(d),
                Some(_) => Err(invalid("duration must be greater than zero")),
                None => Err(invalid("duration is required")),
            }
        };
        let target = config.target.clone().filter(|t| !t.is_empty());

        let (kind, frames) = match kind_type {
            SceneType::Auto => {
                let kind = SceneKind::Auto(AutoScene {
                    origin: required_location(&config.origin, "origin")?,
                    destination: required_location(&config.destination, "destination")?,
                    target,
                    travel_mode: config.travel_mode.unwrap_or_default(),
                    duration: positive_duration()?,
                });
                (kind, Vec::new())
            }
            SceneType::Sweep => {
                let start_heading = config.start_heading.unwrap_or(0.0);
                let finish_heading = config.finish_heading.unwrap_or(360.0);
                if !(0.0 <= start_heading && start_heading < finish_heading && finish_heading <= 360.0)
                {
                    return Err(invalid(
                        "sweep requires 0 <= startHeading < finishHeading <= 360",
                    ));
                }
                let kind = SceneKind::Sweep(SweepScene {
                    origin: required_location(&config.origin, "origin")?,
                    target,
                    start_heading,
                    finish_heading,
                    duration: positive_duration()?,
                });
                (kind, Vec::new())
            }
            SceneType::Manual => {
                let frames = config.frames.clone().unwrap_or_default();
                if frames.is_empty() {
                    return Err(invalid("manual scenes need at least one frame"));
                }
                let kind = SceneKind::Manual(ManualScene {
                    frames: frames.clone(),
                });
                (kind, frames)
            }
        };

        Ok(Self {
            id,
            kind,
            pitch,
            fov: config.fov,
            frames,
            status: SceneStatus::NeedsGeneration,
            config,
            revision: 0,
        })
    }

    /// Applies a partial update. The merged descriptor is validated from
    /// scratch; on error the scene is left untouched.
    pub fn update(&mut self, patch: SceneConfig) -> Result<()> {
        let mut merged = self.config.clone();
        merged.merge(patch);

        let mut updated = Scene::from_config(merged)?;
        updated.revision = self.revision + 1;
        *self = updated;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &SceneKind {
        &self.kind
    }

    pub fn scene_type(&self) -> SceneType {
        self.kind.scene_type()
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn fov(&self) -> Option<f64> {
        self.fov
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn status(&self) -> &SceneStatus {
        &self.status
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Bumped on every successful update.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_generated(&self) -> bool {
        matches!(self.status, SceneStatus::Generated | SceneStatus::Failed(_))
    }

    pub fn requires_generation(&self) -> bool {
        self.status == SceneStatus::NeedsGeneration
    }

    pub(crate) fn kind_mut(&mut self) -> &mut SceneKind {
        &mut self.kind
    }

    pub(crate) fn set_status(&mut self, status: SceneStatus) {
        self.status = status;
    }

    pub(crate) fn set_frames(&mut self, frames: Vec<String>) {
        self.frames = frames;
    }

    /// Marks the scene stale, e.g. after a movie-wide frame rate or size
    /// change. Counts as a revision so an in-flight result is discarded.
    pub(crate) fn invalidate(&mut self) {
        self.status = SceneStatus::NeedsGeneration;
        self.revision += 1;
    }
}

/// Number of frames a scene of `duration` seconds spans at `frame_rate`,
/// rounded down.
pub fn frame_count(frame_rate: u32, duration: f64) -> usize {
    let frames = (f64::from(frame_rate) * duration).floor();
    if frames.is_finite() && frames > 0.0 {
        frames as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    fn auto_config() -> SceneConfig {
        SceneConfig {
            origin: Some("E2 7LF".into()),
            destination: Some("E3 3GQ".into()),
            duration: Some(5.0),
            ..SceneConfig::new("scene-1", SceneType::Auto)
        }
    }

    #[test]
    fn descriptor_parses_from_json() {
        let config: SceneConfig = serde_json::from_str(
            r#"{
                "id": "scene-1",
                "type": "SWEEP",
                "origin": {"lat": 51.5, "lng": -0.1},
                "startHeading": 90,
                "finishHeading": 180,
                "duration": 2
            }"#,
        )
        .unwrap();

        let scene = Scene::from_config(config).unwrap();
        match scene.kind() {
            SceneKind::Sweep(sweep) => {
                assert_eq!(sweep.origin, Location::Coordinate(Coordinate::new(51.5, -0.1)));
                assert_eq!(sweep.start_heading, 90.0);
                assert_eq!(sweep.finish_heading, 180.0);
                assert_eq!(sweep.target, None);
            }
            other => panic!("expected sweep, got {:?}", other),
        }
        assert_eq!(scene.status(), &SceneStatus::NeedsGeneration);
    }

    #[test]
    fn auto_requires_origin_and_destination() {
        let mut config = auto_config();
        config.destination = None;
        assert!(matches!(
            Scene::from_config(config),
            Err(AnimatorError::InvalidSceneConfig { .. })
        ));

        let mut config = auto_config();
        config.origin = Some("  ".into());
        assert!(Scene::from_config(config).is_err());
    }

    #[test]
    fn duration_must_be_positive() {
        let mut config = auto_config();
        config.duration = Some(0.0);
        assert!(Scene::from_config(config).is_err());
    }

    #[test]
    fn sweep_heading_range_is_validated() {
        let sweep = |start: f64, finish: f64| SceneConfig {
            origin: Some("51.5,-0.1".into()),
            start_heading: Some(start),
            finish_heading: Some(finish),
            duration: Some(1.0),
            ..SceneConfig::new("sweep", SceneType::Sweep)
        };
        assert!(Scene::from_config(sweep(0.0, 360.0)).is_ok());
        assert!(Scene::from_config(sweep(180.0, 180.0)).is_err());
        assert!(Scene::from_config(sweep(-10.0, 90.0)).is_err());
        assert!(Scene::from_config(sweep(10.0, 361.0)).is_err());
    }

    #[test]
    fn manual_requires_frames() {
        let config = SceneConfig::new("manual", SceneType::Manual);
        assert!(Scene::from_config(config).is_err());

        let config = SceneConfig {
            frames: Some(vec!["http://example.com/1.jpg".into()]),
            ..SceneConfig::new("manual", SceneType::Manual)
        };
        let scene = Scene::from_config(config).unwrap();
        assert_eq!(scene.frames(), ["http://example.com/1.jpg"]);
    }

    #[test]
    fn update_revalidates_and_resets_status() {
        let mut scene = Scene::from_config(auto_config()).unwrap();
        scene.set_status(SceneStatus::Generated);

        scene
            .update(SceneConfig {
                duration: Some(10.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(scene.status(), &SceneStatus::NeedsGeneration);
        assert_eq!(scene.revision(), 1);
        assert_eq!(scene.config().origin, Some("E2 7LF".into()));

        // switching type without the new type's fields fails and leaves the scene alone
        let err = scene.update(SceneConfig {
            kind: Some(SceneType::Manual),
            ..Default::default()
        });
        assert!(err.is_err());
        assert_eq!(scene.scene_type(), SceneType::Auto);
        assert_eq!(scene.revision(), 1);
    }

    #[test]
    fn frame_count_rounds_down() {
        assert_eq!(frame_count(12, 1.0), 12);
        assert_eq!(frame_count(12, 2.5), 30);
        assert_eq!(frame_count(12, 0.99), 11);
        assert_eq!(frame_count(0, 5.0), 0);
    }
}
