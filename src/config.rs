use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AnimatorError, Result};
use crate::scene::frame::FrameSize;
use crate::scene::SceneConfig;

pub const DEFAULT_STREETVIEW_URL: &str = "https://maps.googleapis.com/maps/api/streetview";

/// Movie configuration, as read from a JSON movie file.
///
/// | Field                | Env override               | Default          |
/// |----------------------|----------------------------|------------------|
/// | `frameRate`          | `SVA_FRAME_RATE`           | `12`             |
/// | `frameWidth`         | `SVA_FRAME_WIDTH`          | `600`            |
/// | `frameHeight`        | `SVA_FRAME_HEIGHT`         | `338`            |
/// | `apiKey`             | `GOOGLE_MAPS_API_KEY`      | none             |
/// | `streetviewUrl`      |                            | Google endpoint  |
/// | `requestTimeoutSecs` | `SVA_REQUEST_TIMEOUT_SECS` | `30`             |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MovieConfig {
    pub frame_rate: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub api_key: Option<String>,
    pub streetview_url: String,
    pub request_timeout_secs: u64,
    pub scenes: Vec<SceneConfig>,
}

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            frame_rate: 12,
            frame_width: 600,
            frame_height: 338,
            api_key: None,
            streetview_url: DEFAULT_STREETVIEW_URL.to_string(),
            request_timeout_secs: 30,
            scenes: Vec::new(),
        }
    }
}

impl MovieConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup("GOOGLE_MAPS_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(value) = lookup("SVA_FRAME_RATE") {
            self.frame_rate = parse_var("SVA_FRAME_RATE", &value)?;
        }
        if let Some(value) = lookup("SVA_FRAME_WIDTH") {
            self.frame_width = parse_var("SVA_FRAME_WIDTH", &value)?;
        }
        if let Some(value) = lookup("SVA_FRAME_HEIGHT") {
            self.frame_height = parse_var("SVA_FRAME_HEIGHT", &value)?;
        }
        if let Some(value) = lookup("SVA_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_var("SVA_REQUEST_TIMEOUT_SECS", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            return Err(AnimatorError::Config("frame rate must be at least 1".into()));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(AnimatorError::Config(format!(
                "frame size {}x{} is empty",
                self.frame_width, self.frame_height
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(AnimatorError::Config("request timeout must be at least 1s".into()));
        }
        Ok(())
    }

    pub fn frame_size(&self) -> FrameSize {
        FrameSize {
            width: self.frame_width,
            height: self.frame_height,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AnimatorError::Config(format!("{} must be a positive integer, got {:?}", name, value)))
}
