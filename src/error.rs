use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnimatorError {
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Failed to geocode \"{address}\": {cause}")]
    GeocodeFailed { address: String, cause: String },

    #[error("Failed to get directions: {cause}")]
    RouteNotFound { cause: String },

    #[error("Invalid scene config [{scene_id}]: {reason}")]
    InvalidSceneConfig { scene_id: String, reason: String },

    #[error("Scene [{scene_id}] failed to generate: {source}")]
    GenerationFailed {
        scene_id: String,
        #[source]
        source: Box<AnimatorError>,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Generation already in progress")]
    GenerationInProgress,

    #[error("Unknown scene: {0}")]
    UnknownScene(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AnimatorError {
    pub fn invalid_scene(scene_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSceneConfig {
            scene_id: scene_id.into(),
            reason: reason.into(),
        }
    }

    pub fn generation_failed(scene_id: impl Into<String>, source: AnimatorError) -> Self {
        Self::GenerationFailed {
            scene_id: scene_id.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnimatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_failed_keeps_the_cause() {
        let err = AnimatorError::generation_failed(
            "scene-1",
            AnimatorError::RouteNotFound {
                cause: "ZERO_RESULTS".into(),
            },
        );
        let message = err.to_string();
        assert!(message.contains("scene-1"));
        assert!(message.contains("ZERO_RESULTS"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
