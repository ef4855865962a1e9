use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::Result;

/// Where one scene sits in the concatenated frame list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSpan {
    pub scene_id: String,
    pub start_frame: usize,
    pub frame_count: usize,
}

impl SceneSpan {
    /// Index of the scene's last frame; `None` for scenes without frames.
    pub fn end_frame(&self) -> Option<usize> {
        (self.frame_count > 0).then(|| self.start_frame + self.frame_count - 1)
    }
}

/// Everything a playback engine needs: the ordered frames and their timing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reel {
    pub frame_rate: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frames: Vec<String>,
    pub scenes: Vec<SceneSpan>,
}

/// Playback engine seam. Rendering itself happens elsewhere.
#[async_trait]
pub trait Player: Send + Sync {
    async fn play(&self, reel: &Reel) -> Result<()>;

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

/// Writes the reel as a JSON manifest for an external player to pick up.
#[derive(Debug, Clone)]
pub struct ManifestPlayer {
    path: PathBuf,
}

impl ManifestPlayer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Player for ManifestPlayer {
    async fn play(&self, reel: &Reel) -> Result<()> {
        let manifest = serde_json::to_vec_pretty(reel)?;
        tokio::fs::write(&self.path, manifest).await?;
        info!(
            path = %self.path.display(),
            frames = reel.frames.len(),
            "Frame manifest written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_span_has_no_end_frame() {
        let span = SceneSpan {
            scene_id: "empty".into(),
            start_frame: 4,
            frame_count: 0,
        };
        assert_eq!(span.end_frame(), None);

        let span = SceneSpan {
            frame_count: 3,
            ..span
        };
        assert_eq!(span.end_frame(), Some(6));
    }

    #[tokio::test]
    async fn manifest_is_written_as_json() {
        let path = std::env::temp_dir().join(format!("sva-manifest-{}.json", std::process::id()));
        let reel = Reel {
            frame_rate: 12,
            frame_width: 600,
            frame_height: 338,
            frames: vec!["a.jpg".into(), "b.jpg".into()],
            scenes: vec![SceneSpan {
                scene_id: "scene-1".into(),
                start_frame: 0,
                frame_count: 2,
            }],
        };

        ManifestPlayer::new(&path).play(&reel).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["frameRate"], 12);
        assert_eq!(written["frames"][1], "b.jpg");
        assert_eq!(written["scenes"][0]["sceneId"], "scene-1");
        std::fs::remove_file(&path).ok();
    }
}
