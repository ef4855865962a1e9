use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::api::{DirectionsService, Geocoder};
use crate::error::{AnimatorError, Result};
use crate::geo::HeadingCalculator;
use crate::scene::frame::{FrameUrlCompiler, Shot};
use crate::scene::heading::HeadingSequencer;
use crate::scene::resolver::CoordinateResolver;
use crate::scene::route::RouteSampler;
use crate::scene::{frame_count, Scene, SceneKind, SceneStatus};

/// Movie-wide values a generation pass compiles frames with.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub frame_rate: u32,
    pub compiler: FrameUrlCompiler,
}

/// Result of generating one scene within a movie pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneOutcome {
    pub scene_id: String,
    pub frames: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    pub scenes: Vec<SceneOutcome>,
}

impl GenerationReport {
    pub fn failures(&self) -> impl Iterator<Item = &SceneOutcome> {
        self.scenes.iter().filter(|outcome| outcome.error.is_some())
    }

    pub fn total_frames(&self) -> usize {
        self.scenes.iter().map(|outcome| outcome.frames).sum()
    }
}

/// Turns one scene into its list of frame URLs.
pub struct SceneGenerator {
    resolver: CoordinateResolver,
    sampler: RouteSampler,
    sequencer: HeadingSequencer,
}

impl SceneGenerator {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        directions: Arc<dyn DirectionsService>,
        heading: Arc<dyn HeadingCalculator>,
        timeout: Duration,
    ) -> Self {
        Self {
            resolver: CoordinateResolver::new(geocoder, timeout),
            sampler: RouteSampler::new(directions, timeout),
            sequencer: HeadingSequencer::new(heading),
        }
    }

    pub fn resolver(&self) -> &CoordinateResolver {
        &self.resolver
    }

    /// Drives `scene` through `NeedsGeneration -> Generating -> Generated`.
    ///
    /// On failure the scene ends up `Failed` with no frames and still counts
    /// as generated; the error is returned wrapped in
    /// [`AnimatorError::GenerationFailed`]. A cancelled scene goes back to
    /// `NeedsGeneration`. Already generated scenes are left alone.
    pub async fn generate(
        &self,
        scene: &mut Scene,
        settings: &RenderSettings,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if scene.is_generated() {
            debug!(scene_id = scene.id(), "Scene already generated");
            return Ok(());
        }

        scene.set_status(SceneStatus::Generating);
        let span = info_span!("scene", scene_id = %scene.id());
        let outcome = self.render(scene, settings, cancel).instrument(span).await;

        match outcome {
            Ok(frames) => {
                info!(scene_id = scene.id(), frames = frames.len(), "Scene generated");
                scene.set_frames(frames);
                scene.set_status(SceneStatus::Generated);
                Ok(())
            }
            Err(AnimatorError::Cancelled) => {
                scene.set_status(SceneStatus::NeedsGeneration);
                Err(AnimatorError::Cancelled)
            }
            Err(e) => {
                warn!(scene_id = scene.id(), error = %e, "Scene failed to generate");
                scene.set_frames(Vec::new());
                scene.set_status(SceneStatus::Failed(e.to_string()));
                Err(AnimatorError::generation_failed(scene.id(), e))
            }
        }
    }

    async fn render(
        &self,
        scene: &mut Scene,
        settings: &RenderSettings,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let pitch = scene.pitch();
        let fov = scene.fov();

        match scene.kind_mut() {
            SceneKind::Manual(manual) => Ok(manual.frames.clone()),

            SceneKind::Auto(auto) => {
                // one lookup at a time so a repeated address hits the cache
                let origin = self.resolver.resolve_in_place(&mut auto.origin, cancel).await?;
                let destination = self
                    .resolver
                    .resolve_in_place(&mut auto.destination, cancel)
                    .await?;
                let target = match auto.target.as_mut() {
                    Some(target) => Some(self.resolver.resolve_in_place(target, cancel).await?),
                    None => None,
                };

                let max_frames = frame_count(settings.frame_rate, auto.duration);
                let points = self
                    .sampler
                    .sample(origin, destination, auto.travel_mode, max_frames, cancel)
                    .await?;
                let headings = self.sequencer.headings(&points, target);

                Ok(settings.compiler.compile_all(
                    points.into_iter().zip(headings).map(|(location, heading)| Shot {
                        location,
                        heading,
                        pitch,
                        fov,
                    }),
                ))
            }

            SceneKind::Sweep(sweep) => {
                let origin = self.resolver.resolve_in_place(&mut sweep.origin, cancel).await?;
                if let Some(target) = sweep.target.as_mut() {
                    self.resolver.resolve_in_place(target, cancel).await?;
                }

                let count = frame_count(settings.frame_rate, sweep.duration);
                let headings = HeadingSequencer::sweep(sweep.start_heading, sweep.finish_heading, count);

                Ok(settings
                    .compiler
                    .compile_all(headings.into_iter().map(|heading| Shot {
                        location: origin,
                        heading,
                        pitch,
                        fov,
                    })))
            }
        }
    }
}
