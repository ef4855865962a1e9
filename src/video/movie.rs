use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::{MovieEvents, NoEvents};
use super::generator::{GenerationReport, RenderSettings, SceneGenerator, SceneOutcome};
use super::player::{Player, Reel, SceneSpan};
use crate::api::{DirectionsService, Geocoder};
use crate::config::MovieConfig;
use crate::error::{AnimatorError, Result};
use crate::geo::{HeadingCalculator, SphericalHeading};
use crate::scene::frame::FrameUrlCompiler;
use crate::scene::{Scene, SceneConfig, SceneStatus};

/// External collaborators a movie talks to.
pub struct MovieServices {
    pub geocoder: Arc<dyn Geocoder>,
    pub directions: Arc<dyn DirectionsService>,
    pub heading: Arc<dyn HeadingCalculator>,
    pub player: Arc<dyn Player>,
    pub events: Arc<dyn MovieEvents>,
}

impl MovieServices {
    /// Spherical bearings and no event hooks.
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        directions: Arc<dyn DirectionsService>,
        player: Arc<dyn Player>,
    ) -> Self {
        Self {
            geocoder,
            directions,
            heading: Arc::new(SphericalHeading),
            player,
            events: Arc::new(NoEvents),
        }
    }

    pub fn with_heading(mut self, heading: Arc<dyn HeadingCalculator>) -> Self {
        self.heading = heading;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn MovieEvents>) -> Self {
        self.events = events;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerateOutcome {
    /// A pass ran over every scene that needed it.
    Completed(GenerationReport),
    /// Nothing needed generating.
    AlreadyGenerated,
    /// Another pass is in flight; this call did nothing.
    InProgress,
    /// The pass was cancelled before finishing.
    Cancelled,
}

struct MovieState {
    config: MovieConfig,
    scenes: IndexMap<String, Scene>,
    spans: Vec<SceneSpan>,
    generated: bool,
    /// Bumped by `reset`, so scenes claimed before it are never written back.
    epoch: u64,
}

/// A scene copy handed to a generation pass, with what it was claimed at.
struct Claim {
    scene: Scene,
    revision: u64,
    epoch: u64,
}

/// An ordered set of scenes played back as one animation.
///
/// Generation is sequential: one scene at a time, one external request at a
/// time. Only one generation pass may run per movie.
pub struct Movie {
    state: Mutex<MovieState>,
    generator: SceneGenerator,
    player: Arc<dyn Player>,
    events: Arc<dyn MovieEvents>,
    is_generating: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

/// Clears the generation flag when a pass ends, however it ends.
struct GeneratingGuard<'a>(&'a AtomicBool);

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Movie {
    /// Builds the movie and its initial scenes. Any invalid scene aborts
    /// construction.
    pub fn new(mut config: MovieConfig, services: MovieServices) -> Result<Self> {
        config.validate()?;
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            warn!("No API key configured, compiled frames will not load");
        }

        let initial = std::mem::take(&mut config.scenes);
        let generator = SceneGenerator::new(
            services.geocoder,
            services.directions,
            services.heading,
            config.request_timeout(),
        );

        let movie = Self {
            state: Mutex::new(MovieState {
                config,
                scenes: IndexMap::new(),
                spans: Vec::new(),
                generated: false,
                epoch: 0,
            }),
            generator,
            player: services.player,
            events: services.events,
            is_generating: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        };

        for scene in initial {
            movie.upsert_scene(scene)?;
        }

        info!(scenes = movie.num_scenes(), "Movie constructed");
        movie.events.on_ready();
        Ok(movie)
    }

    /// Creates the scene if its id is new, otherwise applies `config` as a
    /// partial update. Either way the movie needs generating again.
    pub fn upsert_scene(&self, config: SceneConfig) -> Result<()> {
        let id = config.id.trim().to_string();
        let mut state = self.state.lock();

        if let Some(existing) = state.scenes.get_mut(&id) {
            existing.update(config)?;
            let snapshot = existing.clone();
            state.generated = false;
            drop(state);

            debug!(scene_id = %id, "Updated scene");
            self.events.on_scene_update(&snapshot);
        } else {
            let scene = Scene::from_config(config)?;
            let snapshot = scene.clone();
            state.scenes.insert(id.clone(), scene);
            state.generated = false;
            drop(state);

            debug!(scene_id = %id, "Created scene");
            self.events.on_scene_create(&snapshot);
        }
        Ok(())
    }

    /// Partial update of an existing scene.
    pub fn update_scene(&self, id: &str, mut patch: SceneConfig) -> Result<()> {
        if !self.state.lock().scenes.contains_key(id) {
            return Err(AnimatorError::UnknownScene(id.to_string()));
        }
        patch.id = id.to_string();
        self.upsert_scene(patch)
    }

    pub fn scene(&self, id: &str) -> Option<Scene> {
        self.state.lock().scenes.get(id).cloned()
    }

    pub fn scene_ids(&self) -> Vec<String> {
        self.state.lock().scenes.keys().cloned().collect()
    }

    pub fn num_scenes(&self) -> usize {
        self.state.lock().scenes.len()
    }

    pub fn num_frames(&self) -> usize {
        self.state.lock().scenes.values().map(Scene::num_frames).sum()
    }

    /// Every scene's frames, in playback order.
    pub fn frames(&self) -> Vec<String> {
        self.state
            .lock()
            .scenes
            .values()
            .flat_map(|scene| scene.frames().iter().cloned())
            .collect()
    }

    pub fn is_generating(&self) -> bool {
        self.is_generating.load(Ordering::SeqCst)
    }

    pub fn requires_generation(&self) -> bool {
        !self.state.lock().generated
    }

    pub fn set_frame_rate(&self, frame_rate: u32) -> Result<()> {
        self.reconfigure(|config| config.frame_rate = frame_rate)
    }

    pub fn set_frame_size(&self, width: u32, height: u32) -> Result<()> {
        self.reconfigure(|config| {
            config.frame_width = width;
            config.frame_height = height;
        })
    }

    pub fn set_api_key(&self, api_key: impl Into<String>) -> Result<()> {
        let api_key = api_key.into();
        self.reconfigure(|config| config.api_key = Some(api_key))
    }

    /// Frames embed the frame rate, size and key, so any change to them
    /// marks every scene stale.
    fn reconfigure(&self, change: impl FnOnce(&mut MovieConfig)) -> Result<()> {
        let mut state = self.state.lock();
        let mut config = state.config.clone();
        change(&mut config);
        config.validate()?;

        info!(
            frame_rate = config.frame_rate,
            width = config.frame_width,
            height = config.frame_height,
            "Movie settings changed"
        );
        state.config = config;
        state.generated = false;
        for scene in state.scenes.values_mut() {
            scene.invalidate();
        }
        Ok(())
    }

    fn render_settings(&self) -> RenderSettings {
        let state = self.state.lock();
        let config = &state.config;
        RenderSettings {
            frame_rate: config.frame_rate,
            compiler: FrameUrlCompiler::new(
                config.streetview_url.clone(),
                config.frame_size(),
                config.api_key.clone().unwrap_or_default(),
            ),
        }
    }

    /// Generates every scene that needs it, one at a time in playback order.
    ///
    /// A failing scene is logged and recorded in the report; the pass moves
    /// on to the next scene. A second call while a pass is running returns
    /// [`GenerateOutcome::InProgress`] straight away.
    pub async fn generate(&self) -> Result<GenerateOutcome> {
        if self
            .is_generating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Generation in progress, ignoring call");
            return Ok(GenerateOutcome::InProgress);
        }
        let _guard = GeneratingGuard(&self.is_generating);

        if !self.requires_generation() {
            debug!("Movie is already generated");
            return Ok(GenerateOutcome::AlreadyGenerated);
        }

        info!("Beginning scene generation");
        self.events.on_generate_start();

        let cancel = {
            let mut slot = self.cancel.lock();
            if slot.is_cancelled() {
                *slot = CancellationToken::new();
            }
            slot.clone()
        };
        let mut report = GenerationReport::default();

        if self.num_scenes() == 0 {
            warn!("No scenes are present in the movie");
        }

        loop {
            if cancel.is_cancelled() {
                info!("Generation cancelled");
                return Ok(GenerateOutcome::Cancelled);
            }

            let Some(claim) = self.claim_next_scene() else {
                break;
            };
            let Claim {
                mut scene,
                revision,
                epoch,
            } = claim;
            let settings = self.render_settings();

            let result = self.generator.generate(&mut scene, &settings, &cancel).await;
            self.store_generated(&scene, revision, epoch);

            match result {
                Ok(()) => report.scenes.push(SceneOutcome {
                    scene_id: scene.id().to_string(),
                    frames: scene.num_frames(),
                    error: None,
                }),
                Err(AnimatorError::Cancelled) => {
                    info!(scene_id = scene.id(), "Generation cancelled");
                    return Ok(GenerateOutcome::Cancelled);
                }
                Err(e) => {
                    warn!(error = %e, "Continuing after scene failure");
                    report.scenes.push(SceneOutcome {
                        scene_id: scene.id().to_string(),
                        frames: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        info!(
            scenes = report.scenes.len(),
            frames = report.total_frames(),
            "Completed movie generation"
        );
        self.events.on_generate_end(&report);
        Ok(GenerateOutcome::Completed(report))
    }

    /// Marks the first scene needing generation as in flight and hands out a
    /// copy to work on. When none is left the movie is marked generated under
    /// the same lock, so a scene added concurrently is never missed.
    fn claim_next_scene(&self) -> Option<Claim> {
        let mut state = self.state.lock();
        let epoch = state.epoch;
        let Some(scene) = state
            .scenes
            .values_mut()
            .find(|scene| scene.requires_generation())
        else {
            state.generated = true;
            return None;
        };
        let snapshot = scene.clone();
        scene.set_status(SceneStatus::Generating);
        Some(Claim {
            revision: snapshot.revision(),
            scene: snapshot,
            epoch,
        })
    }

    /// Writes a generated copy back unless the movie was reset, or the scene
    /// updated or removed, in the meantime.
    fn store_generated(&self, scene: &Scene, revision: u64, epoch: u64) {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            debug!(scene_id = scene.id(), "Movie reset during generation");
            return;
        }
        match state.scenes.get_mut(scene.id()) {
            Some(stored) if stored.revision() == revision => *stored = scene.clone(),
            Some(_) => debug!(scene_id = scene.id(), "Scene changed during generation"),
            None => debug!(scene_id = scene.id(), "Scene removed during generation"),
        }
    }

    /// Generates if needed, then hands the concatenated frames to the player
    /// and records where each scene starts and ends.
    pub async fn play(&self) -> Result<Reel> {
        if self.requires_generation() {
            info!("Movie requires generation prior to playback");
            match self.generate().await? {
                GenerateOutcome::InProgress => return Err(AnimatorError::GenerationInProgress),
                GenerateOutcome::Cancelled => return Err(AnimatorError::Cancelled),
                GenerateOutcome::Completed(_) | GenerateOutcome::AlreadyGenerated => {}
            }
        }

        let reel = {
            let mut state = self.state.lock();
            let mut frames = Vec::new();
            let mut spans = Vec::with_capacity(state.scenes.len());

            for scene in state.scenes.values() {
                spans.push(SceneSpan {
                    scene_id: scene.id().to_string(),
                    start_frame: frames.len(),
                    frame_count: scene.num_frames(),
                });
                frames.extend(scene.frames().iter().cloned());
            }
            state.spans = spans.clone();

            Reel {
                frame_rate: state.config.frame_rate,
                frame_width: state.config.frame_width,
                frame_height: state.config.frame_height,
                frames,
                scenes: spans,
            }
        };

        info!(frames = reel.frames.len(), "Beginning playback");
        self.player.play(&reel).await?;
        Ok(reel)
    }

    pub async fn stop(&self) -> Result<()> {
        self.player.stop().await
    }

    /// Called by the playback engine as it enters frame `frame`; fires the
    /// enter-scene hook when that frame opens a scene.
    pub fn enter_frame(&self, frame: usize) -> Option<String> {
        let scene_id = self
            .state
            .lock()
            .spans
            .iter()
            .find(|span| span.frame_count > 0 && span.start_frame == frame)
            .map(|span| span.scene_id.clone())?;

        debug!(scene_id = %scene_id, frame, "Entering scene");
        self.events.on_enter_scene(&scene_id);
        Some(scene_id)
    }

    /// Called by the playback engine as it leaves frame `frame`; fires the
    /// exit-scene hook when that frame closes a scene.
    pub fn exit_frame(&self, frame: usize) -> Option<String> {
        let scene_id = self
            .state
            .lock()
            .spans
            .iter()
            .find(|span| span.end_frame() == Some(frame))
            .map(|span| span.scene_id.clone())?;

        debug!(scene_id = %scene_id, frame, "Exiting scene");
        self.events.on_exit_scene(&scene_id);
        Some(scene_id)
    }

    /// Cancels the generation pass in flight, if any. The next pass starts
    /// with a fresh token.
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
    }

    /// Drops every scene, scene boundary and cached geocode, and cancels any
    /// running pass. Settings are kept.
    pub fn reset(&self) {
        info!("Resetting");
        self.cancel();
        {
            let mut state = self.state.lock();
            state.scenes.clear();
            state.spans.clear();
            state.generated = false;
            state.epoch += 1;
        }
        self.generator.resolver().clear_cache();
        self.events.on_reset();
    }
}
