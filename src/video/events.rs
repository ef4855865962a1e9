use tracing::info;

use super::generator::GenerationReport;
use crate::scene::Scene;

/// Lifecycle hooks a movie fires. Every hook defaults to a no-op.
///
/// Hooks run after the movie has released its internal lock, so they may
/// call back into the movie.
pub trait MovieEvents: Send + Sync {
    fn on_ready(&self) {}

    fn on_scene_create(&self, _scene: &Scene) {}

    fn on_scene_update(&self, _scene: &Scene) {}

    fn on_generate_start(&self) {}

    fn on_generate_end(&self, _report: &GenerationReport) {}

    fn on_reset(&self) {}

    fn on_enter_scene(&self, _scene_id: &str) {}

    fn on_exit_scene(&self, _scene_id: &str) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

impl MovieEvents for NoEvents {}

/// Reports every hook through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEvents;

impl MovieEvents for LogEvents {
    fn on_ready(&self) {
        info!("Movie ready");
    }

    fn on_scene_create(&self, scene: &Scene) {
        info!(scene_id = scene.id(), kind = ?scene.scene_type(), "Scene created");
    }

    fn on_scene_update(&self, scene: &Scene) {
        info!(scene_id = scene.id(), "Scene updated");
    }

    fn on_generate_start(&self) {
        info!("Generation started");
    }

    fn on_generate_end(&self, report: &GenerationReport) {
        info!(
            scenes = report.scenes.len(),
            failed = report.failures().count(),
            frames = report.total_frames(),
            "Generation finished"
        );
    }

    fn on_reset(&self) {
        info!("Movie reset");
    }

    fn on_enter_scene(&self, scene_id: &str) {
        info!(scene_id, "Entering scene");
    }

    fn on_exit_scene(&self, scene_id: &str) {
        info!(scene_id, "Exiting scene");
    }
}
