use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{guarded, DirectionsService, TravelMode};
use crate::error::Result;
use crate::geo::Coordinate;

/// Samples the waypoints of a single route, bounded by a frame budget.
pub struct RouteSampler {
    directions: Arc<dyn DirectionsService>,
    timeout: Duration,
}

impl RouteSampler {
    pub fn new(directions: Arc<dyn DirectionsService>, timeout: Duration) -> Self {
        Self { directions, timeout }
    }

    /// Returns at most `max_frames` waypoints in traversal order. Short
    /// routes are returned as-is, never padded.
    pub async fn sample(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        travel_mode: TravelMode,
        max_frames: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Coordinate>> {
        let route = guarded(
            "directions",
            self.timeout,
            cancel,
            self.directions.route(origin, destination, travel_mode),
        )
        .await?;

        let points: Vec<Coordinate> = route.waypoints().take(max_frames).collect();
        debug!(
            sampled = points.len(),
            max_frames, "Sampled route waypoints"
        );
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Route;
    use crate::error::AnimatorError;
    use async_trait::async_trait;

    struct FixedRoute(Vec<Coordinate>);

    #[async_trait]
    impl DirectionsService for FixedRoute {
        async fn route(&self, _: Coordinate, _: Coordinate, _: TravelMode) -> Result<Route> {
            Ok(Route::from_points(self.0.clone()))
        }
    }

    struct NoRoute;

    #[async_trait]
    impl DirectionsService for NoRoute {
        async fn route(&self, _: Coordinate, _: Coordinate, _: TravelMode) -> Result<Route> {
            Err(AnimatorError::RouteNotFound {
                cause: "received status \"ZERO_RESULTS\"".to_string(),
            })
        }
    }

    fn line(n: usize) -> Vec<Coordinate> {
        (0..n).map(|i| Coordinate::new(i as f64 * 0.001, 0.0)).collect()
    }

    async fn sample(directions: Arc<dyn DirectionsService>, max_frames: usize) -> Result<Vec<Coordinate>> {
        RouteSampler::new(directions, Duration::from_secs(5))
            .sample(
                Coordinate::new(0.0, 0.0),
                Coordinate::new(1.0, 0.0),
                TravelMode::Driving,
                max_frames,
                &CancellationToken::new(),
            )
            .await
    }

    #[tokio::test]
    async fn short_route_is_not_padded() {
        let points = sample(Arc::new(FixedRoute(line(3))), 12).await.unwrap();
        assert_eq!(points, line(3));
    }

    #[tokio::test]
    async fn long_route_is_truncated() {
        let points = sample(Arc::new(FixedRoute(line(40))), 12).await.unwrap();
        assert_eq!(points, line(12));
    }

    #[tokio::test]
    async fn missing_route_is_reported() {
        let err = sample(Arc::new(NoRoute), 12).await.unwrap_err();
        assert!(matches!(err, AnimatorError::RouteNotFound { .. }));
    }
}
