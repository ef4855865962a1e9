mod google;

pub use google::{decode_polyline, GoogleMapsClient};

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{AnimatorError, Result};
use crate::geo::Coordinate;

/// Resolves a free-text address to a coordinate.
///
/// Implementations report "no match" as [`crate::AnimatorError::GeocodeFailed`].
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinate>;
}

/// Resolves an origin/destination pair into a single route.
///
/// Any non-OK status is reported as [`crate::AnimatorError::RouteNotFound`].
#[async_trait]
pub trait DirectionsService: Send + Sync {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        travel_mode: TravelMode,
    ) -> Result<Route>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TravelMode {
    /// Value of the `mode` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Transit => "transit",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

/// An ordered route: legs, each made of steps, each made of waypoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub legs: Vec<Leg>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leg {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    pub path: Vec<Coordinate>,
}

impl Route {
    /// Single-leg, single-step route over `points`.
    pub fn from_points(points: Vec<Coordinate>) -> Self {
        Self {
            legs: vec![Leg {
                steps: vec![Step { path: points }],
            }],
        }
    }

    /// All waypoints in traversal order.
    pub fn waypoints(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.legs
            .iter()
            .flat_map(|leg| leg.steps.iter())
            .flat_map(|step| step.path.iter().copied())
    }
}

/// Runs one collaborator call under a deadline, giving up early if `cancel`
/// fires first.
pub(crate) async fn guarded<T, F>(
    operation: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    call: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AnimatorError::Cancelled),
        outcome = tokio::time::timeout(timeout, call) => match outcome {
            Ok(result) => result,
            Err(_) => Err(AnimatorError::Timeout {
                operation: operation.to_string(),
                after: timeout,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waypoints_preserve_traversal_order() {
        let c = |n: f64| Coordinate::new(n, n);
        let route = Route {
            legs: vec![
                Leg {
                    steps: vec![
                        Step { path: vec![c(1.0), c(2.0)] },
                        Step { path: vec![c(3.0)] },
                    ],
                },
                Leg {
                    steps: vec![Step { path: vec![c(4.0), c(5.0)] }],
                },
            ],
        };
        let points: Vec<_> = route.waypoints().map(|p| p.lat).collect();
        assert_eq!(points, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn guarded_times_out() {
        let cancel = CancellationToken::new();
        let outcome: Result<()> = guarded("geocode", Duration::from_secs(5), &cancel, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(outcome, Err(AnimatorError::Timeout { .. })));
    }

    #[tokio::test]
    async fn guarded_honours_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome: Result<u8> =
            guarded("directions", Duration::from_secs(5), &cancel, async { Ok(1) }).await;
        assert!(matches!(outcome, Err(AnimatorError::Cancelled)));
    }
}
