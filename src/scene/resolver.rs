use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::{guarded, Geocoder};
use crate::error::Result;
use crate::geo::{Coordinate, Location};

/// Turns any [`Location`] into a validated [`Coordinate`], geocoding free
/// text at most once per distinct address.
pub struct CoordinateResolver {
    geocoder: Arc<dyn Geocoder>,
    cache: Mutex<HashMap<String, Coordinate>>,
    timeout: Duration,
}

impl CoordinateResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, timeout: Duration) -> Self {
        Self {
            geocoder,
            cache: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub async fn resolve(&self, location: &Location, cancel: &CancellationToken) -> Result<Coordinate> {
        match location {
            Location::Coordinate(coordinate) => coordinate.validate(),
            Location::Text(text) => {
                if let Some(coordinate) = Coordinate::parse_literal(text) {
                    return coordinate.validate();
                }
                self.geocode(text, cancel).await
            }
        }
    }

    /// Resolves `location` in place, leaving it in coordinate form.
    pub async fn resolve_in_place(
        &self,
        location: &mut Location,
        cancel: &CancellationToken,
    ) -> Result<Coordinate> {
        let coordinate = self.resolve(location, cancel).await?;
        *location = Location::Coordinate(coordinate);
        Ok(coordinate)
    }

    async fn geocode(&self, address: &str, cancel: &CancellationToken) -> Result<Coordinate> {
        if let Some(hit) = self.cached(address) {
            debug!(address, "Geocode cache hit");
            return Ok(hit);
        }

        let coordinate = guarded(
            "geocode",
            self.timeout,
            cancel,
            self.geocoder.geocode(address),
        )
        .await?
        .validate()?;

        info!(address, lat = coordinate.lat, lng = coordinate.lng, "Resolved address");
        self.cache.lock().insert(address.to_string(), coordinate);
        Ok(coordinate)
    }

    pub fn cached(&self, address: &str) -> Option<Coordinate> {
        self.cache.lock().get(address).copied()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}
