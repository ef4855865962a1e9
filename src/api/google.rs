use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{DirectionsService, Geocoder, Leg, Route, Step, TravelMode};
use crate::error::{AnimatorError, Result};
use crate::geo::Coordinate;

const GEOCODE_API: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DIRECTIONS_API: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Geocoding and Directions over the Google Maps web services.
#[derive(Debug, Clone)]
pub struct GoogleMapsClient {
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl From<LatLng> for Coordinate {
    fn from(p: LatLng) -> Self {
        Coordinate::new(p.lat, p.lng)
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    #[serde(default)]
    steps: Vec<DirectionsStep>,
}

#[derive(Debug, Deserialize)]
struct DirectionsStep {
    start_location: LatLng,
    end_location: LatLng,
    polyline: Option<Polyline>,
}

#[derive(Debug, Deserialize)]
struct Polyline {
    points: String,
}

impl GoogleMapsClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl Geocoder for GoogleMapsClient {
    async fn geocode(&self, address: &str) -> Result<Coordinate> {
        info!(address, "Geocoding address");

        let response = self
            .client
            .get(GEOCODE_API)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AnimatorError::GeocodeFailed {
                address: address.to_string(),
                cause: format!("HTTP {}: {}", status, error_text),
            });
        }

        let body: GeocodeResponse = response.json().await?;
        let coordinate = parse_geocode(address, body)?;
        debug!(address, lat = coordinate.lat, lng = coordinate.lng, "Geocoded address");
        Ok(coordinate)
    }
}

#[async_trait]
impl DirectionsService for GoogleMapsClient {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        travel_mode: TravelMode,
    ) -> Result<Route> {
        info!(%origin, %destination, mode = %travel_mode, "Requesting directions");

        let response = self
            .client
            .get(DIRECTIONS_API)
            .query(&[
                ("origin", origin.to_string().as_str()),
                ("destination", destination.to_string().as_str()),
                ("mode", travel_mode.as_query()),
                ("alternatives", "false"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AnimatorError::RouteNotFound {
                cause: format!("HTTP {}: {}", status, error_text),
            });
        }

        let body: DirectionsResponse = response.json().await?;
        parse_directions(body)
    }
}

fn parse_geocode(address: &str, body: GeocodeResponse) -> Result<Coordinate> {
    if body.status != "OK" {
        warn!(address, status = %body.status, "Address could not be geocoded");
        return Err(AnimatorError::GeocodeFailed {
            address: address.to_string(),
            cause: describe_status(&body.status, body.error_message.as_deref()),
        });
    }

    body.results
        .first()
        .map(|result| result.geometry.location.into())
        .ok_or_else(|| AnimatorError::GeocodeFailed {
            address: address.to_string(),
            cause: "no results".to_string(),
        })
}

fn parse_directions(body: DirectionsResponse) -> Result<Route> {
    if body.status != "OK" {
        warn!(status = %body.status, "Directions failed");
        return Err(AnimatorError::RouteNotFound {
            cause: describe_status(&body.status, body.error_message.as_deref()),
        });
    }

    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| AnimatorError::RouteNotFound {
            cause: "no routes in response".to_string(),
        })?;

    let mut legs = Vec::with_capacity(route.legs.len());
    for leg in route.legs {
        let mut steps = Vec::with_capacity(leg.steps.len());
        for step in leg.steps {
            let path = match step.polyline {
                Some(polyline) if !polyline.points.is_empty() => decode_polyline(&polyline.points)?,
                _ => vec![step.start_location.into(), step.end_location.into()],
            };
            steps.push(Step { path });
        }
        legs.push(Leg { steps });
    }

    Ok(Route { legs })
}

fn describe_status(status: &str, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("received status \"{}\": {}", status, message),
        None => format!("received status \"{}\"", status),
    }
}

/// Decodes an encoded polyline (precision 1e5) into coordinates.
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        lat = lat.wrapping_add(next_polyline_value(bytes, &mut index)?);
        lng = lng.wrapping_add(next_polyline_value(bytes, &mut index)?);
        points.push(Coordinate::new(lat as f64 / 1e5, lng as f64 / 1e5));
    }

    Ok(points)
}

fn next_polyline_value(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let malformed = || AnimatorError::RouteNotFound {
        cause: "malformed polyline".to_string(),
    };

    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let byte = *bytes.get(*index).ok_or_else(malformed)?;
        *index += 1;
        if byte < 63 || shift > 60 {
            return Err(malformed());
        }
        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Coordinate, lat: f64, lng: f64) -> bool {
        (a.lat - lat).abs() < 1e-9 && (a.lng - lng).abs() < 1e-9
    }

    #[test]
    fn decodes_reference_polyline() {
        let points = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        assert_eq!(points.len(), 3);
        assert!(close(points[0], 38.5, -120.2));
        assert!(close(points[1], 40.7, -120.95));
        assert!(close(points[2], 43.252, -126.453));
    }

    #[test]
    fn truncated_polyline_is_rejected() {
        assert!(decode_polyline("_p~iF").is_err());
    }

    #[test]
    fn geocode_ok_takes_first_result() {
        let body: GeocodeResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [
                    {"geometry": {"location": {"lat": 51.52, "lng": -0.05}}},
                    {"geometry": {"location": {"lat": 0, "lng": 0}}}
                ]
            }"#,
        )
        .unwrap();
        let coordinate = parse_geocode("E2 7LF", body).unwrap();
        assert_eq!(coordinate, Coordinate::new(51.52, -0.05));
    }

    #[test]
    fn geocode_zero_results_is_geocode_failed() {
        let body: GeocodeResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap();
        match parse_geocode("nowhere", body) {
            Err(AnimatorError::GeocodeFailed { address, cause }) => {
                assert_eq!(address, "nowhere");
                assert!(cause.contains("ZERO_RESULTS"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn directions_flatten_legs_and_steps() {
        let body: DirectionsResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "routes": [{
                    "legs": [{
                        "steps": [
                            {
                                "start_location": {"lat": 38.5, "lng": -120.2},
                                "end_location": {"lat": 43.252, "lng": -126.453},
                                "polyline": {"points": "_p~iF~ps|U_ulLnnqC_mqNvxq`@"}
                            },
                            {
                                "start_location": {"lat": 1, "lng": 2},
                                "end_location": {"lat": 3, "lng": 4}
                            }
                        ]
                    }]
                }]
            }"#,
        )
        .unwrap();

        let route = parse_directions(body).unwrap();
        let points: Vec<_> = route.waypoints().collect();
        assert_eq!(points.len(), 5);
        assert!(close(points[0], 38.5, -120.2));
        assert_eq!(points[3], Coordinate::new(1.0, 2.0));
        assert_eq!(points[4], Coordinate::new(3.0, 4.0));
    }

    #[test]
    fn directions_not_ok_is_route_not_found() {
        let body: DirectionsResponse = serde_json::from_str(
            r#"{"status": "NOT_FOUND", "routes": [], "error_message": "bad origin"}"#,
        )
        .unwrap();
        match parse_directions(body) {
            Err(AnimatorError::RouteNotFound { cause }) => {
                assert!(cause.contains("NOT_FOUND"));
                assert!(cause.contains("bad origin"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
