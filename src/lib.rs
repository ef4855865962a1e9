//! Turns declarative scene descriptions (routes between places, sweeps around
//! a point, or explicit frame lists) into an ordered list of Street View image
//! URLs that can be played back as an animation.

pub mod api;
pub mod config;
pub mod error;
pub mod geo;
pub mod scene;
pub mod video;

pub use api::{DirectionsService, Geocoder, GoogleMapsClient, Route, TravelMode};
pub use config::MovieConfig;
pub use error::{AnimatorError, Result};
pub use geo::{Coordinate, HeadingCalculator, Location, SphericalHeading};
pub use scene::{Scene, SceneConfig, SceneKind, SceneStatus, SceneType};
pub use video::events::{LogEvents, MovieEvents, NoEvents};
pub use video::generator::{GenerationReport, SceneGenerator, SceneOutcome};
pub use video::movie::{GenerateOutcome, Movie, MovieServices};
pub use video::player::{ManifestPlayer, Player, Reel, SceneSpan};
