use tracing::warn;

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Camera pose for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub location: Coordinate,
    pub heading: f64,
    pub pitch: f64,
    pub fov: Option<f64>,
}

/// Formats image-provider URLs for a fixed endpoint, frame size and API key.
#[derive(Debug, Clone)]
pub struct FrameUrlCompiler {
    base_url: String,
    size: FrameSize,
    api_key: String,
}

impl FrameUrlCompiler {
    pub fn new(base_url: impl Into<String>, size: FrameSize, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            size,
            api_key: api_key.into(),
        }
    }

    /// Never fails: missing inputs are logged and the URL is still emitted,
    /// the image request will simply fail downstream.
    pub fn compile(&self, shot: Shot) -> String {
        if self.api_key.is_empty() {
            warn!("No API key set, image requests will be rejected");
        }
        if self.size.width == 0 || self.size.height == 0 {
            warn!(width = self.size.width, height = self.size.height, "Frame size is empty");
        }

        let mut url = format!(
            "{}?size={}x{}&location={},{}&heading={}&pitch={}&sensor=false&key={}",
            self.base_url,
            self.size.width,
            self.size.height,
            shot.location.lat,
            shot.location.lng,
            shot.heading,
            shot.pitch,
            self.api_key,
        );
        if let Some(fov) = shot.fov {
            url.push_str(&format!("&fov={}", fov));
        }
        url
    }

    pub fn compile_all(&self, shots: impl IntoIterator<Item = Shot>) -> Vec<String> {
        shots.into_iter().map(|shot| self.compile(shot)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://maps.googleapis.com/maps/api/streetview";

    fn shot(fov: Option<f64>) -> Shot {
        Shot {
            location: Coordinate::new(51.5, -0.1),
            heading: 90.0,
            pitch: 0.0,
            fov,
        }
    }

    #[test]
    fn url_layout_is_stable() {
        let compiler = FrameUrlCompiler::new(BASE, FrameSize { width: 600, height: 338 }, "KEY");
        assert_eq!(
            compiler.compile(shot(None)),
            "https://maps.googleapis.com/maps/api/streetview?size=600x338&location=51.5,-0.1&heading=90&pitch=0&sensor=false&key=KEY"
        );
    }

    #[test]
    fn fov_is_appended_only_when_set() {
        let compiler = FrameUrlCompiler::new(BASE, FrameSize { width: 600, height: 338 }, "KEY");
        assert!(compiler.compile(shot(Some(75.0))).ends_with("&key=KEY&fov=75"));
    }

    #[test]
    fn missing_key_still_produces_a_url() {
        let compiler = FrameUrlCompiler::new(BASE, FrameSize { width: 600, height: 338 }, "");
        assert!(compiler.compile(shot(None)).ends_with("&sensor=false&key="));
    }
}
