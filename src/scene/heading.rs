use std::sync::Arc;

use crate::geo::{Coordinate, HeadingCalculator};

/// Picks the camera heading for every frame of a scene.
pub struct HeadingSequencer {
    calculator: Arc<dyn HeadingCalculator>,
}

impl HeadingSequencer {
    pub fn new(calculator: Arc<dyn HeadingCalculator>) -> Self {
        Self { calculator }
    }

    /// One heading per point. With a `target` every frame looks at it;
    /// otherwise each frame looks at the next point and the last frame keeps
    /// the previous heading. A lone point with no target faces north (0).
    pub fn headings(&self, points: &[Coordinate], target: Option<Coordinate>) -> Vec<f64> {
        let mut headings: Vec<f64> = Vec::with_capacity(points.len());

        for (i, point) in points.iter().enumerate() {
            let heading = match (target, points.get(i + 1)) {
                (Some(target), _) => self.calculator.heading(*point, target),
                (None, Some(next)) => self.calculator.heading(*point, *next),
                (None, None) => headings.last().copied().unwrap_or(0.0),
            };
            headings.push(heading);
        }

        headings
    }

    /// `frame_count` headings from `start` towards `finish` in steps of
    /// `ceil((finish - start) / frame_count)`. When the step rounds up the
    /// tail runs past `finish`; the imagery provider wraps headings mod 360.
    pub fn sweep(start: f64, finish: f64, frame_count: usize) -> Vec<f64> {
        if frame_count == 0 {
            return Vec::new();
        }

        let step = ((finish - start) / frame_count as f64).ceil();
        (0..frame_count)
            .map(|i| start + i as f64 * step)
            .collect()
    }
}
