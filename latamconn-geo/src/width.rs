use crate::arc::Point;
use serde::{Deserialize, Serialize};

/// Gaussian linewidth profile: thin at the endpoints, thick in the middle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidthProfile {
    pub base_width: f64,
    pub max_width: f64,
    pub sigma: f64,
}

impl Default for WidthProfile {
    fn default() -> Self {
        Self {
            base_width: 0.05,
            max_width: 1.0,
            sigma: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidthSegment {
    pub start: Point,
    pub end: Point,
    pub width: f64,
}

impl WidthProfile {
    /// Width at normalized position `t` for a single connection.
    pub fn width_at(&self, t: f64) -> f64 {
        let bump = (-((t - 0.5).powi(2)) / (2.0 * self.sigma.powi(2))).exp();
        self.base_width + (self.max_width - self.base_width) * bump
    }

    /// Split a polyline into consecutive segments, each carrying the width at
    /// its midpoint position `(i + 0.5) / (n - 1)` scaled by `count`.
    pub fn segments(&self, points: &[Point], count: u64) -> Vec<WidthSegment> {
        if points.len() < 2 {
            return Vec::new();
        }
        let spans = (points.len() - 1) as f64;
        points
            .windows(2)
            .enumerate()
            .map(|(i, pair)| WidthSegment {
                start: pair[0],
                end: pair[1],
                width: self.width_at((i as f64 + 0.5) / spans) * count as f64,
            })
            .collect()
    }
}
