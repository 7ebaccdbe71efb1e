use crate::arc::Point;
use crate::width::WidthSegment;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One drawable connection between two countries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcDescriptor {
    pub source: String,
    pub target: String,
    pub weight: u64,
    pub path: Vec<Point>,
    pub segments: Vec<WidthSegment>,
}

/// A matrix cell that could not be drawn because a centroid was missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentroidFailure {
    pub source: String,
    pub target: String,
    pub missing: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArcSet {
    pub arcs: Vec<ArcDescriptor>,
    pub failures: Vec<CentroidFailure>,
}

impl ArcSet {
    pub fn total_weight(&self) -> u64 {
        self.arcs.iter().map(|a| a.weight).sum()
    }

    /// Distinct country names that could not be placed, in first-seen order.
    pub fn unresolved_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for failure in &self.failures {
            if !names.contains(&failure.missing.as_str()) {
                names.push(&failure.missing);
            }
        }
        names
    }

    /// GeoJSON FeatureCollection with one LineString per arc.
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .arcs
            .iter()
            .map(|arc| {
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": arc.path.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>(),
                    },
                    "properties": {
                        "source": arc.source,
                        "target": arc.target,
                        "weight": arc.weight,
                        "widths": arc.segments.iter().map(|s| s.width).collect::<Vec<_>>(),
                    }
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}
