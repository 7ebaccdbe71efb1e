use crate::arc::Point;
use crate::error::{GeoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const BUILTIN_CENTROIDS: &str = include_str!("../data/centroids.json");

/// Something that can place a country name on the map.
///
/// Implementations match names case-insensitively and exactly; alias
/// fallback is applied by [`resolve_centroid`], not by the source.
pub trait CentroidSource {
    fn centroid(&self, name: &str) -> Option<Point>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentroidEntry {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
}

/// In-memory centroid table keyed by lowercased country name.
#[derive(Debug, Clone, Default)]
pub struct CentroidTable {
    points: HashMap<String, Point>,
}

impl CentroidTable {
    pub fn from_entries(entries: impl IntoIterator<Item = CentroidEntry>) -> Self {
        let points = entries
            .into_iter()
            .map(|e| (e.name.to_lowercase(), Point::new(e.lon, e.lat)))
            .collect();
        Self { points }
    }

    /// The bundled world-map centroids (admin-0 names).
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CENTROIDS)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<CentroidEntry> = serde_json::from_str(json)?;
        if let Some(bad) = entries
            .iter()
            .find(|e| !e.lon.is_finite() || !e.lat.is_finite())
        {
            return Err(GeoError::InvalidCentroids(format!(
                "non-finite coordinates for {}",
                bad.name
            )));
        }
        Ok(Self::from_entries(entries))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn builtin_json() -> &'static str {
        BUILTIN_CENTROIDS
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl CentroidSource for CentroidTable {
    fn centroid(&self, name: &str) -> Option<Point> {
        self.points.get(&name.to_lowercase()).copied()
    }
}

/// Lowercased alternative spellings mapped to the name the map knows.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let aliases = [
            ("usa", "United States of America"),
            ("united states", "United States of America"),
        ]
        .into_iter()
        .map(|(alias, name)| (alias.to_string(), name.to_string()))
        .collect();
        Self { aliases }
    }
}

impl AliasTable {
    pub fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    /// Add aliases on top of the current table; later entries win.
    pub fn with_extra<I, K, V>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (alias, name) in extra {
            self.aliases.insert(alias.as_ref().to_lowercase(), name.into());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Look `name` up directly, then through the alias table.
pub fn resolve_centroid(
    source: &dyn CentroidSource,
    aliases: &AliasTable,
    name: &str,
) -> Option<Point> {
    source
        .centroid(name)
        .or_else(|| aliases.get(name).and_then(|alt| source.centroid(alt)))
}
