use crate::arc::{Point, create_arc};
use crate::centroid::{AliasTable, CentroidSource, resolve_centroid};
use crate::error::{GeoError, Result};
use crate::result::{ArcDescriptor, ArcSet, CentroidFailure};
use crate::width::WidthProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Shape parameters shared by every arc in a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcStyle {
    pub curvature: f64,
    pub num_points: usize,
    pub width: WidthProfile,
}

impl Default for ArcStyle {
    fn default() -> Self {
        Self {
            curvature: 0.2,
            num_points: 200,
            width: WidthProfile::default(),
        }
    }
}

impl ArcStyle {
    pub fn validate(&self) -> Result<()> {
        if self.num_points < 2 {
            return Err(GeoError::InvalidStyle(format!(
                "num_points must be at least 2, got {}",
                self.num_points
            )));
        }
        if !self.curvature.is_finite() {
            return Err(GeoError::InvalidStyle("curvature must be finite".to_string()));
        }
        let w = &self.width;
        if !(w.sigma.is_finite() && w.sigma > 0.0) {
            return Err(GeoError::InvalidStyle(format!(
                "sigma must be positive, got {}",
                w.sigma
            )));
        }
        if !(w.base_width.is_finite() && w.max_width.is_finite())
            || w.base_width < 0.0
            || w.max_width < 0.0
        {
            return Err(GeoError::InvalidStyle(
                "widths must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Turns weighted country pairs into curved, variable-width arcs.
pub struct ArcBuilder<'a> {
    source: &'a dyn CentroidSource,
    aliases: AliasTable,
    style: ArcStyle,
}

impl<'a> ArcBuilder<'a> {
    pub fn new(source: &'a dyn CentroidSource) -> Self {
        Self {
            source,
            aliases: AliasTable::default(),
            style: ArcStyle::default(),
        }
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_style(mut self, style: ArcStyle) -> Self {
        self.style = style;
        self
    }

    /// Build arcs for every `(row, column, count)` cell with a positive count
    /// whose endpoints differ (case-insensitively). Cells with an unplaceable
    /// endpoint are skipped and recorded in [`ArcSet::failures`].
    pub fn build<I, R, C>(&self, cells: I) -> Result<ArcSet>
    where
        I: IntoIterator<Item = (R, C, u64)>,
        R: AsRef<str>,
        C: AsRef<str>,
    {
        self.style.validate()?;

        let mut cache: HashMap<String, Option<Point>> = HashMap::new();
        let mut set = ArcSet::default();

        for (row, column, count) in cells {
            let (row, column) = (row.as_ref(), column.as_ref());
            if count == 0 || row.to_lowercase() == column.to_lowercase() {
                continue;
            }

            let from = self.lookup(&mut cache, row);
            let to = self.lookup(&mut cache, column);
            let (from, to) = match (from, to) {
                (Some(from), Some(to)) => (from, to),
                (None, _) => {
                    set.failures.push(self.failure(row, column, row));
                    continue;
                }
                (_, None) => {
                    set.failures.push(self.failure(row, column, column));
                    continue;
                }
            };

            let path = create_arc(from, to, self.style.curvature, self.style.num_points);
            let segments = self.style.width.segments(&path, count);
            debug!("Arc {} -> {} (weight {})", row, column, count);
            set.arcs.push(ArcDescriptor {
                source: row.to_string(),
                target: column.to_string(),
                weight: count,
                path,
                segments,
            });
        }

        info!(
            "Built {} arcs, {} skipped for missing centroids",
            set.arcs.len(),
            set.failures.len()
        );
        Ok(set)
    }

    fn lookup(&self, cache: &mut HashMap<String, Option<Point>>, name: &str) -> Option<Point> {
        *cache
            .entry(name.to_string())
            .or_insert_with(|| resolve_centroid(self.source, &self.aliases, name))
    }

    fn failure(&self, source: &str, target: &str, missing: &str) -> CentroidFailure {
        warn!("Centroid for {} not found, skipping", missing);
        CentroidFailure {
            source: source.to_string(),
            target: target.to_string(),
            missing: missing.to_string(),
        }
    }
}
