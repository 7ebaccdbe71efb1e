//! Stage runners: extract -> validate -> dedup -> aggregate -> arcs.

use crate::address::extract_countries;
use crate::config::Config;
use crate::dedup::{dedup_row, duplicate_count};
use crate::error::Result;
use crate::matrix::{ConnectivityAggregator, ConnectivityMatrix};
use crate::registry::CountryRegistry;
use crate::table::{CountryTable, RecordTable};
use latamconn_geo::{ArcBuilder, ArcSet, CentroidSource};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Callback for reporting stage progress
pub type PipelineProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

pub const AUGMENTED_FILE: &str = "records_with_countries.csv";
pub const EXTRACTED_FILE: &str = "countries.csv";
pub const VALIDATED_FILE: &str = "countries_validated.csv";
pub const DEDUPED_FILE: &str = "countries_deduped.csv";
pub const MATRIX_FILE: &str = "latam_conn.csv";
pub const ARCS_FILE: &str = "arcs.geojson";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub records: usize,
    pub empty_addresses: usize,
    pub country_columns: usize,
    pub tokens_extracted: usize,
    pub tokens_matched: usize,
    pub tokens_unmatched: usize,
    pub duplicates_removed: usize,
    pub records_without_countries: usize,
    pub records_without_anchor: usize,
    pub self_connections: usize,
    pub multi_country_records: usize,
    pub matrix_total: u64,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub extracted: CountryTable,
    pub validated: CountryTable,
    pub deduped: CountryTable,
    pub matrix: ConnectivityMatrix,
    pub stats: PipelineStats,
}

/// Extract trailing country tokens from the address column of every record.
pub fn extract_table(records: &RecordTable, address_field: &str) -> Result<CountryTable> {
    let column = records.column_index(address_field)?;
    let lists: Vec<Vec<String>> = (0..records.len())
        .map(|row| extract_countries(records.field(row, column)))
        .collect();
    let table = CountryTable::from_lists(lists);
    info!(
        "Extracted countries from {} records into {} columns",
        table.len(),
        table.width
    );
    Ok(table)
}

/// Replace every token the registry does not accept with an absent marker,
/// keeping column positions.
pub fn validate_table(table: &CountryTable, registry: &CountryRegistry) -> CountryTable {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_deref().and_then(|token| registry.validate(token)))
                .collect()
        })
        .collect();
    CountryTable {
        width: table.width,
        rows,
    }
}

pub fn dedup_table(table: &CountryTable) -> CountryTable {
    CountryTable {
        width: table.width,
        rows: table
            .rows
            .iter()
            .map(|row| dedup_row(row, table.width))
            .collect(),
    }
}

/// Repeated mentions `dedup_table` drops from `table`.
pub fn count_duplicates(table: &CountryTable) -> usize {
    table.rows.iter().map(|row| duplicate_count(row)).sum()
}

/// Run every stage up to the matrix.
pub fn run_pipeline(
    records: &RecordTable,
    registry: &CountryRegistry,
    config: &Config,
    progress: Option<PipelineProgressCallback>,
) -> Result<PipelineOutput> {
    let report = |msg: String| {
        debug!("{}", msg);
        if let Some(cb) = &progress {
            cb(msg);
        }
    };

    report(format!("Extracting countries from {} records", records.len()));
    let extracted = extract_table(records, &config.address_field)?;

    report(format!(
        "Validating {} tokens against {} country names",
        extracted.present_count(),
        registry.len()
    ));
    let validated = validate_table(&extracted, registry);

    report("Removing duplicate mentions".to_string());
    let mut deduped = dedup_table(&validated);
    let duplicates_removed = count_duplicates(&validated);
    let records_without_countries = deduped
        .rows
        .iter()
        .filter(|row| row.iter().all(Option::is_none))
        .count();
    if config.drop_empty_rows {
        deduped = deduped.without_empty_rows();
    }

    report(format!(
        "Aggregating connectivity for {} anchor countries",
        config.latam_countries.len()
    ));
    let aggregator = ConnectivityAggregator::new(config.latam_countries.clone());
    let (matrix, agg) = aggregator.aggregate_with_stats(&deduped);

    let address_column = records.column_index(&config.address_field)?;
    let tokens_extracted = extracted.present_count();
    let tokens_matched = validated.present_count();
    let stats = PipelineStats {
        records: records.len(),
        empty_addresses: (0..records.len())
            .filter(|&row| records.field(row, address_column).is_none())
            .count(),
        country_columns: extracted.width,
        tokens_extracted,
        tokens_matched,
        tokens_unmatched: tokens_extracted - tokens_matched,
        duplicates_removed,
        records_without_countries,
        records_without_anchor: agg.records_without_anchor,
        self_connections: agg.self_connections,
        multi_country_records: agg.multi_country_records,
        matrix_total: matrix.total(),
    };
    info!(
        "Pipeline finished: {} records, {} matched tokens, matrix total {}",
        stats.records, stats.tokens_matched, stats.matrix_total
    );

    Ok(PipelineOutput {
        extracted,
        validated,
        deduped,
        matrix,
        stats,
    })
}

/// Build arcs for the matrix using the configured style and aliases.
pub fn build_arcs(
    matrix: &ConnectivityMatrix,
    centroids: &dyn CentroidSource,
    config: &Config,
) -> Result<ArcSet> {
    let builder = ArcBuilder::new(centroids)
        .with_aliases(config.alias_table())
        .with_style(config.arc_style);
    Ok(builder.build(matrix.nonzero_cells())?)
}

pub fn write_arcs(arcs: &ArcSet, path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(&arcs.to_geojson())?)?;
    Ok(())
}

/// Where [`write_artifacts`] put each table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub augmented: PathBuf,
    pub extracted: PathBuf,
    pub validated: PathBuf,
    pub deduped: PathBuf,
    pub matrix: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            augmented: dir.join(AUGMENTED_FILE),
            extracted: dir.join(EXTRACTED_FILE),
            validated: dir.join(VALIDATED_FILE),
            deduped: dir.join(DEDUPED_FILE),
            matrix: dir.join(MATRIX_FILE),
        }
    }
}

pub fn write_artifacts(
    records: &RecordTable,
    output: &PipelineOutput,
    dir: &Path,
) -> Result<ArtifactPaths> {
    fs::create_dir_all(dir)?;
    let paths = ArtifactPaths::in_dir(dir);
    records.write_augmented_path(&output.extracted, &paths.augmented)?;
    output.extracted.write_path(&paths.extracted)?;
    output.validated.write_path(&paths.validated)?;
    output.deduped.write_path(&paths.deduped)?;
    output.matrix.write_path(&paths.matrix)?;
    info!("Wrote pipeline artifacts to {}", dir.display());
    Ok(paths)
}
