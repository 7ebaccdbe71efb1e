// Run summary reports

use crate::matrix::{Connection, ConnectivityMatrix};
use crate::pipeline::PipelineStats;
use latamconn_geo::ArcSet;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcSummary {
    pub arcs: usize,
    pub total_weight: u64,
    pub skipped: usize,
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub input: String,
    pub generated_at: i64,
    pub stats: PipelineStats,
    pub matrix_rows: usize,
    pub matrix_columns: usize,
    pub active_rows: Vec<(String, u64)>,
    pub top_connections: Vec<Connection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arcs: Option<ArcSummary>,
}

pub fn gather_report_data(
    input: &str,
    stats: &PipelineStats,
    matrix: &ConnectivityMatrix,
    arcs: Option<&ArcSet>,
    top: usize,
) -> ReportData {
    let active_rows = matrix
        .rows()
        .iter()
        .map(|row| (row.clone(), matrix.row_total(row)))
        .filter(|(_, total)| *total > 0)
        .collect();

    ReportData {
        run_id: None,
        input: input.to_string(),
        generated_at: chrono::Utc::now().timestamp(),
        stats: stats.clone(),
        matrix_rows: matrix.rows().len(),
        matrix_columns: matrix.columns().len(),
        active_rows,
        top_connections: matrix.top_connections(top),
        arcs: arcs.map(|set| ArcSummary {
            arcs: set.arcs.len(),
            total_weight: set.total_weight(),
            skipped: set.failures.len(),
            unresolved: set
                .unresolved_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }),
    }
}

pub fn generate_report(data: &ReportData, format: &ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(data)),
        ReportFormat::Json => generate_json_report(data),
        ReportFormat::Markdown => Ok(generate_markdown_report(data)),
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();
    let s = &data.stats;

    report.push_str(RULE);
    report.push_str("                    LATIN-AMERICAN CONNECTIVITY REPORT\n");
    report.push_str(RULE);
    report.push('\n');

    if let Some(ref run_id) = data.run_id {
        report.push_str(&format!("Run ID:       {}\n", run_id));
    }
    report.push_str(&format!("Input:        {}\n", data.input));
    report.push_str(&format!("Generated:    {}\n", format_timestamp(data.generated_at)));
    report.push_str(&format!("Records:      {}\n", s.records));
    report.push_str(&format!(
        "Matrix:       {} rows x {} columns\n\n",
        data.matrix_rows, data.matrix_columns
    ));

    report.push_str(RULE);
    report.push_str("PIPELINE\n");
    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!("  Empty addresses:          {}\n", s.empty_addresses));
    report.push_str(&format!("  Country columns:          {}\n", s.country_columns));
    report.push_str(&format!("  Tokens extracted:         {}\n", s.tokens_extracted));
    report.push_str(&format!(
        "  Tokens matched:           {} ({})\n",
        s.tokens_matched,
        percentage(s.tokens_matched, s.tokens_extracted)
    ));
    report.push_str(&format!("  Tokens unmatched:         {}\n", s.tokens_unmatched));
    report.push_str(&format!("  Duplicates removed:       {}\n", s.duplicates_removed));
    report.push_str(&format!("  Records without country:  {}\n", s.records_without_countries));
    report.push_str(&format!("  Records without anchor:   {}\n", s.records_without_anchor));
    report.push_str(&format!("  Self-connections:         {}\n", s.self_connections));
    report.push_str(&format!("  Multi-country records:    {}\n", s.multi_country_records));
    report.push_str(&format!("  Matrix total:             {}\n\n", s.matrix_total));

    if !data.active_rows.is_empty() {
        report.push_str(RULE);
        report.push_str("ANCHOR COUNTRIES\n");
        report.push_str(RULE);
        report.push('\n');
        for (row, total) in &data.active_rows {
            report.push_str(&format!("  {:<24} {}\n", row, total));
        }
        report.push('\n');
    }

    if !data.top_connections.is_empty() {
        report.push_str(RULE);
        report.push_str("TOP CONNECTIONS\n");
        report.push_str(RULE);
        report.push('\n');
        for (idx, conn) in data.top_connections.iter().enumerate() {
            report.push_str(&format!(
                "  [{:>2}] {} ↔ {}  {}\n",
                idx + 1,
                conn.source,
                conn.target,
                conn.count
            ));
        }
        report.push('\n');
    }

    if let Some(ref arcs) = data.arcs {
        report.push_str(RULE);
        report.push_str("ARCS\n");
        report.push_str(RULE);
        report.push('\n');
        report.push_str(&format!("  Arcs built:     {}\n", arcs.arcs));
        report.push_str(&format!("  Total weight:   {}\n", arcs.total_weight));
        report.push_str(&format!("  Skipped:        {}\n", arcs.skipped));
        if !arcs.unresolved.is_empty() {
            report.push_str("\n  No centroid for:\n");
            for name in &arcs.unresolved {
                report.push_str(&format!("    - {}\n", name));
            }
        }
        report.push('\n');
    }

    report.push_str(RULE);
    report.push_str("                          End of Report\n");
    report.push_str(RULE);

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "latamconn",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": format_iso8601_timestamp(data.generated_at),
                "format": "json",
            },
            "run_id": data.run_id,
            "input": data.input,
            "stats": data.stats,
            "matrix": {
                "rows": data.matrix_rows,
                "columns": data.matrix_columns,
                "active_rows": data.active_rows.iter().map(|(row, total)| {
                    serde_json::json!({ "country": row, "total": total })
                }).collect::<Vec<_>>(),
            },
            "top_connections": data.top_connections,
            "arcs": data.arcs,
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_markdown_report(data: &ReportData) -> String {
    let s = &data.stats;
    let mut md = String::new();

    md.push_str("# Latin-American Connectivity Report\n\n");
    if let Some(ref run_id) = data.run_id {
        md.push_str(&format!("- **Run ID:** `{}`\n", run_id));
    }
    md.push_str(&format!("- **Input:** `{}`\n", data.input));
    md.push_str(&format!("- **Generated:** {}\n", format_timestamp(data.generated_at)));
    md.push_str(&format!(
        "- **Matrix:** {} rows × {} columns\n\n",
        data.matrix_rows, data.matrix_columns
    ));

    md.push_str("## Pipeline\n\n| Metric | Value |\n|---|---:|\n");
    let rows: [(&str, String); 11] = [
        ("Records", s.records.to_string()),
        ("Empty addresses", s.empty_addresses.to_string()),
        ("Tokens extracted", s.tokens_extracted.to_string()),
        ("Tokens matched", s.tokens_matched.to_string()),
        ("Tokens unmatched", s.tokens_unmatched.to_string()),
        ("Duplicates removed", s.duplicates_removed.to_string()),
        ("Records without country", s.records_without_countries.to_string()),
        ("Records without anchor", s.records_without_anchor.to_string()),
        ("Self-connections", s.self_connections.to_string()),
        ("Multi-country records", s.multi_country_records.to_string()),
        ("Matrix total", s.matrix_total.to_string()),
    ];
    for (label, value) in rows {
        md.push_str(&format!("| {} | {} |\n", label, value));
    }
    md.push('\n');

    if !data.top_connections.is_empty() {
        md.push_str("## Top connections\n\n| # | Source | Target | Count |\n|---:|---|---|---:|\n");
        for (idx, conn) in data.top_connections.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                idx + 1,
                conn.source,
                conn.target,
                conn.count
            ));
        }
        md.push('\n');
    }

    if let Some(ref arcs) = data.arcs {
        md.push_str("## Arcs\n\n");
        md.push_str(&format!(
            "{} arcs built (total weight {}), {} skipped.\n",
            arcs.arcs, arcs.total_weight, arcs.skipped
        ));
        if !arcs.unresolved.is_empty() {
            md.push_str("\nNo centroid found for:\n\n");
            for name in &arcs.unresolved {
                md.push_str(&format!("- {}\n", name));
            }
        }
    }

    md
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn percentage(part: usize, whole: usize) -> String {
    if whole == 0 {
        return "n/a".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / whole as f64)
}

fn format_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_iso8601_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.to_rfc3339()
}
