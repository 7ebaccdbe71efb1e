use latamconn::handlers::*;
use latamconn_core::Config;
use latamconn_core::data::{Database, RunStatus};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

const RECORDS: &str = "\
title,addresses
One,\"UNAM, Mexico City, Mexico\"
Two,\"USP, Sao Paulo, Brazil; CSIC, Madrid, Spain\"
Three,\"MIT, Cambridge, USA\"
";

fn write_records(dir: &Path) -> PathBuf {
    let path = dir.join("records.csv");
    fs::write(&path, RECORDS).unwrap();
    path
}

fn run_options(dir: &Path, database: Option<PathBuf>) -> RunOptions {
    RunOptions {
        input: write_records(dir),
        output_dir: dir.join("out"),
        config: Config::default(),
        registry: load_registry(None).unwrap(),
        centroids: load_centroids(None).unwrap(),
        database,
    }
}

// ============================================================================
// Path And Loader Tests
// ============================================================================

#[test]
fn test_resolve_path_plain() {
    assert_eq!(
        resolve_path(Path::new("data/records.csv")),
        PathBuf::from("data/records.csv")
    );
}

#[test]
fn test_resolve_path_expands_tilde() {
    let resolved = resolve_path(Path::new("~/records.csv"));
    assert!(!resolved.to_string_lossy().starts_with('~'));
    assert!(resolved.ends_with("records.csv"));
}

#[test]
fn test_load_config_default() {
    assert_eq!(load_config(None).unwrap(), Config::default());
}

#[test]
fn test_load_config_partial_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, r#"{{"address_field": "C1", "drop_empty_rows": true}}"#)?;

    let config = load_config(Some(&temp_file.path().to_path_buf()))?;
    assert_eq!(config.address_field, "C1");
    assert!(config.drop_empty_rows);
    assert_eq!(config.latam_countries.len(), 29);
    Ok(())
}

#[test]
fn test_load_config_invalid_style() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, r#"{{"arc_style": {{"num_points": 1}}}}"#).unwrap();

    let result = load_config(Some(&temp_file.path().to_path_buf()));
    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("Failed to load configuration"));
}

#[test]
fn test_load_registry_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, r#"[{{"name": "Atlantis"}}]"#).unwrap();

    let registry = load_registry(Some(&temp_file.path().to_path_buf())).unwrap();
    assert_eq!(registry.validate("Atlantis"), Some("Atlantis".to_string()));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_load_centroids_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = load_centroids(Some(&temp_dir.path().join("absent.json")));
    assert!(result.is_err());
}

// ============================================================================
// Init Asset Tests
// ============================================================================

#[test]
fn test_asset_path_prefers_explicit_path() {
    let temp_dir = TempDir::new().unwrap();
    write_default_assets(temp_dir.path()).unwrap();
    let explicit = PathBuf::from("elsewhere.json");

    assert_eq!(
        asset_path(Some(&explicit), temp_dir.path(), CONFIG_FILE),
        Some(explicit)
    );
}

#[test]
fn test_asset_path_falls_back_to_init_directory() {
    let temp_dir = TempDir::new().unwrap();
    assert_eq!(asset_path(None, temp_dir.path(), CONFIG_FILE), None);

    write_default_assets(temp_dir.path()).unwrap();
    assert_eq!(
        asset_path(None, temp_dir.path(), CONFIG_FILE),
        Some(temp_dir.path().join(CONFIG_FILE))
    );
    // `init` creates the database separately
    assert_eq!(asset_path(None, temp_dir.path(), DATABASE_FILE), None);
}

#[test]
fn test_default_config_dir_is_expanded() {
    let dir = default_config_dir();
    assert!(!dir.to_string_lossy().starts_with('~'));
    assert!(dir.ends_with(".config/latamconn"));
}

#[test]
fn test_write_default_assets() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("config");

    assert!(existing_assets(&dir).is_empty());
    let written = write_default_assets(&dir).unwrap();
    assert_eq!(written.len(), 3);
    assert_eq!(existing_assets(&dir).len(), 3);

    // Every written file loads back through the regular loaders
    let config = load_config(Some(&dir.join(CONFIG_FILE))).unwrap();
    assert_eq!(config, Config::default());
    let registry = load_registry(Some(&dir.join(REGISTRY_FILE))).unwrap();
    assert!(registry.contains("Brazil"));
    let centroids = load_centroids(Some(&dir.join(CENTROIDS_FILE))).unwrap();
    assert!(!centroids.is_empty());
}

#[test]
fn test_write_default_assets_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(CONFIG_FILE), "garbage").unwrap();

    write_default_assets(temp_dir.path()).unwrap();
    assert!(load_config(Some(&temp_dir.path().join(CONFIG_FILE))).is_ok());
}

// ============================================================================
// Full Run Tests
// ============================================================================

#[test]
fn test_execute_run_writes_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let options = run_options(temp_dir.path(), None);

    let outcome = execute_run(&options, None).unwrap();

    assert!(outcome.run_id.is_none());
    assert!(outcome.artifacts.matrix.exists());
    assert!(outcome.artifacts.deduped.exists());
    assert!(outcome.arcs_path.exists());
    assert_eq!(outcome.report.stats.records, 3);
    assert_eq!(outcome.output.matrix.get("Mexico", "Mexico"), Some(1));
    assert_eq!(outcome.output.matrix.get("Brazil", "Spain"), Some(1));
    // "USA" is not an ISO 3166 name
    assert_eq!(outcome.output.stats.tokens_unmatched, 1);
    assert_eq!(outcome.arcs.arcs.len(), 1);
}

#[test]
fn test_execute_run_records_to_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("runs.db");
    let options = run_options(temp_dir.path(), Some(db_path.clone()));

    let outcome = execute_run(&options, None).unwrap();
    let run_id = outcome.run_id.unwrap();

    let db = Database::new(&db_path).unwrap();
    let run = db.get_run(&run_id).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.records, Some(3));
    assert_eq!(db.load_matrix(&run_id).unwrap().unwrap(), outcome.output.matrix);
    assert_eq!(db.get_arcs_by_run(&run_id).unwrap().len(), 1);
    assert_eq!(outcome.report.run_id.as_deref(), Some(run_id.as_str()));
}

#[test]
fn test_execute_run_marks_failed_run() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("runs.db");
    let mut options = run_options(temp_dir.path(), Some(db_path.clone()));
    options.config.address_field = "affiliations".to_string();

    assert!(execute_run(&options, None).is_err());

    let db = Database::new(&db_path).unwrap();
    let runs = db.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
}

#[test]
fn test_execute_run_marks_run_failed_when_storing_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("runs.db");
    let options = run_options(temp_dir.path(), Some(db_path.clone()));

    Database::new(&db_path)
        .unwrap()
        .get_connection()
        .execute_batch(
            "CREATE TRIGGER reject_arcs BEFORE INSERT ON arcs
             BEGIN SELECT RAISE(ABORT, 'arcs rejected'); END;",
        )
        .unwrap();

    let err = execute_run(&options, None).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Failed to store run"));
    assert!(message.contains("arcs rejected"));

    let db = Database::new(&db_path).unwrap();
    let runs = db.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert_eq!(runs[0].records, None);
    // The matrix saved before the arcs failed is discarded
    assert!(db.load_matrix(&runs[0].id).unwrap().is_none());
}

#[test]
fn test_execute_run_missing_input() {
    let temp_dir = TempDir::new().unwrap();
    let mut options = run_options(temp_dir.path(), None);
    options.input = temp_dir.path().join("absent.csv");

    let err = execute_run(&options, None).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read records"));
}
