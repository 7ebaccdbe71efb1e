use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use latamconn_core::data::{Database, RunStatus};
use latamconn_core::pipeline::{
    ARCS_FILE, ArtifactPaths, PipelineOutput, PipelineProgressCallback, build_arcs,
    count_duplicates, dedup_table, extract_table, run_pipeline, validate_table, write_arcs,
    write_artifacts,
};
use latamconn_core::report::{
    ReportData, ReportFormat, gather_report_data, generate_report, save_report,
};
use latamconn_core::table::{CountryTable, RecordTable};
use latamconn_core::{Config, ConnectivityAggregator, ConnectivityMatrix, CountryRegistry, Iso3166};
use latamconn_geo::{ArcSet, CentroidTable};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "latamconn.json";
pub const REGISTRY_FILE: &str = "countries.json";
pub const CENTROIDS_FILE: &str = "centroids.json";
pub const DATABASE_FILE: &str = "latamconn.db";

/// Where `init` writes its files unless told otherwise.
pub const DEFAULT_CONFIG_DIR: &str = "~/.config/latamconn/";

const TOP_CONNECTIONS: usize = 10;

// Helper functions shared by the stage handlers

/// Expand a leading `~` and environment variables in a user-supplied path.
pub fn resolve_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(&raw).as_ref()),
    }
}

/// Load a configuration file, or the defaults when none is given.
pub fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            let path = resolve_path(path);
            Config::load(&path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

pub fn load_registry(path: Option<&PathBuf>) -> Result<CountryRegistry> {
    let authority = match path {
        Some(path) => {
            let path = resolve_path(path);
            Iso3166::from_path(&path)
                .with_context(|| format!("Failed to load country registry {}", path.display()))?
        }
        None => Iso3166::builtin().context("Built-in country registry is invalid")?,
    };
    Ok(CountryRegistry::from_authority(&authority))
}

pub fn load_centroids(path: Option<&PathBuf>) -> Result<CentroidTable> {
    match path {
        Some(path) => {
            let path = resolve_path(path);
            CentroidTable::from_path(&path)
                .with_context(|| format!("Failed to load centroids {}", path.display()))
        }
        None => CentroidTable::builtin().context("Built-in centroid table is invalid"),
    }
}

pub fn default_config_dir() -> PathBuf {
    resolve_path(Path::new(DEFAULT_CONFIG_DIR))
}

/// The explicitly given path, else `name` inside `dir` if `init` wrote it there.
pub fn asset_path(explicit: Option<&PathBuf>, dir: &Path, name: &str) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.clone()),
        None => {
            let path = dir.join(name);
            path.exists().then_some(path)
        }
    }
}

/// Files `init` would write into `dir` that already exist.
pub fn existing_assets(dir: &Path) -> Vec<PathBuf> {
    [CONFIG_FILE, REGISTRY_FILE, CENTROIDS_FILE, DATABASE_FILE]
        .iter()
        .map(|name| dir.join(name))
        .filter(|path| path.exists())
        .collect()
}

/// Write the default configuration, country list and centroid table.
pub fn write_default_assets(dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let assets = [
        (CONFIG_FILE, Config::default().to_json_pretty()?),
        (REGISTRY_FILE, Iso3166::builtin_json().to_string()),
        (CENTROIDS_FILE, CentroidTable::builtin_json().to_string()),
    ];

    let mut written = Vec::with_capacity(assets.len());
    for (name, content) in assets {
        let path = dir.join(name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Everything a full run needs, already loaded.
pub struct RunOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub config: Config,
    pub registry: CountryRegistry,
    pub centroids: CentroidTable,
    pub database: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Option<String>,
    pub artifacts: ArtifactPaths,
    pub arcs_path: PathBuf,
    pub output: PipelineOutput,
    pub arcs: ArcSet,
    pub report: ReportData,
}

/// Run every stage, write all artifacts and, with a database, record the run.
pub fn execute_run(
    options: &RunOptions,
    progress: Option<PipelineProgressCallback>,
) -> Result<RunOutcome> {
    let input = options.input.display().to_string();
    let database = match &options.database {
        Some(path) => Some(
            Database::new(path)
                .with_context(|| format!("Failed to open database {}", path.display()))?,
        ),
        None => None,
    };
    let run_id = match &database {
        Some(db) => {
            let configuration = options.config.to_json_pretty()?;
            Some(db.create_run(&input, Some(configuration.as_str()))?)
        }
        None => None,
    };

    let result = run_stages(options, progress).and_then(|done| {
        if let (Some(db), Some(id)) = (&database, &run_id) {
            store_run(db, id, &done).with_context(|| format!("Failed to store run {}", id))?;
        }
        Ok(done)
    });

    let (_, output, arcs, artifacts, arcs_path) = match result {
        Ok(done) => done,
        Err(e) => {
            if let (Some(db), Some(id)) = (&database, &run_id) {
                if let Err(fail) = db.fail_run(id) {
                    warn!("Could not mark run {} as failed: {}", id, fail);
                }
            }
            return Err(e);
        }
    };

    let mut report = gather_report_data(
        &input,
        &output.stats,
        &output.matrix,
        Some(&arcs),
        TOP_CONNECTIONS,
    );
    report.run_id = run_id.clone();

    Ok(RunOutcome {
        run_id,
        artifacts,
        arcs_path,
        output,
        arcs,
        report,
    })
}

type StageResults = (usize, PipelineOutput, ArcSet, ArtifactPaths, PathBuf);

fn store_run(db: &Database, run_id: &str, done: &StageResults) -> Result<()> {
    let (records, output, arcs, _, _) = done;
    db.save_matrix(run_id, &output.matrix)?;
    db.save_arcs(run_id, arcs)?;
    db.complete_run(run_id, *records)?;
    info!("Stored run {}", run_id);
    Ok(())
}

fn run_stages(
    options: &RunOptions,
    progress: Option<PipelineProgressCallback>,
) -> Result<StageResults> {
    let records = RecordTable::read_path(&options.input)
        .with_context(|| format!("Failed to read records {}", options.input.display()))?;
    let output = run_pipeline(&records, &options.registry, &options.config, progress.clone())?;
    let artifacts = write_artifacts(&records, &output, &options.output_dir)?;

    if let Some(cb) = &progress {
        cb("Building arcs".to_string());
    }
    let arcs = build_arcs(&output.matrix, &options.centroids, &options.config)?;
    let arcs_path = options.output_dir.join(ARCS_FILE);
    write_arcs(&arcs, &arcs_path)?;

    Ok((records.len(), output, arcs, artifacts, arcs_path))
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(message.to_string());
    spinner
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .with_context(|| format!("--{} is required", name))
}

fn config_path(args: &ArgMatches) -> Option<PathBuf> {
    asset_path(args.get_one::<PathBuf>("config"), &default_config_dir(), CONFIG_FILE)
}

fn registry_path(args: &ArgMatches) -> Option<PathBuf> {
    asset_path(args.get_one::<PathBuf>("registry"), &default_config_dir(), REGISTRY_FILE)
}

fn centroids_path(args: &ArgMatches) -> Option<PathBuf> {
    asset_path(args.get_one::<PathBuf>("centroids"), &default_config_dir(), CENTROIDS_FILE)
}

fn database_path(args: &ArgMatches) -> Option<PathBuf> {
    asset_path(args.get_one::<PathBuf>("db"), &default_config_dir(), DATABASE_FILE)
}

fn done(label: &str, path: &Path) {
    println!(
        "{} {}: {}",
        "✓".green().bold(),
        label,
        path.display().to_string().bright_white()
    );
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  LATAMCONN INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let dir = args
        .get_one::<String>("PATH")
        .context("No target directory given")?;
    let force = args.get_flag("force");
    let config_dir = resolve_path(Path::new(dir));
    let db_path = config_dir.join(DATABASE_FILE);

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    let existing = existing_assets(&config_dir);
    if !existing.is_empty() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Configuration files already exist:");
        for path in &existing {
            println!(
                "  {} {}",
                "•".yellow(),
                path.display().to_string().bright_white()
            );
        }
        println!();
        println!(
            "{}",
            "This operation will overwrite existing files.".yellow()
        );

        let response = print_prompt("Do you want to continue? [y/N]:")?;
        println!();

        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return Ok(());
        }
        println!("{} Proceeding with overwrite", "→".yellow().bold());
        println!();
    }

    println!("{} Writing default files...", "→".blue());
    for path in write_default_assets(&config_dir)? {
        println!(
            "  {} {}",
            "✓".green(),
            path.display().to_string().bright_white()
        );
    }

    if Database::exists(&db_path) {
        Database::drop(&db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
        println!("{} Existing database removed", "✓".green().bold());
    }
    Database::new(&db_path)
        .with_context(|| format!("Failed to create database {}", db_path.display()))?;

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    done("Config directory", &config_dir);
    done("Database", &db_path);
    println!();
    Ok(())
}

pub fn handle_extract(args: &ArgMatches) -> Result<()> {
    let input = resolve_path(path_arg(args, "input")?);
    let output_dir = resolve_path(path_arg(args, "output")?);
    let mut config = load_config(config_path(args).as_ref())?;
    if let Some(field) = args.get_one::<String>("address-field") {
        config.address_field = field.clone();
    }

    let records = RecordTable::read_path(&input)
        .with_context(|| format!("Failed to read records {}", input.display()))?;
    let extracted = extract_table(&records, &config.address_field)?;

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;
    let paths = ArtifactPaths::in_dir(&output_dir);
    records.write_augmented_path(&extracted, &paths.augmented)?;
    extracted.write_path(&paths.extracted)?;

    println!(
        "{} Extracted {} tokens from {} records ({} columns)",
        "✓".green().bold(),
        extracted.present_count().to_string().cyan(),
        records.len().to_string().cyan(),
        extracted.width.to_string().cyan()
    );
    done("Records", &paths.augmented);
    done("Countries", &paths.extracted);
    Ok(())
}

pub fn handle_validate(args: &ArgMatches) -> Result<()> {
    let input = resolve_path(path_arg(args, "input")?);
    let output = resolve_path(path_arg(args, "output")?);
    let registry = load_registry(registry_path(args).as_ref())?;

    let table = CountryTable::read_path(&input)
        .with_context(|| format!("Failed to read country table {}", input.display()))?;
    let validated = validate_table(&table, &registry);
    validated.write_path(&output)?;

    let tokens = table.present_count();
    let matched = validated.present_count();
    println!(
        "{} {} of {} tokens are country names ({} dropped)",
        "✓".green().bold(),
        matched.to_string().cyan(),
        tokens.to_string().cyan(),
        (tokens - matched).to_string().yellow()
    );
    done("Validated", &output);
    Ok(())
}

pub fn handle_dedup(args: &ArgMatches) -> Result<()> {
    let input = resolve_path(path_arg(args, "input")?);
    let output = resolve_path(path_arg(args, "output")?);

    let table = CountryTable::read_path(&input)
        .with_context(|| format!("Failed to read country table {}", input.display()))?;
    let mut deduped = dedup_table(&table);
    let removed = count_duplicates(&table);
    if args.get_flag("drop-empty") {
        deduped = deduped.without_empty_rows();
    }
    deduped.write_path(&output)?;

    println!(
        "{} Removed {} repeated mentions across {} records",
        "✓".green().bold(),
        removed.to_string().cyan(),
        deduped.len().to_string().cyan()
    );
    done("Deduplicated", &output);
    Ok(())
}

pub fn handle_matrix(args: &ArgMatches) -> Result<()> {
    let input = resolve_path(path_arg(args, "input")?);
    let output = resolve_path(path_arg(args, "output")?);
    let config = load_config(config_path(args).as_ref())?;

    let table = CountryTable::read_path(&input)
        .with_context(|| format!("Failed to read country table {}", input.display()))?;
    let aggregator = ConnectivityAggregator::new(config.latam_countries.clone());
    let (matrix, stats) = aggregator.aggregate_with_stats(&table);
    matrix.write_path(&output)?;

    println!(
        "{} {}x{} matrix, {} increments ({} self-connections, {} records without anchor)",
        "✓".green().bold(),
        matrix.rows().len(),
        matrix.columns().len(),
        stats.increments.to_string().cyan(),
        stats.self_connections,
        stats.records_without_anchor
    );
    done("Matrix", &output);
    Ok(())
}

pub fn handle_arcs(args: &ArgMatches) -> Result<()> {
    let input = resolve_path(path_arg(args, "input")?);
    let output = resolve_path(path_arg(args, "output")?);
    let mut config = load_config(config_path(args).as_ref())?;
    if let Some(curvature) = args.get_one::<f64>("curvature") {
        config.arc_style.curvature = *curvature;
    }
    if let Some(points) = args.get_one::<usize>("points") {
        config.arc_style.num_points = *points;
    }
    config.validate()?;
    let centroids = load_centroids(centroids_path(args).as_ref())?;

    let matrix = ConnectivityMatrix::read_path(&input)
        .with_context(|| format!("Failed to read matrix {}", input.display()))?;
    let arcs = build_arcs(&matrix, &centroids, &config)?;
    write_arcs(&arcs, &output)?;

    println!(
        "{} Built {} arcs (total weight {})",
        "✓".green().bold(),
        arcs.arcs.len().to_string().cyan(),
        arcs.total_weight().to_string().cyan()
    );
    print_unresolved(&arcs);
    done("Arcs", &output);
    Ok(())
}

fn print_unresolved(arcs: &ArcSet) {
    let unresolved = arcs.unresolved_names();
    if unresolved.is_empty() {
        return;
    }
    println!(
        "{} {} cells skipped, no centroid for:",
        "⚠".yellow().bold(),
        arcs.failures.len()
    );
    for name in unresolved {
        println!("  {} {}", "•".yellow(), name);
    }
}

pub fn handle_run(args: &ArgMatches) -> Result<()> {
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    let options = RunOptions {
        input: resolve_path(path_arg(args, "input")?),
        output_dir: resolve_path(path_arg(args, "output")?),
        config: load_config(config_path(args).as_ref())?,
        registry: load_registry(registry_path(args).as_ref())?,
        centroids: load_centroids(centroids_path(args).as_ref())?,
        database: database_path(args).map(|p| resolve_path(&p)),
    };

    let pb = spinner("Starting pipeline");
    let bar = pb.clone();
    let progress: PipelineProgressCallback = Arc::new(move |msg: String| bar.set_message(msg));

    let outcome = match execute_run(&options, Some(progress)) {
        Ok(outcome) => {
            pb.finish_and_clear();
            outcome
        }
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    println!("{} Pipeline complete", "✓".green().bold());
    done("Matrix", &outcome.artifacts.matrix);
    done("Arcs", &outcome.arcs_path);
    if let Some(ref id) = outcome.run_id {
        println!("{} Run ID: {}", "✓".green().bold(), id.bright_white());
    }
    print_unresolved(&outcome.arcs);
    println!();

    let content = generate_report(&outcome.report, &format)?;
    match args.get_one::<PathBuf>("report") {
        Some(path) => {
            let path = resolve_path(path);
            save_report(&content, &path)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            done("Report", &path);
        }
        None => print!("{}", content),
    }
    Ok(())
}

pub fn handle_runs(args: &ArgMatches) -> Result<()> {
    let path = database_path(args).with_context(|| {
        format!(
            "No database given and none at {}; pass --db or run `latamconn init`",
            default_config_dir().join(DATABASE_FILE).display()
        )
    })?;
    let path = resolve_path(&path);
    if !Database::exists(&path) {
        bail!("No database at {}", path.display());
    }
    let db = Database::new(&path)?;
    let runs = db.list_runs()?;

    if runs.is_empty() {
        println!("{} No runs recorded", "→".blue());
        return Ok(());
    }

    print_divider();
    for run in runs {
        let status = match run.status {
            RunStatus::Completed => run.status.as_str().green(),
            RunStatus::Running => run.status.as_str().yellow(),
            RunStatus::Failed => run.status.as_str().red(),
        };
        println!(
            "{}  {:<10} {}  {}",
            run.id.bright_white(),
            status,
            format_started(run.started_at),
            run.input
        );
        if let Some(records) = run.records {
            println!("    {} records", records.to_string().cyan());
        }
    }
    print_divider();
    Ok(())
}

fn format_started(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
