use crate::CLAP_STYLING;
use clap::{arg, command};
use latamconn::handlers::DEFAULT_CONFIG_DIR;
use std::path::PathBuf;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("latamconn")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("latamconn")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log per-record detail").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Writes the default configuration, country registry, centroid table and run database")
                .long_about(
                    "Writes the default configuration, country registry, centroid table and run database. \
                     Other commands pick these files up from ~/.config/latamconn/ when the matching \
                     option is not given.",
                )
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Directory to write the configuration files to")
                        .default_value(DEFAULT_CONFIG_DIR),
                )
                .arg(
                    arg!(-f - -"force")
                        .help("Overwrite existing files without asking")
                        .required(false),
                ),
        )
        .subcommand(
            command!("extract")
                .about("Extracts the trailing country token of every affiliation address")
                .arg(input_arg("Records CSV with an address column"))
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(true)
                        .help("Directory for the augmented records and country table")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"address-field" <NAME>)
                        .required(false)
                        .help("Column holding the addresses (default: addresses)"),
                )
                .arg(config_arg()),
        )
        .subcommand(
            command!("validate")
                .about("Keeps only tokens that are exact country names")
                .arg(input_arg("Country table from `extract`"))
                .arg(output_arg("Validated country table"))
                .arg(registry_arg()),
        )
        .subcommand(
            command!("dedup")
                .about("Removes repeated countries within each record")
                .arg(input_arg("Country table from `validate`"))
                .arg(output_arg("Deduplicated country table"))
                .arg(
                    arg!(--"drop-empty")
                        .required(false)
                        .help("Drop records without any valid country")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("matrix")
                .about("Aggregates Latin-American connectivity into a count matrix")
                .arg(input_arg("Country table from `dedup`"))
                .arg(output_arg("Matrix CSV"))
                .arg(config_arg()),
        )
        .subcommand(
            command!("arcs")
                .about("Builds weighted map arcs for every off-diagonal matrix cell")
                .arg(input_arg("Matrix CSV from `matrix`"))
                .arg(output_arg("GeoJSON file"))
                .arg(centroids_arg())
                .arg(
                    arg!(--"curvature" <FACTOR>)
                        .required(false)
                        .help("Control point offset as a fraction of arc length (default: 0.2)")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(--"points" <NUM>)
                        .required(false)
                        .help("Samples per arc (default: 200)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(config_arg()),
        )
        .subcommand(
            command!("run")
                .about("Runs every stage and prints a summary report")
                .arg(input_arg("Records CSV with an address column"))
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(true)
                        .help("Directory for every intermediate table, the matrix and the arcs")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(config_arg())
                .arg(registry_arg())
                .arg(centroids_arg())
                .arg(
                    arg!(--"db" <PATH>)
                        .required(false)
                        .help("SQLite database to record the run in (default: latamconn.db from `init`, if present)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown")
                        .value_parser(["text", "json", "markdown"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-r --"report" <PATH>)
                        .required(false)
                        .help("Save the report to a file instead of printing it")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("runs").about("Lists runs stored in a database").arg(
                arg!(--"db" <PATH>)
                    .required(false)
                    .help("SQLite database written by `run` (default: latamconn.db from `init`)")
                    .value_parser(clap::value_parser!(PathBuf)),
            ),
        )
}

fn input_arg(help: &'static str) -> clap::Arg {
    arg!(-i --"input" <PATH>)
        .required(true)
        .help(help)
        .value_parser(clap::value_parser!(PathBuf))
}

fn output_arg(help: &'static str) -> clap::Arg {
    arg!(-o --"output" <PATH>)
        .required(true)
        .help(help)
        .value_parser(clap::value_parser!(PathBuf))
}

fn config_arg() -> clap::Arg {
    arg!(-c --"config" <PATH>)
        .required(false)
        .help("JSON configuration file (default: latamconn.json from `init`, if present)")
        .value_parser(clap::value_parser!(PathBuf))
}

fn registry_arg() -> clap::Arg {
    arg!(--"registry" <PATH>)
        .required(false)
        .help("JSON country list replacing the built-in ISO 3166 names (default: countries.json from `init`, if present)")
        .value_parser(clap::value_parser!(PathBuf))
}

fn centroids_arg() -> clap::Arg {
    arg!(--"centroids" <PATH>)
        .required(false)
        .help("JSON centroid table replacing the built-in one (default: centroids.json from `init`, if present)")
        .value_parser(clap::value_parser!(PathBuf))
}
