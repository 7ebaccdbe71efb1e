use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use latamconn::handlers::{
    handle_arcs, handle_dedup, handle_extract, handle_init, handle_matrix, handle_run,
    handle_runs, handle_validate,
};
use latamconn_core::print_banner;
use tracing::Level;

mod commands;

fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    init_tracing(verbose);

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    if let Err(e) = dispatch(&chosen_command) {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn dispatch(matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("extract", primary_command)) => handle_extract(primary_command),
        Some(("validate", primary_command)) => handle_validate(primary_command),
        Some(("dedup", primary_command)) => handle_dedup(primary_command),
        Some(("matrix", primary_command)) => handle_matrix(primary_command),
        Some(("arcs", primary_command)) => handle_arcs(primary_command),
        Some(("run", primary_command)) => handle_run(primary_command),
        Some(("runs", primary_command)) => handle_runs(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
