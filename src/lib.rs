pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod controller;
pub mod core;
pub mod document;
pub mod error;
pub mod project_identity;
pub mod templates;
pub mod ui;
pub mod utils;

use clap::Parser;
use config::Settings;
use error::SafenixError;
use std::process::exit;
use utils::machine_output;

/// Run safenix CLI entrypoint.
pub fn run_cli() {
    let args = cli::args::Cli::parse();
    ui::set_quiet(args.global.quiet);
    ui::set_verbose(args.global.verbose);

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            ui::init_colors(args.global.color.as_deref().unwrap_or("auto"));
            ui::error(&e.to_string());
            exit(1);
        }
    };
    ui::init_colors(args.global.color.as_deref().unwrap_or(&settings.color));

    // Mark cancellation; the controller checks before writing
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        ui::mark_interrupted();
        ui::warning("Operation cancelled by user.");
    }) {
        ui::warning(&format!("Could not install Ctrl-C handler: {}", e));
    }

    if let Err(e) = cli::dispatcher::dispatch(&args, &settings) {
        let format = args.global.format.as_deref().unwrap_or(&settings.format);
        if machine_output::is_machine_format(format) {
            report_machine_error(cli::dispatcher::command_name(&args.command), &e, format);
        }
        ui::error(&e.to_string());
        exit(1);
    }
}

fn report_machine_error(command: &str, err: &SafenixError, format: &str) {
    let data = match err {
        SafenixError::Conflict(conflicts) => serde_json::json!({ "conflicts": conflicts }),
        _ => serde_json::Value::Null,
    };
    if let Err(e) = machine_output::emit_v1(command, data, Vec::new(), vec![err.to_string()], format) {
        ui::error(&format!("Failed to render machine output: {}", e));
    }
}
