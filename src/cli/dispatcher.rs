//! Command dispatcher
//!
//! Routes CLI commands to their appropriate handlers.

use crate::cli::args::{Cli, Command};
use crate::commands::{self, Context};
use crate::config::Settings;
use crate::error::Result;

/// Merge global flags over settings.
pub fn build_context(args: &Cli, settings: &Settings) -> Context {
    Context {
        settings: settings.clone(),
        file: args.global.file.clone(),
        format: args
            .global
            .format
            .clone()
            .unwrap_or_else(|| settings.format.clone()),
        yes: args.global.yes,
        force: args.global.force,
        backup: settings.backup && !args.global.no_backup,
    }
}

/// Name used in machine output envelopes
pub fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Analyze => "analyze",
        Command::Add { .. } => "add",
        Command::Service { .. } => "service",
        Command::Generate { .. } => "generate",
        Command::Templates => "templates",
        Command::Check => "check",
        Command::Restore { .. } => "restore",
        Command::Completions { .. } => "completions",
    }
}

/// Dispatch the parsed CLI command to the appropriate handler
pub fn dispatch(args: &Cli, settings: &Settings) -> Result<()> {
    let ctx = build_context(args, settings);

    match &args.command {
        Command::Analyze => commands::analyze::run(&ctx),

        Command::Add { packages, apply } => commands::add::run(&ctx, packages, *apply),

        Command::Service {
            name,
            disable,
            set,
            apply,
        } => commands::service::run(
            &ctx,
            commands::service::ServiceOptions {
                name: name.clone(),
                disable: *disable,
                set: set.clone(),
                apply: *apply,
            },
        ),

        Command::Generate {
            template,
            params,
            output,
        } => commands::generate::run(
            &ctx,
            commands::generate::GenerateOptions {
                template: template.clone(),
                params: params.clone(),
                output: output.clone(),
            },
        ),

        Command::Templates => commands::templates::run(&ctx),

        Command::Check => commands::check::run(&ctx),

        Command::Restore { backup, apply } => commands::restore::run(&ctx, backup.as_deref(), *apply),

        Command::Completions { shell } => commands::completions::run(*shell),
    }
}
