use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "safenix",
    about = "Safe, minimally-invasive edits to NixOS configuration.nix",
    long_about = "Add packages, toggle services and generate configurations without \
                  disturbing the formatting, comments or structure of the rest of the file. \
                  Every edit is a dry run until --apply is given.",
    version,
    next_line_help = false,
    term_width = 80
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Parser, Debug)]
pub struct GlobalFlags {
    /// Document to operate on (overrides SAFENIX_CONFIG and settings)
    #[arg(long, value_name = "PATH", global = true)]
    pub file: Option<PathBuf>,

    /// Output format
    #[arg(long, value_name = "FORMAT", value_parser = ["text", "json", "yaml"], global = true)]
    pub format: Option<String>,

    /// Color output
    #[arg(long, value_name = "WHEN", value_parser = ["auto", "always", "never"], global = true)]
    pub color: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Quiet mode
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,

    /// Apply edits even when they conflict with enabled services or packages
    #[arg(short = 'f', long, global = true)]
    pub force: bool,

    /// Do not keep a timestamped backup before writing
    #[arg(long, global = true)]
    pub no_backup: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the structure of the configuration
    Analyze,

    /// Add packages to environment.systemPackages
    Add {
        /// Package attribute names (e.g. htop, pkgs.ripgrep)
        #[arg(required = true, value_name = "PACKAGE")]
        packages: Vec<String>,

        /// Write the change instead of previewing it
        #[arg(long)]
        apply: bool,
    },

    /// Enable, disable or configure a service
    Service {
        /// Service name under `services` (e.g. openssh, xserver.desktopManager.gnome)
        name: String,

        /// Disable instead of enable
        #[arg(long)]
        disable: bool,

        /// Set an attribute on the service (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Write the change instead of previewing it
        #[arg(long)]
        apply: bool,
    },

    /// Render a fresh configuration from a template
    Generate {
        /// Template name (see `safenix templates`)
        template: String,

        /// Template parameter (repeatable)
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Write to a file instead of stdout
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// List available templates and their parameters
    Templates,

    /// Check that the configuration is balanced and analyzable
    Check,

    /// Restore a backup over the document it was taken from
    Restore {
        /// Backup file; lists available backups when omitted
        backup: Option<PathBuf>,

        /// Write the restore instead of previewing it
        #[arg(long)]
        apply: bool,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests;
