//! Command handlers behind the CLI.

pub mod add;
pub mod analyze;
pub mod check;
pub mod completions;
pub mod generate;
pub mod restore;
pub mod service;
pub mod templates;

use crate::config::Settings;
use crate::controller::{Controller, ControllerOptions, EditReport};
use crate::core::types::EditRequest;
use crate::error::{Result, SafenixError};
use crate::project_identity;
use crate::ui as output;
use crate::utils::machine_output;
use crate::utils::paths;
use std::path::PathBuf;

/// Everything a handler needs from global flags and settings.
#[derive(Debug, Clone)]
pub struct Context {
    pub settings: Settings,
    pub file: Option<PathBuf>,
    pub format: String,
    pub yes: bool,
    pub force: bool,
    pub backup: bool,
}

impl Context {
    pub fn target(&self) -> Result<PathBuf> {
        paths::resolve_target(self.file.as_deref(), &self.settings)
    }

    pub fn is_machine(&self) -> bool {
        machine_output::is_machine_format(&self.format)
    }

    pub fn controller_options(&self, apply: bool) -> ControllerOptions {
        ControllerOptions {
            apply,
            force: self.force,
            backup: self.backup,
            rules: self.settings.rule_table(),
        }
    }
}

/// Preview `requests`, then (with `apply`) confirm and write them.
///
/// The write is a second full cycle, so anything that changed between the
/// preview and the confirmation is re-checked.
pub(crate) fn run_edit(ctx: &Context, command: &str, requests: &[EditRequest], apply: bool) -> Result<()> {
    if apply && ctx.is_machine() && !ctx.yes {
        return Err(SafenixError::Other(format!(
            "--apply with --format {} cannot prompt; add --yes",
            ctx.format
        )));
    }

    let target = ctx.target()?;
    let preview = Controller::new(&target, ctx.controller_options(false)).run(requests)?;

    if !apply || !preview.changed {
        return present(ctx, command, &preview);
    }

    if !ctx.yes {
        show_changes(&preview);
        if !output::prompt_yes_no("Apply these changes?", false) {
            output::info("Aborted; nothing was written.");
            return Ok(());
        }
    }

    let report = Controller::new(&target, ctx.controller_options(true)).run(requests)?;
    present(ctx, command, &report)
}

fn show_changes(report: &EditReport) {
    output::header(&format!("Changes to {}", report.target.display()));
    for conflict in &report.conflicts {
        output::info(&conflict.message);
    }
    output::diff(&report.diff);
}

fn present(ctx: &Context, command: &str, report: &EditReport) -> Result<()> {
    if ctx.is_machine() {
        let warnings = report.conflicts.iter().map(|c| c.message.clone()).collect();
        return machine_output::emit_v1(command, report, warnings, Vec::new(), &ctx.format);
    }

    if !report.applied {
        show_changes(report);
    }

    if !report.changed {
        output::success("Nothing to change.");
        return Ok(());
    }

    if report.applied {
        output::success(&format!("Updated {}", report.target.display()));
        if let Some(backup) = &report.backup {
            output::keyval("Backup", &backup.display().to_string());
        }
    } else {
        output::info(&format!(
            "Dry run; nothing written. Re-run with `{}` to write.",
            project_identity::cli_with(&format!("{} ... --apply", command))
        ));
    }
    Ok(())
}

/// Split `key=value`; the value may itself contain `=`.
pub(crate) fn split_assignment(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(SafenixError::Other(format!(
            "Expected KEY=VALUE, got '{}'",
            raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_assignment_keeps_value_intact() {
        assert_eq!(
            split_assignment("settings.X = a=b").expect("split"),
            ("settings.X".to_string(), " a=b".to_string())
        );
        assert!(split_assignment("novalue").is_err());
        assert!(split_assignment("=x").is_err());
    }
}
