use super::Context;
use crate::controller::{self, backup_ops};
use crate::error::{Result, SafenixError};
use crate::ui as output;
use crate::utils::machine_output;
use std::path::Path;

pub fn run(ctx: &Context, backup: Option<&Path>, apply: bool) -> Result<()> {
    let Some(backup) = backup else {
        return list(ctx);
    };

    if apply && ctx.is_machine() && !ctx.yes {
        return Err(SafenixError::Other(format!(
            "--apply with --format {} cannot prompt; add --yes",
            ctx.format
        )));
    }

    let preview = controller::restore(backup, &ctx.controller_options(false))?;
    if !apply || !preview.changed {
        if ctx.is_machine() {
            return machine_output::emit_v1("restore", &preview, Vec::new(), Vec::new(), &ctx.format);
        }
        output::header(&format!("Restore {} from {}", preview.target.display(), backup.display()));
        if preview.changed {
            output::diff(&preview.diff);
            output::info("Dry run; nothing written. Re-run with --apply to restore.");
        } else {
            output::success("Document already matches the backup.");
        }
        return Ok(());
    }

    if !ctx.yes {
        output::diff(&preview.diff);
        if !output::prompt_yes_no("Restore this backup?", false) {
            output::info("Aborted; nothing was written.");
            return Ok(());
        }
    }

    let report = controller::restore(backup, &ctx.controller_options(true))?;
    if ctx.is_machine() {
        return machine_output::emit_v1("restore", &report, Vec::new(), Vec::new(), &ctx.format);
    }
    output::success(&format!("Restored {}", report.target.display()));
    if let Some(previous) = &report.backup {
        output::keyval("Previous version", &previous.display().to_string());
    }
    Ok(())
}

fn list(ctx: &Context) -> Result<()> {
    let target = ctx.target()?;
    let backups = backup_ops::list_backups(&target)?;

    if ctx.is_machine() {
        return machine_output::emit_v1("restore", &backups, Vec::new(), Vec::new(), &ctx.format);
    }

    if backups.is_empty() {
        output::info(&format!("No backups of {}", target.display()));
        return Ok(());
    }
    output::header(&format!("Backups of {} (oldest first)", target.display()));
    for backup in &backups {
        output::indent(&backup.display().to_string(), 1);
    }
    Ok(())
}
