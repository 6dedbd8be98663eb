//! Dry-run/apply controller.
//!
//! One cycle runs `Loaded -> Analyzed -> Validated -> Applied` under an
//! exclusive document lock. Any failure ends the cycle in `Rejected` with the
//! originating error and nothing written. A dry run stops at `Validated` and
//! only reports the diff.

pub mod backup_ops;
pub mod locking;
pub mod persist;

use crate::core::conflicts::{self, Conflict, RuleTable};
use crate::core::mutator::apply_edit;
use crate::core::query::{self, Summary};
use crate::core::types::{AttrValue, EditRequest};
use crate::core::validator::validate;
use crate::document::ConfigDocument;
use crate::document::analyzer::analyze as analyze_document;
use crate::error::{Result, SafenixError};
use crate::templates;
use crate::ui;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loaded,
    Analyzed,
    Validated,
    Applied,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Write the result; otherwise stop at `Validated`
    pub apply: bool,
    /// Proceed despite blocking conflicts
    pub force: bool,
    /// Take a timestamped backup before writing
    pub backup: bool,
    pub rules: RuleTable,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            apply: false,
            force: false,
            backup: true,
            rules: RuleTable::builtin(),
        }
    }
}

impl ControllerOptions {
    pub fn dry_run() -> Self {
        Self::default()
    }

    pub fn applying() -> Self {
        Self {
            apply: true,
            ..Self::default()
        }
    }
}

/// Outcome of one controller cycle.
#[derive(Debug, Clone, Serialize)]
pub struct EditReport {
    pub target: PathBuf,
    pub success: bool,
    pub stage: Stage,
    /// The document on disk was replaced
    pub applied: bool,
    pub changed: bool,
    pub diff: String,
    /// Non-blocking findings, plus blocking ones overridden with `force`
    pub conflicts: Vec<Conflict>,
    /// Requests that turned out to be no-ops
    pub skipped: Vec<String>,
    pub backup: Option<PathBuf>,
}

pub struct Controller {
    target: PathBuf,
    options: ControllerOptions,
    stage: Option<Stage>,
}

impl Controller {
    pub fn new(target: impl Into<PathBuf>, options: ControllerOptions) -> Self {
        Self {
            target: target.into(),
            options,
            stage: None,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Last stage reached; `None` before a cycle has started.
    pub fn stage(&self) -> Option<Stage> {
        self.stage
    }

    /// Run one cycle applying `requests` in order.
    pub fn run(&mut self, requests: &[EditRequest]) -> Result<EditReport> {
        self.stage = None;
        let result = self.cycle(requests);
        if result.is_err() {
            self.transition(Stage::Rejected);
        }
        result
    }

    fn transition(&mut self, next: Stage) {
        match self.stage {
            Some(prev) => ui::debug(&format!("stage {:?} -> {:?}", prev, next)),
            None => ui::debug(&format!("stage {:?}", next)),
        }
        self.stage = Some(next);
    }

    fn cycle(&mut self, requests: &[EditRequest]) -> Result<EditReport> {
        for request in requests {
            request.validate()?;
        }

        let _lock = locking::acquire_for_cycle(&self.target, self.options.apply)?;

        let mut doc = ConfigDocument::load(&self.target)?;
        self.transition(Stage::Loaded);

        let mut index = analyze_document(&doc)?;
        self.transition(Stage::Analyzed);

        let mut noted: Vec<Conflict> = Vec::new();
        let mut skipped = Vec::new();

        for request in requests {
            check_interrupted()?;

            let (blocking, notes): (Vec<Conflict>, Vec<Conflict>) =
                conflicts::check(&doc, &index, &self.options.rules, request)
                    .into_iter()
                    .partition(Conflict::is_blocking);

            if !blocking.is_empty() {
                if !self.options.force {
                    return Err(SafenixError::Conflict(blocking));
                }
                for conflict in &blocking {
                    ui::warning(&format!("Forcing past conflict: {}", conflict.message));
                }
                noted.extend(blocking);
            }

            if !notes.is_empty() {
                for note in &notes {
                    ui::debug(&format!("{}: {}", request, note.message));
                }
                skipped.push(request.to_string());
                noted.extend(notes);
                continue;
            }

            let outcome = apply_edit(&doc, &index, request)?;
            ui::debug(&format!("{}: {} splice(s)", request, outcome.splices.len()));
            if !outcome.changed() {
                skipped.push(request.to_string());
                continue;
            }

            validate(outcome.document.text())?;
            doc = outcome.document;
            index = analyze_document(&doc)?;
        }

        self.transition(Stage::Validated);

        let mut report = EditReport {
            target: self.target.clone(),
            success: true,
            stage: Stage::Validated,
            applied: false,
            changed: doc.is_modified(),
            diff: doc.diff(),
            conflicts: noted,
            skipped,
            backup: None,
        };

        if !self.options.apply || !report.changed {
            return Ok(report);
        }

        check_interrupted()?;
        ensure_unchanged_on_disk(&self.target, doc.original())?;

        if self.options.backup {
            report.backup = Some(backup_ops::create_backup(&self.target)?);
        }
        persist::write_atomic(&self.target, doc.text())?;

        self.transition(Stage::Applied);
        report.stage = Stage::Applied;
        report.applied = true;
        Ok(report)
    }
}

fn check_interrupted() -> Result<()> {
    if ui::is_interrupted() {
        return Err(SafenixError::Interrupted);
    }
    Ok(())
}

/// Editors that ignore the sidecar lock may have saved in the meantime.
fn ensure_unchanged_on_disk(target: &Path, original: &str) -> Result<()> {
    let current = fs::read_to_string(target).map_err(|e| SafenixError::IoError {
        path: target.to_path_buf(),
        source: e,
    })?;
    if current != original {
        return Err(SafenixError::Other(format!(
            "{} changed on disk while it was being edited; nothing was written",
            target.display()
        )));
    }
    Ok(())
}

/// Structural summary of the document at `path`.
pub fn analyze(path: &Path) -> Result<Summary> {
    let doc = ConfigDocument::load(path)?;
    let index = analyze_document(&doc)?;
    Ok(query::summarize(&index, doc.text()))
}

pub fn add_package(path: &Path, name: &str, dry_run: bool) -> Result<EditReport> {
    let options = ControllerOptions {
        apply: !dry_run,
        ..ControllerOptions::default()
    };
    Controller::new(path, options).run(&[EditRequest::add_package(name)])
}

pub fn set_service(
    path: &Path,
    name: &str,
    enabled: bool,
    attributes: BTreeMap<String, AttrValue>,
    dry_run: bool,
) -> Result<EditReport> {
    let options = ControllerOptions {
        apply: !dry_run,
        ..ControllerOptions::default()
    };
    let request = EditRequest::SetService {
        name: name.to_string(),
        enabled,
        attributes,
    };
    Controller::new(path, options).run(&[request])
}

pub fn generate(template_id: &str, params: &BTreeMap<String, String>) -> Result<String> {
    templates::generate(template_id, params)
}

/// Copy `backup` back over the document it was taken from.
///
/// The backup must pass the balance check. The current document is itself
/// backed up first when `options.backup` is set, so a restore can be undone.
pub fn restore(backup: &Path, options: &ControllerOptions) -> Result<EditReport> {
    let target = backup_ops::original_for(backup)?;
    let _lock = locking::acquire_for_cycle(&target, options.apply)?;

    let content = fs::read_to_string(backup).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SafenixError::NotFound {
            path: backup.to_path_buf(),
        },
        _ => SafenixError::IoError {
            path: backup.to_path_buf(),
            source: e,
        },
    })?;
    validate(&content)?;

    let current = match ConfigDocument::load(&target) {
        Ok(doc) => doc,
        Err(SafenixError::NotFound { .. }) => ConfigDocument::from_text(String::new()),
        Err(e) => return Err(e),
    };
    let restored = current.with_text(content);

    let mut report = EditReport {
        target: target.clone(),
        success: true,
        stage: Stage::Validated,
        applied: false,
        changed: restored.is_modified(),
        diff: restored.diff(),
        conflicts: Vec::new(),
        skipped: Vec::new(),
        backup: None,
    };

    if !options.apply || !report.changed {
        return Ok(report);
    }

    check_interrupted()?;
    if options.backup && target.exists() {
        report.backup = Some(backup_ops::create_backup(&target)?);
    }
    persist::write_atomic(&target, restored.text())?;
    report.stage = Stage::Applied;
    report.applied = true;
    Ok(report)
}
