//! Timestamped document backups: `configuration.nix.bak.YYYYmmdd_HHMMSS`.

use crate::constants::{BACKUP_SUFFIX, MAX_BACKUPS};
use crate::error::{Result, SafenixError};
use crate::ui;
use crate::utils::paths;
use std::fs;
use std::path::{Path, PathBuf};

fn backup_prefix(target: &Path) -> Result<String> {
    Ok(format!("{}.{}.", paths::file_name(target)?, BACKUP_SUFFIX))
}

/// Copy `target` to a new timestamped sibling and prune old copies.
pub fn create_backup(target: &Path) -> Result<PathBuf> {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let dir = paths::parent_dir(target);
    let prefix = backup_prefix(target)?;

    // Same-second backups count upwards past any pruned ones so names keep sorting by age
    let stem = format!("{}{}", prefix, timestamp);
    let taken = list_backups(target)?
        .iter()
        .filter_map(|p| p.file_name()?.to_str()?.strip_prefix(&stem).map(str::to_string))
        .map(|rest| rest.strip_prefix('_').and_then(|n| n.parse::<usize>().ok()).unwrap_or(0))
        .max();
    let backup_path = match taken {
        None => dir.join(&stem),
        Some(n) => dir.join(format!("{}_{:02}", stem, n + 1)),
    };

    fs::copy(target, &backup_path).map_err(|e| {
        SafenixError::BackupError(format!("Failed to back up {}: {}", target.display(), e))
    })?;
    ui::debug(&format!("Backup written to {}", backup_path.display()));

    prune_backups(target, MAX_BACKUPS)?;
    Ok(backup_path)
}

/// Existing backups of `target`, oldest first.
pub fn list_backups(target: &Path) -> Result<Vec<PathBuf>> {
    let dir = paths::parent_dir(target);
    let prefix = backup_prefix(target)?;

    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SafenixError::IoError { path: dir, source: e }),
    };

    let mut backups: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_prefix(&prefix))
                .is_some_and(is_timestamp)
        })
        .map(|entry| entry.path())
        .collect();
    backups.sort();
    Ok(backups)
}

fn is_timestamp(stamp: &str) -> bool {
    let base = stamp.split('_').take(2).collect::<Vec<_>>();
    matches!(base.as_slice(), [date, time]
        if date.len() == 8 && time.len() == 6
            && date.bytes().chain(time.bytes()).all(|b| b.is_ascii_digit()))
}

/// Delete the oldest backups beyond `keep`; returns what was removed.
pub fn prune_backups(target: &Path, keep: usize) -> Result<Vec<PathBuf>> {
    let backups = list_backups(target)?;
    let excess = backups.len().saturating_sub(keep);

    let mut removed = Vec::new();
    for old in backups.into_iter().take(excess) {
        match fs::remove_file(&old) {
            Ok(()) => removed.push(old),
            Err(e) => ui::warning(&format!("Failed to remove old backup {}: {}", old.display(), e)),
        }
    }
    Ok(removed)
}

/// The document a backup was taken from.
pub fn original_for(backup: &Path) -> Result<PathBuf> {
    let file_name = backup
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SafenixError::BackupError("Invalid backup path".to_string()))?;

    let marker = format!(".{}.", BACKUP_SUFFIX);
    let original_name = file_name
        .rfind(&marker)
        .filter(|&at| at > 0 && is_timestamp(&file_name[at + marker.len()..]))
        .map(|at| &file_name[..at])
        .ok_or_else(|| {
            SafenixError::BackupError(format!(
                "'{}' is not a backup name (expected <file>.{}.YYYYmmdd_HHMMSS)",
                file_name, BACKUP_SUFFIX
            ))
        })?;

    Ok(paths::parent_dir(backup).join(original_name))
}
