use crate::constants::LOCK_TIMEOUT_SECONDS;
use crate::error::{Result, SafenixError};
use crate::ui;
use crate::utils::paths;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Exclusive advisory lock on a document, held through a sidecar
/// `.<name>.lock` file.
///
/// The sidecar is locked in place and never deleted: removing it would let a
/// process still holding the old inode and one that created a fresh file both
/// believe they own the lock. Dropping the guard only unlocks.
#[derive(Debug)]
pub struct DocumentLock {
    file: File,
    path: PathBuf,
}

impl DocumentLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub fn acquire(target: &Path) -> Result<DocumentLock> {
    let lock_path = paths::lock_path(target)?;

    let age_secs = fs::metadata(&lock_path)
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map(|age| age.as_secs());

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| SafenixError::IoError {
            path: lock_path.clone(),
            source: e,
        })?;

    if file.try_lock_exclusive().is_err() {
        if age_secs.is_some_and(|age| age > LOCK_TIMEOUT_SECONDS) {
            ui::warning(&format!(
                "Lock {} is older than {} seconds but still held",
                lock_path.display(),
                LOCK_TIMEOUT_SECONDS
            ));
        }
        return Err(SafenixError::LockContention {
            target: target.to_path_buf(),
            lock_path,
        });
    }

    if age_secs.is_some() {
        ui::debug(&format!("Reusing unlocked sidecar {}", lock_path.display()));
    }

    // Only the holder rewrites the pid
    if file.set_len(0).is_ok() {
        let _ = writeln!(file, "{}", std::process::id());
    }
    ui::debug(&format!("Acquired lock {}", lock_path.display()));

    Ok(DocumentLock { file, path: lock_path })
}

/// Lock for one controller cycle. A dry run never writes, so when the
/// sidecar cannot be created (read-only directory) it runs unlocked.
/// Contention is an error either way.
pub fn acquire_for_cycle(target: &Path, will_write: bool) -> Result<Option<DocumentLock>> {
    match acquire(target) {
        Ok(lock) => Ok(Some(lock)),
        Err(err @ SafenixError::LockContention { .. }) => Err(err),
        Err(err) if !will_write => {
            ui::debug(&format!("Dry run without lock: {}", err));
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
