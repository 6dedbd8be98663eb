use crate::config::Settings;
use crate::constants::{DEFAULT_TARGET, PROJECT_NAME, PROJECT_ORG, PROJECT_QUALIFIER};
use crate::error::{Result, SafenixError};
use crate::project_identity;
use directories::{ProjectDirs, UserDirs};
use std::path::{Path, PathBuf};

pub fn expand_home(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();

    if !path_str.starts_with('~') {
        return Ok(path.to_path_buf());
    }

    let user_dirs = UserDirs::new()
        .ok_or_else(|| SafenixError::PathError("Could not determine user home directory".to_string()))?;

    let home = user_dirs.home_dir();

    if path_str == "~" {
        return Ok(home.to_path_buf());
    }

    let stripped = path_str
        .strip_prefix("~/")
        .ok_or_else(|| SafenixError::PathError(format!("Invalid path format: {}", path_str)))?;

    Ok(home.join(stripped))
}

pub fn config_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from(PROJECT_QUALIFIER, PROJECT_ORG, PROJECT_NAME)
        .ok_or_else(|| SafenixError::PathError("Could not determine config directory".to_string()))?;
    Ok(proj.config_dir().to_path_buf())
}

pub fn settings_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(project_identity::SETTINGS_FILE_BASENAME))
}

/// Name of the variable that overrides the target document
pub fn target_env_key() -> String {
    project_identity::env_key("CONFIG")
}

/// Pick the document to operate on.
///
/// Precedence: explicit flag, then `SAFENIX_CONFIG`, then the settings
/// file, then `/etc/nixos/configuration.nix`.
pub fn resolve_target(flag: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    let env = std::env::var_os(target_env_key()).map(PathBuf::from);
    resolve_target_with(flag, env.as_deref(), settings)
}

pub(crate) fn resolve_target_with(flag: Option<&Path>, env: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    let chosen = flag
        .map(Path::to_path_buf)
        .or_else(|| env.filter(|p| !p.as_os_str().is_empty()).map(Path::to_path_buf))
        .or_else(|| settings.target.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET));
    expand_home(&chosen)
}

/// Sidecar lock path for `target`: `.<name>.lock` in the same directory
pub fn lock_path(target: &Path) -> Result<PathBuf> {
    let name = file_name(target)?;
    Ok(parent_dir(target).join(format!(".{}.lock", name)))
}

pub fn file_name(target: &Path) -> Result<String> {
    target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| SafenixError::PathError(format!("'{}' does not name a file", target.display())))
}

/// Directory containing `target` (`.` for bare file names)
pub fn parent_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
