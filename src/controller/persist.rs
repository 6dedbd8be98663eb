use crate::error::{Result, SafenixError};
use crate::ui;
use crate::utils::paths;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Replace `path` with `content` atomically: write a temp file in the same
/// directory, fsync it, rename it over the target, then sync the directory.
/// Permissions of an existing target carry over.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = paths::parent_dir(path);
    let name = paths::file_name(path)?;
    let tmp_path = dir.join(format!(".{}.tmp.{}", name, std::process::id()));
    let permissions = fs::metadata(path).ok().map(|m| m.permissions());

    let mut tmp_file = fs::File::create(&tmp_path).map_err(io_err(&tmp_path))?;
    let written = tmp_file
        .write_all(content.as_bytes())
        .and_then(|_| tmp_file.sync_all());
    drop(tmp_file);

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(&tmp_path)(e));
    }

    if let Some(permissions) = permissions
        && let Err(e) = fs::set_permissions(&tmp_path, permissions)
    {
        ui::warning(&format!("Failed to carry permissions over to {}: {}", path.display(), e));
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(path)(e));
    }

    if let Ok(dir_file) = fs::File::open(&dir)
        && let Err(e) = dir_file.sync_all()
    {
        ui::warning(&format!("Failed to sync directory {}: {}", dir.display(), e));
    }

    ui::debug(&format!("Wrote {} bytes to {}", content.len(), path.display()));
    Ok(())
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SafenixError {
    let path = path.to_path_buf();
    move |source| SafenixError::IoError { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn replaces_content_and_leaves_no_temp_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("configuration.nix");
        fs::write(&path, "{ }\n").expect("write");

        write_atomic(&path, "{ a = 1; }\n").expect("atomic write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "{ a = 1; }\n");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("configuration.nix");
        fs::write(&path, "{ }\n").expect("write");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).expect("chmod");

        write_atomic(&path, "{ b = 2; }\n").expect("atomic write");

        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nope").join("configuration.nix");
        assert!(matches!(
            write_atomic(&path, "{ }\n"),
            Err(SafenixError::IoError { .. })
        ));
    }
}
