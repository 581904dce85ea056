use std::{fs::{self, File}, path::Path};

use anyhow::{bail, Context, Result};
use tempfile::NamedTempFile;

/// Reject `-` as an output path; results are always written to files.
pub fn assert_not_stdout(path: &Path) -> Result<()> {
    if path == Path::new("-") {
        bail!("stdout is not supported; provide a real file path.");
    }
    Ok(())
}

/// Create `dir` (and parents) unless it is already a directory.
pub fn ensure_dir_exists(dir: &Path) -> Result<()> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => bail!("[io::fs::ensure_dir_exists] {} is a file, expected an output directory", dir.display()),
        Err(_) => fs::create_dir_all(dir)
            .with_context(|| format!("[io::fs::ensure_dir_exists] Cannot create output directory {}", dir.display())),
    }
}

/// Check that an input directory is present.
pub fn require_dir_exists(dir: &Path) -> Result<()> {
    let meta = fs::metadata(dir)
        .with_context(|| format!("[io::fs::require_dir_exists] Input directory {} is missing", dir.display()))?;
    if !meta.is_dir() {
        bail!("[io::fs::require_dir_exists] {} is a file, expected an input directory", dir.display());
    }
    Ok(())
}

/// Write through a temp file in the target's directory, then rename over `target`,
/// so readers never see a partial output.
pub fn write_atomic(target: &Path, write: impl FnOnce(&mut File) -> Result<()>) -> Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir_exists(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all().ok();
    tmp.persist(target)
        .with_context(|| format!("Failed to rename temp file to {}", target.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn stdout_path_is_rejected() {
        assert!(assert_not_stdout(Path::new("-")).is_err());
        assert!(assert_not_stdout(Path::new("out.geojson")).is_ok());
    }

    #[test]
    fn directories_are_created_and_checked() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        assert!(require_dir_exists(&nested).is_err());
        ensure_dir_exists(&nested).unwrap();
        require_dir_exists(&nested).unwrap();

        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(ensure_dir_exists(&file).is_err());
        let err = require_dir_exists(&file).unwrap_err();
        assert!(err.to_string().contains("expected an input directory"));
    }

    #[test]
    fn atomic_write_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out/result.txt");
        write_atomic(&target, |f| Ok(f.write_all(b"first")?)).unwrap();
        write_atomic(&target, |f| Ok(f.write_all(b"second")?)).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
    }

    #[test]
    fn failed_write_leaves_no_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("result.txt");
        assert!(write_atomic(&target, |_| bail!("boom")).is_err());
        assert!(!target.exists());
    }
}
