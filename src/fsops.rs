use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// Result of a filesystem operation.
pub struct OpResult {
    pub bytes_copied: u64,
    pub final_dst: PathBuf,
}

/// Create a directory and any missing parents.
pub fn mkdir(dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))
}

fn ensure_parent(dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

fn refuse_existing(dst: &Path) -> Result<()> {
    if std::fs::symlink_metadata(dst).is_ok() {
        bail!("destination already exists: {}", dst.display());
    }
    Ok(())
}

/// Check if two paths are on the same filesystem.
#[cfg(unix)]
fn same_filesystem(src: &Path, dst: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;
    let src_meta = std::fs::metadata(src).context("failed to stat source")?;
    let dst_parent = dst.parent().unwrap_or_else(|| Path::new("."));
    let dst_parent_meta =
        std::fs::metadata(dst_parent).context("failed to stat destination parent")?;
    Ok(src_meta.dev() == dst_parent_meta.dev())
}

#[cfg(not(unix))]
fn same_filesystem(_src: &Path, _dst: &Path) -> Result<bool> {
    // Let rename try first; it fails cleanly across volumes.
    Ok(true)
}

/// Move a file or directory, creating the destination's parents.
pub fn mv(src: &Path, dst: &Path) -> Result<OpResult> {
    refuse_existing(dst)?;
    ensure_parent(dst)?;
    if same_filesystem(src, dst)? && std::fs::rename(src, dst).is_ok() {
        return Ok(OpResult {
            bytes_copied: 0,
            final_dst: dst.to_path_buf(),
        });
    }
    // Cross-device: copy, then remove the source.
    let metadata = std::fs::metadata(src).context("source not found")?;
    let bytes = cp(src, dst)?.bytes_copied;
    if metadata.is_dir() {
        std::fs::remove_dir_all(src)?;
    } else {
        std::fs::remove_file(src)?;
    }
    Ok(OpResult {
        bytes_copied: bytes,
        final_dst: dst.to_path_buf(),
    })
}

/// Copy a file or directory tree.
pub fn cp(src: &Path, dst: &Path) -> Result<OpResult> {
    refuse_existing(dst)?;
    ensure_parent(dst)?;
    let metadata = std::fs::metadata(src).context("source not found")?;
    let bytes = if metadata.is_file() {
        std::fs::copy(src, dst).context("copy failed")?
    } else if metadata.is_dir() {
        let mut options = fs_extra::dir::CopyOptions::new();
        options.copy_inside = true;
        fs_extra::dir::copy(src, dst, &options).context("directory copy failed")?
    } else {
        bail!("unsupported file type: {:?}", metadata.file_type());
    };
    Ok(OpResult {
        bytes_copied: bytes,
        final_dst: dst.to_path_buf(),
    })
}

/// Move `src` into `trash_dir`, keeping its file name.
pub fn trash(src: &Path, trash_dir: &Path) -> Result<OpResult> {
    let name = src
        .file_name()
        .with_context(|| format!("cannot trash {}", src.display()))?;
    mv(src, &trash_dir.join(name))
}

/// Remove something this tool created (file or directory tree).
pub fn remove_created(path: &Path) -> Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(_) => return Ok(()),
    };
    if metadata.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn mv_creates_parents_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "A").unwrap();
        let dst = dir.path().join("deep/er/a.txt");

        mv(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "A");

        fs::write(&src, "B").unwrap();
        assert!(mv(&src, &dst).is_err());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "A");
    }

    #[test]
    fn cp_copies_directory_trees() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("proj");
        fs::create_dir_all(src.join("src")).unwrap();
        fs::write(src.join("src/main.rs"), "fn main() {}").unwrap();
        let dst = dir.path().join("copy");

        cp(&src, &dst).unwrap();
        assert!(src.join("src/main.rs").exists());
        assert_eq!(fs::read_to_string(dst.join("src/main.rs")).unwrap(), "fn main() {}");
    }

    #[test]
    fn trash_keeps_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("old.log");
        fs::write(&src, "x").unwrap();
        let result = trash(&src, &dir.path().join("trash/1")).unwrap();
        assert_eq!(result.final_dst, dir.path().join("trash/1/old.log"));
        assert!(result.final_dst.exists());
    }
}
