use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Filesystem operations the reconciler needs. Lookup, listing and
/// relocation all go through this so they can run against an in-memory
/// double.
pub trait FileStore {
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }
    /// Non-directory entries directly under `dir`, sorted by path.
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn write(&mut self, path: &Path, contents: &str) -> Result<()>;
    fn create_dir_all(&mut self, path: &Path) -> Result<()>;
    fn rename(&mut self, from: &Path, to: &Path) -> Result<()>;
}

/// Files in `dir` named `<key>.<anything>`.
pub fn files_for_key(store: &dyn FileStore, dir: &Path, key: &str) -> Result<Vec<PathBuf>> {
    let prefix = format!("{key}.");
    Ok(store
        .list_files(dir)?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with(&prefix))
        })
        .collect())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl FileStore for FsStore {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let read_dir =
            fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
        let mut out = Vec::new();
        for entry in read_dir {
            let path = entry?.path();
            if !path.is_dir() {
                out.push(path);
            }
        }
        out.sort();
        Ok(out)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }

    fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
    }

    fn create_dir_all(&mut self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("failed to create {}", path.display()))
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(rename_err) if rename_err.kind() == ErrorKind::CrossesDevices => {
                fs::copy(from, to).with_context(|| {
                    format!("failed to copy {} to {}", from.display(), to.display())
                })?;
                fs::remove_file(from)
                    .with_context(|| format!("failed to remove {}", from.display()))?;
                Ok(())
            }
            Err(rename_err) => Err(rename_err).with_context(|| {
                format!("failed to move {} to {}", from.display(), to.display())
            }),
        }
    }
}
