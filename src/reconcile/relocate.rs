use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::logging::LogSink;
use crate::reconcile::store::{FileStore, files_for_key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// First free name for `src` inside `dest_dir`: the original name, then
/// `<stem>_1<ext>`, `<stem>_2<ext>`, and so on.
pub fn unique_destination(store: &dyn FileStore, src: &Path, dest_dir: &Path) -> PathBuf {
    let file_name = src.file_name().unwrap_or(src.as_os_str());
    let direct = dest_dir.join(file_name);
    if !store.exists(&direct) {
        return direct;
    }

    let stem = src
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = src
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut i = 1u64;
    loop {
        let candidate = dest_dir.join(format!("{stem}_{i}{suffix}"));
        if !store.exists(&candidate) {
            return candidate;
        }
        i += 1;
    }
}

/// Moves every file in `records_dir` belonging to `key` into `dest_dir`,
/// creating it on demand. Existing files in `dest_dir` are never replaced.
/// With `dry_run` the plan is computed and logged but nothing moves.
pub fn relocate_key(
    store: &mut dyn FileStore,
    records_dir: &Path,
    key: &str,
    dest_dir: &Path,
    dry_run: bool,
    log: &mut dyn LogSink,
) -> Result<Vec<Relocation>> {
    let sources = files_for_key(store, records_dir, key)?;
    if !dry_run && !sources.is_empty() {
        store.create_dir_all(dest_dir)?;
    }

    let mut moved = Vec::with_capacity(sources.len());
    for src in sources {
        let dest = unique_destination(store, &src, dest_dir);
        if dry_run {
            log.info(
                "relocate",
                Some(key),
                format!("Dry-run: would move {} -> {}", src.display(), dest.display()),
            );
        } else {
            store.rename(&src, &dest)?;
            log.info(
                "relocate",
                Some(key),
                format!("Moved {} -> {}", src.display(), dest.display()),
            );
        }
        moved.push(Relocation { from: src, to: dest });
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use crate::reconcile::store::memory::MemoryStore;

    #[test]
    fn collision_gets_numeric_suffix_and_original_survives() {
        let mut store = MemoryStore::with_dirs(&["/records", "/records/Dupes"]);
        store.put("/records/7.json", "new");
        store.put("/records/Dupes/7.json", "old");
        store.put("/records/Dupes/7_1.json", "older");
        let mut log = MemorySink::default();

        let moved = relocate_key(
            &mut store,
            Path::new("/records"),
            "7",
            Path::new("/records/Dupes"),
            false,
            &mut log,
        )
        .unwrap();

        assert_eq!(moved[0].to, PathBuf::from("/records/Dupes/7_2.json"));
        assert_eq!(store.get("/records/Dupes/7.json"), Some("old"));
        assert_eq!(store.get("/records/Dupes/7_1.json"), Some("older"));
        assert_eq!(store.get("/records/Dupes/7_2.json"), Some("new"));
        assert!(store.get("/records/7.json").is_none());
    }

    #[test]
    fn all_sibling_files_move_and_destination_is_created() {
        let mut store = MemoryStore::with_dirs(&["/records"]);
        store.put("/records/123.json", "{}");
        store.put("/records/123.pdf", "%PDF");
        store.put("/records/124.json", "{}");
        let mut log = MemorySink::default();

        let moved = relocate_key(
            &mut store,
            Path::new("/records"),
            "123",
            Path::new("/records/Scope"),
            false,
            &mut log,
        )
        .unwrap();

        assert_eq!(moved.len(), 2);
        assert!(store.is_dir(Path::new("/records/Scope")));
        assert_eq!(store.get("/records/Scope/123.pdf"), Some("%PDF"));
        assert_eq!(store.get("/records/124.json"), Some("{}"));
    }

    #[test]
    fn dry_run_leaves_store_untouched() {
        let mut store = MemoryStore::with_dirs(&["/records"]);
        store.put("/records/5.json", "{}");
        let before = store.clone();
        let mut log = MemorySink::default();

        let planned = relocate_key(
            &mut store,
            Path::new("/records"),
            "5",
            Path::new("/records/Scope"),
            true,
            &mut log,
        )
        .unwrap();

        assert_eq!(planned[0].to, PathBuf::from("/records/Scope/5.json"));
        assert_eq!(store, before);
        assert!(log.events[0].detail.starts_with("Dry-run: would move"));
    }

    #[test]
    fn extensionless_collision_has_no_trailing_dot() {
        let mut store = MemoryStore::with_dirs(&["/d"]);
        store.put("/d/notes", "x");
        let dest = unique_destination(&store, Path::new("/src/notes"), Path::new("/d"));
        assert_eq!(dest, PathBuf::from("/d/notes_1"));
    }
}
