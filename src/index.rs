//! Filename index over a project tree, built once and shared read-only.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::Config;
use crate::discovery;

/// Lazily built indexes, one per project root seen during a run.
/// Building happens under the lock, so each root is walked exactly once
/// even when documents are processed from several threads.
#[derive(Debug, Default)]
pub struct IndexCache {
    /// Finished indexes keyed by project root.
    built: Mutex<HashMap<PathBuf, Arc<ProjectIndex>>>,
}

/// Maps a bare filename to every file carrying that name under `root`.
/// Paths are absolute and kept sorted, so iteration order is reproducible.
#[derive(Debug)]
pub struct ProjectIndex {
    /// Filename to the sorted set of paths holding it.
    files: BTreeMap<OsString, BTreeSet<PathBuf>>,
    /// Directory the index was built from.
    root: PathBuf,
}

impl IndexCache {
    /// Return the index for `root`, walking the tree on first request.
    pub fn get_or_build(&self, root: &Path, config: &Config) -> Arc<ProjectIndex> {
        let mut built = self.built.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = built.get(root) {
            return Arc::clone(index);
        }
        let index = Arc::new(ProjectIndex::build(root, config));
        built.insert(root.to_path_buf(), Arc::clone(&index));
        return index;
    }
}

impl ProjectIndex {
    /// Walk `root` and record every file by name, skipping hidden and excluded directories.
    pub fn build(root: &Path, config: &Config) -> Self {
        let mut files: BTreeMap<OsString, BTreeSet<PathBuf>> = BTreeMap::new();
        for entry in discovery::walk(root, config) {
            if entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name().to_os_string();
            files.entry(name).or_default().insert(entry.into_path());
        }

        let count: usize = files.values().map(BTreeSet::len).sum();
        log::debug!("indexed {count} files under {}", root.display());
        return Self { files, root: root.to_path_buf() };
    }

    /// Number of distinct filenames.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        return self.files.len();
    }

    /// Every indexed path whose filename is exactly `name`, in sorted order.
    pub fn lookup<'a>(&'a self, name: &OsStr) -> impl Iterator<Item = &'a PathBuf> + 'a {
        return self.files.get(name).into_iter().flatten();
    }

    /// Directory the index covers.
    pub fn root(&self) -> &Path {
        return &self.root;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create an empty file and its parents.
    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn lookup_returns_all_matches_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "b/guide.md");
        touch(root, "a/guide.md");
        touch(root, "a/other.md");
        touch(root, ".git/guide.md");
        touch(root, "node_modules/x/guide.md");

        let index = ProjectIndex::build(root, &Config::default());
        let found: Vec<&PathBuf> = index.lookup(OsStr::new("guide.md")).collect();
        assert_eq!(found, vec![&root.join("a/guide.md"), &root.join("b/guide.md")]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.root(), root);
    }

    #[test]
    fn lookup_of_unknown_name_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = ProjectIndex::build(dir.path(), &Config::default());
        assert_eq!(index.lookup(OsStr::new("missing.md")).count(), 0);
    }

    #[test]
    fn cache_builds_each_root_once() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.md");
        let cache = IndexCache::default();
        let config = Config::default();

        let first = cache.get_or_build(dir.path(), &config);
        touch(dir.path(), "b.md");
        let second = cache.get_or_build(dir.path(), &config);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lookup(OsStr::new("b.md")).count(), 0);
    }
}
