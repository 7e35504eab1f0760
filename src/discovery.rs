//! Document discovery and the shared directory walk.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::config::Config;

/// Enumerate documents under `root` in lexicographic order.
///
/// A file root yields itself regardless of extension. A directory root yields
/// every file with the configured extension that passes the config's
/// include/exclude filters, skipping hidden and excluded directories.
/// The iterator is lazy; calling again restarts the walk.
pub fn documents<'a>(root: &'a Path, config: &'a Config) -> impl Iterator<Item = PathBuf> + 'a {
    let single_file = root.is_file();
    return walk(root, config)
        .filter(|entry| return !entry.file_type().is_dir())
        .filter(move |entry| return single_file || has_extension(entry.path(), &config.extension))
        .filter(move |entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            return single_file || config.should_scan(&relative.to_string_lossy());
        })
        .map(DirEntry::into_path);
}

/// Whether `path` ends in `.{extension}`.
fn has_extension(path: &Path, extension: &str) -> bool {
    return path.extension().is_some_and(|ext| return ext == extension);
}

/// Whether the walk should descend into (or yield) this entry.
/// The root itself is always kept so temporary or dot-prefixed roots still work.
fn is_walkable(entry: &DirEntry, config: &Config) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return false;
    }
    return !config.excluded_dirs.iter().any(|d| return d.as_str() == name.as_ref());
}

/// Walk `root` in sorted order, pruning hidden and excluded directories.
/// Unreadable entries are logged and skipped.
pub fn walk<'a>(root: &'a Path, config: &'a Config) -> impl Iterator<Item = DirEntry> + 'a {
    return WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| return is_walkable(entry, config))
        .filter_map(|result| {
            return match result {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("skipping unreadable entry: {e}");
                    None
                },
            };
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a file (and its parents) with the given contents.
    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "# doc\n").unwrap();
    }

    #[test]
    fn skips_hidden_and_vendor_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "guide/intro.md");
        touch(root, ".vitepress/theme.md");
        touch(root, "node_modules/pkg/README.md");
        touch(root, "guide/notes.txt");
        touch(root, "README.md");

        let config = Config::default();
        let found: Vec<PathBuf> = documents(root, &config)
            .map(|p| return p.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(found, vec![PathBuf::from("README.md"), PathBuf::from("guide/intro.md")]);
    }

    #[test]
    fn order_is_stable_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in ["b.md", "a.md", "c/z.md", "c/a.md"] {
            touch(root, name);
        }
        let config = Config::default();

        let first: Vec<PathBuf> = documents(root, &config).collect();
        let second: Vec<PathBuf> = documents(root, &config).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        assert!(first.first().unwrap().ends_with("a.md"));
    }

    #[test]
    fn single_file_root_yields_itself() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "page.markdown");
        let file = dir.path().join("page.markdown");
        let config = Config::default();

        let found: Vec<PathBuf> = documents(&file, &config).collect();
        assert_eq!(found, vec![file]);
    }

    #[test]
    fn honors_include_filter() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "guide/a.md");
        touch(root, "api/b.md");
        let config = Config::parse("include = [\"api/\"]").unwrap();

        let found: Vec<PathBuf> = documents(root, &config).collect();
        assert_eq!(found, vec![root.join("api/b.md")]);
    }
}
