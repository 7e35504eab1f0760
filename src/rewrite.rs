//! Assemble corrected document text and persist it in one write.

use std::path::Path;

use crate::error::Error;
use crate::types::{Reference, Resolution};

/// Whether a run may touch the filesystem. Fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Resolve and report only.
    DryRun,
    /// Rewrite documents whose text changed.
    Write,
}

/// Plain filesystem access, UTF-8 in and out.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

/// Where documents are read from and written back to.
pub trait DocumentStore {
    /// Read a document's full text.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, including invalid UTF-8.
    fn read(&self, path: &Path) -> std::io::Result<String>;

    /// Replace a document's full text in a single operation.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write(&self, path: &Path, contents: &str) -> std::io::Result<()>;
}

impl DocumentStore for FsStore {
    fn read(&self, path: &Path) -> std::io::Result<String> {
        return std::fs::read_to_string(path);
    }

    fn write(&self, path: &Path, contents: &str) -> std::io::Result<()> {
        return std::fs::write(path, contents);
    }
}

/// Rebuild `content` with every fixed target substituted in place.
/// Everything outside the fixed targets' spans, including the rest of each
/// construct, is copied byte for byte.
pub fn apply(content: &str, resolved: &[(Reference, Resolution)]) -> String {
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0_usize;

    for (reference, resolution) in resolved {
        let Resolution::Fixed(new_target) = resolution else {
            continue;
        };
        let span = &reference.target_span;
        let inside_construct = reference.span.start <= span.start && span.end <= reference.span.end;
        if !inside_construct || span.start < cursor {
            log::debug!("skipping inconsistent span for {} on line {}", reference.target, reference.line);
            continue;
        }
        let Some(before) = content.get(cursor..span.start) else {
            continue;
        };
        out.push_str(before);
        out.push_str(new_target);
        cursor = span.end;
    }

    out.push_str(content.get(cursor..).unwrap_or(""));
    return out;
}

/// Write `updated` over `path` when it differs from `original` and the run
/// is in write mode. Returns whether the file was written.
///
/// # Errors
///
/// Returns `Error::DocumentUnwritable` if the store rejects the write; the
/// store is only ever asked for one whole-document write.
pub fn persist(
    store: &impl DocumentStore,
    path: &Path,
    original: &str,
    updated: &str,
    mode: Mode,
) -> Result<bool, Error> {
    if original == updated || mode == Mode::DryRun {
        return Ok(false);
    }
    store.write(path, updated).map_err(|source| {
        return Error::DocumentUnwritable { path: path.to_path_buf(), source };
    })?;
    log::info!("updated {}", path.display());
    return Ok(true);
}
