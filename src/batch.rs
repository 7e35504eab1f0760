//! Drive discovery, extraction, resolution, and rewrite across a target,
//! folding per-document results into a run report.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::discovery;
use crate::error::Error;
use crate::index::IndexCache;
use crate::resolver::{DocumentContext, Resolver};
use crate::rewrite::{self, DocumentStore, Mode};
use crate::scanner;
use crate::types::{
    BrokenReference, DocumentFailure, DocumentReport, FixedReference, Reference, Resolution,
    RunStatistics,
};

/// Aggregate outcome of one run over a file or directory.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Reports for every document that could be read, in discovery order.
    pub documents: Vec<DocumentReport>,
    /// Whether the run was allowed to write.
    pub dry_run: bool,
    /// Documents skipped because they could not be read.
    pub failures: Vec<DocumentFailure>,
    /// Sum of every document's statistics.
    pub stats: RunStatistics,
    /// Canonical run root.
    pub target: PathBuf,
}

impl RunReport {
    /// Every reference still unresolved, in document order.
    pub fn broken(&self) -> impl Iterator<Item = &BrokenReference> {
        return self.documents.iter().flat_map(|d| return d.broken.iter());
    }

    /// Documents rewritten on disk.
    pub fn modified(&self) -> impl Iterator<Item = &DocumentReport> {
        return self.documents.iter().filter(|d| return d.modified);
    }

    /// A run succeeds iff no broken reference remains anywhere.
    pub const fn succeeded(&self) -> bool {
        return self.stats.broken == 0;
    }

    /// Documents whose rewrite could not be persisted.
    pub fn unwritable(&self) -> impl Iterator<Item = &DocumentReport> {
        return self.documents.iter().filter(|d| return d.write_error.is_some());
    }
}

/// Resolve every reference in one document and persist the result.
///
/// # Errors
///
/// Returns `Error::DocumentUnreadable` if the document cannot be read.
/// A failed write is recorded in the report instead of returned, so the
/// resolutions are still visible.
pub fn process_document(
    document: &Path,
    run_root: &Path,
    config: &Config,
    mode: Mode,
    indexes: &IndexCache,
    store: &impl DocumentStore,
) -> Result<DocumentReport, Error> {
    let content = store.read(document).map_err(|source| {
        return Error::DocumentUnreadable { path: document.to_path_buf(), source };
    })?;

    let context = DocumentContext::discover(document, run_root, config);
    let resolver = Resolver::new(config, &context, indexes);

    let resolved: Vec<(Reference, Resolution)> = scanner::extract_references(&content)
        .into_iter()
        .map(|reference| {
            let resolution = resolver.resolve(&reference.target);
            log::trace!("{}:{} {:?} {:?} -> {resolution:?}", document.display(), reference.line, reference.kind, reference.label);
            return (reference, resolution);
        })
        .collect();

    let mut report = summarize(document, &resolved);
    let updated = rewrite::apply(&content, &resolved);

    match rewrite::persist(store, document, &content, &updated, mode) {
        Ok(written) => report.modified = written,
        Err(e) => {
            log::error!("{e}");
            report.write_error = Some(e.to_string());
        },
    }
    return Ok(report);
}

/// Run the pipeline over `target`, a single document or a directory tree.
///
/// # Errors
///
/// Returns `Error::TargetNotFound` if `target` does not exist. Failures on
/// individual documents never abort the run; they land in the report.
pub fn run(target: &Path, config: &Config, mode: Mode, store: &impl DocumentStore) -> Result<RunReport, Error> {
    let target = target.canonicalize().map_err(|_err| {
        return Error::TargetNotFound { path: target.to_path_buf() };
    })?;
    let run_root = if target.is_file() {
        target.parent().map_or_else(|| return target.clone(), Path::to_path_buf)
    } else {
        target.clone()
    };

    let indexes = IndexCache::default();
    let mut documents = Vec::new();
    let mut failures = Vec::new();

    for document in discovery::documents(&target, config) {
        log::debug!("processing {}", document.display());
        match process_document(&document, &run_root, config, mode, &indexes, store) {
            Ok(report) => documents.push(report),
            Err(e) => {
                log::error!("{e}");
                failures.push(DocumentFailure { document, reason: e.to_string() });
            },
        }
    }

    let stats = documents
        .iter()
        .fold(RunStatistics::default(), |acc, d| return acc.merge(d.stats));
    log::info!(
        "{} documents, {} references, {} broken, {} fixed",
        documents.len(),
        stats.total,
        stats.broken,
        stats.fixed
    );

    return Ok(RunReport { documents, dry_run: mode == Mode::DryRun, failures, stats, target });
}

/// Count resolutions and collect the fixed and broken references of one document.
fn summarize(document: &Path, resolved: &[(Reference, Resolution)]) -> DocumentReport {
    let mut stats = RunStatistics::default();
    let mut broken = Vec::new();
    let mut fixed = Vec::new();

    for (reference, resolution) in resolved {
        stats.record(resolution);
        match resolution {
            Resolution::Broken => {
                log::warn!("{}:{}: broken reference {}", document.display(), reference.line, reference.target);
                broken.push(BrokenReference {
                    document: document.to_path_buf(),
                    line: reference.line,
                    target: reference.target.clone(),
                });
            },
            Resolution::Fixed(new_target) => {
                if let Some(fragment) = reference.fragment() {
                    debug_assert!(new_target.ends_with(fragment), "fragment must survive a rewrite");
                }
                fixed.push(FixedReference {
                    line: reference.line,
                    new_target: new_target.clone(),
                    old_target: reference.target.clone(),
                });
            },
            Resolution::External | Resolution::Valid => {},
        }
    }

    return DocumentReport {
        broken,
        document: document.to_path_buf(),
        fixed,
        modified: false,
        stats,
        write_error: None,
    };
}
