/// Core domain types: extracted references, resolution outcomes, per-document results.
use std::ops::Range;
use std::path::PathBuf;

use serde::Serialize;

/// A local reference that resolves nowhere in the project tree.
/// Left unchanged in the document and surfaced for manual attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenReference {
    /// Document containing the reference.
    pub document: PathBuf,
    /// One-based line number of the reference.
    pub line: usize,
    /// The target exactly as written.
    pub target: String,
}

/// Everything learned while processing one document.
/// Immutable once built; the batch folds these into run totals.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    /// References that could not be resolved.
    pub broken: Vec<BrokenReference>,
    /// The document this report describes.
    pub document: PathBuf,
    /// Rewrites applied (or, in a dry run, that would be applied).
    pub fixed: Vec<FixedReference>,
    /// Whether the document was rewritten on disk.
    pub modified: bool,
    /// Counters for this document alone.
    pub stats: RunStatistics,
    /// Set when the rewritten text could not be persisted; the file is untouched.
    pub write_error: Option<String>,
}

/// A document that was skipped because it could not be read.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    /// The unreadable document.
    pub document: PathBuf,
    /// Human-readable cause.
    pub reason: String,
}

/// One rewritten target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixedReference {
    /// One-based line number of the reference.
    pub line: usize,
    /// Replacement target, fragment included.
    pub new_target: String,
    /// Original target, fragment included.
    pub old_target: String,
}

/// A link-like construct found in document text.
/// Spans are byte offsets into the text the reference was extracted from;
/// no two references from one document overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Which surface syntax produced this reference.
    pub kind: ReferenceKind,
    /// Display text, image alt text, or definition label.
    pub label: String,
    /// One-based line number where the reference starts.
    pub line: usize,
    /// Byte range of the whole construct.
    pub span: Range<usize>,
    /// Raw target, fragment included.
    pub target: String,
    /// Byte range of `target` within the text.
    pub target_span: Range<usize>,
}

impl Reference {
    /// The `#...` suffix of the target, if any.
    pub fn fragment(&self) -> Option<&str> {
        let (_, fragment) = split_fragment(&self.target);
        return if fragment.is_empty() { None } else { Some(fragment) };
    }
}

/// Surface syntax of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    /// `![alt](target)`
    Image,
    /// `[text](target)`
    Link,
    /// `[label]: target` at the start of a line.
    ReferenceDefinition,
}

/// What the resolver decided for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No resolving value exists; the target stays as written.
    Broken,
    /// A URL with a scheme; never touched.
    External,
    /// The target must be replaced with this value, fragment included.
    Fixed(String),
    /// The target already resolves in its normalized form.
    Valid,
}

/// Reference counters. Merging is a plain sum, so folding per-document
/// statistics in any order yields the same totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    /// References that resolve nowhere.
    pub broken: usize,
    /// References to external URLs.
    pub external: usize,
    /// References rewritten (or rewritable in a dry run).
    pub fixed: usize,
    /// All references seen.
    pub total: usize,
}

impl RunStatistics {
    /// References that are not external URLs.
    pub const fn local(&self) -> usize {
        return self.total.saturating_sub(self.external);
    }

    /// Sum two sets of counters.
    pub const fn merge(self, other: Self) -> Self {
        return Self {
            broken: self.broken.saturating_add(other.broken),
            external: self.external.saturating_add(other.external),
            fixed: self.fixed.saturating_add(other.fixed),
            total: self.total.saturating_add(other.total),
        };
    }

    /// Count one resolved reference.
    pub fn record(&mut self, resolution: &Resolution) {
        self.total = self.total.saturating_add(1);
        match resolution {
            Resolution::Broken => self.broken = self.broken.saturating_add(1),
            Resolution::External => self.external = self.external.saturating_add(1),
            Resolution::Fixed(_) => self.fixed = self.fixed.saturating_add(1),
            Resolution::Valid => {},
        }
    }
}

/// Split a target at its first `#` into path and fragment.
/// The fragment keeps its leading `#` and is empty when absent.
pub fn split_fragment(target: &str) -> (&str, &str) {
    return match target.find('#') {
        Some(idx) => target.split_at(idx),
        None => (target, ""),
    };
}
