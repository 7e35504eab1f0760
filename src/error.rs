/// Crate-level error types for linkfix diagnostics.
use std::path::PathBuf;

/// Every error names the file or setting it concerns so it can be rendered
/// as a diagnostic without further context.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The config file exists and parses as TOML but holds an unusable value.
    #[error("invalid config {}: {reason}", path.display())]
    ConfigInvalid {
        /// Config file that was loaded.
        path: PathBuf,
        /// Which setting is wrong and why.
        reason: String,
    },

    /// A document could not be read as UTF-8 text.
    #[error("cannot read {}: {source}", path.display())]
    DocumentUnreadable {
        /// Document that failed to read.
        path: PathBuf,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// A rewritten document could not be written back.
    #[error("cannot write {}: {source}", path.display())]
    DocumentUnwritable {
        /// Document that failed to write.
        path: PathBuf,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON report serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serialization error.
        #[from]
        serde_json::Error,
    ),

    /// The file or directory given to a command does not exist.
    #[error("target not found: {}", path.display())]
    TargetNotFound {
        /// Path as given on the command line.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}
