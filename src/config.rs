use std::path::Path;

use crate::error::Error;

/// Resolution and discovery settings loaded from `.linkfix.toml`.
/// Every key is optional; the defaults describe a VitePress-style site whose
/// sources live under a `docs/` directory inside a git or npm project.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory name marking the documentation root.
    pub docs_dir: String,
    /// Path prefixes (relative to the run root) never scanned.
    exclude: Vec<String>,
    /// Directory names skipped during every walk, in addition to hidden ones.
    pub excluded_dirs: Vec<String>,
    /// Recognized document extension, without the dot.
    pub extension: String,
    /// Path prefixes (relative to the run root) scanned; empty means everything.
    include: Vec<String>,
    /// Default document served for a directory route.
    pub index_document: String,
    /// Rewrite resolving targets into `./`-relative form.
    pub normalize_existing: bool,
    /// Schemes treated as external even without a network location.
    pub opaque_schemes: Vec<String>,
    /// File or directory names that mark a project root.
    pub project_markers: Vec<String>,
    /// Site route prefix, always starting and ending with `/`.
    pub route_prefix: String,
}

/// Raw TOML structure for `.linkfix.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkfixTomlConfig {
    /// See [`Config::docs_dir`].
    docs_dir: Option<String>,
    /// See [`Config::exclude`].
    #[serde(default)]
    exclude: Vec<String>,
    /// See [`Config::excluded_dirs`].
    excluded_dirs: Option<Vec<String>>,
    /// See [`Config::extension`].
    extension: Option<String>,
    /// See [`Config::include`].
    #[serde(default)]
    include: Vec<String>,
    /// See [`Config::index_document`].
    index_document: Option<String>,
    /// See [`Config::normalize_existing`].
    normalize_existing: Option<bool>,
    /// See [`Config::opaque_schemes`].
    opaque_schemes: Option<Vec<String>>,
    /// See [`Config::project_markers`].
    project_markers: Option<Vec<String>>,
    /// See [`Config::route_prefix`].
    route_prefix: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            docs_dir: "docs".to_string(),
            exclude: Vec::new(),
            excluded_dirs: vec!["node_modules".to_string()],
            extension: "md".to_string(),
            include: Vec::new(),
            index_document: "index.md".to_string(),
            normalize_existing: true,
            opaque_schemes: ["mailto", "tel", "data", "javascript"]
                .iter()
                .map(|s| return (*s).to_string())
                .collect(),
            project_markers: vec![".git".to_string(), "package.json".to_string()],
            route_prefix: "/docs/".to_string(),
        };
    }
}

impl Config {
    /// Load config from the given file.
    /// Returns defaults if the file doesn't exist. A file that exists but is
    /// malformed is an error; it never silently falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed,
    /// or `Error::ConfigInvalid` if a value is unusable.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        return Self::parse(&content).map_err(|e| {
            return match e {
                Error::ConfigInvalid { reason, .. } => Error::ConfigInvalid {
                    path: path.to_path_buf(),
                    reason,
                },
                other => other,
            };
        });
    }

    /// Parse config from TOML content, filling unset keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the content is not valid TOML for this schema,
    /// or `Error::ConfigInvalid` if a value is unusable.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: LinkfixTomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let extension = raw.extension.unwrap_or(defaults.extension);
        let extension = extension.trim_start_matches('.').to_string();
        if extension.is_empty() {
            return Err(invalid("`extension` must not be empty"));
        }

        let index_document = raw.index_document.unwrap_or(defaults.index_document);
        if index_document.is_empty() || index_document.contains('/') {
            return Err(invalid("`index_document` must be a bare file name"));
        }

        return Ok(Self {
            docs_dir: raw.docs_dir.unwrap_or(defaults.docs_dir),
            exclude: raw.exclude,
            excluded_dirs: raw.excluded_dirs.unwrap_or(defaults.excluded_dirs),
            extension,
            include: raw.include,
            index_document,
            normalize_existing: raw.normalize_existing.unwrap_or(defaults.normalize_existing),
            opaque_schemes: raw.opaque_schemes.unwrap_or(defaults.opaque_schemes),
            project_markers: raw.project_markers.unwrap_or(defaults.project_markers),
            route_prefix: normalize_route_prefix(&raw.route_prefix.unwrap_or(defaults.route_prefix)),
        });
    }

    /// Check whether a document path (relative to the run root) should be scanned.
    ///
    /// A path is included if no include patterns are set, or if it starts
    /// with at least one include pattern. An included path is then excluded
    /// if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

/// Build a `ConfigInvalid` whose path is filled in by `Config::load`.
fn invalid(reason: &str) -> Error {
    return Error::ConfigInvalid {
        path: std::path::PathBuf::new(),
        reason: reason.to_string(),
    };
}

/// Force a route prefix into `/segment/` form.
fn normalize_route_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    return format!("/{trimmed}/");
}
