//! Classification and repair of a single reference target.
//!
//! Resolution order, first match wins:
//!
//! 1. empty path (fragment only) is valid as written
//! 2. `scheme://host...` and configured opaque schemes are external
//! 3. route-prefixed targets resolve against the documentation root as site routes
//! 4. other `/`-rooted targets resolve against the documentation root as files
//! 5. everything else resolves against the document's directory
//! 6. failing that, the basename is looked up in the project index
//!
//! Rewritten targets always carry the original fragment verbatim.

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::index::{IndexCache, ProjectIndex};
use crate::types::{Resolution, split_fragment};

/// Characters escaped in rewritten paths so the target stays a single,
/// unambiguous markdown link destination.
const ESCAPED: &[char] = &[' ', '"', '#', '%', '(', ')', '<', '>'];

/// Where a document sits in the tree. Computed once per document and
/// shared by every reference it contains.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    /// Directory containing the document; plain relative targets resolve here.
    pub dir: PathBuf,
    /// Nearest ancestor named after the configured docs directory, else a
    /// child of `dir` with that name, else `dir` itself.
    pub docs_root: PathBuf,
    /// Nearest ancestor holding a project marker, or the run root.
    pub project_root: PathBuf,
}

/// Resolves targets for one document.
pub struct Resolver<'a> {
    /// Run settings.
    config: &'a Config,
    /// The document being resolved.
    context: &'a DocumentContext,
    /// Shared, lazily built filename indexes.
    indexes: &'a IndexCache,
}

impl DocumentContext {
    /// Locate the directories that anchor resolution for `document`.
    /// `fallback_root` bounds the project search when no ancestor has a marker.
    pub fn discover(document: &Path, fallback_root: &Path, config: &Config) -> Self {
        let dir = document
            .parent()
            .map_or_else(|| return fallback_root.to_path_buf(), Path::to_path_buf);

        let docs_root = dir
            .ancestors()
            .find(|a| return a.file_name().is_some_and(|n| return n == config.docs_dir.as_str()))
            .map_or_else(
                || {
                    let nested = dir.join(&config.docs_dir);
                    return if nested.is_dir() { nested } else { dir.clone() };
                },
                Path::to_path_buf,
            );

        let project_root = dir
            .ancestors()
            .find(|a| return config.project_markers.iter().any(|m| return a.join(m).exists()))
            .map_or_else(|| return fallback_root.to_path_buf(), Path::to_path_buf);

        return Self { dir, docs_root, project_root };
    }
}

impl<'a> Resolver<'a> {
    /// Bind a resolver to one document.
    pub const fn new(config: &'a Config, context: &'a DocumentContext, indexes: &'a IndexCache) -> Self {
        return Self { config, context, indexes };
    }

    /// Index of the document's project, built on first use.
    fn project_index(&self) -> Arc<ProjectIndex> {
        return self.indexes.get_or_build(&self.context.project_root, self.config);
    }

    /// Find the shortest route to a directory named like `location` that has
    /// an index document.
    fn repair_directory_route(&self, location: &Path) -> Option<String> {
        let name = location.file_name()?;
        let docs_root = &self.context.docs_root;
        let index = self.route_index();

        let best = index
            .lookup(OsStr::new(&self.config.index_document))
            .filter_map(|p| return p.parent())
            .filter(|d| return d.file_name() == Some(name) && d.starts_with(docs_root))
            .map(|d| return slash_path(d.strip_prefix(docs_root).unwrap_or(d)))
            .min_by(shortest_then_lexicographic)?;

        let prefix = &self.config.route_prefix;
        return Some(if best.is_empty() { prefix.clone() } else { format!("{prefix}{best}/") });
    }

    /// Find the shortest route to a document named like `location`, keeping
    /// the extension only if the route spelled it out.
    fn repair_file_route(&self, location: &Path) -> Option<String> {
        let document = self.route_document(location);
        let name = document.file_name()?;
        let docs_root = &self.context.docs_root;
        let keep_extension = document == location;
        let index = self.route_index();

        let best = index
            .lookup(name)
            .filter(|p| return p.starts_with(docs_root))
            .filter_map(|p| {
                let relative = p.strip_prefix(docs_root).ok()?;
                let relative = if keep_extension { relative.to_path_buf() } else { relative.with_extension("") };
                return Some(slash_path(&relative));
            })
            .min_by(shortest_then_lexicographic)?;

        return Some(format!("{}{best}", self.config.route_prefix));
    }

    /// Resolve one raw target, fragment included.
    pub fn resolve(&self, target: &str) -> Resolution {
        let (raw_path, fragment) = split_fragment(target);
        let raw_path = raw_path.trim();
        if raw_path.is_empty() {
            return Resolution::Valid;
        }
        if is_external(raw_path, &self.config.opaque_schemes) {
            return Resolution::External;
        }

        let decoded = percent_decode(raw_path);
        let candidate = match self.strip_route_prefix(&decoded) {
            Some(route) => self.resolve_route(raw_path, route),
            None => self.resolve_path(raw_path, &decoded),
        };

        let Some(path) = candidate else {
            log::debug!("no resolution for {target} from {}", self.context.dir.display());
            return Resolution::Broken;
        };
        if path == raw_path {
            return Resolution::Valid;
        }
        return Resolution::Fixed(format!("{path}{fragment}"));
    }

    /// Resolve a filesystem target, relative to the document or, when
    /// `/`-rooted, to the documentation root. Falls back to the project index.
    fn resolve_path(&self, raw: &str, decoded: &str) -> Option<String> {
        let joined = match decoded.strip_prefix('/') {
            Some(rooted) => self.context.docs_root.join(rooted),
            None => self.context.dir.join(decoded.strip_prefix("./").unwrap_or(decoded)),
        };
        let location = normalize_path(&joined);
        let names_directory = decoded.ends_with('/');
        let exists = if names_directory { location.is_dir() } else { location.exists() };

        if !exists {
            return self.search_project(decoded);
        }
        if !self.config.normalize_existing {
            return Some(raw.to_string());
        }

        let mut link = relative_link(&self.context.dir, &location);
        if names_directory && !link.ends_with('/') {
            link.push('/');
        }
        if link != raw {
            log::debug!("normalized {raw} -> {link}");
        }
        return Some(link);
    }

    /// Resolve a site route such as `/docs/guide/` against the documentation root.
    fn resolve_route(&self, raw: &str, route: &str) -> Option<String> {
        let location = normalize_path(&self.context.docs_root.join(route));

        if location.is_file() {
            return Some(raw.to_string());
        }

        let names_directory = route.is_empty() || route.ends_with('/') || location.is_dir();
        if names_directory {
            if location.join(&self.config.index_document).is_file() {
                return Some(raw.to_string());
            }
            let repaired = self.repair_directory_route(&location);
            if let Some(route) = &repaired {
                log::info!("route repaired: {raw} -> {route}");
            }
            return repaired;
        }

        if self.route_document(&location).is_file() {
            return Some(raw.to_string());
        }
        let repaired = self.repair_file_route(&location);
        if let Some(route) = &repaired {
            log::info!("route repaired: {raw} -> {route}");
        }
        return repaired;
    }

    /// The document a file route names: the path itself when it already has
    /// the document extension, otherwise the path with the extension appended.
    fn route_document(&self, location: &Path) -> PathBuf {
        let extension = self.config.extension.as_str();
        if location.extension().is_some_and(|e| return e == extension) {
            return location.to_path_buf();
        }
        let mut appended = location.as_os_str().to_os_string();
        appended.push(".");
        appended.push(extension);
        return PathBuf::from(appended);
    }

    /// Index of the documentation root; route repairs never leave it.
    fn route_index(&self) -> Arc<ProjectIndex> {
        return self.indexes.get_or_build(&self.context.docs_root, self.config);
    }

    /// Look the target's basename up anywhere under the project root and
    /// pick the candidate nearest to the document. The index holds files
    /// only, so directory targets are never searched.
    fn search_project(&self, decoded: &str) -> Option<String> {
        if decoded.ends_with('/') {
            log::debug!("not searching for directory {decoded}");
            return None;
        }
        let name = Path::new(decoded).file_name()?;
        let index = self.project_index();

        let best = index
            .lookup(name)
            .map(|p| return relative_link(&self.context.dir, p))
            .min_by(shortest_then_lexicographic);

        match &best {
            Some(link) => log::info!("found match: {decoded} -> {link}"),
            None => log::debug!("no file named {} under {}", name.to_string_lossy(), index.root().display()),
        }
        return best;
    }

    /// Split off the route prefix; a bare `/docs` counts as the route root.
    fn strip_route_prefix<'t>(&self, decoded: &'t str) -> Option<&'t str> {
        let prefix = self.config.route_prefix.as_str();
        if let Some(route) = decoded.strip_prefix(prefix) {
            return Some(route);
        }
        if prefix.len() > 1 && prefix.strip_suffix('/') == Some(decoded) {
            return Some("");
        }
        return None;
    }
}

/// Percent-encode the characters that would break a link destination.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if ESCAPED.contains(&c) {
            let _ = write!(out, "%{:02X}", u32::from(c));
        } else {
            out.push(c);
        }
    }
    return out;
}

/// Decode a two-byte hex pair following `%`.
fn hex_pair(pair: &[u8]) -> Option<u8> {
    let [hi, lo] = pair else { return None };
    let hi = char::from(*hi).to_digit(16)?;
    let lo = char::from(*lo).to_digit(16)?;
    return u8::try_from(hi.checked_mul(16)?.checked_add(lo)?).ok();
}

/// Whether a path portion is a URL: `scheme://host...`, a network-path
/// reference (`//host/...`), or one of the opaque schemes such as `mailto:`.
fn is_external(path: &str, opaque_schemes: &[String]) -> bool {
    if path.starts_with("//") {
        return true;
    }
    let Some((scheme, rest)) = path.split_once(':') else {
        return false;
    };
    if !is_scheme(scheme) {
        return false;
    }
    if let Some(authority) = rest.strip_prefix("//") {
        let host = authority.split(['/', '?', '#']).next().unwrap_or("");
        return !host.is_empty();
    }
    return opaque_schemes.iter().any(|s| return s.eq_ignore_ascii_case(scheme));
}

/// RFC 3986 scheme syntax. Single letters are rejected so `C:` drive paths stay local.
fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    let starts_alpha = chars.next().is_some_and(|c| return c.is_ascii_alphabetic());
    return starts_alpha
        && candidate.len() > 1
        && chars.all(|c| return c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop and never pops the root.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Decode `%XX` escapes. Malformed escapes pass through literally, and a
/// result that is not UTF-8 falls back to the input unchanged.
fn percent_decode(input: &str) -> String {
    if !input.contains('%') {
        return input.to_string();
    }

    let mut out: Vec<u8> = Vec::with_capacity(input.len());
    let mut rest = input.as_bytes();
    while let Some((&first, tail)) = rest.split_first() {
        if first == b'%'
            && let Some(byte) = tail.get(..2).and_then(hex_pair)
        {
            out.push(byte);
            rest = tail.get(2..).unwrap_or_default();
            continue;
        }
        out.push(first);
        rest = tail;
    }
    return String::from_utf8(out).unwrap_or_else(|_| return input.to_string());
}

/// Handle a single path component during normalization.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => {
            match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                },
                Some(Component::RootDir | Component::Prefix(_)) => {},
                _ => components.push(component),
            }
        },
        other => components.push(other),
    }
}

/// Relative link from directory `from` to `to`, `/`-separated, escaped,
/// and always prefixed with `./`.
fn relative_link(from: &Path, to: &Path) -> String {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| return a == b).count();

    let mut parts: Vec<String> = std::iter::repeat_n("..".to_string(), from.len().saturating_sub(common)).collect();
    parts.extend(
        to.iter()
            .skip(common)
            .map(|c| return encode_segment(&c.as_os_str().to_string_lossy())),
    );

    let joined = parts.join("/");
    if joined.is_empty() {
        return "./".to_string();
    }
    return format!("./{joined}");
}

/// Order candidates by length, then lexicographically, for a stable pick.
fn shortest_then_lexicographic(a: &String, b: &String) -> Ordering {
    return a.len().cmp(&b.len()).then_with(|| return a.cmp(b));
}

/// A relative path as `/`-separated, escaped segments.
fn slash_path(path: &Path) -> String {
    return path
        .components()
        .map(|c| return encode_segment(&c.as_os_str().to_string_lossy()))
        .collect::<Vec<_>>()
        .join("/");
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A project tree with a `.git` marker at its (canonical) root.
    fn tree(files: &[&str]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir(root.join(".git")).unwrap();
        for file in files {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "# page\n").unwrap();
        }
        return (dir, root);
    }

    fn resolve_with(config: &Config, root: &Path, document: &str, target: &str) -> Resolution {
        let cache = IndexCache::default();
        let context = DocumentContext::discover(&root.join(document), root, config);
        return Resolver::new(config, &context, &cache).resolve(target);
    }

    fn resolve(root: &Path, document: &str, target: &str) -> Resolution {
        return resolve_with(&Config::default(), root, document, target);
    }

    fn fixed(target: &str) -> Resolution {
        return Resolution::Fixed(target.to_string());
    }

    #[test]
    fn urls_are_external() {
        let (_dir, root) = tree(&["a.md"]);
        for target in [
            "https://example.com/page.md#x",
            "http://localhost:8080",
            "mailto:team@example.com",
            "//cdn.example.com/lib.js",
        ] {
            assert_eq!(resolve(&root, "a.md", target), Resolution::External, "{target}");
        }
    }

    #[test]
    fn drive_letter_and_hostless_scheme_are_local() {
        assert!(!is_external("C:/docs/a.md", &[]));
        assert!(!is_external("file:///etc/hosts", &[]));
        assert!(!is_external("notes:todo.md", &[]));
    }

    #[test]
    fn fragment_only_is_valid() {
        let (_dir, root) = tree(&["a.md"]);
        assert_eq!(resolve(&root, "a.md", "#top"), Resolution::Valid);
    }

    #[test]
    fn existing_targets_normalize_to_dot_relative() {
        let (_dir, root) = tree(&["guide/a.md", "guide/b.md", "api/c.md"]);
        assert_eq!(resolve(&root, "guide/a.md", "./b.md"), Resolution::Valid);
        assert_eq!(resolve(&root, "guide/a.md", "b.md"), fixed("./b.md"));
        assert_eq!(resolve(&root, "guide/a.md", "../guide/b.md#x"), fixed("./b.md#x"));
        assert_eq!(resolve(&root, "guide/a.md", "../api/c.md"), fixed("./../api/c.md"));
        assert_eq!(resolve(&root, "guide/a.md", "./../api/c.md"), Resolution::Valid);
    }

    #[test]
    fn normalization_can_be_disabled() {
        let (_dir, root) = tree(&["guide/a.md", "guide/b.md"]);
        let config = Config::parse("normalize_existing = false").unwrap();
        assert_eq!(resolve_with(&config, &root, "guide/a.md", "b.md"), Resolution::Valid);
    }

    #[test]
    fn directory_target_keeps_trailing_slash() {
        let (_dir, root) = tree(&["guide/a.md", "guide/sub/index.md"]);
        assert_eq!(resolve(&root, "guide/a.md", "sub/"), fixed("./sub/"));
        assert_eq!(resolve(&root, "guide/a.md", "./sub/"), Resolution::Valid);
    }

    #[test]
    fn fragment_survives_repair() {
        let (_dir, root) = tree(&["docs/a.md", "other/page.md"]);
        assert_eq!(
            resolve(&root, "docs/a.md", "sub/page.md#section"),
            fixed("./../other/page.md#section")
        );
    }

    #[test]
    fn ambiguous_match_prefers_shortest_relative_path() {
        let (_dir, root) = tree(&["a/b/guide.md", "a/guide.md", "a/x/doc.md"]);
        assert_eq!(resolve(&root, "a/x/doc.md", "missing/guide.md"), fixed("./../guide.md"));
    }

    #[test]
    fn equal_length_candidates_break_ties_lexicographically() {
        let (_dir, root) = tree(&["b/guide.md", "a/guide.md", "c/doc.md"]);
        assert_eq!(resolve(&root, "c/doc.md", "guide.md"), fixed("./../a/guide.md"));
    }

    #[test]
    fn unknown_file_is_broken() {
        let (_dir, root) = tree(&["a.md"]);
        assert_eq!(resolve(&root, "a.md", "nowhere.md#x"), Resolution::Broken);
        assert_eq!(resolve(&root, "a.md", "gone/"), Resolution::Broken);
    }

    #[test]
    fn directory_target_never_matches_a_file() {
        let (_dir, root) = tree(&["a.md", "sub/gone", "docs/b.md"]);
        assert_eq!(resolve(&root, "a.md", "gone/"), Resolution::Broken);
        assert_eq!(resolve(&root, "a.md", "sub/gone/"), Resolution::Broken);
        assert_eq!(resolve(&root, "a.md", "gone"), fixed("./sub/gone"));
    }

    #[test]
    fn routes_from_outside_the_docs_tree_resolve_against_docs() {
        let (_dir, root) = tree(&["README.md", "docs/guide/index.md", "docs/setup.md"]);
        assert_eq!(resolve(&root, "README.md", "/docs/guide/"), Resolution::Valid);
        assert_eq!(resolve(&root, "README.md", "/docs/setup"), Resolution::Valid);
        assert_eq!(resolve(&root, "README.md", "/docs/old/guide/"), fixed("/docs/guide/"));
    }

    #[test]
    fn route_repair_searches_whole_docs_tree_past_nested_marker() {
        let (_dir, root) = tree(&["docs/foo/index.md", "docs/pkg/package.json", "docs/pkg/page.md"]);
        assert_eq!(resolve(&root, "docs/pkg/page.md", "/docs/old/foo/"), fixed("/docs/foo/"));
    }

    #[test]
    fn directory_route_with_index_is_valid() {
        let (_dir, root) = tree(&["docs/foo/index.md", "docs/guide/page.md"]);
        assert_eq!(resolve(&root, "docs/guide/page.md", "/docs/foo/"), Resolution::Valid);
        assert_eq!(resolve(&root, "docs/guide/page.md", "/docs/foo"), Resolution::Valid);
    }

    #[test]
    fn directory_route_is_repaired_to_matching_directory() {
        let (_dir, root) = tree(&[
            "docs/foo/index.md",
            "docs/deep/er/foo/index.md",
            "docs/guide/page.md",
        ]);
        assert_eq!(
            resolve(&root, "docs/guide/page.md", "/docs/old/foo/#intro"),
            fixed("/docs/foo/#intro")
        );
    }

    #[test]
    fn directory_route_without_index_match_is_broken() {
        let (_dir, root) = tree(&["docs/foo/readme.md", "docs/guide/page.md"]);
        assert_eq!(resolve(&root, "docs/guide/page.md", "/docs/foo/"), Resolution::Broken);
    }

    #[test]
    fn file_routes_resolve_with_extension_appended() {
        let (_dir, root) = tree(&["docs/guide/setup.md", "docs/index.md"]);
        assert_eq!(resolve(&root, "docs/index.md", "/docs/guide/setup"), Resolution::Valid);
        assert_eq!(resolve(&root, "docs/index.md", "/docs/setup"), fixed("/docs/guide/setup"));
        assert_eq!(resolve(&root, "docs/index.md", "/docs/setup.md"), fixed("/docs/guide/setup.md"));
        assert_eq!(resolve(&root, "docs/index.md", "/docs/"), Resolution::Valid);
    }

    #[test]
    fn rooted_path_resolves_against_docs_root() {
        let (_dir, root) = tree(&["docs/guide/setup.md", "docs/api/ref.md"]);
        assert_eq!(
            resolve(&root, "docs/api/ref.md", "/guide/setup.md"),
            fixed("./../guide/setup.md")
        );
    }

    #[test]
    fn percent_encoded_names_round_trip() {
        let (_dir, root) = tree(&["guide/a.md", "guide/my page.md"]);
        assert_eq!(resolve(&root, "guide/a.md", "my%20page.md"), fixed("./my%20page.md"));
        assert_eq!(resolve(&root, "guide/a.md", "./my%20page.md"), Resolution::Valid);
    }

    #[test]
    fn percent_decode_is_lenient() {
        assert_eq!(percent_decode("a%20b"), "a b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("%E4%B8%AD"), "中");
        assert_eq!(percent_decode("%FF"), "%FF");
    }

    #[test]
    fn relative_links() {
        let from = Path::new("/p/a/x");
        assert_eq!(relative_link(from, Path::new("/p/a/guide.md")), "./../guide.md");
        assert_eq!(relative_link(from, Path::new("/p/a")), "./..");
        assert_eq!(relative_link(from, Path::new("/p/a/x/y.md")), "./y.md");
        assert_eq!(relative_link(from, Path::new("/p/a/x")), "./");
        assert_eq!(relative_link(from, Path::new("/p/a/x/my (1).md")), "./my%20%281%29.md");
    }

    #[test]
    fn normalize_never_pops_root() {
        assert_eq!(normalize_path(Path::new("/a/../../b/./c")), PathBuf::from("/b/c"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
    }
}
