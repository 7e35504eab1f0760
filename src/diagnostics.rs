use crate::error::Error;

/// ANSI bold, applied to headings.
const BOLD: &str = "\x1b[1m";
/// ANSI reset.
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
    return;
}

/// Render an error as a structured markdown diagnostic: what happened and,
/// where the user can act on it, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigInvalid { path, reason } => format!(
            "\
# Error: Invalid Config

`{}`: {reason}

## Fix

Correct the setting, or delete the file to use the defaults.
",
            path.display()
        ),

        Error::DocumentUnreadable { path, source } => format!(
            "\
# Error: Document Unreadable

`{}` could not be read as UTF-8 text: {source}
",
            path.display()
        ),

        Error::DocumentUnwritable { path, source } => format!(
            "\
# Error: Document Unwritable

`{}` could not be written: {source}

The document was left unchanged.
",
            path.display()
        ),

        Error::Io(e) => format!(
            "\
# Error: I/O

{e}
"
        ),

        Error::Json(e) => format!(
            "\
# Error: JSON Report

{e}
"
        ),

        Error::TargetNotFound { path } => format!(
            "\
# Error: Target Not Found

`{}` does not exist.

## Fix

Pass an existing file or directory:

    linkfix check docs/
",
            path.display()
        ),

        Error::TomlDe(e) => format!(
            "\
# Error: Invalid TOML

{e}

## Fix

Check `.linkfix.toml` against the supported keys: `extension`, `index_document`,
`route_prefix`, `docs_dir`, `project_markers`, `excluded_dirs`, `include`, `exclude`,
`normalize_existing`, `opaque_schemes`.
"
        ),
    };
}
