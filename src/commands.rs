//! CLI commands for linkfix: check, fix.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::batch::{self, RunReport};
use crate::config::Config;
use crate::error;
use crate::rewrite::{FsStore, Mode};

/// Resolve every reference under `target` without touching any file.
///
/// # Errors
///
/// Returns `Error::TargetNotFound` for a missing target, or `Error::Json`
/// if the JSON report cannot be serialized.
pub fn check(config: &Config, target: Option<&Path>, json: bool) -> Result<ExitCode, error::Error> {
    let target = default_target(target);
    let report = batch::run(&target, config, Mode::DryRun, &FsStore)?;
    return report_outcome(&report, json);
}

/// Use the given target, else `./docs` when present, else the working directory.
fn default_target(target: Option<&Path>) -> PathBuf {
    if let Some(target) = target {
        return target.to_path_buf();
    }
    let docs = PathBuf::from("docs");
    if docs.is_dir() {
        return docs;
    }
    return PathBuf::from(".");
}

/// Resolve every reference under `target` and rewrite documents whose
/// targets were repaired, unless `dry_run` is set.
///
/// # Errors
///
/// Returns `Error::TargetNotFound` for a missing target, or `Error::Json`
/// if the JSON report cannot be serialized.
pub fn fix(config: &Config, target: Option<&Path>, dry_run: bool, json: bool) -> Result<ExitCode, error::Error> {
    let target = default_target(target);
    let mode = if dry_run { Mode::DryRun } else { Mode::Write };
    let report = batch::run(&target, config, mode, &FsStore)?;
    return report_outcome(&report, json);
}

/// Print a markdown summary of a run.
fn print_report(report: &RunReport) {
    let fixed_heading = if report.dry_run { "Fixable" } else { "Fixed" };
    let with_fixes: Vec<_> = report.documents.iter().filter(|d| return !d.fixed.is_empty()).collect();
    if !with_fixes.is_empty() {
        println!("## {fixed_heading}\n");
        for document in with_fixes {
            for fix in &document.fixed {
                println!(
                    "- {}:{}  `{}` -> `{}`",
                    document.document.display(),
                    fix.line,
                    fix.old_target,
                    fix.new_target,
                );
            }
        }
        println!();
    }

    let modified: Vec<_> = report.modified().collect();
    if !modified.is_empty() {
        println!("## Modified\n");
        for document in modified {
            let count = document.fixed.len();
            let noun = if count == 1 { "fix" } else { "fixes" };
            println!("- {} ({count} {noun})", document.document.display());
        }
        println!();
    }

    let broken: Vec<_> = report.broken().collect();
    if !broken.is_empty() {
        println!("## Broken\n");
        for reference in broken {
            println!("- {}:{}  `{}`", reference.document.display(), reference.line, reference.target);
        }
        println!();
    }

    if !report.failures.is_empty() {
        println!("## Unreadable\n");
        for failure in &report.failures {
            println!("- {}", failure.reason);
        }
        println!();
    }

    let unwritable: Vec<_> = report.unwritable().collect();
    if !unwritable.is_empty() {
        println!("## Unwritable\n");
        for document in unwritable {
            println!("- {}", document.write_error.as_deref().unwrap_or_default());
        }
        println!();
    }

    let stats = report.stats;
    let fixed_label = if report.dry_run { "fixable" } else { "fixed" };
    println!("## Summary\n");
    println!("- documents: {}", report.documents.len());
    println!("- references: {}", stats.total);
    println!("- external: {}", stats.external);
    println!("- local: {}", stats.local());
    println!("- broken: {}", stats.broken);
    println!("- {fixed_label}: {}", stats.fixed);
    if !report.dry_run {
        println!("- modified: {}", report.modified().count());
    }
    return;
}

/// Emit the report in the requested format and map success to an exit code.
///
/// # Errors
///
/// Returns `Error::Json` if the JSON report cannot be serialized.
fn report_outcome(report: &RunReport, json: bool) -> Result<ExitCode, error::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_report(report);
    }

    if report.succeeded() {
        return Ok(ExitCode::SUCCESS);
    }
    return Ok(ExitCode::from(1));
}
