//! `xtask` — workspace automation for the project.
//!
//! Provides a CI-style check that scans for suppressions of clippy lints
//! the workspace policy forbids suppressing.
use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::{bail, eyre};
use regex::Regex;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Exact clippy lints that repository policy forbids suppressing with `allow`/`expect`.
///
/// Enforcing these through `cargo clippy -F clippy::<lint>` or a crate-level
/// `#![forbid(...)]` collides with derive-macro expansions that emit their own
/// `#[allow(clippy::...)]`, so a source-level scan is used instead.
const SUPPRESSION_DENYLIST_CLIPPY_LINTS: &[&str] = &[
    "clippy::cognitive_complexity",
    "clippy::type_complexity",
    "clippy::too_many_arguments",
    "clippy::too_many_lines",
    "clippy::large_enum_variant",
    "clippy::struct_excessive_bools",
];
/// Clippy lint groups broad enough to suppress denylisted lints transitively.
const SUPPRESSION_DENYLIST_CLIPPY_GROUPS: &[&str] = &["complexity", "perf", "pedantic"];

/// Matches Rust lint attributes of the form `#[allow(...)]` / `#[expect(...)]`.
///
/// The lazy dotall capture can terminate at an inner `)` in nested-parenthesis
/// cases, which may cause missed matches but never denylist false positives.
const LINT_ATTRIBUTE_PATTERN: &str = r"(?s)#\s*!?\s*\[\s*(allow|expect)\s*\((.*?)\)\s*]";
/// Extracts `clippy::...` lint tokens from lint-attribute argument lists.
const CLIPPY_LINT_TOKEN_PATTERN: &str = r"clippy::[a-z_]+";

/// Top-level CLI entry point for the xtask binary.
#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks
    Check {
        /// Scan all tracked files instead of just edited ones
        #[arg(long)]
        all: bool,
    },
    /// Check for suppressions of clippy lints denied by workspace policy.
    CheckClippySuppressions {
        /// Scan all tracked files instead of just edited ones
        #[arg(long)]
        all: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    match cli.command {
        Commands::Check { all } => check_clippy_suppressions(all),
        Commands::CheckClippySuppressions { all } => check_clippy_suppressions(all),
    }
}

/// Returns the set of file paths to check, relative to `root`.
///
/// When `all` is `false`, returns only files that are changed (staged, unstaged,
/// or untracked) relative to `HEAD`. Falls back to all tracked files when no
/// changes are detected, or when `all` is `true`.
fn get_files_to_check(root: &Path, all: bool) -> Result<HashSet<String>> {
    let mut files: HashSet<String> = get_git_files(root, &["ls-files"])?.into_iter().collect();
    let untracked = get_git_files(root, &["ls-files", "--others", "--exclude-standard"])?;
    files.extend(untracked.clone());

    if !all {
        let mut changed: HashSet<String> =
            get_git_files(root, &["diff", "--name-only", "HEAD"])?.into_iter().collect();
        changed.extend(untracked);

        if !changed.is_empty() {
            return Ok(changed);
        }
    }

    Ok(files)
}

fn get_git_files(root: &Path, args: &[&str]) -> Result<Vec<String>> {
    let output = Command::new("git").args(args).current_dir(root).output()?;
    if !output.status.success() {
        bail!("git {:?} failed with status {}", args, output.status);
    }
    let listing = String::from_utf8(output.stdout)?;
    Ok(listing.lines().map(str::to_string).collect())
}

/// Fails when any scanned Rust file carries an `allow`/`expect` for a
/// denylisted clippy lint or for a lint group that would swallow one.
fn check_clippy_suppressions(all: bool) -> Result<()> {
    let root = env::current_dir()?;
    let attribute_re =
        Regex::new(LINT_ATTRIBUTE_PATTERN).map_err(|e| eyre!("bad attribute pattern: {e}"))?;
    let token_re =
        Regex::new(CLIPPY_LINT_TOKEN_PATTERN).map_err(|e| eyre!("bad token pattern: {e}"))?;

    let files = get_files_to_check(&root, all)?;
    let mut violations: Vec<String> = Vec::new();

    for file_path in files {
        let path = root.join(&file_path);
        if !path.exists() || path.is_dir() {
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let content = fs::read_to_string(&path)?;
        for attribute in attribute_re.captures_iter(&content) {
            let arguments = &attribute[2];
            for token in token_re.find_iter(arguments) {
                if is_denylisted(token.as_str()) {
                    violations.push(format!("{}: suppresses {}", file_path, token.as_str()));
                }
            }
            for group in SUPPRESSION_DENYLIST_CLIPPY_GROUPS {
                let qualified = format!("clippy::{group}");
                if arguments.split(',').any(|arg| arg.trim() == qualified) {
                    violations.push(format!("{file_path}: suppresses lint group {qualified}"));
                }
            }
        }
    }

    if violations.is_empty() {
        println!("No denylisted clippy suppressions found.");
        Ok(())
    } else {
        violations.sort();
        bail!(
            "denylisted clippy suppressions found:\n{}",
            violations.join("\n")
        );
    }
}

fn is_denylisted(token: &str) -> bool {
    SUPPRESSION_DENYLIST_CLIPPY_LINTS.contains(&token)
}
