//! Hygiene: source-level rules for the canvas crate, checked at test time.
//!
//! The engine must never panic on user input and never drop an error without
//! looking at it, so the patterns below carry a budget of zero. Test files
//! (`*_test.rs`) are exempt.

use std::fs;
use std::path::{Path, PathBuf};

struct SourceFile {
    path: String,
    content: String,
}

/// Pattern, budget, and what it guards against.
const BUDGETS: &[(&str, usize, &str)] = &[
    (".unwrap()", 0, "panics on None/Err"),
    (".expect(", 0, "panics on None/Err"),
    ("panic!(", 0, "explicit panic"),
    ("unreachable!(", 0, "explicit panic"),
    ("todo!(", 0, "unfinished stub"),
    ("unimplemented!(", 0, "unfinished stub"),
    ("let _ =", 0, "silently discarded result"),
    (".ok()", 0, "error converted to None without inspection"),
    ("#[allow(dead_code)]", 0, "dead code kept alive"),
    ("println!(", 0, "stdout output; use tracing"),
    ("eprintln!(", 0, "stderr output; use tracing"),
];

/// Modules exempt from needing a sibling test file.
const UNTESTED_MODULES: &[&str] = &["lib", "consts"];

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs") {
            out.push(path);
        }
    }
}

/// Production `.rs` files under `src/`.
fn production_files() -> Vec<SourceFile> {
    let mut paths = Vec::new();
    collect_rs_files(Path::new("src"), &mut paths);
    paths
        .into_iter()
        .filter(|p| !p.to_string_lossy().ends_with("_test.rs"))
        .filter_map(|p| {
            let content = fs::read_to_string(&p).ok()?;
            Some(SourceFile { path: p.to_string_lossy().into_owned(), content })
        })
        .collect()
}

fn hits(files: &[SourceFile], pattern: &str) -> Vec<(String, usize)> {
    files
        .iter()
        .filter_map(|file| {
            let count = file.content.lines().filter(|line| line.contains(pattern)).count();
            (count > 0).then(|| (file.path.clone(), count))
        })
        .collect()
}

#[test]
fn pattern_budgets() {
    let files = production_files();
    assert!(!files.is_empty(), "no sources found; run from the crate root");

    let mut failures = Vec::new();
    for (pattern, budget, why) in BUDGETS {
        let found = hits(&files, pattern);
        let count: usize = found.iter().map(|(_, c)| c).sum();
        if count > *budget {
            let detail: Vec<String> = found.iter().map(|(path, c)| format!("    {path}: {c}")).collect();
            failures.push(format!("`{pattern}` ({why}): found {count}, max {budget}\n{}", detail.join("\n")));
        }
    }
    assert!(failures.is_empty(), "hygiene budgets exceeded:\n{}", failures.join("\n"));
}

#[test]
fn every_module_has_a_test_file() {
    let files = production_files();
    let mut missing = Vec::new();
    for file in &files {
        let path = Path::new(&file.path);
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if UNTESTED_MODULES.contains(&stem) {
            continue;
        }
        let sibling = path.with_file_name(format!("{stem}_test.rs"));
        let wired = file.content.contains(&format!("#[path = \"{stem}_test.rs\"]"));
        if !sibling.exists() || !wired {
            missing.push(file.path.clone());
        }
    }
    assert!(missing.is_empty(), "modules without a wired sibling test file:\n  {}", missing.join("\n  "));
}
