//! Input file selection.
//!
//! Picks the detector frames in a directory by name. Selection is three
//! ordered set operations over the (non-recursive) directory listing:
//!
//! ```text
//! include  = ⋃ entries matching any include pattern
//! exclude  = ⋃ entries matching any exclude pattern
//! selected = include − exclude
//! if filenames non-empty:
//!     selected = { e ∈ selected | e matches any filenames pattern }
//! ```
//!
//! The order matters: the allow-list only narrows what include/exclude left
//! behind, so it can never bring back an excluded file.
//!
//! ## Pattern Syntax
//!
//! Shell globs as implemented by [`glob::Pattern`]: `*`, `?`, `[abc]`,
//! `[!abc]` and ranges. Matching is case-sensitive and applies to the bare
//! file name, so `*` happily matches a leading dot and `**` is just `*`.
//!
//! ## Defaults
//!
//! Every part of a [`SelectionRequest`] that is left as `None` is taken from
//! the [`LoaderConfig`] at call time, so a selector always reflects the
//! configuration it was built with.

use crate::config::LoaderConfig;
use glob::Pattern;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SelectError {
    #[error("Cannot list directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Per-call overrides of the configured selection rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionRequest<'a> {
    /// Allow-list patterns; `Some(&[])` disables the allow-list.
    pub filenames: Option<&'a [String]>,
    pub directory: Option<&'a Path>,
    pub include: Option<&'a [String]>,
    pub exclude: Option<&'a [String]>,
}

/// Selects input files according to the configured pattern rules.
pub struct FileSelector<'a> {
    config: &'a LoaderConfig,
}

impl<'a> FileSelector<'a> {
    pub fn new(config: &'a LoaderConfig) -> Self {
        Self { config }
    }

    /// Select matching entry names as an unordered set.
    pub fn select_files(
        &self,
        request: &SelectionRequest<'_>,
    ) -> Result<HashSet<String>, SelectError> {
        let selection = &self.config.selection;
        let directory = request
            .directory
            .unwrap_or(self.config.source_dir.as_path());
        let include = request.include.unwrap_or(selection.include.as_slice());
        let exclude = request.exclude.unwrap_or(selection.exclude.as_slice());
        let filenames = request.filenames.unwrap_or(selection.filenames.as_slice());

        let entries = list_directory(directory)?;
        let selected = filter_names(&entries, include, exclude, filenames)?;
        log::debug!(
            "selected {} of {} entries in {}",
            selected.len(),
            entries.len(),
            directory.display()
        );
        Ok(selected)
    }

    /// Select matching entry names, sorted ascending.
    pub fn list_files(&self, request: &SelectionRequest<'_>) -> Result<Vec<String>, SelectError> {
        let mut names: Vec<String> = self.select_files(request)?.into_iter().collect();
        names.sort();
        Ok(names)
    }
}

/// Apply the include/exclude/allow-list stages to an in-memory listing.
pub fn filter_names<S: AsRef<str>>(
    entries: &[S],
    include: &[String],
    exclude: &[String],
    filenames: &[String],
) -> Result<HashSet<String>, SelectError> {
    let include = compile(include)?;
    let exclude = compile(exclude)?;
    let allow = compile(filenames)?;

    let included = matching(entries.iter().map(|e| e.as_ref()), &include);
    let excluded = matching(entries.iter().map(|e| e.as_ref()), &exclude);
    let selected: HashSet<String> = included.difference(&excluded).cloned().collect();

    if allow.is_empty() {
        return Ok(selected);
    }
    Ok(matching(selected.iter().map(String::as_str), &allow))
}

/// Names matching at least one of `patterns`.
fn matching<'n>(names: impl Iterator<Item = &'n str>, patterns: &[Pattern]) -> HashSet<String> {
    names
        .filter(|name| patterns.iter().any(|p| p.matches(name)))
        .map(str::to_string)
        .collect()
}

/// Compile a shell glob for matching bare entry names.
///
/// Names never contain `/`, so a run of `*` matches exactly what a single `*`
/// does. It is collapsed before compiling, which keeps `a**b` valid as it is
/// for `fnmatch`.
pub fn name_pattern(pattern: &str) -> Result<Pattern, glob::PatternError> {
    let mut collapsed = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && collapsed.ends_with('*') {
            continue;
        }
        collapsed.push(c);
    }
    Pattern::new(&collapsed)
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, SelectError> {
    patterns
        .iter()
        .map(|pattern| {
            name_pattern(pattern).map_err(|source| SelectError::Pattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Entry names of `dir`, files and subdirectories alike.
fn list_directory(dir: &Path) -> Result<Vec<String>, SelectError> {
    let io_err = |source| SelectError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => log::debug!("skipping non-UTF-8 entry {:?} in {}", raw, dir.display()),
        }
    }
    Ok(names)
}
