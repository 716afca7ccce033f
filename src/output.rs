//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! 3 files in /data/run42
//! 001 frame_0001.tif
//! 002 frame_0002.tif
//! 003 frame_0003.tif
//! ```
//!
//! ## Load
//!
//! ```text
//! 001 frame_0001.tif
//!     2048x2048  min 0  max 65012  mean 231.4
//! 002 frame_0002.tif
//!     Error: background shape (2048, 2048) does not match image shape (1024, 1024)
//!
//! Loaded 1, failed 1
//! ```
//!
//! ## Check
//!
//! ```text
//! Source: /data/run42
//! Orientation: flip horizontal
//! Background: dark.tif
//! Selected: 120 files
//! ```

use crate::batch::FileOutcome;
use crate::config::{LoaderConfig, Orientation};
use crate::correct::BackgroundStatus;
use crate::imaging::ImageStats;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Human-readable orientation.
fn describe_orientation(orientation: Orientation) -> &'static str {
    match (orientation.flip_horizontal, orientation.flip_vertical) {
        (false, false) => "as stored",
        (true, false) => "flip horizontal",
        (false, true) => "flip vertical",
        (true, true) => "flip horizontal + vertical",
    }
}

fn describe_background(status: &BackgroundStatus) -> String {
    match status {
        BackgroundStatus::Disabled => "none".to_string(),
        BackgroundStatus::Missing(path) => format!("{} (missing, disabled)", path.display()),
        BackgroundStatus::Loaded(path) => path.display().to_string(),
    }
}

fn stats_line(s: &ImageStats) -> String {
    format!(
        "{}x{}  min {}  max {}  mean {:.1}",
        s.cols, s.rows, s.min, s.max, s.mean
    )
}

// ============================================================================
// List
// ============================================================================

pub fn format_selection(dir: &Path, names: &[String]) -> Vec<String> {
    let mut lines = vec![format!("{} in {}", plural(names.len(), "file"), dir.display())];
    lines.extend(
        names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{} {}", format_index(i + 1), name)),
    );
    lines
}

pub fn print_selection(dir: &Path, names: &[String]) {
    for line in format_selection(dir, names) {
        println!("{}", line);
    }
}

// ============================================================================
// Load
// ============================================================================

pub fn format_load_outcomes(outcomes: &[FileOutcome<ImageStats>]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut failed = 0;
    for (i, outcome) in outcomes.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), outcome.name));
        match &outcome.result {
            Ok(s) => lines.push(format!("{}{}", indent(1), stats_line(s))),
            Err(e) => {
                failed += 1;
                lines.push(format!("{}Error: {}", indent(1), e));
            }
        }
    }
    lines.push(String::new());
    lines.push(format!("Loaded {}, failed {}", outcomes.len() - failed, failed));
    lines
}

pub fn print_load_outcomes(outcomes: &[FileOutcome<ImageStats>]) {
    for line in format_load_outcomes(outcomes) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check(
    config: &LoaderConfig,
    background: &BackgroundStatus,
    selected: usize,
) -> Vec<String> {
    let mut lines = vec![
        format!("Source: {}", config.source_dir.display()),
        format!("Orientation: {}", describe_orientation(config.orientation)),
        format!("Background: {}", describe_background(background)),
    ];
    if let Some((rows, cols)) = config.detector.shape() {
        lines.push(format!("Detector: {}x{}", cols, rows));
    }
    lines.push(format!("Selected: {}", plural(selected, "file")));
    lines
}

pub fn print_check(config: &LoaderConfig, background: &BackgroundStatus, selected: usize) {
    for line in format_check(config, background, selected) {
        println!("{}", line);
    }
}
