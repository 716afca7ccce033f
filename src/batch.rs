//! Batch loading: select, then load every selected frame.
//!
//! Frames are loaded in parallel using [rayon](https://docs.rs/rayon). The
//! corrector is shared read-only between workers; each frame gets its own
//! output array. Results come back in the order of the input names (which
//! [`FileSelector::list_files`](crate::select::FileSelector::list_files)
//! hands out sorted), and a frame that fails to load is reported on its own
//! without stopping the rest.

use crate::correct::{BackgroundStatus, CorrectionError, ImageCorrector};
use crate::imaging::{Decoder, Image, ImageStats, stats};
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;

/// The result of loading one named frame.
#[derive(Debug)]
pub struct FileOutcome<R> {
    pub name: String,
    pub result: Result<R, CorrectionError>,
}

/// Load each of `names` and hand the corrected frame to `f`.
///
/// Whatever `f` returns is collected; the frame itself is dropped right
/// after, so large batches never hold more than one frame per worker.
pub fn load_each<D, R, F>(
    corrector: &ImageCorrector<D>,
    names: &[String],
    f: F,
) -> Vec<FileOutcome<R>>
where
    D: Decoder,
    R: Send,
    F: Fn(&str, Image) -> R + Sync,
{
    names
        .par_iter()
        .map(|name| {
            let result = corrector.load_image(name).map(|image| f(name, image));
            if let Err(e) = &result {
                log::debug!("failed to load {name}: {e}");
            }
            FileOutcome {
                name: name.clone(),
                result,
            }
        })
        .collect()
}

/// Load each frame and keep only its summary statistics.
pub fn summarize_each<D: Decoder>(
    corrector: &ImageCorrector<D>,
    names: &[String],
) -> Vec<FileOutcome<ImageStats>> {
    load_each(corrector, names, |_, image| stats(&image))
}

/// Serializable report of a batch run, written by `load --summary`.
#[derive(Debug, Serialize)]
pub struct LoadSummary {
    pub source_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<PathBuf>,
    pub loaded: usize,
    pub failed: usize,
    pub files: Vec<FileSummary>,
}

#[derive(Debug, Serialize)]
pub struct FileSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ImageStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadSummary {
    pub fn new<D: Decoder>(
        corrector: &ImageCorrector<D>,
        source_dir: PathBuf,
        outcomes: &[FileOutcome<ImageStats>],
    ) -> Self {
        let background = match corrector.background_status() {
            BackgroundStatus::Loaded(path) => Some(path.clone()),
            _ => None,
        };
        let files: Vec<FileSummary> = outcomes
            .iter()
            .map(|o| match &o.result {
                Ok(s) => FileSummary {
                    name: o.name.clone(),
                    stats: Some(*s),
                    error: None,
                },
                Err(e) => FileSummary {
                    name: o.name.clone(),
                    stats: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();
        let failed = files.iter().filter(|f| f.error.is_some()).count();
        Self {
            source_dir,
            background,
            loaded: files.len() - failed,
            failed,
            files,
        }
    }
}
