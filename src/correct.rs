//! Image acquisition and correction.
//!
//! Every frame goes through the same fixed pipeline:
//!
//! ```text
//! resolve path → decode → [detector shape check] → flip → clip < 0 → − background
//! ```
//!
//! The background frame is decoded and flipped once, when the
//! [`ImageCorrector`] is built, so subtraction always happens in the sample's
//! orientation. It is never clipped and never refreshed afterwards.
//!
//! Clipping happens *before* subtraction and is not repeated, so a corrected
//! frame can hold negative values wherever the background is brighter than
//! the sample.
//!
//! ## Missing Background
//!
//! A background path that is configured but does not exist disables
//! background correction instead of failing. The corrector records this as
//! [`BackgroundStatus::Missing`] and logs a warning; callers that want to be
//! strict can check [`ImageCorrector::background_status`].

use crate::config::{LoaderConfig, Orientation};
use crate::imaging::{
    DecodeError, Decoder, Image, RustDecoder, ShapeMismatch, clip_negative, flip,
    subtract_background,
};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorrectionError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatch),
    #[error("{path}: frame is {found:?} (rows, cols), detector is configured as {expected:?}")]
    DetectorShape {
        path: PathBuf,
        expected: (usize, usize),
        found: (usize, usize),
    },
}

/// What happened to the configured background at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundStatus {
    /// No background path configured.
    Disabled,
    /// A path was configured but nothing exists there; correction is off.
    Missing(PathBuf),
    /// The background was decoded, flipped and cached.
    Loaded(PathBuf),
}

/// Loads detector frames and applies orientation and background correction.
///
/// Cheap to share across threads once built: the cached background is
/// read-only and each [`load_image`](Self::load_image) call allocates its own
/// output.
pub struct ImageCorrector<D = RustDecoder> {
    decoder: D,
    source_dir: PathBuf,
    orientation: Orientation,
    detector_shape: Option<(usize, usize)>,
    background: Option<Image>,
    background_status: BackgroundStatus,
}

impl ImageCorrector<RustDecoder> {
    /// Build a corrector that decodes with [`RustDecoder`].
    pub fn from_config(config: &LoaderConfig) -> Result<Self, CorrectionError> {
        Self::new(config, RustDecoder::new())
    }
}

impl<D: Decoder> ImageCorrector<D> {
    /// Build a corrector, decoding and caching the background if there is one.
    ///
    /// A background file that exists but cannot be decoded is an error.
    pub fn new(config: &LoaderConfig, decoder: D) -> Result<Self, CorrectionError> {
        let mut corrector = Self {
            decoder,
            source_dir: config.source_dir.clone(),
            orientation: config.orientation,
            detector_shape: config.detector.shape(),
            background: None,
            background_status: BackgroundStatus::Disabled,
        };

        if let Some(path) = config.background_path() {
            if path.exists() {
                let raw = corrector.decode_checked(path)?;
                corrector.background = Some(corrector.flip_image(&raw));
                corrector.background_status = BackgroundStatus::Loaded(path.to_path_buf());
                log::debug!("background correction enabled: {}", path.display());
            } else {
                log::warn!(
                    "background file {} does not exist; background correction disabled",
                    path.display()
                );
                corrector.background_status = BackgroundStatus::Missing(path.to_path_buf());
            }
        }

        Ok(corrector)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// The cached, already-flipped background frame.
    pub fn background(&self) -> Option<&Image> {
        self.background.as_ref()
    }

    pub fn background_status(&self) -> &BackgroundStatus {
        &self.background_status
    }

    pub fn background_enabled(&self) -> bool {
        self.background.is_some()
    }

    /// Apply the configured flips: columns first, then rows.
    pub fn flip_image(&self, image: &Image) -> Image {
        flip(image.view(), self.orientation)
    }

    /// Where [`load_image`](Self::load_image) will read `filename` from.
    ///
    /// An existing path is used as given; anything else is joined onto the
    /// source directory and lexically normalized.
    pub fn resolve_path(&self, filename: &Path) -> PathBuf {
        if filename.exists() {
            filename.to_path_buf()
        } else {
            normalize_path(&self.source_dir.join(filename))
        }
    }

    /// Load one frame: decode, flip, clip negatives, subtract the background.
    ///
    /// Every call re-reads the file.
    pub fn load_image(&self, filename: impl AsRef<Path>) -> Result<Image, CorrectionError> {
        let path = self.resolve_path(filename.as_ref());
        let raw = self.decode_checked(&path)?;

        let mut image = self.flip_image(&raw);
        clip_negative(&mut image);

        match &self.background {
            Some(background) => Ok(subtract_background(image, background)?),
            None => Ok(image),
        }
    }

    fn decode_checked(&self, path: &Path) -> Result<Image, CorrectionError> {
        let image = self.decoder.decode(path)?;
        if let Some(expected) = self.detector_shape {
            if image.dim() != expected {
                return Err(CorrectionError::DetectorShape {
                    path: path.to_path_buf(),
                    expected,
                    found: image.dim(),
                });
            }
        }
        Ok(image)
    }
}

/// Lexically normalize a path: drop `.`, fold `name/..`, keep leading `..`.
///
/// Does not touch the filesystem, so symlinks are not resolved.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}
