//! Image decoder trait and shared types.
//!
//! The [`Decoder`] trait is the single seam between the correction pipeline
//! and whatever turns file bytes into intensities. The production
//! implementation is [`RustDecoder`](super::rust_decoder::RustDecoder); tests
//! plug in [`tests::MockDecoder`], which serves synthetic arrays.

use ndarray::Array2;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A detector frame: `[row, col]` indexed intensities.
pub type Image = Array2<f64>;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("Unsupported pixel layout {layout} in {path}")]
    Unsupported { path: PathBuf, layout: String },
}

impl DecodeError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True when the file itself was not there.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Turns an image file into a 2-D intensity array.
///
/// Implementations must be `Sync`: one decoder is shared by every worker
/// when a batch is loaded in parallel.
pub trait Decoder: Sync {
    fn decode(&self, path: &Path) -> Result<Image, DecodeError>;
}

impl<T: Decoder + ?Sized> Decoder for &T {
    fn decode(&self, path: &Path) -> Result<Image, DecodeError> {
        (**self).decode(path)
    }
}
