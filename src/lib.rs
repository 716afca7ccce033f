//! # planar-load
//!
//! Detector frame loading for 2-D diffraction image reduction. Picks the
//! frames to reduce out of a directory by name, then loads each one into an
//! `f64` array that is oriented, clipped and background-corrected, ready for
//! integration further downstream.
//!
//! # Architecture: Select, then Load
//!
//! ```text
//! 1. Select   source_dir  →  sorted file names   (include ∪, exclude ∪, allow-list)
//! 2. Load     file name   →  Array2<f64>         (decode → flip → clip → − background)
//! ```
//!
//! The two stages share nothing but the [`config::LoaderConfig`] they are
//! built from. Selection is a pure function of a directory listing and three
//! pattern lists; loading owns one piece of state, the background frame,
//! which is fixed when the [`correct::ImageCorrector`] is built.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`select`] | Stage 1 — glob-based set algebra over a directory listing |
//! | [`correct`] | Stage 2 — path resolution, orientation, clipping, background subtraction |
//! | [`imaging`] | Decoder trait, `image`-crate decoder, array operations |
//! | [`batch`] | Parallel select → load over many frames, per-file outcomes |
//! | [`config`] | Layered TOML configuration: stock defaults → file → CLI flags |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit Configuration
//!
//! The configuration is an ordinary immutable value passed by reference.
//! Nothing looks it up globally, so two differently-configured loaders can
//! live side by side (and tests build their own).
//!
//! ## Order of Corrections
//!
//! Negative intensities are clipped to zero *before* the background is
//! subtracted, and the subtraction result is returned as is. Frames and
//! background are both flipped the same way, so subtraction always lines up.
//!
//! ## Missing Background Is Not an Error
//!
//! A configured background file that does not exist turns background
//! correction off with a logged warning rather than failing the run. The
//! outcome is visible through [`correct::BackgroundStatus`].

pub mod batch;
pub mod config;
pub mod correct;
pub mod imaging;
pub mod output;
pub mod select;

pub use config::LoaderConfig;
pub use correct::{BackgroundStatus, CorrectionError, ImageCorrector};
pub use imaging::{DecodeError, Decoder, Image, RustDecoder};
pub use select::{FileSelector, SelectError, SelectionRequest};

#[cfg(test)]
pub(crate) mod test_helpers;
