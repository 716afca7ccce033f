//! Shared test utilities for the planar-load test suite.
//!
//! ```rust
//! use crate::test_helpers::*;
//! use tiff::encoder::colortype::GrayI32;
//!
//! let tmp = dir_with_files(&["a.tif", "b.tif"]);
//! let config = config_for(tmp.path());
//! write_tiff::<GrayI32>(&tmp.path().join("c.tif"), &ndarray::array![[-1.0, 2.0]], |v| v as i32);
//! ```

use crate::config::LoaderConfig;
use crate::imaging::Image;
use std::fs::File;
use std::path::Path;
use tempfile::TempDir;
use tiff::encoder::{TiffEncoder, TiffValue, colortype};

// =========================================================================
// Fixture setup
// =========================================================================

/// A temp directory holding placeholder files with the given names.
///
/// Selection only looks at names, so the content is irrelevant.
pub fn dir_with_files(names: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for name in names {
        std::fs::write(tmp.path().join(name), "placeholder").unwrap();
    }
    tmp
}

/// Default config pointed at `dir`.
pub fn config_for(dir: &Path) -> LoaderConfig {
    LoaderConfig {
        source_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

/// Write `image` as a single-channel TIFF of sample type `C`, converting
/// each value with `sample`.
pub fn write_tiff<C>(path: &Path, image: &Image, sample: impl Fn(f64) -> C::Inner)
where
    C: colortype::ColorType,
    [C::Inner]: TiffValue,
{
    let (rows, cols) = image.dim();
    let data: Vec<C::Inner> = image.iter().map(|&v| sample(v)).collect();
    let file = File::create(path).unwrap();
    TiffEncoder::new(file)
        .unwrap()
        .write_image::<C>(cols as u32, rows as u32, &data)
        .unwrap();
}
