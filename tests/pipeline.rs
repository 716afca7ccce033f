//! End-to-end select → load over real TIFF files on disk.
//!
//! Most frames are unsigned 16-bit grayscale; the signed 32-bit frames carry
//! the negative gap markers that clipping exists for.

use ndarray::{Array2, array};
use planar_load::batch::{LoadSummary, summarize_each};
use planar_load::config::{self, LoaderConfig, Orientation};
use planar_load::{
    BackgroundStatus, CorrectionError, FileSelector, ImageCorrector, SelectionRequest,
};
use std::fs::{self, File};
use std::path::Path;
use tempfile::TempDir;
use tiff::encoder::TiffEncoder;
use tiff::encoder::colortype::{Gray16, GrayI32};

fn write_tiff16(path: &Path, image: &Array2<f64>) {
    let (rows, cols) = image.dim();
    let data: Vec<u16> = image.iter().map(|&v| v as u16).collect();
    TiffEncoder::new(File::create(path).unwrap())
        .unwrap()
        .write_image::<Gray16>(cols as u32, rows as u32, &data)
        .unwrap();
}

fn write_tiff_i32(path: &Path, image: &Array2<f64>) {
    let (rows, cols) = image.dim();
    let data: Vec<i32> = image.iter().map(|&v| v as i32).collect();
    TiffEncoder::new(File::create(path).unwrap())
        .unwrap()
        .write_image::<GrayI32>(cols as u32, rows as u32, &data)
        .unwrap();
}

/// A run directory with two sample frames, a dark frame and some noise.
fn run_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    write_tiff16(&dir.join("frame_002.tif"), &array![[10.0, 20.0], [30.0, 40.0]]);
    write_tiff16(&dir.join("frame_001.tif"), &array![[1.0, 2.0], [3.0, 4.0]]);
    write_tiff16(&dir.join("run.dark.tif"), &array![[1.0, 1.0], [2.0, 2.0]]);
    fs::write(dir.join("notes.txt"), "beamline log").unwrap();
    tmp
}

#[test]
fn default_rules_select_sample_frames_sorted() {
    let tmp = run_dir();
    let config = LoaderConfig {
        source_dir: tmp.path().to_path_buf(),
        ..Default::default()
    };

    let names = FileSelector::new(&config)
        .list_files(&SelectionRequest::default())
        .unwrap();
    assert_eq!(names, vec!["frame_001.tif", "frame_002.tif"]);
}

#[test]
fn full_pipeline_with_background_and_flip() {
    let tmp = run_dir();
    let config = LoaderConfig {
        source_dir: tmp.path().to_path_buf(),
        background_file: Some(tmp.path().join("run.dark.tif")),
        orientation: Orientation {
            flip_horizontal: true,
            flip_vertical: false,
        },
        ..Default::default()
    };
    let corrector = ImageCorrector::from_config(&config).unwrap();
    assert!(matches!(
        corrector.background_status(),
        BackgroundStatus::Loaded(_)
    ));

    // raw [[10, 20], [30, 40]] → flipped [[20, 10], [40, 30]]
    // dark [[1, 1], [2, 2]]    → flipped [[1, 1], [2, 2]]
    let image = corrector.load_image("frame_002.tif").unwrap();
    assert_eq!(image, array![[19.0, 9.0], [38.0, 28.0]]);
}

#[test]
fn signed_frames_are_clipped_before_background_subtraction() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    // -1 marks module gaps, -2 bad pixels
    write_tiff_i32(&dir.join("img_0001.tif"), &array![[-1.0, 100.0], [250.0, -2.0]]);
    write_tiff_i32(&dir.join("img.dark.tif"), &array![[5.0, 5.0], [5.0, 5.0]]);
    let config = LoaderConfig {
        source_dir: dir.to_path_buf(),
        background_file: Some(dir.join("img.dark.tif")),
        orientation: Orientation {
            flip_horizontal: false,
            flip_vertical: true,
        },
        ..Default::default()
    };

    let names = FileSelector::new(&config)
        .list_files(&SelectionRequest::default())
        .unwrap();
    assert_eq!(names, vec!["img_0001.tif"]);

    // flipped [[250, -2], [-1, 100]] → clipped [[250, 0], [0, 100]] → minus 5
    let corrector = ImageCorrector::from_config(&config).unwrap();
    let image = corrector.load_image(&names[0]).unwrap();
    assert_eq!(image, array![[245.0, -5.0], [-5.0, 95.0]]);

    let uncorrected = ImageCorrector::from_config(&LoaderConfig {
        background_file: None,
        ..config.clone()
    })
    .unwrap();
    let image = uncorrected.load_image(&names[0]).unwrap();
    assert!(image.iter().all(|&v| v >= 0.0));
}

#[test]
fn config_file_drives_selection_and_loading() {
    let tmp = run_dir();
    let config_path = tmp.path().join("planar-load.toml");
    fs::write(
        &config_path,
        format!(
            r#"
source_dir = "{}"

[selection]
include = ["*.tif"]
exclude = ["*.dark.tif"]
filenames = ["*_002*"]

[orientation]
flip_vertical = true
"#,
            tmp.path().display()
        ),
    )
    .unwrap();

    let config = config::load_config(Some(config_path.as_path()), None).unwrap();
    let names = FileSelector::new(&config)
        .list_files(&SelectionRequest::default())
        .unwrap();
    assert_eq!(names, vec!["frame_002.tif"]);

    let corrector = ImageCorrector::from_config(&config).unwrap();
    let image = corrector.load_image(&names[0]).unwrap();
    assert_eq!(image, array![[30.0, 40.0], [10.0, 20.0]]);
}

#[test]
fn missing_background_loads_uncorrected() {
    let tmp = run_dir();
    let config = LoaderConfig {
        source_dir: tmp.path().to_path_buf(),
        background_file: Some(tmp.path().join("no-such-dark.tif")),
        ..Default::default()
    };

    let corrector = ImageCorrector::from_config(&config).unwrap();
    assert!(!corrector.background_enabled());
    let image = corrector.load_image("frame_001.tif").unwrap();
    assert_eq!(image, array![[1.0, 2.0], [3.0, 4.0]]);
}

#[test]
fn file_removed_after_listing_is_decode_error() {
    let tmp = run_dir();
    let config = LoaderConfig {
        source_dir: tmp.path().to_path_buf(),
        ..Default::default()
    };
    let names = FileSelector::new(&config)
        .list_files(&SelectionRequest::default())
        .unwrap();
    fs::remove_file(tmp.path().join(&names[0])).unwrap();

    let corrector = ImageCorrector::from_config(&config).unwrap();
    let err = corrector.load_image(&names[0]).unwrap_err();
    assert!(matches!(err, CorrectionError::Decode(ref e) if e.is_not_found()));

    // The rest of the batch still loads
    let outcomes = summarize_each(&corrector, &names);
    assert!(outcomes[0].result.is_err());
    assert!(outcomes[1].result.is_ok());
}

#[test]
fn mismatched_background_shape_fails_each_frame() {
    let tmp = run_dir();
    write_tiff16(&tmp.path().join("big.dark.tif"), &Array2::zeros((3, 3)));
    let config = LoaderConfig {
        source_dir: tmp.path().to_path_buf(),
        background_file: Some(tmp.path().join("big.dark.tif")),
        ..Default::default()
    };
    let corrector = ImageCorrector::from_config(&config).unwrap();
    let names = FileSelector::new(&config)
        .list_files(&SelectionRequest::default())
        .unwrap();

    let outcomes = summarize_each(&corrector, &names);
    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o.result, Err(CorrectionError::ShapeMismatch(_))))
    );

    let summary = LoadSummary::new(&corrector, tmp.path().to_path_buf(), &outcomes);
    assert_eq!(summary.loaded, 0);
    assert_eq!(summary.failed, 2);
}
