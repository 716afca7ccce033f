//! Pure Rust decoder for detector frames.
//!
//! TIFF goes straight through the `tiff` crate, which hands back samples in
//! their stored type, signed and 32-bit layouts included. Everything else
//! (PNG in practice) goes through the `image` crate.
//!
//! ## Pixel mapping
//!
//! | Decoded layout | Intensity |
//! |---|---|
//! | TIFF gray, any sample type (`u8`..`u64`, `i8`..`i64`, `f32`, `f64`) | raw sample value |
//! | TIFF gray + alpha | first sample, alpha dropped |
//! | `L8`, `L16` | raw sample value |
//! | `La8`, `La16` | luma channel, alpha dropped |
//! | `Rgb32F`, `Rgba32F` | luminance, unscaled |
//! | anything else | [`DecodeError::Unsupported`] |
//!
//! Integer samples are never normalized to `0..1`: a 16-bit detector count
//! of 4000 stays 4000, and a signed gap marker of -1 stays -1.

use super::decoder::{DecodeError, Decoder, Image};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::{BufRead, Seek};
use std::path::Path;
use tiff::ColorType;
use tiff::decoder::DecodingResult;

/// Decoder for TIFF and PNG detector frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustDecoder;

impl RustDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RustDecoder {
    fn decode(&self, path: &Path) -> Result<Image, DecodeError> {
        let reader = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| DecodeError::io(path, e))?;

        if reader.format() == Some(ImageFormat::Tiff) {
            return decode_tiff(reader.into_inner(), path);
        }

        let image = reader.decode().map_err(|e| decode_error(path, e))?;
        log::debug!(
            "decoded {} ({}x{}, {:?})",
            path.display(),
            image.width(),
            image.height(),
            image.color()
        );
        to_intensities(&image, path)
    }
}

fn decode_error(path: &Path, e: impl std::fmt::Display) -> DecodeError {
    DecodeError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Read the first TIFF directory as a `(rows, cols)` intensity array.
fn decode_tiff<R: BufRead + Seek>(reader: R, path: &Path) -> Result<Image, DecodeError> {
    let mut decoder = tiff::decoder::Decoder::new(reader).map_err(|e| decode_error(path, e))?;
    let (width, height) = decoder.dimensions().map_err(|e| decode_error(path, e))?;
    let colortype = decoder.colortype().map_err(|e| decode_error(path, e))?;
    let channels = match colortype {
        ColorType::Gray(_) => 1,
        ColorType::GrayA(_) => 2,
        other => {
            return Err(DecodeError::Unsupported {
                path: path.to_path_buf(),
                layout: format!("TIFF {:?}", other),
            });
        }
    };

    let samples = tiff_samples(decoder.read_image().map_err(|e| decode_error(path, e))?);
    log::debug!(
        "decoded {} ({}x{}, TIFF {:?})",
        path.display(),
        width,
        height,
        colortype
    );

    let values: Vec<f64> = samples.into_iter().step_by(channels).collect();
    Image::from_shape_vec((height as usize, width as usize), values)
        .map_err(|e| decode_error(path, e))
}

/// Widen decoded TIFF samples to `f64`, keeping their stored values.
fn tiff_samples(result: DecodingResult) -> Vec<f64> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|s| s as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|s| s as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
    }
}

/// Convert a decoded image into a `(rows, cols)` intensity array.
fn to_intensities(image: &DynamicImage, path: &Path) -> Result<Image, DecodeError> {
    let rows = image.height() as usize;
    let cols = image.width() as usize;

    let values: Vec<f64> = match image {
        DynamicImage::ImageLuma8(buf) => buf.as_raw().iter().map(|&v| f64::from(v)).collect(),
        DynamicImage::ImageLuma16(buf) => buf.as_raw().iter().map(|&v| f64::from(v)).collect(),
        DynamicImage::ImageLumaA8(buf) => buf.pixels().map(|p| f64::from(p.0[0])).collect(),
        DynamicImage::ImageLumaA16(buf) => buf.pixels().map(|p| f64::from(p.0[0])).collect(),
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => image
            .to_luma32f()
            .into_raw()
            .into_iter()
            .map(f64::from)
            .collect(),
        other => {
            return Err(DecodeError::Unsupported {
                path: path.to_path_buf(),
                layout: format!("{:?}", other.color()),
            });
        }
    };

    Image::from_shape_vec((rows, cols), values).map_err(|e| decode_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_tiff;
    use image::{GrayImage, ImageBuffer, Luma, LumaA, RgbImage};
    use ndarray::array;
    use tempfile::TempDir;
    use tiff::encoder::TiffEncoder;
    use tiff::encoder::colortype::{
        Gray16, Gray32, Gray32Float, Gray64Float, GrayI16, GrayI32, RGB8,
    };

    #[test]
    fn decodes_16bit_tiff_without_scaling() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("frame.tif");
        let frame = array![[0.0, 1.0, 2.0], [1000.0, 1001.0, 1002.0]];
        write_tiff::<Gray16>(&path, &frame, |v| v as u16);

        let image = RustDecoder::new().decode(&path).unwrap();
        assert_eq!(image.dim(), (2, 3));
        assert_eq!(image[[0, 2]], 2.0);
        assert_eq!(image[[1, 0]], 1000.0);
        assert_eq!(image[[1, 2]], 1002.0);
    }

    #[test]
    fn decodes_signed_32bit_tiff_with_negatives() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pilatus.tif");
        let frame = array![[-2.0, 500.0], [-1.0, 1_000_000.0]];
        write_tiff::<GrayI32>(&path, &frame, |v| v as i32);

        assert_eq!(RustDecoder::new().decode(&path).unwrap(), frame);
    }

    #[test]
    fn decodes_unsigned_32bit_tiff_above_16bit_range() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("frame.tif");
        let frame = array![[7.0, 70_000.0]];
        write_tiff::<Gray32>(&path, &frame, |v| v as u32);

        assert_eq!(RustDecoder::new().decode(&path).unwrap(), frame);
    }

    #[test]
    fn decodes_float_tiffs() {
        let tmp = TempDir::new().unwrap();
        let frame = array![[-1.5, 1000.25], [0.0, 3.75]];

        let single = tmp.path().join("f32.tif");
        write_tiff::<Gray32Float>(&single, &frame, |v| v as f32);
        assert_eq!(RustDecoder::new().decode(&single).unwrap(), frame);

        let double = tmp.path().join("f64.tif");
        write_tiff::<Gray64Float>(&double, &frame, |v| v);
        assert_eq!(RustDecoder::new().decode(&double).unwrap(), frame);
    }

    #[test]
    fn decodes_signed_16bit_tiff() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("frame.tif");
        let frame = array![[-300.0], [300.0]];
        write_tiff::<GrayI16>(&path, &frame, |v| v as i16);

        assert_eq!(RustDecoder::new().decode(&path).unwrap(), frame);
    }

    #[test]
    fn rgb_tiff_is_unsupported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("color.tif");
        let file = std::fs::File::create(&path).unwrap();
        TiffEncoder::new(file)
            .unwrap()
            .write_image::<RGB8>(1, 1, &[1, 2, 3])
            .unwrap();

        let err = RustDecoder::new().decode(&path).unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported { .. }));
    }

    #[test]
    fn decodes_8bit_png_row_major() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("frame.png");
        let buf = GrayImage::from_fn(4, 1, |x, _| Luma([x as u8 * 10]));
        buf.save(&path).unwrap();

        let image = RustDecoder::new().decode(&path).unwrap();
        assert_eq!(image, array![[0.0, 10.0, 20.0, 30.0]]);
    }

    #[test]
    fn luma_alpha_drops_alpha() {
        let buf: ImageBuffer<LumaA<u8>, Vec<u8>> =
            ImageBuffer::from_fn(2, 1, |x, _| LumaA([x as u8 + 7, 255]));
        let image = to_intensities(&DynamicImage::ImageLumaA8(buf), Path::new("x")).unwrap();
        assert_eq!(image, array![[7.0, 8.0]]);
    }

    #[test]
    fn rgb8_is_unsupported() {
        let buf = RgbImage::new(2, 2);
        let err =
            to_intensities(&DynamicImage::ImageRgb8(buf), Path::new("color.png")).unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = RustDecoder::new()
            .decode(&tmp.path().join("absent.tif"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn garbage_file_is_decode_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("junk.tif");
        std::fs::write(&path, b"definitely not a tiff").unwrap();

        let err = RustDecoder::new().decode(&path).unwrap_err();
        assert!(matches!(err, DecodeError::Decode { .. }));
    }
}
