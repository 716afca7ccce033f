//! Image decoding and pixel operations — pure Rust.
//!
//! | Concern | Where |
//! |---|---|
//! | **Decode** | [`Decoder`] trait, [`RustDecoder`] (`tiff` crate for TIFF, `image` for PNG) |
//! | **Orient** | [`operations::flip`] |
//! | **Clip** | [`operations::clip_negative`] |
//! | **Background** | [`operations::subtract_background`] |
//! | **Summaries** | [`operations::stats`] |
//!
//! Frames are `ndarray::Array2<f64>` indexed `[row, col]`.

pub mod decoder;
pub mod operations;
pub mod rust_decoder;

pub use decoder::{DecodeError, Decoder, Image};
pub use operations::{ImageStats, ShapeMismatch, clip_negative, flip, stats, subtract_background};
pub use rust_decoder::RustDecoder;
