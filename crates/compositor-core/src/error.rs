use thiserror::Error;

use crate::raster::SampleType;

#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Shape mismatch: {what} is {found_width}x{found_height}, expected {width}x{height}")]
    ShapeMismatch {
        what: String,
        width: usize,
        height: usize,
        found_width: usize,
        found_height: usize,
    },

    #[error("Band count mismatch: input {index} has {found} bands, expected {expected}")]
    BandCountMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Sample type mismatch: input {index} is {found}, expected {expected}")]
    SampleTypeMismatch {
        index: usize,
        expected: SampleType,
        found: SampleType,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported raster format: {0}")]
    UnsupportedFormat(String),

    #[error("Raster has no bands")]
    EmptyRaster,
}

pub type Result<T> = std::result::Result<T, CompositorError>;
