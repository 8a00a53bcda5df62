pub mod geotiff;
pub mod image_io;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use ndarray::Array2;

use crate::error::{CompositorError, Result};
use crate::raster::{AnyRaster, ColorLayout, Raster, Sample, SampleType};

use self::geotiff::GeoMetadata;

/// Header-level description of a raster file.
#[derive(Clone, Debug)]
pub struct RasterInfo {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub sample_type: SampleType,
    pub geo: Option<GeoMetadata>,
}

impl RasterInfo {
    pub fn layout(&self) -> ColorLayout {
        ColorLayout::from_band_count(self.band_count)
    }
}

pub fn is_tiff(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("tif" | "tiff")
    )
}

/// Classic ("II*\0", "MM\0*") and BigTIFF ("II+\0", "MM\0+") signatures.
fn has_tiff_signature(path: &Path) -> Result<bool> {
    let mut magic = [0u8; 4];
    let mut file = File::open(path)?;
    if file.read(&mut magic)? < magic.len() {
        return Ok(false);
    }
    Ok(matches!(
        &magic,
        b"II*\0" | b"MM\0*" | b"II+\0" | b"MM\0+"
    ))
}

/// Read a raster, choosing the decoder from the file signature.
///
/// Quality sources located by suffix (`scene.tif.q`) carry no usable
/// extension, so the extension is not consulted.
pub fn read_raster(path: &Path) -> Result<AnyRaster> {
    if has_tiff_signature(path)? {
        geotiff::read_tiff(path)
    } else {
        image_io::load_raster(path)
    }
}

/// Write a raster, choosing the encoder from the file extension.
///
/// `geo` is only honored for TIFF destinations.
pub fn write_raster(path: &Path, raster: &AnyRaster, geo: Option<&GeoMetadata>) -> Result<()> {
    if is_tiff(path) {
        geotiff::write_tiff(path, raster, geo)
    } else {
        image_io::save_raster(path, raster)
    }
}

/// Dimensions, layout and georeferencing of a raster file.
pub fn probe_raster(path: &Path) -> Result<RasterInfo> {
    if has_tiff_signature(path)? {
        geotiff::probe_tiff(path)
    } else {
        let raster = image_io::load_raster(path)?;
        Ok(RasterInfo {
            width: raster.width(),
            height: raster.height(),
            band_count: raster.band_count(),
            sample_type: raster.sample_type(),
            geo: None,
        })
    }
}

/// Split pixel-interleaved samples into one array per band.
pub(crate) fn deinterleave<T: Sample>(
    samples: &[T],
    width: usize,
    height: usize,
    bands: usize,
) -> Result<Raster<T>> {
    if samples.len() != width * height * bands {
        return Err(CompositorError::UnsupportedFormat(format!(
            "expected {} samples for {width}x{height}x{bands}, found {}",
            width * height * bands,
            samples.len()
        )));
    }
    Raster::from_bands(
        (0..bands)
            .map(|b| Array2::from_shape_fn((height, width), |(row, col)| {
                samples[(row * width + col) * bands + b]
            }))
            .collect(),
    )
}

/// Pixel-interleave all bands of a raster.
pub(crate) fn interleave<T: Sample>(raster: &Raster<T>) -> Vec<T> {
    let (h, w) = raster.dim();
    let mut samples = Vec::with_capacity(h * w * raster.band_count());
    for row in 0..h {
        for col in 0..w {
            samples.extend(raster.bands().iter().map(|band| band[[row, col]]));
        }
    }
    samples
}
