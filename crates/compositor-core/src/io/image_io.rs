use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma, LumaA, Rgb, Rgba};

use crate::error::{CompositorError, Result};
use crate::raster::{AnyRaster, Raster};

use super::{deinterleave, interleave};

/// Load a PNG (or any other format `image` decodes) without changing its
/// band count or sample depth.
pub fn load_raster(path: &Path) -> Result<AnyRaster> {
    let img = image::open(path)?;
    let (w, h) = (img.width() as usize, img.height() as usize);
    let channels = img.color().channel_count() as usize;

    let raster = match img {
        DynamicImage::ImageLuma8(buf) => AnyRaster::U8(deinterleave(buf.as_raw(), w, h, channels)?),
        DynamicImage::ImageLumaA8(buf) => AnyRaster::U8(deinterleave(buf.as_raw(), w, h, channels)?),
        DynamicImage::ImageRgb8(buf) => AnyRaster::U8(deinterleave(buf.as_raw(), w, h, channels)?),
        DynamicImage::ImageRgba8(buf) => AnyRaster::U8(deinterleave(buf.as_raw(), w, h, channels)?),
        DynamicImage::ImageLuma16(buf) => AnyRaster::U16(deinterleave(buf.as_raw(), w, h, channels)?),
        DynamicImage::ImageLumaA16(buf) => AnyRaster::U16(deinterleave(buf.as_raw(), w, h, channels)?),
        DynamicImage::ImageRgb16(buf) => AnyRaster::U16(deinterleave(buf.as_raw(), w, h, channels)?),
        DynamicImage::ImageRgba16(buf) => AnyRaster::U16(deinterleave(buf.as_raw(), w, h, channels)?),
        DynamicImage::ImageRgb32F(buf) => AnyRaster::F32(deinterleave(buf.as_raw(), w, h, channels)?),
        DynamicImage::ImageRgba32F(buf) => AnyRaster::F32(deinterleave(buf.as_raw(), w, h, channels)?),
        other => {
            return Err(CompositorError::UnsupportedFormat(format!(
                "{}: color type {:?}",
                path.display(),
                other.color()
            )))
        }
    };
    Ok(raster)
}

/// Save an integer raster with 1 to 4 bands in the format implied by the
/// extension. Float rasters and wider band stacks need TIFF.
pub fn save_raster(path: &Path, raster: &AnyRaster) -> Result<()> {
    let img = match raster {
        AnyRaster::U8(r) => dynamic_u8(r)?,
        AnyRaster::U16(r) => dynamic_u16(r)?,
        AnyRaster::F32(_) => {
            return Err(CompositorError::UnsupportedFormat(format!(
                "{}: float rasters can only be written as TIFF",
                path.display()
            )))
        }
    };
    img.save(path)?;
    Ok(())
}

fn buffer_error(bands: usize) -> CompositorError {
    CompositorError::UnsupportedFormat(format!(
        "{bands}-band rasters can only be written as TIFF"
    ))
}

fn dynamic_u8(raster: &Raster<u8>) -> Result<DynamicImage> {
    let (w, h) = (raster.width() as u32, raster.height() as u32);
    let samples = interleave(raster);
    let bands = raster.band_count();
    let img = match bands {
        1 => ImageBuffer::<Luma<u8>, _>::from_raw(w, h, samples).map(DynamicImage::ImageLuma8),
        2 => ImageBuffer::<LumaA<u8>, _>::from_raw(w, h, samples).map(DynamicImage::ImageLumaA8),
        3 => ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, samples).map(DynamicImage::ImageRgb8),
        4 => ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, samples).map(DynamicImage::ImageRgba8),
        _ => None,
    };
    img.ok_or_else(|| buffer_error(bands))
}

fn dynamic_u16(raster: &Raster<u16>) -> Result<DynamicImage> {
    let (w, h) = (raster.width() as u32, raster.height() as u32);
    let samples = interleave(raster);
    let bands = raster.band_count();
    let img = match bands {
        1 => ImageBuffer::<Luma<u16>, _>::from_raw(w, h, samples).map(DynamicImage::ImageLuma16),
        2 => ImageBuffer::<LumaA<u16>, _>::from_raw(w, h, samples).map(DynamicImage::ImageLumaA16),
        3 => ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, samples).map(DynamicImage::ImageRgb16),
        4 => ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, samples).map(DynamicImage::ImageRgba16),
        _ => None,
    };
    img.ok_or_else(|| buffer_error(bands))
}
