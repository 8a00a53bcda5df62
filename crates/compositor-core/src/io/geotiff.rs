use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{self, ColorType as EncoderColorType};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind, TiffValue};
use tiff::tags::{CompressionMethod, PlanarConfiguration, Tag};
use tiff::ColorType;
use tracing::debug;

use crate::error::{CompositorError, Result};
use crate::raster::{AnyRaster, Raster, Sample, SampleType};

use super::{deinterleave, interleave, RasterInfo};

/// GeoTIFF georeferencing tags, copied verbatim from a template raster.
///
/// The compositor never interprets these; it only carries them from the
/// template onto the rasters it writes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeoMetadata {
    pub pixel_scale: Option<Vec<f64>>,
    pub tiepoints: Option<Vec<f64>>,
    pub transformation: Option<Vec<f64>>,
    pub key_directory: Option<Vec<u16>>,
    pub double_params: Option<Vec<f64>>,
    pub ascii_params: Option<String>,
    /// GDAL_NODATA, stored as ASCII.
    pub nodata: Option<String>,
}

impl GeoMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn read<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Self> {
        let f64s = |decoder: &mut Decoder<R>, tag: Tag| -> Result<Option<Vec<f64>>> {
            Ok(decoder.find_tag(tag)?.map(|v| v.into_f64_vec()).transpose()?)
        };
        let ascii = |decoder: &mut Decoder<R>, tag: Tag| -> Result<Option<String>> {
            Ok(decoder.find_tag(tag)?.map(|v| v.into_string()).transpose()?)
        };

        Ok(Self {
            pixel_scale: f64s(decoder, Tag::ModelPixelScaleTag)?,
            tiepoints: f64s(decoder, Tag::ModelTiepointTag)?,
            transformation: f64s(decoder, Tag::ModelTransformationTag)?,
            key_directory: decoder
                .find_tag(Tag::GeoKeyDirectoryTag)?
                .map(|v| v.into_u16_vec())
                .transpose()?,
            double_params: f64s(decoder, Tag::GeoDoubleParamsTag)?,
            ascii_params: ascii(decoder, Tag::GeoAsciiParamsTag)?,
            nodata: ascii(decoder, Tag::GdalNodata)?,
        })
    }

    fn write<W: Write + Seek, K: TiffKind>(
        &self,
        directory: &mut DirectoryEncoder<'_, W, K>,
    ) -> Result<()> {
        if let Some(v) = &self.pixel_scale {
            directory.write_tag(Tag::ModelPixelScaleTag, &v[..])?;
        }
        if let Some(v) = &self.tiepoints {
            directory.write_tag(Tag::ModelTiepointTag, &v[..])?;
        }
        if let Some(v) = &self.transformation {
            directory.write_tag(Tag::ModelTransformationTag, &v[..])?;
        }
        if let Some(v) = &self.key_directory {
            directory.write_tag(Tag::GeoKeyDirectoryTag, &v[..])?;
        }
        if let Some(v) = &self.double_params {
            directory.write_tag(Tag::GeoDoubleParamsTag, &v[..])?;
        }
        if let Some(s) = &self.ascii_params {
            directory.write_tag(Tag::GeoAsciiParamsTag, s.as_str())?;
        }
        if let Some(s) = &self.nodata {
            directory.write_tag(Tag::GdalNodata, s.as_str())?;
        }
        Ok(())
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?)
}

fn samples_per_pixel(color: ColorType) -> Result<usize> {
    match color {
        ColorType::Gray(_) => Ok(1),
        ColorType::GrayA(_) => Ok(2),
        ColorType::RGB(_) => Ok(3),
        ColorType::RGBA(_) => Ok(4),
        ColorType::Multiband { num_samples, .. } => Ok(usize::from(num_samples)),
        other => Err(CompositorError::UnsupportedFormat(format!(
            "TIFF color type {other:?}"
        ))),
    }
}

fn page_sample_type<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<SampleType> {
    let bits = match decoder.colortype()? {
        ColorType::Gray(b)
        | ColorType::GrayA(b)
        | ColorType::RGB(b)
        | ColorType::RGBA(b)
        | ColorType::Multiband { bit_depth: b, .. } => b,
        other => {
            return Err(CompositorError::UnsupportedFormat(format!(
                "TIFF color type {other:?}"
            )))
        }
    };
    // SampleFormat 3 = IEEE floating point
    let is_float = decoder
        .find_tag(Tag::SampleFormat)?
        .map(|v| v.into_u16_vec())
        .transpose()?
        .is_some_and(|formats| formats.first() == Some(&3));

    match (bits, is_float) {
        (8, false) => Ok(SampleType::U8),
        (16, false) => Ok(SampleType::U16),
        (32 | 64, true) => Ok(SampleType::F32),
        _ => Err(CompositorError::UnsupportedFormat(format!(
            "{bits}-bit {} TIFF samples",
            if is_float { "float" } else { "integer" }
        ))),
    }
}

fn read_page<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<AnyRaster> {
    let (w, h) = decoder.dimensions()?;
    let (w, h) = (w as usize, h as usize);
    let bands = samples_per_pixel(decoder.colortype()?)?;

    match decoder.read_image()? {
        DecodingResult::U8(data) => Ok(AnyRaster::U8(deinterleave(&data, w, h, bands)?)),
        DecodingResult::U16(data) => Ok(AnyRaster::U16(deinterleave(&data, w, h, bands)?)),
        DecodingResult::F32(data) => Ok(AnyRaster::F32(deinterleave(&data, w, h, bands)?)),
        DecodingResult::F64(data) => {
            let data: Vec<f32> = data.iter().map(|&v| v as f32).collect();
            Ok(AnyRaster::F32(deinterleave(&data, w, h, bands)?))
        }
        _ => Err(CompositorError::UnsupportedFormat(
            "TIFF sample format (expected u8, u16, f32 or f64)".into(),
        )),
    }
}

fn append_pages<T: Sample>(
    first: Raster<T>,
    rest: impl Iterator<Item = AnyRaster>,
) -> Result<Raster<T>> {
    let mut bands = first.into_bands();
    for page in rest {
        let found = page.sample_type();
        let raster = T::from_any(page).map_err(|_| {
            CompositorError::UnsupportedFormat(format!(
                "pages mix {} and {found} samples",
                T::SAMPLE_TYPE
            ))
        })?;
        bands.extend(raster.into_bands());
    }
    Raster::from_bands(bands)
}

/// Read a TIFF. Multi-page files become one raster with the pages'
/// bands concatenated in page order.
///
/// Rasters written by [`write_tiff`] always fit in the first page; extra
/// pages are only read from files produced elsewhere.
pub fn read_tiff(path: &Path) -> Result<AnyRaster> {
    let mut decoder = open_decoder(path)?;
    let mut pages = vec![read_page(&mut decoder)?];
    while decoder.more_images() {
        decoder.next_image()?;
        pages.push(read_page(&mut decoder)?);
    }
    debug!(path = %path.display(), pages = pages.len(), "Read TIFF");

    let mut pages = pages.into_iter();
    match pages.next().ok_or(CompositorError::EmptyRaster)? {
        AnyRaster::U8(r) => Ok(AnyRaster::U8(append_pages(r, pages)?)),
        AnyRaster::U16(r) => Ok(AnyRaster::U16(append_pages(r, pages)?)),
        AnyRaster::F32(r) => Ok(AnyRaster::F32(append_pages(r, pages)?)),
    }
}

/// Georeferencing tags of the first page of a TIFF.
pub fn read_geo_metadata(path: &Path) -> Result<GeoMetadata> {
    let mut decoder = open_decoder(path)?;
    GeoMetadata::read(&mut decoder)
}

/// Inspect a TIFF without decoding its pixels.
pub fn probe_tiff(path: &Path) -> Result<RasterInfo> {
    let mut decoder = open_decoder(path)?;
    let (w, h) = decoder.dimensions()?;
    let sample_type = page_sample_type(&mut decoder)?;
    let geo = GeoMetadata::read(&mut decoder)?;

    let mut band_count = samples_per_pixel(decoder.colortype()?)?;
    while decoder.more_images() {
        decoder.next_image()?;
        band_count += samples_per_pixel(decoder.colortype()?)?;
    }

    Ok(RasterInfo {
        width: w as usize,
        height: h as usize,
        band_count,
        sample_type,
        geo: (!geo.is_empty()).then_some(geo),
    })
}

/// Write a raster as TIFF.
///
/// Every band goes into a single pixel-interleaved page. Gray, RGB and RGBA
/// integer rasters use the matching photometric interpretation; any other
/// band count, and every multi-band float raster, is written as
/// BlackIsZero with the bands past the first declared as extra samples.
pub fn write_tiff(path: &Path, raster: &AnyRaster, geo: Option<&GeoMetadata>) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(file)?;

    match raster {
        AnyRaster::U8(r) => match r.band_count() {
            1 => write_interleaved::<_, colortype::Gray8>(&mut encoder, r, geo),
            3 => write_interleaved::<_, colortype::RGB8>(&mut encoder, r, geo),
            4 => write_interleaved::<_, colortype::RGBA8>(&mut encoder, r, geo),
            _ => write_multiband::<_, colortype::Gray8>(&mut encoder, r, geo),
        },
        AnyRaster::U16(r) => match r.band_count() {
            1 => write_interleaved::<_, colortype::Gray16>(&mut encoder, r, geo),
            3 => write_interleaved::<_, colortype::RGB16>(&mut encoder, r, geo),
            4 => write_interleaved::<_, colortype::RGBA16>(&mut encoder, r, geo),
            _ => write_multiband::<_, colortype::Gray16>(&mut encoder, r, geo),
        },
        AnyRaster::F32(r) => match r.band_count() {
            1 => write_interleaved::<_, colortype::Gray32Float>(&mut encoder, r, geo),
            _ => write_multiband::<_, colortype::Gray32Float>(&mut encoder, r, geo),
        },
    }?;

    debug!(
        path = %path.display(),
        bands = raster.band_count(),
        georeferenced = geo.is_some(),
        "Wrote TIFF"
    );
    Ok(())
}

fn write_interleaved<W, C>(
    encoder: &mut TiffEncoder<W>,
    raster: &Raster<C::Inner>,
    geo: Option<&GeoMetadata>,
) -> Result<()>
where
    W: Write + Seek,
    C: EncoderColorType,
    C::Inner: Sample,
    [C::Inner]: TiffValue,
{
    let mut image = encoder.new_image::<C>(raster.width() as u32, raster.height() as u32)?;
    if let Some(geo) = geo {
        geo.write(image.encoder())?;
    }
    image.write_data(&interleave(raster))?;
    Ok(())
}

/// One uncompressed strip holding all bands, written tag by tag because
/// the encoder's color types have a fixed sample count.
fn write_multiband<W, C>(
    encoder: &mut TiffEncoder<W>,
    raster: &Raster<C::Inner>,
    geo: Option<&GeoMetadata>,
) -> Result<()>
where
    W: Write + Seek,
    C: EncoderColorType,
    C::Inner: Sample,
    [C::Inner]: TiffValue,
{
    let bands = raster.band_count();
    let samples_per_pixel = u16::try_from(bands).map_err(|_| {
        CompositorError::UnsupportedFormat(format!("{bands} bands in one TIFF page"))
    })?;
    let too_large = || CompositorError::UnsupportedFormat("TIFF strip larger than 4 GiB".into());

    let data = interleave(raster);
    let byte_count =
        u32::try_from(std::mem::size_of_val(data.as_slice())).map_err(|_| too_large())?;

    let mut directory = encoder.image_directory()?;
    let offset =
        u32::try_from(directory.write_data(data.as_slice())?).map_err(|_| too_large())?;

    directory.write_tag(Tag::ImageWidth, raster.width() as u32)?;
    directory.write_tag(Tag::ImageLength, raster.height() as u32)?;
    directory.write_tag(Tag::BitsPerSample, &vec![C::BITS_PER_SAMPLE[0]; bands][..])?;
    directory.write_tag(Tag::Compression, CompressionMethod::None.to_u16())?;
    directory.write_tag(Tag::PhotometricInterpretation, C::TIFF_VALUE.to_u16())?;
    directory.write_tag(Tag::StripOffsets, offset)?;
    directory.write_tag(Tag::SamplesPerPixel, samples_per_pixel)?;
    directory.write_tag(Tag::RowsPerStrip, raster.height() as u32)?;
    directory.write_tag(Tag::StripByteCounts, byte_count)?;
    directory.write_tag(Tag::PlanarConfiguration, PlanarConfiguration::Chunky.to_u16())?;
    directory.write_tag(
        Tag::SampleFormat,
        &vec![C::SAMPLE_FORMAT[0].to_u16(); bands][..],
    )?;
    // ExtraSamples 0 = unspecified data
    directory.write_tag(Tag::ExtraSamples, &vec![0u16; bands - 1][..])?;
    if let Some(geo) = geo {
        geo.write(&mut directory)?;
    }
    directory.finish()?;
    Ok(())
}
