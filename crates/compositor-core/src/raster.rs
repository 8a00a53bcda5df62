use std::fmt;

use ndarray::Array2;
use num_traits::AsPrimitive;

use crate::error::{CompositorError, Result};
use crate::quality::from_file::ScaleRange;

/// Storage type of raster samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleType {
    U8,
    U16,
    F32,
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => write!(f, "8-bit unsigned"),
            Self::U16 => write!(f, "16-bit unsigned"),
            Self::F32 => write!(f, "32-bit float"),
        }
    }
}

/// A pixel sample type the compositor can score and copy.
pub trait Sample: Copy + Send + Sync + PartialEq + fmt::Debug + AsPrimitive<f32> {
    const SAMPLE_TYPE: SampleType;

    /// Full-scale value; brightness is normalized by dividing by it.
    const RANGE: f32;

    /// Convert a configured no-data value, saturating at the type bounds.
    fn from_f64(value: f64) -> Self;

    fn from_any(raster: AnyRaster) -> std::result::Result<Raster<Self>, AnyRaster>;

    fn into_any(raster: Raster<Self>) -> AnyRaster;
}

impl Sample for u8 {
    const SAMPLE_TYPE: SampleType = SampleType::U8;
    const RANGE: f32 = u8::MAX as f32;

    fn from_f64(value: f64) -> Self {
        value as u8
    }

    fn from_any(raster: AnyRaster) -> std::result::Result<Raster<Self>, AnyRaster> {
        match raster {
            AnyRaster::U8(r) => Ok(r),
            other => Err(other),
        }
    }

    fn into_any(raster: Raster<Self>) -> AnyRaster {
        AnyRaster::U8(raster)
    }
}

impl Sample for u16 {
    const SAMPLE_TYPE: SampleType = SampleType::U16;
    const RANGE: f32 = u16::MAX as f32;

    fn from_f64(value: f64) -> Self {
        value as u16
    }

    fn from_any(raster: AnyRaster) -> std::result::Result<Raster<Self>, AnyRaster> {
        match raster {
            AnyRaster::U16(r) => Ok(r),
            other => Err(other),
        }
    }

    fn into_any(raster: Raster<Self>) -> AnyRaster {
        AnyRaster::U16(raster)
    }
}

/// Float imagery is assumed to be normalized to [0.0, 1.0].
impl Sample for f32 {
    const SAMPLE_TYPE: SampleType = SampleType::F32;
    const RANGE: f32 = 1.0;

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn from_any(raster: AnyRaster) -> std::result::Result<Raster<Self>, AnyRaster> {
        match raster {
            AnyRaster::F32(r) => Ok(r),
            other => Err(other),
        }
    }

    fn into_any(raster: Raster<Self>) -> AnyRaster {
        AnyRaster::F32(raster)
    }
}

/// How the bands of a raster are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorLayout {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
    Multi(usize),
}

impl ColorLayout {
    pub fn from_band_count(bands: usize) -> Self {
        match bands {
            1 => Self::Gray,
            2 => Self::GrayAlpha,
            3 => Self::Rgb,
            4 => Self::Rgba,
            n => Self::Multi(n),
        }
    }

    /// Alpha is always the last band when present.
    pub fn has_alpha(&self) -> bool {
        matches!(self, Self::GrayAlpha | Self::Rgba)
    }

    pub fn band_count(&self) -> usize {
        match self {
            Self::Gray => 1,
            Self::GrayAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
            Self::Multi(n) => *n,
        }
    }

    /// Number of leading bands that carry color (alpha excluded).
    pub fn color_band_count(&self) -> usize {
        if self.has_alpha() {
            self.band_count() - 1
        } else {
            self.band_count()
        }
    }
}

impl fmt::Display for ColorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gray => write!(f, "Gray"),
            Self::GrayAlpha => write!(f, "Gray + Alpha"),
            Self::Rgb => write!(f, "RGB"),
            Self::Rgba => write!(f, "RGBA"),
            Self::Multi(n) => write!(f, "{n} bands"),
        }
    }
}

/// In-memory multi-band raster.
/// Every band has shape = (height, width), row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster<T> {
    bands: Vec<Array2<T>>,
}

impl<T: Sample> Raster<T> {
    /// Build a raster from bands that must all share one shape.
    pub fn from_bands(bands: Vec<Array2<T>>) -> Result<Self> {
        let first = bands.first().ok_or(CompositorError::EmptyRaster)?;
        let (h, w) = first.dim();
        for band in &bands[1..] {
            let (bh, bw) = band.dim();
            if (bh, bw) != (h, w) {
                return Err(CompositorError::ShapeMismatch {
                    what: "band".into(),
                    width: w,
                    height: h,
                    found_width: bw,
                    found_height: bh,
                });
            }
        }
        Ok(Self { bands })
    }

    pub fn gray(band: Array2<T>) -> Self {
        Self { bands: vec![band] }
    }

    pub fn filled(width: usize, height: usize, band_count: usize, value: T) -> Self {
        Self {
            bands: (0..band_count.max(1))
                .map(|_| Array2::from_elem((height, width), value))
                .collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.bands[0].ncols()
    }

    pub fn height(&self) -> usize {
        self.bands[0].nrows()
    }

    /// (height, width), matching `Array2::dim`.
    pub fn dim(&self) -> (usize, usize) {
        self.bands[0].dim()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn band(&self, index: usize) -> &Array2<T> {
        &self.bands[index]
    }

    pub fn bands(&self) -> &[Array2<T>] {
        &self.bands
    }

    pub fn into_bands(self) -> Vec<Array2<T>> {
        self.bands
    }

    pub fn layout(&self) -> ColorLayout {
        ColorLayout::from_band_count(self.bands.len())
    }

    /// Bands contributing to brightness.
    pub fn color_bands(&self) -> &[Array2<T>] {
        &self.bands[..self.layout().color_band_count()]
    }

    /// All band values at one pixel, in band order.
    pub fn pixel(&self, row: usize, col: usize) -> Vec<T> {
        self.bands.iter().map(|b| b[[row, col]]).collect()
    }

    pub fn to_f32(&self) -> Raster<f32> {
        Raster {
            bands: self.bands.iter().map(|b| b.mapv(|v| v.as_())).collect(),
        }
    }
}

/// A raster of any supported sample type, as produced by the I/O layer.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyRaster {
    U8(Raster<u8>),
    U16(Raster<u16>),
    F32(Raster<f32>),
}

impl AnyRaster {
    pub fn sample_type(&self) -> SampleType {
        match self {
            Self::U8(_) => SampleType::U8,
            Self::U16(_) => SampleType::U16,
            Self::F32(_) => SampleType::F32,
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Self::U8(r) => r.width(),
            Self::U16(r) => r.width(),
            Self::F32(r) => r.width(),
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Self::U8(r) => r.height(),
            Self::U16(r) => r.height(),
            Self::F32(r) => r.height(),
        }
    }

    pub fn band_count(&self) -> usize {
        match self {
            Self::U8(r) => r.band_count(),
            Self::U16(r) => r.band_count(),
            Self::F32(r) => r.band_count(),
        }
    }

    /// Convert to float samples without rescaling.
    pub fn into_f32(self) -> Raster<f32> {
        match self {
            Self::U8(r) => r.to_f32(),
            Self::U16(r) => r.to_f32(),
            Self::F32(r) => r,
        }
    }
}

/// One contributing source: an image plus its optional external quality grid.
#[derive(Clone, Debug)]
pub struct Input<T> {
    pub raster: Raster<T>,
    /// Single-band quality raster consumed by the quality-from-file stage.
    pub quality_source: Option<Raster<f32>>,
    /// Replaces the stage's scale range for this input only.
    pub scale: Option<ScaleRange>,
}

impl<T: Sample> Input<T> {
    pub fn new(raster: Raster<T>) -> Self {
        Self {
            raster,
            quality_source: None,
            scale: None,
        }
    }

    pub fn with_quality_source(mut self, source: Raster<f32>) -> Self {
        self.quality_source = Some(source);
        self
    }

    pub fn with_scale(mut self, scale: ScaleRange) -> Self {
        self.scale = Some(scale);
        self
    }
}
