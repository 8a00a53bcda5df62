use ndarray::Zip;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_SCALE_MAX, DEFAULT_SCALE_MIN, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{CompositorError, Result};
use crate::raster::{Input, Sample};

use super::{Quality, QualityGrid};

/// Accepted range of raw external quality values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub min: f32,
    pub max: f32,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_SCALE_MIN,
            max: DEFAULT_SCALE_MAX,
        }
    }
}

impl ScaleRange {
    pub fn new(min: f32, max: f32) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(CompositorError::InvalidConfiguration(format!(
                "scale range {}..{} must be finite",
                self.min, self.max
            )));
        }
        if self.min >= self.max {
            return Err(CompositorError::InvalidConfiguration(format!(
                "scale_min ({}) must be less than scale_max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Map a raw value into [0.0, 1.0], or `None` when it lies outside the range.
    ///
    /// Both bounds are inclusive. NaN is always out of range.
    pub fn scale(&self, raw: f32) -> Option<f32> {
        if !(self.min..=self.max).contains(&raw) {
            return None;
        }
        Some(((raw - self.min) / (self.max - self.min)).clamp(0.0, 1.0))
    }
}

/// Merges an external per-input quality raster into the running quality.
#[derive(Clone, Debug, PartialEq)]
pub struct QualityFromFile {
    pub range: ScaleRange,
}

impl QualityFromFile {
    pub fn new(range: ScaleRange) -> Result<Self> {
        range.validate()?;
        Ok(Self { range })
    }

    /// Multiply the input's grid by its scaled external quality.
    ///
    /// Out-of-range raw values mark the pixel invalid. Inputs without a
    /// quality source are left untouched.
    pub fn apply_to<T: Sample>(&self, input: &Input<T>, grid: &mut QualityGrid) -> Result<()> {
        let Some(source) = input.quality_source.as_ref() else {
            return Ok(());
        };
        let range = match input.scale {
            Some(scale) => {
                scale.validate()?;
                scale
            }
            None => self.range,
        };

        let merge = |quality: &mut Quality, &raw: &f32| {
            *quality = match range.scale(raw) {
                Some(s) => quality.scaled(s),
                None => Quality::Invalid,
            };
        };

        let raw = source.band(0);
        let (h, w) = grid.dim();
        if raw.dim() != (h, w) {
            return Err(CompositorError::ShapeMismatch {
                what: "quality source".into(),
                width: w,
                height: h,
                found_width: raw.ncols(),
                found_height: raw.nrows(),
            });
        }

        if h * w >= PARALLEL_PIXEL_THRESHOLD {
            Zip::from(grid).and(raw).par_for_each(merge);
        } else {
            Zip::from(grid).and(raw).for_each(merge);
        }
        Ok(())
    }
}
