use ndarray::Zip;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::raster::{Raster, Sample};

use super::{Quality, QualityGrid};

/// Mean of the color bands at one pixel, normalized to [0.0, 1.0].
///
/// Every color band has equal weight; alpha is excluded. Float samples
/// outside [0.0, 1.0] are clamped so the quality stays within [0.0, 1.0].
pub fn brightness<T: Sample>(raster: &Raster<T>, row: usize, col: usize) -> f32 {
    let color = raster.color_bands();
    let sum: f32 = color.iter().map(|band| band[[row, col]].as_()).sum();
    (sum / color.len() as f32 / T::RANGE).clamp(0.0, 1.0)
}

/// Overwrite `grid` with `1 - brightness` for every pixel.
///
/// Pixels already marked invalid keep their flag.
pub fn darkest_quality<T: Sample>(raster: &Raster<T>, grid: &mut QualityGrid) {
    let score = |(row, col): (usize, usize), quality: &mut Quality| {
        if quality.is_valid() {
            *quality = Quality::from_score(1.0 - brightness(raster, row, col));
        }
    };

    let (h, w) = grid.dim();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        Zip::indexed(grid).par_for_each(score);
    } else {
        Zip::indexed(grid).for_each(score);
    }
}
