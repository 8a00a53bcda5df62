pub mod darkest;
pub mod from_file;

use std::fmt;

use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::consts::{INVALID_QUALITY, NEUTRAL_QUALITY, PARALLEL_INPUT_THRESHOLD};
use crate::error::Result;
use crate::raster::{Input, Sample};

use self::from_file::QualityFromFile;

/// Fitness of one input at one pixel.
///
/// `Invalid` is terminal: no stage turns it back into a valid value, and
/// selectors never pick it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Quality {
    Valid(f32),
    Invalid,
}

impl Quality {
    /// Non-finite scores cannot be compared, so they are treated as invalid.
    pub fn from_score(score: f32) -> Self {
        if score.is_finite() {
            Self::Valid(score)
        } else {
            Self::Invalid
        }
    }

    pub fn value(self) -> Option<f32> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Invalid => None,
        }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Multiply into a valid quality; an invalid quality stays invalid.
    pub fn scaled(self, factor: f32) -> Self {
        match self {
            Self::Valid(v) => Self::Valid(v * factor),
            Self::Invalid => Self::Invalid,
        }
    }

    /// Diagnostic encoding: invalid pixels become [`INVALID_QUALITY`].
    pub fn encode(self) -> f32 {
        match self {
            Self::Valid(v) => v,
            Self::Invalid => INVALID_QUALITY,
        }
    }
}

/// Per-input quality, one value per output pixel.
pub type QualityGrid = Array2<Quality>;

pub fn new_quality_grid(height: usize, width: usize) -> QualityGrid {
    Array2::from_elem((height, width), Quality::Valid(NEUTRAL_QUALITY))
}

/// A scoring step run over every input, in declared order.
#[derive(Clone, Debug, PartialEq)]
pub enum QualityStage {
    /// Brightness-derived baseline: darker pixels score higher.
    Darkest,
    /// External quality raster merged multiplicatively.
    FromFile(QualityFromFile),
}

impl QualityStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Darkest => "darkest",
            Self::FromFile(_) => "qualityfromfile",
        }
    }

    /// Apply this stage to every input's grid. `grids[i]` belongs to `inputs[i]`.
    pub fn apply<T: Sample>(&self, inputs: &[Input<T>], grids: &mut [QualityGrid]) -> Result<()> {
        debug!(stage = self.name(), inputs = inputs.len(), "Applying quality stage");

        let run = |(input, grid): (&Input<T>, &mut QualityGrid)| match self {
            Self::Darkest => {
                darkest::darkest_quality(&input.raster, grid);
                Ok(())
            }
            Self::FromFile(stage) => stage.apply_to(input, grid),
        };

        if inputs.len() >= PARALLEL_INPUT_THRESHOLD {
            inputs
                .par_iter()
                .zip(grids.par_iter_mut())
                .try_for_each(run)
        } else {
            inputs.iter().zip(grids.iter_mut()).try_for_each(run)
        }
    }
}

impl fmt::Display for QualityStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Darkest => write!(f, "Darkest"),
            Self::FromFile(stage) => write!(
                f,
                "Quality from file (scale {}..{})",
                stage.range.min, stage.range.max
            ),
        }
    }
}
