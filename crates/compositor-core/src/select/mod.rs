pub mod max_quality;
pub mod percentile;

use std::fmt;

use crate::error::{CompositorError, Result};
use crate::quality::Quality;

/// Rule turning the N per-input qualities at a pixel into a winning input.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Selector {
    /// Highest valid quality; lowest index on ties.
    #[default]
    MaxQuality,
    /// The input at the given percentile (0..=100) of the valid qualities.
    Percentile(f32),
}

impl Selector {
    pub fn percentile(percentile: f32) -> Result<Self> {
        let selector = Self::Percentile(percentile);
        selector.validate()?;
        Ok(selector)
    }

    pub fn validate(&self) -> Result<()> {
        if let Self::Percentile(p) = *self {
            if !(0.0..=100.0).contains(&p) {
                return Err(CompositorError::InvalidConfiguration(format!(
                    "percentile {p} outside 0..=100"
                )));
            }
        }
        Ok(())
    }

    /// Winning input index, or `None` when no input is valid.
    pub fn select(&self, qualities: &[Quality]) -> Option<usize> {
        let mut scratch = Vec::new();
        self.select_with(qualities, &mut scratch)
    }

    /// Same as [`Selector::select`], reusing `scratch` across pixels.
    pub fn select_with(&self, qualities: &[Quality], scratch: &mut Vec<(f32, usize)>) -> Option<usize> {
        match *self {
            Self::MaxQuality => max_quality::max_quality(qualities),
            Self::Percentile(p) => percentile::percentile_rank(qualities, p, scratch),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxQuality => write!(f, "Max quality"),
            Self::Percentile(p) => write!(f, "Percentile ({p})"),
        }
    }
}
