use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::consts::{DEFAULT_NODATA, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{CompositorError, Result};
use crate::quality::{new_quality_grid, Quality, QualityGrid, QualityStage};
use crate::raster::{Input, Raster, Sample};
use crate::select::Selector;

use super::types::{Composite, CompositeStats, NoOpReporter, PipelineStage, ProgressReporter};

/// Validated stage chain plus selection rule.
///
/// Construction performs every configuration check, so a `Compositor`
/// never fails for configuration reasons once pixel work starts.
#[derive(Clone, Debug, PartialEq)]
pub struct Compositor {
    stages: Vec<QualityStage>,
    selector: Selector,
    nodata: f64,
    output_shape: Option<(usize, usize)>,
}

impl Compositor {
    pub fn new(stages: Vec<QualityStage>, selector: Selector) -> Result<Self> {
        selector.validate()?;

        let mut seen_from_file = false;
        for stage in &stages {
            match stage {
                QualityStage::Darkest if seen_from_file => {
                    return Err(CompositorError::InvalidConfiguration(
                        "darkest must run before qualityfromfile".into(),
                    ));
                }
                QualityStage::Darkest => {}
                QualityStage::FromFile(_) if seen_from_file => {
                    return Err(CompositorError::InvalidConfiguration(
                        "only one qualityfromfile stage is supported".into(),
                    ));
                }
                QualityStage::FromFile(from_file) => {
                    from_file.range.validate()?;
                    seen_from_file = true;
                }
            }
        }

        Ok(Self {
            stages,
            selector,
            nodata: DEFAULT_NODATA,
            output_shape: None,
        })
    }

    /// Value written to every output band where no input is valid.
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = nodata;
        self
    }

    /// Require the inputs to match an existing output destination.
    pub fn with_output_shape(mut self, width: usize, height: usize) -> Self {
        self.output_shape = Some((height, width));
        self
    }

    pub fn stages(&self) -> &[QualityStage] {
        &self.stages
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    pub fn nodata(&self) -> f64 {
        self.nodata
    }

    /// Composite `inputs` into a best-pixel mosaic and its diagnostic raster.
    pub fn compose<T: Sample>(&self, inputs: &[Input<T>]) -> Result<Composite<T>> {
        self.compose_reported(inputs, &NoOpReporter)
    }

    /// Same as [`Compositor::compose`], reporting progress per stage and row.
    pub fn compose_reported<T: Sample>(
        &self,
        inputs: &[Input<T>],
        reporter: &dyn ProgressReporter,
    ) -> Result<Composite<T>> {
        let (h, w) = self.validate_inputs(inputs)?;
        info!(
            inputs = inputs.len(),
            width = w,
            height = h,
            selector = %self.selector,
            "Composing"
        );

        let mut grids: Vec<QualityGrid> = inputs.iter().map(|_| new_quality_grid(h, w)).collect();

        reporter.begin_stage(PipelineStage::Scoring, Some(self.stages.len()));
        for (i, stage) in self.stages.iter().enumerate() {
            stage.apply(inputs, &mut grids)?;
            reporter.advance(i + 1);
        }
        reporter.finish_stage();

        reporter.begin_stage(PipelineStage::Selecting, Some(h));
        let winners = select_winners(&grids, &self.selector, reporter)?;
        reporter.finish_stage();

        let composite = assemble(inputs, &grids, &winners, T::from_f64(self.nodata))?;
        info!(
            nodata_pixels = composite.stats.nodata_pixels,
            wins = ?composite.stats.wins_per_input,
            "Composite complete"
        );
        Ok(composite)
    }

    /// Returns the common (height, width) or the first structural error.
    fn validate_inputs<T: Sample>(&self, inputs: &[Input<T>]) -> Result<(usize, usize)> {
        let first = inputs.first().ok_or_else(|| {
            CompositorError::InvalidConfiguration("at least one input is required".into())
        })?;
        let (h, w) = first.raster.dim();
        let bands = first.raster.band_count();

        let check = |what: String, (fh, fw): (usize, usize)| {
            if (fh, fw) == (h, w) {
                Ok(())
            } else {
                Err(CompositorError::ShapeMismatch {
                    what,
                    width: w,
                    height: h,
                    found_width: fw,
                    found_height: fh,
                })
            }
        };

        if let Some(shape) = self.output_shape {
            check("output destination".into(), shape)?;
        }

        for (i, input) in inputs.iter().enumerate() {
            check(format!("input {i}"), input.raster.dim())?;
            if let Some(source) = &input.quality_source {
                check(format!("quality source of input {i}"), source.dim())?;
                if source.band_count() != 1 {
                    return Err(CompositorError::InvalidConfiguration(format!(
                        "quality source of input {i} has {} bands, expected 1",
                        source.band_count()
                    )));
                }
            }
            if input.raster.band_count() != bands {
                return Err(CompositorError::BandCountMismatch {
                    index: i,
                    expected: bands,
                    found: input.raster.band_count(),
                });
            }
            if let Some(scale) = &input.scale {
                scale.validate()?;
            }
            debug!(
                input = i,
                bands = input.raster.band_count(),
                has_quality_source = input.quality_source.is_some(),
                "Input validated"
            );
        }

        Ok((h, w))
    }
}

/// Winning input index per pixel, `None` where no input is valid.
///
/// Parallelizes at the row level for large images; each row owns its
/// scratch buffers.
pub fn select_winners(
    grids: &[QualityGrid],
    selector: &Selector,
    reporter: &dyn ProgressReporter,
) -> Result<Array2<Option<usize>>> {
    let Some(first) = grids.first() else {
        return Err(CompositorError::InvalidConfiguration(
            "at least one input is required".into(),
        ));
    };
    let (h, w) = first.dim();
    let n = grids.len();
    let rows_done = AtomicUsize::new(0);

    let select_row = |row: usize| -> Vec<Option<usize>> {
        let mut qualities = vec![Quality::Invalid; n];
        let mut scratch = Vec::with_capacity(n);
        let winners = (0..w)
            .map(|col| {
                for (q, grid) in qualities.iter_mut().zip(grids) {
                    *q = grid[[row, col]];
                }
                selector.select_with(&qualities, &mut scratch)
            })
            .collect();
        let done = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
        reporter.advance(done);
        winners
    };

    let rows: Vec<Vec<Option<usize>>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(select_row).collect()
    } else {
        (0..h).map(select_row).collect()
    };

    Ok(Array2::from_shape_vec((h, w), rows.into_iter().flatten().collect())?)
}

/// Copy winner band values into the output and build the diagnostic raster.
fn assemble<T: Sample>(
    inputs: &[Input<T>],
    grids: &[QualityGrid],
    winners: &Array2<Option<usize>>,
    nodata: T,
) -> Result<Composite<T>> {
    let band_count = inputs[0].raster.band_count();

    let output_bands: Vec<Array2<T>> = (0..band_count)
        .map(|b| {
            Array2::from_shape_fn(winners.dim(), |(row, col)| match winners[[row, col]] {
                Some(i) => inputs[i].raster.band(b)[[row, col]],
                None => nodata,
            })
        })
        .collect();

    let winning_quality = Array2::from_shape_fn(winners.dim(), |(row, col)| {
        match winners[[row, col]] {
            Some(i) => grids[i][[row, col]].encode(),
            None => 0.0,
        }
    });
    let mut quality_bands = Vec::with_capacity(1 + grids.len());
    quality_bands.push(winning_quality);
    quality_bands.extend(grids.iter().map(|grid| grid.mapv(Quality::encode)));

    let mut stats = CompositeStats {
        pixels: winners.len(),
        nodata_pixels: 0,
        wins_per_input: vec![0; inputs.len()],
    };
    for winner in winners {
        match winner {
            Some(i) => stats.wins_per_input[*i] += 1,
            None => stats.nodata_pixels += 1,
        }
    }

    Ok(Composite {
        output: Raster::from_bands(output_bands)?,
        quality: Raster::from_bands(quality_bands)?,
        stats,
    })
}
