use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{CompositorError, Result};
use crate::io::geotiff::GeoMetadata;
use crate::io::{probe_raster, read_raster, write_raster};
use crate::quality::from_file::ScaleRange;
use crate::raster::{AnyRaster, Input, Raster, Sample, SampleType};

use super::config::{CompositorConfig, QualityLocator};
use super::engine::Compositor;
use super::types::{CompositeStats, NoOpReporter, PipelineStage, ProgressReporter, RunSummary};

/// An input as read from disk, before its sample type is resolved.
struct LoadedInput {
    raster: AnyRaster,
    quality_source: Option<Raster<f32>>,
    scale: Option<ScaleRange>,
}

/// Run the compositor described by `config`: read inputs, compose, write.
pub fn run_compositor(config: &CompositorConfig) -> Result<RunSummary> {
    run_compositor_reported(config, Arc::new(NoOpReporter))
}

/// Same as [`run_compositor`], with a thread-safe progress reporter.
///
/// Nothing is written unless composing succeeds.
pub fn run_compositor_reported(
    config: &CompositorConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<RunSummary> {
    config.validate()?;
    let mut compositor = config.compositor()?;
    let quality_source = config.quality_source()?;

    reporter.begin_stage(PipelineStage::Reading, Some(config.inputs.len()));
    let mut loaded = Vec::with_capacity(config.inputs.len());
    for (i, entry) in config.inputs.iter().enumerate() {
        let raster = read_raster(&entry.filename)?;
        debug!(
            input = i,
            path = %entry.filename.display(),
            bands = raster.band_count(),
            sample_type = %raster.sample_type(),
            "Read input"
        );

        let (quality, scale) = match &quality_source {
            Some((locator, range)) => {
                let quality = match locator.resolve(entry) {
                    Some(path) if path.exists() => Some(read_raster(&path)?.into_f32()),
                    Some(path) if matches!(locator, QualityLocator::Key(_)) => {
                        return Err(CompositorError::InvalidConfiguration(format!(
                            "quality source {} of input {i} does not exist",
                            path.display()
                        )));
                    }
                    Some(path) => {
                        warn!(
                            input = i,
                            path = %path.display(),
                            "Quality source not found, input keeps its quality"
                        );
                        None
                    }
                    None => None,
                };
                (quality, entry.scale_override(*range)?)
            }
            None => (None, None),
        };

        loaded.push(LoadedInput {
            raster,
            quality_source: quality,
            scale,
        });
        reporter.advance(i + 1);
    }
    reporter.finish_stage();

    // The output destination, if it already exists, is the spatial frame to
    // write into; otherwise the first input provides it.
    let geo = if config.output_file.exists() {
        let existing = probe_raster(&config.output_file)?;
        compositor = compositor.with_output_shape(existing.width, existing.height);
        existing.geo
    } else {
        probe_raster(&config.inputs[0].filename)?.geo
    };

    let sample_type = loaded[0].raster.sample_type();
    let (output, quality, stats) = match sample_type {
        SampleType::U8 => compose_typed::<u8>(&compositor, loaded, reporter.as_ref())?,
        SampleType::U16 => compose_typed::<u16>(&compositor, loaded, reporter.as_ref())?,
        SampleType::F32 => compose_typed::<f32>(&compositor, loaded, reporter.as_ref())?,
    };

    let writes = 1 + usize::from(config.quality_output.is_some());
    reporter.begin_stage(PipelineStage::Writing, Some(writes));
    write_output(&config.output_file, &output, geo.as_ref())?;
    reporter.advance(1);
    if let Some(path) = &config.quality_output {
        write_output(path, &AnyRaster::F32(quality), geo.as_ref())?;
        reporter.advance(2);
    }
    reporter.finish_stage();

    info!(
        output = %config.output_file.display(),
        nodata_pixels = stats.nodata_pixels,
        "Compositor run complete"
    );

    Ok(RunSummary {
        width: output.width(),
        height: output.height(),
        band_count: output.band_count(),
        sample_type,
        stats,
    })
}

fn write_output(path: &Path, raster: &AnyRaster, geo: Option<&GeoMetadata>) -> Result<()> {
    info!(path = %path.display(), bands = raster.band_count(), "Writing raster");
    write_raster(path, raster, geo)
}

fn compose_typed<T: Sample>(
    compositor: &Compositor,
    loaded: Vec<LoadedInput>,
    reporter: &dyn ProgressReporter,
) -> Result<(AnyRaster, Raster<f32>, CompositeStats)> {
    let inputs: Vec<Input<T>> = loaded
        .into_iter()
        .enumerate()
        .map(|(index, input)| -> Result<Input<T>> {
            let found = input.raster.sample_type();
            let raster = T::from_any(input.raster).map_err(|_| {
                CompositorError::SampleTypeMismatch {
                    index,
                    expected: T::SAMPLE_TYPE,
                    found,
                }
            })?;
            Ok(Input {
                raster,
                quality_source: input.quality_source,
                scale: input.scale,
            })
        })
        .collect::<Result<_>>()?;

    let composite = compositor.compose_reported(&inputs, reporter)?;
    Ok((T::into_any(composite.output), composite.quality, composite.stats))
}
