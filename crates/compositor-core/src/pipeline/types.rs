use crate::raster::{Raster, SampleType};

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Reading,
    Scoring,
    Selecting,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reading => write!(f, "Reading rasters"),
            Self::Scoring => write!(f, "Scoring quality"),
            Self::Selecting => write!(f, "Selecting pixels"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Result of one compose call.
#[derive(Clone, Debug)]
pub struct Composite<T> {
    /// Same shape and band count as the inputs.
    pub output: Raster<T>,
    /// `1 + N` bands: winning quality, then each input's final quality.
    pub quality: Raster<f32>,
    pub stats: CompositeStats,
}

/// Aggregate counts over all pixels of a composite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompositeStats {
    pub pixels: usize,
    /// Pixels where every input was invalid.
    pub nodata_pixels: usize,
    /// How many pixels each input supplied, in input order.
    pub wins_per_input: Vec<usize>,
}

impl CompositeStats {
    pub fn coverage(&self) -> f64 {
        if self.pixels == 0 {
            return 0.0;
        }
        (self.pixels - self.nodata_pixels) as f64 / self.pixels as f64
    }
}

/// What a file-level compositor run produced.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub sample_type: SampleType,
    pub stats: CompositeStats,
}

/// Thread-safe progress reporting for the pipeline.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (inputs, stages or rows), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// Work items completed so far within the current stage.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
