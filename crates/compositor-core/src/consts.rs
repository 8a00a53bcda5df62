/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum input count to score inputs in parallel.
pub const PARALLEL_INPUT_THRESHOLD: usize = 4;

/// Encoded quality of a pixel that must never be selected.
/// Only appears in the diagnostic raster; internally invalidity is a
/// separate `Quality` variant.
pub const INVALID_QUALITY: f32 = -1.0;

/// Starting quality of every input before any stage runs.
/// Multiplicative stages leave it unchanged when they are the first to run.
pub const NEUTRAL_QUALITY: f32 = 1.0;

/// Value written to every output band where no input is valid.
pub const DEFAULT_NODATA: f64 = 0.0;

/// Default lower bound of the external quality range.
pub const DEFAULT_SCALE_MIN: f32 = 0.0;

/// Default upper bound of the external quality range.
pub const DEFAULT_SCALE_MAX: f32 = 1.0;
