mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ndarray::{array, Array2};

use compositor_core::error::CompositorError;
use compositor_core::pipeline::{Compositor, PipelineStage, ProgressReporter};
use compositor_core::quality::from_file::{QualityFromFile, ScaleRange};
use compositor_core::quality::QualityStage;
use compositor_core::raster::{Input, Raster};
use compositor_core::select::Selector;

use common::{assert_grid_close, float, gray, inputs, multi};

fn darkest() -> Compositor {
    Compositor::new(vec![QualityStage::Darkest], Selector::MaxQuality).unwrap()
}

fn from_file(min: f32, max: f32) -> QualityStage {
    QualityStage::FromFile(QualityFromFile::new(ScaleRange::new(min, max).unwrap()).unwrap())
}

#[test]
fn test_darkest_gray_pair() {
    let inputs = inputs(vec![gray(&[&[0, 1], &[6, 5]]), gray(&[&[9, 8], &[2, 3]])]);
    let composite = darkest().compose(&inputs).unwrap();

    assert_eq!(composite.output.band(0), &array![[0u8, 1], [2, 3]]);
    assert_eq!(composite.quality.band_count(), 3);
    assert_grid_close(
        composite.quality.band(0),
        &array![[1.0, 0.996_078_43], [0.992_156_86, 0.988_235_3]],
        1e-6,
    );
    assert_grid_close(
        composite.quality.band(1),
        &array![[1.0, 0.996_078_43], [0.976_470_6, 0.980_392_16]],
        1e-6,
    );
    assert_grid_close(
        composite.quality.band(2),
        &array![[0.964_705_9, 0.968_627_45], [0.992_156_86, 0.988_235_3]],
        1e-6,
    );
}

#[test]
fn test_percentile_sixty_of_three() {
    let inputs = inputs(vec![
        gray(&[&[9, 0], &[1, 1]]),
        gray(&[&[5, 1], &[9, 9]]),
        gray(&[&[1, 2], &[9, 1]]),
    ]);
    let compositor = Compositor::new(
        vec![QualityStage::Darkest],
        Selector::percentile(60.0).unwrap(),
    )
    .unwrap();
    let composite = compositor.compose(&inputs).unwrap();
    assert_eq!(composite.output.band(0), &array![[5u8, 1], [9, 1]]);
}

#[test]
fn test_quality_from_file_pair() {
    let inputs = vec![
        Input::new(gray(&[&[101, 101], &[101, 101]]))
            .with_quality_source(float(&[&[0.5, 2.0], &[-1.0, 0.01]])),
        Input::new(gray(&[&[102, 102], &[102, 102]]))
            .with_quality_source(float(&[&[2.0, 1.8], &[-1.0, 0.25]])),
    ];
    let compositor = Compositor::new(
        vec![QualityStage::Darkest, from_file(0.0, 2.0)],
        Selector::MaxQuality,
    )
    .unwrap();
    let composite = compositor.compose(&inputs).unwrap();

    assert_eq!(composite.output.band(0), &array![[102u8, 101], [0, 102]]);
    assert_grid_close(
        composite.quality.band(0),
        &array![[0.6, 0.603_921_6], [0.0, 0.075]],
        1e-3,
    );
    assert_grid_close(
        composite.quality.band(1),
        &array![[0.150_980_4, 0.603_921_6], [-1.0, 0.003_019_6]],
        1e-3,
    );
    assert_grid_close(
        composite.quality.band(2),
        &array![[0.6, 0.54], [-1.0, 0.075]],
        1e-3,
    );
    // Invalid pixels carry the exact sentinel.
    assert_eq!(composite.quality.band(1)[[1, 0]], -1.0);
    assert_eq!(composite.stats.nodata_pixels, 1);
}

#[test]
fn test_darkest_rgb_whole_pixel_wins() {
    let first = multi(&[
        &[&[9, 1], &[3, 0]],
        &[&[0, 1], &[3, 0]],
        &[&[0, 1], &[3, 9]],
    ]);
    let second = multi(&[
        &[&[0, 8], &[6, 5]],
        &[&[9, 8], &[6, 5]],
        &[&[9, 8], &[6, 5]],
    ]);
    let composite = darkest()
        .compose(&inputs(vec![first.clone(), second]))
        .unwrap();
    assert_eq!(composite.output, first);
}

#[test]
fn test_darkest_rgba_alpha_copied_from_winner() {
    let first = multi(&[
        &[&[0, 1], &[3, 4]],
        &[&[0, 1], &[3, 4]],
        &[&[0, 1], &[3, 4]],
        &[&[255, 255], &[255, 255]],
    ]);
    let second = multi(&[
        &[&[9, 8], &[6, 5]],
        &[&[9, 8], &[6, 5]],
        &[&[9, 8], &[6, 5]],
        &[&[255, 255], &[255, 255]],
    ]);
    let composite = darkest()
        .compose(&inputs(vec![first.clone(), second]))
        .unwrap();
    assert_eq!(composite.output, first);
    assert_eq!(composite.output.band_count(), 4);
}

#[test]
fn test_output_pixels_come_from_a_single_input() {
    let a = multi(&[&[&[10, 200]], &[&[10, 200]], &[&[250, 0]]]);
    let b = multi(&[&[&[100, 50]], &[&[100, 50]], &[&[100, 50]]]);
    let composite = darkest().compose(&inputs(vec![a.clone(), b.clone()])).unwrap();

    for col in 0..2 {
        let pixel = composite.output.pixel(0, col);
        assert!(
            pixel == a.pixel(0, col) || pixel == b.pixel(0, col),
            "pixel {col} = {pixel:?} is a blend"
        );
    }
}

#[test]
fn test_no_stages_first_input_wins() {
    let compositor = Compositor::new(Vec::new(), Selector::MaxQuality).unwrap();
    let inputs = inputs(vec![gray(&[&[7, 7]]), gray(&[&[1, 1]])]);
    let composite = compositor.compose(&inputs).unwrap();

    assert_eq!(composite.output.band(0), &array![[7u8, 7]]);
    assert_eq!(composite.stats.wins_per_input, vec![2, 0]);
    assert_grid_close(composite.quality.band(0), &array![[1.0, 1.0]], 0.0);
}

#[test]
fn test_all_invalid_pixel_gets_nodata() {
    let inputs = vec![
        Input::new(gray(&[&[10, 20]])).with_quality_source(float(&[&[5.0, 0.5]])),
        Input::new(gray(&[&[30, 40]])).with_quality_source(float(&[&[-2.0, 0.25]])),
    ];
    let compositor = Compositor::new(vec![from_file(0.0, 1.0)], Selector::MaxQuality)
        .unwrap()
        .with_nodata(255.0);
    let composite = compositor.compose(&inputs).unwrap();

    assert_eq!(composite.output.band(0), &array![[255u8, 20]]);
    assert_eq!(composite.quality.band(0)[[0, 0]], 0.0);
    assert_eq!(composite.quality.band(1)[[0, 0]], -1.0);
    assert_eq!(composite.quality.band(2)[[0, 0]], -1.0);
    assert_eq!(composite.stats.nodata_pixels, 1);
    assert_eq!(composite.stats.wins_per_input, vec![1, 0]);
}

#[test]
fn test_overbright_float_winner_is_not_marked_invalid() {
    let inputs = vec![
        Input::new(float(&[&[2.0]])),
        Input::new(float(&[&[0.5]])).with_quality_source(float(&[&[9.0]])),
    ];
    let compositor = Compositor::new(
        vec![QualityStage::Darkest, from_file(0.0, 1.0)],
        Selector::MaxQuality,
    )
    .unwrap();
    let composite = compositor.compose(&inputs).unwrap();

    assert_eq!(composite.output.band(0)[[0, 0]], 2.0);
    assert_eq!(composite.quality.band(0)[[0, 0]], 0.0);
    assert_eq!(composite.quality.band(1)[[0, 0]], 0.0);
    assert_eq!(composite.quality.band(2)[[0, 0]], -1.0);
    assert_eq!(composite.stats.nodata_pixels, 0);
}

#[test]
fn test_nodata_saturates_to_sample_range() {
    let inputs = vec![Input::new(gray(&[&[10]])).with_quality_source(float(&[&[9.0]]))];
    let compositor = Compositor::new(vec![from_file(0.0, 1.0)], Selector::MaxQuality)
        .unwrap()
        .with_nodata(-5.0);
    let composite = compositor.compose(&inputs).unwrap();
    assert_eq!(composite.output.band(0)[[0, 0]], 0);
}

#[test]
fn test_input_without_quality_source_passes_through() {
    let inputs = vec![
        Input::new(gray(&[&[50]])).with_quality_source(float(&[&[0.1]])),
        Input::new(gray(&[&[60]])),
    ];
    let compositor = Compositor::new(
        vec![QualityStage::Darkest, from_file(0.0, 1.0)],
        Selector::MaxQuality,
    )
    .unwrap();
    let composite = compositor.compose(&inputs).unwrap();
    // 1 - 60/255 beats (1 - 50/255) * 0.1
    assert_eq!(composite.output.band(0)[[0, 0]], 60);
}

#[test]
fn test_shape_mismatch_between_inputs() {
    let inputs = inputs(vec![gray(&[&[1, 2]]), gray(&[&[1, 2, 3]])]);
    let err = darkest().compose(&inputs).unwrap_err();
    assert!(matches!(err, CompositorError::ShapeMismatch { .. }), "{err}");
}

#[test]
fn test_quality_source_shape_mismatch() {
    let inputs = vec![Input::new(gray(&[&[1, 2]])).with_quality_source(float(&[&[0.5]]))];
    let compositor = Compositor::new(vec![from_file(0.0, 1.0)], Selector::MaxQuality).unwrap();
    let err = compositor.compose(&inputs).unwrap_err();
    assert!(matches!(err, CompositorError::ShapeMismatch { .. }), "{err}");
}

#[test]
fn test_multi_band_quality_source_rejected() {
    let source = Raster::from_bands(vec![array![[0.5f32]], array![[0.25f32]]]).unwrap();
    let inputs = vec![Input::new(gray(&[&[1]])).with_quality_source(source)];
    let compositor = Compositor::new(vec![from_file(0.0, 1.0)], Selector::MaxQuality).unwrap();
    let err = compositor.compose(&inputs).unwrap_err();
    assert!(matches!(err, CompositorError::InvalidConfiguration(_)), "{err}");
}

#[test]
fn test_output_shape_mismatch() {
    let inputs = inputs(vec![gray(&[&[1, 2]])]);
    let err = darkest()
        .with_output_shape(3, 1)
        .compose(&inputs)
        .unwrap_err();
    assert!(matches!(err, CompositorError::ShapeMismatch { .. }), "{err}");

    assert!(darkest().with_output_shape(2, 1).compose(&inputs).is_ok());
}

#[test]
fn test_band_count_mismatch() {
    let rgb = multi(&[&[&[1]], &[&[1]], &[&[1]]]);
    let err = darkest()
        .compose(&inputs(vec![gray(&[&[1]]), rgb]))
        .unwrap_err();
    assert!(
        matches!(
            err,
            CompositorError::BandCountMismatch {
                index: 1,
                expected: 1,
                found: 3
            }
        ),
        "{err}"
    );
}

#[test]
fn test_empty_inputs_rejected() {
    let err = darkest().compose::<u8>(&[]).unwrap_err();
    assert!(matches!(err, CompositorError::InvalidConfiguration(_)), "{err}");
}

#[test]
fn test_invalid_stage_order_rejected() {
    let err = Compositor::new(
        vec![from_file(0.0, 1.0), QualityStage::Darkest],
        Selector::MaxQuality,
    )
    .unwrap_err();
    assert!(matches!(err, CompositorError::InvalidConfiguration(_)));

    let err = Compositor::new(
        vec![from_file(0.0, 1.0), from_file(0.0, 2.0)],
        Selector::MaxQuality,
    )
    .unwrap_err();
    assert!(matches!(err, CompositorError::InvalidConfiguration(_)));
}

#[test]
fn test_bad_percentile_rejected_at_construction() {
    let err = Compositor::new(vec![QualityStage::Darkest], Selector::Percentile(101.0)).unwrap_err();
    assert!(matches!(err, CompositorError::InvalidConfiguration(_)));
}

#[test]
fn test_bad_per_input_scale_rejected() {
    let inputs = vec![Input::new(gray(&[&[1]]))
        .with_quality_source(float(&[&[0.5]]))
        .with_scale(ScaleRange { min: 2.0, max: 1.0 })];
    let compositor = Compositor::new(vec![from_file(0.0, 1.0)], Selector::MaxQuality).unwrap();
    let err = compositor.compose(&inputs).unwrap_err();
    assert!(matches!(err, CompositorError::InvalidConfiguration(_)), "{err}");
}

#[test]
fn test_u16_and_float_inputs() {
    let a = Raster::gray(array![[1000u16, 60000]]);
    let b = Raster::gray(array![[2000u16, 50000]]);
    let composite = darkest().compose(&inputs(vec![a, b])).unwrap();
    assert_eq!(composite.output.band(0), &array![[1000u16, 50000]]);

    let a = float(&[&[0.2, 0.9]]);
    let b = float(&[&[0.4, 0.1]]);
    let composite = darkest().compose(&inputs(vec![a, b])).unwrap();
    assert_grid_close(composite.output.band(0), &array![[0.2, 0.1]], 0.0);
}

#[test]
fn test_large_image_parallel_path() {
    let (h, w) = (300, 300);
    let dark = Raster::gray(Array2::from_elem((h, w), 10u8));
    let bright = Raster::gray(Array2::from_elem((h, w), 20u8));
    let composite = darkest().compose(&inputs(vec![bright, dark])).unwrap();

    assert!(composite.output.band(0).iter().all(|&v| v == 10));
    assert_eq!(composite.stats.wins_per_input, vec![0, h * w]);
    assert_eq!(composite.stats.nodata_pixels, 0);
    assert_eq!(composite.stats.coverage(), 1.0);
}

#[derive(Default)]
struct RecordingReporter {
    stages: Mutex<Vec<PipelineStage>>,
    advances: AtomicUsize,
}

impl ProgressReporter for RecordingReporter {
    fn begin_stage(&self, stage: PipelineStage, _total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
    }

    fn advance(&self, _items_done: usize) {
        self.advances.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn test_progress_reports_scoring_and_selecting() {
    let reporter = RecordingReporter::default();
    let inputs = inputs(vec![gray(&[&[1, 2], &[3, 4]]), gray(&[&[4, 3], &[2, 1]])]);
    darkest().compose_reported(&inputs, &reporter).unwrap();

    assert_eq!(
        *reporter.stages.lock().unwrap(),
        vec![PipelineStage::Scoring, PipelineStage::Selecting]
    );
    // one stage plus two rows
    assert_eq!(reporter.advances.load(Ordering::Relaxed), 3);
}
