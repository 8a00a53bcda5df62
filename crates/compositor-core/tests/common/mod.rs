#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndarray::Array2;

use compositor_core::io::geotiff::{write_tiff, GeoMetadata};
use compositor_core::raster::{AnyRaster, Input, Raster};

/// Build a 2D array from row slices.
pub fn grid<T: Copy>(rows: &[&[T]]) -> Array2<T> {
    let h = rows.len();
    let w = rows[0].len();
    Array2::from_shape_fn((h, w), |(r, c)| rows[r][c])
}

/// Single-band u8 raster from rows.
pub fn gray(rows: &[&[u8]]) -> Raster<u8> {
    Raster::gray(grid(rows))
}

/// Single-band f32 raster from rows.
pub fn float(rows: &[&[f32]]) -> Raster<f32> {
    Raster::gray(grid(rows))
}

/// Multi-band u8 raster, one entry of `bands` per band.
pub fn multi(bands: &[&[&[u8]]]) -> Raster<u8> {
    Raster::from_bands(bands.iter().map(|rows| grid(rows)).collect()).unwrap()
}

pub fn inputs<T: compositor_core::raster::Sample>(rasters: Vec<Raster<T>>) -> Vec<Input<T>> {
    rasters.into_iter().map(Input::new).collect()
}

/// Georeferencing of a 2x2 WGS 84 raster with 0.5 degree pixels.
pub fn sample_geo() -> GeoMetadata {
    GeoMetadata {
        pixel_scale: Some(vec![0.5, 0.5, 0.0]),
        tiepoints: Some(vec![0.0, 0.0, 0.0, 10.0, 50.0, 0.0]),
        transformation: None,
        key_directory: Some(vec![
            1, 1, 0, 3, // header: version, revision, minor, key count
            1024, 0, 1, 2, // GTModelType = geographic
            1025, 0, 1, 1, // GTRasterType = PixelIsArea
            2048, 0, 1, 4326, // GeographicType = WGS 84
        ]),
        double_params: None,
        ascii_params: Some("WGS 84|".into()),
        nodata: None,
    }
}

/// Write a u8 TIFF fixture into `dir` and return its path.
pub fn write_u8(dir: &Path, name: &str, raster: Raster<u8>, geo: Option<&GeoMetadata>) -> PathBuf {
    let path = dir.join(name);
    write_tiff(&path, &AnyRaster::U8(raster), geo).unwrap();
    path
}

/// Write an f32 TIFF fixture into `dir` and return its path.
pub fn write_f32(dir: &Path, name: &str, raster: Raster<f32>) -> PathBuf {
    let path = dir.join(name);
    write_tiff(&path, &AnyRaster::F32(raster), None).unwrap();
    path
}

/// Assert two float arrays agree element-wise within `epsilon`.
pub fn assert_grid_close(actual: &Array2<f32>, expected: &Array2<f32>, epsilon: f32) {
    assert_eq!(actual.dim(), expected.dim(), "shape differs");
    for ((idx, a), e) in actual.indexed_iter().zip(expected.iter()) {
        assert!(
            (a - e).abs() <= epsilon,
            "at {idx:?}: got {a}, expected {e} (epsilon {epsilon})"
        );
    }
}
