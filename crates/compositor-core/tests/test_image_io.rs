mod common;

use ndarray::array;

use compositor_core::io::image_io::{load_raster, save_raster};
use compositor_core::io::{probe_raster, read_raster, write_raster};
use compositor_core::raster::{AnyRaster, Raster, SampleType};

use common::{float, gray, multi};

#[test]
fn test_png_gray_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gray.png");
    let raster = gray(&[&[0, 64], &[128, 255]]);

    write_raster(&path, &AnyRaster::U8(raster.clone()), None).unwrap();
    assert_eq!(read_raster(&path).unwrap(), AnyRaster::U8(raster));
}

#[test]
fn test_png_rgba_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rgba.png");
    let raster = multi(&[
        &[&[0, 1], &[3, 4]],
        &[&[10, 11], &[13, 14]],
        &[&[20, 21], &[23, 24]],
        &[&[255, 128], &[64, 0]],
    ]);

    save_raster(&path, &AnyRaster::U8(raster.clone())).unwrap();
    assert_eq!(load_raster(&path).unwrap(), AnyRaster::U8(raster));

    let info = probe_raster(&path).unwrap();
    assert_eq!(info.band_count, 4);
    assert!(info.geo.is_none());
}

#[test]
fn test_png_16_bit_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deep.png");
    let raster = Raster::gray(array![[0u16, 300], [30000, 65535]]);

    save_raster(&path, &AnyRaster::U16(raster.clone())).unwrap();
    let read = load_raster(&path).unwrap();
    assert_eq!(read.sample_type(), SampleType::U16);
    assert_eq!(read, AnyRaster::U16(raster));
}

#[test]
fn test_float_png_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("float.png");
    assert!(save_raster(&path, &AnyRaster::F32(float(&[&[0.5]]))).is_err());
    assert!(!path.exists());
}

#[test]
fn test_five_band_png_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.png");
    let raster = multi(&[&[&[1]], &[&[2]], &[&[3]], &[&[4]], &[&[5]]]);
    assert!(save_raster(&path, &AnyRaster::U8(raster)).is_err());
}
