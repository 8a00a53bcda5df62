use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use compositor_core::io::probe_raster;

#[derive(Args)]
pub struct InfoArgs {
    /// Raster file (TIFF/GeoTIFF, PNG, ...)
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let info = probe_raster(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    println!("File:        {}", args.file.display());
    println!("Dimensions:  {}x{}", info.width, info.height);
    println!("Bands:       {} ({})", info.band_count, info.layout());
    println!("Samples:     {}", info.sample_type);

    match info.geo {
        Some(geo) => {
            if let Some(scale) = &geo.pixel_scale {
                println!("Pixel scale: {:?}", scale);
            }
            if let Some(tiepoints) = &geo.tiepoints {
                println!("Tiepoints:   {:?}", tiepoints);
            }
            if let Some(transform) = &geo.transformation {
                println!("Transform:   {:?}", transform);
            }
            if let Some(keys) = &geo.key_directory {
                println!("Geo keys:    {}", keys.get(3).copied().unwrap_or(0));
            }
            if let Some(ascii) = &geo.ascii_params {
                println!("Geo ASCII:   {}", ascii.trim_end_matches(['|', '\0']));
            }
            if let Some(nodata) = &geo.nodata {
                println!("No-data:     {}", nodata.trim_end_matches('\0'));
            }
        }
        None => println!("Georeferencing: none"),
    }

    Ok(())
}
