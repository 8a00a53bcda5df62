use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use compositor_core::pipeline::config::{load_config, CompositorConfig};
use compositor_core::pipeline::{run_compositor_reported, NoOpReporter, ProgressReporter};
use tracing::debug;

use crate::progress::BarReporter;
use crate::summary::{print_config_summary, print_run_summary};

#[derive(Args)]
pub struct ComposeArgs {
    /// Compositor config file (JSON, or TOML with a .toml extension)
    #[arg(short, long, conflicts_with_all = ["inputs", "output", "settings"])]
    pub json: Option<PathBuf>,

    /// Input raster; repeat for each source, order breaks ties
    #[arg(short = 'i', long = "input")]
    pub inputs: Vec<PathBuf>,

    /// Output raster path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Diagnostic quality raster path (winning quality + one band per input)
    #[arg(long, visible_alias = "qo")]
    pub quality_output: Option<PathBuf>,

    /// Compositor setting, e.g. `-s quality darkest` or `-s quality_percentile 60`
    #[arg(short = 's', long = "set", num_args = 2, value_names = ["KEY", "VALUE"])]
    pub settings: Vec<String>,
}

fn build_config(args: &ComposeArgs) -> Result<CompositorConfig> {
    if let Some(path) = &args.json {
        let mut config = load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        if let Some(quality_output) = &args.quality_output {
            config.quality_output = Some(quality_output.clone());
        }
        return Ok(config);
    }

    let Some(output) = args.output.clone() else {
        bail!("an output path (-o) is required without a config file");
    };
    if args.inputs.is_empty() {
        bail!("at least one input (-i) is required");
    }
    let settings: Vec<(String, String)> = args
        .settings
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair.get(1).cloned().unwrap_or_default()))
        .collect();

    let config = CompositorConfig::from_settings(
        output,
        args.quality_output.clone(),
        args.inputs.clone(),
        &settings,
    )
    .context("Invalid compositor settings")?;
    config.validate().context("Invalid compositor settings")?;
    debug!(
        inputs = config.inputs.len(),
        stages = config.compositors.len(),
        "Built config from settings"
    );
    Ok(config)
}

pub fn run(args: &ComposeArgs, quiet: bool) -> Result<()> {
    let config = build_config(args)?;

    if quiet {
        run_compositor_reported(&config, Arc::new(NoOpReporter)).context("Compositing failed")?;
        return Ok(());
    }

    print_config_summary(&config);
    let bar = Arc::new(BarReporter::new());
    let reporter: Arc<dyn ProgressReporter> = bar.clone();
    let summary = run_compositor_reported(&config, reporter).context("Compositing failed")?;
    bar.finish();

    print_run_summary(&config, &summary);
    Ok(())
}
