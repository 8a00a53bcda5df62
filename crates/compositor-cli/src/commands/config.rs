use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use compositor_core::pipeline::config::CompositorConfig;

#[derive(Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Json,
    Toml,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    pub format: ConfigFormat,

    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save an example CompositorConfig.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = CompositorConfig::example();
    let text = match args.format {
        ConfigFormat::Json => serde_json::to_string_pretty(&config)? + "\n",
        ConfigFormat::Toml => toml::to_string_pretty(&config)?,
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &text)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Example config saved to {}", path.display());
    } else {
        print!("{}", text);
    }

    Ok(())
}
