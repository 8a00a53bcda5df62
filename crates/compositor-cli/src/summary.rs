use console::Style;
use compositor_core::pipeline::config::{CompositorConfig, StageConfig};
use compositor_core::pipeline::RunSummary;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_config_summary(config: &CompositorConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Compositor"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(10)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output_file.display())
    );
    match &config.quality_output {
        Some(path) => println!(
            "  {:<14}{}",
            s.label.apply_to("Quality"),
            s.path.apply_to(path.display())
        ),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Quality"),
            s.disabled.apply_to("not written")
        ),
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("No-data"),
        s.value.apply_to(config.nodata)
    );
    println!();

    println!("  {}", s.header.apply_to("Stages"));
    if config.compositors.is_empty() {
        println!("    {}", s.disabled.apply_to("none (all inputs equal quality)"));
    }
    for (i, stage) in config.compositors.iter().enumerate() {
        let text = match stage {
            StageConfig::Darkest => "darkest".to_string(),
            StageConfig::Percentile { quality_percentile } => {
                format!("percentile {quality_percentile}")
            }
            StageConfig::QualityFromFile {
                file_key,
                file_suffix,
                scale_min,
                scale_max,
            } => {
                let source = match (file_key, file_suffix) {
                    (Some(key), _) => format!("key '{key}'"),
                    (None, Some(suffix)) => format!("suffix '{suffix}'"),
                    (None, None) => "unset".to_string(),
                };
                format!("qualityfromfile {source}, scale {scale_min}..{scale_max}")
            }
        };
        println!("    {}. {}", s.label.apply_to(i + 1), s.method.apply_to(text));
    }
    println!();

    println!(
        "  {} {}",
        s.header.apply_to("Inputs"),
        s.label.apply_to(format!("({})", config.inputs.len()))
    );
    for (i, input) in config.inputs.iter().enumerate() {
        println!(
            "    {:>3}  {}",
            s.label.apply_to(i),
            s.path.apply_to(input.filename.display())
        );
    }
    println!();
}

pub fn print_run_summary(config: &CompositorConfig, summary: &RunSummary) {
    let s = Styles::new();
    let stats = &summary.stats;

    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Size"),
        s.value.apply_to(format!(
            "{}x{}, {} band(s), {}",
            summary.width, summary.height, summary.band_count, summary.sample_type
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Coverage"),
        s.value.apply_to(format!("{:.1}%", stats.coverage() * 100.0))
    );
    if stats.nodata_pixels > 0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("No-data"),
            s.disabled.apply_to(format!("{} pixel(s)", stats.nodata_pixels))
        );
    }
    println!("  {}", s.header.apply_to("Pixels per input"));
    for (input, wins) in config.inputs.iter().zip(&stats.wins_per_input) {
        println!(
            "    {:>10}  {}",
            s.value.apply_to(wins),
            s.path.apply_to(input.filename.display())
        );
    }
    println!();
    println!(
        "  Output saved to {}",
        s.path.apply_to(config.output_file.display())
    );
}
