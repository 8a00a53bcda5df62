use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_NODATA, DEFAULT_SCALE_MAX, DEFAULT_SCALE_MIN};
use crate::error::{CompositorError, Result};
use crate::quality::from_file::{QualityFromFile, ScaleRange};
use crate::quality::QualityStage;
use crate::select::Selector;

use super::engine::Compositor;

/// Full description of one compositor run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositorConfig {
    pub output_file: PathBuf,
    /// Destination of the `1 + N` band diagnostic quality raster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_output: Option<PathBuf>,
    #[serde(default = "default_nodata")]
    pub nodata: f64,
    /// Stages and selector, in declared order.
    pub compositors: Vec<StageConfig>,
    pub inputs: Vec<InputConfig>,
}

fn default_nodata() -> f64 {
    DEFAULT_NODATA
}

fn default_scale_min() -> f32 {
    DEFAULT_SCALE_MIN
}

fn default_scale_max() -> f32 {
    DEFAULT_SCALE_MAX
}

/// One entry of the `compositors` list, tagged by `class`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "lowercase")]
pub enum StageConfig {
    Darkest,
    Percentile {
        quality_percentile: f32,
    },
    QualityFromFile {
        /// Name of the input field holding the quality raster path.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_key: Option<String>,
        /// Suffix appended to the input filename to locate the quality raster.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_suffix: Option<String>,
        #[serde(default = "default_scale_min")]
        scale_min: f32,
        #[serde(default = "default_scale_max")]
        scale_max: f32,
    },
}

/// One contributing raster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    pub filename: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_min: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_max: Option<f32>,
    /// Any other field names an auxiliary raster, e.g. `"quality": "a.q.tif"`.
    #[serde(flatten)]
    pub sources: BTreeMap<String, PathBuf>,
}

impl InputConfig {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            scale_min: None,
            scale_max: None,
            sources: BTreeMap::new(),
        }
    }

    /// Per-input range, filling a missing bound from the stage's range.
    pub fn scale_override(&self, stage_range: ScaleRange) -> Result<Option<ScaleRange>> {
        if self.scale_min.is_none() && self.scale_max.is_none() {
            return Ok(None);
        }
        let range = ScaleRange::new(
            self.scale_min.unwrap_or(stage_range.min),
            self.scale_max.unwrap_or(stage_range.max),
        )
        .map_err(|e| {
            CompositorError::InvalidConfiguration(format!("{}: {e}", self.filename.display()))
        })?;
        Ok(Some(range))
    }
}

/// Where an input's external quality raster lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QualityLocator {
    /// Path stored in the input entry under this key.
    Key(String),
    /// Input filename with this suffix appended.
    Suffix(String),
}

impl QualityLocator {
    pub fn resolve(&self, input: &InputConfig) -> Option<PathBuf> {
        match self {
            Self::Key(key) => input.sources.get(key).cloned(),
            Self::Suffix(suffix) => {
                let mut name = OsString::from(input.filename.as_os_str());
                name.push(suffix);
                Some(PathBuf::from(name))
            }
        }
    }
}

impl CompositorConfig {
    /// Build the validated compositor described by `compositors` and `nodata`.
    pub fn compositor(&self) -> Result<Compositor> {
        let mut stages = Vec::new();
        let mut selector: Option<Selector> = None;

        for entry in &self.compositors {
            match entry {
                StageConfig::Darkest => stages.push(QualityStage::Darkest),
                StageConfig::Percentile { quality_percentile } => {
                    if selector.is_some() {
                        return Err(CompositorError::InvalidConfiguration(
                            "only one percentile selector may be configured".into(),
                        ));
                    }
                    selector = Some(Selector::percentile(*quality_percentile)?);
                }
                StageConfig::QualityFromFile {
                    scale_min,
                    scale_max,
                    ..
                } => {
                    let range = ScaleRange::new(*scale_min, *scale_max)?;
                    stages.push(QualityStage::FromFile(QualityFromFile::new(range)?));
                }
            }
        }

        if !self.nodata.is_finite() {
            return Err(CompositorError::InvalidConfiguration(format!(
                "nodata {} must be finite",
                self.nodata
            )));
        }

        Ok(Compositor::new(stages, selector.unwrap_or_default())?.with_nodata(self.nodata))
    }

    /// Quality locator and scale range of the quality-from-file stage, if any.
    pub fn quality_source(&self) -> Result<Option<(QualityLocator, ScaleRange)>> {
        let Some(StageConfig::QualityFromFile {
            file_key,
            file_suffix,
            scale_min,
            scale_max,
        }) = self
            .compositors
            .iter()
            .find(|c| matches!(c, StageConfig::QualityFromFile { .. }))
        else {
            return Ok(None);
        };

        let locator = match (file_key, file_suffix) {
            (Some(key), None) => QualityLocator::Key(key.clone()),
            (None, Some(suffix)) => QualityLocator::Suffix(suffix.clone()),
            _ => {
                return Err(CompositorError::InvalidConfiguration(
                    "qualityfromfile needs exactly one of file_key or file_suffix".into(),
                ))
            }
        };
        Ok(Some((locator, ScaleRange::new(*scale_min, *scale_max)?)))
    }

    /// Check everything that can be checked without touching any raster.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(CompositorError::InvalidConfiguration(
                "at least one input is required".into(),
            ));
        }
        self.compositor()?;
        if let Some((_, range)) = self.quality_source()? {
            for input in &self.inputs {
                input.scale_override(range)?;
            }
        }
        Ok(())
    }

    /// Build a config from `KEY VALUE` settings pairs.
    ///
    /// Recognized keys: `quality` (only `darkest`), `quality_percentile`,
    /// `quality_file` (filename suffix), `quality_file_scale_min`,
    /// `quality_file_scale_max`, `nodata`. Stages are ordered darkest,
    /// quality file, percentile.
    pub fn from_settings(
        output_file: PathBuf,
        quality_output: Option<PathBuf>,
        inputs: Vec<PathBuf>,
        settings: &[(String, String)],
    ) -> Result<Self> {
        let mut darkest = false;
        let mut percentile = None;
        let mut suffix = None;
        let mut scale_min = None;
        let mut scale_max = None;
        let mut nodata = DEFAULT_NODATA;

        for (key, value) in settings {
            match key.as_str() {
                "quality" if value == "darkest" => darkest = true,
                "quality" => {
                    return Err(CompositorError::InvalidConfiguration(format!(
                        "unknown quality method '{value}'"
                    )))
                }
                "quality_percentile" => percentile = Some(parse_setting::<f32>(key, value)?),
                "quality_file" => suffix = Some(value.clone()),
                "quality_file_scale_min" => scale_min = Some(parse_setting::<f32>(key, value)?),
                "quality_file_scale_max" => scale_max = Some(parse_setting::<f32>(key, value)?),
                "nodata" => nodata = parse_setting::<f64>(key, value)?,
                _ => {
                    return Err(CompositorError::InvalidConfiguration(format!(
                        "unknown setting '{key}'"
                    )))
                }
            }
        }

        let mut compositors = Vec::new();
        if darkest {
            compositors.push(StageConfig::Darkest);
        }
        match suffix {
            Some(suffix) => compositors.push(StageConfig::QualityFromFile {
                file_key: None,
                file_suffix: Some(suffix),
                scale_min: scale_min.unwrap_or(DEFAULT_SCALE_MIN),
                scale_max: scale_max.unwrap_or(DEFAULT_SCALE_MAX),
            }),
            None if scale_min.is_some() || scale_max.is_some() => {
                return Err(CompositorError::InvalidConfiguration(
                    "quality_file_scale_min/max require quality_file".into(),
                ))
            }
            None => {}
        }
        if let Some(quality_percentile) = percentile {
            compositors.push(StageConfig::Percentile { quality_percentile });
        }

        Ok(Self {
            output_file,
            quality_output,
            nodata,
            compositors,
            inputs: inputs.into_iter().map(InputConfig::new).collect(),
        })
    }

    /// Example configuration, as printed by the `config` command.
    pub fn example() -> Self {
        let mut first = InputConfig::new("scene_a.tif");
        first
            .sources
            .insert("quality".into(), PathBuf::from("scene_a_quality.tif"));
        let mut second = InputConfig::new("scene_b.tif");
        second
            .sources
            .insert("quality".into(), PathBuf::from("scene_b_quality.tif"));

        Self {
            output_file: PathBuf::from("mosaic.tif"),
            quality_output: Some(PathBuf::from("mosaic_quality.tif")),
            nodata: DEFAULT_NODATA,
            compositors: vec![
                StageConfig::Darkest,
                StageConfig::QualityFromFile {
                    file_key: Some("quality".into()),
                    file_suffix: None,
                    scale_min: DEFAULT_SCALE_MIN,
                    scale_max: DEFAULT_SCALE_MAX,
                },
            ],
            inputs: vec![first, second],
        }
    }
}

fn parse_setting<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CompositorError::InvalidConfiguration(format!("invalid value '{value}' for {key}"))
    })
}

/// Load a config file: TOML for `.toml`, JSON otherwise.
pub fn load_config(path: &Path) -> Result<CompositorConfig> {
    let contents = std::fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    let config: CompositorConfig = if is_toml {
        toml::from_str(&contents).map_err(|e| {
            CompositorError::InvalidConfiguration(format!("{}: {e}", path.display()))
        })?
    } else {
        serde_json::from_str(&contents).map_err(|e| {
            CompositorError::InvalidConfiguration(format!("{}: {e}", path.display()))
        })?
    };
    config.validate()?;
    Ok(config)
}
