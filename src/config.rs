//! Configuration loader - YAML plot settings + .env directories

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::encode::ScatterOptions;
use crate::histogram::{BinSpec, DEFAULT_BIN_COUNT};
use crate::palette::{ColorScale, GroupId, GroupPalette, DEFAULT_GROUP_COLORS};

/// Main configuration loaded from fiber_plot.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fiber disc radius in mm
    pub radius_mm: f64,
    pub color_scale: ScaleConfig,
    pub histogram: HistogramConfig,
    pub fallback_color: String,
    pub groups: BTreeMap<GroupId, String>,
    pub datasets: Vec<DatasetSource>,
    pub default_dataset: Option<String>,
}

/// Fixed colorbar range for the non-telecentricity scatter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleConfig {
    pub min: f64,
    pub max: f64,
}

/// Histogram binning; at most one of the fields may be set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bins: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeConfig {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

/// A named fiber table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSource {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
}

/// Directories loaded from the environment / .env
#[derive(Debug, Clone)]
pub struct Environment {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            min: ColorScale::DEFAULT_MIN,
            max: ColorScale::DEFAULT_MAX,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let dataset = |id: &str, name: &str, file: &str| DatasetSource {
            id: id.to_string(),
            name: name.to_string(),
            path: PathBuf::from(file),
        };

        Self {
            radius_mm: ScatterOptions::default().radius,
            color_scale: ScaleConfig::default(),
            histogram: HistogramConfig {
                range: Some(RangeConfig {
                    start: 0.0,
                    stop: 0.401,
                    step: 0.005,
                }),
                ..Default::default()
            },
            fallback_color: "gray".to_string(),
            groups: DEFAULT_GROUP_COLORS
                .iter()
                .map(|&(id, hex)| (id, hex.to_string()))
                .collect(),
            datasets: vec![
                dataset("object", "Object bundle", "SMI_300_data_object.csv"),
                dataset("sky_lhs", "Sky bundle (LHS)", "SMI_300_data_sky_LHS.csv"),
                dataset("sky_rhs", "Sky bundle (RHS)", "SMI_300_data_sky_RHS.csv"),
            ],
            default_dataset: Some("sky_rhs".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config {:?}", path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every derived setting up front so later lookups cannot fail
    pub fn validate(&self) -> Result<()> {
        self.scatter_options()?;
        self.color_scale()?;
        self.palette()?;
        self.bin_spec()?;
        if let Some(id) = &self.default_dataset {
            if self.get_dataset(id).is_none() {
                bail!("default_dataset '{}' is not listed in datasets", id);
            }
        }
        Ok(())
    }

    pub fn scatter_options(&self) -> Result<ScatterOptions> {
        if !(self.radius_mm.is_finite() && self.radius_mm > 0.0) {
            bail!("radius_mm must be positive, got {}", self.radius_mm);
        }
        Ok(ScatterOptions {
            radius: self.radius_mm,
        })
    }

    pub fn color_scale(&self) -> Result<ColorScale> {
        ColorScale::new(self.color_scale.min, self.color_scale.max)
    }

    pub fn palette(&self) -> Result<GroupPalette> {
        GroupPalette::from_hex(
            self.groups.iter().map(|(&id, hex)| (id, hex.as_str())),
            &self.fallback_color,
        )
    }

    pub fn bin_spec(&self) -> Result<BinSpec> {
        let h = &self.histogram;
        let spec = match (h.bins, &h.edges, h.range) {
            (None, None, None) => BinSpec::Count(DEFAULT_BIN_COUNT),
            (Some(n), None, None) => BinSpec::Count(n),
            (None, Some(edges), None) => BinSpec::Edges(edges.clone()),
            (None, None, Some(r)) => BinSpec::Range {
                start: r.start,
                stop: r.stop,
                step: r.step,
            },
            _ => bail!("histogram: set only one of bins, edges or range"),
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Get dataset source by ID
    pub fn get_dataset(&self, id: &str) -> Option<&DatasetSource> {
        self.datasets.iter().find(|d| d.id == id)
    }
}

impl Environment {
    /// Load directories from .env / process environment
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        let dir = |key: &str, default: &str| {
            PathBuf::from(std::env::var(key).unwrap_or_else(|_| default.to_string()))
        };

        Environment {
            data_dir: dir("FIBER_PLOT_DATA_DIR", "."),
            output_dir: dir("FIBER_PLOT_OUTPUT_DIR", "plots"),
            log_dir: dir("FIBER_PLOT_LOG_DIR", "logs"),
        }
    }

    /// Relative dataset paths live under the data directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}
