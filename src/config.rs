//! Comparison configuration (TOML).
//!
//! A comparison file names the model, the dataset, the packages to fit and
//! any persisted stores to merge in. Relative paths are resolved against the
//! directory holding the config file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::cbpp_formula;
use crate::domain::{Approximation, DataLayout, ModelFormula};
use crate::error::AppError;
use crate::harmonize::DEFAULT_TRIM;
use crate::models::BackendSpec;

/// Environment variable naming the default config file.
pub const CONFIG_ENV: &str = "GCMP_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompareConfig {
    #[serde(default = "default_conf_level")]
    pub conf_level: f64,
    #[serde(default = "default_true")]
    pub conf_int: bool,
    #[serde(default = "default_trim")]
    pub trim: f64,
    /// Packages left out of the long (estimate / std_error) table.
    #[serde(default)]
    pub exclude_from_long: Vec<String>,
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default)]
    pub model: Option<ModelFormula>,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default, rename = "package")]
    pub packages: Vec<PackageConfig>,
    #[serde(default, rename = "store")]
    pub stores: Vec<StoreConfig>,
    #[serde(default)]
    pub plot: PlotConfig,
    /// Directory of the config file; relative paths resolve against it.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    #[serde(default)]
    pub source: DatasetSource,
}

/// Where the model data comes from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DatasetSource {
    /// The built-in CBPP table.
    #[default]
    Cbpp,
    /// A binomial CSV matching the configured model.
    Csv(PathBuf),
}

impl<'de> Deserialize<'de> for DatasetSource {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(if s.eq_ignore_ascii_case("cbpp") {
            DatasetSource::Cbpp
        } else {
            DatasetSource::Csv(PathBuf::from(s))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    pub id: String,
    #[serde(default = "default_approximation")]
    pub approximation: Approximation,
    #[serde(default = "default_layout")]
    pub layout: DataLayout,
    pub backend: BackendSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub path: PathBuf,
}

/// Plot dimensions and colours, passed explicitly to every renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotConfig {
    /// ASCII chart width in characters.
    pub width: usize,
    /// ASCII chart height in rows, per term panel.
    pub height: usize,
    pub svg_width: u32,
    pub svg_height: u32,
    /// RGB colours cycled over packages in table order.
    pub palette: Vec<[u8; 3]>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 12,
            svg_width: 1200,
            svg_height: 800,
            // matplotlib "tab10"
            palette: vec![
                [31, 119, 180],
                [255, 127, 14],
                [44, 160, 44],
                [214, 39, 40],
                [148, 103, 189],
                [140, 86, 75],
                [227, 119, 194],
                [127, 127, 127],
                [188, 189, 34],
                [23, 190, 207],
            ],
        }
    }
}

impl PlotConfig {
    pub fn color(&self, idx: usize) -> [u8; 3] {
        if self.palette.is_empty() {
            return [0, 0, 0];
        }
        self.palette[idx % self.palette.len()]
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.width < 40 {
            return Err(AppError::new(2, "plot width must be >= 40."));
        }
        if self.height < 5 {
            return Err(AppError::new(2, "plot height must be >= 5."));
        }
        if self.svg_width < 200 || self.svg_height < 150 {
            return Err(AppError::new(2, "SVG size must be at least 200x150."));
        }
        if self.palette.is_empty() {
            return Err(AppError::new(2, "plot palette must not be empty."));
        }
        Ok(())
    }
}

impl CompareConfig {
    /// Read, parse, resolve and validate a config file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)
            .map_err(|e| AppError::new(2, format!("Failed to read config '{}': {e}", path.display())))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_toml(&text, &base_dir)
    }

    pub fn from_toml(text: &str, base_dir: &Path) -> Result<Self, AppError> {
        let mut config: CompareConfig =
            toml::from_str(text).map_err(|e| AppError::new(2, format!("Invalid config: {e}")))?;
        config.base_dir = base_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// The configured model, defaulting to the CBPP model for the CBPP dataset.
    pub fn formula(&self) -> Result<ModelFormula, AppError> {
        match (&self.model, &self.dataset.source) {
            (Some(model), _) => Ok(model.clone()),
            (None, DatasetSource::Cbpp) => Ok(cbpp_formula()),
            (None, DatasetSource::Csv(_)) => Err(AppError::new(2, "A CSV dataset requires a [model] section.")),
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    fn validate(&self) -> Result<(), AppError> {
        if !(self.conf_level > 0.0 && self.conf_level < 1.0) {
            return Err(AppError::new(2, format!("conf_level must be in (0, 1), got {}.", self.conf_level)));
        }
        if !self.trim.is_finite() || self.trim < 0.0 {
            return Err(AppError::new(2, format!("trim must be >= 0, got {}.", self.trim)));
        }
        if self.packages.is_empty() && self.stores.is_empty() {
            return Err(AppError::new(2, "Config lists no [[package]] and no [[store]] entries."));
        }
        if let Some(p) = self.packages.iter().find(|p| p.id.trim().is_empty()) {
            return Err(AppError::new(2, format!("Package with empty id (backend {:?}).", p.backend)));
        }
        self.formula()?;
        self.plot.validate()
    }
}

fn default_conf_level() -> f64 {
    0.95
}

fn default_true() -> bool {
    true
}

fn default_trim() -> f64 {
    DEFAULT_TRIM
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("target/gcmp")
}

fn default_approximation() -> Approximation {
    Approximation::Laplace
}

fn default_layout() -> DataLayout {
    DataLayout::Aggregated
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
conf_level = 0.9
exclude_from_long = ["glmmTMB"]

[model]
response = "incidence"
trials = "size"
fixed = ["period"]
group = "herd"

[dataset]
source = "cbpp"

[[package]]
id = "lme4_laplace"
backend = { kind = "replay", path = "fits/lme4.json" }

[[package]]
id = "lme4_agq10"
approximation = "agq:10"
layout = "disaggregated"
backend = { kind = "command", program = "Rscript", args = ["fit.R"] }

[[store]]
path = "results/second.csv"

[plot]
width = 80
palette = [[0, 0, 0]]
"#;

    #[test]
    fn parses_full_config() {
        let cfg = CompareConfig::from_toml(FULL, Path::new("/cfg")).unwrap();
        assert_eq!(cfg.conf_level, 0.9);
        assert!(cfg.conf_int);
        assert_eq!(cfg.trim, DEFAULT_TRIM);
        assert_eq!(cfg.packages.len(), 2);
        assert_eq!(cfg.packages[0].approximation, Approximation::Laplace);
        assert_eq!(cfg.packages[0].layout, DataLayout::Aggregated);
        assert_eq!(cfg.packages[1].approximation, Approximation::AdaptiveQuadrature(10));
        assert_eq!(cfg.packages[1].layout, DataLayout::Disaggregated);
        assert_eq!(
            cfg.packages[1].backend,
            BackendSpec::Command {
                program: "Rscript".to_string(),
                args: vec!["fit.R".to_string()],
            }
        );
        assert_eq!(cfg.resolve(&cfg.stores[0].path), PathBuf::from("/cfg/results/second.csv"));
        assert_eq!(cfg.plot.width, 80);
        assert_eq!(cfg.plot.height, 12);
        assert_eq!(cfg.plot.color(3), [0, 0, 0]);
    }

    #[test]
    fn cbpp_is_the_default_dataset_and_model() {
        let cfg = CompareConfig::from_toml("[[store]]\npath = \"s.csv\"\n", Path::new(".")).unwrap();
        assert_eq!(cfg.dataset.source, DatasetSource::Cbpp);
        assert_eq!(cfg.formula().unwrap(), cbpp_formula());
    }

    #[test]
    fn csv_dataset_requires_model() {
        let err = CompareConfig::from_toml(
            "[dataset]\nsource = \"data.csv\"\n[[store]]\npath = \"s.csv\"\n",
            Path::new("."),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn rejects_bad_conf_level_and_empty_config() {
        let bad = CompareConfig::from_toml("conf_level = 1.5\n[[store]]\npath = \"s.csv\"\n", Path::new("."));
        assert_eq!(bad.unwrap_err().exit_code(), 2);
        let empty = CompareConfig::from_toml("", Path::new("."));
        assert_eq!(empty.unwrap_err().exit_code(), 2);
    }

    #[test]
    fn rejects_bad_approximation() {
        let err = CompareConfig::from_toml(
            "[[package]]\nid = \"x\"\napproximation = \"agq:0\"\nbackend = { kind = \"replay\", path = \"x.json\" }\n",
            Path::new("."),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
