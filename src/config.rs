use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub year: u16,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Directory holding one CSV per ACS layer plus the base geography table.
    pub acs_dir: PathBuf,
    /// Directory holding `tl_<year>_<SS>_bg.shp` (or `.geojson`) per state.
    pub tiger_dir: PathBuf,
    /// Defaults to `ACS_<year>_5YR_BG`.
    pub acs_base_layer: Option<String>,
    /// Replaces the built-in state list (`StateFIPS`, `CensusName` columns).
    pub states_csv: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
    #[serde(default)]
    pub compress_csv: bool,
    #[serde(default)]
    pub geometry_format: GeometryFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeometryFormat {
    #[default]
    Pickle,
    Geojson,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("blockgroupdemographics.log")),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    pub fn acs_base_layer(&self) -> String {
        self.input
            .acs_base_layer
            .clone()
            .unwrap_or_else(|| format!("ACS_{}_5YR_BG", self.year))
    }

    /// File name prefix shared by the state shapefiles, e.g. `tl_2019_`.
    pub fn tiger_prefix(&self) -> String {
        format!("tl_{}_", self.year)
    }

    pub fn demographics_path(&self) -> PathBuf {
        let ext = if self.output.compress_csv { "csv.gz" } else { "csv" };
        self.output
            .dir
            .join(format!("{}blockgroupdemographics.{}", self.year, ext))
    }

    pub fn geometry_path(&self) -> PathBuf {
        let ext = match self.output.geometry_format {
            GeometryFormat::Pickle => "pkl",
            GeometryFormat::Geojson => "geojson",
        };
        self.output
            .dir
            .join(format!("{}blockgroupdemographics-geometry.{}", self.year, ext))
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.output.dir.join("acsvars.csv")
    }
}
