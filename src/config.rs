use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

use crate::chart::ChartKind;
use crate::data::Metric;

pub const DEFAULT_CONFIG_FILE: &str = "atlas.toml";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub dashboard: DashboardConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub data_csv: PathBuf,
    /// World borders for the map panels; the maps are skipped when absent.
    pub world_geojson: Option<PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_csv: PathBuf::from("world_population.csv"),
            world_geojson: Some(PathBuf::from("data/world.geojson")),
        }
    }
}

/// Initial values of the dashboard controls.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub year: u16,
    pub top_n: usize,
    pub chart: ChartKind,
    pub metric: Metric,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            year: 2022,
            top_n: 10,
            chart: ChartKind::Bar,
            metric: Metric::Area,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from(".") }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Dashboard mode logs here so the terminal UI stays clean.
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: PathBuf::from("atlas.log"),
        }
    }
}

impl LoggingConfig {
    /// Parsed `level`; `None` when it is not a tracing level name.
    pub fn max_level(&self) -> Option<Level> {
        Level::from_str(self.level.trim()).ok()
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// An explicit path must exist; otherwise `atlas.toml` is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load_from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[dashboard]\ntop_n = 25\nchart = \"pie\"\nmetric = \"growth-rate\"\n\n[input]\ndata_csv = \"pop.csv\""
        )
        .unwrap();

        let cfg = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.dashboard.top_n, 25);
        assert_eq!(cfg.dashboard.year, 2022);
        assert_eq!(cfg.dashboard.chart, ChartKind::Pie);
        assert_eq!(cfg.dashboard.metric, Metric::GrowthRate);
        assert_eq!(cfg.input.data_csv, PathBuf::from("pop.csv"));
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.export.dir, PathBuf::from("."));
    }

    #[test]
    fn logging_level_is_parsed() {
        let mut logging = LoggingConfig::default();
        assert_eq!(logging.max_level(), Some(Level::INFO));
        logging.level = "DEBUG".to_string();
        assert_eq!(logging.max_level(), Some(Level::DEBUG));
        logging.level = "chatty".to_string();
        assert_eq!(logging.max_level(), None);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dashboard\ntop_n = ").unwrap();
        assert!(AppConfig::load_from_file(file.path()).is_err());
    }
}
