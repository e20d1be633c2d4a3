use crate::{error::AtlasError, month::Month, palette::Metric};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Runtime settings, readable from a TOML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub data_dir: PathBuf,
    pub states_file: String,
    pub counties_file: String,
    pub summary_file: String,
    pub state_data_dir: String,
    pub year: i32,
    pub start_month: u32,
    pub tick_ms: u64,
    pub tour_speed: f64,
    pub metric: Metric,
    pub log_file: PathBuf,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            states_file: "states.geojson".into(),
            counties_file: "counties.geojson".into(),
            summary_file: "us_summary_2024_monthly.csv".into(),
            state_data_dir: "state_data".into(),
            year: 2024,
            start_month: 1,
            tick_ms: 100,
            tour_speed: 1.0,
            metric: Metric::Frp,
            log_file: PathBuf::from("fire-atlas.log"),
        }
    }
}

impl AtlasConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AtlasError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| AtlasError::io(path, e))?;
        let config: AtlasConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AtlasError> {
        if !(self.tour_speed > 0.0) || !self.tour_speed.is_finite() {
            return Err(AtlasError::Config(format!("tour_speed must be positive, got {}", self.tour_speed)));
        }
        if self.tick_ms == 0 {
            return Err(AtlasError::Config("tick_ms must be at least 1".into()));
        }
        if Month::new(self.start_month).is_none() {
            return Err(AtlasError::Config(format!("start_month must be 1-12, got {}", self.start_month)));
        }
        Ok(())
    }

    pub fn start_month(&self) -> Month {
        Month::new(self.start_month).unwrap_or_default()
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn states_path(&self) -> PathBuf {
        self.data_dir.join(&self.states_file)
    }

    pub fn counties_path(&self) -> PathBuf {
        self.data_dir.join(&self.counties_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.data_dir.join(&self.summary_file)
    }

    pub fn state_data_path(&self) -> PathBuf {
        self.data_dir.join(&self.state_data_dir)
    }
}
