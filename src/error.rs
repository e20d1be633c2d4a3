use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by data loading and view transitions.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid GeoJSON in {}: {source}", path.display())]
    GeoJson {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },

    #[error("malformed CSV in {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("could not load fire data for {state}: {source}")]
    StateData {
        state: String,
        #[source]
        source: Box<AtlasError>,
    },

    #[error("no county data for {0}")]
    NoSubRegions(String),

    #[error("no state boundaries loaded")]
    NoStates,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AtlasError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
