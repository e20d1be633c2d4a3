use crate::{error::AtlasError, month::Month, region::RegionId};
use chrono::{Datelike, NaiveDate};
use geojson::GeoJson;
use log::{debug, info, warn};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    io::Read,
    path::{Path, PathBuf},
    rc::Rc,
    str::FromStr,
};

/// FIPS code → dataset key for the 50 states.
pub const STATE_NAMES: [(RegionId, &str); 50] = [
    (1, "alabama"), (2, "alaska"), (4, "arizona"), (5, "arkansas"), (6, "california"),
    (8, "colorado"), (9, "connecticut"), (10, "delaware"), (12, "florida"), (13, "georgia"),
    (15, "hawaii"), (16, "idaho"), (17, "illinois"), (18, "indiana"), (19, "iowa"),
    (20, "kansas"), (21, "kentucky"), (22, "louisiana"), (23, "maine"), (24, "maryland"),
    (25, "massachusetts"), (26, "michigan"), (27, "minnesota"), (28, "mississippi"), (29, "missouri"),
    (30, "montana"), (31, "nebraska"), (32, "nevada"), (33, "new_hampshire"), (34, "new_jersey"),
    (35, "new_mexico"), (36, "new_york"), (37, "north_carolina"), (38, "north_dakota"), (39, "ohio"),
    (40, "oklahoma"), (41, "oregon"), (42, "pennsylvania"), (44, "rhode_island"), (45, "south_carolina"),
    (46, "south_dakota"), (47, "tennessee"), (48, "texas"), (49, "utah"), (50, "vermont"),
    (51, "virginia"), (53, "washington"), (54, "west_virginia"), (55, "wisconsin"), (56, "wyoming"),
];

pub fn state_key(fips: RegionId) -> Option<&'static str> {
    STATE_NAMES.iter().find(|(code, _)| *code == fips).map(|(_, key)| *key)
}

/// `new_mexico` → `New Mexico`
pub fn display_name(key: &str) -> String {
    key.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One satellite fire detection.
#[derive(Clone, Debug, PartialEq)]
pub struct FireObservation {
    pub longitude: f64,
    pub latitude: f64,
    pub date: NaiveDate,
    pub brightness: f64,
    pub frp: f64,
}

impl FireObservation {
    pub fn month(&self) -> Month {
        Month::new(self.date.month()).unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct DetailRow {
    latitude: String,
    longitude: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    brightness: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    frp: Option<f64>,
    acq_date: String,
}

/// Parses a per-state detail table. Rows that are short, not UTF-8, or carry
/// unreadable coordinates or dates are dropped; unreadable intensities count
/// as zero. Only a failing reader aborts the parse.
pub fn parse_observations<R: Read>(reader: R, context: &str) -> Result<Vec<FireObservation>, AtlasError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();
    let mut skipped = 0usize;

    for row in rdr.deserialize::<DetailRow>() {
        let row = match row {
            Ok(row) => row,
            Err(err) if err.is_io_error() => {
                return Err(AtlasError::Csv { context: context.to_string(), source: err });
            }
            Err(err) => {
                debug!("{context}: {err}");
                skipped += 1;
                continue;
            }
        };
        let parsed = (
            row.latitude.parse::<f64>(),
            row.longitude.parse::<f64>(),
            NaiveDate::parse_from_str(&row.acq_date, "%Y-%m-%d"),
        );
        match parsed {
            (Ok(latitude), Ok(longitude), Ok(date)) => out.push(FireObservation {
                longitude,
                latitude,
                date,
                brightness: row.brightness.unwrap_or(0.0),
                frp: row.frp.unwrap_or(0.0),
            }),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("{context}: skipped {skipped} unreadable detections");
    }
    Ok(out)
}

/// Totals for one state in one month.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MonthTotals {
    pub count: u64,
    pub brightness: f64,
    pub frp: f64,
}

#[derive(Deserialize)]
struct SummaryRow {
    state: String,
    month: u32,
    fire_count: u64,
    total_brightness: f64,
    total_frp: f64,
}

/// Nation-wide monthly totals keyed by state key.
#[derive(Clone, Debug, Default)]
pub struct NationalSummary {
    by_state: HashMap<String, [MonthTotals; 12]>,
}

impl NationalSummary {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AtlasError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| AtlasError::io(path, e))?;
        Self::from_reader(bytes.as_slice(), &path.display().to_string())
    }

    pub fn from_reader<R: Read>(reader: R, context: &str) -> Result<Self, AtlasError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut by_state: HashMap<String, [MonthTotals; 12]> = HashMap::new();

        for (line, row) in rdr.deserialize::<SummaryRow>().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(err) if err.is_io_error() => {
                    return Err(AtlasError::Csv { context: context.to_string(), source: err });
                }
                Err(err) => {
                    warn!("{context}: skipping row {}: {err}", line + 1);
                    continue;
                }
            };
            let Some(month) = Month::new(row.month) else {
                warn!("{context}: month {} out of range for {}", row.month, row.state);
                continue;
            };
            let slot = &mut by_state.entry(row.state.to_lowercase()).or_default()[month.index()];
            *slot = MonthTotals {
                count: row.fire_count,
                brightness: row.total_brightness,
                frp: row.total_frp,
            };
        }

        info!("{context}: monthly totals for {} states", by_state.len());
        Ok(Self { by_state })
    }

    /// Missing states or months read as zero.
    pub fn get(&self, state: &str, month: Month) -> MonthTotals {
        self.by_state
            .get(state)
            .map(|months| months[month.index()])
            .unwrap_or_default()
    }

    pub fn state_count(&self) -> usize {
        self.by_state.len()
    }
}

pub fn load_geojson<P: AsRef<Path>>(path: P) -> Result<GeoJson, AtlasError> {
    let path = path.as_ref();
    let txt = fs::read_to_string(path).map_err(|e| AtlasError::io(path, e))?;
    GeoJson::from_str(&txt).map_err(|e| AtlasError::GeoJson { path: path.to_path_buf(), source: Box::new(e) })
}

/// Where per-state detection tables come from.
pub trait DetailSource {
    fn fetch(&self, state_key: &str) -> Result<Vec<FireObservation>, AtlasError>;
}

/// Reads `{state_key}_{year}.csv` files from a directory.
pub struct CsvDirectory {
    base: PathBuf,
    year: i32,
}

impl CsvDirectory {
    pub fn new<P: AsRef<Path>>(base: P, year: i32) -> Self {
        Self { base: base.as_ref().to_path_buf(), year }
    }

    fn path_for(&self, state_key: &str) -> PathBuf {
        self.base.join(format!("{}_{}.csv", state_key, self.year))
    }
}

impl DetailSource for CsvDirectory {
    fn fetch(&self, state_key: &str) -> Result<Vec<FireObservation>, AtlasError> {
        let path = self.path_for(state_key);
        let bytes = fs::read(&path).map_err(|e| AtlasError::io(&path, e))?;
        parse_observations(bytes.as_slice(), &path.display().to_string())
    }
}

/// Per-state detections, fetched once and kept for the session.
pub struct DataCache {
    source: Box<dyn DetailSource>,
    observations: HashMap<String, Rc<[FireObservation]>>,
}

impl DataCache {
    pub fn new(source: Box<dyn DetailSource>) -> Self {
        Self { source, observations: HashMap::new() }
    }

    pub fn observations(&mut self, state_key: &str) -> Result<Rc<[FireObservation]>, AtlasError> {
        if let Some(hit) = self.observations.get(state_key) {
            debug!("{state_key}: {} detections from cache", hit.len());
            return Ok(Rc::clone(hit));
        }
        let fetched: Rc<[FireObservation]> = self
            .source
            .fetch(state_key)
            .map_err(|source| AtlasError::StateData { state: state_key.to_string(), source: Box::new(source) })?
            .into();
        info!("{state_key}: loaded {} detections", fetched.len());
        self.observations.insert(state_key.to_string(), Rc::clone(&fetched));
        Ok(fetched)
    }
}
