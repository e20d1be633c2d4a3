//! Owns what the map is showing (national or one state, which month) and
//! turns user input and tour actions into renderer calls.

use crate::{
    data::{DataCache, NationalSummary, display_name, state_key},
    error::AtlasError,
    map_draw::{MapEvent, MapView, Tooltip},
    matcher::{AggregateTable, MonthlyAggregate, aggregate},
    month::Month,
    palette::Metric,
    region::{Region, RegionId, bounds_of},
    viewport::{Camera, Viewport},
};
use log::{info, warn};
use std::{collections::HashMap, rc::Rc};
use tokio::time::Instant;

/// Share of the window the framed regions should cover.
const FRAME_FILL: f64 = 0.75;
/// Drawn but left out of national framing.
const NON_CONTIGUOUS: [RegionId; 2] = [2, 15];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewMode {
    National,
    State { fips: RegionId, key: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Message shown to the user until the next one replaces it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// Counters from the most recent aggregation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub fires: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub faults: usize,
    pub counties: usize,
}

/// State and county boundaries for the session.
pub struct Geometry {
    pub states: Vec<Rc<Region>>,
    pub counties: Vec<Rc<Region>>,
}

pub struct ViewController {
    geometry: Geometry,
    summary: NationalSummary,
    cache: DataCache,
    map: MapView,
    mode: ViewMode,
    month: Month,
    state_counties: Vec<Rc<Region>>,
    aggregates: Option<AggregateTable>,
    diagnostics: Option<Diagnostics>,
    locked: bool,
    loading: Option<String>,
    hovered: Option<RegionId>,
    notice: Option<Notice>,
    national_frame: Viewport,
    camera: Camera,
}

impl ViewController {
    pub fn new(geometry: Geometry, summary: NationalSummary, cache: DataCache, month: Month) -> Result<Self, AtlasError> {
        let framed = geometry.states.iter().filter(|s| !NON_CONTIGUOUS.contains(&s.id));
        let bounds = bounds_of(framed)
            .or_else(|| bounds_of(&geometry.states))
            .ok_or(AtlasError::NoStates)?;
        let national_frame = Viewport::framing(bounds, FRAME_FILL);

        let mut view = Self {
            geometry,
            summary,
            cache,
            map: MapView::new(),
            mode: ViewMode::National,
            month,
            state_counties: Vec::new(),
            aggregates: None,
            diagnostics: None,
            locked: false,
            loading: None,
            hovered: None,
            notice: None,
            national_frame,
            camera: Camera::still(national_frame),
        };
        view.show_national(month);
        Ok(view)
    }

    fn national_values(&self, month: Month) -> HashMap<RegionId, MonthlyAggregate> {
        self.geometry
            .states
            .iter()
            .filter_map(|s| {
                let key = state_key(s.id)?;
                let totals = self.summary.get(key, month);
                Some((s.id, MonthlyAggregate { count: totals.count, frp: totals.frp }))
            })
            .collect()
    }

    fn redraw(&mut self) {
        match &self.mode {
            ViewMode::National => {
                let values = self.national_values(self.month);
                self.map.render_national(&self.geometry.states, &values, self.month);
            }
            ViewMode::State { .. } => {
                let values = self
                    .aggregates
                    .as_ref()
                    .map(|t| t.for_month(self.month))
                    .unwrap_or_default();
                self.map.render_counties(&self.state_counties, &values, self.month);
            }
        }
    }

    /// Draws every state for `month`, restores full interactivity and drops
    /// the aggregates of any previously selected state.
    pub fn show_national(&mut self, month: Month) {
        self.mode = ViewMode::National;
        self.month = month;
        self.aggregates = None;
        self.diagnostics = None;
        self.state_counties.clear();
        self.hovered = None;
        self.map.clear_counties();
        self.redraw();
        self.map.thaw();
        self.camera.fly_to(self.national_frame);
    }

    /// Drills into one state's counties. On failure the previous view stays
    /// as it was and the reason is kept as a notice.
    pub fn show_state(&mut self, fips: RegionId, key: &str) -> Result<(), AtlasError> {
        let label = display_name(key);
        self.loading = Some(format!("Loading {label}..."));
        let result = self.try_show_state(fips, key, &label);
        self.loading = None;
        match &result {
            Ok(()) => {
                self.notice = Some(Notice { level: NoticeLevel::Info, text: format!("Showing {label}") });
                info!("drilled into {label} ({fips:02})");
            }
            Err(err) => {
                warn!("drill-down into {label} failed: {err}");
                self.notice = Some(Notice { level: NoticeLevel::Error, text: format!("Failed to load {label}: {err}") });
            }
        }
        result
    }

    fn try_show_state(&mut self, fips: RegionId, key: &str, label: &str) -> Result<(), AtlasError> {
        let counties: Vec<Rc<Region>> = self
            .geometry
            .counties
            .iter()
            .filter(|c| c.parent_state() == fips)
            .cloned()
            .collect();
        if counties.is_empty() {
            return Err(AtlasError::NoSubRegions(label.to_string()));
        }
        let observations = self.cache.observations(key)?;

        let table = aggregate(&observations, &counties);
        self.diagnostics = Some(Diagnostics {
            fires: table.total,
            matched: table.matched,
            unmatched: table.unmatched,
            faults: table.faults,
            counties: table.region_count(),
        });

        self.mode = ViewMode::State { fips, key: key.to_string() };
        self.hovered = None;
        self.map.freeze_except(fips);
        self.aggregates = Some(table);
        self.state_counties = counties;
        self.redraw();
        if let Some(bounds) = bounds_of(&self.state_counties) {
            self.camera.fly_to(Viewport::framing(bounds, FRAME_FILL));
        }
        Ok(())
    }

    /// Re-renders the current scope from data already in memory.
    pub fn set_month(&mut self, month: Month) {
        self.month = month;
        self.redraw();
    }

    pub fn set_metric(&mut self, metric: Metric) {
        self.map.set_metric(metric);
        let values = self.national_values(self.month);
        self.map.render_national(&self.geometry.states, &values, self.month);
        if let ViewMode::State { fips, .. } = self.mode {
            self.map.freeze_except(fips);
            self.redraw();
        }
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
        if locked {
            self.hovered = None;
        }
    }

    /// Whether direct interaction is currently honored. `explore` is the
    /// tour's first-run gate.
    pub fn accepts_input(&self, explore: bool) -> bool {
        !self.locked && explore && self.loading.is_none()
    }

    pub fn can_go_back(&self, explore: bool) -> bool {
        self.accepts_input(explore) && self.mode != ViewMode::National
    }

    pub fn go_back(&mut self, explore: bool) -> bool {
        if !self.can_go_back(explore) {
            return false;
        }
        self.show_national(self.month);
        true
    }

    /// Month slider input.
    pub fn step_month(&mut self, delta: i32, explore: bool) -> bool {
        if !self.accepts_input(explore) {
            return false;
        }
        let next = self.month.offset(delta);
        if next != self.month {
            self.set_month(next);
        }
        true
    }

    pub fn handle_event(&mut self, event: MapEvent, explore: bool) {
        if self.locked {
            return;
        }
        match event {
            MapEvent::RegionHovered(id) => self.hovered = Some(id),
            MapEvent::HoverCleared => self.hovered = None,
            MapEvent::RegionClicked(id) => {
                if self.mode != ViewMode::National || !self.accepts_input(explore) {
                    return;
                }
                let Some(key) = state_key(id) else {
                    return;
                };
                // Failure is recorded in the notice.
                let _ = self.show_state(id, key);
            }
        }
    }

    pub fn tooltip(&self) -> Option<Tooltip> {
        self.hovered.and_then(|id| self.map.tooltip(id))
    }

    pub fn preload(&mut self, key: &str) -> Result<(), AtlasError> {
        self.cache.observations(key).map(|_| ())
    }

    pub fn viewport(&self, now: Instant) -> Viewport {
        self.camera.at(now)
    }

    /// True while a pan/zoom transition is still playing.
    pub fn is_animating(&self, now: Instant) -> bool {
        self.camera.is_moving(now)
    }

    pub fn mode(&self) -> &ViewMode {
        &self.mode
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn states(&self) -> &[Rc<Region>] {
        &self.geometry.states
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn loading(&self) -> Option<&str> {
        self.loading.as_deref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn diagnostics(&self) -> Option<Diagnostics> {
        self.diagnostics
    }

    pub fn hovered(&self) -> Option<RegionId> {
        self.hovered
    }

    pub fn summary(&self) -> &NationalSummary {
        &self.summary
    }
}
