use crate::{
    config::AtlasConfig,
    data::{CsvDirectory, DataCache, NationalSummary, STATE_NAMES, display_name, load_geojson},
    error::AtlasError,
    map_draw::{MapEvent, MapView, Pointer},
    palette::Metric,
    presentation::{Narration, PresentationHost, ViewAction},
    region::{RegionId, regions_from_geojson},
    view::{Geometry, ViewController},
};
use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use log::info;
use ratatui::layout::Rect;
use tokio::time::Instant;

/// What the event loop should do after a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Quit,
    TogglePresentation,
    Continue,
    Nothing,
}

pub struct AppState {
    pub view: ViewController,
    pub list_items: Vec<(RegionId, String)>,
    pub selected: usize,
    pub narration: Option<Narration>,
    pub continue_prompt: bool,
    pub metric: Metric,
    /// Map area from the last frame, for mouse hit-testing.
    pub map_area: Rect,
}

impl AppState {
    pub const HELP_TEXT: &'static str = "\
↑/↓: choose state   Enter/click: drill down
←/→: month   Esc/Backspace: back to US
m: FRP/count   p: start/stop tour
Space: continue tour   q: quit";

    /// Loads geometry and the national summary. Any failure here leaves
    /// nothing to draw.
    pub fn new(config: &AtlasConfig) -> Result<Self, AtlasError> {
        let states = regions_from_geojson(load_geojson(config.states_path())?);
        let counties = regions_from_geojson(load_geojson(config.counties_path())?);
        let summary = NationalSummary::load(config.summary_path())?;
        info!("loaded {} states, {} counties", states.len(), counties.len());

        let cache = DataCache::new(Box::new(CsvDirectory::new(config.state_data_path(), config.year)));
        Self::with_view(ViewController::new(Geometry { states, counties }, summary, cache, config.start_month())?, config.metric)
    }

    pub fn with_view(mut view: ViewController, metric: Metric) -> Result<Self, AtlasError> {
        view.set_metric(metric);
        let mut list_items: Vec<(RegionId, String)> = STATE_NAMES
            .iter()
            .filter(|(fips, _)| view.states().iter().any(|s| s.id == *fips))
            .map(|(fips, key)| (*fips, display_name(key)))
            .collect();
        list_items.sort_by(|a, b| a.1.cmp(&b.1));

        Ok(Self {
            view,
            list_items,
            selected: 0,
            narration: None,
            continue_prompt: false,
            metric,
            map_area: Rect::default(),
        })
    }

    pub fn selected_state(&self) -> Option<RegionId> {
        self.list_items.get(self.selected).map(|(fips, _)| *fips)
    }

    fn hover_selected(&mut self, explore: bool) {
        if let Some(fips) = self.selected_state() {
            self.view.handle_event(MapEvent::RegionHovered(fips), explore);
        }
    }

    /// `explore` is the tour's first-run gate for free exploration.
    pub fn handle_input(&mut self, key: KeyCode, explore: bool) -> Intent {
        use KeyCode::*;
        match key {
            Char('q') => return Intent::Quit,
            Char('p') => return Intent::TogglePresentation,
            Char(' ') | Char('c') if self.continue_prompt => return Intent::Continue,
            Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                    self.hover_selected(explore);
                }
            }
            Down => {
                if self.selected + 1 < self.list_items.len() {
                    self.selected += 1;
                    self.hover_selected(explore);
                }
            }
            Enter => {
                if let Some(fips) = self.selected_state() {
                    self.view.handle_event(MapEvent::RegionClicked(fips), explore);
                }
            }
            Left => {
                self.view.step_month(-1, explore);
            }
            Right => {
                self.view.step_month(1, explore);
            }
            Backspace | Esc => {
                self.view.go_back(explore);
            }
            Char('m') => {
                self.metric = self.metric.toggled();
                self.view.set_metric(self.metric);
            }
            _ => {}
        }
        Intent::Nothing
    }

    pub fn handle_mouse(&mut self, event: MouseEvent, explore: bool) {
        let pointer = match event.kind {
            MouseEventKind::Moved => Pointer::Move,
            MouseEventKind::Down(MouseButton::Left) => Pointer::Click,
            _ => return,
        };
        let viewport = self.view.viewport(Instant::now());
        let Some((lon, lat)) = viewport.to_geo(MapView::inner(self.map_area), event.column, event.row) else {
            self.view.handle_event(MapEvent::HoverCleared, explore);
            return;
        };
        let map_event = self.view.map().event_at(pointer, lon, lat);
        if let MapEvent::RegionClicked(fips) | MapEvent::RegionHovered(fips) = map_event {
            if let Some(pos) = self.list_items.iter().position(|(id, _)| *id == fips) {
                self.selected = pos;
            }
        }
        self.view.handle_event(map_event, explore);
    }
}

impl PresentationHost for AppState {
    fn perform(&mut self, action: ViewAction) -> Result<(), AtlasError> {
        match action {
            ViewAction::National(month) => self.view.show_national(month),
            ViewAction::Drill { fips, state, month } => {
                self.view.show_state(fips, state)?;
                self.view.set_month(month);
            }
            ViewAction::Month(month) => self.view.set_month(month),
        }
        Ok(())
    }

    fn narrate(&mut self, narration: &Narration) {
        self.narration = Some(*narration);
    }

    fn hide_narration(&mut self) {
        self.narration = None;
    }

    fn set_locked(&mut self, locked: bool) {
        self.view.set_locked(locked);
    }

    fn offer_continue(&mut self) -> bool {
        self.continue_prompt = true;
        true
    }

    fn withdraw_continue(&mut self) {
        self.continue_prompt = false;
    }

    fn preload(&mut self, _fips: u32, state: &str) -> Result<(), AtlasError> {
        self.view.preload(state)
    }
}
