use crate::{
    matcher::MonthlyAggregate,
    month::Month,
    palette::{Bucket, Metric, Scale},
    region::{Region, RegionId},
    viewport::Viewport,
};
use ratatui::{
    Frame,
    layout::{Margin, Rect as TuiRect},
    style::Color,
    symbols::Marker,
    widgets::{
        Block, Borders,
        canvas::{Canvas, Context, Line, Points},
    },
};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// Typed pointer events raised by the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapEvent {
    RegionHovered(RegionId),
    HoverCleared,
    RegionClicked(RegionId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pointer {
    Move,
    Click,
}

/// Hover payload for one region in the month on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
    pub name: String,
    pub fires: u64,
    pub frp: f64,
    pub month: Month,
}

impl Tooltip {
    pub fn lines(&self) -> [String; 3] {
        [
            self.name.clone(),
            format!("{} fires ({})", group_thousands(self.fires as f64, 0), self.month),
            format!("Total FRP: {} MW", group_thousands(self.frp, 1)),
        ]
    }
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let text = format!("{value:.decimals$}");
    let (int, frac) = text.split_once('.').map_or((text.as_str(), None), |(i, f)| (i, Some(f)));
    let (sign, digits) = int.strip_prefix('-').map_or(("", int), |d| ("-", d));
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// A region as currently drawn.
#[derive(Clone, Debug)]
pub struct RenderedRegion {
    pub region: Rc<Region>,
    pub stats: MonthlyAggregate,
    pub bucket: Bucket,
    pub interactive: bool,
    pub dimmed: bool,
}

struct FillRaster {
    key: (u64, [u64; 4], TuiRect),
    points: Vec<(Color, Vec<(f64, f64)>)>,
}

/// Choropleth layers for the national and county scopes.
#[derive(Default)]
pub struct MapView {
    national: Vec<RenderedRegion>,
    counties: Vec<RenderedRegion>,
    month: Month,
    metric: Metric,
    generation: u64,
    raster: RefCell<Option<FillRaster>>,
}

fn paint_layer(
    regions: &[Rc<Region>],
    values: &HashMap<RegionId, MonthlyAggregate>,
    metric: Metric,
    scale: Scale,
) -> Vec<RenderedRegion> {
    regions
        .iter()
        .map(|region| {
            let stats = values.get(&region.id).copied().unwrap_or_default();
            let value = match metric {
                Metric::Frp => stats.frp,
                Metric::Count => stats.count as f64,
            };
            RenderedRegion {
                region: Rc::clone(region),
                stats,
                bucket: scale.bucket(value),
                interactive: true,
                dimmed: false,
            }
        })
        .collect()
}

impl MapView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_metric(&mut self, metric: Metric) {
        self.metric = metric;
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn month(&self) -> Month {
        self.month
    }

    /// Replaces the state layer. Freezing from an earlier drill-down is dropped.
    pub fn render_national(
        &mut self,
        states: &[Rc<Region>],
        values: &HashMap<RegionId, MonthlyAggregate>,
        month: Month,
    ) {
        self.national = paint_layer(states, values, self.metric, self.metric.state_scale());
        self.month = month;
        self.generation += 1;
    }

    /// Replaces the county layer.
    pub fn render_counties(
        &mut self,
        counties: &[Rc<Region>],
        values: &HashMap<RegionId, MonthlyAggregate>,
        month: Month,
    ) {
        self.counties = paint_layer(counties, values, self.metric, self.metric.county_scale());
        self.month = month;
        self.generation += 1;
    }

    pub fn clear_counties(&mut self) {
        self.counties.clear();
        self.generation += 1;
    }

    /// Dims every state but `keep` and takes them out of hit-testing.
    pub fn freeze_except(&mut self, keep: RegionId) {
        for r in &mut self.national {
            let selected = r.region.id == keep;
            r.interactive = selected;
            r.dimmed = !selected;
        }
        self.generation += 1;
    }

    pub fn thaw(&mut self) {
        for r in &mut self.national {
            r.interactive = true;
            r.dimmed = false;
        }
        self.generation += 1;
    }

    pub fn national(&self) -> &[RenderedRegion] {
        &self.national
    }

    pub fn counties(&self) -> &[RenderedRegion] {
        &self.counties
    }

    pub fn region(&self, id: RegionId) -> Option<&RenderedRegion> {
        self.counties
            .iter()
            .chain(&self.national)
            .find(|r| r.region.id == id)
    }

    pub fn tooltip(&self, id: RegionId) -> Option<Tooltip> {
        let rendered = self.region(id)?;
        let name = if self.counties.iter().any(|c| c.region.id == id) {
            format!("{} County", rendered.region.name)
        } else {
            rendered.region.name.clone()
        };
        Some(Tooltip { name, fires: rendered.stats.count, frp: rendered.stats.frp, month: self.month })
    }

    /// Topmost interactive region under a point: counties first, then states.
    pub fn hit_test(&self, lon: f64, lat: f64) -> Option<&RenderedRegion> {
        self.counties
            .iter()
            .chain(&self.national)
            .filter(|r| r.interactive)
            .find(|r| r.region.try_contains(lon, lat).unwrap_or(false))
    }

    pub fn event_at(&self, pointer: Pointer, lon: f64, lat: f64) -> MapEvent {
        match (pointer, self.hit_test(lon, lat)) {
            (Pointer::Move, Some(r)) => MapEvent::RegionHovered(r.region.id),
            (Pointer::Click, Some(r)) => MapEvent::RegionClicked(r.region.id),
            (_, None) => MapEvent::HoverCleared,
        }
    }

    /// Inner drawing area of the bordered map block.
    pub fn inner(area: TuiRect) -> TuiRect {
        area.inner(Margin { horizontal: 1, vertical: 1 })
    }

    fn fill_for(&self, viewport: &Viewport, inner: TuiRect) -> Vec<(Color, Vec<(f64, f64)>)> {
        let bits = [viewport.x[0].to_bits(), viewport.x[1].to_bits(), viewport.y[0].to_bits(), viewport.y[1].to_bits()];
        let key = (self.generation, bits, inner);
        if let Some(cached) = self.raster.borrow().as_ref().filter(|r| r.key == key) {
            return cached.points.clone();
        }

        let mut by_bucket: HashMap<Bucket, Vec<(f64, f64)>> = HashMap::new();
        // Half-block marker: two samples per cell vertically.
        let (cols, rows) = (u32::from(inner.width), u32::from(inner.height) * 2);
        let dx = (viewport.x[1] - viewport.x[0]) / f64::from(cols.max(1));
        let dy = (viewport.y[1] - viewport.y[0]) / f64::from(rows.max(1));
        let layer = if self.counties.is_empty() { &self.national } else { &self.counties };
        for row in 0..rows {
            let lat = viewport.y[1] - (f64::from(row) + 0.5) * dy;
            for col in 0..cols {
                let lon = viewport.x[0] + (f64::from(col) + 0.5) * dx;
                if let Some(hit) = layer.iter().find(|r| r.region.try_contains(lon, lat).unwrap_or(false)) {
                    by_bucket.entry(hit.bucket).or_default().push((lon, lat));
                }
            }
        }

        let mut points: Vec<_> = by_bucket.into_iter().collect();
        points.sort_by_key(|(bucket, _)| *bucket);
        let points: Vec<(Color, Vec<(f64, f64)>)> = points.into_iter().map(|(b, p)| (b.color(), p)).collect();
        *self.raster.borrow_mut() = Some(FillRaster { key, points: points.clone() });
        points
    }

    /// Draws filled regions, then outlines, then the highlighted region.
    pub fn render(
        &self,
        f: &mut Frame<'_>,
        area: TuiRect,
        title: &str,
        viewport: Viewport,
        highlight: Option<RegionId>,
    ) {
        let fill = self.fill_for(&viewport, Self::inner(area));
        let canvas = Canvas::default()
            .block(Block::default().title(title.to_string()).borders(Borders::ALL))
            .marker(Marker::HalfBlock)
            .x_bounds(viewport.x)
            .y_bounds(viewport.y)
            .paint(|ctx| {
                for (color, coords) in &fill {
                    ctx.draw(&Points { coords: coords.as_slice(), color: *color });
                }
                ctx.layer();
                for r in &self.national {
                    let color = if r.dimmed { Color::DarkGray } else { Color::Gray };
                    outline(ctx, &r.region, color);
                }
                for r in &self.counties {
                    outline(ctx, &r.region, Color::Gray);
                }
                if let Some(id) = highlight {
                    if let Some(r) = self.region(id) {
                        outline(ctx, &r.region, Color::Red);
                    }
                }
            });
        f.render_widget(canvas, area);
    }
}

fn outline(ctx: &mut Context<'_>, region: &Region, color: Color) {
    for poly in &region.shape().0 {
        for ring in std::iter::once(poly.exterior()).chain(poly.interiors()) {
            for window in ring.0.windows(2) {
                let (a, b) = (window[0], window[1]);
                ctx.draw(&Line { x1: a.x, y1: a.y, x2: b.x, y2: b.y, color });
            }
        }
    }
}
