use crate::{
    data::display_name,
    month::Month,
    palette::{Bucket, Scale},
    presentation::{EngineState, Narration, PresentationEngine},
    state::AppState,
    view::{NoticeLevel, ViewMode},
};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};
use tokio::time::Instant;

const BUCKETS: [Bucket; 6] = [Bucket::Quiet, Bucket::Trace, Bucket::Low, Bucket::Moderate, Bucket::High, Bucket::Extreme];

pub fn draw(f: &mut Frame<'_>, state: &mut AppState, tour: &PresentationEngine) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(20), Constraint::Percentage(55), Constraint::Percentage(25)])
        .split(f.area());

    draw_state_list(f, state, chunks[0]);

    let center = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(chunks[1]);
    draw_map(f, state, center[0]);
    draw_month_strip(f, state.view.month(), center[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(40), Constraint::Percentage(25)])
        .split(chunks[2]);
    draw_info(f, state, tour, right[0]);
    draw_narration(f, state, right[1]);
    draw_diagnostics(f, state, right[2]);
}

fn draw_state_list(f: &mut Frame<'_>, state: &AppState, area: Rect) {
    let items: Vec<ListItem> = state.list_items.iter().map(|(_, name)| ListItem::new(name.as_str())).collect();
    let mut list_state = ListState::default();
    list_state.select(Some(state.selected));
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("States"))
        .highlight_symbol(">> ")
        .highlight_style(Style::default().fg(Color::Red));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_map(f: &mut Frame<'_>, state: &mut AppState, area: Rect) {
    state.map_area = area;
    let view = &state.view;
    let metric = view.map().metric();
    let (title, highlight) = match view.mode() {
        ViewMode::National => (
            format!("United States, {} ({})", view.month(), metric.label()),
            view.hovered().or_else(|| state.selected_state()),
        ),
        ViewMode::State { key, .. } => (format!("{}, {} ({})", display_name(key), view.month(), metric.label()), view.hovered()),
    };
    view.map().render(f, area, &title, view.viewport(Instant::now()), highlight);
}

fn draw_month_strip(f: &mut Frame<'_>, month: Month, area: Rect) {
    let tabs = Tabs::new(Month::all().map(Month::label).collect::<Vec<_>>())
        .block(Block::default().borders(Borders::ALL).title("Month"))
        .select(month.index())
        .highlight_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, area);
}

fn draw_info(f: &mut Frame<'_>, state: &AppState, tour: &PresentationEngine, area: Rect) {
    let view = &state.view;
    let mut lines: Vec<Line> = Vec::new();

    if let Some(msg) = view.loading() {
        lines.push(Line::styled(msg.to_string(), Style::default().fg(Color::Yellow)));
    }
    match view.tooltip() {
        Some(tip) => {
            let [name, fires, frp] = tip.lines();
            lines.push(Line::styled(name, Style::default().add_modifier(Modifier::BOLD)));
            lines.push(Line::from(fires));
            lines.push(Line::from(frp));
        }
        None if view.is_locked() => lines.push(Line::from("Map is following the tour")),
        None => lines.push(Line::from("Hover or select a state")),
    }
    if let Some(notice) = view.notice() {
        let color = match notice.level {
            NoticeLevel::Info => Color::Green,
            NoticeLevel::Error => Color::Red,
        };
        lines.push(Line::styled(notice.text.clone(), Style::default().fg(color)));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(match (tour.state(), tour.current_step()) {
        (EngineState::Running, Some(step)) => format!("Tour: step {} of {}", step + 1, tour.script_len()),
        (EngineState::Running, None) => "Tour: preparing".to_string(),
        (EngineState::Completed, _) => "Tour: finished (p to replay)".to_string(),
        (EngineState::Idle, _) => "Tour: p to start".to_string(),
    }));
    lines.extend(AppState::HELP_TEXT.lines().map(|l| Line::styled(l, Style::default().fg(Color::DarkGray))));

    let info = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Info"))
        .wrap(Wrap { trim: true });
    f.render_widget(info, area);
}

fn draw_narration(f: &mut Frame<'_>, state: &AppState, area: Rect) {
    let Some(narration) = &state.narration else {
        let idle = Paragraph::new("")
            .block(Block::default().borders(Borders::ALL).title("Narration"));
        f.render_widget(idle, area);
        return;
    };
    let mut lines = narration_lines(narration, state.view.map().metric().state_scale());
    if state.continue_prompt {
        lines.push(Line::from(""));
        lines.push(Line::styled("[Space] Continue", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    }
    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(narration.title))
        .wrap(Wrap { trim: true });
    f.render_widget(panel, area);
}

fn narration_lines(narration: &Narration, scale: Scale) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = narration.body.split('\n').map(|l| Line::from(squash(l))).collect();
    match narration.image {
        Some("frp-legend") => {
            lines.push(Line::from(""));
            lines.extend(legend(scale));
        }
        Some(other) => lines.push(Line::styled(format!("[{other}]"), Style::default().fg(Color::DarkGray))),
        None => {}
    }
    lines
}

/// Collapses whitespace runs within one paragraph.
fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn legend(scale: Scale) -> Vec<Line<'static>> {
    let limits = scale.limits();
    BUCKETS
        .iter()
        .enumerate()
        .map(|(i, bucket)| {
            let range = match i {
                0 => "none".to_string(),
                1 => format!("up to {}", limits[0]),
                5 => format!("over {}", limits[3]),
                _ => format!("{} to {}", limits[i - 2], limits[i - 1]),
            };
            Line::from(vec![Span::styled("██ ", Style::default().fg(bucket.color())), Span::raw(range)])
        })
        .collect()
}

fn draw_diagnostics(f: &mut Frame<'_>, state: &AppState, area: Rect) {
    let view = &state.view;
    let text = match view.diagnostics() {
        Some(d) => format!(
            "Detections: {}\nIn a county: {}\nOutside all counties: {}\nBoundary errors: {}\nCounties: {}",
            d.fires, d.matched, d.unmatched, d.faults, d.counties
        ),
        None => {
            let scale = view.map().metric().state_scale();
            let mut lines = vec![Line::from(format!("States with data: {}", view.summary().state_count()))];
            lines.extend(legend(scale));
            let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Diagnostics"));
            f.render_widget(panel, area);
            return;
        }
    };
    let panel = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Diagnostics"))
        .wrap(Wrap { trim: true });
    f.render_widget(panel, area);
}
