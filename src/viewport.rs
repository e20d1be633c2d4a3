use geo::Rect;
use ratatui::layout::Rect as TuiRect;
use std::time::Duration;
use tokio::time::Instant;

/// Visible lon/lat window of the map canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

impl Viewport {
    /// Frames `bounds` so it fills `fill` of the window, centered.
    pub fn framing(bounds: Rect<f64>, fill: f64) -> Self {
        let (min, max) = (bounds.min(), bounds.max());
        let half_w = ((max.x - min.x).max(1e-6) / fill) / 2.0;
        let half_h = ((max.y - min.y).max(1e-6) / fill) / 2.0;
        let (cx, cy) = ((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
        Self { x: [cx - half_w, cx + half_w], y: [cy - half_h, cy + half_h] }
    }

    pub fn lerp(a: Viewport, b: Viewport, t: f64) -> Viewport {
        let mix = |p: f64, q: f64| p + (q - p) * t;
        Viewport {
            x: [mix(a.x[0], b.x[0]), mix(a.x[1], b.x[1])],
            y: [mix(a.y[0], b.y[0]), mix(a.y[1], b.y[1])],
        }
    }

    /// Geographic position under a terminal cell inside `inner`.
    pub fn to_geo(&self, inner: TuiRect, column: u16, row: u16) -> Option<(f64, f64)> {
        if inner.width == 0 || inner.height == 0 || !inner.contains((column, row).into()) {
            return None;
        }
        let fx = (f64::from(column - inner.x) + 0.5) / f64::from(inner.width);
        let fy = (f64::from(row - inner.y) + 0.5) / f64::from(inner.height);
        Some((
            self.x[0] + fx * (self.x[1] - self.x[0]),
            self.y[1] - fy * (self.y[1] - self.y[0]),
        ))
    }
}

/// Eased pan/zoom between two viewports.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    from: Viewport,
    to: Viewport,
    started: Instant,
    duration: Duration,
}

impl Camera {
    pub const TRANSITION: Duration = Duration::from_millis(750);

    pub fn still(at: Viewport) -> Self {
        Self { from: at, to: at, started: Instant::now(), duration: Duration::ZERO }
    }

    /// Starts a transition from wherever the camera is right now.
    pub fn fly_to(&mut self, target: Viewport) {
        let now = Instant::now();
        self.from = self.at(now);
        self.to = target;
        self.started = now;
        self.duration = Self::TRANSITION;
    }

    pub fn at(&self, now: Instant) -> Viewport {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = (now.saturating_duration_since(self.started).as_secs_f64() / self.duration.as_secs_f64()).min(1.0);
        // ease in-out cubic
        let eased = if t < 0.5 { 4.0 * t * t * t } else { 1.0 - (-2.0 * t + 2.0).powi(3) / 2.0 };
        Viewport::lerp(self.from, self.to, eased)
    }

    pub fn is_moving(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) < self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    fn view(x0: f64, x1: f64, y0: f64, y1: f64) -> Viewport {
        Viewport { x: [x0, x1], y: [y0, y1] }
    }

    #[test]
    fn framing_pads_around_center() {
        let rect = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 3.0, y: 6.0 });
        let v = Viewport::framing(rect, 0.75);
        assert!((v.x[0] + 0.5).abs() < 1e-9 && (v.x[1] - 3.5).abs() < 1e-9);
        assert!((v.y[0] + 1.0).abs() < 1e-9 && (v.y[1] - 7.0).abs() < 1e-9);
    }

    #[test]
    fn cells_map_into_window() {
        let v = view(0.0, 10.0, 0.0, 10.0);
        let inner = TuiRect::new(1, 1, 10, 10);
        let (lon, lat) = v.to_geo(inner, 1, 1).unwrap();
        assert!((lon - 0.5).abs() < 1e-9 && (lat - 9.5).abs() < 1e-9);
        assert!(v.to_geo(inner, 0, 0).is_none());
        assert!(v.to_geo(inner, 11, 5).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn camera_settles_on_target() {
        let mut camera = Camera::still(view(0.0, 1.0, 0.0, 1.0));
        let target = view(10.0, 11.0, 10.0, 11.0);
        camera.fly_to(target);
        let start = Instant::now();
        assert!(camera.is_moving(start));
        let mid = camera.at(start + Duration::from_millis(375));
        assert!(mid.x[0] > 0.0 && mid.x[0] < 10.0);
        tokio::time::advance(Camera::TRANSITION).await;
        assert!(!camera.is_moving(Instant::now()));
        assert_eq!(camera.at(Instant::now()), target);
    }
}
