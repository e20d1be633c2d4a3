use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// Color class, ordered from coolest to hottest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Quiet,
    Trace,
    Low,
    Moderate,
    High,
    Extreme,
}

impl Bucket {
    pub fn color(self) -> Color {
        match self {
            Bucket::Quiet => Color::Rgb(0xff, 0xfa, 0xf5),
            Bucket::Trace => Color::Rgb(0xff, 0xeb, 0xd6),
            Bucket::Low => Color::Rgb(0xff, 0xc9, 0x99),
            Bucket::Moderate => Color::Rgb(0xff, 0x9c, 0x52),
            Bucket::High => Color::Rgb(0xf9, 0x73, 0x16),
            Bucket::Extreme => Color::Rgb(0xb5, 0x47, 0x00),
        }
    }
}

/// Step function from a value to a bucket. Limits are upper bounds,
/// inclusive, for Trace through High.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale {
    limits: [f64; 4],
}

impl Scale {
    pub const STATE_FRP: Scale = Scale { limits: [1_000.0, 10_000.0, 100_000.0, 500_000.0] };
    pub const COUNTY_FRP: Scale = Scale { limits: [50.0, 250.0, 1_000.0, 5_000.0] };
    pub const STATE_COUNT: Scale = Scale { limits: [50.0, 200.0, 500.0, 1_500.0] };
    pub const COUNTY_COUNT: Scale = Scale { limits: [5.0, 25.0, 100.0, 500.0] };

    pub fn bucket(&self, value: f64) -> Bucket {
        // NaN falls through to Quiet as well.
        if !(value > 0.0) {
            return Bucket::Quiet;
        }
        const ABOVE_ZERO: [Bucket; 4] = [Bucket::Trace, Bucket::Low, Bucket::Moderate, Bucket::High];
        ABOVE_ZERO
            .iter()
            .zip(self.limits)
            .find(|(_, limit)| value <= *limit)
            .map(|(bucket, _)| *bucket)
            .unwrap_or(Bucket::Extreme)
    }

    pub fn limits(&self) -> [f64; 4] {
        self.limits
    }
}

/// Which figure drives the fill color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Frp,
    Count,
}

impl Metric {
    pub fn toggled(self) -> Self {
        match self {
            Metric::Frp => Metric::Count,
            Metric::Count => Metric::Frp,
        }
    }

    pub fn state_scale(self) -> Scale {
        match self {
            Metric::Frp => Scale::STATE_FRP,
            Metric::Count => Scale::STATE_COUNT,
        }
    }

    pub fn county_scale(self) -> Scale {
        match self {
            Metric::Frp => Scale::COUNTY_FRP,
            Metric::Count => Scale::COUNTY_COUNT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Frp => "FRP",
            Metric::Count => "fire count",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALES: [Scale; 4] = [Scale::STATE_FRP, Scale::COUNTY_FRP, Scale::STATE_COUNT, Scale::COUNTY_COUNT];

    #[test]
    fn zero_and_missing_are_lightest() {
        for scale in SCALES {
            assert_eq!(scale.bucket(0.0), Bucket::Quiet);
            assert_eq!(scale.bucket(-3.0), Bucket::Quiet);
            assert_eq!(scale.bucket(f64::NAN), Bucket::Quiet);
        }
    }

    #[test]
    fn buckets_never_cool_as_values_grow() {
        let mut samples: Vec<f64> = vec![0.0, 0.5, 1.0];
        for scale in SCALES {
            for limit in scale.limits() {
                samples.extend([limit - 0.001, limit, limit + 0.001]);
            }
        }
        samples.extend((0..200).map(|i| 1.08f64.powi(i)));
        samples.sort_by(f64::total_cmp);

        for scale in SCALES {
            for pair in samples.windows(2) {
                assert!(scale.bucket(pair[0]) <= scale.bucket(pair[1]), "{scale:?} at {pair:?}");
            }
        }
    }

    #[test]
    fn limits_are_inclusive() {
        assert_eq!(Scale::STATE_FRP.bucket(4_400.0), Bucket::Low);
        assert_eq!(Scale::COUNTY_FRP.bucket(50.0), Bucket::Trace);
        assert_eq!(Scale::COUNTY_FRP.bucket(50.5), Bucket::Low);
        assert_eq!(Scale::STATE_COUNT.bucket(1_501.0), Bucket::Extreme);
    }

    #[test]
    fn metric_toggles() {
        assert_eq!(Metric::default().toggled(), Metric::Count);
        assert_eq!(Metric::Count.toggled(), Metric::Frp);
    }
}
