//! Assigns fire detections to the region that contains them and rolls the
//! matches up per month.

use crate::{
    data::FireObservation,
    month::Month,
    region::{Region, RegionId},
};
use log::{debug, info};
use std::{collections::HashMap, rc::Rc};

/// Fire count and summed radiative power for one region in one month.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MonthlyAggregate {
    pub count: u64,
    pub frp: f64,
}

impl MonthlyAggregate {
    fn add(&mut self, frp: f64) {
        self.count += 1;
        self.frp += frp.max(0.0);
    }
}

/// Result of one aggregation pass over a state's detections.
#[derive(Clone, Debug, Default)]
pub struct AggregateTable {
    by_region: HashMap<RegionId, [MonthlyAggregate; 12]>,
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Containment tests that could not be evaluated.
    pub faults: usize,
}

impl AggregateTable {
    /// Zero for regions outside the table.
    pub fn get(&self, region: RegionId, month: Month) -> MonthlyAggregate {
        self.by_region
            .get(&region)
            .map(|months| months[month.index()])
            .unwrap_or_default()
    }

    pub fn for_month(&self, month: Month) -> HashMap<RegionId, MonthlyAggregate> {
        self.by_region
            .iter()
            .map(|(id, months)| (*id, months[month.index()]))
            .collect()
    }

    pub fn region_count(&self) -> usize {
        self.by_region.len()
    }
}

/// First region (in slice order) whose boundary contains the point.
/// Boundaries that cannot be evaluated are skipped and tallied in `faults`.
pub fn locate<'a>(regions: &'a [Rc<Region>], lon: f64, lat: f64, faults: &mut usize) -> Option<&'a Rc<Region>> {
    regions.iter().find(|region| match region.try_contains(lon, lat) {
        Ok(inside) => inside,
        Err(_) => {
            *faults += 1;
            false
        }
    })
}

/// Scans every observation against the regions in order; the first
/// containing region takes it. Unmatched detections only feed the counter.
pub fn aggregate(observations: &[FireObservation], regions: &[Rc<Region>]) -> AggregateTable {
    let mut table = AggregateTable {
        by_region: regions.iter().map(|r| (r.id, [MonthlyAggregate::default(); 12])).collect(),
        total: observations.len(),
        ..AggregateTable::default()
    };

    for fire in observations {
        match locate(regions, fire.longitude, fire.latitude, &mut table.faults) {
            Some(region) => {
                if let Some(months) = table.by_region.get_mut(&region.id) {
                    months[fire.month().index()].add(fire.frp);
                }
                table.matched += 1;
            }
            None => table.unmatched += 1,
        }
    }

    if table.faults > 0 {
        debug!("{} containment tests skipped on malformed boundaries", table.faults);
    }
    info!(
        "aggregated {} detections over {} regions: {} matched, {} unmatched",
        table.total,
        regions.len(),
        table.matched,
        table.unmatched
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use geo::{LineString, Polygon};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn square(id: RegionId, x0: f64, y0: f64, x1: f64, y1: f64) -> Rc<Region> {
        let ring = LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]);
        Rc::new(Region::new(id, format!("r{id}"), Polygon::new(ring, vec![]).into()))
    }

    fn fire(lon: f64, lat: f64, month: u32, frp: f64) -> FireObservation {
        FireObservation {
            longitude: lon,
            latitude: lat,
            date: NaiveDate::from_ymd_opt(2024, month, 10).unwrap(),
            brightness: 300.0,
            frp,
        }
    }

    #[test]
    fn point_outside_every_county_is_unmatched() {
        let counties = vec![square(48001, -100.0, 30.0, -99.0, 31.0)];
        let table = aggregate(&[fire(-105.0, 40.0, 5, 3.0)], &counties);
        assert_eq!(table.unmatched, 1);
        assert_eq!(table.matched, 0);
        assert_eq!(table.get(48001, Month::MAY).count, 0);
        assert_eq!(table.get(48001, Month::MAY).frp, 0.0);
    }

    #[test]
    fn sums_count_and_frp_per_month() {
        let counties = vec![square(1, 0.0, 0.0, 1.0, 1.0), square(2, 1.0, 0.0, 2.0, 1.0)];
        let fires = [
            fire(0.5, 0.5, 7, 10.0),
            fire(0.2, 0.3, 7, 2.5),
            fire(0.2, 0.3, 8, 1.0),
            fire(1.5, 0.5, 7, 4.0),
        ];
        let table = aggregate(&fires, &counties);
        assert_eq!(table.get(1, Month::JULY), MonthlyAggregate { count: 2, frp: 12.5 });
        assert_eq!(table.get(1, Month::AUGUST).count, 1);
        assert_eq!(table.get(2, Month::JULY).count, 1);
        assert_eq!(table.get(2, Month::JANUARY), MonthlyAggregate::default());
        assert_eq!(table.region_count(), 2);
        assert_eq!(table.for_month(Month::JULY)[&2].frp, 4.0);
    }

    #[test]
    fn first_containing_region_wins_on_overlap() {
        let counties = vec![square(10, 0.0, 0.0, 2.0, 2.0), square(20, 1.0, 1.0, 3.0, 3.0)];
        let table = aggregate(&[fire(1.5, 1.5, 1, 1.0)], &counties);
        assert_eq!(table.get(10, Month::JANUARY).count, 1);
        assert_eq!(table.get(20, Month::JANUARY).count, 0);
    }

    #[test]
    fn malformed_boundary_does_not_stop_the_scan() {
        let broken = Rc::new(Region::new(
            5,
            "broken",
            Polygon::new(LineString::from(vec![(0.0, 0.0), (f64::NAN, 1.0), (1.0, 1.0), (0.0, 0.0)]), vec![]).into(),
        ));
        let counties = vec![broken, square(6, 0.0, 0.0, 1.0, 1.0)];
        let table = aggregate(&[fire(0.5, 0.5, 2, 1.0), fire(0.6, 0.4, 2, 1.0)], &counties);
        assert_eq!(table.faults, 2);
        assert_eq!(table.get(6, Month::FEBRUARY).count, 2);
        assert_eq!(table.get(5, Month::FEBRUARY).count, 0);
    }

    #[test]
    fn every_detection_is_matched_or_unmatched() {
        let mut rng = StdRng::seed_from_u64(2024);
        for grid in 1..=4 {
            let counties: Vec<_> = (0..grid * grid)
                .map(|i| {
                    let (x, y) = ((i % grid) as f64, (i / grid) as f64);
                    square(i as RegionId, x, y, x + 1.0, y + 1.0)
                })
                .collect();
            let n = rng.random_range(0..400);
            let fires: Vec<_> = (0..n)
                .map(|_| {
                    fire(
                        rng.random_range(-1.0..grid as f64 + 1.0),
                        rng.random_range(-1.0..grid as f64 + 1.0),
                        rng.random_range(1..=12),
                        rng.random_range(0.0..50.0),
                    )
                })
                .collect();

            let table = aggregate(&fires, &counties);
            let per_region: u64 = Month::all()
                .flat_map(|m| counties.iter().map(move |c| (c.id, m)))
                .map(|(id, m)| table.get(id, m).count)
                .sum();
            assert_eq!(per_region as usize + table.unmatched, n);
            assert_eq!(table.matched + table.unmatched, table.total);
        }
    }
}
