use crate::{month::Month, region::RegionId};
use std::time::Duration;

/// Text shown beside the map while a step runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Narration {
    pub title: &'static str,
    pub body: &'static str,
    pub image: Option<&'static str>,
}

/// Primitive map changes the tour asks the host for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewAction {
    National(Month),
    Drill { fips: RegionId, state: &'static str, month: Month },
    Month(Month),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepAction {
    Narrate,
    View(ViewAction),
    /// Steps through `from..=to`, redrawing each month then pausing `every`.
    Sweep { from: Month, to: Month, every: Duration },
}

/// How a step hands over to the next one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    After(Duration),
    OnContinue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub narration: Narration,
    pub action: StepAction,
    pub advance: Advance,
}

const fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

const fn step(title: &'static str, body: &'static str, action: StepAction, advance: Advance) -> Step {
    Step { narration: Narration { title, body, image: None }, action, advance }
}

const fn drill(fips: RegionId, state: &'static str) -> StepAction {
    StepAction::View(ViewAction::Drill { fips, state, month: Month::JUNE })
}

const YEAR: StepAction = StepAction::Sweep { from: Month::JANUARY, to: Month::DECEMBER, every: ms(350) };
const BACK: StepAction = StepAction::View(ViewAction::National(Month::JANUARY));

/// The guided tour: a national overview, then California, Oregon and Texas
/// county by county through the year.
pub const TOUR: &[Step] = &[
    Step {
        narration: Narration {
            title: "Wildfires across the US, 2024",
            body: "Satellites logged every active fire they detected in 2024. This tour \
                   follows that record from the national picture down to three states \
                   with very different fire seasons: California, Oregon and Texas.\n\n\
                   Colors show Fire Radiative Power (FRP), the heat a fire gives off. \
                   Darker means more intense burning.",
            image: Some("frp-legend"),
        },
        action: StepAction::Narrate,
        advance: Advance::OnContinue,
    },
    step(
        "The national picture",
        "Each state is shaded by its total FRP for the month on the slider. \
         Some regions stay hot through the year while others barely register.",
        StepAction::View(ViewAction::National(Month::JANUARY)),
        Advance::After(ms(1500)),
    ),
    step(
        "California",
        "Zooming into California's counties. Its dry summers and dense \
         wildland-urban edge make it the reference case for western fire.",
        drill(6, "california"),
        Advance::After(ms(2000)),
    ),
    step(
        "California month by month",
        "Watch activity build through summer and peak as vegetation dries out \
         in late summer and fall.",
        YEAR,
        Advance::OnContinue,
    ),
    step(
        "Back to the nation",
        "California's fires cluster in a handful of counties. Next stop is Oregon.",
        BACK,
        Advance::After(ms(1500)),
    ),
    step(
        "Oregon",
        "Oregon's fire activity concentrates in its forested interior, east of \
         the Cascades.",
        drill(41, "oregon"),
        Advance::After(ms(2000)),
    ),
    step(
        "Oregon month by month",
        "Compare the timing with California: a shorter, sharper season.",
        YEAR,
        Advance::OnContinue,
    ),
    step(
        "Back to the nation",
        "Last stop is Texas, where grassland and agricultural burning change the \
         pattern entirely.",
        BACK,
        Advance::After(ms(1500)),
    ),
    step(
        "Texas",
        "Texas spreads its detections over many counties and several climate zones.",
        drill(48, "texas"),
        Advance::After(ms(2000)),
    ),
    step(
        "Texas month by month",
        "Peaks here arrive at different times in different parts of the state, \
         with notable activity outside the summer months.",
        YEAR,
        Advance::OnContinue,
    ),
    step(
        "Wrapping up",
        "Three states, three fire regimes shaped by geography, climate and land use. \
         The map is yours now: click a state to explore it.",
        BACK,
        Advance::After(ms(1500)),
    ),
];

/// States the script drills into, in first-visit order.
pub fn drilled_states(script: &[Step]) -> Vec<(RegionId, &'static str)> {
    let mut seen = Vec::new();
    for s in script {
        if let StepAction::View(ViewAction::Drill { fips, state, .. }) = s.action {
            if !seen.iter().any(|(f, _)| *f == fips) {
                seen.push((fips, state));
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::state_key;

    #[test]
    fn drills_match_state_table() {
        let drilled = drilled_states(TOUR);
        assert_eq!(drilled, vec![(6, "california"), (41, "oregon"), (48, "texas")]);
        for (fips, key) in drilled {
            assert_eq!(state_key(fips), Some(key));
        }
    }

    #[test]
    fn every_drill_is_followed_by_a_sweep_and_a_return() {
        let drills: Vec<usize> = TOUR
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s.action, StepAction::View(ViewAction::Drill { .. })))
            .map(|(i, _)| i)
            .collect();
        for i in drills {
            assert!(matches!(TOUR[i + 1].action, StepAction::Sweep { .. }));
            assert_eq!(TOUR[i + 2].action, BACK);
        }
    }

    #[test]
    fn tour_opens_and_closes_nationally() {
        assert_eq!(TOUR[0].advance, Advance::OnContinue);
        assert_eq!(TOUR.last().map(|s| s.action), Some(BACK));
    }
}
