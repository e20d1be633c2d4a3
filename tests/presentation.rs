use fire_atlas::{
    error::AtlasError,
    month::Month,
    presentation::{Advance, EngineState, Narration, Pacing, PresentationEngine, PresentationHost, Step, StepAction, TOUR, ViewAction},
};
use std::{cell::RefCell, rc::Rc, time::Duration};
use tokio::{task::LocalSet, time::Instant};

#[derive(Clone, Debug, PartialEq)]
enum Call {
    Locked(bool),
    Preload(String),
    Narrate(&'static str),
    Perform(ViewAction),
    Offer,
    Withdraw,
    Hide,
}

struct Recorder {
    calls: Vec<Call>,
    can_prompt: bool,
    fail_drills: bool,
}

impl Recorder {
    fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self { calls: Vec::new(), can_prompt: true, fail_drills: false }))
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl PresentationHost for Recorder {
    fn perform(&mut self, action: ViewAction) -> Result<(), AtlasError> {
        self.calls.push(Call::Perform(action));
        match action {
            ViewAction::Drill { state, .. } if self.fail_drills => Err(AtlasError::NoSubRegions(state.to_string())),
            _ => Ok(()),
        }
    }

    fn narrate(&mut self, narration: &Narration) {
        self.calls.push(Call::Narrate(narration.title));
    }

    fn hide_narration(&mut self) {
        self.calls.push(Call::Hide);
    }

    fn set_locked(&mut self, locked: bool) {
        self.calls.push(Call::Locked(locked));
    }

    fn offer_continue(&mut self) -> bool {
        if self.can_prompt {
            self.calls.push(Call::Offer);
        }
        self.can_prompt
    }

    fn withdraw_continue(&mut self) {
        self.calls.push(Call::Withdraw);
    }

    fn preload(&mut self, _fips: u32, state: &str) -> Result<(), AtlasError> {
        self.calls.push(Call::Preload(state.to_string()));
        Ok(())
    }
}

fn step(title: &'static str, action: StepAction, advance: Advance) -> Step {
    Step { narration: Narration { title, body: "", image: None }, action, advance }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Lets local tasks run without moving the paused clock.
async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

fn three_steps() -> Vec<Step> {
    vec![
        step("one", StepAction::View(ViewAction::National(Month::JANUARY)), Advance::After(ms(100))),
        step(
            "two",
            StepAction::View(ViewAction::Drill { fips: 6, state: "california", month: Month::JUNE }),
            Advance::After(ms(100)),
        ),
        step("three", StepAction::Narrate, Advance::After(ms(100))),
    ]
}

#[tokio::test(start_paused = true)]
async fn steps_run_in_order_and_lock_is_released() {
    LocalSet::new()
        .run_until(async {
            let host = Recorder::new();
            let engine = PresentationEngine::new(three_steps(), Pacing::default());
            assert!(engine.start(Rc::clone(&host)));
            tokio::time::sleep(Duration::from_secs(1)).await;

            assert_eq!(engine.state(), EngineState::Completed);
            assert_eq!(
                host.borrow().calls,
                vec![
                    Call::Locked(true),
                    Call::Preload("california".into()),
                    Call::Narrate("one"),
                    Call::Perform(ViewAction::National(Month::JANUARY)),
                    Call::Narrate("two"),
                    Call::Perform(ViewAction::Drill { fips: 6, state: "california", month: Month::JUNE }),
                    Call::Narrate("three"),
                    Call::Withdraw,
                    Call::Hide,
                    Call::Locked(false),
                ]
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn stop_interrupts_a_long_wait_promptly() {
    LocalSet::new()
        .run_until(async {
            let host = Recorder::new();
            let script = vec![
                step("long", StepAction::Narrate, Advance::After(Duration::from_secs(60))),
                step("never", StepAction::Narrate, Advance::After(ms(1))),
            ];
            let engine = PresentationEngine::new(script, Pacing::default());
            engine.start(Rc::clone(&host));
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(engine.is_running());

            let stopped_at = Instant::now();
            assert!(engine.stop());
            settle().await;

            assert_eq!(engine.state(), EngineState::Idle);
            assert!(stopped_at.elapsed() < ms(10));
            let host = host.borrow();
            assert_eq!(host.count(|c| *c == Call::Narrate("never")), 0);
            assert_eq!(host.calls.last(), Some(&Call::Locked(false)));
            assert_eq!(host.count(|c| *c == Call::Locked(true)), 1);
            assert_eq!(host.count(|c| *c == Call::Hide), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn no_actions_after_stop_during_sweep() {
    LocalSet::new()
        .run_until(async {
            let host = Recorder::new();
            let script = vec![step(
                "sweep",
                StepAction::Sweep { from: Month::JANUARY, to: Month::DECEMBER, every: Duration::from_secs(1) },
                Advance::After(ms(1)),
            )];
            let engine = PresentationEngine::new(script, Pacing::default());
            engine.start(Rc::clone(&host));
            tokio::time::sleep(ms(2500)).await;
            engine.stop();
            tokio::time::sleep(Duration::from_secs(20)).await;

            let months: Vec<ViewAction> = host
                .borrow()
                .calls
                .iter()
                .filter_map(|c| match c {
                    Call::Perform(action) => Some(*action),
                    _ => None,
                })
                .collect();
            assert_eq!(
                months,
                vec![
                    ViewAction::Month(Month::JANUARY),
                    ViewAction::Month(Month::FEBRUARY),
                    ViewAction::Month(Month::MARCH),
                ]
            );
            assert_eq!(engine.state(), EngineState::Idle);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn second_start_while_running_is_ignored() {
    LocalSet::new()
        .run_until(async {
            let host = Recorder::new();
            let engine = PresentationEngine::new(three_steps(), Pacing::default());
            assert!(engine.start(Rc::clone(&host)));
            settle().await;
            assert!(!engine.start(Rc::clone(&host)));
            tokio::time::sleep(Duration::from_secs(1)).await;

            let host = host.borrow();
            assert_eq!(host.count(|c| *c == Call::Locked(true)), 1);
            assert_eq!(host.count(|c| *c == Call::Narrate("one")), 1);
            assert_eq!(engine.state(), EngineState::Completed);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn continue_waits_for_resume() {
    LocalSet::new()
        .run_until(async {
            let host = Recorder::new();
            let script = vec![
                step("wait", StepAction::Narrate, Advance::OnContinue),
                step("after", StepAction::Narrate, Advance::After(ms(100))),
            ];
            let engine = PresentationEngine::new(script, Pacing::default());
            engine.start(Rc::clone(&host));
            settle().await;

            assert_eq!(engine.current_step(), Some(0));
            assert_eq!(host.borrow().calls.last(), Some(&Call::Offer));

            engine.resume();
            settle().await;
            assert_eq!(engine.current_step(), Some(1));
            tokio::time::sleep(Duration::from_secs(1)).await;

            assert_eq!(engine.state(), EngineState::Completed);
            let host = host.borrow();
            let offer = host.calls.iter().position(|c| *c == Call::Offer).unwrap();
            assert_eq!(host.calls[offer + 1], Call::Withdraw);
            assert_eq!(host.calls[offer + 2], Call::Narrate("after"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn stop_while_awaiting_continue() {
    LocalSet::new()
        .run_until(async {
            let host = Recorder::new();
            let script = vec![step("wait", StepAction::Narrate, Advance::OnContinue)];
            let engine = PresentationEngine::new(script, Pacing::default());
            engine.start(Rc::clone(&host));
            settle().await;
            engine.stop();
            settle().await;

            assert_eq!(engine.state(), EngineState::Idle);
            let host = host.borrow();
            assert_eq!(host.calls.last(), Some(&Call::Locked(false)));
            assert!(host.count(|c| *c == Call::Withdraw) >= 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn missing_prompt_advances_immediately() {
    LocalSet::new()
        .run_until(async {
            let host = Recorder::new();
            host.borrow_mut().can_prompt = false;
            let script = vec![
                step("a", StepAction::Narrate, Advance::OnContinue),
                step("b", StepAction::Narrate, Advance::OnContinue),
            ];
            let engine = PresentationEngine::new(script, Pacing::default());
            let started = Instant::now();
            engine.start(Rc::clone(&host));
            settle().await;

            assert_eq!(engine.state(), EngineState::Completed);
            assert_eq!(started.elapsed(), Duration::ZERO);
            assert_eq!(host.borrow().count(|c| *c == Call::Offer), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn exploration_gate_follows_first_run() {
    LocalSet::new()
        .run_until(async {
            let host = Recorder::new();
            let engine = PresentationEngine::new(three_steps(), Pacing::default());
            assert!(engine.exploration_allowed());

            engine.start(Rc::clone(&host));
            assert!(!engine.exploration_allowed());
            settle().await;
            engine.stop();
            settle().await;
            // Stopped before ever finishing.
            assert_eq!(engine.state(), EngineState::Idle);
            assert!(!engine.exploration_allowed());

            engine.start(Rc::clone(&host));
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert_eq!(engine.state(), EngineState::Completed);
            assert!(engine.exploration_allowed());

            engine.start(Rc::clone(&host));
            assert!(!engine.exploration_allowed());
            settle().await;
            engine.stop();
            settle().await;
            assert!(engine.exploration_allowed());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn failed_action_does_not_end_the_tour() {
    LocalSet::new()
        .run_until(async {
            let host = Recorder::new();
            host.borrow_mut().fail_drills = true;
            let engine = PresentationEngine::new(three_steps(), Pacing::default());
            engine.start(Rc::clone(&host));
            tokio::time::sleep(Duration::from_secs(1)).await;

            assert_eq!(engine.state(), EngineState::Completed);
            assert_eq!(host.borrow().count(|c| *c == Call::Narrate("three")), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn pacing_scales_waits() {
    LocalSet::new()
        .run_until(async {
            let host = Recorder::new();
            let script = vec![step("only", StepAction::Narrate, Advance::After(Duration::from_secs(1)))];
            let engine = PresentationEngine::new(script, Pacing { speed: 2.0 });
            engine.start(Rc::clone(&host));
            tokio::time::sleep(ms(450)).await;
            assert!(engine.is_running());
            tokio::time::sleep(ms(100)).await;
            assert_eq!(engine.state(), EngineState::Completed);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn full_tour_visits_each_state() {
    LocalSet::new()
        .run_until(async {
            let host = Recorder::new();
            host.borrow_mut().can_prompt = false;
            let engine = PresentationEngine::new(TOUR, Pacing::default());
            engine.start(Rc::clone(&host));
            tokio::time::sleep(Duration::from_secs(120)).await;

            assert_eq!(engine.state(), EngineState::Completed);
            let host = host.borrow();
            assert_eq!(host.count(|c| *c == Call::Narrate(TOUR[0].narration.title)), 1);
            assert_eq!(host.count(|c| matches!(c, Call::Perform(ViewAction::Drill { .. }))), 3);
            assert_eq!(host.count(|c| matches!(c, Call::Perform(ViewAction::Month(_)))), 36);
            assert_eq!(
                host.calls.iter().filter(|c| matches!(c, Call::Preload(_))).cloned().collect::<Vec<_>>(),
                vec![Call::Preload("california".into()), Call::Preload("oregon".into()), Call::Preload("texas".into())]
            );
        })
        .await;
}
