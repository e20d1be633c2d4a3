use super::{
    script::{Advance, Narration, Step, StepAction, ViewAction, drilled_states},
    suspend::{self, AbortHandle, AbortSignal, Aborted, abort_pair},
};
use crate::error::AtlasError;
use log::{debug, info, warn};
use std::{cell::RefCell, rc::Rc, time::Duration};
use tokio::sync::Notify;

/// What the tour drives: the map, the narration panel and the input lock.
pub trait PresentationHost {
    fn perform(&mut self, action: ViewAction) -> Result<(), AtlasError>;

    fn narrate(&mut self, narration: &Narration);

    fn hide_narration(&mut self);

    /// Disables (`true`) or restores (`false`) direct map interaction.
    fn set_locked(&mut self, locked: bool);

    /// Shows the continue prompt. Returns false when no prompt can be shown.
    fn offer_continue(&mut self) -> bool;

    fn withdraw_continue(&mut self);

    /// Warms the per-state data the tour will drill into.
    fn preload(&mut self, _fips: u32, _state: &str) -> Result<(), AtlasError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    /// Idle after a tour that ran to its end.
    Completed,
}

#[derive(Debug)]
struct Session {
    state: EngineState,
    abort: Option<AbortHandle>,
    step: Option<usize>,
    ever_started: bool,
    completed_once: bool,
}

/// Scales every wait of the script; 2.0 runs twice as fast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pacing {
    pub speed: f64,
}

impl Pacing {
    pub fn scale(&self, d: Duration) -> Duration {
        if self.speed > 0.0 { d.div_f64(self.speed) } else { d }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self { speed: 1.0 }
    }
}

/// Holds the interaction lock for as long as it lives. Must be dropped on a
/// `LocalSet`: if the host is still borrowed at that moment, the release is
/// retried on later scheduler turns.
struct InteractionLock<H: PresentationHost + 'static> {
    host: Rc<RefCell<H>>,
}

impl<H: PresentationHost + 'static> InteractionLock<H> {
    fn engage(host: &Rc<RefCell<H>>) -> Self {
        host.borrow_mut().set_locked(true);
        Self { host: Rc::clone(host) }
    }
}

impl<H: PresentationHost + 'static> Drop for InteractionLock<H> {
    fn drop(&mut self) {
        if let Ok(mut host) = self.host.try_borrow_mut() {
            host.set_locked(false);
            return;
        }
        warn!("host busy; deferring interaction unlock");
        let host = Rc::clone(&self.host);
        tokio::task::spawn_local(async move {
            loop {
                tokio::task::yield_now().await;
                if let Ok(mut host) = host.try_borrow_mut() {
                    host.set_locked(false);
                    return;
                }
            }
        });
    }
}

/// Runs the scripted tour one step at a time on the local task set.
/// Cloning yields another handle to the same engine.
#[derive(Clone)]
pub struct PresentationEngine {
    script: Rc<[Step]>,
    session: Rc<RefCell<Session>>,
    resume: Rc<Notify>,
    pacing: Pacing,
}

impl PresentationEngine {
    pub fn new(script: impl Into<Rc<[Step]>>, pacing: Pacing) -> Self {
        Self {
            script: script.into(),
            session: Rc::new(RefCell::new(Session {
                state: EngineState::Idle,
                abort: None,
                step: None,
                ever_started: false,
                completed_once: false,
            })),
            resume: Rc::new(Notify::new()),
            pacing,
        }
    }

    pub fn state(&self) -> EngineState {
        self.session.borrow().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    /// Index of the step being executed, if any.
    pub fn current_step(&self) -> Option<usize> {
        self.session.borrow().step
    }

    pub fn script_len(&self) -> usize {
        self.script.len()
    }

    /// Free exploration is allowed outside a tour once a tour has completed,
    /// or if none was ever started.
    pub fn exploration_allowed(&self) -> bool {
        let session = self.session.borrow();
        match session.state {
            EngineState::Running => false,
            EngineState::Completed => true,
            EngineState::Idle => !session.ever_started || session.completed_once,
        }
    }

    /// Begins a session on the current `LocalSet`. Ignored while one runs.
    pub fn start<H: PresentationHost + 'static>(&self, host: Rc<RefCell<H>>) -> bool {
        let signal = {
            let mut session = self.session.borrow_mut();
            if session.state == EngineState::Running {
                debug!("presentation already running; start ignored");
                return false;
            }
            let (handle, signal) = abort_pair();
            session.state = EngineState::Running;
            session.abort = Some(handle);
            session.step = None;
            session.ever_started = true;
            signal
        };
        info!("presentation started ({} steps)", self.script.len());

        let engine = self.clone();
        tokio::task::spawn_local(async move { engine.drive(host, signal).await });
        true
    }

    /// Requests cancellation of the running session.
    pub fn stop(&self) -> bool {
        match &self.session.borrow().abort {
            Some(handle) => {
                info!("presentation stop requested");
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn toggle<H: PresentationHost + 'static>(&self, host: Rc<RefCell<H>>) {
        if self.is_running() {
            self.stop();
        } else {
            self.start(host);
        }
    }

    /// Releases a step waiting on the user.
    pub fn resume(&self) {
        self.resume.notify_waiters();
    }

    async fn drive<H: PresentationHost + 'static>(self, host: Rc<RefCell<H>>, mut signal: AbortSignal) {
        let outcome = {
            let _lock = InteractionLock::engage(&host);
            let outcome = self.run(&host, &mut signal).await;
            let mut host = host.borrow_mut();
            host.withdraw_continue();
            host.hide_narration();
            outcome
        };

        let mut session = self.session.borrow_mut();
        session.abort = None;
        session.step = None;
        match outcome {
            Ok(()) => {
                info!("presentation complete");
                session.state = EngineState::Completed;
                session.completed_once = true;
            }
            Err(Aborted) => {
                info!("presentation aborted");
                session.state = EngineState::Idle;
            }
        }
    }

    async fn run<H: PresentationHost>(&self, host: &Rc<RefCell<H>>, signal: &mut AbortSignal) -> Result<(), Aborted> {
        for (fips, state) in drilled_states(&self.script) {
            signal.check()?;
            if let Err(err) = host.borrow_mut().preload(fips, state) {
                warn!("preloading {state} failed: {err}");
            }
        }

        for (index, step) in self.script.iter().enumerate() {
            signal.check()?;
            self.session.borrow_mut().step = Some(index);
            debug!("step {index}: {}", step.narration.title);
            host.borrow_mut().narrate(&step.narration);

            match step.action {
                StepAction::Narrate => {}
                StepAction::View(action) => Self::perform(host, action),
                StepAction::Sweep { from, to, every } => {
                    for month in from.through(to) {
                        signal.check()?;
                        Self::perform(host, ViewAction::Month(month));
                        suspend::sleep(self.pacing.scale(every), signal).await?;
                    }
                }
            }

            self.settle(step.advance, host, signal).await?;
        }
        Ok(())
    }

    fn perform<H: PresentationHost>(host: &Rc<RefCell<H>>, action: ViewAction) {
        if let Err(err) = host.borrow_mut().perform(action) {
            warn!("tour action {action:?} failed: {err}");
        }
    }

    async fn settle<H: PresentationHost>(
        &self,
        advance: Advance,
        host: &Rc<RefCell<H>>,
        signal: &mut AbortSignal,
    ) -> Result<(), Aborted> {
        match advance {
            Advance::After(d) => suspend::sleep(self.pacing.scale(d), signal).await,
            Advance::OnContinue => {
                if !host.borrow_mut().offer_continue() {
                    return Ok(());
                }
                let outcome = suspend::until_resumed(&self.resume, signal).await;
                host.borrow_mut().withdraw_continue();
                outcome
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    #[derive(Default)]
    struct LockLog {
        locks: Vec<bool>,
    }

    impl PresentationHost for LockLog {
        fn perform(&mut self, _action: ViewAction) -> Result<(), AtlasError> {
            Ok(())
        }

        fn narrate(&mut self, _narration: &Narration) {}

        fn hide_narration(&mut self) {}

        fn set_locked(&mut self, locked: bool) {
            self.locks.push(locked);
        }

        fn offer_continue(&mut self) -> bool {
            false
        }

        fn withdraw_continue(&mut self) {}
    }

    #[tokio::test]
    async fn lock_released_on_drop() {
        let host = Rc::new(RefCell::new(LockLog::default()));
        drop(InteractionLock::engage(&host));
        assert_eq!(host.borrow().locks, vec![true, false]);
    }

    #[tokio::test]
    async fn busy_host_is_unlocked_once_free() {
        LocalSet::new()
            .run_until(async {
                let host = Rc::new(RefCell::new(LockLog::default()));
                let lock = InteractionLock::engage(&host);
                let held = host.borrow();
                drop(lock);
                assert_eq!(held.locks, vec![true]);
                drop(held);

                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
                assert_eq!(host.borrow().locks, vec![true, false]);
            })
            .await;
    }
}
