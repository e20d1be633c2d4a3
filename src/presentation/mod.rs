//! Guided tour over the map.
//!
//! A tour is a fixed list of [`Step`]s run strictly in order on a single
//! local task. Each step narrates, applies its map action, then suspends on a
//! timer or on the user's continue signal. Stopping fires one cancellation
//! token shared by every suspension; the driver unwinds, hides the narration
//! and releases the interaction lock on every exit path.

mod engine;
mod script;
mod suspend;

pub use engine::{EngineState, Pacing, PresentationEngine, PresentationHost};
pub use script::{Advance, Narration, Step, StepAction, TOUR, ViewAction, drilled_states};
pub use suspend::{AbortHandle, AbortSignal, Aborted, abort_pair};
