//! Call transfer state machine
//!
//! Pure state transitions: `(state, context, event) -> (state, effects)`.
//! All I/O happens in the runtime that executes the effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{CallContext, CallState};
pub use transition::{transition, TransitionError, TransitionResult};
