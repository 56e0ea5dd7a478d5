//! Batch lifecycle events.
//!
//! Observers receive events through an explicitly injected [`EventHandle`]
//! scoped to one orchestrator, instead of reading process-wide state.

mod events;
mod handle;

pub use events::*;
pub use handle::*;
