//! Worker primitives shared by the operation execution modes.
//!
//! Every task spawned through this crate carries a [`TaskClass`] so traces
//! show which execution mode owns it. Keyed in-flight bookkeeping lives in
//! [`InFlight`], and generation-scoped cancellation in [`GenerationToken`].

mod class;
mod inflight;
mod runtime;
mod spawn;
mod token;

pub use class::TaskClass;
pub use inflight::{Claim, InFlight};
pub use runtime::block_on;
pub use spawn::{join_error_message, spawn};
pub use token::{GenerationClock, GenerationToken};
