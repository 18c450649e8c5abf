use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Monotonic generation clock for in-flight task lifecycles.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	next: Arc<AtomicU64>,
}

impl GenerationClock {
	/// Creates a new generation clock starting at generation 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next generation ID.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// Generation-scoped cancellation token for one in-flight task.
#[derive(Debug, Clone)]
pub struct GenerationToken {
	generation: u64,
	cancel: CancellationToken,
}

impl GenerationToken {
	/// Creates a new generation token.
	pub fn new(generation: u64, cancel: CancellationToken) -> Self {
		Self { generation, cancel }
	}

	/// Returns generation ID.
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns the underlying cancellation token.
	pub fn token(&self) -> &CancellationToken {
		&self.cancel
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generations_are_monotonic_across_clones() {
		let clock = GenerationClock::new();
		let other = clock.clone();
		assert_eq!(clock.next(), 1);
		assert_eq!(other.next(), 2);
		assert_eq!(clock.next(), 3);
	}

	#[test]
	fn cancelling_a_clone_cancels_the_shared_token() {
		let token = GenerationToken::new(4, CancellationToken::new());
		let clone = token.clone();
		clone.cancel();
		assert!(token.is_cancelled());
		assert_eq!(token.generation(), 4);
	}
}
