use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use crate::GenerationClock;

/// Result of [`InFlight::claim`].
#[derive(Debug, Clone)]
pub enum Claim<V> {
	/// A matching entry was already in flight and is shared with the caller.
	Joined(V),
	/// No entry was in flight; a new one was created under `generation`.
	Started { value: V, generation: u64 },
}

impl<V> Claim<V> {
	/// Returns the claimed value regardless of how it was obtained.
	pub fn into_value(self) -> V {
		match self {
			Self::Joined(value) | Self::Started { value, .. } => value,
		}
	}

	/// Returns true when the caller joined an existing entry.
	pub fn is_joined(&self) -> bool {
		matches!(self, Self::Joined(_))
	}
}

struct Entry<V> {
	generation: u64,
	value: V,
}

/// Keyed registry of work that is currently in flight.
///
/// An entry is created at most once per key until its owner releases it.
/// Release is generation-checked so a stale owner cannot evict the entry of
/// a newer run registered under the same key.
pub struct InFlight<K, V> {
	inner: Arc<Mutex<HashMap<K, Entry<V>>>>,
	clock: GenerationClock,
}

impl<K, V> Clone for InFlight<K, V> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
			clock: self.clock.clone(),
		}
	}
}

impl<K, V> Default for InFlight<K, V> {
	fn default() -> Self {
		Self {
			inner: Arc::new(Mutex::new(HashMap::new())),
			clock: GenerationClock::new(),
		}
	}
}

impl<K, V> InFlight<K, V>
where
	K: Eq + Hash,
	V: Clone,
{
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the entry in flight for `key`, or registers the one built by
	/// `start` under a fresh generation.
	///
	/// `start` runs with the registry locked and must not block.
	pub fn claim(&self, key: K, start: impl FnOnce(u64) -> V) -> Claim<V> {
		let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(entry) = guard.get(&key) {
			return Claim::Joined(entry.value.clone());
		}
		let generation = self.clock.next();
		let value = start(generation);
		guard.insert(
			key,
			Entry {
				generation,
				value: value.clone(),
			},
		);
		Claim::Started { value, generation }
	}

	/// Removes the entry for `key` if it still belongs to `generation`.
	///
	/// Returns true when an entry was removed.
	pub fn release(&self, key: &K, generation: u64) -> bool {
		let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
		match guard.get(key) {
			Some(entry) if entry.generation == generation => {
				guard.remove(key);
				true
			}
			_ => false,
		}
	}

	/// Returns the entry currently in flight for `key`.
	pub fn get(&self, key: &K) -> Option<V> {
		let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
		guard.get(key).map(|entry| entry.value.clone())
	}

	/// Returns the number of entries in flight.
	pub fn len(&self) -> usize {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
	}

	/// Returns `true` if nothing is in flight.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
