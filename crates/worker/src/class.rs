/// Execution classes attached to every spawned task for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// A run hosted on the caller's thread until it completes.
	Blocking,
	/// A fire-and-forget run whose result is only seen by its callback.
	Detached,
	/// A cancellable run that may be shared between callers.
	Cancellable,
	/// Completion delivery for a run spawned under another class.
	Completion,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Blocking => "blocking",
			Self::Detached => "detached",
			Self::Cancellable => "cancellable",
			Self::Completion => "completion",
		}
	}
}
