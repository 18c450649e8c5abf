use std::future::Future;
use std::sync::OnceLock;

use tokio::task::{JoinError, JoinHandle};

use crate::TaskClass;

fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("simrun-worker-global")
			.build()
			.expect("failed to build simrun-worker global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns an async task on the current runtime, or on the shared global
/// runtime when the caller is not inside one.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn");
	runtime_handle().spawn(fut)
}

/// Renders a join failure for completion reporting.
///
/// Panic payloads of type `&str` and `String` are preserved.
pub fn join_error_message(err: JoinError) -> String {
	if err.is_cancelled() {
		return "task was cancelled before completing".to_string();
	}
	match err.try_into_panic() {
		Ok(payload) => {
			if let Some(msg) = payload.downcast_ref::<&str>() {
				format!("task panicked: {msg}")
			} else if let Some(msg) = payload.downcast_ref::<String>() {
				format!("task panicked: {msg}")
			} else {
				"task panicked".to_string()
			}
		}
		Err(err) => err.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn panic_payload_is_preserved() {
		let handle = spawn(TaskClass::Detached, async { panic!("boom-str") });
		let err = handle.await.unwrap_err();
		let msg = join_error_message(err);
		assert!(msg.contains("boom-str"), "expected 'boom-str', got: {msg}");
	}

	#[tokio::test]
	async fn aborted_task_reports_cancellation() {
		let handle = spawn(TaskClass::Cancellable, async {
			tokio::time::sleep(std::time::Duration::from_secs(60)).await;
		});
		handle.abort();
		let err = handle.await.unwrap_err();
		assert_eq!(join_error_message(err), "task was cancelled before completing");
	}

	#[test]
	fn spawns_onto_global_runtime_outside_async_context() {
		let (tx, rx) = std::sync::mpsc::channel();
		spawn(TaskClass::Completion, async move {
			let _ = tx.send(7);
		});
		assert_eq!(rx.recv_timeout(std::time::Duration::from_secs(5)).ok(), Some(7));
	}
}
