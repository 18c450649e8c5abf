use std::future::Future;
use std::io;

use crate::TaskClass;

/// Drives `fut` to completion on a current-thread runtime owned by the
/// calling thread.
///
/// Fails when the caller is already inside an async runtime.
pub fn block_on<F>(class: TaskClass, fut: F) -> io::Result<F::Output>
where
	F: Future,
{
	if tokio::runtime::Handle::try_current().is_ok() {
		return Err(io::Error::other("block_on called from within an async runtime"));
	}

	tracing::trace!(worker_class = class.as_str(), "worker.block_on");
	let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
	Ok(runtime.block_on(fut))
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[test]
	fn drives_timers_to_completion() {
		let value = block_on(TaskClass::Blocking, async {
			tokio::time::sleep(Duration::from_millis(5)).await;
			42
		})
		.unwrap();
		assert_eq!(value, 42);
	}

	#[test]
	fn hosts_io_backed_futures() {
		let addr = block_on(TaskClass::Blocking, async {
			let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
			listener.local_addr()
		})
		.unwrap()
		.unwrap();
		assert!(addr.ip().is_loopback());
	}

	#[tokio::test]
	async fn refuses_to_nest_inside_a_runtime() {
		let err = block_on(TaskClass::Blocking, async {}).unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::Other);
	}
}
