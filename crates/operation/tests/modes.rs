//! Blocking, detached and cancellable execution of the same engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use simrun_operation::scripted::{Refresh, ScriptedClient};
use simrun_operation::{
	CancellationToken, ConfigError, EngineConfig, EngineError, Executor, OperationContext, OperationKind, OperationRequest, OperationStatus, Outcome,
	ProgressEvent, RemoteOperationClient as _, Stage, StatusSnapshot, ValidationEntry,
};

fn request(name: &str) -> OperationRequest<String> {
	OperationRequest::new(name, OperationContext::new("project-1").with_parent("sim-1"), String::new())
}

fn finishing_client() -> ScriptedClient {
	ScriptedClient::new(OperationKind::Mesh).with_refreshes([
		Refresh::status(OperationStatus::Queued),
		Refresh::Status(StatusSnapshot::new(OperationStatus::Running).with_progress(0.5)),
		Refresh::status(OperationStatus::Finished),
	])
}

fn running_client() -> ScriptedClient {
	ScriptedClient::new(OperationKind::Mesh).with_refreshes([Refresh::status(OperationStatus::Running)])
}

#[test]
fn blocking_run_returns_outcome() {
	let executor = Executor::new(EngineConfig::default().poll_interval(Duration::from_millis(5))).unwrap();
	let client = finishing_client();

	let completion = executor.run(&client, &request("APIMesh")).unwrap().into_finished().unwrap();

	assert_eq!(completion.snapshot.status, OperationStatus::Finished);
	assert_eq!(completion.polls, 2);
	assert!(completion.elapsed >= Duration::from_millis(10));
}

#[test]
fn blocking_run_reports_failures() {
	let executor = Executor::new(EngineConfig::default().poll_interval(Duration::from_millis(1))).unwrap();
	let client = ScriptedClient::new(OperationKind::Mesh).with_check(vec![ValidationEntry::error("no boundary conditions")]);

	let err = executor.run(&client, &request("APIMesh")).unwrap_err();
	assert!(matches!(err, EngineError::SetupValidationFailed { .. }));
}

#[test]
fn invalid_policy_is_rejected_up_front() {
	let err = Executor::new(EngineConfig::default().timeout_multiplier(f64::NAN)).unwrap_err();
	assert!(matches!(err, ConfigError::InvalidMultiplier(_)));
	assert!(matches!(
		Executor::new(EngineConfig::default().poll_interval(Duration::ZERO)),
		Err(ConfigError::ZeroPollInterval)
	));
}

#[tokio::test]
async fn blocking_run_inside_runtime_is_refused() {
	let executor = Executor::new(EngineConfig::default()).unwrap();
	let client = finishing_client();

	let err = executor.run(&client, &request("APIMesh")).unwrap_err();
	assert!(matches!(err, EngineError::Runtime { .. }));
	assert!(client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn detached_callback_fires_once() {
	let executor = Executor::default();
	let client = Arc::new(finishing_client());
	let calls = Arc::new(AtomicUsize::new(0));
	let (tx, rx) = tokio::sync::oneshot::channel();

	let counter = Arc::clone(&calls);
	executor.run_detached(Arc::clone(&client), request("APIMesh"), move |result| {
		counter.fetch_add(1, Ordering::SeqCst);
		let _ = tx.send(result);
	});

	let result = rx.await.unwrap();
	assert!(result.unwrap().is_finished());
	tokio::time::sleep(Duration::from_secs(120)).await;
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert_eq!(client.fetch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn detached_channel_delivers_failure() {
	let executor = Executor::default();
	let client = Arc::new(ScriptedClient::new(OperationKind::Mesh).with_refreshes([Refresh::status(OperationStatus::Failed)]));

	let result = executor.run_detached_channel(client, request("APIMesh")).await.unwrap();
	assert!(matches!(
		result,
		Err(EngineError::OperationFailed {
			status: OperationStatus::Failed,
			..
		})
	));
}

#[tokio::test(start_paused = true)]
async fn cancel_during_sleep_ends_promptly() {
	let executor = Executor::default();
	let client = Arc::new(running_client());
	let cancel = CancellationToken::new();

	let task = executor.run_cancellable(Arc::clone(&client), request("APIMesh"), cancel.clone());
	tokio::time::sleep(Duration::from_secs(45)).await;
	cancel.cancel();

	match task.wait().await.unwrap() {
		Outcome::Canceled(cancellation) => {
			assert_eq!(cancellation.elapsed, Duration::from_secs(45));
			assert_eq!(cancellation.last.map(|s| s.status), Some(OperationStatus::Running));
			assert!(cancellation.operation.is_some());
		}
		Outcome::Finished(_) => panic!("expected cancellation"),
	}
	assert_eq!(client.fetch_count(), 2);
	assert!(task.is_finished());
	assert!(task.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn task_handle_cancels_its_run() {
	let executor = Executor::default();
	let client = Arc::new(running_client());

	let task = executor.run_cancellable(Arc::clone(&client), request("APIMesh"), CancellationToken::new());
	tokio::time::sleep(Duration::from_secs(100)).await;
	task.cancel();

	assert!(task.wait().await.unwrap().is_canceled());
	assert_eq!(client.fetch_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn concurrent_submissions_share_one_run() {
	let executor = Executor::default();
	let client = Arc::new(finishing_client());

	let first = executor.run_cancellable(Arc::clone(&client), request("APIMesh"), CancellationToken::new());
	let second = executor.run_cancellable(Arc::clone(&client), request("APIMesh"), CancellationToken::new());
	assert_eq!(first.generation(), second.generation());
	assert!(executor.in_flight(first.key()).is_some());
	assert!(!executor.is_idle());

	let a = first.wait().await.unwrap().into_finished().unwrap();
	let b = second.wait().await.unwrap().into_finished().unwrap();
	assert_eq!(a.operation.id, b.operation.id);
	assert_eq!(client.created(), 1);
	assert!(executor.in_flight(first.key()).is_none());
	assert!(executor.is_idle());

	let third = executor.run_cancellable(Arc::clone(&client), request("APIMesh"), CancellationToken::new());
	assert_ne!(third.generation(), first.generation());
	third.wait().await.unwrap();
	assert_eq!(client.created(), 2);
}

#[tokio::test(start_paused = true)]
async fn distinct_requests_are_not_shared() {
	let executor = Executor::default();
	let client = Arc::new(finishing_client());

	let a = executor.run_cancellable(Arc::clone(&client), request("Mesh A"), CancellationToken::new());
	let b = executor.run_cancellable(Arc::clone(&client), request("Mesh B"), CancellationToken::new());
	assert_ne!(a.generation(), b.generation());

	a.wait().await.unwrap();
	b.wait().await.unwrap();
	assert_eq!(client.created(), 2);
}

#[tokio::test(start_paused = true)]
async fn task_streams_progress() {
	let executor = Executor::default();
	let client = Arc::new(finishing_client());

	let task = executor.run_cancellable(Arc::clone(&client), request("APIMesh"), CancellationToken::new());
	let mut events = task.subscribe();

	let mut seen: Vec<ProgressEvent> = Vec::new();
	loop {
		let event = events.recv().await.unwrap();
		let done = event.stage == Stage::Completed;
		seen.push(event);
		if done {
			break;
		}
	}

	assert_eq!(seen.first().map(|e| e.stage), Some(Stage::Creating));
	assert!(seen.iter().all(|e| e.kind == client.kind()));
	assert!(seen.iter().any(|e| e.stage == Stage::Polling && e.progress == Some(0.5)));
	assert!(task.wait().await.unwrap().is_finished());
}
