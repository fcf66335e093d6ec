#![cfg(feature = "reqwest")]

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use bearer_gate::{
	_preludet::*,
	auth::{AccessToken, CurrentUser},
	refresh::RefreshCoordinator,
	service::{AuthenticationService, ServiceError, ServiceFuture},
	session::{MemorySession, SessionStore},
};

#[derive(Clone, Copy)]
enum RefreshScript {
	Grant,
	Missing,
	Fail,
}

/// Backend fake whose refresh call blocks on a shared gate until the test releases it.
struct GatedAuthService {
	gate: Arc<AsyncMutex<()>>,
	script: RefreshScript,
	refresh_calls: AtomicU64,
	logout_calls: AtomicU64,
}
impl GatedAuthService {
	fn new(gate: Arc<AsyncMutex<()>>, script: RefreshScript) -> Arc<Self> {
		Arc::new(Self {
			gate,
			script,
			refresh_calls: Default::default(),
			logout_calls: Default::default(),
		})
	}

	fn open(script: RefreshScript) -> Arc<Self> {
		Self::new(Arc::new(AsyncMutex::new(())), script)
	}

	fn refresh_calls(&self) -> u64 {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	fn logout_calls(&self) -> u64 {
		self.logout_calls.load(Ordering::SeqCst)
	}
}
impl AuthenticationService for GatedAuthService {
	fn refresh_token(&self) -> ServiceFuture<'_, Option<CurrentUser>> {
		let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
		let gate = self.gate.clone();
		let script = self.script;

		Box::pin(async move {
			let _open = gate.lock().await;

			match script {
				RefreshScript::Grant =>
					Ok(Some(CurrentUser::new("alice", AccessToken::new(format!("fresh-{call}"))))),
				RefreshScript::Missing => Ok(None),
				RefreshScript::Fail =>
					Err(ServiceError::Unreachable { message: "token endpoint timed out".into() }),
			}
		})
	}

	fn logout(&self) -> ServiceFuture<'_, ()> {
		self.logout_calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move { Ok(()) })
	}
}

fn build_coordinator(
	service: Arc<GatedAuthService>,
) -> (Arc<RefreshCoordinator>, Arc<MemorySession>) {
	let session = Arc::new(MemorySession::default());
	let coordinator = Arc::new(RefreshCoordinator::new(session.clone(), service));

	(coordinator, session)
}

#[tokio::test]
async fn concurrent_expiries_share_one_refresh() {
	let gate = Arc::new(AsyncMutex::new(()));
	let held = gate.lock_arc().await;
	let service = GatedAuthService::new(gate.clone(), RefreshScript::Grant);
	let (coordinator, session) = build_coordinator(service.clone());
	let mut handles = Vec::new();

	for _ in 0..8 {
		let coordinator = coordinator.clone();

		handles.push(tokio::spawn(async move { coordinator.obtain_fresh_token().await }));
	}

	tokio::time::sleep(Duration::from_millis(50)).await;

	assert!(coordinator.is_refreshing(), "The initiator should be mid-refresh while gated.");

	drop(held);

	for handle in handles {
		let token = handle
			.await
			.expect("Waiter task should not panic.")
			.expect("Every rider should receive the refreshed token.");

		assert_eq!(token.expose(), "fresh-1");
	}

	assert_eq!(service.refresh_calls(), 1, "Exactly one physical refresh must be issued.");
	assert_eq!(coordinator.metrics().attempts(), 1);
	assert_eq!(coordinator.metrics().successes(), 1);
	assert_eq!(coordinator.metrics().coalesced(), 7);
	assert!(!coordinator.is_refreshing());

	let persisted = session
		.current_token()
		.await
		.expect("Session read should succeed after refresh.")
		.expect("Session should hold the refreshed token.");

	assert_eq!(persisted.expose(), "fresh-1");
}

#[tokio::test]
async fn refresh_failure_fans_out_and_logs_out_once() {
	let gate = Arc::new(AsyncMutex::new(()));
	let held = gate.lock_arc().await;
	let service = GatedAuthService::new(gate.clone(), RefreshScript::Fail);
	let (coordinator, _session) = build_coordinator(service.clone());
	let mut handles = Vec::new();

	for _ in 0..4 {
		let coordinator = coordinator.clone();

		handles.push(tokio::spawn(async move { coordinator.obtain_fresh_token().await }));
	}

	tokio::time::sleep(Duration::from_millis(50)).await;
	drop(held);

	for handle in handles {
		let err = handle
			.await
			.expect("Waiter task should not panic.")
			.expect_err("Every rider should observe the terminal refresh failure.");

		assert!(matches!(err, Error::RefreshFailed { .. }));
	}

	assert_eq!(service.refresh_calls(), 1, "A failed refresh must never be retried.");
	assert_eq!(service.logout_calls(), 1, "Logout must be triggered exactly once.");
	assert_eq!(coordinator.metrics().failures(), 1);
	assert!(!coordinator.is_refreshing());
}

#[tokio::test]
async fn missing_user_escalates_to_logout() {
	let service = GatedAuthService::open(RefreshScript::Missing);
	let (coordinator, session) = build_coordinator(service.clone());
	let err = coordinator
		.obtain_fresh_token()
		.await
		.expect_err("A refresh without a usable session should fail.");

	assert!(matches!(err, Error::RefreshFailed { .. }));
	assert_eq!(service.logout_calls(), 1);

	let persisted =
		session.current_token().await.expect("Session read should succeed after failure.");

	assert!(persisted.is_none(), "A failed refresh must not write a token into the session.");
}

#[tokio::test]
async fn settled_cycles_never_serve_later_callers() {
	let service = GatedAuthService::open(RefreshScript::Grant);
	let (coordinator, _session) = build_coordinator(service.clone());
	let first = coordinator
		.obtain_fresh_token()
		.await
		.expect("First refresh cycle should succeed.");
	let second = coordinator
		.obtain_fresh_token()
		.await
		.expect("Second refresh cycle should succeed.");

	// A caller arriving after settlement starts a fresh cycle instead of consuming the
	// broadcast of the previous one.
	assert_eq!(first.expose(), "fresh-1");
	assert_eq!(second.expose(), "fresh-2");
	assert_eq!(service.refresh_calls(), 2);
	assert_eq!(coordinator.settled_cycles(), 2);
	assert_eq!(coordinator.metrics().coalesced(), 0);
}

#[tokio::test]
async fn cancelled_waiter_releases_slot_without_killing_refresh() {
	let gate = Arc::new(AsyncMutex::new(()));
	let held = gate.lock_arc().await;
	let service = GatedAuthService::new(gate.clone(), RefreshScript::Grant);
	let (coordinator, _session) = build_coordinator(service.clone());
	let initiator = {
		let coordinator = coordinator.clone();

		tokio::spawn(async move { coordinator.obtain_fresh_token().await })
	};

	tokio::time::sleep(Duration::from_millis(50)).await;

	let doomed_waiter = {
		let coordinator = coordinator.clone();

		tokio::spawn(async move { coordinator.obtain_fresh_token().await })
	};
	let surviving_waiter = {
		let coordinator = coordinator.clone();

		tokio::spawn(async move { coordinator.obtain_fresh_token().await })
	};

	tokio::time::sleep(Duration::from_millis(50)).await;
	doomed_waiter.abort();
	drop(held);

	let initiated = initiator
		.await
		.expect("Initiator task should not panic.")
		.expect("Initiator should receive the refreshed token.");
	let survived = surviving_waiter
		.await
		.expect("Surviving waiter should not panic.")
		.expect("Surviving waiter should receive the refreshed token.");

	assert_eq!(initiated.expose(), "fresh-1");
	assert_eq!(survived.expose(), "fresh-1");
	assert_eq!(service.refresh_calls(), 1);
	assert!(!coordinator.is_refreshing());
}
