//! Single-flight refresh coordination and result fan-out.
//!
//! The coordinator owns the Idle/Refreshing state machine described by
//! [`RefreshCoordinator::obtain_fresh_token`]: the first caller to observe Idle claims the
//! cycle and performs the one physical `refresh_token` call; every caller that arrives
//! before the cycle settles parks on the flight guard and rides the broadcast outcome.
//! A failed refresh is never retried here. It escalates straight to logout and fans the
//! failure out to every parked waiter.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	obs::{self, StageKind, StageOutcome, StageSpan},
	service::AuthenticationService,
	session::SessionStore,
};

/// Coordinates credential refreshes so at most one physical refresh request is outstanding
/// at any time.
///
/// The coordinator's lifetime is scoped to the authenticated client, not to any single
/// request; it is shared by reference with every request-handling call.
pub struct RefreshCoordinator {
	service: Arc<dyn AuthenticationService>,
	session: Arc<dyn SessionStore>,
	metrics: Arc<RefreshMetrics>,
	/// Park queue for waiters; held across the refresh round trip.
	flight: AsyncMutex<()>,
	cycle: Mutex<CycleSlot>,
}
impl RefreshCoordinator {
	/// Creates a coordinator writing refreshed users into the provided session store.
	pub fn new(session: Arc<dyn SessionStore>, service: Arc<dyn AuthenticationService>) -> Self {
		Self {
			service,
			session,
			metrics: Default::default(),
			flight: AsyncMutex::new(()),
			cycle: Default::default(),
		}
	}

	/// Shared counters for refresh cycle outcomes.
	pub fn metrics(&self) -> &Arc<RefreshMetrics> {
		&self.metrics
	}

	/// Returns `true` while a refresh cycle is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.cycle.lock().in_progress
	}

	/// Returns the number of refresh cycles that have settled (success or failure).
	pub fn settled_cycles(&self) -> u64 {
		self.cycle.lock().epoch
	}

	/// Obtains a fresh access token, coalescing concurrent callers into one refresh.
	///
	/// Exactly one caller performs the network call; all others suspend until the cycle
	/// settles and resolve with the same token (or the same terminal failure). On failure
	/// the coordinator triggers `logout` once and surfaces
	/// [`Error::RefreshFailed`] to every rider; the refresh is never retried internally.
	pub async fn obtain_fresh_token(&self) -> Result<AccessToken> {
		const KIND: StageKind = StageKind::Refresh;

		let span = StageSpan::new(KIND, "obtain_fresh_token");

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);

		let result = span
			.instrument(async move {
				let observed = self.cycle.lock().epoch;
				// Parking here is the waiter registration. Dropping the lock future while
				// still queued releases the slot without touching the in-flight refresh or
				// the other waiters.
				let _flight = self.flight.lock().await;

				if let Some(outcome) = self.settled_since(observed) {
					self.metrics.record_coalesced();

					return outcome.into_result();
				}

				self.metrics.record_attempt();

				let flight = InFlight::begin(&self.cycle);
				let outcome = match self.service.refresh_token().await {
					Ok(Some(user)) => {
						let token = user.access_token.clone();

						match self.session.set_current_user(user).await {
							Ok(()) => CycleOutcome::Token(token),
							Err(err) => {
								let reason = format!("Failed to persist refreshed session: {err}");

								self.escalate(reason).await
							},
						}
					},
					Ok(None) =>
						self.escalate("Authentication backend returned no session.".into()).await,
					Err(err) => self.escalate(err.to_string()).await,
				};

				flight.settle(outcome.clone());

				match &outcome {
					CycleOutcome::Token(_) => self.metrics.record_success(),
					CycleOutcome::Failed { .. } => self.metrics.record_failure(),
				}

				outcome.into_result()
			})
			.await;

		match &result {
			Ok(_) => obs::record_stage_outcome(KIND, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
		}

		result
	}

	/// Returns the outcome of a cycle that settled after `observed`, if any.
	fn settled_since(&self, observed: u64) -> Option<CycleOutcome> {
		let slot = self.cycle.lock();

		if slot.epoch > observed { slot.outcome.clone() } else { None }
	}

	async fn escalate(&self, reason: String) -> CycleOutcome {
		// Logout is fire-and-forget; its own failure is not specially handled.
		let _ = self.service.logout().await;

		CycleOutcome::Failed { reason }
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let slot = self.cycle.lock();

		f.debug_struct("RefreshCoordinator")
			.field("in_progress", &slot.in_progress)
			.field("settled_cycles", &slot.epoch)
			.finish()
	}
}

/// Broadcast value shared by every caller riding one refresh cycle.
#[derive(Clone, Debug)]
enum CycleOutcome {
	Token(AccessToken),
	Failed { reason: String },
}
impl CycleOutcome {
	fn into_result(self) -> Result<AccessToken> {
		match self {
			Self::Token(token) => Ok(token),
			Self::Failed { reason } => Err(Error::RefreshFailed { reason }),
		}
	}
}

#[derive(Debug, Default)]
struct CycleSlot {
	/// Count of settled cycles; callers stamp this on entry to detect cycles that settled
	/// while they were parked.
	epoch: u64,
	in_progress: bool,
	/// Outcome of the most recently settled cycle; `None` while a refresh is in flight.
	outcome: Option<CycleOutcome>,
}

/// RAII marker for the Refreshing state.
struct InFlight<'a>(&'a Mutex<CycleSlot>);
impl<'a> InFlight<'a> {
	/// Enters Refreshing. The previous outcome is cleared here, before the network call is
	/// issued, so a newly parked waiter can never observe a token broadcast by an earlier
	/// cycle.
	fn begin(cycle: &'a Mutex<CycleSlot>) -> Self {
		let mut slot = cycle.lock();

		slot.in_progress = true;
		slot.outcome = None;

		Self(cycle)
	}

	fn settle(self, outcome: CycleOutcome) {
		let mut slot = self.0.lock();

		slot.epoch += 1;
		slot.outcome = Some(outcome);
	}
}
impl Drop for InFlight<'_> {
	// Runs on settle and on cancellation alike, so the Refreshing flag cannot stick.
	fn drop(&mut self) {
		self.0.lock().in_progress = false;
	}
}
