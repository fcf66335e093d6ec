//! Authenticated request pipeline stage.
//!
//! [`AuthenticatedClient`] stamps the current session credential onto every outgoing
//! request, classifies authentication failures, and drives recovery: a 401 delegates to
//! the [`RefreshCoordinator`] and replays the original request exactly once with the fresh
//! token, while a 400 escalates straight to logout. Callers above this stage only ever see
//! a normal response or a terminal error.

// self
use crate::{
	_prelude::*,
	error::TransportError,
	http::{Request, Response, Transport},
	obs::{self, StageKind, StageOutcome, StageSpan},
	refresh::RefreshCoordinator,
	service::AuthenticationService,
	session::SessionStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthenticatedClient = AuthenticatedClient<ReqwestTransport>;

/// Pipeline stage wrapping a transport with transparent bearer authentication.
///
/// The client owns the transport, session store, authentication backend, and the refresh
/// coordinator so request-handling calls can focus on the attach/classify/recover
/// sequence. Cloning is cheap; all components are shared by reference.
#[derive(Clone)]
pub struct AuthenticatedClient<T>
where
	T: ?Sized + Transport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Session store read at request time and written after each refresh.
	pub session: Arc<dyn SessionStore>,
	/// Authentication backend invoked for logout escalation.
	pub service: Arc<dyn AuthenticationService>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> AuthenticatedClient<T>
where
	T: ?Sized + Transport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		transport: impl Into<Arc<T>>,
		session: Arc<dyn SessionStore>,
		service: Arc<dyn AuthenticationService>,
	) -> Self {
		let coordinator = Arc::new(RefreshCoordinator::new(session.clone(), service.clone()));

		Self { transport: transport.into(), session, service, coordinator }
	}

	/// Shared refresh coordinator backing this client.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Sends an authenticated request, transparently recovering from credential expiry.
	///
	/// The request is cloned before the first dispatch so the original can be replayed
	/// after a refresh. Exactly one replay is attempted; a second expiry rejection is
	/// surfaced as [`Error::ReplayRejected`] and never re-refreshed.
	pub async fn send(&self, request: Request) -> Result<Response> {
		const KIND: StageKind = StageKind::Send;

		let span = StageSpan::new(KIND, "send");

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);

		let result = span
			.instrument(async move {
				let token = self.session.current_token().await?.ok_or(Error::NotAuthenticated)?;

				match self.transport.send(request.clone().with_bearer(&token)).await {
					Ok(response) => Ok(response),
					Err(TransportError::CredentialExpired) => self.recover(request).await,
					Err(TransportError::CredentialInvalid) => {
						// The credential itself is invalid rather than merely expired; a
						// refresh cannot help.
						let _ = self.service.logout().await;

						Err(Error::InvalidCredential)
					},
					Err(err) => Err(Error::Transport(err)),
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_stage_outcome(KIND, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
		}

		result
	}

	/// Replays the original request once with a freshly obtained token.
	async fn recover(&self, request: Request) -> Result<Response> {
		const KIND: StageKind = StageKind::Replay;

		let token = self.coordinator.obtain_fresh_token().await?;
		let span = StageSpan::new(KIND, "recover");

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.transport.send(request.with_bearer(&token)).await.map_err(|err| match err {
					// No further 401 handling on the replay.
					TransportError::CredentialExpired => Error::ReplayRejected,
					err => Error::Transport(err),
				})
			})
			.await;

		match &result {
			Ok(_) => obs::record_stage_outcome(KIND, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
		}

		result
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatedClient<ReqwestTransport> {
	/// Creates a new client with a default reqwest transport.
	///
	/// The client provisions its own reqwest-backed transport so callers do not need to
	/// pass HTTP handles explicitly. Use [`AuthenticatedClient::with_transport`] to supply
	/// a preconfigured [`ReqwestTransport`] instead.
	pub fn new(session: Arc<dyn SessionStore>, service: Arc<dyn AuthenticationService>) -> Self {
		Self::with_transport(ReqwestTransport::default(), session, service)
	}
}
impl<T> Debug for AuthenticatedClient<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedClient").field("coordinator", &self.coordinator).finish()
	}
}
