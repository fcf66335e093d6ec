//! Authentication backend contract consumed by the coordinator.

// self
use crate::{_prelude::*, auth::CurrentUser};

/// Boxed future returned by [`AuthenticationService`] operations.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + 'a + Send>>;

/// Contract for the external authentication backend.
///
/// The gate never implements the authentication protocol itself; it only invokes these two
/// opaque operations. A refresh that resolves with `Ok(None)` means the backend produced no
/// usable session and is treated the same as a failed call: escalate to logout, never retry.
pub trait AuthenticationService
where
	Self: Send + Sync,
{
	/// Exchanges the stored refresh credential for a new user + access token.
	fn refresh_token(&self) -> ServiceFuture<'_, Option<CurrentUser>>;

	/// Clears the authenticated session and signals the caller out of the authenticated flow.
	///
	/// Invoked as a fire-and-forget escalation; its own failure is treated as best-effort by
	/// the gate.
	fn logout(&self) -> ServiceFuture<'_, ()>;
}

/// Error type produced by [`AuthenticationService`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ServiceError {
	/// Backend rejected the refresh credential or the logout call.
	#[error("Authentication backend rejected the request: {message}.")]
	Rejected {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend could not be reached.
	#[error("Authentication backend is unreachable: {message}.")]
	Unreachable {
		/// Human-readable error payload.
		message: String,
	},
}
