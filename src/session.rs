//! Session storage contracts and built-in store implementations.
//!
//! The session is the externally owned holder of the current user and its credential. The
//! client only reads the current token at request time; the coordinator writes the whole
//! user back after a successful refresh. Logout clears the session entirely.

pub mod file;
pub mod memory;

pub use file::FileSession;
pub use memory::MemorySession;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, CurrentUser},
};

/// Boxed future returned by [`SessionStore`] operations.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + 'a + Send>>;

/// Storage backend contract for the current user and credential.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Returns the currently persisted user, if any.
	fn current_user(&self) -> SessionFuture<'_, Option<CurrentUser>>;

	/// Returns the current access token, if a user is persisted.
	fn current_token(&self) -> SessionFuture<'_, Option<AccessToken>>;

	/// Persists or replaces the current user together with its credential.
	fn set_current_user(&self, user: CurrentUser) -> SessionFuture<'_, ()>;

	/// Removes the persisted user and credential.
	fn clear(&self) -> SessionFuture<'_, ()>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SessionError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
