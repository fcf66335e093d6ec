//! Thread-safe in-memory [`SessionStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, CurrentUser},
	session::{SessionError, SessionFuture, SessionStore},
};

type SessionSlot = Arc<RwLock<Option<CurrentUser>>>;

/// Thread-safe session backend that keeps the user in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemorySession(SessionSlot);
impl MemorySession {
	/// Creates a session already holding the provided user.
	pub fn with_user(user: CurrentUser) -> Self {
		Self(Arc::new(RwLock::new(Some(user))))
	}

	fn read_user(slot: SessionSlot) -> Option<CurrentUser> {
		slot.read().clone()
	}

	fn write_user(slot: SessionSlot, user: Option<CurrentUser>) -> Result<(), SessionError> {
		*slot.write() = user;

		Ok(())
	}
}
impl SessionStore for MemorySession {
	fn current_user(&self) -> SessionFuture<'_, Option<CurrentUser>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(Self::read_user(slot)) })
	}

	fn current_token(&self) -> SessionFuture<'_, Option<AccessToken>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(Self::read_user(slot).map(|user| user.access_token)) })
	}

	fn set_current_user(&self, user: CurrentUser) -> SessionFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move { Self::write_user(slot, Some(user)) })
	}

	fn clear(&self) -> SessionFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move { Self::write_user(slot, None) })
	}
}
