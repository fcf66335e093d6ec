//! Authenticated principal model persisted by session stores.

// self
use crate::{_prelude::*, auth::token::AccessToken};

/// Principal returned by login and by successful refresh calls.
///
/// The struct is serde-serializable so session stores can persist the whole user alongside
/// its credential, which is what the gate writes back after every successful refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
	/// Stable identifier for the principal.
	pub username: String,
	/// Bearer credential attached to every outgoing request.
	pub access_token: AccessToken,
}
impl CurrentUser {
	/// Creates a user carrying the provided credential.
	pub fn new(username: impl Into<String>, access_token: AccessToken) -> Self {
		Self { username: username.into(), access_token }
	}
}
impl Debug for CurrentUser {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CurrentUser")
			.field("username", &self.username)
			.field("access_token", &"<redacted>")
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn debug_output_redacts_the_credential() {
		let user = CurrentUser::new("alice", AccessToken::new("token-1"));

		assert!(!format!("{user:?}").contains("token-1"));
	}

	#[test]
	fn user_round_trips_through_json() {
		let user = CurrentUser::new("alice", AccessToken::new("token-1"));
		let payload = serde_json::to_string(&user).expect("User should serialize to JSON.");
		let parsed: CurrentUser =
			serde_json::from_str(&payload).expect("Serialized user should deserialize from JSON.");

		assert_eq!(parsed, user);
	}
}
