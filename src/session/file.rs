//! Simple file-backed [`SessionStore`] for lightweight deployments and bots.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, CurrentUser},
	session::{SessionError, SessionFuture, SessionStore},
};

/// Persists the current user to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileSession {
	path: PathBuf,
	inner: Arc<RwLock<Option<CurrentUser>>>,
}
impl FileSession {
	/// Opens (or creates) a session at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { None };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<Option<CurrentUser>, SessionError> {
		if !path.exists() {
			return Ok(None);
		}

		let metadata = path.metadata().map_err(|e| SessionError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| SessionError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| SessionError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), SessionError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| SessionError::Backend {
				message: format!("Failed to create session directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, contents: &Option<CurrentUser>) -> Result<(), SessionError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| SessionError::Serialization {
				message: format!("Failed to serialize session snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| SessionError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| SessionError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| SessionError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| SessionError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl SessionStore for FileSession {
	fn current_user(&self) -> SessionFuture<'_, Option<CurrentUser>> {
		Box::pin(async move { Ok(self.inner.read().clone()) })
	}

	fn current_token(&self) -> SessionFuture<'_, Option<AccessToken>> {
		Box::pin(async move { Ok(self.inner.read().as_ref().map(|user| user.access_token.clone())) })
	}

	fn set_current_user(&self, user: CurrentUser) -> SessionFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			*guard = Some(user);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn clear(&self) -> SessionFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			*guard = None;
			self.persist_locked(&guard)?;

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process, time::{SystemTime, UNIX_EPOCH}};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let nanos = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.expect("System clock should be past the epoch.")
			.as_nanos();
		let unique = format!("bearer_gate_file_session_{}_{nanos}.json", process::id());

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path();
		let session = FileSession::open(&path).expect("Failed to open file session snapshot.");
		let user = CurrentUser::new("alice", AccessToken::new("token-file"));
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file session test.");

		rt.block_on(session.set_current_user(user.clone()))
			.expect("Failed to save fixture user to file session.");
		drop(session);

		let reopened = FileSession::open(&path).expect("Failed to reopen file session snapshot.");
		let fetched = rt
			.block_on(reopened.current_user())
			.expect("Failed to fetch fixture user from file session.")
			.expect("File session lost user after reopen.");

		assert_eq!(fetched, user);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary session snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn clear_removes_the_persisted_user() {
		let path = temp_path();
		let session = FileSession::open(&path).expect("Failed to open file session snapshot.");
		let user = CurrentUser::new("bob", AccessToken::new("token-clear"));
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file session test.");

		rt.block_on(session.set_current_user(user)).expect("Failed to save fixture user.");
		rt.block_on(session.clear()).expect("Failed to clear file session.");

		let reopened = FileSession::open(&path).expect("Failed to reopen file session snapshot.");
		let fetched =
			rt.block_on(reopened.current_user()).expect("Failed to fetch from file session.");

		assert!(fetched.is_none());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary session snapshot {}: {e}", path.display())
		});
	}
}
