//! Transparent bearer-credential pipeline stage for HTTP clients, with single-flight token
//! refresh, ordered replay, and logout escalation built in.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod obs;
pub mod refresh;
pub mod service;
pub mod session;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::AuthenticatedClient,
		http::ReqwestTransport,
		service::AuthenticationService,
		session::{MemorySession, SessionStore},
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = AuthenticatedClient<ReqwestTransport>;

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Constructs an [`AuthenticatedClient`] backed by an in-memory session and the reqwest
	/// transport used across integration tests.
	pub fn build_reqwest_test_client(
		service: Arc<dyn AuthenticationService>,
	) -> (ReqwestTestClient, Arc<MemorySession>) {
		let session_backend = Arc::new(MemorySession::default());
		let session: Arc<dyn SessionStore> = session_backend.clone();
		let client = AuthenticatedClient::with_transport(test_reqwest_transport(), session, service);

		(client, session_backend)
	}
}

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {bearer_gate as _, httpmock as _, tokio as _};
