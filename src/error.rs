//! Gate-level error types shared across the client, coordinator, and collaborators.

// self
use crate::_prelude::*;

/// Gate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gate error exposed by public APIs.
///
/// Callers above the pipeline stage only ever observe a normal response or one of these
/// terminal variants; the intermediate 401/refresh dance is fully absorbed by
/// [`AuthenticatedClient`](crate::client::AuthenticatedClient).
#[derive(Debug, ThisError)]
pub enum Error {
	/// Session-store failure.
	#[error("{0}")]
	Session(
		#[from]
		#[source]
		crate::session::SessionError,
	),
	/// Transport failure surfaced verbatim (network, IO, opaque status).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// No credential is available locally; the caller must authenticate first.
	#[error("No access token is available; log in before sending authenticated requests.")]
	NotAuthenticated,
	/// Server classified the credential itself as invalid; logout has been tripped.
	#[error("Server rejected the credential as invalid; the session has been logged out.")]
	InvalidCredential,
	/// The refresh call failed or produced no usable session; logout has been tripped.
	#[error("Credential refresh failed: {reason}")]
	RefreshFailed {
		/// Reason string broadcast to every request that rode the failed cycle.
		reason: String,
	},
	/// The replayed request was rejected again after a successful refresh.
	#[error("Replayed request was rejected again after a successful credential refresh.")]
	ReplayRejected,
}

/// Transport-level failures classified by status code.
///
/// The gate only needs the status classification: 401 marks an expired credential and
/// triggers the single-flight refresh, 400 marks an invalid credential and escalates to
/// logout, and every other failure is opaque to the authentication machinery.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Server rejected the bearer credential as expired (HTTP 401).
	#[error("Server rejected the bearer credential as expired.")]
	CredentialExpired,
	/// Server rejected the bearer credential as invalid (HTTP 400).
	#[error("Server rejected the bearer credential as invalid.")]
	CredentialInvalid,
	/// Server returned a non-success status outside the credential taxonomy.
	#[error("Server returned an unexpected status: {status}.")]
	Status {
		/// HTTP status code returned by the server.
		status: u16,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Classifies a response status, returning `None` for successful statuses.
	pub fn classify(status: u16) -> Option<Self> {
		match status {
			200..=399 => None,
			401 => Some(Self::CredentialExpired),
			400 => Some(Self::CredentialInvalid),
			status => Some(Self::Status { status }),
		}
	}

	/// Returns the status code carried by status-classified variants.
	pub const fn status_code(&self) -> Option<u16> {
		match self {
			Self::CredentialExpired => Some(401),
			Self::CredentialInvalid => Some(400),
			Self::Status { status } => Some(*status),
			Self::Network { .. } | Self::Io(_) => None,
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
