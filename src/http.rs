//! Transport primitives for authenticated requests.
//!
//! The module exposes the [`Transport`] contract alongside clonable [`Request`] and
//! [`Response`] models so the gate can replay an original request byte-for-byte after a
//! credential refresh. Implementations classify response statuses through
//! [`TransportError::classify`](crate::error::TransportError::classify) so the client only
//! ever reasons about the credential taxonomy, never raw status codes.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, auth::AccessToken, error::TransportError};

/// Header stamped onto every outgoing request.
pub const AUTHORIZATION: &str = "Authorization";

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Response, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing authenticated requests.
///
/// The trait is the gate's only dependency on an HTTP stack. Implementations must resolve
/// with [`TransportError::CredentialExpired`] on HTTP 401 and
/// [`TransportError::CredentialInvalid`] on HTTP 400 so the client can drive refresh and
/// logout escalation; every other non-success status maps to the opaque
/// [`TransportError::Status`] variant.
pub trait Transport
where
	Self: Send + Sync,
{
	/// Sends the request and resolves with the classified outcome.
	fn send(&self, request: Request) -> TransportFuture<'_>;
}

/// HTTP methods supported by the request model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP PATCH.
	Patch,
	/// HTTP DELETE.
	Delete,
	/// HTTP HEAD.
	Head,
}
impl Method {
	/// Returns the canonical uppercase method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
			Method::Head => "HEAD",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
#[cfg(feature = "reqwest")]
impl From<Method> for reqwest::Method {
	fn from(method: Method) -> Self {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
			Method::Head => reqwest::Method::HEAD,
		}
	}
}

/// Clonable outgoing request model.
///
/// The client clones the request before the first dispatch so the original can be replayed
/// with a fresh credential if the first attempt is rejected as expired.
#[derive(Clone, Debug)]
pub struct Request {
	/// HTTP method.
	pub method: Method,
	/// Target URL.
	pub url: Url,
	/// Header name/value pairs in insertion order.
	pub headers: Vec<(String, String)>,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl Request {
	/// Creates a request for the provided method + URL.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), body: None }
	}

	/// Convenience constructor for GET requests.
	pub fn get(url: Url) -> Self {
		Self::new(Method::Get, url)
	}

	/// Convenience constructor for POST requests.
	pub fn post(url: Url) -> Self {
		Self::new(Method::Post, url)
	}

	/// Appends a header, keeping any existing values for the same name.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Attaches a request body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Stamps the bearer credential, replacing any previously attached one.
	///
	/// Pure transform with no failure mode; replay after a refresh goes through this exact
	/// path so a stale `Authorization` header can never survive.
	pub fn with_bearer(mut self, token: &AccessToken) -> Self {
		self.headers.retain(|(name, _)| !name.eq_ignore_ascii_case(AUTHORIZATION));
		self.headers.push((AUTHORIZATION.into(), format!("Bearer {}", token.expose())));

		self
	}

	/// Returns the first value of the named header, if present.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(header, _)| header.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Response model carrying the status, headers, and the full body.
#[derive(Clone, Debug)]
pub struct Response {
	/// HTTP status code.
	pub status: u16,
	/// Header name/value pairs as returned by the server.
	pub headers: Vec<(String, String)>,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl Response {
	/// Returns `true` for 2xx statuses.
	pub const fn is_success(&self) -> bool {
		matches!(self.status, 200..=299)
	}

	/// Returns the body decoded as UTF-8, if valid.
	pub fn text(&self) -> Option<&str> {
		std::str::from_utf8(&self.body).ok()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The wrapper performs the status classification contract of [`Transport`] on top of
/// reqwest: bodies are fully read before classification so rejected responses never leave
/// a connection in a half-consumed state.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: Request) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(request.method.into(), request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			match TransportError::classify(status) {
				Some(err) => Err(err),
				None => Ok(Response { status, headers, body }),
			}
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url() -> Url {
		Url::parse("https://api.example.com/items").expect("Failed to parse test URL.")
	}

	#[test]
	fn bearer_attachment_replaces_previous_credential() {
		let stale = AccessToken::new("stale");
		let fresh = AccessToken::new("fresh");
		let request = Request::get(url()).with_bearer(&stale).with_bearer(&fresh);
		let attached: Vec<_> = request
			.headers
			.iter()
			.filter(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION))
			.collect();

		assert_eq!(attached.len(), 1);
		assert_eq!(request.header(AUTHORIZATION), Some("Bearer fresh"));
	}

	#[test]
	fn bearer_attachment_preserves_unrelated_headers() {
		let token = AccessToken::new("token-1");
		let request = Request::post(url())
			.with_header("Content-Type", "application/json")
			.with_body(br#"{"name":"demo"}"#.to_vec())
			.with_bearer(&token);

		assert_eq!(request.header("content-type"), Some("application/json"));
		assert_eq!(request.header(AUTHORIZATION), Some("Bearer token-1"));
		assert!(request.body.is_some());
	}

	#[test]
	fn method_names_are_canonical() {
		assert_eq!(Method::Get.as_str(), "GET");
		assert_eq!(Method::Delete.to_string(), "DELETE");
	}

	#[test]
	fn success_statuses_cover_2xx_only() {
		let response = Response { status: 204, headers: Vec::new(), body: Vec::new() };

		assert!(response.is_success());

		let response = Response { status: 302, headers: Vec::new(), body: Vec::new() };

		assert!(!response.is_success());
	}
}
