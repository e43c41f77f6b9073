//! Relay-level error taxonomy plus the formatter that stamps invocation context onto failures.

// self
use crate::{_prelude::*, config::RelayConfig, obs::Operation, store::StoreError};

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
///
/// A missing cache document never shows up here: [`StoreError::NotFound`] is consumed by the
/// credential cache and turned into a cold-start refresh.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Cache read failed for a reason other than a missing document.
	#[error("Credential cache read failed: {0}")]
	CacheRead(#[source] StoreError),
	/// Cache create/update failed after a successful authentication.
	#[error("Credential cache write failed: {0}")]
	CacheWrite(#[source] StoreError),
	/// Password grant against the token endpoint failed.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Platform event submission failed.
	#[error(transparent)]
	Submit(#[from] SubmitError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required setting was not supplied.
	#[error("Missing required setting `{key}`.")]
	MissingSetting {
		/// Setting name.
		key: &'static str,
	},
	/// A boolean flag could not be interpreted.
	#[error("Setting `{key}` must be a boolean flag, got `{value}`.")]
	InvalidFlag {
		/// Setting name.
		key: &'static str,
		/// Raw value that failed to parse.
		value: String,
	},
	/// The token ttl is not a whole number of seconds.
	#[error("Setting `{key}` must be a whole number of seconds, got `{value}`.")]
	InvalidTtl {
		/// Setting name.
		key: &'static str,
		/// Raw value that failed to parse.
		value: String,
	},
	/// The token ttl must be strictly positive.
	#[error("The token ttl must be positive.")]
	NonPositiveTtl,
	/// The token ttl exceeds the longest lifetime the cache accepts.
	#[error("The token ttl of {seconds}s exceeds the {max}s limit.")]
	TtlTooLong {
		/// Requested ttl in seconds.
		seconds: i64,
		/// Largest accepted ttl in seconds.
		max: i64,
	},
	/// Namespacing is enabled but no namespace prefix was provided.
	#[error("Namespace usage is enabled but the namespace prefix is empty.")]
	MissingNamespace,
	/// A configured URL could not be parsed.
	#[error("Setting `{key}` is not a valid URL.")]
	InvalidUrl {
		/// Setting name.
		key: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised by the password-grant exchange.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint answered with an OAuth error body (bad credentials, locked user, etc.).
	#[error("Token endpoint rejected the password grant: {reason}.")]
	Rejected {
		/// Provider-supplied error description or code.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with JSON that does not match the expected token response.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with something other than a token or an OAuth error.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	UnexpectedResponse {
		/// Summary of the unexpected response.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint could not be reached.
	#[error("Token endpoint is unreachable.")]
	Transport(#[source] TransportError),
}

/// Failures raised while posting a platform event.
#[derive(Debug, ThisError)]
pub enum SubmitError {
	/// Endpoint answered with a non-success status.
	#[error("Platform event endpoint returned HTTP {status}: {body}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body: String,
	},
	/// Endpoint answered with a success status but the body is not JSON.
	#[error("Platform event endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
	},
	/// Endpoint could not be reached.
	#[error("Platform event endpoint is unreachable.")]
	Transport(#[source] TransportError),
	/// Instance URL combined with the event path does not form a valid URL.
	#[error("Platform event URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP request could not be assembled.
	#[error("Platform event request could not be built.")]
	Request(#[source] oauth2::http::Error),
	/// Payload could not be encoded as JSON.
	#[error("Platform event payload could not be encoded.")]
	Encode(#[source] serde_json::Error),
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request timed out inside the transport.
	#[error("Request timed out.")]
	Timeout {
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred.")]
	Io(#[from] std::io::Error),
	/// Request could not be converted for the transport.
	#[error("HTTP request is invalid.")]
	Request(#[from] oauth2::http::Error),
	/// Any other transport failure.
	#[error("HTTP client error: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Failure surfaced at the invocation boundary, stamped with the invocation path and the
/// operation that failed.
#[derive(Debug, ThisError)]
#[error("Function path: {path} | Operation: {operation} | Error: {message}")]
pub struct InvocationError {
	/// Invocation path taken from [`RelayConfig::path`].
	pub path: String,
	/// Operation that produced the failure.
	pub operation: Operation,
	message: String,
	source: Error,
}
impl InvocationError {
	/// Returns the underlying relay error.
	pub fn error(&self) -> &Error {
		&self.source
	}

	/// Consumes the wrapper and returns the underlying relay error.
	pub fn into_error(self) -> Error {
		self.source
	}
}

/// Wraps `error` with the invocation path from `config` and the failing `operation`.
///
/// The rendered message carries the whole source chain so callers that only log the string
/// still see the transport or provider cause.
pub fn format_error(
	config: &RelayConfig,
	operation: Operation,
	error: impl Into<Error>,
) -> InvocationError {
	let source = error.into();
	let message = render_chain(&source);

	InvocationError { path: config.path.clone(), operation, message, source }
}

fn render_chain(error: &(dyn StdError + 'static)) -> String {
	let mut message = error.to_string();
	let mut current = error.source();

	while let Some(cause) = current {
		let cause_message = cause.to_string();

		if !message.contains(&cause_message) {
			message.push_str(": ");
			message.push_str(&cause_message);
		}

		current = cause.source();
	}

	message
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config(path: &str) -> RelayConfig {
		RelayConfig::builder()
			.sync_key("sf-auth")
			.client_id("id")
			.client_secret("secret")
			.username("user@example.com")
			.password("pw")
			.ttl(Duration::seconds(60))
			.path(path)
			.build()
			.expect("Error test configuration should be valid.")
	}

	#[test]
	fn formatted_error_embeds_path_and_operation() {
		let err = format_error(
			&config("/foo"),
			Operation::Authenticate,
			AuthError::Rejected { reason: "authentication failure".into(), status: Some(400) },
		);
		let rendered = err.to_string();

		assert!(rendered.contains("/foo"));
		assert!(rendered.contains("authToSalesforce"));
		assert!(rendered.contains("authentication failure"));
		assert!(matches!(err.error(), Error::Auth(AuthError::Rejected { .. })));
	}

	#[test]
	fn formatted_error_renders_source_chain_once() {
		let err = format_error(
			&config("/sms"),
			Operation::SubmitEvent,
			SubmitError::Transport(TransportError::Other { message: "connection reset".into() }),
		);
		let rendered = err.to_string();

		assert!(rendered.contains("Platform event endpoint is unreachable."));
		assert!(rendered.contains("connection reset"));
		assert_eq!(rendered.matches("connection reset").count(), 1);
	}

	#[test]
	fn store_errors_stay_reachable_as_sources() {
		let store_error = StoreError::Backend { message: "sync unavailable".into() };
		let err = format_error(
			&config("/sms"),
			Operation::ObtainCredential,
			Error::CacheRead(store_error.clone()),
		);
		let source = StdError::source(&err)
			.expect("Invocation error should expose the relay error as its source.");

		assert!(source.to_string().contains("sync unavailable"));
		assert!(matches!(err.into_error(), Error::CacheRead(inner) if inner == store_error));
	}
}
