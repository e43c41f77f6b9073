//! Password-grant facade over the `oauth2` crate plus transport error mapping.

pub use oauth2;

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{
	AccessToken, AuthType, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RefreshToken, RequestTokenError, ResourceOwnerPassword,
	ResourceOwnerUsername, Scope, StandardRevocableToken, TokenResponse, TokenType, TokenUrl,
	basic::{BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{AuthResponse, Secret},
	config::RelayConfig,
	error::{AuthError, TransportError},
	http::{RelayHttpClient, ResponseMetadata, ResponseMetadataSlot},
	obs::Operation,
};

type PasswordClient = Client<
	BasicErrorResponse,
	SalesforceTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AuthError>> + 'a + Send>>;

/// Token type exactly as the provider spelled it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesforceTokenType(pub String);
impl TokenType for SalesforceTokenType {}

/// Password-grant response, kept field for field.
///
/// `scope` stays as the raw space-delimited text and any field the relay does not model is
/// carried in `extra`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SalesforceTokenResponse {
	/// Bearer token for REST calls.
	pub access_token: AccessToken,
	/// Token type, usually `Bearer`.
	pub token_type: SalesforceTokenType,
	/// Org-specific API host.
	pub instance_url: String,
	/// Identity URL of the integration user.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	/// Provider issue time, epoch milliseconds as text.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub issued_at: Option<String>,
	/// Provider signature over `id` and `issued_at`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub signature: Option<String>,
	/// Scopes granted to the connected app.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Remaining response fields.
	#[serde(flatten)]
	pub extra: BTreeMap<String, JsonValue>,
}
impl TokenResponse for SalesforceTokenResponse {
	type TokenType = SalesforceTokenType;

	fn access_token(&self) -> &AccessToken {
		&self.access_token
	}

	fn token_type(&self) -> &SalesforceTokenType {
		&self.token_type
	}

	// The password grant never returns a lifetime; the cache ttl governs expiry.
	fn expires_in(&self) -> Option<StdDuration> {
		None
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		None
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		None
	}
}

/// Maps HTTP transport failures into relay [`TransportError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted while running `operation`.
	fn map_transport_error(
		&self,
		operation: Operation,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> TransportError;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_operation: Operation,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> TransportError {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_timeout() => TransportError::Timeout {
				status: meta_status(meta).or_else(|| inner.status().map(|code| code.as_u16())),
			},
			HttpClientError::Reqwest(inner) => TransportError::from(*inner),
			HttpClientError::Http(inner) => TransportError::Request(inner),
			HttpClientError::Io(inner) => TransportError::Io(inner),
			HttpClientError::Other(message) => TransportError::Other { message },
			_ => TransportError::Other { message: "Unrecognized HTTP client failure".into() },
		}
	}
}

pub(crate) struct PasswordGrantFacade<C, M>
where
	C: ?Sized + RelayHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: PasswordClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> PasswordGrantFacade<C, M>
where
	C: ?Sized + RelayHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds a facade posting client credentials in the request body to the configured
	/// token endpoint.
	pub(crate) fn from_config(
		config: &RelayConfig,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let token_url = TokenUrl::from_url(config.token_endpoint()?);
		let oauth_client: PasswordClient = Client::new(ClientId::new(config.client_id.clone()))
			.set_client_secret(ClientSecret::new(config.client_secret.expose().to_owned()))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(token_url);

		Ok(Self { oauth_client, http_client, error_mapper })
	}

	/// Runs the password grant for the configured integration user.
	pub(crate) fn authenticate<'a>(
		&'a self,
		config: &'a RelayConfig,
	) -> FacadeFuture<'a, AuthResponse> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let handle = self.http_client.with_metadata(meta.clone());
			let username = ResourceOwnerUsername::new(config.username.clone());
			let password = ResourceOwnerPassword::new(config.grant_password().expose().to_owned());
			let response = self
				.oauth_client
				.exchange_password(&username, &password)
				.request_async(&handle)
				.await
				.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;

			Ok(into_auth_response(response))
		})
	}
}

pub(crate) fn into_auth_response(response: SalesforceTokenResponse) -> AuthResponse {
	AuthResponse {
		access_token: Secret::new(response.access_token.into_secret()),
		instance_url: response.instance_url,
		token_type: response.token_type.0,
		id: response.id,
		issued_at: response.issued_at,
		signature: response.signature,
		scope: response.scope,
		extra: response.extra,
	}
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: RequestTokenError<HttpClientError<E>, BasicErrorResponse>,
	mapper: &M,
) -> AuthError
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => AuthError::Rejected {
			reason: response
				.error_description()
				.cloned()
				.unwrap_or_else(|| response.error().as_ref().to_owned()),
			status: meta_status(meta_ref),
		},
		RequestTokenError::Request(error) => AuthError::Transport(mapper.map_transport_error(
			Operation::Authenticate,
			meta_ref,
			error,
		)),
		RequestTokenError::Parse(source, _body) =>
			AuthError::MalformedResponse { source, status: meta_status(meta_ref) },
		RequestTokenError::Other(message) =>
			AuthError::UnexpectedResponse { message, status: meta_status(meta_ref) },
	}
}

pub(crate) fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}
