//! Event submitter: one authenticated POST of the translated payload to the platform event
//! collection on the credential's instance.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::CredentialRecord,
	error::{InvocationError, SubmitError, format_error},
	event::PlatformEvent,
	http::{RelayHttpClient, ResponseMetadataSlot},
	oauth::TransportErrorMapper,
	obs::{self, Operation, OperationSpan, Outcome},
	relay::Relay,
};

const BODY_PREVIEW_LIMIT: usize = 256;
const JSON: &str = "application/json";

impl<C, M> Relay<C, M>
where
	C: ?Sized + RelayHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Posts `payload` to `{instance_url}{platform event path}` with the credential's bearer
	/// token and returns the decoded response body.
	///
	/// An empty success body decodes as `null`.
	pub async fn submit(
		&self,
		credential: &CredentialRecord,
		payload: &PlatformEvent,
	) -> Result<JsonValue, InvocationError> {
		const OPERATION: Operation = Operation::SubmitEvent;

		let span = OperationSpan::new(OPERATION, "submit");

		obs::record_operation_outcome(OPERATION, Outcome::Attempt);

		let result = span
			.instrument(self.submit_inner(credential, payload))
			.await
			.map_err(|e| format_error(&self.config, OPERATION, e));

		match &result {
			Ok(_) => obs::record_operation_outcome(OPERATION, Outcome::Success),
			Err(_) => obs::record_operation_outcome(OPERATION, Outcome::Failure),
		}

		result
	}

	/// Absolute platform event URL for `credential`.
	pub fn platform_event_url(&self, credential: &CredentialRecord) -> Result<Url, SubmitError> {
		let raw = format!(
			"{}{}",
			credential.instance_url.trim_end_matches('/'),
			self.config.platform_event_path()
		);

		Url::parse(&raw).map_err(|source| SubmitError::InvalidUrl { url: raw, source })
	}

	async fn submit_inner(
		&self,
		credential: &CredentialRecord,
		payload: &PlatformEvent,
	) -> Result<JsonValue, SubmitError> {
		let url = self.platform_event_url(credential)?;
		let body = serde_json::to_vec(payload).map_err(SubmitError::Encode)?;
		let request: HttpRequest = oauth2::http::Request::builder()
			.method(Method::POST)
			.uri(url.as_str())
			.header(AUTHORIZATION, credential.authorization_header())
			.header(CONTENT_TYPE, JSON)
			.header(ACCEPT, JSON)
			.body(body)
			.map_err(SubmitError::Request)?;
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let response = handle.call(request).await.map_err(|e| {
			SubmitError::Transport(self.transport_mapper.map_transport_error(
				Operation::SubmitEvent,
				meta.take().as_ref(),
				e,
			))
		})?;
		let status = response.status().as_u16();
		let body = response.body();

		if !response.status().is_success() {
			return Err(SubmitError::Rejected { status, body: preview(body) });
		}
		if body.iter().all(u8::is_ascii_whitespace) {
			return Ok(JsonValue::Null);
		}

		serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(body))
			.map_err(|source| SubmitError::MalformedResponse { source, status })
	}
}

fn preview(body: &[u8]) -> String {
	String::from_utf8_lossy(body).chars().take(BODY_PREVIEW_LIMIT).collect()
}
