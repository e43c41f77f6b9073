//! Cached Salesforce credential, built from a password-grant response plus computed timestamps.

// self
use crate::{_prelude::*, auth::Secret};

/// Decoded password-grant response from the token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
	/// Bearer token for REST calls.
	pub access_token: Secret,
	/// Org-specific API host that REST calls must target.
	pub instance_url: String,
	/// Token type reported by the provider.
	pub token_type: String,
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
	/// Response fields the relay does not model, kept verbatim.
	#[serde(flatten)]
	pub extra: BTreeMap<String, JsonValue>,
}
impl AuthResponse {
	/// Creates a response carrying only the mandatory fields.
	pub fn new(
		access_token: impl Into<String>,
		instance_url: impl Into<String>,
		token_type: impl Into<String>,
	) -> Self {
		Self {
			access_token: Secret::new(access_token),
			instance_url: instance_url.into(),
			token_type: token_type.into(),
			id: None,
			issued_at: None,
			signature: None,
			scope: None,
			extra: BTreeMap::new(),
		}
	}
}

/// Lifecycle status of a cached credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// Credential can be used.
	Active,
	/// Credential reached its expiry instant.
	Expired,
}

/// Immutable credential stored under the relay's cache key.
///
/// Refreshes replace the whole record; `expires_at` is always `issued_at + ttl`. The JSON
/// shape keeps the provider's response fields at the top level next to `dateCreated` and
/// `dateExpires`, so documents written by earlier deployments still decode.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
	/// Bearer token for REST calls.
	pub access_token: Secret,
	/// Org-specific API host that REST calls must target.
	pub instance_url: String,
	/// Token type reported by the provider.
	pub token_type: String,
	/// Identity URL of the integration user.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	/// Provider issue time, epoch milliseconds as text.
	#[serde(rename = "issued_at", default, skip_serializing_if = "Option::is_none")]
	pub provider_issued_at: Option<String>,
	/// Provider signature over `id` and `issued_at`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub signature: Option<String>,
	/// Scopes granted to the connected app.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Provider fields without a dedicated slot.
	#[serde(flatten)]
	pub extra: BTreeMap<String, JsonValue>,
	/// Instant the relay cached this credential.
	#[serde(rename = "dateCreated", with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	/// Instant after which the credential must be refreshed.
	#[serde(rename = "dateExpires", with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl CredentialRecord {
	/// Builds a record from a fresh grant response, stamped at `issued_at` and valid for `ttl`.
	pub fn issue(response: AuthResponse, issued_at: OffsetDateTime, ttl: Duration) -> Self {
		Self {
			access_token: response.access_token,
			instance_url: response.instance_url,
			token_type: response.token_type,
			id: response.id,
			provider_issued_at: response.issued_at,
			signature: response.signature,
			scope: response.scope,
			extra: response.extra,
			issued_at,
			expires_at: issued_at + ttl,
		}
	}

	/// Computes the lifecycle status at `instant`; expiry is inclusive.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		if instant >= self.expires_at { CredentialStatus::Expired } else { CredentialStatus::Active }
	}

	/// Returns `true` if the record is expired at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), CredentialStatus::Expired)
	}

	/// Returns `true` if the record is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Value for the `Authorization` header of REST calls.
	pub fn authorization_header(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}

	/// Encodes the record as a cache document payload.
	pub fn to_document(&self) -> Result<JsonValue, serde_json::Error> {
		serde_json::to_value(self)
	}

	/// Decodes a cache document payload, reporting the JSON path of any mismatch.
	pub fn from_document(
		data: &JsonValue,
	) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		serde_path_to_error::deserialize(data)
	}
}
impl Debug for CredentialRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialRecord")
			.field("access_token", &"<redacted>")
			.field("instance_url", &self.instance_url)
			.field("token_type", &self.token_type)
			.field("id", &self.id)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
