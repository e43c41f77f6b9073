//! Twilio Sync-backed [`DocumentStore`] speaking the Sync REST API.
//!
//! Documents live under `{base}/Services/{service_sid}/Documents/{unique_name}`. Requests use
//! HTTP basic auth with the account SID and auth token; writes are form-encoded with the
//! document data serialized as JSON text.

// self
use crate::{
	_prelude::*,
	auth::Secret,
	config::{RelayConfig, keys},
	error::ConfigError,
	store::{DocumentStore, DocumentUpdate, NewDocument, StoreError, StoreFuture, StoredDocument},
};

/// Public Sync API root.
pub const SYNC_API_BASE_URL: &str = "https://sync.twilio.com/v1";

const NOT_FOUND_CODE: u32 = 20404;

/// Document store backed by a Twilio Sync service.
#[derive(Clone, Debug)]
pub struct TwilioSyncStore {
	client: ReqwestClient,
	base_url: String,
	service_sid: String,
	account_sid: String,
	auth_token: Secret,
}
impl TwilioSyncStore {
	/// Creates a store for `service_sid`, authenticating as `account_sid`.
	pub fn new(
		service_sid: impl Into<String>,
		account_sid: impl Into<String>,
		auth_token: impl Into<String>,
	) -> Self {
		Self {
			client: ReqwestClient::default(),
			base_url: SYNC_API_BASE_URL.into(),
			service_sid: service_sid.into(),
			account_sid: account_sid.into(),
			auth_token: Secret::new(auth_token),
		}
	}

	/// Creates a store for the Sync service named in `config`.
	pub fn from_config(
		config: &RelayConfig,
		account_sid: impl Into<String>,
		auth_token: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let service_sid = config
			.sync_service_sid
			.clone()
			.ok_or(ConfigError::MissingSetting { key: keys::SYNC_SERVICE_SID })?;

		Ok(Self::new(service_sid, account_sid, auth_token))
	}

	/// Replaces the HTTP client.
	pub fn with_client(mut self, client: ReqwestClient) -> Self {
		self.client = client;

		self
	}

	/// Points the store at a different API root (regional edges, test servers).
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();

		self
	}

	fn documents_url(&self, key: Option<&str>) -> Result<Url, StoreError> {
		let mut url = Url::parse(&self.base_url).map_err(|e| StoreError::Backend {
			message: format!("Invalid Sync base URL {}: {e}", self.base_url),
		})?;

		{
			let mut segments = url.path_segments_mut().map_err(|_| StoreError::Backend {
				message: format!("Sync base URL {} cannot carry a path", self.base_url),
			})?;

			segments.pop_if_empty().extend(["Services", self.service_sid.as_str(), "Documents"]);

			if let Some(key) = key {
				segments.push(key);
			}
		}

		Ok(url)
	}

	async fn send(
		&self,
		request: reqwest::RequestBuilder,
		key: &str,
	) -> Result<StoredDocument, StoreError> {
		let response = request
			.basic_auth(&self.account_sid, Some(self.auth_token.expose()))
			.send()
			.await
			.map_err(|e| StoreError::Backend { message: format!("Sync request failed: {e}") })?;
		let status = response.status();
		let body = response.bytes().await.map_err(|e| StoreError::Backend {
			message: format!("Failed to read Sync response: {e}"),
		})?;

		if status.is_success() {
			let resource = serde_json::from_slice::<SyncDocumentResource>(&body).map_err(|e| {
				StoreError::Serialization { message: format!("Failed to parse Sync document: {e}") }
			})?;

			return Ok(resource.into_document(key));
		}

		let detail = serde_json::from_slice::<SyncErrorResource>(&body).ok();

		match (status.as_u16(), detail.as_ref().and_then(|d| d.code)) {
			(404, None | Some(NOT_FOUND_CODE)) => Err(StoreError::NotFound { key: key.to_owned() }),
			(409, _) => Err(StoreError::Conflict { key: key.to_owned() }),
			(code, _) => Err(StoreError::Backend {
				message: match detail {
					Some(SyncErrorResource { code: Some(error_code), message: Some(message) }) =>
						format!("Sync returned HTTP {code} (error {error_code}): {message}"),
					_ => format!("Sync returned HTTP {code}"),
				},
			}),
		}
	}
}
impl DocumentStore for TwilioSyncStore {
	fn fetch<'a>(&'a self, key: &'a str) -> StoreFuture<'a, StoredDocument> {
		Box::pin(async move {
			let url = self.documents_url(Some(key))?;

			self.send(self.client.get(url), key).await
		})
	}

	fn create(&self, document: NewDocument) -> StoreFuture<'_, StoredDocument> {
		Box::pin(async move {
			let url = self.documents_url(None)?;
			let mut form = vec![
				("UniqueName", document.unique_name.clone()),
				("Data", document.data.to_string()),
			];

			if let Some(ttl) = document.ttl {
				form.push(("Ttl", ttl.whole_seconds().to_string()));
			}

			self.send(self.client.post(url).form(&form), &document.unique_name).await
		})
	}

	fn update<'a>(
		&'a self,
		key: &'a str,
		update: DocumentUpdate,
	) -> StoreFuture<'a, StoredDocument> {
		Box::pin(async move {
			let url = self.documents_url(Some(key))?;
			let mut form = vec![("Data", update.data.to_string())];

			if let Some(ttl) = update.ttl {
				form.push(("Ttl", ttl.whole_seconds().to_string()));
			}

			self.send(self.client.post(url).form(&form), key).await
		})
	}
}

#[derive(Deserialize)]
struct SyncDocumentResource {
	unique_name: Option<String>,
	#[serde(default)]
	data: JsonValue,
	#[serde(default, with = "time::serde::rfc3339::option")]
	date_created: Option<OffsetDateTime>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	date_expires: Option<OffsetDateTime>,
}
impl SyncDocumentResource {
	fn into_document(self, key: &str) -> StoredDocument {
		StoredDocument {
			unique_name: self.unique_name.unwrap_or_else(|| key.to_owned()),
			data: self.data,
			date_created: self.date_created,
			date_expires: self.date_expires,
		}
	}
}

#[derive(Deserialize)]
struct SyncErrorResource {
	code: Option<u32>,
	message: Option<String>,
}
