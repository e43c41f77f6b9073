//! Credential cache manager: reuse the cached credential while it is valid, otherwise
//! authenticate and write the replacement back under the same key.

// self
use crate::{
	_prelude::*,
	auth::{AuthResponse, CredentialRecord},
	error::{InvocationError, format_error},
	http::RelayHttpClient,
	oauth::{PasswordGrantFacade, TransportErrorMapper},
	obs::{self, Operation, OperationSpan, Outcome},
	relay::Relay,
	store::{DocumentUpdate, NewDocument, StoreError, StoredDocument},
};

/// Classification of a credential cache read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheState {
	/// Document decoded and its credential has not expired.
	Fresh(CredentialRecord),
	/// Document decoded but its credential expired.
	Expired(CredentialRecord),
	/// Store reported no document under the key.
	Absent,
	/// Document exists but its data is not a credential record.
	Malformed {
		/// Decoding failure, including the JSON path that did not match.
		reason: String,
	},
}
impl CacheState {
	/// Classifies a store read at `now`.
	///
	/// Only [`StoreError::NotFound`] counts as a cache miss; every other store error is
	/// returned unchanged.
	pub fn classify(
		read: Result<StoredDocument, StoreError>,
		now: OffsetDateTime,
	) -> Result<Self, StoreError> {
		let document = match read {
			Ok(document) => document,
			Err(StoreError::NotFound { .. }) => return Ok(Self::Absent),
			Err(e) => return Err(e),
		};

		Ok(match CredentialRecord::from_document(&document.data) {
			Ok(record) if record.is_expired_at(now) => Self::Expired(record),
			Ok(record) => Self::Fresh(record),
			Err(e) => Self::Malformed { reason: e.to_string() },
		})
	}

	/// Label used by logs and metrics.
	pub const fn label(&self) -> &'static str {
		match self {
			Self::Fresh(_) => "fresh",
			Self::Expired(_) => "expired",
			Self::Absent => "absent",
			Self::Malformed { .. } => "malformed",
		}
	}

	/// Store write needed to replace this entry, or `None` when it can be used as is.
	pub const fn write_mode(&self) -> Option<WriteMode> {
		match self {
			Self::Fresh(_) => None,
			Self::Absent => Some(WriteMode::Create),
			Self::Expired(_) | Self::Malformed { .. } => Some(WriteMode::Update),
		}
	}
}

/// How a refreshed credential is written back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
	/// First write under the key.
	Create,
	/// Overwrite the existing document and reset its ttl.
	Update,
}

impl<C, M> Relay<C, M>
where
	C: ?Sized + RelayHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a credential that is valid now, refreshing the cache when needed.
	///
	/// A cache miss triggers authentication plus a **create**; an expired or undecodable
	/// entry triggers authentication plus an **update**. Any other read failure is fatal.
	pub async fn obtain_valid_credential(&self) -> Result<CredentialRecord, InvocationError> {
		const OPERATION: Operation = Operation::ObtainCredential;

		let span = OperationSpan::new(OPERATION, "obtain_valid_credential");

		obs::record_operation_outcome(OPERATION, Outcome::Attempt);

		let result = span
			.instrument(async move {
				let _serialized = match &self.refresh_guard {
					Some(guard) => Some(guard.lock().await),
					None => None,
				};
				let read = self.store.fetch(&self.config.sync_key).await;
				let state = CacheState::classify(read, OffsetDateTime::now_utc())
					.map_err(|e| format_error(&self.config, OPERATION, Error::CacheRead(e)))?;

				obs::record_cache_state(state.label());

				#[cfg(feature = "tracing")]
				if let CacheState::Malformed { reason } = &state {
					tracing::warn!(%reason, "cached credential could not be decoded");
				}

				if let CacheState::Fresh(record) = state {
					self.cache_metrics.record_fresh_hit();

					return Ok(record);
				}

				let mode = state.write_mode().unwrap_or(WriteMode::Update);
				let record = self.refresh_credential(mode).await?;

				match mode {
					WriteMode::Create => self.cache_metrics.record_cold_start(),
					WriteMode::Update => self.cache_metrics.record_refresh(),
				}

				Ok(record)
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation_outcome(OPERATION, Outcome::Success),
			Err(_) => {
				self.cache_metrics.record_failure();
				obs::record_operation_outcome(OPERATION, Outcome::Failure);
			},
		}

		result
	}

	/// Runs the password grant once against the configured token endpoint.
	pub async fn authenticate(&self) -> Result<AuthResponse, InvocationError> {
		const OPERATION: Operation = Operation::Authenticate;

		let span = OperationSpan::new(OPERATION, "authenticate");

		obs::record_operation_outcome(OPERATION, Outcome::Attempt);

		let result = span
			.instrument(async move {
				let facade = <PasswordGrantFacade<C, M>>::from_config(
					&self.config,
					self.http_client.clone(),
					self.transport_mapper.clone(),
				)?;

				facade.authenticate(&self.config).await.map_err(Error::from)
			})
			.await
			.map_err(|e| format_error(&self.config, OPERATION, e));

		match &result {
			Ok(_) => obs::record_operation_outcome(OPERATION, Outcome::Success),
			Err(_) => obs::record_operation_outcome(OPERATION, Outcome::Failure),
		}

		result
	}

	async fn refresh_credential(
		&self,
		mode: WriteMode,
	) -> Result<CredentialRecord, InvocationError> {
		let response = self.authenticate().await?;
		let record = CredentialRecord::issue(response, OffsetDateTime::now_utc(), self.config.ttl);
		let data = record.to_document().map_err(|e| {
			self.cache_write_error(StoreError::Serialization { message: e.to_string() })
		})?;
		let key = &self.config.sync_key;
		let ttl = Some(self.config.ttl);
		let new_document = |data: JsonValue| NewDocument { unique_name: key.clone(), data, ttl };
		let written = match mode {
			WriteMode::Create => self.store.create(new_document(data)).await,
			// The backend may drop the document at its own ttl between the read and this write.
			WriteMode::Update => {
				let update = DocumentUpdate { data: data.clone(), ttl };

				match self.store.update(key, update).await {
					Err(e) if e.is_not_found() => self.store.create(new_document(data)).await,
					other => other,
				}
			},
		};

		written.map_err(|e| self.cache_write_error(e))?;

		Ok(record)
	}

	fn cache_write_error(&self, error: StoreError) -> InvocationError {
		format_error(&self.config, Operation::ObtainCredential, Error::CacheWrite(error))
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn record(expires_at: OffsetDateTime) -> CredentialRecord {
		CredentialRecord::issue(
			AuthResponse::new("tok", "https://x.my.salesforce.com", "Bearer"),
			expires_at - Duration::hours(1),
			Duration::hours(1),
		)
	}

	fn document(data: JsonValue) -> StoredDocument {
		StoredDocument { unique_name: "sf-auth".into(), data, date_created: None, date_expires: None }
	}

	#[test]
	fn not_found_is_the_only_cache_miss() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		assert_eq!(
			CacheState::classify(Err(StoreError::NotFound { key: "sf-auth".into() }), now),
			Ok(CacheState::Absent)
		);
		assert_eq!(
			CacheState::classify(Err(StoreError::Backend { message: "not found".into() }), now),
			Err(StoreError::Backend { message: "not found".into() })
		);
	}

	#[test]
	fn expiry_is_inclusive() {
		let expires_at = macros::datetime!(2025-01-01 01:00 UTC);
		let data = record(expires_at).to_document().expect("Record should encode.");
		let before = CacheState::classify(
			Ok(document(data.clone())),
			macros::datetime!(2025-01-01 00:59:59 UTC),
		)
		.expect("Decodable documents should classify.");
		let at = CacheState::classify(Ok(document(data)), expires_at)
			.expect("Decodable documents should classify.");

		assert!(matches!(before, CacheState::Fresh(_)));
		assert_eq!(before.write_mode(), None);
		assert!(matches!(at, CacheState::Expired(ref r) if r.access_token.expose() == "tok"));
		assert_eq!(at.write_mode(), Some(WriteMode::Update));
	}

	#[test]
	fn undecodable_documents_are_refreshed_by_update() {
		let state = CacheState::classify(
			Ok(document(serde_json::json!({ "access_token": 42 }))),
			macros::datetime!(2025-01-01 00:00 UTC),
		)
		.expect("Undecodable documents should still classify.");

		assert_eq!(state.label(), "malformed");
		assert_eq!(state.write_mode(), Some(WriteMode::Update));
		assert!(matches!(
			state,
			CacheState::Malformed { ref reason } if reason.contains("access_token")
		));
		assert_eq!(CacheState::Absent.write_mode(), Some(WriteMode::Create));
	}
}
