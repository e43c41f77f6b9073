//! Key/value document store contract and the built-in backends that cache the credential.

pub mod file;
pub mod memory;
#[cfg(feature = "reqwest")] pub mod sync;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "reqwest")] pub use sync::TwilioSyncStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`DocumentStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Shared document store addressed by unique name.
///
/// Implementations report a missing document as [`StoreError::NotFound`] and nothing else;
/// callers rely on that variant to tell a cold cache apart from a broken backend.
pub trait DocumentStore
where
	Self: Send + Sync,
{
	/// Fetches the document stored under `key`.
	fn fetch<'a>(&'a self, key: &'a str) -> StoreFuture<'a, StoredDocument>;

	/// Creates a new document; fails with [`StoreError::Conflict`] if the name is taken.
	fn create(&self, document: NewDocument) -> StoreFuture<'_, StoredDocument>;

	/// Replaces the data of an existing document and resets its ttl when one is supplied.
	fn update<'a>(&'a self, key: &'a str, update: DocumentUpdate)
	-> StoreFuture<'a, StoredDocument>;
}

/// Document as returned by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
	/// Unique name the document is addressed by.
	pub unique_name: String,
	/// Opaque JSON payload.
	pub data: JsonValue,
	/// Creation instant, when the backend reports it.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub date_created: Option<OffsetDateTime>,
	/// Instant the backend will discard the document, if it has a ttl.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub date_expires: Option<OffsetDateTime>,
}
impl StoredDocument {
	/// Returns `true` once the backend-level ttl has elapsed at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.date_expires.is_some_and(|expires| instant >= expires)
	}
}

/// Payload for [`DocumentStore::create`].
#[derive(Clone, Debug, PartialEq)]
pub struct NewDocument {
	/// Unique name for the new document.
	pub unique_name: String,
	/// Opaque JSON payload.
	pub data: JsonValue,
	/// Optional lifetime after which the backend discards the document.
	pub ttl: Option<Duration>,
}

/// Payload for [`DocumentStore::update`].
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentUpdate {
	/// Replacement JSON payload.
	pub data: JsonValue,
	/// Optional new lifetime, counted from the update.
	pub ttl: Option<Duration>,
}

/// Error type produced by [`DocumentStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// No live document exists under the key.
	#[error("Document `{key}` was not found.")]
	NotFound {
		/// Requested key.
		key: String,
	},
	/// A document with the same unique name already exists.
	#[error("Document `{key}` already exists.")]
	Conflict {
		/// Conflicting key.
		key: String,
	},
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl StoreError {
	/// Returns `true` for the cache-miss classification.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. })
	}
}

/// Expiry instant for a document written at `now` with `ttl`.
pub(crate) fn expiry_after(
	now: OffsetDateTime,
	ttl: Option<Duration>,
) -> Result<Option<OffsetDateTime>, StoreError> {
	ttl.map(|ttl| {
		now.checked_add(ttl).ok_or_else(|| StoreError::Backend {
			message: format!("Document ttl of {}s is out of range", ttl.whole_seconds()),
		})
	})
	.transpose()
}
