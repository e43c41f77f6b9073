//! Thread-safe in-memory [`DocumentStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{
		DocumentStore, DocumentUpdate, NewDocument, StoreError, StoreFuture, StoredDocument,
		expiry_after,
	},
};

type DocumentMap = Arc<RwLock<HashMap<String, StoredDocument>>>;

/// Storage backend that keeps documents in-process and honours their ttl on read.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(DocumentMap);
impl MemoryStore {
	/// Returns the number of live documents.
	pub fn len(&self) -> usize {
		let now = OffsetDateTime::now_utc();

		self.0.read().values().filter(|document| !document.is_expired_at(now)).count()
	}

	/// Returns `true` when no live document is stored.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn fetch_now(map: DocumentMap, key: &str) -> Result<StoredDocument, StoreError> {
		let now = OffsetDateTime::now_utc();
		let mut guard = map.write();

		match guard.get(key) {
			Some(document) if !document.is_expired_at(now) => Ok(document.clone()),
			Some(_) => {
				guard.remove(key);

				Err(StoreError::NotFound { key: key.to_owned() })
			},
			None => Err(StoreError::NotFound { key: key.to_owned() }),
		}
	}

	fn create_now(map: DocumentMap, document: NewDocument) -> Result<StoredDocument, StoreError> {
		let now = OffsetDateTime::now_utc();
		let mut guard = map.write();

		if guard.get(&document.unique_name).is_some_and(|existing| !existing.is_expired_at(now)) {
			return Err(StoreError::Conflict { key: document.unique_name });
		}

		let stored = StoredDocument {
			unique_name: document.unique_name.clone(),
			data: document.data,
			date_created: Some(now),
			date_expires: expiry_after(now, document.ttl)?,
		};

		guard.insert(document.unique_name, stored.clone());

		Ok(stored)
	}

	fn update_now(
		map: DocumentMap,
		key: &str,
		update: DocumentUpdate,
	) -> Result<StoredDocument, StoreError> {
		let now = OffsetDateTime::now_utc();
		let mut guard = map.write();

		match guard.get_mut(key) {
			Some(document) if !document.is_expired_at(now) => {
				if update.ttl.is_some() {
					document.date_expires = expiry_after(now, update.ttl)?;
				}

				document.data = update.data;

				Ok(document.clone())
			},
			_ => Err(StoreError::NotFound { key: key.to_owned() }),
		}
	}
}
impl DocumentStore for MemoryStore {
	fn fetch<'a>(&'a self, key: &'a str) -> StoreFuture<'a, StoredDocument> {
		let map = self.0.clone();

		Box::pin(async move { Self::fetch_now(map, key) })
	}

	fn create(&self, document: NewDocument) -> StoreFuture<'_, StoredDocument> {
		let map = self.0.clone();

		Box::pin(async move { Self::create_now(map, document) })
	}

	fn update<'a>(
		&'a self,
		key: &'a str,
		update: DocumentUpdate,
	) -> StoreFuture<'a, StoredDocument> {
		let map = self.0.clone();

		Box::pin(async move { Self::update_now(map, key, update) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn update_resets_ttl_and_keeps_created_date() {
		let store = MemoryStore::default();
		let created = store
			.create(NewDocument {
				unique_name: "sf-auth".into(),
				data: serde_json::json!({ "v": 1 }),
				ttl: Some(Duration::seconds(10)),
			})
			.await
			.expect("Create should succeed on an empty store.");
		let updated = store
			.update(
				"sf-auth",
				DocumentUpdate {
					data: serde_json::json!({ "v": 2 }),
					ttl: Some(Duration::hours(1)),
				},
			)
			.await
			.expect("Update should succeed for an existing document.");

		assert_eq!(updated.date_created, created.date_created);
		assert!(updated.date_expires > created.date_expires);
		assert_eq!(updated.data["v"], 2);
		assert_eq!(store.len(), 1);
	}

	#[tokio::test]
	async fn out_of_range_ttl_is_rejected_without_writing() {
		let store = MemoryStore::default();
		let err = store
			.create(NewDocument {
				unique_name: "sf-auth".into(),
				data: JsonValue::Null,
				ttl: Some(Duration::seconds(i64::MAX)),
			})
			.await
			.expect_err("An unrepresentable expiry should fail the create.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn elapsed_ttl_reads_as_not_found() {
		let store = MemoryStore::default();

		store
			.create(NewDocument {
				unique_name: "short-lived".into(),
				data: JsonValue::Null,
				ttl: Some(Duration::ZERO),
			})
			.await
			.expect("Create should succeed on an empty store.");

		let err = store.fetch("short-lived").await.expect_err("Elapsed ttl should hide the document.");

		assert!(err.is_not_found());
		assert!(store.is_empty());
	}
}
