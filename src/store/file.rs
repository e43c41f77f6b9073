//! Simple file-backed [`DocumentStore`] for single-host deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{
		DocumentStore, DocumentUpdate, NewDocument, StoreError, StoreFuture, StoredDocument,
		expiry_after,
	},
};

/// Persists documents to a JSON file after each mutation.
///
/// A mutation only becomes visible once its snapshot has been written, so memory never runs
/// ahead of the file.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<String, StoredDocument>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { HashMap::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<String, StoredDocument>, StoreError> {
		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		let documents: Vec<StoredDocument> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(documents.into_iter().map(|document| (document.unique_name.clone(), document)).collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, contents: &HashMap<String, StoredDocument>) -> Result<(), StoreError> {
		let snapshot: Vec<_> = contents.values().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl DocumentStore for FileStore {
	fn fetch<'a>(&'a self, key: &'a str) -> StoreFuture<'a, StoredDocument> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			self.inner
				.read()
				.get(key)
				.filter(|document| !document.is_expired_at(now))
				.cloned()
				.ok_or_else(|| StoreError::NotFound { key: key.to_owned() })
		})
	}

	fn create(&self, document: NewDocument) -> StoreFuture<'_, StoredDocument> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let mut guard = self.inner.write();

			if guard.get(&document.unique_name).is_some_and(|existing| !existing.is_expired_at(now))
			{
				return Err(StoreError::Conflict { key: document.unique_name });
			}

			let stored = StoredDocument {
				unique_name: document.unique_name.clone(),
				data: document.data,
				date_created: Some(now),
				date_expires: expiry_after(now, document.ttl)?,
			};
			let mut next = guard.clone();

			next.insert(document.unique_name, stored.clone());
			self.persist(&next)?;

			*guard = next;

			Ok(stored)
		})
	}

	fn update<'a>(
		&'a self,
		key: &'a str,
		update: DocumentUpdate,
	) -> StoreFuture<'a, StoredDocument> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let mut guard = self.inner.write();
			let mut next = guard.clone();
			let updated = match next.get_mut(key) {
				Some(document) if !document.is_expired_at(now) => {
					if update.ttl.is_some() {
						document.date_expires = expiry_after(now, update.ttl)?;
					}

					document.data = update.data;

					document.clone()
				},
				_ => return Err(StoreError::NotFound { key: key.to_owned() }),
			};

			self.persist(&next)?;

			*guard = next;

			Ok(updated)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"sms_status_relay_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn create_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.create(NewDocument {
			unique_name: "sf-auth".into(),
			data: serde_json::json!({ "access_token": "cached" }),
			ttl: Some(Duration::hours(1)),
		}))
		.expect("Failed to create fixture document in file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.fetch("sf-auth"))
			.expect("File store lost document after reopen.");

		assert_eq!(fetched.data["access_token"], "cached");
		assert!(fetched.date_expires.is_some());

		let err = rt
			.block_on(reopened.update("missing", DocumentUpdate { data: JsonValue::Null, ttl: None }))
			.expect_err("Updating a missing document should fail.");

		assert!(err.is_not_found());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn failed_writes_leave_memory_unchanged() {
		let dir = temp_path().with_extension("d");
		let store =
			FileStore::open(dir.join("store.json")).expect("Failed to open nested file store.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.create(NewDocument {
			unique_name: "sf-auth".into(),
			data: serde_json::json!({ "v": 1 }),
			ttl: None,
		}))
		.expect("Failed to create fixture document in file store.");
		fs::remove_dir_all(&dir).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store directory {}: {e}", dir.display())
		});

		let err = rt
			.block_on(store.create(NewDocument {
				unique_name: "other".into(),
				data: JsonValue::Null,
				ttl: None,
			}))
			.expect_err("Create should fail once the snapshot directory is gone.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert!(
			rt.block_on(store.fetch("other"))
				.expect_err("A failed create must not become visible.")
				.is_not_found()
		);

		rt.block_on(store.update(
			"sf-auth",
			DocumentUpdate { data: serde_json::json!({ "v": 2 }), ttl: None },
		))
		.expect_err("Update should fail once the snapshot directory is gone.");

		let kept = rt.block_on(store.fetch("sf-auth")).expect("Original document should remain.");

		assert_eq!(kept.data["v"], 1);
	}
}
