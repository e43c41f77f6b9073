// std
use std::{env, fs, path::PathBuf, process};
// self
use sms_status_relay::{
	_preludet::*,
	auth::{AuthResponse, CredentialRecord},
	store::{DocumentStore, DocumentUpdate, FileStore, MemoryStore, NewDocument, StoreError},
};

fn credential_document(access: &str) -> JsonValue {
	CredentialRecord::issue(
		AuthResponse::new(access, "https://acme.my.salesforce.com", "Bearer"),
		OffsetDateTime::now_utc(),
		Duration::hours(1),
	)
	.to_document()
	.expect("Credential fixture should encode.")
}

fn new_document(data: JsonValue) -> NewDocument {
	NewDocument { unique_name: "sf-auth".into(), data, ttl: Some(Duration::hours(1)) }
}

fn temp_path() -> PathBuf {
	env::temp_dir().join(format!(
		"sms_status_relay_store_it_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	))
}

async fn exercise_contract(store: &dyn DocumentStore) {
	let err = store.fetch("sf-auth").await.expect_err("Empty store should not hold the key.");

	assert_eq!(err, StoreError::NotFound { key: "sf-auth".into() });

	let err = store
		.update("sf-auth", DocumentUpdate { data: JsonValue::Null, ttl: None })
		.await
		.expect_err("Updating a missing document should fail.");

	assert!(err.is_not_found());

	let created = store
		.create(new_document(credential_document("first")))
		.await
		.expect("Create should succeed on an empty store.");

	assert_eq!(created.unique_name, "sf-auth");
	assert!(created.date_expires.is_some());

	let err = store
		.create(new_document(credential_document("second")))
		.await
		.expect_err("Second create under the same name should conflict.");

	assert_eq!(err, StoreError::Conflict { key: "sf-auth".into() });

	store
		.update(
			"sf-auth",
			DocumentUpdate { data: credential_document("second"), ttl: Some(Duration::hours(2)) },
		)
		.await
		.expect("Update should succeed for an existing document.");

	let fetched = store.fetch("sf-auth").await.expect("Updated document should be readable.");
	let record = CredentialRecord::from_document(&fetched.data)
		.expect("Stored credential should decode.");

	assert_eq!(record.access_token.expose(), "second");
	assert_eq!(fetched.date_created, created.date_created);
	assert!(fetched.date_expires > created.date_expires);
}

#[tokio::test]
async fn memory_store_honours_document_contract() {
	let store = MemoryStore::default();

	exercise_contract(&store).await;

	assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn file_store_honours_document_contract_and_persists() {
	let path = temp_path();

	{
		let store = FileStore::open(&path).expect("File store should open a fresh path.");

		exercise_contract(&store).await;
	}

	let reopened = FileStore::open(&path).expect("File store should reopen its snapshot.");
	let fetched = reopened.fetch("sf-auth").await.expect("Snapshot should keep the document.");
	let record = CredentialRecord::from_document(&fetched.data)
		.expect("Persisted credential should decode.");

	assert_eq!(record.access_token.expose(), "second");
	assert_eq!(record.instance_url, "https://acme.my.salesforce.com");

	fs::remove_file(&path).unwrap_or_else(|e| {
		panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
	});
}

#[tokio::test]
async fn expired_documents_can_be_recreated() {
	let store = MemoryStore::default();

	store
		.create(NewDocument {
			unique_name: "sf-auth".into(),
			data: credential_document("stale"),
			ttl: Some(Duration::ZERO),
		})
		.await
		.expect("Create should succeed on an empty store.");
	store
		.create(new_document(credential_document("fresh")))
		.await
		.expect("A document past its ttl should not block a new create.");

	let fetched = store.fetch("sf-auth").await.expect("Recreated document should be readable.");

	assert_eq!(fetched.data["access_token"], "fresh");
}
