//! Relay SMS status callbacks into Salesforce platform events, reusing an OAuth password-grant
//! token cached in a shared document store so most invocations skip re-authentication.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod event;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod relay;
pub mod store;

#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and fixtures shared by unit tests, integration tests, and demos.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::RelayConfig,
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		relay::Relay,
		store::{DocumentStore, MemoryStore},
	};

	/// Relay type alias used by reqwest-backed integration tests.
	pub type ReqwestTestRelay = Relay<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Returns a validated configuration whose token endpoint lives under `login_url`.
	pub fn test_config(login_url: &str) -> RelayConfig {
		RelayConfig::builder()
			.sync_service_sid("IS00000000000000000000000000000000")
			.sync_key("sf-auth")
			.login_url(Url::parse(login_url).expect("Test login URL should parse."))
			.client_id("consumer-key")
			.client_secret("consumer-secret")
			.username("relay@example.com")
			.password("hunter2")
			.security_token("SECTOKEN")
			.ttl(Duration::hours(1))
			.path("/sms-status")
			.build()
			.expect("Test relay configuration should be valid.")
	}

	/// Constructs a [`Relay`] backed by an in-memory store and the reqwest transport used
	/// across integration tests.
	pub fn build_reqwest_test_relay(config: RelayConfig) -> (ReqwestTestRelay, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn DocumentStore> = store_backend.clone();
		let relay = Relay::with_http_client(
			store,
			config,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		);

		(relay, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as JsonValue;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
