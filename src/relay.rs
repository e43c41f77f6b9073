//! Invocation orchestration: obtain a valid credential, translate the event, submit it.
//!
//! [`Relay`] owns the HTTP transport, the document store, and the configuration, so one value
//! can serve every webhook delivery a process receives. Each call to [`Relay::relay`] runs
//! the three external steps sequentially and stops at the first failure, which is returned
//! as an [`InvocationError`] already tagged with the failing operation.

pub mod credential;
pub mod submit;

mod metrics;

pub use credential::{CacheState, WriteMode};
pub use metrics::CacheMetrics;

// self
use crate::{
	_prelude::*,
	config::RelayConfig,
	error::InvocationError,
	event::{self, PlatformEvent, StatusEvent},
	http::RelayHttpClient,
	oauth::TransportErrorMapper,
	store::DocumentStore,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Relay specialized for the crate's default reqwest transport stack.
#[cfg(feature = "reqwest")]
pub type ReqwestRelay = Relay<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Relays status callbacks into platform events using a cached password-grant credential.
pub struct Relay<C, M>
where
	C: ?Sized + RelayHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client used for the token endpoint and the platform event endpoint.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Store holding the cached credential document.
	pub store: Arc<dyn DocumentStore>,
	/// Read-only relay settings.
	pub config: RelayConfig,
	/// In-process counters for cache lookups.
	pub cache_metrics: Arc<CacheMetrics>,
	refresh_guard: Option<Arc<AsyncMutex<()>>>,
}
impl<C, M> Relay<C, M>
where
	C: ?Sized + RelayHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a relay that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn DocumentStore>,
		config: RelayConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			config,
			cache_metrics: Default::default(),
			refresh_guard: None,
		}
	}

	/// Serializes credential lookups (and the refreshes they trigger) within this relay and
	/// its clones.
	///
	/// Concurrent deliveries handled by one process then authenticate once per expiry.
	/// Deliveries handled by other processes sharing the same store can still race.
	pub fn with_refresh_guard(mut self) -> Self {
		self.refresh_guard = Some(Default::default());

		self
	}

	/// Returns `true` when lookups are serialized by [`Relay::with_refresh_guard`].
	pub fn has_refresh_guard(&self) -> bool {
		self.refresh_guard.is_some()
	}

	/// Translates `event` with this relay's namespace settings.
	pub fn translate(&self, event: &StatusEvent) -> PlatformEvent {
		event::translate(&self.config, event)
	}

	/// Handles one status callback end to end and returns the platform event response body.
	pub async fn relay(&self, event: &StatusEvent) -> Result<JsonValue, InvocationError> {
		let credential = self.obtain_valid_credential().await?;
		let payload = self.translate(event);

		self.submit(&credential, &payload).await
	}
}
#[cfg(feature = "reqwest")]
impl Relay<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a relay with its own reqwest-backed transport.
	pub fn new(store: Arc<dyn DocumentStore>, config: RelayConfig) -> Self {
		Self::with_http_client(
			store,
			config,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Clone for Relay<C, M>
where
	C: ?Sized + RelayHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			cache_metrics: self.cache_metrics.clone(),
			refresh_guard: self.refresh_guard.clone(),
		}
	}
}
impl<C, M> Debug for Relay<C, M>
where
	C: ?Sized + RelayHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Relay")
			.field("config", &self.config)
			.field("cache_metrics", &self.cache_metrics)
			.field("refresh_guard", &self.refresh_guard.is_some())
			.finish()
	}
}
