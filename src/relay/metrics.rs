// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for credential lookups.
#[derive(Debug, Default)]
pub struct CacheMetrics {
	fresh_hits: AtomicU64,
	cold_starts: AtomicU64,
	refreshes: AtomicU64,
	failures: AtomicU64,
}
impl CacheMetrics {
	/// Lookups served from an unexpired cached credential.
	pub fn fresh_hits(&self) -> u64 {
		self.fresh_hits.load(Ordering::Relaxed)
	}

	/// Lookups that found no cached document and created one.
	pub fn cold_starts(&self) -> u64 {
		self.cold_starts.load(Ordering::Relaxed)
	}

	/// Lookups that replaced an expired or unreadable cached credential.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Lookups that returned an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_fresh_hit(&self) {
		self.fresh_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cold_start(&self) {
		self.cold_starts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
