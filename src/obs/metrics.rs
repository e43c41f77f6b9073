// self
use crate::obs::{Operation, Outcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(operation: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"sms_status_relay_operation_total",
			"operation" => operation.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (operation, outcome);
	}
}

/// Records how a cached credential was classified (`fresh`, `expired`, `absent`, `malformed`).
pub fn record_cache_state(state: &'static str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(state, "classified cached credential");

	#[cfg(feature = "metrics")]
	{
		metrics::counter!("sms_status_relay_cache_total", "state" => state).increment(1);
	}

	#[cfg(not(any(feature = "metrics", feature = "tracing")))]
	{
		let _ = state;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_are_noops_without_a_global_recorder() {
		record_operation_outcome(Operation::Authenticate, Outcome::Failure);
		record_cache_state("expired");
	}
}
