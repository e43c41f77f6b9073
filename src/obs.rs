//! Optional observability helpers for relay operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `sms_status_relay.operation` with the
//!   `operation` and `stage` (call site) fields, plus a `debug` event for every cache
//!   classification.
//! - Enable `metrics` to increment `sms_status_relay_operation_total` for every
//!   attempt/success/failure (labeled by `operation` + `outcome`) and
//!   `sms_status_relay_cache_total` for every cache classification (labeled by `state`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Relay operations observed by spans, metrics, and formatted errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Credential cache lookup, including any refresh and cache write it triggers.
	ObtainCredential,
	/// Password-grant exchange against the token endpoint.
	Authenticate,
	/// Authenticated platform event POST.
	SubmitEvent,
}
impl Operation {
	/// Returns a stable snake_case label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::ObtainCredential => "obtain_credential",
			Operation::Authenticate => "authenticate",
			Operation::SubmitEvent => "submit_event",
		}
	}

	/// Returns the operation name used in formatted invocation errors.
	///
	/// These names are what operators search for in function logs, so they must not change.
	pub const fn diagnostic_name(self) -> &'static str {
		match self {
			Operation::ObtainCredential => "getSalesforceAuth",
			Operation::Authenticate => "authToSalesforce",
			Operation::SubmitEvent => "insertPlatformEvent",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.diagnostic_name())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a relay operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn operation_labels_are_stable() {
		assert_eq!(Operation::ObtainCredential.to_string(), "getSalesforceAuth");
		assert_eq!(Operation::Authenticate.to_string(), "authToSalesforce");
		assert_eq!(Operation::SubmitEvent.to_string(), "insertPlatformEvent");
		assert_eq!(Operation::SubmitEvent.as_str(), "submit_event");
		assert_eq!(Outcome::Failure.to_string(), "failure");
	}
}
