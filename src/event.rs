//! Inbound status callbacks and their translation into platform event payloads.

// self
use crate::{_prelude::*, config::RelayConfig};

/// Recognized status-callback fields and the CRM field each one maps to.
pub const FIELD_MAP: [(&str, &str); 8] = [
	("Body", "Body__c"),
	("To", "To__c"),
	("From", "From__c"),
	("AccountSid", "AccountSid__c"),
	("SmsSid", "MessageSid__c"),
	("MessagingServiceSid", "MessagingServiceSid__c"),
	("SmsStatus", "SmsStatus__c"),
	("ErrorCode", "ErrorCode__c"),
];

/// Flat status callback as delivered by the messaging provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusEvent(BTreeMap<String, String>);
impl StatusEvent {
	/// Creates an empty event.
	pub fn new() -> Self {
		Self::default()
	}

	/// Decodes an `application/x-www-form-urlencoded` webhook body.
	///
	/// Repeated names keep the last value.
	pub fn from_form_urlencoded(body: &[u8]) -> Self {
		url::form_urlencoded::parse(body).into_owned().collect()
	}

	/// Adds or replaces a field.
	pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.0.insert(name.into(), value.into());

		self
	}

	/// Returns the value of `name`, if present.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str)
	}

	/// Iterates over `(name, value)` pairs.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}
}
impl<K, V> FromIterator<(K, V)> for StatusEvent
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

/// Platform event body keyed by CRM field names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformEvent(BTreeMap<String, String>);
impl PlatformEvent {
	/// Returns the value stored under the CRM field `name`.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str)
	}

	/// Number of populated fields.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no recognized field was present.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates over `(crm_field, value)` pairs.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}
}

/// CRM field for the inbound field `name`, without any namespace prefix.
pub fn crm_field(name: &str) -> Option<&'static str> {
	FIELD_MAP.iter().find(|(inbound, _)| *inbound == name).map(|(_, crm)| *crm)
}

/// Inbound field that produced `crm_field` once `prefix` is stripped.
pub fn inbound_field(crm_field: &str, prefix: &str) -> Option<&'static str> {
	let bare = crm_field.strip_prefix(prefix)?;

	FIELD_MAP.iter().find(|(_, crm)| *crm == bare).map(|(inbound, _)| *inbound)
}

/// Copies every recognized field of `event` under its (optionally namespaced) CRM name.
///
/// Unrecognized fields are dropped.
pub fn translate(config: &RelayConfig, event: &StatusEvent) -> PlatformEvent {
	let prefix = config.namespace_prefix();

	PlatformEvent(
		FIELD_MAP
			.iter()
			.filter_map(|(inbound, crm)| {
				event.get(inbound).map(|value| (format!("{prefix}{crm}"), value.to_owned()))
			})
			.collect(),
	)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config(namespace: Option<&str>) -> RelayConfig {
		let builder = RelayConfig::builder()
			.sync_key("sf-auth")
			.client_id("id")
			.client_secret("secret")
			.username("user@example.com")
			.password("pw")
			.ttl(Duration::hours(1));
		let builder = match namespace {
			Some(prefix) => builder.use_namespace(true).namespace(prefix),
			None => builder.namespace("tw__"),
		};

		builder.build().expect("Translator test configuration should be valid.")
	}

	fn full_event() -> StatusEvent {
		FIELD_MAP.iter().map(|(inbound, _)| (*inbound, format!("value-of-{inbound}"))).collect()
	}

	#[test]
	fn translates_recognized_fields_and_drops_the_rest() {
		let event = StatusEvent::new()
			.with("Body", "hi")
			.with("To", "+1555")
			.with("SmsStatus", "delivered")
			.with("ApiVersion", "2010-04-01");
		let payload = translate(&config(None), &event);

		assert_eq!(payload.len(), 3);
		assert_eq!(payload.get("Body__c"), Some("hi"));
		assert_eq!(payload.get("To__c"), Some("+1555"));
		assert_eq!(payload.get("SmsStatus__c"), Some("delivered"));
		assert!(payload.iter().all(|(field, _)| !field.contains("ApiVersion")));
		assert_eq!(
			serde_json::to_value(&payload).expect("Payload should encode."),
			serde_json::json!({ "Body__c": "hi", "To__c": "+1555", "SmsStatus__c": "delivered" })
		);
	}

	#[test]
	fn sms_sid_maps_to_message_sid() {
		let payload = translate(&config(None), &StatusEvent::new().with("SmsSid", "SM123"));

		assert_eq!(payload.get("MessageSid__c"), Some("SM123"));
	}

	#[test]
	fn inverse_mapping_recovers_original_values() {
		for namespace in [None, Some("tw__")] {
			let config = config(namespace);
			let event = full_event();
			let payload = translate(&config, &event);
			let recovered: StatusEvent = payload
				.iter()
				.map(|(field, value)| {
					let inbound = inbound_field(field, config.namespace_prefix())
						.expect("Every CRM field should map back to an inbound field.");

					(inbound, value)
				})
				.collect();

			assert_eq!(recovered, event);
		}
	}

	#[test]
	fn namespace_only_changes_keys() {
		let event = full_event();
		let plain = translate(&config(None), &event);
		let namespaced = translate(&config(Some("tw__")), &event);

		assert_eq!(plain.len(), namespaced.len());

		for (field, value) in plain.iter() {
			assert_eq!(namespaced.get(&format!("tw__{field}")), Some(value));
		}
	}

	#[test]
	fn decodes_form_encoded_webhook_bodies() {
		let event = StatusEvent::from_form_urlencoded(
			b"SmsSid=SM1&SmsStatus=undelivered&ErrorCode=30003&To=%2B15551234567&Body=hi+there",
		);

		assert_eq!(event.get("To"), Some("+15551234567"));
		assert_eq!(event.get("Body"), Some("hi there"));
		assert_eq!(event.get("ErrorCode"), Some("30003"));
		assert_eq!(crm_field("ErrorCode"), Some("ErrorCode__c"));
		assert_eq!(crm_field("ApiVersion"), None);
	}
}
