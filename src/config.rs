//! Read-only relay settings plus the builder and variable loaders that validate them.

// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

/// Production login host.
pub const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com";
/// Sandbox login host.
pub const SANDBOX_LOGIN_URL: &str = "https://test.salesforce.com";
/// Password-grant token path appended to the login host.
pub const TOKEN_PATH: &str = "/services/oauth2/token";
/// REST API version used for platform event inserts.
pub const API_VERSION: &str = "v43.0";
/// Platform event object receiving message status updates.
pub const PLATFORM_EVENT_OBJECT: &str = "Twilio_Message_Status__e";
/// Longest accepted credential lifetime; matches the Sync document ttl limit.
pub const MAX_TTL_SECONDS: i64 = 31_536_000;

/// Variable names understood by [`RelayConfig::from_vars`].
pub mod keys {
	/// Sync service holding the cached credential document.
	pub const SYNC_SERVICE_SID: &str = "TWILIO_SYNC_DEFAULT_SERVICE_SID";
	/// Unique name of the cached credential document.
	pub const SYNC_KEY: &str = "SF_SYNC_KEY";
	/// Selects the sandbox login host.
	pub const IS_SANDBOX: &str = "SF_IS_SANDBOX";
	/// Overrides the login host entirely.
	pub const LOGIN_URL: &str = "SF_LOGIN_URL";
	/// Connected app consumer key.
	pub const CONSUMER_KEY: &str = "SF_CONSUMER_KEY";
	/// Connected app consumer secret.
	pub const CONSUMER_SECRET: &str = "SF_CONSUMER_SECRET";
	/// Integration user name.
	pub const USERNAME: &str = "SF_USERNAME";
	/// Integration user password.
	pub const PASSWORD: &str = "SF_PASSWORD";
	/// Integration user security token.
	pub const SECURITY_TOKEN: &str = "SF_TOKEN";
	/// Cached credential lifetime in seconds.
	pub const TTL: &str = "SF_TTL";
	/// Enables the managed-package namespace prefix.
	pub const USE_NAMESPACE: &str = "SF_USE_NAME_SPACE";
	/// Managed-package namespace prefix (including its trailing `__`).
	pub const NAMESPACE: &str = "SF_NAME_SPACE";
	/// Invocation path reported in diagnostics.
	pub const PATH: &str = "PATH";
}

/// Immutable relay configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
	/// Sync service SID; only required by [`TwilioSyncStore`](crate::store::TwilioSyncStore).
	pub sync_service_sid: Option<String>,
	/// Fixed cache key of the credential document.
	pub sync_key: String,
	/// Authenticate against the sandbox login host.
	pub is_sandbox: bool,
	/// Explicit login host; wins over `is_sandbox` when set.
	pub login_url: Option<Url>,
	/// Connected app consumer key.
	pub client_id: String,
	/// Connected app consumer secret.
	pub client_secret: Secret,
	/// Integration user name.
	pub username: String,
	/// Integration user password.
	pub password: Secret,
	/// Integration user security token, appended to the password.
	pub security_token: Secret,
	/// Lifetime applied to cached credentials and to the cache document.
	pub ttl: Duration,
	/// Prefix CRM field and object names with `namespace`.
	pub use_namespace: bool,
	/// Managed-package namespace prefix.
	pub namespace: String,
	/// Invocation path reported in diagnostics.
	pub path: String,
}
impl RelayConfig {
	/// Returns an empty builder.
	pub fn builder() -> RelayConfigBuilder {
		RelayConfigBuilder::default()
	}

	/// Builds a configuration from `(name, value)` pairs using the names in [`keys`].
	///
	/// Unknown names are ignored, so the whole process environment can be passed in.
	pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: Into<String>,
	{
		let vars: HashMap<String, String> =
			vars.into_iter().map(|(k, v)| (k.as_ref().to_owned(), v.into())).collect();
		let get = |key: &str| vars.get(key).map(|value| value.trim()).filter(|v| !v.is_empty());
		let mut builder = RelayConfig::builder();

		if let Some(value) = get(keys::SYNC_SERVICE_SID) {
			builder = builder.sync_service_sid(value);
		}
		if let Some(value) = get(keys::SYNC_KEY) {
			builder = builder.sync_key(value);
		}
		if let Some(value) = get(keys::IS_SANDBOX) {
			builder = builder.sandbox(parse_flag(keys::IS_SANDBOX, value)?);
		}
		if let Some(value) = get(keys::LOGIN_URL) {
			let url = Url::parse(value)
				.map_err(|source| ConfigError::InvalidUrl { key: keys::LOGIN_URL, source })?;

			builder = builder.login_url(url);
		}
		if let Some(value) = get(keys::CONSUMER_KEY) {
			builder = builder.client_id(value);
		}
		if let Some(value) = get(keys::CONSUMER_SECRET) {
			builder = builder.client_secret(value);
		}
		if let Some(value) = get(keys::USERNAME) {
			builder = builder.username(value);
		}
		if let Some(value) = get(keys::PASSWORD) {
			builder = builder.password(value);
		}
		if let Some(value) = get(keys::SECURITY_TOKEN) {
			builder = builder.security_token(value);
		}
		if let Some(value) = get(keys::TTL) {
			let seconds = value.parse::<i64>().map_err(|_| ConfigError::InvalidTtl {
				key: keys::TTL,
				value: value.to_owned(),
			})?;

			builder = builder.ttl(Duration::seconds(seconds));
		}
		if let Some(value) = get(keys::USE_NAMESPACE) {
			builder = builder.use_namespace(parse_flag(keys::USE_NAMESPACE, value)?);
		}
		if let Some(value) = get(keys::NAMESPACE) {
			builder = builder.namespace(value);
		}
		if let Some(value) = get(keys::PATH) {
			builder = builder.path(value);
		}

		builder.build()
	}

	/// Builds a configuration from the current process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_vars(std::env::vars())
	}

	/// Resolves the password-grant token endpoint.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		let base = match &self.login_url {
			Some(url) => url.as_str(),
			None if self.is_sandbox => SANDBOX_LOGIN_URL,
			None => PRODUCTION_LOGIN_URL,
		};
		let raw = format!("{}{TOKEN_PATH}", base.trim_end_matches('/'));

		Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { key: keys::LOGIN_URL, source })
	}

	/// Password submitted with the grant: the user password followed by the security token.
	pub fn grant_password(&self) -> Secret {
		Secret::new(format!("{}{}", self.password.expose(), self.security_token.expose()))
	}

	/// Namespace prefix applied to CRM names, or `""` when namespacing is disabled.
	pub fn namespace_prefix(&self) -> &str {
		if self.use_namespace { &self.namespace } else { "" }
	}

	/// Path of the platform event collection, relative to the instance URL.
	pub fn platform_event_path(&self) -> String {
		let prefix = self.namespace_prefix();

		format!("/services/data/{API_VERSION}/sobjects/{prefix}{PLATFORM_EVENT_OBJECT}")
	}
}

/// Builder for [`RelayConfig`] values.
#[derive(Debug, Default)]
pub struct RelayConfigBuilder {
	sync_service_sid: Option<String>,
	sync_key: Option<String>,
	is_sandbox: bool,
	login_url: Option<Url>,
	client_id: Option<String>,
	client_secret: Option<Secret>,
	username: Option<String>,
	password: Option<Secret>,
	security_token: Option<Secret>,
	ttl: Option<Duration>,
	use_namespace: bool,
	namespace: Option<String>,
	path: Option<String>,
}
impl RelayConfigBuilder {
	/// Sets the Sync service SID.
	pub fn sync_service_sid(mut self, sid: impl Into<String>) -> Self {
		self.sync_service_sid = Some(sid.into());

		self
	}

	/// Sets the cache key of the credential document.
	pub fn sync_key(mut self, key: impl Into<String>) -> Self {
		self.sync_key = Some(key.into());

		self
	}

	/// Selects the sandbox login host.
	pub fn sandbox(mut self, is_sandbox: bool) -> Self {
		self.is_sandbox = is_sandbox;

		self
	}

	/// Overrides the login host.
	pub fn login_url(mut self, url: Url) -> Self {
		self.login_url = Some(url);

		self
	}

	/// Sets the connected app consumer key.
	pub fn client_id(mut self, id: impl Into<String>) -> Self {
		self.client_id = Some(id.into());

		self
	}

	/// Sets the connected app consumer secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(Secret::new(secret));

		self
	}

	/// Sets the integration user name.
	pub fn username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());

		self
	}

	/// Sets the integration user password.
	pub fn password(mut self, password: impl Into<String>) -> Self {
		self.password = Some(Secret::new(password));

		self
	}

	/// Sets the integration user security token.
	pub fn security_token(mut self, token: impl Into<String>) -> Self {
		self.security_token = Some(Secret::new(token));

		self
	}

	/// Sets the cached credential lifetime.
	pub fn ttl(mut self, ttl: Duration) -> Self {
		self.ttl = Some(ttl);

		self
	}

	/// Toggles the namespace prefix.
	pub fn use_namespace(mut self, enabled: bool) -> Self {
		self.use_namespace = enabled;

		self
	}

	/// Sets the namespace prefix.
	pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Some(namespace.into());

		self
	}

	/// Sets the invocation path reported in diagnostics.
	pub fn path(mut self, path: impl Into<String>) -> Self {
		self.path = Some(path.into());

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<RelayConfig, ConfigError> {
		let sync_key = required(self.sync_key, keys::SYNC_KEY)?;
		let client_id = required(self.client_id, keys::CONSUMER_KEY)?;
		let client_secret = required_secret(self.client_secret, keys::CONSUMER_SECRET)?;
		let username = required(self.username, keys::USERNAME)?;
		let password = required_secret(self.password, keys::PASSWORD)?;
		let ttl = self.ttl.ok_or(ConfigError::MissingSetting { key: keys::TTL })?;

		if !ttl.is_positive() {
			return Err(ConfigError::NonPositiveTtl);
		}
		if ttl > Duration::seconds(MAX_TTL_SECONDS) {
			let seconds = ttl.whole_seconds();

			return Err(ConfigError::TtlTooLong { seconds, max: MAX_TTL_SECONDS });
		}

		let namespace = self.namespace.unwrap_or_default();

		if self.use_namespace && namespace.is_empty() {
			return Err(ConfigError::MissingNamespace);
		}

		Ok(RelayConfig {
			sync_service_sid: self.sync_service_sid.filter(|sid| !sid.is_empty()),
			sync_key,
			is_sandbox: self.is_sandbox,
			login_url: self.login_url,
			client_id,
			client_secret,
			username,
			password,
			security_token: self.security_token.unwrap_or_else(|| Secret::new("")),
			ttl,
			use_namespace: self.use_namespace,
			namespace,
			path: self.path.unwrap_or_default(),
		})
	}
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
	value.filter(|v| !v.is_empty()).ok_or(ConfigError::MissingSetting { key })
}

fn required_secret(value: Option<Secret>, key: &'static str) -> Result<Secret, ConfigError> {
	value.filter(|v| !v.is_empty()).ok_or(ConfigError::MissingSetting { key })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
	match value.to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" => Ok(true),
		"false" | "0" | "no" => Ok(false),
		_ => Err(ConfigError::InvalidFlag { key, value: value.to_owned() }),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base_vars() -> Vec<(&'static str, &'static str)> {
		vec![
			(keys::SYNC_SERVICE_SID, "IS123"),
			(keys::SYNC_KEY, "sf-auth"),
			(keys::CONSUMER_KEY, "key"),
			(keys::CONSUMER_SECRET, "secret"),
			(keys::USERNAME, "user@example.com"),
			(keys::PASSWORD, "pw"),
			(keys::SECURITY_TOKEN, "TOKEN"),
			(keys::TTL, "3600"),
			(keys::PATH, "/foo"),
			("HOME", "/root"),
		]
	}

	#[test]
	fn from_vars_reads_known_names() {
		let config = RelayConfig::from_vars(base_vars()).expect("Base vars should be valid.");

		assert_eq!(config.sync_service_sid.as_deref(), Some("IS123"));
		assert_eq!(config.sync_key, "sf-auth");
		assert_eq!(config.ttl, Duration::hours(1));
		assert_eq!(config.path, "/foo");
		assert!(!config.is_sandbox);
		assert!(!config.use_namespace);
		assert_eq!(config.grant_password().expose(), "pwTOKEN");
	}

	#[test]
	fn token_endpoint_follows_sandbox_flag_and_override() {
		let production = RelayConfig::from_vars(base_vars()).expect("Base vars should be valid.");

		assert_eq!(
			production.token_endpoint().expect("Endpoint should resolve.").as_str(),
			"https://login.salesforce.com/services/oauth2/token"
		);

		let mut vars = base_vars();

		vars.push((keys::IS_SANDBOX, "TRUE"));

		let sandbox = RelayConfig::from_vars(vars.clone()).expect("Sandbox vars should be valid.");

		assert_eq!(
			sandbox.token_endpoint().expect("Endpoint should resolve.").as_str(),
			"https://test.salesforce.com/services/oauth2/token"
		);

		vars.push((keys::LOGIN_URL, "http://127.0.0.1:8080/"));

		let overridden = RelayConfig::from_vars(vars).expect("Override vars should be valid.");

		assert_eq!(
			overridden.token_endpoint().expect("Endpoint should resolve.").as_str(),
			"http://127.0.0.1:8080/services/oauth2/token"
		);
	}

	#[test]
	fn namespace_only_applies_when_enabled() {
		let mut vars = base_vars();

		vars.push((keys::NAMESPACE, "tw__"));

		let disabled = RelayConfig::from_vars(vars.clone()).expect("Vars should be valid.");

		assert_eq!(disabled.namespace_prefix(), "");
		assert_eq!(
			disabled.platform_event_path(),
			"/services/data/v43.0/sobjects/Twilio_Message_Status__e"
		);

		vars.push((keys::USE_NAMESPACE, "true"));

		let enabled = RelayConfig::from_vars(vars).expect("Vars should be valid.");

		assert_eq!(enabled.namespace_prefix(), "tw__");
		assert_eq!(
			enabled.platform_event_path(),
			"/services/data/v43.0/sobjects/tw__Twilio_Message_Status__e"
		);
	}

	#[test]
	fn invalid_settings_are_rejected() {
		let mut vars = base_vars();

		vars.retain(|(key, _)| *key != keys::CONSUMER_KEY);

		assert!(matches!(
			RelayConfig::from_vars(vars),
			Err(ConfigError::MissingSetting { key: keys::CONSUMER_KEY })
		));

		let mut vars = base_vars();

		vars.push((keys::USE_NAMESPACE, "maybe"));

		assert!(matches!(RelayConfig::from_vars(vars), Err(ConfigError::InvalidFlag { .. })));

		let mut vars = base_vars();

		vars.retain(|(key, _)| *key != keys::TTL);
		vars.push((keys::TTL, "soon"));

		assert!(matches!(RelayConfig::from_vars(vars), Err(ConfigError::InvalidTtl { .. })));

		let mut vars = base_vars();

		vars.retain(|(key, _)| *key != keys::TTL);
		vars.push((keys::TTL, "0"));

		assert!(matches!(RelayConfig::from_vars(vars), Err(ConfigError::NonPositiveTtl)));

		let mut vars = base_vars();

		vars.retain(|(key, _)| *key != keys::TTL);
		vars.push((keys::TTL, "9223372036854775807"));

		assert!(matches!(
			RelayConfig::from_vars(vars),
			Err(ConfigError::TtlTooLong { seconds: i64::MAX, max: MAX_TTL_SECONDS })
		));

		let mut vars = base_vars();

		vars.retain(|(key, _)| *key != keys::TTL);
		vars.push((keys::TTL, "31536000"));

		assert_eq!(
			RelayConfig::from_vars(vars).expect("The largest ttl should be accepted.").ttl,
			Duration::seconds(MAX_TTL_SECONDS)
		);

		let mut vars = base_vars();

		vars.push((keys::USE_NAMESPACE, "1"));

		assert!(matches!(RelayConfig::from_vars(vars), Err(ConfigError::MissingNamespace)));
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let config = RelayConfig::from_vars(base_vars()).expect("Base vars should be valid.");
		let rendered = format!("{config:?}");

		assert!(!rendered.contains("secret\""));
		assert!(!rendered.contains("TOKEN"));
		assert!(rendered.contains("<redacted>"));
	}
}
