//! Relays two status callbacks through a mocked Salesforce org with the default reqwest
//! transport and an in-memory document store; only the first delivery authenticates.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use sms_status_relay::{
	config::RelayConfig,
	event::StatusEvent,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	relay::Relay,
	reqwest::Client,
	store::{DocumentStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let instance_url = server.base_url();
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/services/oauth2/token");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"access_token": "demo-access",
				"instance_url": instance_url,
				"token_type": "Bearer"
			}));
		})
		.await;
	let event_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/services/data/v43.0/sobjects/Twilio_Message_Status__e")
				.header("authorization", "Bearer demo-access");
			then.status(201)
				.header("content-type", "application/json")
				.json_body(json!({ "id": "e00xx0000000001AAA", "success": true, "errors": [] }));
		})
		.await;
	let config = RelayConfig::builder()
		.sync_key("sf-auth")
		.login_url(Url::parse(&instance_url)?)
		.client_id("demo-consumer-key")
		.client_secret("demo-consumer-secret")
		.username("relay@example.com")
		.password("demo-password")
		.security_token("DEMOTOKEN")
		.ttl(time::Duration::hours(1))
		.path("/sms-status")
		.build()?;
	let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::default());
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let relay = <Relay<ReqwestHttpClient, ReqwestTransportErrorMapper>>::with_http_client(
		store,
		config,
		http_client,
		Arc::new(ReqwestTransportErrorMapper),
	);

	for status in ["sent", "delivered"] {
		let body = format!(
			"SmsSid=SM0001&SmsStatus={status}&To=%2B15550100&From=%2B15550199&ApiVersion=2010-04-01"
		);
		let event = StatusEvent::from_form_urlencoded(body.as_bytes());
		let response = relay.relay(&event).await?;

		println!("Relayed `{status}`: {response}.");
	}

	token_mock.assert_calls_async(1).await;
	event_mock.assert_calls_async(2).await;

	println!(
		"Cache lookups: {} cold start, {} fresh hit.",
		relay.cache_metrics.cold_starts(),
		relay.cache_metrics.fresh_hits()
	);

	Ok(())
}
