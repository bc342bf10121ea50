//! HTTP webhook mirror.
//!
//! POSTs the summary as a JSON document with a `text/plain` content type.
//! Spreadsheet script endpoints reject the CORS preflight that
//! `application/json` would trigger from browsers, so the ingestion side
//! expects plain text and parses the body itself.

use crate::{MirrorError, MirrorFactory, MirrorInterface, MirrorRegistry};
use async_trait::async_trait;
use std::time::Duration;
use trigal_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, OrderSummary, Schema, ValidationError,
};

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Webhook mirror backend.
pub struct WebhookMirror {
	client: reqwest::Client,
	url: String,
}

impl WebhookMirror {
	pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, MirrorError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| MirrorError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			url: url.into(),
		})
	}
}

#[async_trait]
impl MirrorInterface for WebhookMirror {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(WebhookMirrorSchema)
	}

	async fn send(&self, summary: &OrderSummary) -> Result<(), MirrorError> {
		let body =
			serde_json::to_string(summary).map_err(|e| MirrorError::Serialization(e.to_string()))?;

		let response = self
			.client
			.post(&self.url)
			.header(reqwest::header::CONTENT_TYPE, "text/plain;charset=utf-8")
			.body(body)
			.send()
			.await
			.map_err(|e| MirrorError::Network(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			return Err(MirrorError::Rejected {
				status: status.as_u16(),
			});
		}
		Ok(())
	}
}

/// Configuration schema for WebhookMirror.
pub struct WebhookMirrorSchema;

impl ConfigSchema for WebhookMirrorSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("url", FieldType::Url)],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(120),
				},
			)],
		)
		.validate(config)
	}
}

/// Factory function to create a webhook mirror from configuration.
///
/// Configuration parameters:
/// - `url`: endpoint receiving the summaries (required)
/// - `timeout_seconds`: request timeout (default: 10)
pub fn create_mirror(config: &toml::Value) -> Result<Box<dyn MirrorInterface>, MirrorError> {
	WebhookMirrorSchema
		.validate(config)
		.map_err(|e| MirrorError::Configuration(e.to_string()))?;

	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| MirrorError::Configuration("url is required".into()))?;
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|secs| secs as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(WebhookMirror::new(url, Duration::from_secs(timeout))?))
}

/// Registry for the webhook mirror implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "webhook";
	type Factory = MirrorFactory;

	fn factory() -> Self::Factory {
		create_mirror
	}
}

impl MirrorRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{http::HeaderMap, http::StatusCode, routing::post, Router};
	use rust_decimal::Decimal;
	use std::sync::Arc;
	use tokio::sync::Mutex;
	use trigal_types::OrderStatus;

	async fn spawn_endpoint(status: StatusCode) -> (String, Arc<Mutex<Vec<(String, String)>>>) {
		let received = Arc::new(Mutex::new(Vec::new()));
		let sink = received.clone();
		let app = Router::new().route(
			"/exec",
			post(move |headers: HeaderMap, body: String| {
				let sink = sink.clone();
				async move {
					let content_type = headers
						.get("content-type")
						.and_then(|v| v.to_str().ok())
						.unwrap_or_default()
						.to_string();
					sink.lock().await.push((content_type, body));
					status
				}
			}),
		);

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		(format!("http://{}/exec", addr), received)
	}

	fn summary() -> OrderSummary {
		OrderSummary {
			id: "o-42".to_string(),
			client: "Sucursal Norte".to_string(),
			total: Decimal::new(12550, 2),
			status: OrderStatus::InProduction,
		}
	}

	#[tokio::test]
	async fn test_posts_plain_text_json() {
		let (url, received) = spawn_endpoint(StatusCode::OK).await;
		let mirror = WebhookMirror::new(url, Duration::from_secs(5)).unwrap();

		mirror.send(&summary()).await.unwrap();

		let received = received.lock().await;
		assert_eq!(received.len(), 1);
		assert!(received[0].0.starts_with("text/plain"));
		let body: serde_json::Value = serde_json::from_str(&received[0].1).unwrap();
		assert_eq!(body["id"], "o-42");
		assert_eq!(body["cliente"], "Sucursal Norte");
		assert_eq!(body["total"], 125.5);
		assert_eq!(body["estado"], "en_produccion");
	}

	#[tokio::test]
	async fn test_non_success_status_is_rejected() {
		let (url, _) = spawn_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;
		let mirror = WebhookMirror::new(url, Duration::from_secs(5)).unwrap();

		assert!(matches!(
			mirror.send(&summary()).await,
			Err(MirrorError::Rejected { status: 500 })
		));
	}

	#[test]
	fn test_factory_validates_config() {
		let config: toml::Value = toml::from_str("timeout_seconds = 5").unwrap();
		assert!(matches!(
			create_mirror(&config),
			Err(MirrorError::Configuration(_))
		));

		let config: toml::Value =
			toml::from_str("url = \"https://script.example.com/exec\"").unwrap();
		assert!(create_mirror(&config).is_ok());
	}
}
