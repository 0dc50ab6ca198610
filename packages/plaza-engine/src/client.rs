use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use plaza_service::{BoxFuture, EngineClient, Error, Result};

/// Talks to the engine's `select` endpoint over HTTP. The core hands it a
/// fully rendered parameter list and reads the reply as opaque JSON.
pub struct HttpEngineClient {
	client: Client,
	base_url: String,
}

impl HttpEngineClient {
	pub fn new(cfg: &plaza_config::Engine) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.build()
			.map_err(|err| Error::Engine { message: err.to_string() })?;

		Ok(Self { client, base_url: cfg.base_url.trim_end_matches('/').to_string() })
	}

	async fn run_select(&self, params: &[(String, String)]) -> Result<Value> {
		let url = format!("{}/select", self.base_url);

		debug!(url = %url, params = params.len(), "issuing engine select");

		let res = self
			.client
			.get(&url)
			.query(params)
			.send()
			.await
			.map_err(|err| Error::Engine { message: err.to_string() })?;
		let json = res
			.error_for_status()
			.map_err(|err| Error::Engine { message: err.to_string() })?
			.json()
			.await
			.map_err(|err| Error::Engine { message: err.to_string() })?;

		Ok(json)
	}
}

impl EngineClient for HttpEngineClient {
	fn select<'a>(&'a self, params: &'a [(String, String)]) -> BoxFuture<'a, Result<Value>> {
		Box::pin(self.run_select(params))
	}
}
