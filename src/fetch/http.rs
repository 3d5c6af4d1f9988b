use async_trait::async_trait;
use reqwest::Client;

use crate::app::Result;
use crate::fetch::{FetchConfig, Fetcher};

pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_config(FetchConfig::default())
    }

    pub fn with_config(config: FetchConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()
            .expect("Failed to build HTTP client");

        Self { client, config }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;

        let body = response
            .text_with_charset(&self.config.fallback_charset)
            .await?;

        tracing::debug!("Fetched {} ({} bytes)", url, body.len());

        Ok(body)
    }
}
