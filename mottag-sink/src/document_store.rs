//! Document-store sink
//!
//! Overwrites the feed document of the tracked device with the latest
//! readings: `PUT {base_url}/feed/{device_id}.json`.

use async_trait::async_trait;
use mottag_common::{DocumentStoreConfig, Error};
use mottag_sim::TickSample;
use tracing::{debug, info};

use crate::payload::document_store_body;
use crate::Sink;

/// REST document-store sink backed by `reqwest`.
#[derive(Debug)]
pub struct DocumentStoreSink {
    client: reqwest::Client,
    url: String,
}

impl DocumentStoreSink {
    /// Builds the HTTP client; no request is made until the first publish.
    pub fn new(config: &DocumentStoreConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::SinkTransport(format!("http client: {e}")))?;
        let url = config.feed_url();
        info!("Document-store sink targeting {}", url);
        Ok(Self { client, url })
    }

    /// Feed document URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Sink for DocumentStoreSink {
    fn name(&self) -> &str {
        "document-store"
    }

    async fn publish(&mut self, sample: &TickSample) -> Result<(), Error> {
        let body = document_store_body(&sample.readings, sample.timestamp_ms);
        let response = self
            .client
            .put(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::SinkTransport(format!("PUT {}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::SinkTransport(format!(
                "PUT {} returned {}",
                self.url, status
            )));
        }
        debug!(tick = sample.tick.value(), %status, "feed document updated");
        Ok(())
    }
}
