//! HTTP client for the note indexer service.

use async_trait::async_trait;
use note_indexer_types::{IndexerAck, IndexerRequest, RpcResponse};
use std::time::Duration;

use crate::error::{PlanError, PlanResult};
use super::NoteIndexer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEDUPE_HEADER: &str = "Idempotency-Key";

pub struct HttpIndexer {
    base_url: String,
    client: reqwest::Client,
}

impl HttpIndexer {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("[INDEXER] Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn rpc_url(&self) -> String {
        format!("{}/rpc/index", self.base_url)
    }
}

#[async_trait]
impl NoteIndexer for HttpIndexer {
    async fn send(&self, request: &IndexerRequest, dedupe_key: Option<&str>) -> PlanResult<()> {
        let mut builder = self.client.post(self.rpc_url()).json(request);
        if let Some(key) = dedupe_key {
            builder = builder.header(DEDUPE_HEADER, key);
        }

        let resp: RpcResponse<IndexerAck> = builder
            .send()
            .await
            .map_err(|e| PlanError::Network(format!("Indexer service unavailable: {}", e)))?
            .json()
            .await
            .map_err(|e| PlanError::Network(format!("Invalid response from indexer service: {}", e)))?;

        if resp.success {
            if resp.data.is_some_and(|ack| ack.duplicate) {
                log::debug!("[INDEXER] {} already applied remotely", request.action_name());
            }
            Ok(())
        } else {
            Err(PlanError::Network(
                resp.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}
