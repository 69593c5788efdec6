use crate::{error::UpstreamError, models::{BlockRecord, NetworkMeta}};
use anyhow::Result;
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError, RpcError};
use ethers::types::BlockNumber;
use std::sync::Arc;

/// Decides whether a provider failure is a throttling signal worth
/// retrying. Injectable because the exact error taxonomy is an
/// upstream-specific contract.
pub type RateLimitClassifier = fn(&ProviderError) -> bool;

/// Upstream source of blocks. Absent blocks (pre-fork heights, lagging
/// nodes) are `Ok(None)`, not errors.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn current_height(&self) -> Result<u64, UpstreamError>;
    async fn block_by_height(&self, height: u64) -> Result<Option<BlockRecord>, UpstreamError>;
    async fn latest_block(&self) -> Result<Option<BlockRecord>, UpstreamError>;
}

pub struct EthereumSource {
    provider: Arc<Provider<Http>>,
    classifier: RateLimitClassifier,
}

impl EthereumSource {
    pub async fn connect(rpc_url: &str) -> Result<Self> {
        let provider = Arc::new(Provider::<Http>::try_from(rpc_url)?);

        // Test connection
        let block_number = provider.get_block_number().await?;
        tracing::info!("Ethereum RPC connected, current block: {}", block_number);

        Ok(Self {
            provider,
            classifier: default_rate_limit_classifier,
        })
    }

    pub fn with_classifier(mut self, classifier: RateLimitClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub async fn network_meta(&self) -> Result<NetworkMeta, UpstreamError> {
        let chain_id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| self.classify(e))?;
        let block_number = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| self.classify(e))?;

        Ok(NetworkMeta {
            chain_id: chain_id.as_u64(),
            block_number: block_number.as_u64(),
        })
    }

    fn classify(&self, err: ProviderError) -> UpstreamError {
        if (self.classifier)(&err) {
            UpstreamError::RateLimited(err.to_string())
        } else {
            UpstreamError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl BlockSource for EthereumSource {
    async fn current_height(&self) -> Result<u64, UpstreamError> {
        self.provider
            .get_block_number()
            .await
            .map(|n| n.as_u64())
            .map_err(|e| self.classify(e))
    }

    async fn block_by_height(&self, height: u64) -> Result<Option<BlockRecord>, UpstreamError> {
        let block = self
            .provider
            .get_block(height)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(block.and_then(BlockRecord::from_rpc))
    }

    async fn latest_block(&self) -> Result<Option<BlockRecord>, UpstreamError> {
        let block = self
            .provider
            .get_block(BlockNumber::Latest)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(block.and_then(BlockRecord::from_rpc))
    }
}

/// Default classification: JSON-RPC throttling code -32005, HTTP 429, or a
/// throttling message from the node.
pub fn default_rate_limit_classifier(err: &ProviderError) -> bool {
    if let ProviderError::JsonRpcClientError(inner) = err {
        if let Some(resp) = inner.as_error_response() {
            if resp.code == -32005 {
                return true;
            }
            let message = resp.message.to_lowercase();
            return message.contains("too many requests") || message.contains("rate limit");
        }
    }

    let message = err.to_string().to_lowercase();
    message.contains("429") || message.contains("too many requests") || message.contains("rate limit")
}
