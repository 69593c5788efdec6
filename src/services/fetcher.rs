use crate::{
    error::{FeeOracleError, UpstreamError},
    metrics,
    models::BlockRecord,
    services::BlockSource,
};
use futures::future;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub concurrency: usize,
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

/// Fetches a window of block heights with a bounded worker pool.
///
/// Workers pull the next unclaimed height from a shared cursor, so no
/// worker idles while others still have items. Heights that fail after the
/// retry budget are dropped from the result rather than failing the batch.
pub struct RangeFetcher {
    source: Arc<dyn BlockSource>,
    policy: FetchPolicy,
}

impl RangeFetcher {
    pub fn new(source: Arc<dyn BlockSource>, policy: FetchPolicy) -> Self {
        Self { source, policy }
    }

    /// Fetch `desired_count` heights ending at `end_height`, `step` apart,
    /// returning the successfully resolved records sorted ascending by
    /// height. Fails only on contract violations, never on per-item
    /// upstream failures.
    pub async fn fetch_range(
        &self,
        end_height: u64,
        desired_count: u64,
        step: u64,
    ) -> Result<Vec<BlockRecord>, FeeOracleError> {
        if desired_count == 0 {
            return Err(FeeOracleError::InvalidArgument(
                "desired_count must be at least 1".to_string(),
            ));
        }
        if step == 0 {
            return Err(FeeOracleError::InvalidArgument(
                "step must be at least 1".to_string(),
            ));
        }
        if self.policy.concurrency == 0 {
            return Err(FeeOracleError::InvalidArgument(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let start_height = end_height.saturating_sub(desired_count - 1);
        let targets: Arc<Vec<u64>> =
            Arc::new((start_height..=end_height).step_by(step as usize).collect());

        let started = Instant::now();
        let cursor = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel(targets.len());

        let workers: Vec<_> = (0..self.policy.concurrency.min(targets.len()))
            .map(|_| {
                let source = Arc::clone(&self.source);
                let targets = Arc::clone(&targets);
                let cursor = Arc::clone(&cursor);
                let tx = tx.clone();
                let policy = self.policy.clone();

                tokio::spawn(async move {
                    loop {
                        let slot = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(&height) = targets.get(slot) else { break };

                        let block = fetch_with_retry(
                            source.as_ref(),
                            height,
                            policy.max_retries,
                            policy.initial_backoff,
                        )
                        .await;

                        if tx.send((slot, block)).await.is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(tx);

        // Fan-in: each worker writes a disjoint pre-assigned slot, then the
        // buffer is filtered and sorted. Completion order is unordered.
        let mut slots: Vec<Option<BlockRecord>> = vec![None; targets.len()];
        while let Some((slot, block)) = rx.recv().await {
            slots[slot] = block;
        }
        future::join_all(workers).await;

        let mut blocks: Vec<BlockRecord> = slots.into_iter().flatten().collect();
        blocks.sort_unstable_by_key(|b| b.number);

        metrics::FETCH_BLOCKS_DURATION.observe(started.elapsed().as_secs_f64());
        tracing::debug!(
            "fetched {}/{} blocks in range [{}, {}]",
            blocks.len(),
            targets.len(),
            start_height,
            end_height
        );

        Ok(blocks)
    }
}

/// One height, one retry policy. Only rate-limit failures are retried;
/// anything else, or an exhausted budget, degrades to `None`.
async fn fetch_with_retry(
    source: &dyn BlockSource,
    height: u64,
    max_retries: u32,
    initial_backoff: Duration,
) -> Option<BlockRecord> {
    let mut backoff = initial_backoff;
    let mut attempt: u32 = 0;

    loop {
        match source.block_by_height(height).await {
            Ok(Some(block)) => return Some(block),
            Ok(None) => {
                tracing::debug!("no block at height {}", height);
                return None;
            }
            Err(UpstreamError::RateLimited(reason)) if attempt < max_retries => {
                attempt += 1;
                tracing::debug!(
                    "rate limited on block {} (attempt {}), backing off {:?}: {}",
                    height,
                    attempt,
                    backoff,
                    reason
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_RETRY_BACKOFF);
            }
            Err(e) => {
                tracing::warn!("giving up on block {}: {}", height, e);
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ethers::types::U256;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn record(number: u64) -> BlockRecord {
        BlockRecord {
            number,
            base_fee_per_gas: Some(U256::from(number) * U256::exp10(9)),
            gas_used: U256::from(15_000_000u64),
            gas_limit: U256::from(30_000_000u64),
        }
    }

    /// Serves every height up to `max_height`, with a height-dependent delay
    /// so completion order differs from height order.
    struct StaticChain {
        max_height: u64,
    }

    #[async_trait]
    impl BlockSource for StaticChain {
        async fn current_height(&self) -> Result<u64, UpstreamError> {
            Ok(self.max_height)
        }

        async fn block_by_height(&self, height: u64) -> Result<Option<BlockRecord>, UpstreamError> {
            tokio::time::sleep(Duration::from_millis(height % 7)).await;
            if height <= self.max_height {
                Ok(Some(record(height)))
            } else {
                Ok(None)
            }
        }

        async fn latest_block(&self) -> Result<Option<BlockRecord>, UpstreamError> {
            Ok(Some(record(self.max_height)))
        }
    }

    /// Fails every call, counting attempts per height.
    struct FailingChain {
        rate_limited: bool,
        attempts: Mutex<HashMap<u64, u32>>,
    }

    impl FailingChain {
        fn new(rate_limited: bool) -> Self {
            Self {
                rate_limited,
                attempts: Mutex::new(HashMap::new()),
            }
        }

        fn attempts_for(&self, height: u64) -> u32 {
            self.attempts.lock().unwrap().get(&height).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl BlockSource for FailingChain {
        async fn current_height(&self) -> Result<u64, UpstreamError> {
            Err(UpstreamError::Request("down".to_string()))
        }

        async fn block_by_height(&self, height: u64) -> Result<Option<BlockRecord>, UpstreamError> {
            *self.attempts.lock().unwrap().entry(height).or_insert(0) += 1;
            if self.rate_limited {
                Err(UpstreamError::RateLimited("too many requests".to_string()))
            } else {
                Err(UpstreamError::Request("boom".to_string()))
            }
        }

        async fn latest_block(&self) -> Result<Option<BlockRecord>, UpstreamError> {
            Err(UpstreamError::Request("down".to_string()))
        }
    }

    fn fetcher(source: Arc<dyn BlockSource>, concurrency: usize, max_retries: u32) -> RangeFetcher {
        RangeFetcher::new(
            source,
            FetchPolicy {
                concurrency,
                max_retries,
                initial_backoff: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn returns_heights_sorted_and_within_range() {
        let fetcher = fetcher(Arc::new(StaticChain { max_height: 1000 }), 4, 0);
        let blocks = fetcher.fetch_range(1000, 10, 3).await.unwrap();

        let heights: Vec<u64> = blocks.iter().map(|b| b.number).collect();
        assert_eq!(heights, vec![991, 994, 997, 1000]);
        assert!(heights.windows(2).all(|w| w[0] < w[1]));
        for h in &heights {
            assert!(*h >= 991 && *h <= 1000);
            assert_eq!((h - 991) % 3, 0);
        }
    }

    #[tokio::test]
    async fn window_larger_than_chain_clamps_to_genesis() {
        let fetcher = fetcher(Arc::new(StaticChain { max_height: 2 }), 2, 0);
        let blocks = fetcher.fetch_range(2, 10, 1).await.unwrap();

        let heights: Vec<u64> = blocks.iter().map(|b| b.number).collect();
        assert_eq!(heights, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn rate_limited_heights_use_full_retry_budget() {
        let chain = Arc::new(FailingChain::new(true));
        let fetcher = fetcher(chain.clone(), 3, 2);

        let blocks = fetcher.fetch_range(10, 4, 1).await.unwrap();
        assert!(blocks.is_empty());

        for height in 7..=10 {
            assert_eq!(chain.attempts_for(height), 3, "height {}", height);
        }
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let chain = Arc::new(FailingChain::new(false));
        let fetcher = fetcher(chain.clone(), 2, 5);

        let blocks = fetcher.fetch_range(5, 3, 1).await.unwrap();
        assert!(blocks.is_empty());

        for height in 3..=5 {
            assert_eq!(chain.attempts_for(height), 1, "height {}", height);
        }
    }

    #[tokio::test]
    async fn zero_desired_count_is_a_contract_violation() {
        let fetcher = fetcher(Arc::new(StaticChain { max_height: 10 }), 2, 0);
        let err = fetcher.fetch_range(10, 0, 1).await.unwrap_err();
        assert!(matches!(err, FeeOracleError::InvalidArgument(_)));

        let err = fetcher.fetch_range(10, 5, 0).await.unwrap_err();
        assert!(matches!(err, FeeOracleError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn single_worker_still_drains_the_queue() {
        let fetcher = fetcher(Arc::new(StaticChain { max_height: 50 }), 1, 0);
        let blocks = fetcher.fetch_range(50, 5, 1).await.unwrap();

        let heights: Vec<u64> = blocks.iter().map(|b| b.number).collect();
        assert_eq!(heights, vec![46, 47, 48, 49, 50]);
    }
}
