//! Relay dispatch and restart loop
//!
//! A request is routed by its destination chain family. A connection-level
//! failure anywhere in one attempt restarts the whole resolve, build and
//! submit sequence; everything else reaches the caller unchanged.

use crate::errors::{RelayError, RelayResult};
use crate::metrics::{metrics, Timer};
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::structured_logging::RelayLogger;
use crate::types::{ChainFamily, ConfirmationStatus, SubmissionResult, SwapRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// One destination chain's resolve, build and submit sequence
#[async_trait]
pub trait ChainRelay: Send + Sync {
    fn chain(&self) -> ChainFamily;

    /// Run a single attempt and return the confirmed transaction id
    async fn relay_once(&self, request: &SwapRequest, logger: &RelayLogger) -> RelayResult<String>;
}

pub struct Relayer {
    chains: HashMap<ChainFamily, Arc<dyn ChainRelay>>,
    restart: RetryConfig,
}

pub struct RelayerBuilder {
    chains: HashMap<ChainFamily, Arc<dyn ChainRelay>>,
    restart: RetryConfig,
}

impl RelayerBuilder {
    pub fn with_chain(mut self, relay: Arc<dyn ChainRelay>) -> Self {
        self.chains.insert(relay.chain(), relay);
        self
    }

    pub fn build(self) -> Relayer {
        Relayer {
            chains: self.chains,
            restart: self.restart,
        }
    }
}

impl Relayer {
    pub fn builder(restart: RetryConfig) -> RelayerBuilder {
        RelayerBuilder {
            chains: HashMap::new(),
            restart,
        }
    }

    /// Relay `request` to its destination chain
    pub async fn relay(&self, request: &SwapRequest) -> RelayResult<SubmissionResult> {
        let logger = RelayLogger::new(request.destination_chain, &request.original_tx_hash);
        let chain = self.chains.get(&request.destination_chain).cloned();
        let start = Instant::now();

        metrics().relays_started.inc();
        metrics().active_relays.inc();
        logger.log_relay_start(&request.wallet_address, request.token_path.len());

        let result = match chain {
            Some(chain) => self.run(chain.as_ref(), request, &logger).await,
            None => Err(RelayError::UnsupportedChain(request.destination_chain.to_string())),
        };

        metrics().active_relays.dec();
        let latency_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(submission) => {
                metrics().relays_confirmed.inc();
                logger.log_confirmed(&submission.transaction_hash, latency_ms);
            }
            Err(err) => {
                metrics().relays_failed.with_label_values(&[err.category()]).inc();
                logger.log_failed(err, latency_ms);
            }
        }

        result
    }

    async fn run(
        &self,
        chain: &dyn ChainRelay,
        request: &SwapRequest,
        logger: &RelayLogger,
    ) -> RelayResult<SubmissionResult> {
        let timer = Timer::new();
        let restarts = AtomicU32::new(0);
        let restarts_ref = &restarts;

        let transaction_hash = retry_with_backoff(
            "relay",
            &self.restart,
            RelayError::is_connection_failure,
            |attempt| async move {
                if attempt > 0 {
                    restarts_ref.store(attempt, Ordering::Relaxed);
                    metrics().restarts.inc();
                }
                let result = chain.relay_once(request, logger).await;
                if let Err(err) = &result {
                    if err.is_connection_failure() {
                        logger.log_restart(attempt + 1, err);
                    }
                }
                result
            },
        )
        .await?;
        timer.observe_duration(&metrics().relay_latency);

        Ok(SubmissionResult {
            chain: chain.chain(),
            transaction_hash,
            confirmation_status: ConfirmationStatus::Confirmed,
            restarts: restarts.load(Ordering::Relaxed),
        })
    }
}
