use alloy::primitives::U256;
use alloy::providers::DynProvider;
use alloy::rpc::types::{Filter, Log};
use sqlx::PgPool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::abi;
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::chains::registry::Chain;
use crate::db::repository::{self, InOutcome};
use crate::error::IndexerError;
use crate::indexer::decoder;
use crate::indexer::types::{BridgeEvent, Registries, TxContext};
use crate::rpc;

const TAIL_POLL: Duration = Duration::from_secs(2);

/// Position of a log within its chain, the unit the checkpoint advances by.
#[derive(Debug, Clone, Copy)]
struct LogPosition {
    block: u64,
    tx_index: u64,
}

impl LogPosition {
    fn of(log: &Log) -> Result<Self, IndexerError> {
        let block = log
            .block_number
            .ok_or_else(|| IndexerError::Invariant("log without block number".into()))?;
        let tx_index = log
            .transaction_index
            .ok_or_else(|| IndexerError::Invariant("log without transaction index".into()))?;

        Ok(Self { block, tx_index })
    }
}

/// Closed sweep windows covering `[from, end]`: each spans `width + 1` blocks
/// inclusive, and consecutive windows never overlap.
fn sweep_windows(mut from: u64, end: u64, width: u64) -> Vec<(u64, u64)> {
    let mut spans = Vec::new();
    while from < end {
        spans.push((from, std::cmp::min(from + width, end)));
        from += width + 1;
    }
    spans
}

/// One chain's ingestion worker: a bounded backfill sweep from the
/// checkpoint to the current head, then an open-ended tail poll. Chains are
/// fully isolated; a failure here never blocks the others.
pub struct ChainIndexer {
    chain: Chain,
    provider: DynProvider,
    registries: Registries,
    pg: PgPool,
    checkpoints: CheckpointStore,
    shutdown: CancellationToken,
    /// Highest committed position, mirrored in redis. Keeps checkpoint
    /// writes monotonic and deduplicates the tail against the backfill.
    committed: Option<Checkpoint>,
}

impl ChainIndexer {
    pub fn new(
        chain: Chain,
        provider: DynProvider,
        registries: Registries,
        pg: PgPool,
        checkpoints: CheckpointStore,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            chain,
            provider,
            registries,
            pg,
            checkpoints,
            shutdown,
            committed: None,
        }
    }

    pub async fn run(mut self) -> eyre::Result<()> {
        tracing::info!(
            chain = %self.chain.name,
            chain_id = self.chain.chain_id,
            bridge = %self.chain.bridge,
            "Starting chain indexer"
        );

        self.backfill().await?;

        if !self.shutdown.is_cancelled() {
            tracing::info!(chain = %self.chain.name, "Switching to head polling");
            self.tail().await?;
        }

        tracing::info!(chain = %self.chain.name, "Chain indexer stopped");
        Ok(())
    }

    /// Sweep `[max(checkpoint, configured start), head]` in bounded windows.
    /// Decode failures propagate after retry exhaustion; a supervisor
    /// restart resumes from the checkpoint without re-emitting.
    async fn backfill(&mut self) -> eyre::Result<()> {
        let resume = self
            .checkpoints
            .load(&self.chain.name, self.chain.bridge)
            .await?;
        self.committed = resume;

        let start = resume
            .map(|c| c.block.max(self.chain.start_block))
            .unwrap_or(self.chain.start_block);
        let head = rpc::retry("blockNumber", || rpc::block_number(&self.provider)).await?;

        if start >= head {
            tracing::info!(
                chain = %self.chain.name,
                start,
                head,
                "Already at chain head, skipping backfill"
            );
            return Ok(());
        }

        tracing::info!(
            chain = %self.chain.name,
            start,
            head,
            window = self.chain.max_blocks,
            "Starting backfill"
        );

        let topics = abi::bridge_topics();
        let total_blocks = head - start;
        let mut total_events: u64 = 0;

        for (from, to) in sweep_windows(start, head, self.chain.max_blocks) {
            if self.shutdown.is_cancelled() {
                break;
            }

            let filter = Filter::new()
                .address(self.chain.bridge)
                .event_signature(topics.clone())
                .from_block(from)
                .to_block(to);

            let logs = rpc::retry("getLogs", || rpc::get_logs(&self.provider, &filter)).await?;
            total_events += logs.len() as u64;

            for log in &logs {
                if self.shutdown.is_cancelled() {
                    break;
                }

                // Logs at the resume boundary that were committed before the
                // restart must not be re-emitted.
                if let (Some(resume), Ok(position)) = (resume, LogPosition::of(log)) {
                    if resume.covers(position.block, position.tx_index) {
                        continue;
                    }
                }

                self.handle_log(log).await?;
            }

            let progress = ((to - start) as f64 / total_blocks as f64 * 100.0) as u32;
            tracing::info!(
                chain = %self.chain.name,
                from,
                to,
                events = total_events,
                progress = %format!("{progress}%"),
                "Swept block range"
            );
        }

        tracing::info!(chain = %self.chain.name, events = total_events, "Backfill complete");
        Ok(())
    }

    /// Poll a head filter every two seconds, indefinitely. Per-log failures
    /// are logged and dropped so one poisoned event cannot stall the chain;
    /// fatal classes still take the worker down.
    async fn tail(&mut self) -> eyre::Result<()> {
        let mut filter_id = rpc::retry("newFilter", || {
            rpc::install_head_filter(&self.provider, self.chain.bridge, abi::bridge_topics())
        })
        .await?;

        tracing::info!(chain = %self.chain.name, "Head filter installed");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(TAIL_POLL) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!(chain = %self.chain.name, "Shutdown received, stopping tail");
                    return Ok(());
                }
            }

            let entries = match rpc::poll_filter(&self.provider, filter_id).await {
                Ok(entries) => entries,
                Err(e) => {
                    // Nodes expire idle filters; reinstall rather than die.
                    tracing::warn!(
                        chain = %self.chain.name,
                        error = %e,
                        "Filter poll failed, reinstalling head filter"
                    );
                    filter_id = rpc::retry("newFilter", || {
                        rpc::install_head_filter(
                            &self.provider,
                            self.chain.bridge,
                            abi::bridge_topics(),
                        )
                    })
                    .await?;
                    continue;
                }
            };

            for log in &entries {
                // Filters can surface logs before they are mined; wait for
                // the next poll to deliver them with a position.
                let Ok(position) = LogPosition::of(log) else {
                    tracing::warn!(
                        chain = %self.chain.name,
                        tx_hash = ?log.transaction_hash,
                        "Skipping log without a chain position"
                    );
                    continue;
                };

                // Anything already covered by the backfill checkpoint is a
                // duplicate.
                if let Some(committed) = self.committed {
                    if committed.covers(position.block, position.tx_index) {
                        continue;
                    }
                }

                match self.handle_log(log).await {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => {
                        tracing::error!(
                            chain = %self.chain.name,
                            tx_hash = ?log.transaction_hash,
                            error = %e,
                            "Dropping bridge log after retry exhaustion"
                        );
                    }
                }
            }
        }
    }

    /// Process one log under the retry policy, then advance the checkpoint.
    async fn handle_log(&mut self, log: &Log) -> Result<(), IndexerError> {
        let position = LogPosition::of(log)?;

        rpc::retry("bridge log", || self.process_log(log)).await?;
        self.advance(position).await?;

        Ok(())
    }

    /// Fetch the transaction context, decode, and write. At-least-once: a
    /// crash between the write and the checkpoint advance re-delivers the
    /// log, which the kappa keys absorb.
    async fn process_log(&self, log: &Log) -> Result<(), IndexerError> {
        let position = LogPosition::of(log)?;
        let tx_hash = log
            .transaction_hash
            .ok_or_else(|| IndexerError::Invariant("log without transaction hash".into()))?;

        let timestamp = rpc::block_timestamp(&self.provider, position.block).await?;
        let tx = rpc::transaction(&self.provider, tx_hash).await?;
        let receipt = rpc::wait_for_receipt(&self.provider, tx_hash).await?;

        let ctx = TxContext {
            from: tx.from,
            input: tx.input,
            receipt_logs: receipt.inner.logs().to_vec(),
            timestamp,
        };

        let Some(event) = decoder::decode_log(&self.chain, log, &ctx, &self.registries)? else {
            return Ok(());
        };

        match &event {
            BridgeEvent::Out(out) => {
                let inserted = repository::insert_out(&self.pg, out).await?;
                if inserted {
                    tracing::info!(
                        chain = %self.chain.name,
                        event = out.kind.name(),
                        kappa = %out.kappa,
                        to_chain_id = out.to_chain_id,
                        amount = %self.display_amount(out.sent_token, out.sent_value),
                        "Recorded outbound transfer"
                    );
                }
            }
            BridgeEvent::In(ev) => {
                let outcome = repository::apply_in(&self.pg, ev).await?;
                match outcome {
                    InOutcome::Completed => tracing::info!(
                        chain = %self.chain.name,
                        event = ev.kind.name(),
                        kappa = %ev.kappa,
                        amount = %self.display_amount(ev.received_token, ev.received_value),
                        "Completed transfer"
                    ),
                    InOutcome::Lost => tracing::info!(
                        chain = %self.chain.name,
                        event = ev.kind.name(),
                        kappa = %ev.kappa,
                        "No matching outbound send, recorded as lost"
                    ),
                    InOutcome::Duplicate => tracing::debug!(
                        chain = %self.chain.name,
                        kappa = %ev.kappa,
                        "Duplicate inbound receipt suppressed"
                    ),
                }
            }
        }

        Ok(())
    }

    fn display_amount(&self, token: alloy::primitives::Address, raw: U256) -> String {
        self.registries
            .tokens
            .convert_amount(self.chain.chain_id, token, raw)
            .to_string()
    }

    /// Move the durable checkpoint forward, never backward. The tail can
    /// commit head blocks while older positions are still in flight.
    async fn advance(&mut self, position: LogPosition) -> Result<(), IndexerError> {
        if let Some(committed) = self.committed {
            if committed.covers(position.block, position.tx_index) {
                return Ok(());
            }
        }

        self.checkpoints
            .advance(
                &self.chain.name,
                self.chain.bridge,
                position.block,
                position.tx_index,
            )
            .await?;

        self.committed = Some(Checkpoint {
            block: position.block,
            tx_index: position.tx_index as i64,
        });

        Ok(())
    }
}
