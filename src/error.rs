use alloy::primitives::{Address, B256};

/// Errors surfaced by the ingestion and reconciliation pipeline.
///
/// The retry loop in the ingestor branches on [`IndexerError::is_retryable`]:
/// transient RPC/store failures are retried with backoff, per-event decode
/// failures are not (retrying cannot fix them), and fatal classes take the
/// whole chain worker down.
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    /// Transient transport or node-side failure.
    #[error("rpc: {0}")]
    Rpc(String),

    /// No ABI generation produced a clean decode for this event.
    #[error("no ABI generation decodes {event} ({topics} topics present)")]
    AbiMismatch { event: &'static str, topics: usize },

    /// Topic 0 is not one of the known bridge event signatures. Fail-closed:
    /// this means the bridge contract was upgraded past what we understand.
    #[error("unknown bridge event topic {0}")]
    UnknownTopic(B256),

    /// A validator transaction used an entry point we do not recognize.
    #[error("unknown bridge function selector {0:02x?}")]
    UnknownCall([u8; 4]),

    /// The matching ERC-20 Transfer log could not be located in the receipt.
    #[error("no Transfer of {token} found in receipt of {tx_hash}")]
    DecodeIncomplete { token: Address, tx_hash: B256 },

    /// An event referenced a destination chain we do not index.
    #[error("unknown destination chain id {0}")]
    UnknownChain(u64),

    /// A swap event referenced a pool index outside the discovered token set.
    #[error("token index {index} out of range for {kind} pool on chain {chain_id}")]
    PoolIndex {
        chain_id: u64,
        kind: &'static str,
        index: u8,
    },

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Checkpoint(#[from] redis::RedisError),
}

impl IndexerError {
    /// Whether another attempt can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IndexerError::Rpc(_) | IndexerError::Db(_) | IndexerError::Checkpoint(_)
        )
    }

    /// Whether the chain worker must stop rather than skip the event.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IndexerError::UnknownTopic(_) | IndexerError::Invariant(_)
        )
    }
}
