use alloy::consensus::Transaction as _;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log, TransactionReceipt};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::IndexerError;

/// How long a receipt may stay unmined before the event is abandoned to the
/// retry policy.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(10);
const RECEIPT_POLL: Duration = Duration::from_millis(500);

const RETRY_ATTEMPTS: u32 = 3;

/// Connect an HTTP provider for one chain, type-erased so the rest of the
/// pipeline stays free of transport generics.
pub fn connect(url: &str) -> eyre::Result<DynProvider> {
    let url = url
        .parse()
        .map_err(|e| eyre::eyre!("Invalid RPC URL '{}': {}", url, e))?;
    Ok(ProviderBuilder::new().connect_http(url).erased())
}

fn rpc_err(e: impl std::fmt::Display) -> IndexerError {
    IndexerError::Rpc(e.to_string())
}

pub async fn block_number(provider: &DynProvider) -> Result<u64, IndexerError> {
    provider.get_block_number().await.map_err(rpc_err)
}

pub async fn get_logs(provider: &DynProvider, filter: &Filter) -> Result<Vec<Log>, IndexerError> {
    provider.get_logs(filter).await.map_err(rpc_err)
}

pub async fn block_timestamp(provider: &DynProvider, number: u64) -> Result<u64, IndexerError> {
    let block = provider
        .get_block_by_number(BlockNumberOrTag::Number(number))
        .await
        .map_err(rpc_err)?
        .ok_or_else(|| IndexerError::Rpc(format!("block {number} not found")))?;

    Ok(block.header.timestamp)
}

/// Sender and calldata of a transaction, the two pieces the decoder needs.
#[derive(Debug, Clone)]
pub struct TxInfo {
    pub from: Address,
    pub input: Bytes,
}

pub async fn transaction(provider: &DynProvider, hash: B256) -> Result<TxInfo, IndexerError> {
    let tx = provider
        .get_transaction_by_hash(hash)
        .await
        .map_err(rpc_err)?
        .ok_or_else(|| IndexerError::Rpc(format!("transaction {hash} not found")))?;

    Ok(TxInfo {
        from: tx.inner.signer(),
        input: tx.input().clone(),
    })
}

/// Fetch a receipt, polling until the transaction is mined or the timeout
/// elapses. Logs arrive slightly ahead of receipt availability on some RPC
/// providers.
pub async fn wait_for_receipt(
    provider: &DynProvider,
    hash: B256,
) -> Result<TransactionReceipt, IndexerError> {
    let deadline = Instant::now() + RECEIPT_TIMEOUT;

    loop {
        if let Some(receipt) = provider
            .get_transaction_receipt(hash)
            .await
            .map_err(rpc_err)?
        {
            return Ok(receipt);
        }

        if Instant::now() >= deadline {
            return Err(IndexerError::Rpc(format!(
                "receipt for {hash} not available within {}s",
                RECEIPT_TIMEOUT.as_secs()
            )));
        }

        tokio::time::sleep(RECEIPT_POLL).await;
    }
}

/// Install a head filter for new bridge logs (`fromBlock = latest`).
pub async fn install_head_filter(
    provider: &DynProvider,
    address: Address,
    topics: Vec<B256>,
) -> Result<alloy::primitives::U256, IndexerError> {
    let filter = Filter::new()
        .address(address)
        .event_signature(topics)
        .from_block(BlockNumberOrTag::Latest);

    provider.new_filter(&filter).await.map_err(rpc_err)
}

pub async fn poll_filter(
    provider: &DynProvider,
    filter_id: alloy::primitives::U256,
) -> Result<Vec<Log>, IndexerError> {
    provider
        .get_filter_changes(filter_id)
        .await
        .map_err(rpc_err)
}

/// Retry an operation with exponential backoff (1s, 2s, 4s between attempts).
/// Errors that cannot be cured by retrying pass through immediately.
pub async fn retry<F, Fut, T>(what: &str, mut f: F) -> Result<T, IndexerError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, IndexerError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(val) => return Ok(val),
            Err(e) if e.is_retryable() && attempt + 1 < RETRY_ATTEMPTS => {
                let delay = Duration::from_secs(1 << attempt);
                tracing::warn!(
                    what,
                    attempt = attempt + 1,
                    max_attempts = RETRY_ATTEMPTS,
                    delay_s = delay.as_secs(),
                    error = %e,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);

        let result = retry("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(IndexerError::Rpc("connection reset".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_three_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(IndexerError::Rpc("down".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_passes_through_non_retryable_errors() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(IndexerError::UnknownChain(999))
            }
        })
        .await;

        assert!(matches!(result, Err(IndexerError::UnknownChain(999))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
