use alloy::primitives::Address;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::IndexerError;

/// Resume position of one (chain, contract) log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    /// Highest block whose logs have been durably written.
    pub block: u64,
    /// Transaction index of the last committed log within `block`; -1 when
    /// only the block counter exists.
    pub tx_index: i64,
}

impl Checkpoint {
    /// Whether a log at `(block, tx_index)` is already covered by this
    /// checkpoint and must not be re-emitted.
    pub fn covers(&self, block: u64, tx_index: u64) -> bool {
        block < self.block || (block == self.block && tx_index as i64 <= self.tx_index)
    }
}

fn block_key(namespace: &str, chain: &str, address: Address) -> String {
    format!("{chain}:{namespace}:{address}:MAX_BLOCK_STORED")
}

fn index_key(namespace: &str, chain: &str, address: Address) -> String {
    format!("{chain}:{namespace}:{address}:TX_INDEX")
}

/// Redis-backed checkpoint counters. Values are decimal strings with no TTL;
/// each chain's ingestor is the single writer for its keys.
#[derive(Clone)]
pub struct CheckpointStore {
    conn: ConnectionManager,
    namespace: String,
}

impl CheckpointStore {
    pub async fn connect(host: &str, port: u16, namespace: &str) -> eyre::Result<Self> {
        let client = redis::Client::open(format!("redis://{host}:{port}"))
            .map_err(|e| eyre::eyre!("Invalid redis address {}:{}: {}", host, port, e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| eyre::eyre!("Failed to connect to redis at {}:{}: {}", host, port, e))?;

        Ok(Self {
            conn,
            namespace: namespace.to_string(),
        })
    }

    pub async fn load(
        &self,
        chain: &str,
        address: Address,
    ) -> Result<Option<Checkpoint>, IndexerError> {
        let mut conn = self.conn.clone();

        let block: Option<String> = conn.get(block_key(&self.namespace, chain, address)).await?;
        let Some(block) = block else {
            return Ok(None);
        };
        let block = block
            .parse()
            .map_err(|_| IndexerError::Invariant(format!("malformed checkpoint block '{block}'")))?;

        let tx_index: Option<String> = conn.get(index_key(&self.namespace, chain, address)).await?;
        let tx_index = match tx_index {
            Some(raw) => raw.parse().map_err(|_| {
                IndexerError::Invariant(format!("malformed checkpoint tx index '{raw}'"))
            })?,
            None => -1,
        };

        Ok(Some(Checkpoint { block, tx_index }))
    }

    /// Record that every log up to and including `(block, tx_index)` has
    /// been committed.
    pub async fn advance(
        &self,
        chain: &str,
        address: Address,
        block: u64,
        tx_index: u64,
    ) -> Result<(), IndexerError> {
        let mut conn = self.conn.clone();

        let _: () = conn
            .mset(&[
                (
                    block_key(&self.namespace, chain, address),
                    block.to_string(),
                ),
                (
                    index_key(&self.namespace, chain, address),
                    tx_index.to_string(),
                ),
            ])
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_key_layout() {
        let bridge = address!("8f5bbb2bb8c2ee94639e55d5f41de9b4839c1280");

        let block = block_key("logs", "polygon", bridge);
        assert!(block.starts_with("polygon:logs:0x"));
        assert!(block.ends_with(":MAX_BLOCK_STORED"));
        assert!(block
            .to_lowercase()
            .contains("8f5bbb2bb8c2ee94639e55d5f41de9b4839c1280"));

        let index = index_key("logs", "polygon", bridge);
        assert!(index.ends_with(":TX_INDEX"));

        // Both counters key off the same (chain, namespace, contract) tuple.
        assert_eq!(
            block.trim_end_matches("MAX_BLOCK_STORED"),
            index.trim_end_matches("TX_INDEX")
        );
    }

    #[test]
    fn test_covers_is_lexicographic() {
        let ckpt = Checkpoint {
            block: 100,
            tx_index: 5,
        };

        assert!(ckpt.covers(99, 120));
        assert!(ckpt.covers(100, 0));
        assert!(ckpt.covers(100, 5));
        assert!(!ckpt.covers(100, 6));
        assert!(!ckpt.covers(101, 0));
    }

    #[test]
    fn test_covers_with_unknown_tx_index() {
        // Only the block counter exists: nothing in that block is covered.
        let ckpt = Checkpoint {
            block: 100,
            tx_index: -1,
        };

        assert!(ckpt.covers(99, 0));
        assert!(!ckpt.covers(100, 0));
    }
}
