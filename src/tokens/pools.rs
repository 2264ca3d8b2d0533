use alloy::primitives::Address;
use alloy::providers::DynProvider;
use alloy::transports::RpcError;
use std::collections::HashMap;

use crate::abi::SwapPool;
use crate::chains::registry::{Chain, ChainRegistry, PoolKind};
use crate::error::IndexerError;

/// Probe ceiling for `getToken(i)`; the index parameter is a uint8.
const MAX_POOL_TOKENS: u8 = u8::MAX;

/// Member tokens of every configured pool, ordered by on-chain index.
/// Discovered once at startup and immutable afterwards; swap events address
/// tokens by these indices.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    tokens: HashMap<(u64, PoolKind), Vec<Address>>,
}

impl PoolRegistry {
    /// Walk `getToken(i)` from index 0 on every configured pool until the
    /// contract reverts (one past the last member) or the uint8 range is
    /// exhausted.
    pub async fn discover(
        registry: &ChainRegistry,
        providers: &HashMap<u64, DynProvider>,
    ) -> eyre::Result<Self> {
        let mut tokens = HashMap::new();

        for chain in registry.iter() {
            let provider = providers
                .get(&chain.chain_id)
                .ok_or_else(|| eyre::eyre!("No provider for chain {}", chain.name))?;

            for pool in &chain.pools {
                let members = probe_pool(provider, pool.swap_contract)
                    .await
                    .map_err(|e| {
                        eyre::eyre!(
                            "Pool discovery for {} pool on {} failed: {}",
                            pool.kind,
                            chain.name,
                            e
                        )
                    })?;

                tracing::info!(
                    chain = %chain.name,
                    kind = %pool.kind,
                    tokens = members.len(),
                    "Discovered pool tokens"
                );

                tokens.insert((chain.chain_id, pool.kind), members);
            }
        }

        Ok(Self { tokens })
    }

    pub fn tokens(&self, chain_id: u64, kind: PoolKind) -> Option<&[Address]> {
        self.tokens.get(&(chain_id, kind)).map(|v| v.as_slice())
    }

    /// Resolve a swap token index from an event into the member address.
    pub fn token_at(
        &self,
        chain_id: u64,
        kind: PoolKind,
        index: u8,
    ) -> Result<Address, IndexerError> {
        self.tokens(chain_id, kind)
            .and_then(|members| members.get(index as usize))
            .copied()
            .ok_or(IndexerError::PoolIndex {
                chain_id,
                kind: kind.as_str(),
                index,
            })
    }

    /// The asset credited when a destination swap fails: the chain's
    /// configured nUSD (mainnet keeps nUSD out of its own pool) or the
    /// pool's index-0 token.
    pub fn nexus_token(&self, chain: &Chain, kind: PoolKind) -> Option<Address> {
        if kind == PoolKind::Nusd {
            if let Some(nusd) = chain.nexus_nusd {
                return Some(nusd);
            }
        }

        self.tokens(chain.chain_id, kind)
            .and_then(|members| members.first().copied())
    }
}

async fn probe_pool(provider: &DynProvider, pool: Address) -> eyre::Result<Vec<Address>> {
    let contract = SwapPool::new(pool, provider.clone());
    let mut members = Vec::new();

    for index in 0..MAX_POOL_TOKENS {
        match contract.getToken(index).call().await {
            Ok(token) => members.push(token),
            // Reverts and empty/malformed returns both mean we walked past
            // the last member.
            Err(alloy::contract::Error::TransportError(RpcError::ErrorResp(_))) => break,
            Err(alloy::contract::Error::AbiError(_)) => break,
            Err(alloy::contract::Error::ZeroData(_, _)) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(members)
}

#[cfg(test)]
pub(crate) fn pools_from_entries(
    entries: impl IntoIterator<Item = ((u64, PoolKind), Vec<Address>)>,
) -> PoolRegistry {
    PoolRegistry {
        tokens: entries.into_iter().collect(),
    }
}
