use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::str::FromStr;

use crate::abi::Erc20;
use crate::chains::registry::ChainRegistry;

/// Concurrent metadata calls in flight during warmup.
const MAX_IN_FLIGHT: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMeta {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

/// On-chain ERC-20 metadata for every configured token, fetched once at
/// startup and immutable for the process lifetime.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    by_chain: HashMap<u64, HashMap<Address, TokenMeta>>,
}

impl TokenRegistry {
    /// Fetch `decimals()`, `name()` and `symbol()` for every known token on
    /// every chain, with bounded parallelism. Ingestion must not start
    /// without complete metadata, so any failure aborts startup.
    pub async fn warm_up(
        registry: &ChainRegistry,
        providers: &HashMap<u64, DynProvider>,
    ) -> eyre::Result<Self> {
        let jobs = registry.iter().flat_map(|chain| {
            chain
                .tokens
                .iter()
                .map(move |&token| (chain.chain_id, chain.name.as_str(), token))
        });

        let entries: Vec<(u64, Address, TokenMeta)> = stream::iter(jobs)
            .map(|(chain_id, chain_name, token)| {
                let provider = providers.get(&chain_id).cloned();
                async move {
                    let provider = provider
                        .ok_or_else(|| eyre::eyre!("No provider for chain {}", chain_name))?;
                    let meta = fetch_meta(&provider, token).await.map_err(|e| {
                        eyre::eyre!("Metadata fetch for {} on {} failed: {}", token, chain_name, e)
                    })?;
                    Ok::<_, eyre::Report>((chain_id, token, meta))
                }
            })
            .buffer_unordered(MAX_IN_FLIGHT)
            .try_collect()
            .await?;

        Self::from_entries(entries)
    }

    fn from_entries(
        entries: impl IntoIterator<Item = (u64, Address, TokenMeta)>,
    ) -> eyre::Result<Self> {
        let mut by_chain: HashMap<u64, HashMap<Address, TokenMeta>> = HashMap::new();

        for (chain_id, token, meta) in entries {
            if by_chain
                .entry(chain_id)
                .or_default()
                .insert(token, meta)
                .is_some()
            {
                return Err(eyre::eyre!(
                    "Token {} configured twice on chain {}",
                    token,
                    chain_id
                ));
            }
        }

        Ok(Self { by_chain })
    }

    pub fn meta(&self, chain_id: u64, token: Address) -> Option<&TokenMeta> {
        self.by_chain.get(&chain_id)?.get(&token)
    }

    pub fn symbol(&self, chain_id: u64, token: Address) -> Option<&str> {
        self.meta(chain_id, token).map(|m| m.symbol.as_str())
    }

    /// Scale a raw integer amount by the token's decimals. Unknown tokens
    /// scale to zero; this feeds operator-facing log lines, not the ledger.
    pub fn convert_amount(&self, chain_id: u64, token: Address, raw: U256) -> BigDecimal {
        let Some(meta) = self.meta(chain_id, token) else {
            tracing::warn!(%token, chain_id, "Amount conversion for unknown token, using 0");
            return BigDecimal::default();
        };

        let digits = BigInt::from_str(&raw.to_string()).unwrap_or_default();
        BigDecimal::new(digits, meta.decimals as i64)
    }

    pub fn token_count(&self) -> usize {
        self.by_chain.values().map(|m| m.len()).sum()
    }
}

async fn fetch_meta(provider: &DynProvider, token: Address) -> eyre::Result<TokenMeta> {
    let erc20 = Erc20::new(token, provider.clone());

    let decimals = erc20.decimals().call().await?;
    let name = erc20.name().call().await?;
    let symbol = erc20.symbol().call().await?;

    Ok(TokenMeta {
        symbol,
        name,
        decimals,
    })
}

#[cfg(test)]
pub(crate) fn registry_from_entries(
    entries: impl IntoIterator<Item = (u64, Address, TokenMeta)>,
) -> TokenRegistry {
    TokenRegistry::from_entries(entries).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const USDC: Address = address!("2791bca1f2de4661ed88a30c99a7a9449aa84174");
    const WETH: Address = address!("7ceb23fd6bc0add59e62ac25578270cff1b9f619");

    fn sample() -> TokenRegistry {
        registry_from_entries([
            (
                137,
                USDC,
                TokenMeta {
                    symbol: "USDC".into(),
                    name: "USD Coin (PoS)".into(),
                    decimals: 6,
                },
            ),
            (
                137,
                WETH,
                TokenMeta {
                    symbol: "WETH".into(),
                    name: "Wrapped Ether".into(),
                    decimals: 18,
                },
            ),
        ])
    }

    #[test]
    fn test_meta_lookup() {
        let registry = sample();
        assert_eq!(registry.symbol(137, USDC), Some("USDC"));
        assert_eq!(registry.meta(137, USDC).unwrap().decimals, 6);
        // Same address on a different chain is a different token.
        assert!(registry.meta(1, USDC).is_none());
    }

    #[test]
    fn test_convert_amount_scales_by_decimals() {
        let registry = sample();

        let usdc = registry.convert_amount(137, USDC, U256::from(20_000_000u64));
        assert_eq!(usdc, BigDecimal::from_str("20").unwrap());

        let weth = registry.convert_amount(137, WETH, U256::from(121_934_824_070_437_538u64));
        assert_eq!(weth, BigDecimal::from_str("0.121934824070437538").unwrap());
    }

    #[test]
    fn test_convert_amount_unknown_token_is_zero() {
        let registry = sample();
        let other = address!("0000000000000000000000000000000000000001");
        assert_eq!(
            registry.convert_amount(137, other, U256::from(5u64)),
            BigDecimal::default()
        );
    }

    #[test]
    fn test_duplicate_token_rejected() {
        let meta = TokenMeta {
            symbol: "X".into(),
            name: "X".into(),
            decimals: 18,
        };
        let result =
            TokenRegistry::from_entries([(1, USDC, meta.clone()), (1, USDC, meta)]);
        assert!(result.is_err());
    }
}
