use alloy::primitives::Address;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::config::{ChainConfig, Config};

/// The two liquidity pool families the bridge swaps through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    Nusd,
    Neth,
}

impl PoolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PoolKind::Nusd => "nusd",
            PoolKind::Neth => "neth",
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nusd" => Ok(PoolKind::Nusd),
            "neth" => Ok(PoolKind::Neth),
            _ => Err(()),
        }
    }
}

/// A pool deployment on one chain.
#[derive(Debug, Clone)]
pub struct PoolSpec {
    pub kind: PoolKind,
    /// Swap contract answering `getToken(i)`.
    pub swap_contract: Address,
    /// Address the bridge references in events. Differs from the swap
    /// contract for wrapper pools.
    pub match_address: Address,
}

/// One indexed chain, fully resolved from config.
#[derive(Debug, Clone)]
pub struct Chain {
    pub name: String,
    pub chain_id: u64,
    pub rpc_http: String,
    pub bridge: Address,
    pub start_block: u64,
    pub max_blocks: u64,
    pub nexus_nusd: Option<Address>,
    pub ignored_pools: Vec<Address>,
    pub tokens: Vec<Address>,
    pub pools: Vec<PoolSpec>,
}

impl Chain {
    pub fn pool(&self, kind: PoolKind) -> Option<&PoolSpec> {
        self.pools.iter().find(|p| p.kind == kind)
    }

    /// Reverse lookup: which pool family does this event-side address belong
    /// to? Typed addresses make the comparison case-insensitive by nature.
    pub fn pool_kind_of(&self, address: Address) -> Option<PoolKind> {
        self.pools
            .iter()
            .find(|p| p.match_address == address)
            .map(|p| p.kind)
    }

    pub fn is_ignored_pool(&self, address: Address) -> bool {
        self.ignored_pools.contains(&address)
    }
}

/// Immutable lookup of every configured chain, built once at startup and
/// shared by reference with the ingestor, decoder and writer.
#[derive(Debug)]
pub struct ChainRegistry {
    chains: Vec<Chain>,
    by_id: HashMap<u64, usize>,
    by_name: HashMap<String, usize>,
}

impl ChainRegistry {
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        let chains = config
            .chains
            .iter()
            .map(resolve_chain)
            .collect::<eyre::Result<Vec<_>>>()?;

        Ok(Self::new(chains))
    }

    pub fn new(chains: Vec<Chain>) -> Self {
        let by_id = chains
            .iter()
            .enumerate()
            .map(|(i, c)| (c.chain_id, i))
            .collect();
        let by_name = chains
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        Self {
            chains,
            by_id,
            by_name,
        }
    }

    pub fn get(&self, chain_id: u64) -> Option<&Chain> {
        self.by_id.get(&chain_id).map(|&i| &self.chains[i])
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Chain> {
        self.by_name.get(name).map(|&i| &self.chains[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chain> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

fn resolve_chain(config: &ChainConfig) -> eyre::Result<Chain> {
    let parse = |addr: &str, what: &str| -> eyre::Result<Address> {
        Address::from_str(addr)
            .map_err(|e| eyre::eyre!("Invalid {} '{}' on chain '{}': {}", what, addr, config.name, e))
    };

    let pools = config
        .pools
        .iter()
        .map(|p| {
            let kind = PoolKind::from_str(&p.kind)
                .map_err(|_| eyre::eyre!("Unknown pool kind '{}' on chain '{}'", p.kind, config.name))?;
            let swap_contract = parse(&p.address, "pool address")?;
            let match_address = match &p.match_address {
                Some(addr) => parse(addr, "pool match_address")?,
                None => swap_contract,
            };
            Ok(PoolSpec {
                kind,
                swap_contract,
                match_address,
            })
        })
        .collect::<eyre::Result<Vec<_>>>()?;

    Ok(Chain {
        name: config.name.clone(),
        chain_id: config.chain_id,
        rpc_http: config.rpc_http.clone(),
        bridge: parse(&config.bridge, "bridge address")?,
        start_block: config.start_block,
        max_blocks: config.max_blocks,
        nexus_nusd: config
            .nexus_nusd
            .as_deref()
            .map(|a| parse(a, "nexus_nusd"))
            .transpose()?,
        ignored_pools: config
            .ignored_pools
            .iter()
            .map(|a| parse(a, "ignored pool"))
            .collect::<eyre::Result<Vec<_>>>()?,
        tokens: config
            .tokens
            .iter()
            .map(|a| parse(a, "token"))
            .collect::<eyre::Result<Vec<_>>>()?,
        pools,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn sample() -> ChainRegistry {
        let config: Config = toml::from_str(
            r#"
[database]
url = "postgres://localhost/test"

[redis]
host = "127.0.0.1"

[[chains]]
name = "avalanche"
chain_id = 43114
rpc_http = "http://localhost:8545"
bridge = "0xc05e61d0e7a63d27546389b7ad62fdff5a91aace"
start_block = 3376709
tokens = ["0x19e1ae0ee35c0404f835521146206595d37981ae"]

[[chains.pools]]
kind = "neth"
address = "0x77a7e60555bc18b4be44c181b2575eee46212d44"
match_address = "0xdd60483ace9b215a7c019a44be2f22aa9982652e"

[[chains]]
name = "fantom"
chain_id = 250
rpc_http = "http://localhost:8546"
bridge = "0xaf41a65f786339e7911f4acdad6bd49426f2dc6b"
start_block = 18503502
ignored_pools = ["0x59329ec155e90a665b1b814e95e4e12447d9cbaf"]
tokens = ["0x04068da6c83afcfa0e13ba15a6696662335d5b75"]

[[chains.pools]]
kind = "nusd"
address = "0x2913e812cf0dcca30fb28e6cac3d2dcff4497688"
"#,
        )
        .unwrap();

        ChainRegistry::from_config(&config).unwrap()
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let registry = sample();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(250).unwrap().name, "fantom");
        assert_eq!(registry.get_by_name("avalanche").unwrap().chain_id, 43114);
        assert!(registry.get(56).is_none());
    }

    #[test]
    fn test_pool_reverse_lookup_uses_match_address() {
        let registry = sample();
        let avalanche = registry.get(43114).unwrap();

        // Events carry the wrapper, not the swap contract.
        assert_eq!(
            avalanche.pool_kind_of(address!("dd60483ace9b215a7c019a44be2f22aa9982652e")),
            Some(PoolKind::Neth)
        );
        assert_eq!(
            avalanche.pool_kind_of(address!("77a7e60555bc18b4be44c181b2575eee46212d44")),
            None
        );
    }

    #[test]
    fn test_ignored_pool_membership() {
        let registry = sample();
        let fantom = registry.get(250).unwrap();
        assert!(fantom.is_ignored_pool(address!("59329ec155e90a665b1b814e95e4e12447d9cbaf")));
        assert!(!fantom.is_ignored_pool(address!("2913e812cf0dcca30fb28e6cac3d2dcff4497688")));
    }
}
