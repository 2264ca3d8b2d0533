use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub chains: Vec<ChainConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_redis_port() -> u16 {
    6379
}

fn default_namespace() -> String {
    "logs".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_http: String,
    pub bridge: String,
    pub start_block: u64,
    /// Widest `eth_getLogs` block range this chain's RPC tolerates.
    #[serde(default = "default_max_blocks")]
    pub max_blocks: u64,
    /// Fallback asset credited when a destination swap fails. Without it the
    /// pool's index-0 token is used.
    pub nexus_nusd: Option<String>,
    #[serde(default)]
    pub ignored_pools: Vec<String>,
    pub tokens: Vec<String>,
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

fn default_max_blocks() -> u64 {
    5000
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoolConfig {
    pub kind: String,
    /// Swap contract probed with `getToken(i)` at startup.
    pub address: String,
    /// Address the bridge passes in events, when it differs from the swap
    /// contract (wrapper pools).
    pub match_address: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Deployment-environment overrides. `docker=true` selects the in-network
    /// addresses used by the containerized setup.
    fn apply_env_overrides(&mut self) {
        let docker = std::env::var("docker").is_ok_and(|v| v == "true");

        let url_var = if docker { "PSQL_DOCKER_URL" } else { "PSQL_URL" };
        if let Ok(url) = std::env::var(url_var) {
            self.database.url = url;
        }

        let host_var = if docker { "REDIS_DOCKER_HOST" } else { "REDIS_HOST" };
        let port_var = if docker { "REDIS_DOCKER_PORT" } else { "REDIS_PORT" };
        if let Ok(host) = std::env::var(host_var) {
            self.redis.host = host;
        }
        if let Ok(port) = std::env::var(port_var) {
            match port.parse() {
                Ok(port) => self.redis.port = port,
                Err(e) => tracing::warn!(%port, error = %e, "Ignoring unparseable redis port"),
            }
        }

        for chain in &mut self.chains {
            let var = format!("{}_RPC", chain.name.to_uppercase());
            if let Ok(url) = std::env::var(&var) {
                chain.rpc_http = url;
            }
        }
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.chains.is_empty() {
            return Err(eyre::eyre!("At least one chain must be configured"));
        }

        let mut seen_ids = std::collections::HashSet::new();
        for chain in &self.chains {
            if !seen_ids.insert(chain.chain_id) {
                return Err(eyre::eyre!("Duplicate chain_id {}", chain.chain_id));
            }

            validate_address(&chain.bridge, "bridge", &chain.name)?;
            for token in &chain.tokens {
                validate_address(token, "token", &chain.name)?;
            }
            for pool in &chain.pools {
                if pool.kind != "nusd" && pool.kind != "neth" {
                    return Err(eyre::eyre!(
                        "Unknown pool kind '{}' on chain '{}' (expected nusd or neth)",
                        pool.kind,
                        chain.name
                    ));
                }
                validate_address(&pool.address, "pool", &chain.name)?;
                if let Some(addr) = &pool.match_address {
                    validate_address(addr, "pool match_address", &chain.name)?;
                }
            }
            if let Some(addr) = &chain.nexus_nusd {
                validate_address(addr, "nexus_nusd", &chain.name)?;
            }
            for addr in &chain.ignored_pools {
                validate_address(addr, "ignored pool", &chain.name)?;
            }
            if chain.max_blocks == 0 {
                return Err(eyre::eyre!("max_blocks must be > 0 on chain '{}'", chain.name));
            }
        }
        Ok(())
    }
}

fn validate_address(address: &str, what: &str, chain: &str) -> eyre::Result<()> {
    if !address.starts_with("0x") || address.len() != 42 {
        return Err(eyre::eyre!(
            "Invalid {} address '{}' on chain '{}'",
            what,
            address,
            chain
        ));
    }
    Ok(())
}
