use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use anyflow_cli_common::logger;
use anyflow_cli_types::{ChainEntry, SUPPORTED_CHAINS};
use tokio::sync::Mutex;

use crate::{
    api::BackendApi,
    consts::{CHAINS_CACHE_TTL, FALLBACK_CHAINS_TTL},
    messages::msg_chains_fetch_failed,
};

#[derive(Debug)]
struct CachedChains {
    fetched_at: Instant,
    is_fallback: bool,
    chains: Arc<Vec<ChainEntry>>,
}

/// Chains the platform supports, fetched from the backend and cached for a while.
///
/// A failed fetch falls back to the built-in list. The fallback is cached for a
/// shorter time, so lookups within one run share a single snapshot.
pub struct ChainRegistry {
    api: Arc<dyn BackendApi>,
    ttl: Duration,
    cache: Mutex<Option<CachedChains>>,
}

impl ChainRegistry {
    pub fn new(api: Arc<dyn BackendApi>) -> Self {
        Self {
            api,
            ttl: CHAINS_CACHE_TTL,
            cache: Mutex::new(None),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn get_chains(&self) -> Arc<Vec<ChainEntry>> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl_for(cached) {
                return cached.chains.clone();
            }
        }

        let (chains, is_fallback) = match self.api.get_chains().await {
            Ok(chains) => (chains, false),
            Err(err) => {
                logger::warn(msg_chains_fetch_failed(&err));
                (fallback_chains(), true)
            }
        };
        let chains = Arc::new(chains);
        *cache = Some(CachedChains {
            fetched_at: Instant::now(),
            is_fallback,
            chains: chains.clone(),
        });
        chains
    }

    fn ttl_for(&self, cached: &CachedChains) -> Duration {
        if cached.is_fallback {
            self.ttl.min(FALLBACK_CHAINS_TTL)
        } else {
            self.ttl
        }
    }

    /// Unknown chains are reported as unavailable.
    pub async fn is_chain_available(&self, chain_id: u64) -> bool {
        self.get_chains()
            .await
            .iter()
            .find(|chain| chain.chain_id == chain_id)
            .is_some_and(|chain| chain.is_available)
    }

    pub async fn alias_to_chain_id(&self, alias: &str) -> Option<u64> {
        let chains = self.get_chains().await;
        resolve_alias(&alias_index(&chains), &chains, alias)
    }

    /// Resolves every alias against a single snapshot of the chain list.
    pub async fn aliases_to_chain_ids(&self, aliases: &[String]) -> Vec<Option<u64>> {
        let chains = self.get_chains().await;
        let index = alias_index(&chains);
        aliases
            .iter()
            .map(|alias| resolve_alias(&index, &chains, alias))
            .collect()
    }

    /// Human readable list of chains and their aliases.
    pub async fn supported_chains_help(&self) -> String {
        let chains = self.get_chains().await;
        chains
            .iter()
            .map(|chain| {
                let mut line = format!("{}  {}", chain.chain_id, chain.name);
                if !chain.aliases.is_empty() {
                    line.push_str(&format!(": {}", chain.aliases.join(", ")));
                }
                if !chain.is_available {
                    line.push_str(" (unavailable)");
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn fallback_chains() -> Vec<ChainEntry> {
    SUPPORTED_CHAINS
        .iter()
        .map(|(chain_id, name)| ChainEntry::fallback(*chain_id, name))
        .collect()
}

/// Lowercased alias to chain id. When two chains share an alias the first one in
/// the list keeps it.
fn alias_index(chains: &[ChainEntry]) -> HashMap<String, u64> {
    let mut index = HashMap::new();
    for chain in chains {
        for alias in &chain.aliases {
            index
                .entry(alias.trim().to_lowercase())
                .or_insert(chain.chain_id);
        }
    }
    index
}

fn resolve_alias(index: &HashMap<String, u64>, chains: &[ChainEntry], alias: &str) -> Option<u64> {
    let alias = alias.trim().to_lowercase();
    if let Some(chain_id) = index.get(&alias) {
        return Some(*chain_id);
    }
    let chain_id: u64 = alias.parse().ok()?;
    chains
        .iter()
        .any(|chain| chain.chain_id == chain_id)
        .then_some(chain_id)
}
