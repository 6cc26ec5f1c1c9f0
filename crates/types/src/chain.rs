use serde::{Deserialize, Serialize};

/// A network the platform can deploy to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub chain_id: u64,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

impl ChainEntry {
    /// Entry used when the chain list can't be fetched: available, without aliases.
    pub fn fallback(chain_id: u64, name: &str) -> Self {
        Self {
            chain_id,
            name: name.to_owned(),
            aliases: Vec::new(),
            is_available: true,
        }
    }
}

/// Chains known to be supported when the backend can't be reached.
pub const SUPPORTED_CHAINS: [(u64, &str); 14] = [
    (11_155_111, "Sepolia"),
    (80_002, "Polygon Amoy"),
    (43_113, "Avalanche Fuji"),
    (97, "BSC Testnet"),
    (421_614, "Arbitrum Sepolia"),
    (4_002, "Fantom Testnet"),
    (84_532, "Base Sepolia"),
    (11_155_420, "Optimism Sepolia"),
    (1_313_161_555, "Aurora Testnet"),
    (300, "zkSync Sepolia"),
    (338, "Cronos Testnet"),
    (51, "XDC Apothem"),
    (50, "XDC Network"),
    (10_200, "Gnosis Chiado"),
];
