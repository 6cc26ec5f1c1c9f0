use clap::Parser;

use crate::messages::{
    MSG_CHAIN_DEPLOYMENT_ID_HELP, MSG_DEPLOYMENT_ID_HELP, MSG_DETERMINISTIC_ADDRESSES_HELP,
    MSG_NETWORKS_HELP,
};

/// Short spelling of `--deterministic-addresses`. Clap only knows single-letter
/// shorts, so it is rewritten before parsing.
pub const DETERMINISTIC_ADDRESSES_SHORT: &str = "-da";

#[derive(Debug, Clone, Default, Parser)]
pub struct DeployArgs {
    #[clap(long, num_args = 1.., value_delimiter = ',', help = MSG_NETWORKS_HELP)]
    pub networks: Vec<String>,
    #[clap(long, help = MSG_DETERMINISTIC_ADDRESSES_HELP)]
    pub deterministic_addresses: bool,
    #[clap(long, help = MSG_DEPLOYMENT_ID_HELP)]
    pub deployment_id: Option<u64>,
    #[clap(long, help = MSG_CHAIN_DEPLOYMENT_ID_HELP)]
    pub chain_deployment_id: Option<u64>,
}

/// Rewrites `-da` into `--deterministic-addresses`.
pub fn normalize_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| {
            if arg == DETERMINISTIC_ADDRESSES_SHORT {
                "--deterministic-addresses".to_owned()
            } else {
                arg
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> DeployArgs {
        let args = normalize_args(
            std::iter::once("deploy")
                .chain(args.iter().copied())
                .map(str::to_owned),
        );
        DeployArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn networks_accept_lists() {
        let args = parse(&["--networks", "sepolia", "bsc-testnet,97"]);
        assert_eq!(args.networks, vec!["sepolia", "bsc-testnet", "97"]);
        assert!(!args.deterministic_addresses);
    }

    #[test]
    fn short_deterministic_flag() {
        let args = parse(&["--networks", "sepolia", "-da", "--deployment-id", "5"]);
        assert!(args.deterministic_addresses);
        assert_eq!(args.deployment_id, Some(5));
        assert_eq!(args.chain_deployment_id, None);
    }
}
