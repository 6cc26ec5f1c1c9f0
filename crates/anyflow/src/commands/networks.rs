use anyflow_cli_common::logger;
use anyflow_cli_types::ChainEntry;
use console::style;

use crate::{
    context::CommandContext,
    messages::{MSG_AVAILABLE_NETWORKS, MSG_NETWORKS_USAGE},
};

const CHAIN_ID_WIDTH: usize = 12;
const NAME_WIDTH: usize = 35;

pub(crate) async fn run(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    let chains = ctx.registry.get_chains().await;
    logger::note(MSG_AVAILABLE_NETWORKS, networks_table(&chains));
    logger::outro(MSG_NETWORKS_USAGE);
    Ok(())
}

fn networks_table(chains: &[ChainEntry]) -> String {
    let mut lines = vec![
        format!(
            "{:<CHAIN_ID_WIDTH$}{:<NAME_WIDTH$}Status",
            "Chain ID", "Name"
        ),
        "─".repeat(CHAIN_ID_WIDTH + NAME_WIDTH + 15),
    ];

    for chain in chains {
        let status = if chain.is_available {
            style("✓ Available").green()
        } else {
            style("✗ Unavailable").red()
        };
        lines.push(format!(
            "{:<CHAIN_ID_WIDTH$}{:<NAME_WIDTH$}{status}",
            chain.chain_id, chain.name
        ));
        if !chain.aliases.is_empty() {
            lines.push(format!(
                "{:CHAIN_ID_WIDTH$}  ↳ Aliases: {}",
                "",
                style(chain.aliases.join(", ")).dim()
            ));
        }
    }
    lines.join("\n")
}
