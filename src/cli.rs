use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// `thorsim` — deterministic THORChain settlement replay harness.
#[derive(Parser)]
#[command(name = "thorsim", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a scripted transaction list against the simulator and a live
    /// mocknet, diffing pools/balances/events after every transaction.
    Smoke {
        /// Path to smoke_test_transactions.json
        #[arg(long, default_value = "smoke_test_transactions.json")]
        transactions: PathBuf,

        /// Path to smoke_test_balances.json
        #[arg(long, default_value = "smoke_test_balances.json")]
        balances: PathBuf,

        /// Path to smoke_test_events.json
        #[arg(long, default_value = "smoke_test_events.json")]
        events: PathBuf,

        /// THORChain node REST base URL
        #[arg(long, default_value = "http://localhost:1317")]
        thorchain: String,

        /// Midgard base URL, if balance verification should cross-check it
        #[arg(long)]
        midgard: Option<String>,

        #[arg(long)]
        binance: Option<String>,
        #[arg(long)]
        gaia: Option<String>,
        #[arg(long)]
        bitcoin: Option<String>,
        #[arg(long = "bitcoin-cash")]
        bitcoin_cash: Option<String>,
        #[arg(long)]
        litecoin: Option<String>,
        #[arg(long)]
        dogecoin: Option<String>,
        #[arg(long)]
        ethereum: Option<String>,

        /// Seed chain account balances from the scripted fixtures before
        /// replaying transactions, instead of assuming they are pre-funded.
        #[arg(long)]
        generate_balances: bool,

        /// Exit on the first divergence instead of accumulating them.
        #[arg(long)]
        fast_fail: bool,

        /// Broadcast transactions but skip the differential comparison.
        #[arg(long)]
        no_verify: bool,

        /// Exercise the Bitcoin reorg-tolerance path.
        #[arg(long)]
        bitcoin_reorg: bool,

        /// Exercise the Ethereum reorg-tolerance path.
        #[arg(long)]
        ethereum_reorg: bool,

        /// Bootstrap pools/balances and exit before replaying transactions.
        #[arg(long)]
        bootstrap_only: bool,
    },

    /// Print the JSON Schema for the persisted fixture files and the
    /// simulation constants, for external tooling to validate against.
    Schema {
        #[arg(value_enum, default_value = "fixtures")]
        kind: SchemaKind,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum SchemaKind {
    Fixtures,
    Constants,
}
