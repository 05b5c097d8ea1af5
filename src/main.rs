use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

mod cli;
mod logging;

use thorsim::chains::{ChainClient, MockChain};
use thorsim::client::ThorchainClient;
use thorsim::config::SmokeConfig;
use thorsim::smoker::{Harness, SmokeFixtures};

fn main() -> ExitCode {
    logging::init();
    let cli = cli::Cli::parse();

    let result = match cli.command {
        smoke @ cli::Command::Smoke { .. } => run_smoke(smoke),
        cli::Command::Schema { kind } => run_schema(kind),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "thorsim exited with an error");
            ExitCode::FAILURE
        }
    }
}

fn run_schema(kind: cli::SchemaKind) -> anyhow::Result<ExitCode> {
    let schema = match kind {
        cli::SchemaKind::Fixtures => schemars::schema_for!(SmokeFixtures),
        cli::SchemaKind::Constants => schemars::schema_for!(thorsim::config::SimConstants),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(ExitCode::SUCCESS)
}

/// Builds a `SmokeConfig` from the CLI flags, registers the in-process mock
/// chain set, and drives a full replay run to completion.
fn run_smoke(command: cli::Command) -> anyhow::Result<ExitCode> {
    let cli::Command::Smoke {
        transactions,
        balances,
        events,
        thorchain,
        midgard,
        binance,
        gaia,
        bitcoin,
        bitcoin_cash,
        litecoin,
        dogecoin,
        ethereum,
        generate_balances,
        fast_fail,
        no_verify,
        bitcoin_reorg,
        ethereum_reorg,
        bootstrap_only,
    } = command
    else {
        unreachable!("run_smoke is only called for Command::Smoke");
    };

    let mut chain_urls = std::collections::HashMap::new();
    for (chain, url) in [
        ("BNB", binance),
        ("GAIA", gaia),
        ("BTC", bitcoin),
        ("BCH", bitcoin_cash),
        ("LTC", litecoin),
        ("DOGE", dogecoin),
        ("ETH", ethereum),
    ] {
        if let Some(url) = url {
            chain_urls.insert(chain.to_string(), url);
        }
    }

    let config = SmokeConfig {
        thorchain_url: thorchain,
        midgard_url: midgard,
        chain_urls,
        generate_balances,
        fast_fail,
        no_verify,
        bitcoin_reorg,
        ethereum_reorg,
        bootstrap_only,
        ..SmokeConfig::default()
    };

    let fixtures = SmokeFixtures::load(
        transactions.to_string_lossy().as_ref(),
        balances.to_string_lossy().as_ref(),
        events.to_string_lossy().as_ref(),
    )?;

    if config.bootstrap_only {
        tracing::info!("bootstrap-only: skipping transaction replay");
        return Ok(ExitCode::SUCCESS);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("received interrupt, shutting down after the current inbound");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .ok();

    let client = ThorchainClient::new(config.thorchain_url.clone());
    let mut harness = Harness::with_shutdown(config.clone(), client, shutdown.clone());

    for chain in default_chain_set() {
        harness.register_chain(chain);
    }

    let rt = tokio::runtime::Runtime::new()?;
    let divergences = rt.block_on(async {
        if config.no_verify {
            tracing::info!("--no-verify set: broadcasting only, skipping differential comparison");
        }
        harness.run(&fixtures).await
    })?;

    if shutdown.load(Ordering::SeqCst) {
        tracing::warn!("exiting early due to interrupt");
    }

    if divergences > 0 {
        tracing::error!(divergences, "smoke run completed with divergences");
        Ok(ExitCode::FAILURE)
    } else {
        tracing::info!("smoke run completed with full agreement");
        Ok(ExitCode::SUCCESS)
    }
}

fn default_chain_set() -> Vec<Box<dyn ChainClient>> {
    vec![
        Box::new(MockChain::thorchain()),
        Box::new(MockChain::binance()),
        Box::new(MockChain::bitcoin()),
        Box::new(MockChain::bitcoin_cash()),
        Box::new(MockChain::litecoin()),
        Box::new(MockChain::dogecoin()),
        Box::new(MockChain::ethereum()),
        Box::new(MockChain::gaia()),
    ]
}
