//! Service wiring and lifecycle.
//!
//! Spawns the indexer loop, the attestation worker, and the API server as
//! tokio tasks sharing one shutdown channel, then waits for SIGINT/SIGTERM.
//! Shutdown is cooperative: the indexer stops between blocks, an in-flight
//! worker cycle drains, the API server finishes open requests.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use ordbridge_api::ApiState;
use ordbridge_bridge::{
    contract::ContractTransport, AttestationWorker, BridgeConfig, BridgeService,
    CollectionRegistry,
};
use ordbridge_db::Database;
use ordbridge_indexer::{BitcoinCoreClient, BlockSource, Indexer, IndexerConfig};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::{error, info, warn};

use crate::{config::Config, transport::RpcContractTransport};

const RPC_TIMEOUT: Duration = Duration::from_secs(15);

pub(crate) async fn run(config: Config) -> Result<()> {
    let db = Database::open(&config.database_path).with_context(|| {
        format!(
            "failed to open database at {}",
            config.database_path.display()
        )
    })?;

    let bridge = build_bridge(&config, &db)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    // Indexer loop.
    let client = Arc::new(BitcoinCoreClient::new(
        &config.rpc_url,
        config.rpc_user.clone(),
        config.rpc_password.clone(),
        RPC_TIMEOUT,
    )?);
    match client.block_count().await {
        Ok(tip) => info!(tip, "connected to bitcoin node"),
        Err(err) => warn!(%err, "could not query the chain tip; the indexer will keep retrying"),
    }
    let indexer = Indexer::new(
        client,
        db.inscriptions(),
        bridge.clone(),
        IndexerConfig::new(config.start_height, config.network),
    )?;
    tasks.push(tokio::spawn(indexer.run(shutdown_rx.clone())));

    // Attestation worker, only on top of an active bridge.
    match (&config.worker, &bridge) {
        (Some(worker_env), Some(bridge)) => {
            let transport = Arc::new(RpcContractTransport::new(
                &worker_env.contract_rpc_url,
                &worker_env.contract_address,
                &worker_env.deployer_mnemonic,
                RPC_TIMEOUT,
            )?);
            let worker = AttestationWorker::new(bridge.clone(), transport, config.network);
            tasks.push(tokio::spawn(worker_loop(
                worker,
                Duration::from_secs(worker_env.interval_secs),
                shutdown_rx.clone(),
            )));
        }
        (Some(_), None) => {
            warn!("attestation worker configured but the bridge is disabled; not starting it");
        }
        _ => {}
    }

    // HTTP query surface.
    if config.enable_api {
        let state = Arc::new(ApiState::new(db.inscriptions(), bridge.clone()));
        let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
        let api_shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(err) = ordbridge_api::serve(addr, state, api_shutdown).await {
                error!(%err, "api server exited");
            }
        }));
    }

    info!(
        network = %config.network,
        start_height = config.start_height,
        bridge = bridge.is_some(),
        worker = config.worker.is_some() && bridge.is_some(),
        api = config.enable_api,
        "ordbridge started"
    );

    shutdown_signal().await?;
    info!("shutdown signal received, draining tasks");
    let _ = shutdown_tx.send(true);
    for task in tasks {
        let _ = task.await;
    }

    info!("ordbridge stopped");
    Ok(())
}

fn build_bridge(config: &Config, db: &Database) -> Result<Option<Arc<BridgeService>>> {
    let Some(env) = &config.bridge else {
        return Ok(None);
    };

    let collection = CollectionRegistry::load(&env.collection_file)
        .with_context(|| format!("failed to load {}", env.collection_file.display()))?;
    info!(
        items = collection.len(),
        name = %env.collection_name,
        "collection loaded"
    );

    Ok(Some(Arc::new(BridgeService::new(
        db.claims(),
        collection,
        BridgeConfig {
            burn_address: env.burn_address.clone(),
            oracle_fee_address: env.oracle_fee_address.clone(),
            collection_name: env.collection_name.clone(),
            collection_symbol: env.collection_symbol.clone(),
            required_confirmations: env.confirmations,
            min_fee_sats: env.min_fee_sats,
            network: config.network,
        },
    ))))
}

/// Periodic attestation sweeps. The tick and the shutdown race; a cycle that
/// already started always runs to completion.
async fn worker_loop<T: ContractTransport>(
    worker: AttestationWorker<T>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_secs = period.as_secs(), "attestation worker starting");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        match worker.run_cycle().await {
            Ok(outcome) if outcome.attested > 0 || outcome.failed > 0 => {
                info!(
                    attested = outcome.attested,
                    failed = outcome.failed,
                    "attestation cycle finished"
                );
            }
            Ok(_) => {}
            Err(err) => error!(%err, "attestation cycle failed"),
        }
    }

    info!("attestation worker stopped");
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("failed to register SIGTERM handler")?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")?;
    }
    Ok(())
}
