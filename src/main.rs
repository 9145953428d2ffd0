//! Service entry point: load configuration, wire adapters to services,
//! and serve the HTTP surface.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tagvote_gateway::adapters::{FaceVerifier, RpcLedger};
use tagvote_gateway::domain::config::AppConfig;
use tagvote_gateway::http::{build_router, AppState, ServiceInfo};
use tagvote_gateway::service::{LedgerQueryService, VoteOrchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    info!(
        contract = %config.ledger.contract_address,
        network = %config.ledger.network_name,
        "initializing gateway"
    );

    let ledger: Arc<dyn tagvote_gateway::LedgerGateway> =
        Arc::new(RpcLedger::new(&config.ledger).context("failed to initialize ledger adapter")?);
    let verifier = Arc::new(FaceVerifier::new(config.verifier.clone()));

    let state = AppState {
        orchestrator: Arc::new(VoteOrchestrator::new(Arc::clone(&ledger), verifier)),
        query: Arc::new(LedgerQueryService::new(Arc::clone(&ledger))),
        ledger,
        info: ServiceInfo {
            contract_address: config.ledger.contract_address.clone(),
            network_name: config.ledger.network_name.clone(),
        },
    };

    let addr = config.http_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "gateway listening");

    axum::serve(listener, build_router(state))
        .await
        .context("server error")?;
    Ok(())
}
