//! Orderer node: envelope intake, block cutting, and broadcast.
//!
//! Routes:
//!
//! - `POST /submit`: verify and queue an envelope; seals a block when
//!   the batch reaches the size threshold,
//! - `POST /broadcast`: store a block sealed by another orderer,
//! - `GET  /metrics`: Prometheus text exposition.
//!
//! The block-timeout timer lives here: the consensus module reports when a
//! timer should be armed, a tokio task sleeps for the timeout, and a size
//! cut aborts it.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use litefab::{
    Block, ConsensusKind, DefaultOrdererService, LitefabError, MetricsRegistry, Msp, NodeConfig,
    OrdererService, RaftConsensus, RocksDbLedger, RocksDbLedgerConfig, SigningIdentity,
    SoloConsensus, SubmitDisposition, TransactionEnvelope,
};

use crate::broadcast::broadcast_block;
use crate::respond::error_response;

/// Shared state behind the orderer's routes.
struct OrdererState {
    service: Arc<Mutex<DefaultOrdererService>>,
    peers: Vec<String>,
    http: reqwest::Client,
    cut_timer: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<MetricsRegistry>,
}

type SharedOrderer = Arc<OrdererState>;

/// Runs an orderer node until shutdown.
pub async fn run(cfg: NodeConfig) -> Result<(), String> {
    let msp = Arc::new(
        Msp::load(&cfg.msp_path).map_err(|e| format!("loading MSP config: {e}"))?,
    );
    let key = SigningIdentity::from_pem_file(&cfg.private_key_path)
        .map_err(|e| format!("loading private key: {e}"))?;

    let ledger = RocksDbLedger::open(&RocksDbLedgerConfig {
        path: cfg.ledger_path().to_string_lossy().to_string(),
        create_if_missing: true,
    })
    .map_err(|e| format!("opening ledger: {e}"))?;

    let consensus: Box<dyn litefab::Consensus> = match cfg.consensus {
        ConsensusKind::Solo => Box::new(SoloConsensus::new(cfg.block_size, cfg.block_timeout())),
        ConsensusKind::Raft => {
            // Single-voter Raft elects itself immediately; multi-orderer
            // clusters need the replication transport first.
            let mut raft = RaftConsensus::new(
                cfg.node_id.clone(),
                vec![],
                cfg.block_size,
                cfg.block_timeout(),
            );
            raft.tick(std::time::Instant::now() + litefab::consensus::raft::ELECTION_TIMEOUT_MAX);
            Box::new(raft)
        }
    };

    let service = OrdererService::new(cfg.node_id.clone(), key, msp, ledger, consensus);
    let metrics =
        Arc::new(MetricsRegistry::new().map_err(|e| format!("metrics registry: {e}"))?);

    let state: SharedOrderer = Arc::new(OrdererState {
        service: Arc::new(Mutex::new(service)),
        peers: cfg.peers.clone(),
        http: reqwest::Client::new(),
        cut_timer: Mutex::new(None),
        metrics,
    });

    let app = Router::new()
        .route("/submit", post(handle_submit))
        .route("/broadcast", post(handle_broadcast))
        .route("/metrics", get(handle_metrics))
        .with_state(state);

    tracing::info!(node = %cfg.node_id, "orderer listening on http://{}", cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await
        .map_err(|e| format!("orderer server error: {e}"))?;

    tracing::info!("orderer shut down");
    Ok(())
}

/// Seals-side bookkeeping common to size cuts and timeout cuts.
fn dispatch_sealed(state: &SharedOrderer, block: &Block) {
    state.metrics.pipeline.blocks_sealed.inc();
    broadcast_block(&state.http, &state.peers, block);
}

/// `POST /submit`
async fn handle_submit(
    State(state): State<SharedOrderer>,
    Json(envelope): Json<TransactionEnvelope>,
) -> impl IntoResponse {
    let disposition = {
        let mut service = state.service.lock().await;
        service.submit(envelope)
    };

    match disposition {
        Ok(SubmitDisposition::Sealed(block)) => {
            // Size cut: cancel any armed timer, its batch is gone.
            if let Some(timer) = state.cut_timer.lock().await.take() {
                timer.abort();
            }
            dispatch_sealed(&state, &block);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "status": "submitted" })),
            )
                .into_response()
        }
        Ok(SubmitDisposition::Queued { arm_timer }) => {
            if arm_timer {
                arm_cut_timer(&state).await;
            }
            (
                StatusCode::OK,
                Json(serde_json::json!({ "status": "submitted" })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "envelope rejected");
            error_response(&e).into_response()
        }
    }
}

/// Arms the block-timeout timer for the batch that just started.
async fn arm_cut_timer(state: &SharedOrderer) {
    let timeout = state.service.lock().await.block_timeout();
    let timer_state = state.clone();

    let handle = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;

        let cut = {
            let mut service = timer_state.service.lock().await;
            service.cut_on_timeout()
        };
        match cut {
            Ok(Some(block)) => dispatch_sealed(&timer_state, &block),
            Ok(None) => {
                // A size cut raced the timer and won; nothing to do.
            }
            Err(e) => tracing::error!(error = %e, "timeout cut failed"),
        }
        timer_state.cut_timer.lock().await.take();
    });

    *state.cut_timer.lock().await = Some(handle);
}

/// `POST /broadcast`
async fn handle_broadcast(
    State(state): State<SharedOrderer>,
    Json(block): Json<Block>,
) -> impl IntoResponse {
    let result = {
        let mut service = state.service.lock().await;
        service.store_remote(block)
    };

    match result {
        Ok(hash) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "stored", "hash": hash })),
        )
            .into_response(),
        Err(e @ LitefabError::SignatureInvalid(_)) => {
            tracing::warn!(error = %e, "rejected foreign block");
            error_response(&e).into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

/// `GET /metrics`
async fn handle_metrics(State(state): State<SharedOrderer>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.gather_text(),
    )
}
