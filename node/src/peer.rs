//! Peer node: endorsement, query, submission relay, and block commit.
//!
//! Routes:
//!
//! - `POST /proposal`: simulate and endorse a client proposal,
//! - `POST /submit`: verify and relay an envelope to an orderer
//!   (round-robin with failover), returning the orderer's response,
//! - `GET  /query?key=K`: read a world-state key,
//! - `POST /block`: validate and commit a block,
//! - `GET  /metrics`: Prometheus text exposition.
//!
//! The committer runs as the single consumer of an mpsc block queue, so
//! blocks commit strictly one at a time in arrival order; each `/block`
//! request waits on a oneshot for its outcome.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::{mpsc, oneshot, Mutex};

use litefab::{
    Block, ChaincodeHost, CommitOutcome, Committer, Endorser, LitefabError, MetricsRegistry, Msp,
    NodeConfig, Proposal, RocksDbLedger, RocksDbLedgerConfig, RocksDbWorldState,
    RocksDbWorldStateConfig, SigningIdentity, TransactionEnvelope, WorldState,
};

use crate::respond::error_response;

/// One block waiting to be committed, with its reply channel.
struct CommitRequest {
    block: Block,
    reply: oneshot::Sender<Result<CommitOutcome, LitefabError>>,
}

/// Shared state behind the peer's routes.
struct PeerState {
    msp: Arc<Msp>,
    endorser: Endorser,
    host: ChaincodeHost,
    world_state: Arc<Mutex<RocksDbWorldState>>,
    commit_queue: mpsc::Sender<CommitRequest>,
    orderers: Vec<String>,
    next_orderer: AtomicUsize,
    http: reqwest::Client,
    metrics: Arc<MetricsRegistry>,
}

type SharedPeer = Arc<PeerState>;

/// Runs a peer node until shutdown.
pub async fn run(cfg: NodeConfig) -> Result<(), String> {
    let msp = Arc::new(
        Msp::load(&cfg.msp_path).map_err(|e| format!("loading MSP config: {e}"))?,
    );
    let key = SigningIdentity::from_pem_file(&cfg.private_key_path)
        .map_err(|e| format!("loading private key: {e}"))?;

    let world_state = RocksDbWorldState::open(&RocksDbWorldStateConfig {
        path: cfg.worldstate_path().to_string_lossy().to_string(),
        channel: cfg.channel.clone(),
        create_if_missing: true,
    })
    .map_err(|e| format!("opening world state: {e}"))?;

    let ledger = RocksDbLedger::open(&RocksDbLedgerConfig {
        path: cfg.ledger_path().to_string_lossy().to_string(),
        create_if_missing: true,
    })
    .map_err(|e| format!("opening ledger: {e}"))?;

    let metrics =
        Arc::new(MetricsRegistry::new().map_err(|e| format!("metrics registry: {e}"))?);

    let world_state = Arc::new(Mutex::new(world_state));

    // Single-consumer commit queue: the spawned task owns the ledger and
    // serializes block application.
    let (commit_queue, commit_rx) = mpsc::channel::<CommitRequest>(64);
    tokio::spawn(run_committer(
        commit_rx,
        world_state.clone(),
        ledger,
        Committer::new(msp.clone()),
        metrics.clone(),
    ));

    let state: SharedPeer = Arc::new(PeerState {
        msp,
        endorser: Endorser::new(cfg.node_id.clone(), cfg.org_id.clone(), key),
        host: ChaincodeHost::with_builtins(),
        world_state,
        commit_queue,
        orderers: cfg.orderers.clone(),
        next_orderer: AtomicUsize::new(0),
        http: reqwest::Client::new(),
        metrics,
    });

    let app = Router::new()
        .route("/proposal", post(handle_proposal))
        .route("/submit", post(handle_submit))
        .route("/query", get(handle_query))
        .route("/block", post(handle_block))
        .route("/metrics", get(handle_metrics))
        .with_state(state);

    tracing::info!(node = %cfg.node_id, "peer listening on http://{}", cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await
        .map_err(|e| format!("peer server error: {e}"))?;

    // Dropping the router releases the commit queue; the committer task
    // drains and exits, closing both stores on the way out.
    tracing::info!("peer shut down");
    Ok(())
}

/// The commit loop: one block at a time, in arrival order.
async fn run_committer(
    mut queue: mpsc::Receiver<CommitRequest>,
    world_state: Arc<Mutex<RocksDbWorldState>>,
    mut ledger: RocksDbLedger,
    committer: Committer,
    metrics: Arc<MetricsRegistry>,
) {
    while let Some(request) = queue.recv().await {
        let started = Instant::now();
        let result = {
            let mut state = world_state.lock().await;
            committer.commit_block(&mut *state, &mut ledger, request.block)
        };

        if let Ok(outcome) = &result {
            metrics.pipeline.blocks_committed.inc();
            metrics
                .pipeline
                .commit_seconds
                .observe(started.elapsed().as_secs_f64());
            for info in &outcome.validation {
                metrics
                    .pipeline
                    .txs_by_code
                    .with_label_values(&[info.code.as_str()])
                    .inc();
            }
        }

        // The requester may have given up on the response; that is fine.
        let _ = request.reply.send(result);
    }
    tracing::info!("commit queue closed, committer exiting");
}

/// `POST /proposal`
async fn handle_proposal(
    State(state): State<SharedPeer>,
    Json(proposal): Json<Proposal>,
) -> impl IntoResponse {
    let result = {
        let world_state = state.world_state.lock().await;
        state
            .endorser
            .endorse(&state.msp, &state.host, &*world_state, &proposal)
    };

    match result {
        Ok(response) => {
            state.metrics.pipeline.proposals_endorsed.inc();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            state.metrics.pipeline.proposals_rejected.inc();
            tracing::warn!(tx_id = %proposal.tx_id, error = %e, "proposal rejected");
            error_response(&e).into_response()
        }
    }
}

/// `POST /submit`: relay to a configured orderer, round-robin.
async fn handle_submit(
    State(state): State<SharedPeer>,
    Json(envelope): Json<TransactionEnvelope>,
) -> impl IntoResponse {
    // Reject obviously bad envelopes here rather than wasting an orderer
    // round-trip.
    let signed = match envelope.signed_payload() {
        Ok(signed) => signed,
        Err(e) => return error_response(&e).into_response(),
    };
    let outcome = state.msp.verify_signature(
        &signed,
        &envelope.client_signature,
        &envelope.creator_id,
        Some(litefab::Role::Client),
    );
    if !outcome.valid {
        let err = LitefabError::SignatureInvalid(
            outcome.error.unwrap_or_else(|| "envelope signature".into()),
        );
        return error_response(&err).into_response();
    }

    if state.orderers.is_empty() {
        let err = LitefabError::BadRequest("no orderers configured".into());
        return error_response(&err).into_response();
    }

    // Round-robin with failover: start at the next orderer and walk the
    // whole list before giving up.
    let start = state.next_orderer.fetch_add(1, Ordering::Relaxed);
    for offset in 0..state.orderers.len() {
        let orderer = &state.orderers[(start + offset) % state.orderers.len()];
        let url = format!("{}/submit", orderer.trim_end_matches('/'));
        match state.http.post(&url).json(&envelope).send().await {
            Ok(resp) => {
                let status = StatusCode::from_u16(resp.status().as_u16())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                let body: serde_json::Value =
                    resp.json().await.unwrap_or_else(|_| serde_json::json!({}));
                return (status, Json(body)).into_response();
            }
            Err(e) => {
                tracing::warn!(%orderer, error = %e, "orderer unreachable, trying next");
            }
        }
    }

    let err = LitefabError::Transport(format!(
        "all {} orderer(s) unreachable",
        state.orderers.len()
    ));
    error_response(&err).into_response()
}

/// `GET /query?key=K`
async fn handle_query(
    State(state): State<SharedPeer>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(key) = params.get("key") else {
        let err = LitefabError::BadRequest("missing 'key' query parameter".into());
        return error_response(&err).into_response();
    };

    let value = {
        let world_state = state.world_state.lock().await;
        world_state.get(key)
    };

    match value {
        Ok(value) => (
            StatusCode::OK,
            Json(serde_json::json!({ "value": value })),
        )
            .into_response(),
        Err(e) => error_response(&LitefabError::Storage(e)).into_response(),
    }
}

/// `POST /block`
async fn handle_block(
    State(state): State<SharedPeer>,
    Json(block): Json<Block>,
) -> impl IntoResponse {
    let (reply, outcome) = oneshot::channel();
    if state
        .commit_queue
        .send(CommitRequest { block, reply })
        .await
        .is_err()
    {
        let err = LitefabError::BadRequest("committer is shutting down".into());
        return error_response(&err).into_response();
    }

    match outcome.await {
        Ok(Ok(_)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "committed" })),
        )
            .into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "block commit failed");
            error_response(&e).into_response()
        }
        Err(_) => {
            let err = LitefabError::BadRequest("committer dropped the request".into());
            error_response(&err).into_response()
        }
    }
}

/// `GET /metrics`
async fn handle_metrics(State(state): State<SharedPeer>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.gather_text(),
    )
}
