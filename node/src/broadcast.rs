//! Best-effort block broadcasting from orderer to peers.

use litefab::Block;

/// Sends a sealed block to every configured peer's `/block` endpoint
/// concurrently. Failures are logged and never block the caller; a peer
/// that misses a block is expected to catch up out of band.
pub fn broadcast_block(http: &reqwest::Client, peers: &[String], block: &Block) {
    for peer in peers {
        let http = http.clone();
        let peer = peer.clone();
        let block = block.clone();

        tokio::spawn(async move {
            let url = format!("{}/block", peer.trim_end_matches('/'));
            match http.post(&url).json(&block).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(%peer, block = block.header.number, "block delivered");
                }
                Ok(resp) => {
                    tracing::warn!(
                        %peer,
                        block = block.header.number,
                        status = %resp.status(),
                        "peer rejected block"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        %peer,
                        block = block.header.number,
                        error = %e,
                        "block delivery failed"
                    );
                }
            }
        });
    }
}
