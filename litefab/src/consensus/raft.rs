//! Raft consensus module, at interface level.
//!
//! This implements the Raft role state machine (Follower, Candidate,
//! Leader, randomized election timeouts in [150 ms, 300 ms], 50 ms leader
//! heartbeats) and the leader-only submission rule. Log replication and
//! the vote/append RPC transport are not implemented; as a result the
//! module is only functional as a single-voter cluster, where the node
//! legitimately elects itself the moment its election timeout expires.
//! Multi-node deployments must configure Solo until replication lands.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::types::{Block, TransactionEnvelope};

use super::{Consensus, ConsensusError, SubmitOutcome};

/// Bounds of the randomized election timeout.
pub const ELECTION_TIMEOUT_MIN: Duration = Duration::from_millis(150);
pub const ELECTION_TIMEOUT_MAX: Duration = Duration::from_millis(300);

/// Interval at which a leader emits heartbeats.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Role a Raft node currently plays.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RaftRole {
    Follower,
    Candidate,
    Leader,
}

/// Raft-shaped consensus module.
pub struct RaftConsensus {
    node_id: String,
    peer_ids: Vec<String>,
    role: RaftRole,
    current_term: u64,
    voted_for: Option<String>,
    votes_received: usize,
    election_deadline: Instant,
    last_heartbeat: Instant,

    block_size: usize,
    block_timeout: Duration,
    pending: Vec<TransactionEnvelope>,
    timer_armed: bool,
}

impl RaftConsensus {
    pub fn new(
        node_id: impl Into<String>,
        peer_ids: Vec<String>,
        block_size: usize,
        block_timeout: Duration,
    ) -> Self {
        let now = Instant::now();
        Self {
            node_id: node_id.into(),
            peer_ids,
            role: RaftRole::Follower,
            current_term: 0,
            voted_for: None,
            votes_received: 0,
            election_deadline: now + Self::random_election_timeout(),
            last_heartbeat: now,
            block_size: block_size.max(1),
            block_timeout,
            pending: Vec::new(),
            timer_armed: false,
        }
    }

    fn random_election_timeout() -> Duration {
        let span = (ELECTION_TIMEOUT_MAX - ELECTION_TIMEOUT_MIN).as_millis() as u64;
        ELECTION_TIMEOUT_MIN + Duration::from_millis(rand::thread_rng().gen_range(0..=span))
    }

    fn cluster_size(&self) -> usize {
        self.peer_ids.len() + 1
    }

    fn majority(&self) -> usize {
        self.cluster_size() / 2 + 1
    }

    pub fn role(&self) -> RaftRole {
        self.role
    }

    pub fn current_term(&self) -> u64 {
        self.current_term
    }

    /// Advances election and heartbeat timers to `now`.
    ///
    /// A follower or candidate whose election deadline passed starts a new
    /// election: it increments the term and votes for itself. With no vote
    /// transport, the only vote counted is its own, so the election
    /// succeeds exactly when this node constitutes a majority by itself.
    pub fn tick(&mut self, now: Instant) {
        match self.role {
            RaftRole::Leader => {
                if now.duration_since(self.last_heartbeat) >= HEARTBEAT_INTERVAL {
                    self.last_heartbeat = now;
                    tracing::trace!(term = self.current_term, "heartbeat due");
                }
            }
            RaftRole::Follower | RaftRole::Candidate => {
                if now >= self.election_deadline {
                    self.start_election(now);
                }
            }
        }
    }

    fn start_election(&mut self, now: Instant) {
        self.role = RaftRole::Candidate;
        self.current_term += 1;
        self.voted_for = Some(self.node_id.clone());
        self.votes_received = 1;
        self.election_deadline = now + Self::random_election_timeout();

        tracing::debug!(term = self.current_term, "election started");

        if self.votes_received >= self.majority() {
            self.role = RaftRole::Leader;
            self.last_heartbeat = now;
            tracing::info!(term = self.current_term, "became leader");
        }
    }
}

impl Consensus for RaftConsensus {
    fn submit_tx(&mut self, env: TransactionEnvelope) -> Result<SubmitOutcome, ConsensusError> {
        if self.role != RaftRole::Leader {
            return Err(ConsensusError::NotLeader {
                hint: self.voted_for.clone().filter(|id| id != &self.node_id),
            });
        }

        self.pending.push(env);
        if self.pending.len() >= self.block_size {
            self.timer_armed = false;
            return Ok(SubmitOutcome::Cut(std::mem::take(&mut self.pending)));
        }
        let arm_timer = !self.timer_armed;
        self.timer_armed = true;
        Ok(SubmitOutcome::Queued { arm_timer })
    }

    fn cut(&mut self) -> Vec<TransactionEnvelope> {
        self.timer_armed = false;
        std::mem::take(&mut self.pending)
    }

    fn on_block_committed(&mut self, block: &Block) {
        tracing::debug!(
            block = block.header.number,
            term = self.current_term,
            "raft observed sealed block"
        );
    }

    fn block_timeout(&self) -> Duration {
        self.block_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tx::TxPayload;
    use crate::types::RwSet;

    fn envelope(tx_id: &str) -> TransactionEnvelope {
        TransactionEnvelope {
            tx_id: tx_id.into(),
            creator_id: "c".into(),
            creator_org_id: "Org1".into(),
            creator_pub_key: "PEM".into(),
            payload: TxPayload::invoke("basic", "mint", vec![]),
            rw_set: RwSet::default(),
            result: None,
            endorsements: vec![],
            client_signature: "sig".into(),
        }
    }

    #[test]
    fn follower_rejects_submissions() {
        let mut raft =
            RaftConsensus::new("orderer1", vec![], 10, Duration::from_millis(2000));
        assert_eq!(raft.role(), RaftRole::Follower);
        assert!(matches!(
            raft.submit_tx(envelope("a")),
            Err(ConsensusError::NotLeader { .. })
        ));
    }

    #[test]
    fn single_voter_cluster_elects_itself_after_timeout() {
        let mut raft =
            RaftConsensus::new("orderer1", vec![], 10, Duration::from_millis(2000));

        // Before the deadline nothing changes.
        raft.tick(Instant::now());
        assert_eq!(raft.role(), RaftRole::Follower);

        // Past the deadline the node elects itself (majority of 1).
        raft.tick(Instant::now() + ELECTION_TIMEOUT_MAX);
        assert_eq!(raft.role(), RaftRole::Leader);
        assert_eq!(raft.current_term(), 1);

        // And accepts submissions from then on.
        assert!(raft.submit_tx(envelope("a")).is_ok());
    }

    #[test]
    fn multi_node_candidate_never_wins_without_votes() {
        let mut raft = RaftConsensus::new(
            "orderer1",
            vec!["orderer2".into(), "orderer3".into()],
            10,
            Duration::from_millis(2000),
        );

        raft.tick(Instant::now() + ELECTION_TIMEOUT_MAX);
        assert_eq!(raft.role(), RaftRole::Candidate);
        assert!(raft.submit_tx(envelope("a")).is_err());
    }

    #[test]
    fn leader_batches_like_solo() {
        let mut raft =
            RaftConsensus::new("orderer1", vec![], 2, Duration::from_millis(2000));
        raft.tick(Instant::now() + ELECTION_TIMEOUT_MAX);

        assert!(matches!(
            raft.submit_tx(envelope("a")).unwrap(),
            SubmitOutcome::Queued { arm_timer: true }
        ));
        match raft.submit_tx(envelope("b")).unwrap() {
            SubmitOutcome::Cut(batch) => assert_eq!(batch.len(), 2),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn election_timeout_is_within_bounds() {
        for _ in 0..32 {
            let t = RaftConsensus::random_election_timeout();
            assert!(t >= ELECTION_TIMEOUT_MIN && t <= ELECTION_TIMEOUT_MAX);
        }
    }
}
