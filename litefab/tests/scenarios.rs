//! End-to-end pipeline scenarios over in-memory stores.
//!
//! Each test assembles a miniature two-org network (one client, one
//! endorsing peer per org, a solo orderer, and a committing peer) and
//! drives real proposals through endorsement, ordering, and commit with
//! real RSA signatures. No HTTP is involved; the scenarios exercise the
//! same service objects the node binary wires behind its routes.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use litefab::{
    Block, ChaincodeHost, Client, CommitOutcome, Committer, Endorser, EndorsementPolicy,
    Identity, InMemoryLedger, InMemoryWorldState, LedgerStore, Msp, MspConfig, OrdererService,
    OrgConfig, PolicyType, Role, SigningIdentity, SoloConsensus, SubmitDisposition,
    TransactionEnvelope, TxPayload, ValidationCode, WorldState,
};

struct NetKeys {
    client: SigningIdentity,
    peer1: SigningIdentity,
    peer2: SigningIdentity,
    orderer: SigningIdentity,
}

/// RSA-2048 generation dominates test time, so one key set is shared by
/// every scenario.
fn keys() -> &'static NetKeys {
    static KEYS: OnceLock<NetKeys> = OnceLock::new();
    KEYS.get_or_init(|| NetKeys {
        client: SigningIdentity::generate().unwrap(),
        peer1: SigningIdentity::generate().unwrap(),
        peer2: SigningIdentity::generate().unwrap(),
        orderer: SigningIdentity::generate().unwrap(),
    })
}

struct TestNet {
    client: Client,
    peer1: Endorser,
    peer2: Endorser,
    host: ChaincodeHost,
    orderer: OrdererService<InMemoryLedger>,
    committer: Committer,
    state: InMemoryWorldState,
    ledger: InMemoryLedger,
}

/// Which peers endorse a given transaction.
#[derive(Clone, Copy)]
enum Endorsers {
    Org1,
    Both,
}

/// The shared network MSP: two peer orgs plus the orderer org.
fn network_msp() -> Msp {
    static MSP: OnceLock<Msp> = OnceLock::new();
    MSP.get_or_init(|| {
        let keys = keys();
        Msp::from_config(MspConfig {
            orgs: vec![
                OrgConfig {
                    org_id: "Org1".into(),
                    root_public_keys: vec![],
                    identities: vec![
                        Identity {
                            id: "org1-client".into(),
                            org_id: "Org1".into(),
                            role: Role::Client,
                            public_key: keys.client.public_key_pem().unwrap(),
                        },
                        Identity {
                            id: "org1-peer".into(),
                            org_id: "Org1".into(),
                            role: Role::Peer,
                            public_key: keys.peer1.public_key_pem().unwrap(),
                        },
                    ],
                },
                OrgConfig {
                    org_id: "Org2".into(),
                    root_public_keys: vec![],
                    identities: vec![Identity {
                        id: "org2-peer".into(),
                        org_id: "Org2".into(),
                        role: Role::Peer,
                        public_key: keys.peer2.public_key_pem().unwrap(),
                    }],
                },
                OrgConfig {
                    org_id: "OrdererOrg".into(),
                    root_public_keys: vec![],
                    identities: vec![Identity {
                        id: "orderer1".into(),
                        org_id: "OrdererOrg".into(),
                        role: Role::Orderer,
                        public_key: keys.orderer.public_key_pem().unwrap(),
                    }],
                },
            ],
        })
        .unwrap()
    })
    .clone()
}

impl TestNet {
    fn new(block_size: usize) -> Self {
        let keys = keys();
        let msp = Arc::new(network_msp());

        TestNet {
            client: Client::new_in_process("org1-client", "Org1", keys.client.clone()).unwrap(),
            peer1: Endorser::new("org1-peer", "Org1", keys.peer1.clone()),
            peer2: Endorser::new("org2-peer", "Org2", keys.peer2.clone()),
            host: ChaincodeHost::with_builtins(),
            orderer: OrdererService::new(
                "orderer1",
                keys.orderer.clone(),
                msp.clone(),
                InMemoryLedger::new(),
                Box::new(SoloConsensus::new(block_size, Duration::from_millis(2000))),
            ),
            committer: Committer::new(msp),
            state: InMemoryWorldState::new(),
            ledger: InMemoryLedger::new(),
        }
    }

    /// Endorse a payload against the current peer state.
    fn endorse(
        &self,
        payload: TxPayload,
        endorsers: Endorsers,
    ) -> Result<TransactionEnvelope, litefab::LitefabError> {
        let proposal = self.client.new_proposal(payload)?;

        let msp = network_msp();
        let mut responses = vec![self
            .peer1
            .endorse(&msp, &self.host, &self.state, &proposal)?];
        if matches!(endorsers, Endorsers::Both) {
            responses.push(self.peer2.endorse(&msp, &self.host, &self.state, &proposal)?);
        }

        self.client.assemble_envelope(&proposal, &responses)
    }

    /// Submit one envelope; if the orderer seals a block, commit it on the
    /// peer and return the outcome.
    fn submit_and_commit(&mut self, envelope: TransactionEnvelope) -> Option<CommitOutcome> {
        match self.orderer.submit(envelope).unwrap() {
            SubmitDisposition::Sealed(block) => Some(self.commit(block)),
            SubmitDisposition::Queued { .. } => None,
        }
    }

    fn commit(&mut self, block: Block) -> CommitOutcome {
        self.committer
            .commit_block(&mut self.state, &mut self.ledger, block)
            .unwrap()
    }

    /// Full endorse, order, and commit round for one transaction.
    fn run(&mut self, payload: TxPayload, endorsers: Endorsers) -> CommitOutcome {
        let envelope = self.endorse(payload, endorsers).unwrap();
        self.submit_and_commit(envelope)
            .expect("block_size=1 nets seal on every submission")
    }

    fn value(&self, key: &str) -> Option<String> {
        self.state.get(key).unwrap()
    }
}

fn deploy_basic(net: &mut TestNet) -> CommitOutcome {
    net.run(
        TxPayload::deploy(
            "basic",
            vec![],
            Some(EndorsementPolicy::new(PolicyType::Any, vec!["Org1".into()])),
        ),
        Endorsers::Org1,
    )
}

fn mint_500_alice(net: &mut TestNet) -> CommitOutcome {
    net.run(
        TxPayload::invoke("basic", "mint", vec!["500".into(), "Alice".into()]),
        Endorsers::Org1,
    )
}

fn transfer(net: &mut TestNet, from: &str, to: &str, amount: &str) -> CommitOutcome {
    net.run(
        TxPayload::invoke(
            "basic",
            "transfer",
            vec![from.into(), to.into(), amount.into()],
        ),
        Endorsers::Org1,
    )
}

#[test]
fn s1_deploy() {
    let mut net = TestNet::new(1);
    let outcome = deploy_basic(&mut net);

    assert_eq!(outcome.block_number, 0);
    assert_eq!(outcome.validation[0].code, ValidationCode::Valid);
    assert_eq!(net.value("totalSupply").as_deref(), Some("0"));
    assert!(net.state.get_chaincode_metadata("basic").unwrap().is_some());
    assert_eq!(net.ledger.latest_block_number().unwrap(), Some(0));
}

#[test]
fn s2_mint() {
    let mut net = TestNet::new(1);
    deploy_basic(&mut net);
    let outcome = mint_500_alice(&mut net);

    assert_eq!(outcome.block_number, 1);
    assert_eq!(outcome.validation[0].code, ValidationCode::Valid);
    assert_eq!(net.value("balance:Alice").as_deref(), Some("500"));
    assert_eq!(net.value("totalSupply").as_deref(), Some("500"));
}

#[test]
fn s3_transfer() {
    let mut net = TestNet::new(1);
    deploy_basic(&mut net);
    mint_500_alice(&mut net);
    let outcome = transfer(&mut net, "Alice", "Bob", "100");

    assert_eq!(outcome.block_number, 2);
    assert_eq!(outcome.validation[0].code, ValidationCode::Valid);
    assert_eq!(net.value("balance:Alice").as_deref(), Some("400"));
    assert_eq!(net.value("balance:Bob").as_deref(), Some("100"));
    assert_eq!(net.value("totalSupply").as_deref(), Some("500"));
}

#[test]
fn s4_insufficient_balance() {
    let mut net = TestNet::new(1);
    deploy_basic(&mut net);
    mint_500_alice(&mut net);
    transfer(&mut net, "Alice", "Bob", "100");

    // Endorsement fails: the chaincode rejects the overdraft, so no
    // honest peer will endorse it.
    let err = net
        .endorse(
            TxPayload::invoke(
                "basic",
                "transfer",
                vec!["Bob".into(), "Alice".into(), "9999".into()],
            ),
            Endorsers::Org1,
        )
        .unwrap_err();
    assert!(err.to_string().contains("insufficient balance"));

    // A client that submits anyway, without endorsements, gets its
    // transaction recorded with a non-VALID code and no state effect.
    let proposal = net
        .client
        .new_proposal(TxPayload::invoke(
            "basic",
            "transfer",
            vec!["Bob".into(), "Alice".into(), "9999".into()],
        ))
        .unwrap();
    let mut envelope = TransactionEnvelope {
        tx_id: proposal.tx_id.clone(),
        creator_id: proposal.creator_id.clone(),
        creator_org_id: proposal.creator_org_id.clone(),
        creator_pub_key: proposal.creator_pub_key.clone(),
        payload: proposal.payload.clone(),
        rw_set: Default::default(),
        result: None,
        endorsements: vec![],
        client_signature: String::new(),
    };
    envelope.client_signature = keys()
        .client
        .sign_base64(&envelope.signed_payload().unwrap());

    let outcome = net.submit_and_commit(envelope).unwrap();
    assert_eq!(
        outcome.validation[0].code,
        ValidationCode::EndorsementPolicyFailure
    );

    // World state unchanged.
    assert_eq!(net.value("balance:Alice").as_deref(), Some("400"));
    assert_eq!(net.value("balance:Bob").as_deref(), Some("100"));
    assert_eq!(net.value("totalSupply").as_deref(), Some("500"));
}

#[test]
fn s5_mvcc_conflict() {
    let mut net = TestNet::new(1);
    deploy_basic(&mut net);
    mint_500_alice(&mut net);
    transfer(&mut net, "Alice", "Bob", "100");
    assert_eq!(net.value("balance:Alice").as_deref(), Some("400"));

    // Two endorsements against the same snapshot (balance:Alice = 400).
    let e1 = net
        .endorse(
            TxPayload::invoke(
                "basic",
                "transfer",
                vec!["Alice".into(), "Bob".into(), "100".into()],
            ),
            Endorsers::Org1,
        )
        .unwrap();
    let e2 = net
        .endorse(
            TxPayload::invoke(
                "basic",
                "transfer",
                vec!["Alice".into(), "Bob".into(), "100".into()],
            ),
            Endorsers::Org1,
        )
        .unwrap();

    // The orderer batches both into block 3.
    let mut batching = TestNet::new(2);
    // Re-point the batching orderer at the established chain by replaying
    // the three setup blocks into its ledger.
    for number in 0..=2 {
        let block = net.ledger.get_block(number).unwrap().unwrap();
        batching.orderer.store_remote(block).unwrap();
    }

    assert!(batching.orderer.submit(e1).is_ok());
    let block = match batching.orderer.submit(e2).unwrap() {
        SubmitDisposition::Sealed(block) => block,
        other => panic!("expected a sealed block, got {other:?}"),
    };
    assert_eq!(block.header.number, 3);
    assert_eq!(block.transactions.len(), 2);

    let outcome = net.commit(block);
    assert_eq!(outcome.validation[0].code, ValidationCode::Valid);
    assert_eq!(
        outcome.validation[1].code,
        ValidationCode::MvccReadConflict
    );

    // Exactly one transfer applied.
    assert_eq!(net.value("balance:Alice").as_deref(), Some("300"));
    assert_eq!(net.value("balance:Bob").as_deref(), Some("200"));
    assert_eq!(net.value("totalSupply").as_deref(), Some("500"));
}

#[test]
fn s6_endorsement_shortfall() {
    let mut net = TestNet::new(1);

    // Deploy with ALL:[Org1, Org2]; the deploy itself is endorsed by both
    // orgs so it commits.
    let deploy = net
        .endorse(
            TxPayload::deploy(
                "basic",
                vec![],
                Some(EndorsementPolicy::new(
                    PolicyType::All,
                    vec!["Org1".into(), "Org2".into()],
                )),
            ),
            Endorsers::Both,
        )
        .unwrap();
    let outcome = net.submit_and_commit(deploy).unwrap();
    assert_eq!(outcome.validation[0].code, ValidationCode::Valid);

    // An invoke endorsed only by Org1 falls short of ALL at commit.
    let invoke = net
        .endorse(
            TxPayload::invoke("basic", "mint", vec!["10".into(), "Alice".into()]),
            Endorsers::Org1,
        )
        .unwrap();
    let outcome = net.submit_and_commit(invoke).unwrap();
    assert_eq!(
        outcome.validation[0].code,
        ValidationCode::EndorsementPolicyFailure
    );
    assert_eq!(net.value("balance:Alice"), None);

    // With both orgs endorsing, the same invoke commits.
    let invoke = net
        .endorse(
            TxPayload::invoke("basic", "mint", vec!["10".into(), "Alice".into()]),
            Endorsers::Both,
        )
        .unwrap();
    let outcome = net.submit_and_commit(invoke).unwrap();
    assert_eq!(outcome.validation[0].code, ValidationCode::Valid);
    assert_eq!(net.value("balance:Alice").as_deref(), Some("10"));
}

#[test]
fn hash_chain_is_continuous_across_blocks() {
    let mut net = TestNet::new(1);
    deploy_basic(&mut net);
    mint_500_alice(&mut net);
    transfer(&mut net, "Alice", "Bob", "100");

    // The orderer's chain links each block to the stored hash of its
    // predecessor.
    let orderer_ledger = net.orderer.ledger();
    assert_eq!(orderer_ledger.latest_block_number().unwrap(), Some(2));
    for number in 1..=2 {
        let prev = orderer_ledger.get_block(number - 1).unwrap().unwrap();
        let block = orderer_ledger.get_block(number).unwrap().unwrap();
        assert_eq!(block.header.previous_hash, prev.stored_hash().unwrap());
    }
    assert_eq!(
        orderer_ledger
            .get_block(0)
            .unwrap()
            .unwrap()
            .header
            .previous_hash,
        "0"
    );
}

#[test]
fn committed_blocks_record_tx_locations() {
    let mut net = TestNet::new(1);
    deploy_basic(&mut net);
    let outcome = mint_500_alice(&mut net);

    let tx_id = &outcome.validation[0].tx_id;
    let location = net.ledger.get_tx_location(tx_id).unwrap().unwrap();
    assert_eq!(location.block_num, 1);
    assert_eq!(location.tx_num, 0);
}
