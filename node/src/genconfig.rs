//! Sample network generation: MSP, keys, and node/client configs.
//!
//! Produces a ready-to-run two-org network in one directory:
//!
//! ```text
//! <out>/
//!   msp.json          shared identity directory (public keys only)
//!   keys/<id>.pem     PKCS#8 private keys, one per identity
//!   peer1.json        Org1 peer on :7051
//!   peer2.json        Org2 peer on :7052
//!   orderer1.json     solo orderer on :7050
//!   client1.json      Org1 client config
//! ```

use std::fs;
use std::path::Path;

use litefab::{
    ClientConfig, ConsensusKind, Identity, MspConfig, NodeConfig, OrgConfig, Role,
    SigningIdentity,
};

const PEER1_URL: &str = "http://127.0.0.1:7051";
const PEER2_URL: &str = "http://127.0.0.1:7052";
const ORDERER_URL: &str = "http://127.0.0.1:7050";

/// Generates the sample network under `out_dir`.
pub fn generate(out_dir: &Path) -> Result<(), String> {
    let keys_dir = out_dir.join("keys");
    fs::create_dir_all(&keys_dir).map_err(|e| format!("creating {}: {e}", keys_dir.display()))?;

    let mut orgs: Vec<OrgConfig> = Vec::new();
    let identities = [
        ("org1-client", "Org1", Role::Client),
        ("org1-peer", "Org1", Role::Peer),
        ("org2-client", "Org2", Role::Client),
        ("org2-peer", "Org2", Role::Peer),
        ("orderer1", "OrdererOrg", Role::Orderer),
    ];

    for (id, org_id, role) in identities {
        tracing::info!(%id, "generating RSA-2048 keypair");
        let key = SigningIdentity::generate().map_err(|e| format!("keygen for {id}: {e}"))?;

        let key_path = keys_dir.join(format!("{id}.pem"));
        let pem = key
            .private_key_pem()
            .map_err(|e| format!("encoding key for {id}: {e}"))?;
        fs::write(&key_path, pem).map_err(|e| format!("writing {}: {e}", key_path.display()))?;

        let identity = Identity {
            id: id.to_string(),
            org_id: org_id.to_string(),
            role,
            public_key: key
                .public_key_pem()
                .map_err(|e| format!("public key for {id}: {e}"))?,
        };

        match orgs.iter_mut().find(|o| o.org_id == org_id) {
            Some(org) => org.identities.push(identity),
            None => orgs.push(OrgConfig {
                org_id: org_id.to_string(),
                root_public_keys: vec![],
                identities: vec![identity],
            }),
        }
    }

    write_json(&out_dir.join("msp.json"), &MspConfig { orgs })?;

    let node_config = |node_id: &str, org_id: &str, port: u16| NodeConfig {
        node_id: node_id.into(),
        org_id: org_id.into(),
        listen_addr: format!("127.0.0.1:{port}").parse().expect("fixed address literal"),
        data_dir: out_dir.join("data").join(node_id),
        channel: "default".into(),
        private_key_path: keys_dir.join(format!("{node_id}.pem")),
        msp_path: out_dir.join("msp.json"),
        peers: vec![PEER1_URL.into(), PEER2_URL.into()],
        orderers: vec![ORDERER_URL.into()],
        consensus: ConsensusKind::Solo,
        block_size: 10,
        block_timeout_ms: 2000,
    };

    write_json(&out_dir.join("peer1.json"), &node_config("org1-peer", "Org1", 7051))?;
    write_json(&out_dir.join("peer2.json"), &node_config("org2-peer", "Org2", 7052))?;
    write_json(
        &out_dir.join("orderer1.json"),
        &node_config("orderer1", "OrdererOrg", 7050),
    )?;

    write_json(
        &out_dir.join("client1.json"),
        &ClientConfig {
            client_id: "org1-client".into(),
            org_id: "Org1".into(),
            private_key_path: keys_dir.join("org1-client.pem"),
            msp_path: out_dir.join("msp.json"),
            peers: vec![PEER1_URL.into(), PEER2_URL.into()],
            orderers: vec![ORDERER_URL.into()],
            request_timeout_ms: 5000,
        },
    )?;

    println!("sample network written to {}", out_dir.display());
    println!("  start-orderer {}", out_dir.join("orderer1.json").display());
    println!("  start-peer    {}", out_dir.join("peer1.json").display());
    println!("  start-peer    {}", out_dir.join("peer2.json").display());
    println!(
        "  client deploy basic ANY:Org1 {}",
        out_dir.join("client1.json").display()
    );
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("encoding {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("writing {}: {e}", path.display()))
}
