//! Node binary: peer and orderer processes plus the CLI client.
//!
//! Subcommands:
//!
//! - `generate-config [dir]`: emit a sample two-org network,
//! - `start-peer <config>` / `start-orderer <config>`: run a node until
//!   SIGINT, then shut down gracefully,
//! - `client deploy <chaincodeId> <policy> <config>`,
//! - `client invoke <chaincodeId> <fn> [args…] <config>`,
//! - `client query <chaincodeId> <key> <config>`.
//!
//! Exit code 0 on success, 1 on any failure; errors go to stderr.

mod broadcast;
mod genconfig;
mod orderer;
mod peer;
mod respond;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use litefab::{Client, ClientConfig, EndorsementPolicy, NodeConfig};

#[derive(Parser)]
#[command(name = "litefab-node", version, about = "litefab permissioned-blockchain node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Emit a sample MSP, keys, and node/client configs.
    GenerateConfig {
        /// Output directory for the generated network.
        #[arg(default_value = "litefab-net")]
        out_dir: PathBuf,
    },
    /// Run a peer node.
    StartPeer {
        /// Path to the peer's JSON config.
        config: PathBuf,
    },
    /// Run an orderer node.
    StartOrderer {
        /// Path to the orderer's JSON config.
        config: PathBuf,
    },
    /// Client operations against a running network.
    #[command(subcommand)]
    Client(ClientCommand),
}

#[derive(Subcommand)]
enum ClientCommand {
    /// Deploy a chaincode with an endorsement policy.
    Deploy {
        chaincode_id: String,
        /// Policy literal: `(ANY|ALL|MAJORITY):Org1,Org2[,…]`.
        policy: String,
        config: PathBuf,
    },
    /// Invoke a chaincode function. The last argument is the client
    /// config path; everything between the function and the config is
    /// passed to the chaincode.
    Invoke {
        chaincode_id: String,
        function: String,
        /// Chaincode arguments followed by the client config path.
        #[arg(num_args = 1.., required = true)]
        args_then_config: Vec<String>,
    },
    /// Read a world-state key through a peer.
    Query {
        chaincode_id: String,
        key: String,
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "litefab_node=info,litefab=info".to_string()),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::GenerateConfig { out_dir } => genconfig::generate(&out_dir),
        Command::StartPeer { config } => {
            let cfg = NodeConfig::load(&config).map_err(|e| e.to_string())?;
            peer::run(cfg).await
        }
        Command::StartOrderer { config } => {
            let cfg = NodeConfig::load(&config).map_err(|e| e.to_string())?;
            orderer::run(cfg).await
        }
        Command::Client(command) => run_client(command).await,
    }
}

async fn run_client(command: ClientCommand) -> Result<(), String> {
    match command {
        ClientCommand::Deploy {
            chaincode_id,
            policy,
            config,
        } => {
            let client = load_client(&config)?;
            let policy = EndorsementPolicy::parse(&policy).map_err(|e| e.to_string())?;
            let tx_id = client
                .deploy(&chaincode_id, policy, vec![])
                .await
                .map_err(|e| e.to_string())?;
            println!("deployed '{chaincode_id}' (tx {tx_id})");
            Ok(())
        }
        ClientCommand::Invoke {
            chaincode_id,
            function,
            mut args_then_config,
        } => {
            // The config path is the trailing argument of the grammar
            // `invoke <chaincodeId> <fn> [args…] <config>`.
            let config = PathBuf::from(
                args_then_config
                    .pop()
                    .expect("clap enforces at least one trailing argument"),
            );
            let client = load_client(&config)?;
            let tx_id = client
                .invoke(&chaincode_id, &function, args_then_config)
                .await
                .map_err(|e| e.to_string())?;
            println!("invoked '{chaincode_id}.{function}' (tx {tx_id})");
            Ok(())
        }
        ClientCommand::Query {
            chaincode_id: _,
            key,
            config,
        } => {
            let client = load_client(&config)?;
            let value = client.query(&key).await.map_err(|e| e.to_string())?;
            match value {
                Some(value) => println!("{value}"),
                None => println!("null"),
            }
            Ok(())
        }
    }
}

fn load_client(config: &PathBuf) -> Result<Client, String> {
    let cfg = ClientConfig::load(config).map_err(|e| e.to_string())?;
    Client::from_config(&cfg).map_err(|e| e.to_string())
}

/// Resolves when SIGINT (Ctrl-C) arrives; used for graceful shutdown.
pub(crate) async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
