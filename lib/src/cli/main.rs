// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for interacting with the Ledger Cardano app

use std::path::Path;

use clap::Parser;
use log::{debug, info, LevelFilter};
use serde::{de::DeserializeOwned, Serialize};

use ledger_ada::{
    apdu::{
        addr::AddressParams,
        path::DerivationPath,
        script::ScriptHashDisplayFormat,
    },
    model::{MsgSignRequest, NativeScript, Transaction},
    transport::{TcpExchange, TcpOptions},
    DeviceHandle,
};

mod helpers;
use helpers::*;

/// Ledger command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Speculos / proxy TCP target
    #[clap(flatten)]
    target: TcpOptions,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Timeout for operations requiring user interaction in seconds
    #[clap(long, default_value = "60")]
    user_timeout: usize,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Fetch application version
    Version,

    /// Fetch device serial number
    Serial,

    /// Export extended public keys
    PublicKeys {
        /// Derivation paths to export, repeatable
        #[clap(long = "path", required = true, value_parser = parse_path)]
        paths: Vec<DerivationPath>,
    },

    /// Derive an address from a JSON parameter file
    Address {
        /// Address parameter file (JSON)
        #[clap(long)]
        input: String,

        /// Display the address on the device instead of returning it
        #[clap(long)]
        show: bool,
    },

    /// Sign a transaction from a JSON file
    SignTx {
        /// Transaction file (JSON)
        #[clap(long)]
        input: String,

        /// File for the signed result (JSON), logged when omitted
        #[clap(long)]
        output: Option<String>,
    },

    /// Sign a CIP-8 message from a JSON file
    SignMsg {
        /// Message signing request file (JSON)
        #[clap(long)]
        input: String,

        /// File for the signed result (JSON), logged when omitted
        #[clap(long)]
        output: Option<String>,
    },

    /// Sign a CIP-36 vote cast
    SignVote {
        /// Hex-encoded vote cast
        #[clap(long)]
        data: HexVec,

        /// Witness path
        #[clap(long, value_parser = parse_path)]
        path: DerivationPath,
    },

    /// Sign an operational certificate
    SignOpCert {
        /// KES public key
        #[clap(long)]
        kes_public_key: HexData<32>,

        /// KES period
        #[clap(long)]
        kes_period: u64,

        /// Issue counter
        #[clap(long)]
        issue_counter: u64,

        /// Cold key path
        #[clap(long, value_parser = parse_path)]
        path: DerivationPath,
    },

    /// Derive a native script hash from a JSON file
    ScriptHash {
        /// Native script file (JSON)
        #[clap(long)]
        input: String,

        /// Display the hash as a policy id rather than bech32
        #[clap(long)]
        policy_id: bool,
    },
}

fn parse_path(s: &str) -> Result<DerivationPath, String> {
    s.parse().map_err(|e| format!("invalid path: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default()).unwrap();

    // Connect to the device
    debug!("Connecting to {}", args.target.target);
    let t = TcpExchange::connect(&args.target).await?;

    let mut d = DeviceHandle::from(t);
    d.set_user_timeout(args.user_timeout);

    // Execute command
    execute(d, args.cmd).await?;

    Ok(())
}

/// Execute a command with the provided device handle
async fn execute<T, E>(t: DeviceHandle<T>, cmd: Actions) -> anyhow::Result<()>
where
    T: ledger_ada::transport::Exchange<Error = E> + Send,
    E: std::error::Error + Sync + Send + 'static,
{
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::Version => {
            let v = t.app_version().await?;

            info!("app version: {} (flags: {:?})", v, v.flags);
        }
        Actions::Serial => {
            let s = t.serial().await?;

            info!("serial: {}", hex::encode(s.serial));
        }
        Actions::PublicKeys { paths } => {
            info!("requesting {} public keys", paths.len());

            let keys = t.public_keys(&paths).await?;

            for (path, key) in paths.iter().zip(keys.iter()) {
                info!(
                    "{}: key {} chain code {}",
                    path,
                    hex::encode(key.public_key),
                    hex::encode(key.chain_code),
                );
            }
        }
        Actions::Address { input, show } => {
            let params: AddressParams = read_input(&input).await?;

            if show {
                t.show_address(&params).await?;
                info!("address confirmed");
            } else {
                let address = t.derive_address(&params).await?;
                info!("address: {}", hex::encode(address));
            }
        }
        Actions::SignTx { input, output } => {
            debug!("Loading transaction from '{}'", input);
            let tx: Transaction = read_input(&input).await?;

            let signed = t.sign_transaction(&tx).await?;

            info!("tx hash: {}", hex::encode(signed.tx_hash));
            for w in &signed.witnesses {
                info!("witness {}: {}", w.path, hex::encode(w.signature));
            }

            if let Some(output) = output {
                write_output(&output, &signed).await?;
            }
        }
        Actions::SignMsg { input, output } => {
            debug!("Loading message request from '{}'", input);
            let req: MsgSignRequest = read_input(&input).await?;

            let signed = t.sign_message(&req).await?;

            info!("signature: {}", hex::encode(signed.signature));
            info!("key: {}", hex::encode(signed.key));

            if let Some(output) = output {
                write_output(&output, &signed).await?;
            }
        }
        Actions::SignVote { data, path } => {
            let signed = t.sign_vote(data.as_ref(), &path).await?;

            info!("vote cast hash: {}", hex::encode(signed.votecast_hash));
            info!("signature: {}", hex::encode(signed.signature));
        }
        Actions::SignOpCert {
            kes_public_key,
            kes_period,
            issue_counter,
            path,
        } => {
            let signature = t
                .sign_op_cert(*kes_public_key.as_ref(), kes_period, issue_counter, &path)
                .await?;

            info!("signature: {}", hex::encode(signature));
        }
        Actions::ScriptHash { input, policy_id } => {
            debug!("Loading native script from '{}'", input);
            let script: NativeScript = read_input(&input).await?;

            let format = match policy_id {
                true => ScriptHashDisplayFormat::PolicyId,
                false => ScriptHashDisplayFormat::Bech32,
            };

            let hash = t.derive_script_hash(&script, format).await?;

            info!("script hash: {}", hex::encode(hash));
        }
    }

    Ok(())
}

/// Helper to read input files where required
async fn read_input<T: DeserializeOwned>(file_name: &str) -> anyhow::Result<T> {
    debug!("Reading input from '{}'", file_name);

    let s = tokio::fs::read_to_string(file_name).await?;

    // Determine format from file name
    let p = Path::new(file_name);

    // Decode based on input extension
    let v = match p.extension().and_then(|e| e.to_str()) {
        // Encode to JSON for `.json` files
        Some("json") => serde_json::from_str(&s)?,
        _ => return Err(anyhow::anyhow!("unsupported input file format")),
    };

    Ok(v)
}

/// Helper to write output files if `--output` argument is provided
async fn write_output(file_name: &str, value: &impl Serialize) -> anyhow::Result<()> {
    debug!("Writing output to '{}'", file_name);

    // Determine format from file name
    let p = Path::new(file_name);
    match p.extension().and_then(|e| e.to_str()) {
        // Encode to JSON for `.json` files
        Some("json") => {
            let s = serde_json::to_string(value)?;
            tokio::fs::write(p, s).await?;
        }
        _ => return Err(anyhow::anyhow!("unsupported output file format")),
    }

    Ok(())
}
