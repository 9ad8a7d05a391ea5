// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Shared fixtures for driving a [`DeviceHandle`] over a
//! [`RecordingExchange`]
//!
//! [`DeviceHandle`]: ledger_ada::DeviceHandle
//! [`RecordingExchange`]: ledger_ada::transport::RecordingExchange

use std::str::FromStr;

use ledger_ada::{
    apdu::{
        addr::{Destination, NetworkInfo},
        path::DerivationPath,
        tx::{TransactionSigningMode, TxOutputFormat, UtxoRef},
    },
    model::{Input, Output, Transaction},
};

#[allow(unused)]
pub fn path(s: &str) -> DerivationPath {
    DerivationPath::from_str(s).unwrap()
}

/// Input spending a fixed UTXO, witnessed by `p` when given
#[allow(unused)]
pub fn input(p: Option<&str>) -> Input {
    Input {
        utxo: UtxoRef {
            tx_hash: [0x1a; 32],
            index: 0,
        },
        path: p.map(path),
    }
}

/// Legacy-format output to a third-party address
#[allow(unused)]
pub fn output(amount: u64) -> Output {
    Output {
        format: TxOutputFormat::ArrayLegacy,
        destination: Destination::third_party(&[0x01, 0x02, 0x03]).unwrap(),
        amount,
        assets: vec![],
        datum: None,
        ref_script: None,
    }
}

/// Ordinary mainnet transaction with one input, one output and a fee
#[allow(unused)]
pub fn minimal_tx() -> Transaction {
    Transaction {
        network: NetworkInfo::MAINNET,
        signing_mode: TransactionSigningMode::Ordinary,
        tag_cbor_sets: false,
        inputs: vec![input(Some("m/1852'/1815'/0'/0/0"))],
        outputs: vec![output(2_000_000)],
        fee: 170_000,
        ttl: None,
        aux_data: None,
        certificates: vec![],
        withdrawals: vec![],
        validity_start: None,
        mint: vec![],
        script_data_hash: None,
        collateral_inputs: vec![],
        required_signers: vec![],
        include_network_id: false,
        collateral_output: None,
        total_collateral: None,
        reference_inputs: vec![],
        voting_procedures: vec![],
        treasury: None,
        donation: None,
        additional_witness_paths: vec![],
    }
}
