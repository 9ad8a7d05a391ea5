// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Native script hash derivation flows

mod helpers;
use helpers::path;

use ledger_ada::{
    apdu::script::ScriptHashDisplayFormat, model::NativeScript, transport::RecordingExchange,
    DeviceHandle,
};

#[tokio::test]
async fn script_tree_streams_in_pre_order() {
    let t = RecordingExchange::new().with_reply(0x12, 0x03, 0x00, 0x9000, &[0x7c; 28]);
    let d = DeviceHandle::from(t);

    let script = NativeScript::Any {
        scripts: vec![
            NativeScript::PubkeyPath {
                path: path("m/1854'/1815'/0'/0/0"),
            },
            NativeScript::All {
                scripts: vec![
                    NativeScript::PubkeyHash { hash: [0x2f; 28] },
                    NativeScript::InvalidBefore { slot: 50_000_000 },
                ],
            },
        ],
    };

    let hash = d
        .derive_script_hash(&script, ScriptHashDisplayFormat::Bech32)
        .await
        .unwrap();
    assert_eq!(hash, [0x7c; 28]);

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(
        t.stages(),
        vec![
            (0x12, 0x01, 0x00), // any, two children
            (0x12, 0x02, 0x00), // pubkey path
            (0x12, 0x01, 0x00), // all, two children
            (0x12, 0x02, 0x00), // pubkey hash
            (0x12, 0x02, 0x00), // invalid before
            (0x12, 0x03, 0x00), // finish
        ]
    );
}

#[tokio::test]
async fn single_leaf_script() {
    let t = RecordingExchange::new().with_reply(0x12, 0x03, 0x00, 0x9000, &[0x7c; 28]);
    let d = DeviceHandle::from(t);

    let script = NativeScript::PubkeyHash { hash: [0x2f; 28] };

    d.derive_script_hash(&script, ScriptHashDisplayFormat::PolicyId)
        .await
        .unwrap();

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(t.stages(), vec![(0x12, 0x02, 0x00), (0x12, 0x03, 0x00)]);
}
