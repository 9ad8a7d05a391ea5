// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction signing flows over a scripted exchange
//!
//! These drive the full staged protocol and check the order and shape of
//! the emitted APDUs rather than device behaviour.

mod helpers;
use helpers::{input, minimal_tx, output, path};

use ledger_ada::{
    apdu::{
        addr::Destination,
        tx::{
            CVoteRegFormat, Certificate, Credential, GovActionId, PoolKeyRef, Relay,
            RequiredSigner, RewardAccountRef, TransactionSigningMode, TxOutputFormat, UtxoRef,
            Vote, VoteKeyRef, Voter,
        },
    },
    model::{
        AuxData, CVoteRegistration, CertificateEntry, Datum, MintEntry, MintGroup,
        PoolRegistration, VoteDelegation, VoteEntry, VoterVotes, Withdrawal,
    },
    transport::RecordingExchange,
    witness_paths, DeviceHandle, Error,
};

/// Exchange with the transaction hash and witness replies scripted
fn signing_exchange() -> RecordingExchange {
    RecordingExchange::new()
        .with_reply(0x21, 0x0a, 0x00, 0x9000, &[0x77; 32])
        .with_reply(0x21, 0x0f, 0x00, 0x9000, &[0x99; 64])
}

#[tokio::test]
async fn minimal_transaction() {
    let d = DeviceHandle::from(signing_exchange());

    let tx = minimal_tx();
    let signed = d.sign_transaction(&tx).await.unwrap();

    assert_eq!(signed.tx_hash, [0x77; 32]);
    assert_eq!(signed.witnesses.len(), 1);
    assert_eq!(signed.witnesses[0].path, path("m/1852'/1815'/0'/0/0"));
    assert_eq!(signed.witnesses[0].signature, [0x99; 64]);
    assert!(signed.cvote_registration.is_none());

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(
        t.stages(),
        vec![
            (0x21, 0x01, 0x00), // init
            (0x21, 0x02, 0x00), // input
            (0x21, 0x03, 0x30), // output top level
            (0x21, 0x03, 0x33), // output confirm
            (0x21, 0x04, 0x00), // fee
            (0x21, 0x0a, 0x00), // confirm
            (0x21, 0x0f, 0x00), // witness
        ]
    );

    // INIT is a fixed 60 byte payload ending in the witness count
    let init = &t.frames()[0];
    assert_eq!(init[4], 60);
    assert_eq!(&init[61..65], &[0, 0, 0, 1]);
}

#[tokio::test]
async fn full_body_stage_order() {
    let d = DeviceHandle::from(signing_exchange());

    let mut tx = minimal_tx();
    tx.ttl = Some(70_000_000);
    tx.aux_data = Some(AuxData::ArbitraryHash([0xad; 32]));
    tx.certificates = vec![CertificateEntry::Certificate(Certificate::StakeDelegation {
        credential: Credential::Path(path("m/1852'/1815'/0'/2/0")),
        pool_key_hash: [0xf0; 28],
    })];
    tx.withdrawals = vec![Withdrawal {
        amount: 1_000_000,
        credential: Credential::Path(path("m/1852'/1815'/0'/2/0")),
    }];
    tx.validity_start = Some(60_000_000);
    tx.mint = vec![MintGroup {
        policy_id: [0x9c; 28],
        tokens: vec![MintEntry {
            asset_name: vec![0xca, 0xfe],
            amount: -5,
        }],
    }];
    tx.script_data_hash = Some([0x3d; 32]);
    tx.collateral_inputs = vec![input(None)];
    tx.required_signers = vec![RequiredSigner::Path(path("m/1854'/1815'/0'/0/0"))];
    tx.collateral_output = Some(output(1_000_000));
    tx.total_collateral = Some(500_000);
    tx.reference_inputs = vec![UtxoRef {
        tx_hash: [0x2b; 32],
        index: 1,
    }];
    tx.voting_procedures = vec![VoterVotes {
        voter: Voter::DRepKeyPath(path("m/1852'/1815'/0'/3/0")),
        votes: vec![VoteEntry {
            gov_action: GovActionId {
                tx_hash: [0x6a; 32],
                index: 0,
            },
            vote: Vote::Yes,
            anchor: None,
        }],
    }];
    tx.treasury = Some(123);
    tx.donation = Some(456);
    tx.additional_witness_paths = vec![path("m/1852'/1815'/1'/0/0")];

    // Input, certificate, required signer, voter, then additional
    assert_eq!(
        witness_paths(&tx),
        vec![
            path("m/1852'/1815'/0'/0/0"),
            path("m/1852'/1815'/0'/2/0"),
            path("m/1854'/1815'/0'/0/0"),
            path("m/1852'/1815'/0'/3/0"),
            path("m/1852'/1815'/1'/0/0"),
        ]
    );

    let signed = d.sign_transaction(&tx).await.unwrap();
    assert_eq!(signed.witnesses.len(), 5);

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(
        t.stages(),
        vec![
            (0x21, 0x01, 0x00), // init
            (0x21, 0x08, 0x00), // aux data hash
            (0x21, 0x02, 0x00), // input
            (0x21, 0x03, 0x30), // output top level
            (0x21, 0x03, 0x33), // output confirm
            (0x21, 0x04, 0x00), // fee
            (0x21, 0x05, 0x00), // ttl
            (0x21, 0x06, 0x00), // certificate
            (0x21, 0x07, 0x00), // withdrawal
            (0x21, 0x09, 0x00), // validity start
            (0x21, 0x0b, 0x30), // mint top level
            (0x21, 0x0b, 0x31), // mint asset group
            (0x21, 0x0b, 0x32), // mint token
            (0x21, 0x0b, 0x33), // mint confirm
            (0x21, 0x0c, 0x00), // script data hash
            (0x21, 0x0d, 0x00), // collateral input
            (0x21, 0x0e, 0x00), // required signer
            (0x21, 0x12, 0x30), // collateral output top level
            (0x21, 0x12, 0x33), // collateral output confirm
            (0x21, 0x10, 0x00), // total collateral
            (0x21, 0x11, 0x00), // reference input
            (0x21, 0x13, 0x00), // voting procedure
            (0x21, 0x15, 0x00), // treasury
            (0x21, 0x16, 0x00), // donation
            (0x21, 0x0a, 0x00), // confirm
            (0x21, 0x0f, 0x00), // witnesses
            (0x21, 0x0f, 0x00),
            (0x21, 0x0f, 0x00),
            (0x21, 0x0f, 0x00),
            (0x21, 0x0f, 0x00),
        ]
    );
}

#[tokio::test]
async fn witness_paths_deduplicate() {
    let d = DeviceHandle::from(signing_exchange());

    let mut tx = minimal_tx();
    tx.inputs = vec![
        input(Some("m/1852'/1815'/0'/0/0")),
        input(Some("m/1852'/1815'/0'/0/0")),
    ];
    tx.additional_witness_paths = vec![path("m/1852'/1815'/0'/0/0")];

    let signed = d.sign_transaction(&tx).await.unwrap();
    assert_eq!(signed.witnesses.len(), 1);

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(&t.frames()[0][61..65], &[0, 0, 0, 1]);
}

#[tokio::test]
async fn inline_datum_and_ref_script_chunking() {
    let d = DeviceHandle::from(signing_exchange());

    let mut tx = minimal_tx();
    tx.outputs[0].format = TxOutputFormat::MapBabbage;
    tx.outputs[0].datum = Some(Datum::Inline(vec![0xdd; 500]));
    tx.outputs[0].ref_script = Some(vec![0x4e; 100]);

    d.sign_transaction(&tx).await.unwrap();

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(
        t.stages()[2..8],
        [
            (0x21, 0x03, 0x30), // output top level
            (0x21, 0x03, 0x34), // inline datum, first 240 bytes
            (0x21, 0x03, 0x35), // datum chunk
            (0x21, 0x03, 0x35), // datum chunk
            (0x21, 0x03, 0x36), // reference script, single chunk
            (0x21, 0x03, 0x33), // output confirm
        ]
    );

    // First datum message carries the declared total ahead of the chunk
    let datum = &t.frames()[3];
    assert_eq!(datum[4] as usize, 4 + 240);
    assert_eq!(&datum[5..9], &[0, 0, 1, 0xf4]);

    // Final datum chunk carries the remainder
    assert_eq!(t.frames()[5][4] as usize, 500 - 2 * 240);
}

#[tokio::test]
async fn pool_registration_sub_protocol() {
    let d = DeviceHandle::from(signing_exchange());

    let mut tx = minimal_tx();
    tx.signing_mode = TransactionSigningMode::PoolRegistrationOwner;
    tx.inputs = vec![input(None)];
    tx.certificates = vec![CertificateEntry::PoolRegistration(PoolRegistration {
        pool_key: PoolKeyRef::Hash([0xb0; 28]),
        vrf_key_hash: [0xc1; 32],
        pledge: 100_000_000,
        cost: 340_000_000,
        margin_numerator: 3,
        margin_denominator: 100,
        reward_account: RewardAccountRef::Path(path("m/1852'/1815'/0'/2/0")),
        owners: vec![
            PoolKeyRef::Path(path("m/1853'/1815'/0'/0'")),
            PoolKeyRef::Hash([0xd2; 28]),
        ],
        relays: vec![Relay::SingleHostName {
            port: Some(3001),
            dns_name: heapless::String::try_from("relay.example.com").unwrap(),
        }],
        metadata: None,
    })];

    let signed = d.sign_transaction(&tx).await.unwrap();

    // Only the device-owned owner witnesses a pool registration here
    assert_eq!(signed.witnesses.len(), 1);
    assert_eq!(signed.witnesses[0].path, path("m/1853'/1815'/0'/0'"));

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(
        t.stages()[5..16],
        [
            (0x21, 0x06, 0x00), // certificate marker
            (0x21, 0x06, 0x30), // pool init
            (0x21, 0x06, 0x31), // pool key
            (0x21, 0x06, 0x32), // vrf key
            (0x21, 0x06, 0x33), // financials
            (0x21, 0x06, 0x34), // reward account
            (0x21, 0x06, 0x35), // owner
            (0x21, 0x06, 0x35), // owner
            (0x21, 0x06, 0x36), // relay
            (0x21, 0x06, 0x37), // metadata, sent even when absent
            (0x21, 0x06, 0x38), // pool confirm
        ]
    );

    // The marker carries the bare certificate type
    let marker = &t.frames()[5];
    assert_eq!(marker[4], 1);
    assert_eq!(marker[5], 3);
}

#[tokio::test]
async fn cip36_registration_returns_signature() {
    let mut confirm = vec![0x33; 32];
    confirm.extend_from_slice(&[0x44; 64]);

    let t = signing_exchange().with_reply(0x21, 0x08, 0x34, 0x9000, &confirm);
    let d = DeviceHandle::from(t);

    let mut tx = minimal_tx();
    tx.aux_data = Some(AuxData::CVoteRegistration(CVoteRegistration {
        format: CVoteRegFormat::Cip36,
        vote_key: None,
        delegations: vec![
            VoteDelegation {
                key: VoteKeyRef::Key([0xd0; 32]),
                weight: 1,
            },
            VoteDelegation {
                key: VoteKeyRef::Key([0xd1; 32]),
                weight: 3,
            },
        ],
        staking_path: path("m/1852'/1815'/0'/2/0"),
        payment_destination: Destination::third_party(&[0x01, 0x02, 0x03]).unwrap(),
        nonce: 1234,
        voting_purpose: Some(0),
    }));

    let signed = d.sign_transaction(&tx).await.unwrap();

    let reg = signed.cvote_registration.unwrap();
    assert_eq!(reg.aux_data_hash, [0x33; 32]);
    assert_eq!(reg.signature, [0x44; 64]);

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(
        t.stages()[1..10],
        [
            (0x21, 0x08, 0x00), // aux data, registration follows
            (0x21, 0x08, 0x36), // registration init
            (0x21, 0x08, 0x37), // delegation
            (0x21, 0x08, 0x37), // delegation
            (0x21, 0x08, 0x31), // staking key
            (0x21, 0x08, 0x32), // payment address
            (0x21, 0x08, 0x33), // nonce
            (0x21, 0x08, 0x35), // voting purpose
            (0x21, 0x08, 0x34), // registration confirm
        ]
    );
}

#[tokio::test]
async fn pool_registration_requires_pool_mode() {
    let d = DeviceHandle::from(RecordingExchange::new());

    let mut tx = minimal_tx();
    tx.certificates = vec![CertificateEntry::PoolRegistration(PoolRegistration {
        pool_key: PoolKeyRef::Hash([0xb0; 28]),
        vrf_key_hash: [0xc1; 32],
        pledge: 0,
        cost: 0,
        margin_numerator: 0,
        margin_denominator: 1,
        reward_account: RewardAccountRef::Path(path("m/1852'/1815'/0'/2/0")),
        owners: vec![],
        relays: vec![],
        metadata: None,
    })];

    let e = d.sign_transaction(&tx).await.unwrap_err();
    assert!(matches!(e, Error::InvalidRequest(_)));

    let t = d.transport();
    let t = t.lock().await;
    assert!(t.frames().is_empty());
}

#[tokio::test]
async fn one_vote_per_voter() {
    let d = DeviceHandle::from(RecordingExchange::new());

    let vote = VoteEntry {
        gov_action: GovActionId {
            tx_hash: [0x6a; 32],
            index: 0,
        },
        vote: Vote::No,
        anchor: None,
    };

    let mut tx = minimal_tx();
    tx.voting_procedures = vec![VoterVotes {
        voter: Voter::DRepKeyHash([0x5d; 28]),
        votes: vec![vote.clone(), vote],
    }];

    let e = d.sign_transaction(&tx).await.unwrap_err();
    assert!(matches!(e, Error::InvalidRequest(_)));
}

#[tokio::test]
async fn legacy_output_rejects_inline_datum() {
    let d = DeviceHandle::from(RecordingExchange::new());

    let mut tx = minimal_tx();
    tx.outputs[0].datum = Some(Datum::Inline(vec![0xdd; 8]));

    let e = d.sign_transaction(&tx).await.unwrap_err();
    assert!(matches!(e, Error::InvalidRequest(_)));
}

#[tokio::test]
async fn cip15_rejects_delegations() {
    let d = DeviceHandle::from(RecordingExchange::new());

    let mut tx = minimal_tx();
    tx.aux_data = Some(AuxData::CVoteRegistration(CVoteRegistration {
        format: CVoteRegFormat::Cip15,
        vote_key: None,
        delegations: vec![VoteDelegation {
            key: VoteKeyRef::Key([0xd0; 32]),
            weight: 1,
        }],
        staking_path: path("m/1852'/1815'/0'/2/0"),
        payment_destination: Destination::third_party(&[0x01]).unwrap(),
        nonce: 0,
        voting_purpose: None,
    }));

    let e = d.sign_transaction(&tx).await.unwrap_err();
    assert!(matches!(e, Error::InvalidRequest(_)));
}
