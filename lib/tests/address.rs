// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Address derivation flows

mod helpers;
use helpers::path;

use ledger_ada::{
    apdu::{
        addr::{AddressParams, AddressType, NetworkInfo, SpendingRef, StakingRef},
        ApduError,
    },
    transport::RecordingExchange,
    DeviceHandle, Error,
};

#[tokio::test]
async fn derive_byron_address() {
    let t = RecordingExchange::new().with_reply(0x11, 0x01, 0x00, 0x9000, &[0x82, 0xd8, 0x18]);
    let d = DeviceHandle::from(t);

    let params = AddressParams {
        address_type: AddressType::Byron,
        network: NetworkInfo {
            network_id: 0,
            protocol_magic: 42,
        },
        spending: SpendingRef::Path(path("m/44'/1815'/0'/0/0")),
        staking: StakingRef::None,
    };

    let address = d.derive_address(&params).await.unwrap();
    assert_eq!(address, vec![0x82, 0xd8, 0x18]);

    // Byron parameters carry the protocol magic in place of the network id
    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(
        t.frames()[0],
        vec![
            0xd7, 0x11, 0x01, 0x00, 27, // header
            0x08, // address type
            0x00, 0x00, 0x00, 0x2a, // protocol magic
            0x05, // spending path
            0x80, 0x00, 0x00, 0x2c, //
            0x80, 0x00, 0x07, 0x17, //
            0x80, 0x00, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x00, //
            0x11, // no staking part
        ]
    );
}

#[tokio::test]
async fn show_address_returns_nothing() {
    let d = DeviceHandle::from(RecordingExchange::new());

    let params = AddressParams {
        address_type: AddressType::BasePaymentKeyStakeKey,
        network: NetworkInfo::MAINNET,
        spending: SpendingRef::Path(path("m/1852'/1815'/0'/0/0")),
        staking: StakingRef::Path(path("m/1852'/1815'/0'/2/0")),
    };

    d.show_address(&params).await.unwrap();

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(t.stages(), vec![(0x11, 0x02, 0x00)]);
}

#[tokio::test]
async fn inconsistent_staking_is_rejected() {
    let d = DeviceHandle::from(RecordingExchange::new());

    // Enterprise addresses have no staking part
    let params = AddressParams {
        address_type: AddressType::EnterpriseKey,
        network: NetworkInfo::MAINNET,
        spending: SpendingRef::Path(path("m/1852'/1815'/0'/0/0")),
        staking: StakingRef::Path(path("m/1852'/1815'/0'/2/0")),
    };

    let e = d.derive_address(&params).await.unwrap_err();
    assert!(matches!(e, Error::Apdu(ApduError::InvalidStaking)));

    let t = d.transport();
    let t = t.lock().await;
    assert!(t.frames().is_empty());
}
