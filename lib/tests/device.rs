// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Basic device operations over a scripted exchange

mod helpers;
use helpers::path;

use ledger_ada::{apdu::Status, transport::RecordingExchange, DeviceHandle, Error};

#[tokio::test]
async fn app_version() {
    let t = RecordingExchange::new().with_reply(0x00, 0x00, 0x00, 0x9000, &[7, 1, 2, 0]);
    let d = DeviceHandle::from(t);

    let v = d.app_version().await.unwrap();
    assert_eq!((v.major, v.minor, v.patch), (7, 1, 2));
    assert!(!v.is_devel());
    assert_eq!(v.to_string(), "7.1.2");
}

#[tokio::test]
async fn device_serial() {
    let t = RecordingExchange::new().with_reply(0x01, 0x00, 0x00, 0x9000, b"2300174");
    let d = DeviceHandle::from(t);

    let s = d.serial().await.unwrap();
    assert_eq!(&s.serial, b"2300174");
}

#[tokio::test]
async fn public_key_batch() {
    let mut first = [0xaa; 64];
    first[32..].fill(0xab);
    let mut second = [0xba; 64];
    second[32..].fill(0xbb);

    let t = RecordingExchange::new()
        .with_reply(0x10, 0x00, 0x00, 0x9000, &first)
        .with_reply(0x10, 0x01, 0x00, 0x9000, &second);
    let d = DeviceHandle::from(t);

    let keys = d
        .public_keys(&[path("m/1852'/1815'/0'"), path("m/1852'/1815'/1'")])
        .await
        .unwrap();

    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0].public_key, [0xaa; 32]);
    assert_eq!(keys[0].chain_code, [0xab; 32]);
    assert_eq!(keys[1].public_key, [0xba; 32]);
    assert_eq!(keys[1].chain_code, [0xbb; 32]);

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(t.stages(), vec![(0x10, 0x00, 0x00), (0x10, 0x01, 0x00)]);

    // INIT carries the path then the number of keys still to come
    let frames = t.frames();
    assert_eq!(frames[0][4], 17);
    assert_eq!(&frames[0][18..22], &[0, 0, 0, 1]);
}

#[tokio::test]
async fn single_public_key_omits_count() {
    let t = RecordingExchange::new().with_reply(0x10, 0x00, 0x00, 0x9000, &[0xcc; 64]);
    let d = DeviceHandle::from(t);

    let keys = d.public_keys(&[path("m/1852'/1815'/0'")]).await.unwrap();
    assert_eq!(keys.len(), 1);

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(t.frames().len(), 1);
    assert_eq!(t.frames()[0][4], 13);
}

#[tokio::test]
async fn public_keys_require_a_path() {
    let d = DeviceHandle::from(RecordingExchange::new());

    let e = d.public_keys(&[]).await.unwrap_err();
    assert!(matches!(e, Error::InvalidRequest(_)));

    let t = d.transport();
    let t = t.lock().await;
    assert!(t.frames().is_empty());
}

#[tokio::test]
async fn sign_op_cert() {
    let t = RecordingExchange::new().with_reply(0x22, 0x00, 0x00, 0x9000, &[0x5a; 64]);
    let d = DeviceHandle::from(t);

    let sig = d
        .sign_op_cert([0x0c; 32], 580, 17, &path("m/1853'/1815'/0'/0'"))
        .await
        .unwrap();
    assert_eq!(sig, [0x5a; 64]);

    let t = d.transport();
    let t = t.lock().await;
    let frames = t.frames();
    assert_eq!(frames.len(), 1);

    // KES key, KES period, issue counter, then the cold key path
    assert_eq!(frames[0][4] as usize, 32 + 8 + 8 + 17);
    assert_eq!(&frames[0][5..37], &[0x0c; 32]);
    assert_eq!(&frames[0][37..45], &580u64.to_be_bytes());
    assert_eq!(&frames[0][45..53], &17u64.to_be_bytes());
}

#[tokio::test]
async fn known_status_maps_to_device_error() {
    let t = RecordingExchange::new().with_reply(0x00, 0x00, 0x00, 0x6e09, &[]);
    let d = DeviceHandle::from(t);

    let e = d.app_version().await.unwrap_err();
    assert!(matches!(e, Error::Device(Status::RejectedByUser)));
}

#[tokio::test]
async fn unknown_status_is_preserved() {
    let t = RecordingExchange::new().with_reply(0x00, 0x00, 0x00, 0x6f00, &[]);
    let d = DeviceHandle::from(t);

    let e = d.app_version().await.unwrap_err();
    assert!(matches!(e, Error::Status(0x6f00)));
}
