// Copyright (c) 2022-2023 The MobileCoin Foundation

//! CIP-8 message signing flows

mod helpers;
use helpers::path;

use ledger_ada::{
    apdu::msg::MsgAddressField, model::MsgSignRequest, transport::RecordingExchange, DeviceHandle,
};

/// Fixed 228 byte CONFIRM response body carrying `address`
fn confirm_body(address: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(228);
    body.extend_from_slice(&[0x51; 64]);
    body.extend_from_slice(&[0x52; 32]);
    body.extend_from_slice(&(address.len() as u32).to_be_bytes());
    body.extend_from_slice(address);
    body.resize(228, 0);
    body
}

fn request(message: Vec<u8>) -> MsgSignRequest {
    MsgSignRequest {
        message,
        path: path("m/1852'/1815'/0'/0/0"),
        hash_payload: false,
        prefer_hex: false,
        address: MsgAddressField::KeyHash,
    }
}

#[tokio::test]
async fn empty_message_sends_no_chunks() {
    let t = RecordingExchange::new().with_reply(0x24, 0x03, 0x00, 0x9000, &confirm_body(&[0xe1; 29]));
    let d = DeviceHandle::from(t);

    let signed = d.sign_message(&request(vec![])).await.unwrap();
    assert_eq!(signed.signature, [0x51; 64]);
    assert_eq!(signed.key, [0x52; 32]);
    assert_eq!(signed.address, vec![0xe1; 29]);

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(t.stages(), vec![(0x24, 0x01, 0x00), (0x24, 0x03, 0x00)]);
}

#[tokio::test]
async fn ascii_message_first_chunk_split() {
    let t = RecordingExchange::new().with_reply(0x24, 0x03, 0x00, 0x9000, &confirm_body(&[0xe1; 29]));
    let d = DeviceHandle::from(t);

    // Printable content, two bytes past the 198 byte first chunk
    d.sign_message(&request(vec![b'a'; 200])).await.unwrap();

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(
        t.stages(),
        vec![
            (0x24, 0x01, 0x00),
            (0x24, 0x02, 0x00),
            (0x24, 0x02, 0x00),
            (0x24, 0x03, 0x00),
        ]
    );

    // INIT declares the full length and ascii display
    let frames = t.frames();
    assert_eq!(&frames[0][5..9], &[0, 0, 0, 200]);
    assert_eq!(frames[0][31], 0x02);

    // Chunks are size-prefixed
    assert_eq!(&frames[1][5..9], &[0, 0, 0, 198]);
    assert_eq!(&frames[2][5..9], &[0, 0, 0, 2]);
}

#[tokio::test]
async fn hex_display_halves_the_first_chunk() {
    let t = RecordingExchange::new().with_reply(0x24, 0x03, 0x00, 0x9000, &confirm_body(&[0xe1; 29]));
    let d = DeviceHandle::from(t);

    let mut req = request(vec![b'a'; 100]);
    req.prefer_hex = true;

    d.sign_message(&req).await.unwrap();

    let t = d.transport();
    let t = t.lock().await;
    let frames = t.frames();

    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0][31], 0x01);
    assert_eq!(&frames[1][5..9], &[0, 0, 0, 99]);
    assert_eq!(&frames[2][5..9], &[0, 0, 0, 1]);
}

#[tokio::test]
async fn unprintable_message_forces_hex() {
    let t = RecordingExchange::new().with_reply(0x24, 0x03, 0x00, 0x9000, &confirm_body(&[0xe1; 29]));
    let d = DeviceHandle::from(t);

    d.sign_message(&request(vec![0x00, 0x01, 0x02])).await.unwrap();

    let t = d.transport();
    let t = t.lock().await;
    assert_eq!(t.frames()[0][31], 0x01);
}
