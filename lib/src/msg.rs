// Copyright (c) 2022-2023 The MobileCoin Foundation

//! CIP-8 message signing sequencer
//!
//! INIT declares the message length, signing path, hashing choice and the
//! address bound into the envelope. The message bytes follow in chunks,
//! the first sized by the display mode, then CONFIRM returns the
//! signature, public key and address bytes in one fixed response.

use std::time::Duration;

use ledger_ada_apdu::{
    chunk::{Chunks, MSG_FIRST_CHUNK_ASCII, MSG_FIRST_CHUNK_HEX, MSG_NEXT_CHUNK_SIZE},
    msg::{MsgChunk, MsgConfirm, MsgInit, MsgSignResp},
};

use crate::{
    handle::{decode_resp, exchange_req, expect_empty},
    model::{MsgSignRequest, SignedMessage},
    transport::Exchange,
    Error,
};

/// Sign a CIP-8 message
pub(crate) async fn sign_message<T: Exchange>(
    t: &mut T,
    request: &MsgSignRequest,
    duration: Duration,
) -> Result<SignedMessage, Error<T::Error>> {
    let ascii_display = request.ascii_display();

    let init = MsgInit {
        msg_len: request.message.len() as u32,
        path: request.path.clone(),
        hash_payload: request.hash_payload,
        ascii_display,
        address: request.address.clone(),
    };
    expect_empty(exchange_req(t, &init, duration).await?)?;

    // Hex rendering doubles the on-screen width, halving the first chunk
    let first_max = match ascii_display {
        true => MSG_FIRST_CHUNK_ASCII,
        false => MSG_FIRST_CHUNK_HEX,
    };

    // An empty message is fully described by INIT
    if !request.message.is_empty() {
        for chunk in Chunks::asymmetric(&request.message, first_max, MSG_NEXT_CHUNK_SIZE) {
            let apdu = MsgChunk { chunk: chunk.body };
            expect_empty(exchange_req(t, &apdu, duration).await?)?;
        }
    }

    let resp: MsgSignResp = decode_resp(exchange_req(t, &MsgConfirm {}, duration).await?)?;

    Ok(SignedMessage {
        signature: resp.signature,
        key: resp.key,
        address: resp.address.to_vec(),
    })
}
