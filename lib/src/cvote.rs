// Copyright (c) 2022-2023 The MobileCoin Foundation

//! CIP-36 vote cast signing sequencer
//!
//! INIT carries the declared total and the first slice of the vote cast,
//! continuations follow raw, CONFIRM returns the vote cast hash for
//! cross-checking and one witness request collects the signature.

use std::time::Duration;

use log::debug;

use ledger_ada_apdu::{
    chunk::{Chunks, MAX_CHUNK_SIZE},
    cvote::{CVoteChunk, CVoteConfirm, CVoteHashResp, CVoteInit, CVoteWitness, CVoteWitnessResp},
    path::DerivationPath,
};

use crate::{
    handle::{decode_resp, exchange_req, expect_empty},
    model::SignedVote,
    transport::Exchange,
    Error,
};

/// Sign a CIP-36 vote cast
pub(crate) async fn sign_vote<T: Exchange>(
    t: &mut T,
    votecast: &[u8],
    path: &DerivationPath,
    duration: Duration,
) -> Result<SignedVote, Error<T::Error>> {
    if votecast.is_empty() {
        return Err(Error::InvalidRequest("empty vote cast"));
    }

    for chunk in Chunks::new(votecast, MAX_CHUNK_SIZE) {
        match chunk.total {
            Some(total) => {
                let apdu = CVoteInit {
                    total,
                    chunk: chunk.body,
                };
                expect_empty(exchange_req(t, &apdu, duration).await?)?;
            }
            None => {
                let apdu = CVoteChunk { chunk: chunk.body };
                expect_empty(exchange_req(t, &apdu, duration).await?)?;
            }
        }
    }

    let hash: CVoteHashResp = decode_resp(exchange_req(t, &CVoteConfirm {}, duration).await?)?;
    debug!("vote cast hash: {}", hex::encode(hash.votecast_hash));

    let witness = CVoteWitness { path: path.clone() };
    let resp: CVoteWitnessResp = decode_resp(exchange_req(t, &witness, duration).await?)?;

    Ok(SignedVote {
        votecast_hash: hash.votecast_hash,
        signature: resp.signature,
    })
}
