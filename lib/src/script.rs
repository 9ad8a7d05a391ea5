// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Native script hash derivation sequencer
//!
//! The script tree is streamed to the device in pre-order: each operator
//! node declares its child count and opens a subtree, each leaf is a
//! single message. FINISH selects the display format and returns the
//! Blake2b-224 script hash.

use std::time::Duration;

use ledger_ada_apdu::script::{
    ScriptComplex, ScriptFinish, ScriptHashDisplayFormat, ScriptHashResp, ScriptSimple,
};

use crate::{
    handle::{decode_resp, exchange_req, expect_empty},
    model::NativeScript,
    transport::Exchange,
    Error,
};

/// Derive the hash of a native script on the device
pub(crate) async fn derive_script_hash<T: Exchange + Send>(
    t: &mut T,
    script: &NativeScript,
    format: ScriptHashDisplayFormat,
    duration: Duration,
) -> Result<[u8; 28], Error<T::Error>> {
    send_node(t, script, duration).await?;

    let finish = ScriptFinish { format };
    let resp: ScriptHashResp = decode_resp(exchange_req(t, &finish, duration).await?)?;

    Ok(resp.script_hash)
}

/// Send one script node and, for operators, its children
///
/// Recursion depth is bounded by the caller's tree, the device itself
/// rejects scripts nested past its own limit.
fn send_node<'a, T: Exchange>(
    t: &'a mut T,
    script: &'a NativeScript,
    duration: Duration,
) -> core::pin::Pin<
    Box<dyn core::future::Future<Output = Result<(), Error<T::Error>>> + Send + 'a>,
>
where
    T: Send,
{
    Box::pin(async move {
        match script {
            NativeScript::All { scripts } => {
                let apdu = ScriptComplex::All {
                    count: scripts.len() as u32,
                };
                expect_empty(exchange_req(t, &apdu, duration).await?)?;

                for child in scripts {
                    send_node(t, child, duration).await?;
                }
            }
            NativeScript::Any { scripts } => {
                let apdu = ScriptComplex::Any {
                    count: scripts.len() as u32,
                };
                expect_empty(exchange_req(t, &apdu, duration).await?)?;

                for child in scripts {
                    send_node(t, child, duration).await?;
                }
            }
            NativeScript::NOfK { required, scripts } => {
                let apdu = ScriptComplex::NOfK {
                    count: scripts.len() as u32,
                    required: *required,
                };
                expect_empty(exchange_req(t, &apdu, duration).await?)?;

                for child in scripts {
                    send_node(t, child, duration).await?;
                }
            }
            NativeScript::PubkeyPath { path } => {
                let apdu = ScriptSimple::PubkeyPath(path.clone());
                expect_empty(exchange_req(t, &apdu, duration).await?)?;
            }
            NativeScript::PubkeyHash { hash } => {
                let apdu = ScriptSimple::PubkeyHash(*hash);
                expect_empty(exchange_req(t, &apdu, duration).await?)?;
            }
            NativeScript::InvalidBefore { slot } => {
                let apdu = ScriptSimple::InvalidBefore(*slot);
                expect_empty(exchange_req(t, &apdu, duration).await?)?;
            }
            NativeScript::InvalidHereafter { slot } => {
                let apdu = ScriptSimple::InvalidHereafter(*slot);
                expect_empty(exchange_req(t, &apdu, duration).await?)?;
            }
        }

        Ok(())
    })
}
