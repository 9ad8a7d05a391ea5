// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction signing sequencer
//!
//! Decomposes a [`Transaction`] model into the staged APDU stream the
//! device expects: INIT fixing counts and flags, body stages in canonical
//! order, CONFIRM returning the transaction hash, then one witness
//! request per collected path. Outputs, pool registrations, minting and
//! CIP-36 registrations open nested step sequences of their own.

use std::time::Duration;

use log::debug;

use ledger_ada_apdu::{
    chunk::{Chunks, MAX_CHUNK_SIZE},
    tx::{
        CVoteRegConfirm, CVoteRegConfirmResp, CVoteRegDelegation, CVoteRegFormat, CVoteRegInit,
        CVoteRegNonce, CVoteRegPaymentAddress, CVoteRegStakingKey, CVoteRegVoteKey,
        CVoteRegVotingPurpose, CertPoolRegistration, MintAssetGroup, MintConfirm, MintToken,
        MintTopLevel, OutputAssetGroup, OutputConfirm, OutputDatum, OutputDatumChunk,
        OutputRefScript, OutputRefScriptChunk, OutputToken, OutputTopLevel, PoolConfirm,
        PoolFinancials, PoolInit, PoolKey, PoolOwner, PoolRelay, PoolRewardAccount, PoolVrfKey,
        TransactionSigningMode, TxAuxData, TxCertificate, TxCollateralInput, TxConfirm,
        TxDonation, TxFee, TxHashResp, TxInit, TxInput, TxOptions, TxOutputFormat, TxPoolMetadata,
        TxReferenceInput, TxRequiredSigner, TxScriptDataHash, TxTotalCollateral, TxTreasury,
        TxTtl, TxValidityStart, TxVotingProcedure, TxWithdrawal, TxWitness, TxWitnessResp,
        ASSET_NAME_MAX_LEN,
    },
};

use crate::{
    handle::{decode_resp, exchange_req, expect_empty},
    model::{
        AuxData, CVoteRegistration, CVoteRegistrationSignature, CertificateEntry, Output,
        SignedTransaction, Transaction, TransactionWitness,
    },
    transport::Exchange,
    Error,
};

mod witness;
pub use witness::witness_paths;

/// Sign a transaction, streaming the body and collecting all witnesses
///
/// The transport lock is held by the caller for the duration, a signing
/// session cannot be interleaved with other traffic.
pub(crate) async fn sign_transaction<T: Exchange>(
    t: &mut T,
    tx: &Transaction,
    duration: Duration,
) -> Result<SignedTransaction, Error<T::Error>> {
    validate(tx)?;

    let witness_paths = witness_paths(tx);

    let init = TxInit {
        options: match tx.tag_cbor_sets {
            true => TxOptions::TAG_CBOR_SETS,
            false => TxOptions::empty(),
        },
        network: tx.network,
        include_ttl: tx.ttl.is_some(),
        include_aux_data: tx.aux_data.is_some(),
        include_validity_start: tx.validity_start.is_some(),
        include_mint: !tx.mint.is_empty(),
        include_script_data_hash: tx.script_data_hash.is_some(),
        include_network_id: tx.include_network_id,
        include_collateral_output: tx.collateral_output.is_some(),
        include_total_collateral: tx.total_collateral.is_some(),
        include_treasury: tx.treasury.is_some(),
        include_donation: tx.donation.is_some(),
        signing_mode: tx.signing_mode,
        num_inputs: tx.inputs.len() as u32,
        num_outputs: tx.outputs.len() as u32,
        num_certificates: tx.certificates.len() as u32,
        num_withdrawals: tx.withdrawals.len() as u32,
        num_collateral_inputs: tx.collateral_inputs.len() as u32,
        num_required_signers: tx.required_signers.len() as u32,
        num_reference_inputs: tx.reference_inputs.len() as u32,
        num_voting_procedures: tx.voting_procedures.len() as u32,
        num_witnesses: witness_paths.len() as u32,
    };
    expect_empty(exchange_req(t, &init, duration).await?)?;

    // Auxiliary data precedes the body proper so the device can hash a
    // serial registration before the inputs arrive
    let mut cvote_registration = None;
    if let Some(aux) = &tx.aux_data {
        cvote_registration = send_aux_data(t, aux, duration).await?;
    }

    for input in &tx.inputs {
        let apdu = TxInput { utxo: input.utxo };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;
    }

    for output in &tx.outputs {
        send_output(t, output, false, duration).await?;
    }

    expect_empty(exchange_req(t, &TxFee { amount: tx.fee }, duration).await?)?;

    if let Some(slot) = tx.ttl {
        expect_empty(exchange_req(t, &TxTtl { slot }, duration).await?)?;
    }

    for entry in &tx.certificates {
        match entry {
            CertificateEntry::Certificate(certificate) => {
                let apdu = TxCertificate {
                    certificate: certificate.clone(),
                };
                expect_empty(exchange_req(t, &apdu, duration).await?)?;
            }
            CertificateEntry::PoolRegistration(pool) => {
                send_pool_registration(t, pool, duration).await?
            }
        }
    }

    for withdrawal in &tx.withdrawals {
        let apdu = TxWithdrawal {
            amount: withdrawal.amount,
            credential: withdrawal.credential.clone(),
        };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;
    }

    if let Some(slot) = tx.validity_start {
        expect_empty(exchange_req(t, &TxValidityStart { slot }, duration).await?)?;
    }

    if !tx.mint.is_empty() {
        send_mint(t, tx, duration).await?;
    }

    if let Some(hash) = tx.script_data_hash {
        expect_empty(exchange_req(t, &TxScriptDataHash { hash }, duration).await?)?;
    }

    for input in &tx.collateral_inputs {
        let apdu = TxCollateralInput { utxo: input.utxo };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;
    }

    for signer in &tx.required_signers {
        let apdu = TxRequiredSigner {
            signer: signer.clone(),
        };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;
    }

    if let Some(output) = &tx.collateral_output {
        send_output(t, output, true, duration).await?;
    }

    if let Some(amount) = tx.total_collateral {
        expect_empty(exchange_req(t, &TxTotalCollateral { amount }, duration).await?)?;
    }

    for utxo in &tx.reference_inputs {
        let apdu = TxReferenceInput { utxo: *utxo };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;
    }

    for votes in &tx.voting_procedures {
        // one vote per voter, checked in validate
        let vote = &votes.votes[0];
        let apdu = TxVotingProcedure {
            voter: votes.voter.clone(),
            gov_action: vote.gov_action,
            vote: vote.vote,
            anchor: vote.anchor.clone(),
        };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;
    }

    if let Some(amount) = tx.treasury {
        expect_empty(exchange_req(t, &TxTreasury { amount }, duration).await?)?;
    }

    if let Some(amount) = tx.donation {
        expect_empty(exchange_req(t, &TxDonation { amount }, duration).await?)?;
    }

    let hash: TxHashResp = decode_resp(exchange_req(t, &TxConfirm {}, duration).await?)?;
    debug!("transaction hash: {}", hex::encode(hash.tx_hash));

    let mut witnesses = Vec::with_capacity(witness_paths.len());
    for path in witness_paths {
        let apdu = TxWitness { path: path.clone() };
        let resp: TxWitnessResp = decode_resp(exchange_req(t, &apdu, duration).await?)?;

        witnesses.push(TransactionWitness {
            path,
            signature: resp.signature,
        });
    }

    Ok(SignedTransaction {
        tx_hash: hash.tx_hash,
        witnesses,
        cvote_registration,
    })
}

/// Reject requests the device is certain to refuse before opening a session
fn validate<E: core::fmt::Display + core::fmt::Debug>(
    tx: &Transaction,
) -> Result<(), Error<E>> {
    let pool_mode = matches!(
        tx.signing_mode,
        TransactionSigningMode::PoolRegistrationOwner
            | TransactionSigningMode::PoolRegistrationOperator
    );

    for entry in &tx.certificates {
        match entry {
            CertificateEntry::PoolRegistration(_) if !pool_mode => {
                return Err(Error::InvalidRequest(
                    "pool registration requires a pool registration signing mode",
                ));
            }
            CertificateEntry::Certificate(_) if pool_mode => {
                return Err(Error::InvalidRequest(
                    "pool registration transactions carry no other certificates",
                ));
            }
            _ => (),
        }
    }

    for output in tx.outputs.iter().chain(tx.collateral_output.iter()) {
        if output.format == TxOutputFormat::ArrayLegacy
            && (matches!(output.datum, Some(crate::model::Datum::Inline(_)))
                || output.ref_script.is_some())
        {
            return Err(Error::InvalidRequest(
                "inline datums and reference scripts require the map output format",
            ));
        }
    }

    if let Some(output) = &tx.collateral_output {
        if output.datum.is_some() || output.ref_script.is_some() {
            return Err(Error::InvalidRequest(
                "collateral outputs cannot carry datums or reference scripts",
            ));
        }
    }

    for votes in &tx.voting_procedures {
        if votes.votes.len() != 1 {
            return Err(Error::InvalidRequest("exactly one vote per voter"));
        }
    }

    if let Some(AuxData::CVoteRegistration(reg)) = &tx.aux_data {
        match reg.format {
            CVoteRegFormat::Cip15 => {
                if reg.vote_key.is_none() || !reg.delegations.is_empty() {
                    return Err(Error::InvalidRequest(
                        "CIP-15 registrations take a single vote key",
                    ));
                }
                if reg.voting_purpose.is_some() {
                    return Err(Error::InvalidRequest(
                        "voting purpose is CIP-36 only",
                    ));
                }
            }
            CVoteRegFormat::Cip36 => {
                if reg.vote_key.is_some() == !reg.delegations.is_empty() {
                    return Err(Error::InvalidRequest(
                        "CIP-36 registrations take a vote key or delegations, not both",
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Send one output (or the collateral output) and its nested steps
async fn send_output<T: Exchange>(
    t: &mut T,
    output: &Output,
    collateral: bool,
    duration: Duration,
) -> Result<(), Error<T::Error>> {
    let top = OutputTopLevel {
        format: output.format,
        destination: output.destination.clone(),
        amount: output.amount,
        num_asset_groups: output.assets.len() as u32,
        include_datum: output.datum.is_some(),
        include_ref_script: output.ref_script.is_some(),
        collateral,
    };
    expect_empty(exchange_req(t, &top, duration).await?)?;

    for group in &output.assets {
        let apdu = OutputAssetGroup {
            policy_id: group.policy_id,
            num_tokens: group.tokens.len() as u32,
            collateral,
        };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;

        for token in &group.tokens {
            let apdu = OutputToken {
                asset_name: asset_name(&token.asset_name)?,
                amount: token.amount,
                collateral,
            };
            expect_empty(exchange_req(t, &apdu, duration).await?)?;
        }
    }

    match &output.datum {
        Some(crate::model::Datum::Hash(hash)) => {
            expect_empty(exchange_req(t, &OutputDatum::Hash(*hash), duration).await?)?;
        }
        Some(crate::model::Datum::Inline(data)) => {
            for chunk in Chunks::new(data, MAX_CHUNK_SIZE) {
                match chunk.total {
                    Some(total) => {
                        let apdu = OutputDatum::Inline {
                            total,
                            chunk: chunk.body,
                        };
                        expect_empty(exchange_req(t, &apdu, duration).await?)?;
                    }
                    None => {
                        let apdu = OutputDatumChunk { chunk: chunk.body };
                        expect_empty(exchange_req(t, &apdu, duration).await?)?;
                    }
                }
            }
        }
        None => (),
    }

    if let Some(data) = &output.ref_script {
        for chunk in Chunks::new(data, MAX_CHUNK_SIZE) {
            match chunk.total {
                Some(total) => {
                    let apdu = OutputRefScript {
                        total,
                        chunk: chunk.body,
                    };
                    expect_empty(exchange_req(t, &apdu, duration).await?)?;
                }
                None => {
                    let apdu = OutputRefScriptChunk { chunk: chunk.body };
                    expect_empty(exchange_req(t, &apdu, duration).await?)?;
                }
            }
        }
    }

    expect_empty(exchange_req(t, &OutputConfirm { collateral }, duration).await?)?;

    Ok(())
}

/// Send a pool registration certificate body
async fn send_pool_registration<T: Exchange>(
    t: &mut T,
    pool: &crate::model::PoolRegistration,
    duration: Duration,
) -> Result<(), Error<T::Error>> {
    expect_empty(exchange_req(t, &CertPoolRegistration {}, duration).await?)?;

    let init = PoolInit {
        num_owners: pool.owners.len() as u32,
        num_relays: pool.relays.len() as u32,
    };
    expect_empty(exchange_req(t, &init, duration).await?)?;

    let key = PoolKey {
        key: pool.pool_key.clone(),
    };
    expect_empty(exchange_req(t, &key, duration).await?)?;

    let vrf = PoolVrfKey {
        vrf_key_hash: pool.vrf_key_hash,
    };
    expect_empty(exchange_req(t, &vrf, duration).await?)?;

    let financials = PoolFinancials {
        pledge: pool.pledge,
        cost: pool.cost,
        margin_numerator: pool.margin_numerator,
        margin_denominator: pool.margin_denominator,
    };
    expect_empty(exchange_req(t, &financials, duration).await?)?;

    let reward = PoolRewardAccount {
        account: pool.reward_account.clone(),
    };
    expect_empty(exchange_req(t, &reward, duration).await?)?;

    for owner in &pool.owners {
        let apdu = PoolOwner {
            owner: owner.clone(),
        };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;
    }

    for relay in &pool.relays {
        let apdu = PoolRelay {
            relay: relay.clone(),
        };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;
    }

    // Metadata is sent even when absent, the device must display the
    // missing-metadata warning before confirming
    let metadata = TxPoolMetadata {
        metadata: pool.metadata.clone(),
    };
    expect_empty(exchange_req(t, &metadata, duration).await?)?;

    expect_empty(exchange_req(t, &PoolConfirm {}, duration).await?)?;

    Ok(())
}

/// Send the mint stage and its nested groups
async fn send_mint<T: Exchange>(
    t: &mut T,
    tx: &Transaction,
    duration: Duration,
) -> Result<(), Error<T::Error>> {
    let top = MintTopLevel {
        num_asset_groups: tx.mint.len() as u32,
    };
    expect_empty(exchange_req(t, &top, duration).await?)?;

    for group in &tx.mint {
        let apdu = MintAssetGroup {
            policy_id: group.policy_id,
            num_tokens: group.tokens.len() as u32,
        };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;

        for token in &group.tokens {
            let apdu = MintToken {
                asset_name: asset_name(&token.asset_name)?,
                amount: token.amount,
            };
            expect_empty(exchange_req(t, &apdu, duration).await?)?;
        }
    }

    expect_empty(exchange_req(t, &MintConfirm {}, duration).await?)?;

    Ok(())
}

/// Send the auxiliary data stage, running the CIP-36 registration
/// sub-protocol when the registration is built on-device
async fn send_aux_data<T: Exchange>(
    t: &mut T,
    aux: &AuxData,
    duration: Duration,
) -> Result<Option<CVoteRegistrationSignature>, Error<T::Error>> {
    let reg = match aux {
        AuxData::ArbitraryHash(hash) => {
            let apdu = TxAuxData::ArbitraryHash(*hash);
            expect_empty(exchange_req(t, &apdu, duration).await?)?;
            return Ok(None);
        }
        AuxData::CVoteRegistration(reg) => reg,
    };

    expect_empty(exchange_req(t, &TxAuxData::CVoteRegistration, duration).await?)?;

    let CVoteRegistration {
        format,
        vote_key,
        delegations,
        staking_path,
        payment_destination,
        nonce,
        voting_purpose,
    } = reg;

    let init = CVoteRegInit {
        format: *format,
        num_delegations: delegations.len() as u32,
    };
    expect_empty(exchange_req(t, &init, duration).await?)?;

    if let Some(key) = vote_key {
        let apdu = CVoteRegVoteKey { key: key.clone() };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;
    }

    for delegation in delegations {
        let apdu = CVoteRegDelegation {
            key: delegation.key.clone(),
            weight: delegation.weight,
        };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;
    }

    let staking = CVoteRegStakingKey {
        path: staking_path.clone(),
    };
    expect_empty(exchange_req(t, &staking, duration).await?)?;

    let payment = CVoteRegPaymentAddress {
        destination: payment_destination.clone(),
    };
    expect_empty(exchange_req(t, &payment, duration).await?)?;

    expect_empty(exchange_req(t, &CVoteRegNonce { nonce: *nonce }, duration).await?)?;

    if voting_purpose.is_some() {
        let apdu = CVoteRegVotingPurpose {
            purpose: *voting_purpose,
        };
        expect_empty(exchange_req(t, &apdu, duration).await?)?;
    }

    let resp: CVoteRegConfirmResp =
        decode_resp(exchange_req(t, &CVoteRegConfirm {}, duration).await?)?;

    Ok(Some(CVoteRegistrationSignature {
        aux_data_hash: resp.aux_data_hash,
        signature: resp.signature,
    }))
}

/// Build a bounded asset name from model bytes
fn asset_name<E: core::fmt::Display + core::fmt::Debug>(
    name: &[u8],
) -> Result<heapless::Vec<u8, ASSET_NAME_MAX_LEN>, Error<E>> {
    heapless::Vec::from_slice(name).map_err(|_| Error::InvalidRequest("asset name too long"))
}
