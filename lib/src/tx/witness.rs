// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Witness path collection
//!
//! A signed transaction carries one witness per signing path implied by
//! the body, plus any paths the caller requests explicitly. Paths are
//! collected in body order with first-seen deduplication so the witness
//! request count is fixed before INIT is sent.

use ledger_ada_apdu::{path::DerivationPath, tx::Certificate, tx::TransactionSigningMode};

use crate::model::{CertificateEntry, Transaction};

/// Collect the witness paths implied by a transaction, in request order
pub fn witness_paths(tx: &Transaction) -> Vec<DerivationPath> {
    let mut paths = vec![];

    // Script transactions witness via script participants only, the body
    // never implies device paths
    if tx.signing_mode != TransactionSigningMode::Multisig {
        for input in &tx.inputs {
            push(&mut paths, input.path.as_ref());
        }

        for entry in &tx.certificates {
            match entry {
                CertificateEntry::Certificate(c) => push(&mut paths, certificate_path(c)),
                CertificateEntry::PoolRegistration(p) => {
                    push(&mut paths, p.pool_key.path());
                    for owner in &p.owners {
                        push(&mut paths, owner.path());
                    }
                }
            }
        }

        for withdrawal in &tx.withdrawals {
            push(&mut paths, withdrawal.credential.path());
        }

        for signer in &tx.required_signers {
            push(&mut paths, signer.path());
        }

        for input in &tx.collateral_inputs {
            push(&mut paths, input.path.as_ref());
        }

        for votes in &tx.voting_procedures {
            push(&mut paths, votes.voter.path());
        }
    }

    for path in &tx.additional_witness_paths {
        push(&mut paths, Some(path));
    }

    paths
}

/// Signing path implied by a certificate, if any
fn certificate_path(c: &Certificate) -> Option<&DerivationPath> {
    match c {
        Certificate::StakeRegistration { credential }
        | Certificate::StakeDeregistration { credential }
        | Certificate::StakeDelegation { credential, .. }
        | Certificate::StakeRegistrationConway { credential, .. }
        | Certificate::StakeDeregistrationConway { credential, .. }
        | Certificate::VoteDelegation { credential, .. }
        | Certificate::DRepRegistration { credential, .. }
        | Certificate::DRepDeregistration { credential, .. }
        | Certificate::DRepUpdate { credential, .. } => credential.path(),
        Certificate::StakePoolRetirement { pool_key_path, .. } => Some(pool_key_path),
        Certificate::AuthorizeCommitteeHot {
            cold_credential, ..
        }
        | Certificate::ResignCommitteeCold {
            cold_credential, ..
        } => cold_credential.path(),
    }
}

fn push(paths: &mut Vec<DerivationPath>, path: Option<&DerivationPath>) {
    if let Some(p) = path {
        if !paths.contains(p) {
            paths.push(p.clone());
        }
    }
}
