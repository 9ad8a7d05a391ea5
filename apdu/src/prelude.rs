// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    addr::{
        AddressParams, AddressType, BlockchainPointer, Destination, NetworkInfo, SpendingRef,
        StakingKind, StakingRef,
    },
    address::{DeriveAddressReq, DeriveAddressResp, ShowAddressReq},
    chunk::{Chunk, Chunks},
    cvote::{CVoteChunk, CVoteConfirm, CVoteHashResp, CVoteInit, CVoteWitness, CVoteWitnessResp},
    keys::{ExtPubKeyResp, PubKeyInitReq, PubKeyNextReq},
    msg::{MsgAddressField, MsgChunk, MsgConfirm, MsgInit, MsgSignResp},
    opcert::{OpCertReq, OpCertResp},
    path::DerivationPath,
    script::{
        ScriptComplex, ScriptFinish, ScriptHashDisplayFormat, ScriptHashResp, ScriptSimple,
    },
    tx::{
        Anchor, CVoteRegConfirm, CVoteRegConfirmResp, CVoteRegDelegation, CVoteRegFormat,
        CVoteRegInit, CVoteRegNonce, CVoteRegPaymentAddress, CVoteRegStakingKey,
        CVoteRegVoteKey, CVoteRegVotingPurpose, CertPoolRegistration, Certificate, Credential,
        DRep, GovActionId, MintAssetGroup, MintConfirm, MintToken, MintTopLevel, OutputAssetGroup,
        OutputConfirm, OutputDatum, OutputDatumChunk, OutputRefScript, OutputRefScriptChunk,
        OutputToken, OutputTopLevel, PoolConfirm, PoolFinancials, PoolInit, PoolKey, PoolKeyRef,
        PoolMetadata, PoolOwner, PoolRelay, PoolRewardAccount, PoolVrfKey, Relay, RequiredSigner,
        RewardAccountRef, TransactionSigningMode, TxAuxData, TxCertificate, TxCollateralInput,
        TxConfirm, TxDonation, TxFee, TxHashResp, TxInit, TxInput, TxOptions, TxOutputFormat,
        TxPoolMetadata, TxReferenceInput, TxRequiredSigner, TxScriptDataHash, TxTotalCollateral,
        TxTreasury, TxTtl, TxValidityStart, TxVotingProcedure, TxWithdrawal, TxWitness,
        TxWitnessResp, UtxoRef, Vote, Voter,
    },
    version::{SerialReq, SerialResp, VersionFlags, VersionReq, VersionResp},
    ApduError, ApduHeader, ApduReq, ApduStatic, Instruction, Status,
};
