// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Per-element transaction body stage APDUs
//!
//! Each APDU here carries exactly one body element; the stage is selected
//! by P1 and the device enforces the element counts declared at INIT.

use encdec::{Decode, DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter};

use super::{
    anchor_opt, Anchor, Credential, P1_COLLATERAL_INPUTS, P1_DONATION, P1_FEE, P1_INPUTS,
    P1_REFERENCE_INPUTS, P1_REQUIRED_SIGNERS, P1_SCRIPT_DATA_HASH, P1_TOTAL_COLLATERAL,
    P1_TREASURY, P1_TTL, P1_VALIDITY_START, P1_VOTING_PROCEDURES, P1_WITHDRAWALS, TX_HASH_LEN,
};
use crate::{
    addr::{KEY_HASH_LEN, SCRIPT_HASH_LEN},
    helpers::*,
    path::DerivationPath,
    ApduError, ApduStatic, Instruction,
};

/// Length of a script data hash
pub const SCRIPT_DATA_HASH_LEN: usize = 32;

/// Reference to a transaction output being spent
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[encdec(error = "ApduError")]
pub struct UtxoRef {
    /// Hash of the transaction holding the output
    #[encdec(with = "arr")]
    #[cfg_attr(feature = "serde", serde(with = "hex_array"))]
    pub tx_hash: [u8; TX_HASH_LEN],

    /// Output index within that transaction
    #[encdec(with = "u32be")]
    pub index: u32,
}

/// Input stage APDU
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct TxInput {
    pub utxo: UtxoRef,
}

impl ApduStatic for TxInput {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_INPUTS
    }
}

/// Collateral input stage APDU (Plutus transactions)
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct TxCollateralInput {
    pub utxo: UtxoRef,
}

impl ApduStatic for TxCollateralInput {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_COLLATERAL_INPUTS
    }
}

/// Reference input stage APDU
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct TxReferenceInput {
    pub utxo: UtxoRef,
}

impl ApduStatic for TxReferenceInput {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_REFERENCE_INPUTS
    }
}

/// Helper macro for stages carrying a single big-endian u64
macro_rules! amount_stage {
    ($(#[$meta:meta])* $name:ident, $p1:expr, $field:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
        #[encdec(error = "ApduError")]
        pub struct $name {
            #[encdec(with = "u64be")]
            pub $field: u64,
        }

        impl ApduStatic for $name {
            const INS: u8 = Instruction::SignTx as u8;

            fn p1(&self) -> u8 {
                $p1
            }
        }
    };
}

amount_stage!(
    /// Fee stage APDU, amount in lovelace
    TxFee,
    P1_FEE,
    amount
);

amount_stage!(
    /// Time-to-live stage APDU, absolute slot number
    TxTtl,
    P1_TTL,
    slot
);

amount_stage!(
    /// Validity interval start stage APDU, absolute slot number
    TxValidityStart,
    P1_VALIDITY_START,
    slot
);

amount_stage!(
    /// Total collateral stage APDU, amount in lovelace
    TxTotalCollateral,
    P1_TOTAL_COLLATERAL,
    amount
);

amount_stage!(
    /// Current treasury value stage APDU
    TxTreasury,
    P1_TREASURY,
    amount
);

amount_stage!(
    /// Treasury donation stage APDU
    TxDonation,
    P1_DONATION,
    amount
);

/// Withdrawal stage APDU, the reward amount leads the credential
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct TxWithdrawal {
    /// Withdrawn reward amount in lovelace
    #[encdec(with = "u64be")]
    pub amount: u64,

    /// Reward account credential
    pub credential: Credential,
}

impl ApduStatic for TxWithdrawal {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_WITHDRAWALS
    }
}

/// Script data hash stage APDU (Plutus transactions)
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct TxScriptDataHash {
    #[encdec(with = "arr")]
    pub hash: [u8; SCRIPT_DATA_HASH_LEN],
}

impl ApduStatic for TxScriptDataHash {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_SCRIPT_DATA_HASH
    }
}

// Required signer reference tags
const SIGNER_PATH: u8 = 0;
const SIGNER_HASH: u8 = 1;

/// Required signer reference, path or key hash
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RequiredSigner {
    /// Device-owned signer path
    Path(DerivationPath),

    /// Third-party signer key hash
    Hash(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; KEY_HASH_LEN]),
}

impl RequiredSigner {
    /// Path for witness collection, `None` for hash signers
    pub fn path(&self) -> Option<&DerivationPath> {
        match self {
            RequiredSigner::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl Encode for RequiredSigner {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            RequiredSigner::Path(p) => 1 + p.wire_len(),
            RequiredSigner::Hash(_) => 1 + KEY_HASH_LEN,
        };
        Ok(len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match self {
            RequiredSigner::Path(p) => {
                buff[0] = SIGNER_PATH;
                index += p.encode(&mut buff[index..])?;
            }
            RequiredSigner::Hash(h) => {
                buff[0] = SIGNER_HASH;
                index += arr::enc(h, &mut buff[index..])?;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for RequiredSigner {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        match buff[0] {
            SIGNER_PATH => {
                let (p, n) = DerivationPath::decode_owned(&buff[1..])?;
                Ok((RequiredSigner::Path(p), 1 + n))
            }
            SIGNER_HASH => {
                let (h, n) = arr::dec(&buff[1..])?;
                Ok((RequiredSigner::Hash(h), 1 + n))
            }
            _ => Err(ApduError::InvalidEncoding),
        }
    }
}

/// Required signer stage APDU (Plutus transactions)
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct TxRequiredSigner {
    pub signer: RequiredSigner,
}

impl ApduStatic for TxRequiredSigner {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_REQUIRED_SIGNERS
    }
}

// Voter reference tags, paths shifted by 100
const VOTER_COMMITTEE_KEY_HASH: u8 = 0;
const VOTER_COMMITTEE_SCRIPT_HASH: u8 = 1;
const VOTER_DREP_KEY_HASH: u8 = 2;
const VOTER_DREP_SCRIPT_HASH: u8 = 3;
const VOTER_POOL_KEY_HASH: u8 = 4;
const VOTER_COMMITTEE_KEY_PATH: u8 = 100;
const VOTER_DREP_KEY_PATH: u8 = 102;
const VOTER_POOL_KEY_PATH: u8 = 104;

/// Governance voter reference
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Voter {
    CommitteeKeyHash(
        #[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; KEY_HASH_LEN],
    ),
    CommitteeScriptHash(
        #[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; SCRIPT_HASH_LEN],
    ),
    DRepKeyHash(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; KEY_HASH_LEN]),
    DRepScriptHash(
        #[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; SCRIPT_HASH_LEN],
    ),
    PoolKeyHash(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; KEY_HASH_LEN]),
    CommitteeKeyPath(DerivationPath),
    DRepKeyPath(DerivationPath),
    PoolKeyPath(DerivationPath),
}

impl Voter {
    /// Path for witness collection, `None` for hash voters
    pub fn path(&self) -> Option<&DerivationPath> {
        match self {
            Voter::CommitteeKeyPath(p) | Voter::DRepKeyPath(p) | Voter::PoolKeyPath(p) => Some(p),
            _ => None,
        }
    }
}

impl Encode for Voter {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            Voter::CommitteeKeyHash(_)
            | Voter::CommitteeScriptHash(_)
            | Voter::DRepKeyHash(_)
            | Voter::DRepScriptHash(_)
            | Voter::PoolKeyHash(_) => 1 + KEY_HASH_LEN,
            Voter::CommitteeKeyPath(p) | Voter::DRepKeyPath(p) | Voter::PoolKeyPath(p) => {
                1 + p.wire_len()
            }
        };
        Ok(len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match self {
            Voter::CommitteeKeyHash(h) => {
                buff[0] = VOTER_COMMITTEE_KEY_HASH;
                index += arr::enc(h, &mut buff[index..])?;
            }
            Voter::CommitteeScriptHash(h) => {
                buff[0] = VOTER_COMMITTEE_SCRIPT_HASH;
                index += arr::enc(h, &mut buff[index..])?;
            }
            Voter::DRepKeyHash(h) => {
                buff[0] = VOTER_DREP_KEY_HASH;
                index += arr::enc(h, &mut buff[index..])?;
            }
            Voter::DRepScriptHash(h) => {
                buff[0] = VOTER_DREP_SCRIPT_HASH;
                index += arr::enc(h, &mut buff[index..])?;
            }
            Voter::PoolKeyHash(h) => {
                buff[0] = VOTER_POOL_KEY_HASH;
                index += arr::enc(h, &mut buff[index..])?;
            }
            Voter::CommitteeKeyPath(p) => {
                buff[0] = VOTER_COMMITTEE_KEY_PATH;
                index += p.encode(&mut buff[index..])?;
            }
            Voter::DRepKeyPath(p) => {
                buff[0] = VOTER_DREP_KEY_PATH;
                index += p.encode(&mut buff[index..])?;
            }
            Voter::PoolKeyPath(p) => {
                buff[0] = VOTER_POOL_KEY_PATH;
                index += p.encode(&mut buff[index..])?;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for Voter {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let v = match buff[0] {
            VOTER_COMMITTEE_KEY_HASH => {
                let (h, n) = arr::dec(&buff[1..])?;
                (Voter::CommitteeKeyHash(h), 1 + n)
            }
            VOTER_COMMITTEE_SCRIPT_HASH => {
                let (h, n) = arr::dec(&buff[1..])?;
                (Voter::CommitteeScriptHash(h), 1 + n)
            }
            VOTER_DREP_KEY_HASH => {
                let (h, n) = arr::dec(&buff[1..])?;
                (Voter::DRepKeyHash(h), 1 + n)
            }
            VOTER_DREP_SCRIPT_HASH => {
                let (h, n) = arr::dec(&buff[1..])?;
                (Voter::DRepScriptHash(h), 1 + n)
            }
            VOTER_POOL_KEY_HASH => {
                let (h, n) = arr::dec(&buff[1..])?;
                (Voter::PoolKeyHash(h), 1 + n)
            }
            VOTER_COMMITTEE_KEY_PATH => {
                let (p, n) = DerivationPath::decode_owned(&buff[1..])?;
                (Voter::CommitteeKeyPath(p), 1 + n)
            }
            VOTER_DREP_KEY_PATH => {
                let (p, n) = DerivationPath::decode_owned(&buff[1..])?;
                (Voter::DRepKeyPath(p), 1 + n)
            }
            VOTER_POOL_KEY_PATH => {
                let (p, n) = DerivationPath::decode_owned(&buff[1..])?;
                (Voter::PoolKeyPath(p), 1 + n)
            }
            _ => return Err(ApduError::InvalidEncoding),
        };

        Ok(v)
    }
}

/// Governance action being voted on
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[encdec(error = "ApduError")]
pub struct GovActionId {
    /// Hash of the transaction that proposed the action
    #[encdec(with = "arr")]
    #[cfg_attr(feature = "serde", serde(with = "hex_array"))]
    pub tx_hash: [u8; TX_HASH_LEN],

    /// Action index within that transaction
    #[encdec(with = "u32be")]
    pub index: u32,
}

/// Vote options
#[derive(Copy, Clone, Debug, PartialEq, Display, EnumIter, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum Vote {
    No = 0,
    Yes = 1,
    Abstain = 2,
}

impl Encode for Vote {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }
        buff[0] = *self as u8;
        Ok(1)
    }
}

impl DecodeOwned for Vote {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }
        let v = Self::try_from(buff[0]).map_err(|_| ApduError::InvalidEncoding)?;
        Ok((v, 1))
    }
}

/// Voting procedure stage APDU, one vote by one voter
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct TxVotingProcedure {
    pub voter: Voter,

    pub gov_action: GovActionId,

    pub vote: Vote,

    /// Optional vote rationale document
    #[encdec(with = "anchor_opt")]
    pub anchor: Option<Anchor>,
}

impl ApduStatic for TxVotingProcedure {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_VOTING_PROCEDURES
    }
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn input_apdu() {
        let apdu = TxInput {
            utxo: UtxoRef {
                tx_hash: [0x3b; TX_HASH_LEN],
                index: 7,
            },
        };

        let mut buff = [0u8; 64];
        let n = encode_decode_apdu(&mut buff, &apdu);

        assert_eq!(n, 36);
        assert_eq!(&buff[32..36], &[0, 0, 0, 7]);
        assert_eq!(apdu.p1(), 0x02);
    }

    #[test]
    fn amount_stage_apdus() {
        let mut buff = [0u8; 16];

        let fee = TxFee { amount: 42 };
        let n = encode_decode_apdu(&mut buff, &fee);
        assert_eq!(&buff[..n], &[0, 0, 0, 0, 0, 0, 0, 42]);
        assert_eq!(fee.p1(), 0x04);

        assert_eq!(TxTtl { slot: 0 }.p1(), 0x05);
        assert_eq!(TxValidityStart { slot: 0 }.p1(), 0x09);
        assert_eq!(TxTotalCollateral { amount: 0 }.p1(), 0x10);
        assert_eq!(TxTreasury { amount: 0 }.p1(), 0x15);
        assert_eq!(TxDonation { amount: 0 }.p1(), 0x16);
    }

    #[test]
    fn withdrawal_apdu() {
        let apdu = TxWithdrawal {
            amount: 1000,
            credential: Credential::Path(
                DerivationPath::from_str("m/1852'/1815'/0'/2/0").unwrap(),
            ),
        };

        let mut buff = [0u8; 64];
        let n = encode_decode_apdu(&mut buff, &apdu);

        // Amount first, credential tag after
        assert_eq!(&buff[..8], &[0, 0, 0, 0, 0, 0, 0x03, 0xe8]);
        assert_eq!(buff[8], 0x00);
        assert_eq!(n, 8 + 1 + 21);
    }

    #[test]
    fn required_signer_apdu() {
        let mut buff = [0u8; 64];

        let apdu = TxRequiredSigner {
            signer: RequiredSigner::Hash([0x99; KEY_HASH_LEN]),
        };
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, 1 + 28);
        assert_eq!(buff[0], 0x01);

        let apdu = TxRequiredSigner {
            signer: RequiredSigner::Path(DerivationPath::from_str("m/1852'/1815'/0'/0/0").unwrap()),
        };
        encode_decode_apdu(&mut buff, &apdu);
    }

    #[test]
    fn voting_procedure_apdu() {
        let apdu = TxVotingProcedure {
            voter: Voter::DRepKeyPath(DerivationPath::from_str("m/1852'/1815'/0'/3/0").unwrap()),
            gov_action: GovActionId {
                tx_hash: [0x77; TX_HASH_LEN],
                index: 3,
            },
            vote: Vote::Yes,
            anchor: None,
        };

        let mut buff = [0u8; 128];
        let n = encode_decode_apdu(&mut buff, &apdu);

        assert_eq!(buff[0], 102); // drep key path tag
        assert_eq!(buff[n - 2], 0x01); // vote yes
        assert_eq!(buff[n - 1], 0x01); // anchor absent
        assert_eq!(apdu.p1(), 0x13);
    }

    #[test]
    fn voter_tags() {
        let cases = [
            (Voter::CommitteeKeyHash([0; 28]), 0u8),
            (Voter::CommitteeScriptHash([0; 28]), 1),
            (Voter::DRepKeyHash([0; 28]), 2),
            (Voter::DRepScriptHash([0; 28]), 3),
            (Voter::PoolKeyHash([0; 28]), 4),
            (
                Voter::CommitteeKeyPath(DerivationPath::from_str("m/1852'/1815'/0'/4/0").unwrap()),
                100,
            ),
            (
                Voter::DRepKeyPath(DerivationPath::from_str("m/1852'/1815'/0'/3/0").unwrap()),
                102,
            ),
            (
                Voter::PoolKeyPath(DerivationPath::from_str("m/1853'/1815'/0'/0'").unwrap()),
                104,
            ),
        ];

        for (v, tag) in cases {
            let mut buff = [0u8; 64];
            let n = v.encode(&mut buff).unwrap();

            assert_eq!(buff[0], tag);

            let (decoded, m) = Voter::decode_owned(&buff[..n]).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(m, n);
        }
    }
}
