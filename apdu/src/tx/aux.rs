// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Auxiliary data stage and the CIP-36 registration sub-protocol
//!
//! The stage opens with [`TxAuxData`]: either a pre-computed 32-byte
//! auxiliary data hash, or an announcement that a CIP-36 vote key
//! registration follows as a P2-selected sequence:
//!
//! `INIT -> [VOTE_KEY] -> DELEGATION* -> STAKING_KEY -> PAYMENT_ADDRESS ->
//! NONCE -> [VOTING_PURPOSE] -> CONFIRM`
//!
//! CIP-15 registrations carry a single vote key and no delegations;
//! CIP-36 registrations carry weighted delegations instead.

use encdec::{Decode, DecodeOwned, Encode};
use num_enum::TryFromPrimitive;

use super::{P1_AUX_DATA, SIGNATURE_LEN, TX_HASH_LEN};
use crate::{
    addr::Destination, helpers::*, path::DerivationPath, ApduError, ApduStatic, Instruction,
};

/// Length of an auxiliary data hash
pub const AUX_DATA_HASH_LEN: usize = TX_HASH_LEN;

/// Length of a CIP-36 vote key
pub const VOTE_KEY_LEN: usize = 32;

// Auxiliary data type tags
const AUX_DATA_ARBITRARY_HASH: u8 = 0;
const AUX_DATA_CVOTE_REGISTRATION: u8 = 1;

// Sub-protocol step selectors carried in P2
pub(crate) const P2_CVOTE_REG_VOTE_KEY: u8 = 0x30;
pub(crate) const P2_CVOTE_REG_STAKING_KEY: u8 = 0x31;
pub(crate) const P2_CVOTE_REG_PAYMENT_ADDRESS: u8 = 0x32;
pub(crate) const P2_CVOTE_REG_NONCE: u8 = 0x33;
pub(crate) const P2_CVOTE_REG_CONFIRM: u8 = 0x34;
pub(crate) const P2_CVOTE_REG_VOTING_PURPOSE: u8 = 0x35;
pub(crate) const P2_CVOTE_REG_INIT: u8 = 0x36;
pub(crate) const P2_CVOTE_REG_DELEGATION: u8 = 0x37;

// Vote key reference tags
const VOTE_KEY_REF_KEY: u8 = 1;
const VOTE_KEY_REF_PATH: u8 = 2;

/// Auxiliary data stage APDU
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TxAuxData {
    /// Pre-computed auxiliary data hash
    ArbitraryHash(
        #[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; AUX_DATA_HASH_LEN],
    ),

    /// CIP-36 registration built on-device, body follows on P2
    CVoteRegistration,
}

impl Encode for TxAuxData {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            TxAuxData::ArbitraryHash(_) => 1 + AUX_DATA_HASH_LEN,
            TxAuxData::CVoteRegistration => 1,
        };
        Ok(len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        match self {
            TxAuxData::ArbitraryHash(h) => {
                buff[0] = AUX_DATA_ARBITRARY_HASH;
                let n = arr::enc(h, &mut buff[1..])?;
                Ok(1 + n)
            }
            TxAuxData::CVoteRegistration => {
                buff[0] = AUX_DATA_CVOTE_REGISTRATION;
                Ok(1)
            }
        }
    }
}

impl DecodeOwned for TxAuxData {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        match buff[0] {
            AUX_DATA_ARBITRARY_HASH => {
                let (h, n) = arr::dec(&buff[1..])?;
                Ok((TxAuxData::ArbitraryHash(h), 1 + n))
            }
            AUX_DATA_CVOTE_REGISTRATION => Ok((TxAuxData::CVoteRegistration, 1)),
            _ => Err(ApduError::InvalidEncoding),
        }
    }
}

impl ApduStatic for TxAuxData {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_AUX_DATA
    }
}

/// CIP-36 registration formats
#[derive(Copy, Clone, Debug, PartialEq, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum CVoteRegFormat {
    /// Single vote key, no delegations
    Cip15 = 1,

    /// Weighted vote key delegations
    Cip36 = 2,
}

/// Vote key reference, raw key or device-owned path
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VoteKeyRef {
    /// Raw CIP-36 vote key
    Key(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; VOTE_KEY_LEN]),

    /// Device-owned vote key path
    Path(DerivationPath),
}

impl Encode for VoteKeyRef {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            VoteKeyRef::Key(_) => VOTE_KEY_LEN,
            VoteKeyRef::Path(p) => p.wire_len(),
        };
        Ok(1 + len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match self {
            VoteKeyRef::Key(k) => {
                buff[0] = VOTE_KEY_REF_KEY;
                index += arr::enc(k, &mut buff[index..])?;
            }
            VoteKeyRef::Path(p) => {
                buff[0] = VOTE_KEY_REF_PATH;
                index += p.encode(&mut buff[index..])?;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for VoteKeyRef {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        match buff[0] {
            VOTE_KEY_REF_KEY => {
                let (k, n) = arr::dec(&buff[1..])?;
                Ok((VoteKeyRef::Key(k), 1 + n))
            }
            VOTE_KEY_REF_PATH => {
                let (p, n) = DerivationPath::decode_owned(&buff[1..])?;
                Ok((VoteKeyRef::Path(p), 1 + n))
            }
            _ => Err(ApduError::InvalidEncoding),
        }
    }
}

/// Registration INIT APDU, declares format and delegation count
#[derive(Clone, Debug, PartialEq)]
pub struct CVoteRegInit {
    pub format: CVoteRegFormat,
    pub num_delegations: u32,
}

impl Encode for CVoteRegInit {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1 + 4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.format as u8;
        let n = u32be::enc(&self.num_delegations, &mut buff[1..])?;

        Ok(1 + n)
    }
}

impl DecodeOwned for CVoteRegInit {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let format = CVoteRegFormat::try_from(buff[0]).map_err(|_| ApduError::InvalidEncoding)?;
        let (num_delegations, n) = u32be::dec(&buff[1..])?;

        Ok((
            Self {
                format,
                num_delegations,
            },
            1 + n,
        ))
    }
}

impl ApduStatic for CVoteRegInit {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_AUX_DATA
    }

    fn p2(&self) -> u8 {
        P2_CVOTE_REG_INIT
    }
}

/// Registration VOTE_KEY APDU, CIP-15 single key
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct CVoteRegVoteKey {
    pub key: VoteKeyRef,
}

impl ApduStatic for CVoteRegVoteKey {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_AUX_DATA
    }

    fn p2(&self) -> u8 {
        P2_CVOTE_REG_VOTE_KEY
    }
}

/// Registration DELEGATION APDU, one per weighted vote key
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct CVoteRegDelegation {
    pub key: VoteKeyRef,

    #[encdec(with = "u32be")]
    pub weight: u32,
}

impl ApduStatic for CVoteRegDelegation {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_AUX_DATA
    }

    fn p2(&self) -> u8 {
        P2_CVOTE_REG_DELEGATION
    }
}

/// Registration STAKING_KEY APDU
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct CVoteRegStakingKey {
    pub path: DerivationPath,
}

impl ApduStatic for CVoteRegStakingKey {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_AUX_DATA
    }

    fn p2(&self) -> u8 {
        P2_CVOTE_REG_STAKING_KEY
    }
}

/// Registration PAYMENT_ADDRESS APDU, rewards destination
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct CVoteRegPaymentAddress {
    pub destination: Destination,
}

impl ApduStatic for CVoteRegPaymentAddress {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_AUX_DATA
    }

    fn p2(&self) -> u8 {
        P2_CVOTE_REG_PAYMENT_ADDRESS
    }
}

/// Registration NONCE APDU
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct CVoteRegNonce {
    #[encdec(with = "u64be")]
    pub nonce: u64,
}

impl ApduStatic for CVoteRegNonce {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_AUX_DATA
    }

    fn p2(&self) -> u8 {
        P2_CVOTE_REG_NONCE
    }
}

/// Registration VOTING_PURPOSE APDU, optional purpose value
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CVoteRegVotingPurpose {
    pub purpose: Option<u64>,
}

impl Encode for CVoteRegVotingPurpose {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(match self.purpose {
            Some(_) => 9,
            None => 1,
        })
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = flag::enc(&self.purpose.is_some(), buff)?;
        if let Some(p) = &self.purpose {
            index += u64be::enc(p, &mut buff[index..])?;
        }

        Ok(index)
    }
}

impl DecodeOwned for CVoteRegVotingPurpose {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let (included, mut index) = flag::dec(buff)?;
        let purpose = match included {
            true => {
                let (p, n) = u64be::dec(&buff[index..])?;
                index += n;
                Some(p)
            }
            false => None,
        };

        Ok((Self { purpose }, index))
    }
}

impl ApduStatic for CVoteRegVotingPurpose {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_AUX_DATA
    }

    fn p2(&self) -> u8 {
        P2_CVOTE_REG_VOTING_PURPOSE
    }
}

/// Registration CONFIRM APDU, closes the registration
#[derive(Copy, Clone, Debug, PartialEq, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct CVoteRegConfirm {}

impl ApduStatic for CVoteRegConfirm {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_AUX_DATA
    }

    fn p2(&self) -> u8 {
        P2_CVOTE_REG_CONFIRM
    }
}

/// Registration CONFIRM response APDU
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct CVoteRegConfirmResp {
    /// Finalized auxiliary data hash
    #[encdec(with = "arr")]
    pub aux_data_hash: [u8; AUX_DATA_HASH_LEN],

    /// ed25519 signature over the registration payload
    #[encdec(with = "arr")]
    pub signature: [u8; SIGNATURE_LEN],
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn aux_data_stage_apdus() {
        let mut buff = [0u8; 64];

        let apdu = TxAuxData::ArbitraryHash([0xaa; AUX_DATA_HASH_LEN]);
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(buff[0], 0);
        assert_eq!(n, 33);
        assert_eq!(apdu.p1(), 0x08);
        assert_eq!(apdu.p2(), 0x00);

        let apdu = TxAuxData::CVoteRegistration;
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(&buff[..n], &[1]);
    }

    #[test]
    fn registration_init_apdu() {
        let apdu = CVoteRegInit {
            format: CVoteRegFormat::Cip36,
            num_delegations: 2,
        };

        let mut buff = [0u8; 16];
        let n = encode_decode_apdu(&mut buff, &apdu);

        assert_eq!(&buff[..n], &[2, 0, 0, 0, 2]);
        assert_eq!(apdu.p2(), 0x36);
    }

    #[test]
    fn vote_key_and_delegation_apdus() {
        let mut buff = [0u8; 64];

        let apdu = CVoteRegVoteKey {
            key: VoteKeyRef::Key([0x42; VOTE_KEY_LEN]),
        };
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(buff[0], 1);
        assert_eq!(n, 33);
        assert_eq!(apdu.p2(), 0x30);

        let apdu = CVoteRegDelegation {
            key: VoteKeyRef::Path(DerivationPath::from_str("m/1694'/1815'/0'/0/0").unwrap()),
            weight: 3,
        };
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(buff[0], 2);
        assert_eq!(&buff[n - 4..n], &[0, 0, 0, 3]);
        assert_eq!(apdu.p2(), 0x37);
    }

    #[test]
    fn voting_purpose_apdu() {
        let mut buff = [0u8; 16];

        let n = encode_decode_apdu(&mut buff, &CVoteRegVotingPurpose { purpose: None });
        assert_eq!(&buff[..n], &[0x01]);

        let n = encode_decode_apdu(
            &mut buff,
            &CVoteRegVotingPurpose { purpose: Some(0) },
        );
        assert_eq!(&buff[..n], &[0x02, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn confirm_response_layout() {
        let resp = CVoteRegConfirmResp {
            aux_data_hash: [0x11; AUX_DATA_HASH_LEN],
            signature: [0x22; SIGNATURE_LEN],
        };

        let mut buff = [0u8; 128];
        let n = encode_decode_apdu(&mut buff, &resp);
        assert_eq!(n, 96);
    }
}
