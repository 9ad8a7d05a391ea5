// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction signing APDUs
//!
//! A signing session opens with [`TxInit`], which fixes the network, the
//! signing mode and the element counts for the whole transaction. Body
//! elements follow in a fixed stage order (inputs, outputs, fee, ttl,
//! certificates, withdrawals and so on), each stage selected by the P1
//! byte. [`TxConfirm`] closes the body and returns the transaction hash,
//! then one [`TxWitness`] per witness path collects the signatures.
//!
//! Outputs, certain certificates, minting and CIP-36 auxiliary data open
//! nested submachines with their own P2-selected steps, see [`output`],
//! [`pool`], [`mint`] and [`aux`].

use bitflags::bitflags;
use encdec::{Decode, DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString};

use crate::{
    addr::NetworkInfo, helpers::*, path::DerivationPath, ApduError, ApduStatic, Instruction,
};

mod cred;
pub use cred::*;

mod body;
pub use body::*;

mod cert;
pub use cert::*;

pub mod pool;
pub use pool::*;

pub mod output;
pub use output::*;

pub mod mint;
pub use mint::*;

pub mod aux;
pub use aux::*;

/// Length of a transaction hash
pub const TX_HASH_LEN: usize = 32;

/// Length of an ed25519 signature
pub const SIGNATURE_LEN: usize = 64;

// Stage selectors carried in P1
pub(crate) const P1_INIT: u8 = 0x01;
pub(crate) const P1_INPUTS: u8 = 0x02;
pub(crate) const P1_OUTPUTS: u8 = 0x03;
pub(crate) const P1_FEE: u8 = 0x04;
pub(crate) const P1_TTL: u8 = 0x05;
pub(crate) const P1_CERTIFICATES: u8 = 0x06;
pub(crate) const P1_WITHDRAWALS: u8 = 0x07;
pub(crate) const P1_AUX_DATA: u8 = 0x08;
pub(crate) const P1_VALIDITY_START: u8 = 0x09;
pub(crate) const P1_CONFIRM: u8 = 0x0a;
pub(crate) const P1_MINT: u8 = 0x0b;
pub(crate) const P1_SCRIPT_DATA_HASH: u8 = 0x0c;
pub(crate) const P1_COLLATERAL_INPUTS: u8 = 0x0d;
pub(crate) const P1_REQUIRED_SIGNERS: u8 = 0x0e;
pub(crate) const P1_WITNESS: u8 = 0x0f;
pub(crate) const P1_TOTAL_COLLATERAL: u8 = 0x10;
pub(crate) const P1_REFERENCE_INPUTS: u8 = 0x11;
pub(crate) const P1_COLLATERAL_OUTPUT: u8 = 0x12;
pub(crate) const P1_VOTING_PROCEDURES: u8 = 0x13;
pub(crate) const P1_TREASURY: u8 = 0x15;
pub(crate) const P1_DONATION: u8 = 0x16;

bitflags! {
    /// Transaction serialization options declared at INIT
    pub struct TxOptions: u64 {
        /// Wrap body sets in CBOR tag 258
        const TAG_CBOR_SETS = 1 << 0;
    }
}

/// encdec helper for [`TxOptions`], unknown bits are rejected
pub(crate) mod opts {
    use byteorder::{BigEndian, ByteOrder};

    use super::TxOptions;
    use crate::ApduError;

    pub fn enc(v: &TxOptions, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 8 {
            return Err(ApduError::InvalidLength);
        }
        BigEndian::write_u64(buff, v.bits());
        Ok(8)
    }

    pub fn enc_len(_v: &TxOptions) -> Result<usize, ApduError> {
        Ok(8)
    }

    pub fn dec(buff: &[u8]) -> Result<(TxOptions, usize), ApduError> {
        if buff.len() < 8 {
            return Err(ApduError::InvalidLength);
        }
        let v = TxOptions::from_bits(BigEndian::read_u64(buff))
            .ok_or(ApduError::InvalidEncoding)?;
        Ok((v, 8))
    }
}

/// Transaction signing modes
///
/// The mode fixes which witness paths are acceptable and how body elements
/// are policed on the device.
#[derive(Copy, Clone, Debug, PartialEq, Display, EnumString, EnumIter, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum TransactionSigningMode {
    /// Ordinary wallet transaction
    Ordinary = 3,

    /// Pool registration signed by a pool owner
    PoolRegistrationOwner = 4,

    /// Pool registration signed by the pool operator
    PoolRegistrationOperator = 5,

    /// Script (multisig) transaction
    Multisig = 6,

    /// Plutus script transaction
    Plutus = 7,
}

impl Encode for TransactionSigningMode {
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

impl DecodeOwned for TransactionSigningMode {
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

/// Transaction INIT APDU, fixed 60 byte payload
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         OPTIONS (8B)                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   NETWORK_ID  |           PROTOCOL_MAGIC (4B)                 |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                 10 x PRESENCE FLAG (1B each)                  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  SIGNING_MODE |           9 x ELEMENT COUNT (4B each)         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct TxInit {
    /// Serialization options
    #[encdec(with = "opts")]
    pub options: TxOptions,

    /// Network the transaction is bound to
    pub network: NetworkInfo,

    #[encdec(with = "flag")]
    pub include_ttl: bool,
    #[encdec(with = "flag")]
    pub include_aux_data: bool,
    #[encdec(with = "flag")]
    pub include_validity_start: bool,
    #[encdec(with = "flag")]
    pub include_mint: bool,
    #[encdec(with = "flag")]
    pub include_script_data_hash: bool,
    #[encdec(with = "flag")]
    pub include_network_id: bool,
    #[encdec(with = "flag")]
    pub include_collateral_output: bool,
    #[encdec(with = "flag")]
    pub include_total_collateral: bool,
    #[encdec(with = "flag")]
    pub include_treasury: bool,
    #[encdec(with = "flag")]
    pub include_donation: bool,

    /// Signing mode for the whole session
    pub signing_mode: TransactionSigningMode,

    #[encdec(with = "u32be")]
    pub num_inputs: u32,
    #[encdec(with = "u32be")]
    pub num_outputs: u32,
    #[encdec(with = "u32be")]
    pub num_certificates: u32,
    #[encdec(with = "u32be")]
    pub num_withdrawals: u32,
    #[encdec(with = "u32be")]
    pub num_collateral_inputs: u32,
    #[encdec(with = "u32be")]
    pub num_required_signers: u32,
    #[encdec(with = "u32be")]
    pub num_reference_inputs: u32,
    #[encdec(with = "u32be")]
    pub num_voting_procedures: u32,

    /// Number of witness requests that will follow the body
    #[encdec(with = "u32be")]
    pub num_witnesses: u32,
}

impl ApduStatic for TxInit {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_INIT
    }
}

/// Transaction CONFIRM APDU, closes the body and requests the hash
#[derive(Copy, Clone, Debug, PartialEq, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxConfirm {}

impl ApduStatic for TxConfirm {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_CONFIRM
    }
}

/// Transaction hash response APDU, returned for [`TxConfirm`]
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct TxHashResp {
    /// Blake2b-256 hash of the assembled transaction body
    #[encdec(with = "arr")]
    pub tx_hash: [u8; TX_HASH_LEN],
}

/// Witness request APDU, one per signing path
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct TxWitness {
    /// Path to sign the transaction hash with
    pub path: DerivationPath,
}

impl ApduStatic for TxWitness {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_WITNESS
    }
}

/// Witness response APDU
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct TxWitnessResp {
    /// ed25519 signature over the transaction hash
    #[encdec(with = "arr")]
    pub signature: [u8; SIGNATURE_LEN],
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;
    use crate::test::encode_decode_apdu;

    pub(crate) fn ordinary_init() -> TxInit {
        TxInit {
            options: TxOptions::empty(),
            network: NetworkInfo::MAINNET,
            include_ttl: true,
            include_aux_data: false,
            include_validity_start: false,
            include_mint: false,
            include_script_data_hash: false,
            include_network_id: false,
            include_collateral_output: false,
            include_total_collateral: false,
            include_treasury: false,
            include_donation: false,
            signing_mode: TransactionSigningMode::Ordinary,
            num_inputs: 1,
            num_outputs: 1,
            num_certificates: 0,
            num_withdrawals: 0,
            num_collateral_inputs: 0,
            num_required_signers: 0,
            num_reference_inputs: 0,
            num_voting_procedures: 0,
            num_witnesses: 1,
        }
    }

    #[test]
    fn tx_init_apdu() {
        let apdu = ordinary_init();

        let mut buff = [0u8; 128];
        let n = encode_decode_apdu(&mut buff, &apdu);

        assert_eq!(
            &buff[..n],
            &[
                0, 0, 0, 0, 0, 0, 0, 0, // options
                0x01, 0x2d, 0x96, 0x4a, 0x09, // network id + protocol magic
                0x02, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, // flags
                0x03, // signing mode
                0, 0, 0, 1, // inputs
                0, 0, 0, 1, // outputs
                0, 0, 0, 0, // certificates
                0, 0, 0, 0, // withdrawals
                0, 0, 0, 0, // collateral inputs
                0, 0, 0, 0, // required signers
                0, 0, 0, 0, // reference inputs
                0, 0, 0, 0, // voting procedures
                0, 0, 0, 1, // witnesses
            ]
        );
    }

    #[test]
    fn tx_options_reject_unknown_bits() {
        let mut buff = [0u8; 8];
        buff[7] = 0x03;

        assert_eq!(opts::dec(&buff), Err(ApduError::InvalidEncoding));
    }

    #[test]
    fn tx_confirm_and_witness_apdus() {
        let mut buff = [0u8; 128];

        encode_decode_apdu(&mut buff, &TxConfirm::default());

        let witness = TxWitness {
            path: DerivationPath::from_str("m/1852'/1815'/0'/0/0").unwrap(),
        };
        encode_decode_apdu(&mut buff, &witness);
        assert_eq!(witness.p1(), 0x0f);

        let resp = TxHashResp {
            tx_hash: [0xab; TX_HASH_LEN],
        };
        encode_decode_apdu(&mut buff, &resp);

        let resp = TxWitnessResp {
            signature: [0xcd; SIGNATURE_LEN],
        };
        encode_decode_apdu(&mut buff, &resp);
    }
}
