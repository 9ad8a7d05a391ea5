// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Native script hash derivation APDUs
//!
//! The script tree streams in pre-order: one [`ScriptComplex`] per
//! operator node announcing its child count, one [`ScriptSimple`] per
//! leaf, then [`ScriptFinish`] selects how the device displays the hash
//! and the response carries the 28-byte script hash.

use encdec::{Decode, DecodeOwned, Encode};
use num_enum::TryFromPrimitive;

use crate::{
    addr::SCRIPT_HASH_LEN, helpers::*, path::DerivationPath, ApduError, ApduStatic, Instruction,
};

// Step selectors carried in P1
pub(crate) const P1_SCRIPT_COMPLEX: u8 = 0x01;
pub(crate) const P1_SCRIPT_SIMPLE: u8 = 0x02;
pub(crate) const P1_SCRIPT_FINISH: u8 = 0x03;

// Operator node kinds
const SCRIPT_ALL: u8 = 1;
const SCRIPT_ANY: u8 = 2;
const SCRIPT_N_OF_K: u8 = 3;

// Leaf kinds
const SCRIPT_PUBKEY: u8 = 0;
const SCRIPT_INVALID_BEFORE: u8 = 4;
const SCRIPT_INVALID_HEREAFTER: u8 = 5;

// Pubkey leaf reference tags
const SCRIPT_KEY_PATH: u8 = 1;
const SCRIPT_KEY_HASH: u8 = 2;

/// Operator node APDU, opens a subtree of `count` children
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScriptComplex {
    /// All children must be satisfied
    All { count: u32 },

    /// Any child may be satisfied
    Any { count: u32 },

    /// At least `required` of `count` children must be satisfied
    NOfK { count: u32, required: u32 },
}

impl Encode for ScriptComplex {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            ScriptComplex::All { .. } | ScriptComplex::Any { .. } => 1 + 4,
            ScriptComplex::NOfK { .. } => 1 + 4 + 4,
        };
        Ok(len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match self {
            ScriptComplex::All { count } => {
                buff[0] = SCRIPT_ALL;
                index += u32be::enc(count, &mut buff[index..])?;
            }
            ScriptComplex::Any { count } => {
                buff[0] = SCRIPT_ANY;
                index += u32be::enc(count, &mut buff[index..])?;
            }
            ScriptComplex::NOfK { count, required } => {
                buff[0] = SCRIPT_N_OF_K;
                index += u32be::enc(count, &mut buff[index..])?;
                index += u32be::enc(required, &mut buff[index..])?;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for ScriptComplex {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        let node = match buff[0] {
            SCRIPT_ALL | SCRIPT_ANY => {
                let (count, n) = u32be::dec(&buff[index..])?;
                index += n;
                match buff[0] {
                    SCRIPT_ALL => ScriptComplex::All { count },
                    _ => ScriptComplex::Any { count },
                }
            }
            SCRIPT_N_OF_K => {
                let (count, n) = u32be::dec(&buff[index..])?;
                index += n;
                let (required, n) = u32be::dec(&buff[index..])?;
                index += n;
                ScriptComplex::NOfK { count, required }
            }
            _ => return Err(ApduError::InvalidEncoding),
        };

        Ok((node, index))
    }
}

impl ApduStatic for ScriptComplex {
    const INS: u8 = Instruction::DeriveScriptHash as u8;

    fn p1(&self) -> u8 {
        P1_SCRIPT_COMPLEX
    }
}

/// Leaf node APDU
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScriptSimple {
    /// Signature requirement for a device-owned key
    PubkeyPath(DerivationPath),

    /// Signature requirement for a third-party key hash
    PubkeyHash(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; 28]),

    /// Valid only at or after the slot
    InvalidBefore(u64),

    /// Valid only before the slot
    InvalidHereafter(u64),
}

impl Encode for ScriptSimple {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            ScriptSimple::PubkeyPath(p) => 1 + p.wire_len(),
            ScriptSimple::PubkeyHash(_) => 1 + 28,
            ScriptSimple::InvalidBefore(_) | ScriptSimple::InvalidHereafter(_) => 8,
        };
        Ok(1 + len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match self {
            ScriptSimple::PubkeyPath(p) => {
                buff[0] = SCRIPT_PUBKEY;
                buff[index] = SCRIPT_KEY_PATH;
                index += 1;
                index += p.encode(&mut buff[index..])?;
            }
            ScriptSimple::PubkeyHash(h) => {
                buff[0] = SCRIPT_PUBKEY;
                buff[index] = SCRIPT_KEY_HASH;
                index += 1;
                index += arr::enc(h, &mut buff[index..])?;
            }
            ScriptSimple::InvalidBefore(slot) => {
                buff[0] = SCRIPT_INVALID_BEFORE;
                index += u64be::enc(slot, &mut buff[index..])?;
            }
            ScriptSimple::InvalidHereafter(slot) => {
                buff[0] = SCRIPT_INVALID_HEREAFTER;
                index += u64be::enc(slot, &mut buff[index..])?;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for ScriptSimple {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        let leaf = match buff[0] {
            SCRIPT_PUBKEY => {
                if buff.len() <= index {
                    return Err(ApduError::InvalidLength);
                }
                let tag = buff[index];
                index += 1;

                match tag {
                    SCRIPT_KEY_PATH => {
                        let (p, n) = DerivationPath::decode_owned(&buff[index..])?;
                        index += n;
                        ScriptSimple::PubkeyPath(p)
                    }
                    SCRIPT_KEY_HASH => {
                        let (h, n) = arr::dec(&buff[index..])?;
                        index += n;
                        ScriptSimple::PubkeyHash(h)
                    }
                    _ => return Err(ApduError::InvalidEncoding),
                }
            }
            SCRIPT_INVALID_BEFORE | SCRIPT_INVALID_HEREAFTER => {
                let (slot, n) = u64be::dec(&buff[index..])?;
                index += n;
                match buff[0] {
                    SCRIPT_INVALID_BEFORE => ScriptSimple::InvalidBefore(slot),
                    _ => ScriptSimple::InvalidHereafter(slot),
                }
            }
            _ => return Err(ApduError::InvalidEncoding),
        };

        Ok((leaf, index))
    }
}

impl ApduStatic for ScriptSimple {
    const INS: u8 = Instruction::DeriveScriptHash as u8;

    fn p1(&self) -> u8 {
        P1_SCRIPT_SIMPLE
    }
}

/// Hash display formats for the FINISH step
#[derive(Copy, Clone, Debug, PartialEq, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum ScriptHashDisplayFormat {
    /// bech32 `script` encoding
    Bech32 = 1,

    /// Hex policy id
    PolicyId = 2,
}

/// FINISH APDU, closes the tree and requests the hash
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScriptFinish {
    pub format: ScriptHashDisplayFormat,
}

impl Encode for ScriptFinish {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }
        buff[0] = self.format as u8;
        Ok(1)
    }
}

impl DecodeOwned for ScriptFinish {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }
        let format =
            ScriptHashDisplayFormat::try_from(buff[0]).map_err(|_| ApduError::InvalidEncoding)?;
        Ok((Self { format }, 1))
    }
}

impl ApduStatic for ScriptFinish {
    const INS: u8 = Instruction::DeriveScriptHash as u8;

    fn p1(&self) -> u8 {
        P1_SCRIPT_FINISH
    }
}

/// Script hash response APDU
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct ScriptHashResp {
    /// Blake2b-224 hash of the script
    #[encdec(with = "arr")]
    pub script_hash: [u8; SCRIPT_HASH_LEN],
}
