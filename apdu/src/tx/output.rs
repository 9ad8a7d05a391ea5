// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction output sub-protocol
//!
//! Each output opens with [`OutputTopLevel`], continues with one APDU per
//! asset group and token, optionally streams an inline datum and a
//! reference script in chunks, and closes with [`OutputConfirm`]:
//!
//! `TOP_LEVEL -> (ASSET_GROUP -> TOKEN*)* -> [DATUM -> DATUM_CHUNK*] ->
//! [REF_SCRIPT -> REF_SCRIPT_CHUNK*] -> CONFIRM`
//!
//! The same steps serve the collateral return output under its own P1,
//! selected by the `collateral` flag on each step.

use encdec::{Decode, DecodeOwned, Encode};
use num_enum::TryFromPrimitive;

use super::{P1_COLLATERAL_OUTPUT, P1_OUTPUTS};
use crate::{addr::Destination, helpers::*, ApduError, ApduStatic, Instruction};

/// Length of a minting policy id
pub const POLICY_ID_LEN: usize = 28;

/// Maximum length of an asset name
pub const ASSET_NAME_MAX_LEN: usize = 32;

// Sub-protocol step selectors carried in P2
pub(crate) const P2_OUTPUT_TOP_LEVEL: u8 = 0x30;
pub(crate) const P2_OUTPUT_ASSET_GROUP: u8 = 0x31;
pub(crate) const P2_OUTPUT_TOKEN: u8 = 0x32;
pub(crate) const P2_OUTPUT_CONFIRM: u8 = 0x33;
pub(crate) const P2_OUTPUT_DATUM: u8 = 0x34;
pub(crate) const P2_OUTPUT_DATUM_CHUNK: u8 = 0x35;
pub(crate) const P2_OUTPUT_REF_SCRIPT: u8 = 0x36;
pub(crate) const P2_OUTPUT_REF_SCRIPT_CHUNK: u8 = 0x37;

// Datum kind tags
const DATUM_HASH: u8 = 0;
const DATUM_INLINE: u8 = 1;

/// Output serialization formats
#[derive(Copy, Clone, Debug, PartialEq, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum TxOutputFormat {
    /// Pre-Babbage array serialization
    ArrayLegacy = 0,

    /// Babbage map serialization, required for datums and reference scripts
    MapBabbage = 1,
}

/// Output TOP_LEVEL APDU
///
/// Declares the destination, the coin amount and how many asset groups,
/// datum and reference-script messages follow for this output.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputTopLevel {
    pub format: TxOutputFormat,
    pub destination: Destination,
    pub amount: u64,
    pub num_asset_groups: u32,
    pub include_datum: bool,
    pub include_ref_script: bool,

    /// Address this output under the collateral return P1
    pub collateral: bool,
}

impl Encode for OutputTopLevel {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1 + self.destination.encode_len()? + 8 + 4 + 1 + 1)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.format as u8;
        let mut index = 1;

        index += self.destination.encode(&mut buff[index..])?;
        index += u64be::enc(&self.amount, &mut buff[index..])?;
        index += u32be::enc(&self.num_asset_groups, &mut buff[index..])?;
        index += flag::enc(&self.include_datum, &mut buff[index..])?;
        index += flag::enc(&self.include_ref_script, &mut buff[index..])?;

        Ok(index)
    }
}

impl DecodeOwned for OutputTopLevel {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let format =
            TxOutputFormat::try_from(buff[0]).map_err(|_| ApduError::InvalidEncoding)?;
        let mut index = 1;

        let (destination, n) = Destination::decode_owned(&buff[index..])?;
        index += n;
        let (amount, n) = u64be::dec(&buff[index..])?;
        index += n;
        let (num_asset_groups, n) = u32be::dec(&buff[index..])?;
        index += n;
        let (include_datum, n) = flag::dec(&buff[index..])?;
        index += n;
        let (include_ref_script, n) = flag::dec(&buff[index..])?;
        index += n;

        Ok((
            Self {
                format,
                destination,
                amount,
                num_asset_groups,
                include_datum,
                include_ref_script,
                collateral: false,
            },
            index,
        ))
    }
}

impl ApduStatic for OutputTopLevel {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        match self.collateral {
            false => P1_OUTPUTS,
            true => P1_COLLATERAL_OUTPUT,
        }
    }

    fn p2(&self) -> u8 {
        P2_OUTPUT_TOP_LEVEL
    }
}

/// Output ASSET_GROUP APDU, one per policy id
#[derive(Clone, Debug, PartialEq)]
pub struct OutputAssetGroup {
    pub policy_id: [u8; POLICY_ID_LEN],
    pub num_tokens: u32,

    /// Address this group under the collateral return P1
    pub collateral: bool,
}

impl Encode for OutputAssetGroup {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(POLICY_ID_LEN + 4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = arr::enc(&self.policy_id, buff)?;
        index += u32be::enc(&self.num_tokens, &mut buff[index..])?;

        Ok(index)
    }
}

impl DecodeOwned for OutputAssetGroup {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let (policy_id, mut index) = arr::dec(buff)?;
        let (num_tokens, n) = u32be::dec(&buff[index..])?;
        index += n;

        Ok((
            Self {
                policy_id,
                num_tokens,
                collateral: false,
            },
            index,
        ))
    }
}

impl ApduStatic for OutputAssetGroup {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        match self.collateral {
            false => P1_OUTPUTS,
            true => P1_COLLATERAL_OUTPUT,
        }
    }

    fn p2(&self) -> u8 {
        P2_OUTPUT_ASSET_GROUP
    }
}

/// Output TOKEN APDU, one per asset in the open group
#[derive(Clone, Debug, PartialEq)]
pub struct OutputToken {
    pub asset_name: heapless::Vec<u8, ASSET_NAME_MAX_LEN>,
    pub amount: u64,

    /// Address this token under the collateral return P1
    pub collateral: bool,
}

impl Encode for OutputToken {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + self.asset_name.len() + 8)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = u32be::enc(&(self.asset_name.len() as u32), buff)?;

        buff[index..][..self.asset_name.len()].copy_from_slice(&self.asset_name);
        index += self.asset_name.len();

        index += u64be::enc(&self.amount, &mut buff[index..])?;

        Ok(index)
    }
}

impl DecodeOwned for OutputToken {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let (size, mut index) = u32be::dec(buff)?;
        let size = size as usize;

        if size > ASSET_NAME_MAX_LEN || buff.len() < index + size {
            return Err(ApduError::InvalidLength);
        }

        let asset_name = heapless::Vec::from_slice(&buff[index..][..size])
            .map_err(|_| ApduError::InvalidLength)?;
        index += size;

        let (amount, n) = u64be::dec(&buff[index..])?;
        index += n;

        Ok((
            Self {
                asset_name,
                amount,
                collateral: false,
            },
            index,
        ))
    }
}

impl ApduStatic for OutputToken {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        match self.collateral {
            false => P1_OUTPUTS,
            true => P1_COLLATERAL_OUTPUT,
        }
    }

    fn p2(&self) -> u8 {
        P2_OUTPUT_TOKEN
    }
}

/// Output DATUM APDU, hash or the first inline chunk
#[derive(Clone, Debug, PartialEq)]
pub enum OutputDatum<'a> {
    /// Datum hash reference
    Hash([u8; 32]),

    /// Inline datum, first chunk with the declared total size
    Inline { total: u32, chunk: &'a [u8] },
}

impl<'a> Encode for OutputDatum<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            OutputDatum::Hash(_) => 32,
            OutputDatum::Inline { chunk, .. } => 4 + 4 + chunk.len(),
        };
        Ok(1 + len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match self {
            OutputDatum::Hash(h) => {
                buff[0] = DATUM_HASH;
                index += arr::enc(h, &mut buff[index..])?;
            }
            OutputDatum::Inline { total, chunk } => {
                buff[0] = DATUM_INLINE;
                index += u32be::enc(total, &mut buff[index..])?;
                index += u32be::enc(&(chunk.len() as u32), &mut buff[index..])?;
                buff[index..][..chunk.len()].copy_from_slice(chunk);
                index += chunk.len();
            }
        }

        Ok(index)
    }
}

impl<'a> Decode<'a> for OutputDatum<'a> {
    type Output = Self;

    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match buff[0] {
            DATUM_HASH => {
                let (h, n) = arr::dec(&buff[index..])?;
                Ok((OutputDatum::Hash(h), index + n))
            }
            DATUM_INLINE => {
                let (total, n) = u32be::dec(&buff[index..])?;
                index += n;
                let (size, n) = u32be::dec(&buff[index..])?;
                index += n;

                let size = size as usize;
                if buff.len() < index + size {
                    return Err(ApduError::InvalidLength);
                }

                let chunk = &buff[index..][..size];
                Ok((OutputDatum::Inline { total, chunk }, index + size))
            }
            _ => Err(ApduError::InvalidEncoding),
        }
    }
}

impl<'a> ApduStatic for OutputDatum<'a> {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_OUTPUTS
    }

    fn p2(&self) -> u8 {
        P2_OUTPUT_DATUM
    }
}

/// Size-prefixed chunk payload shared by datum / script continuations
/// and the first reference-script message
fn sized_chunk_enc(chunk: &[u8], buff: &mut [u8]) -> Result<usize, ApduError> {
    let mut index = u32be::enc(&(chunk.len() as u32), buff)?;
    buff[index..][..chunk.len()].copy_from_slice(chunk);
    index += chunk.len();
    Ok(index)
}

fn sized_chunk_dec(buff: &[u8]) -> Result<(&[u8], usize), ApduError> {
    let (size, index) = u32be::dec(buff)?;
    let size = size as usize;

    if buff.len() < index + size {
        return Err(ApduError::InvalidLength);
    }

    Ok((&buff[index..][..size], index + size))
}

/// Output DATUM_CHUNK APDU, inline datum continuation
#[derive(Clone, Debug, PartialEq)]
pub struct OutputDatumChunk<'a> {
    pub chunk: &'a [u8],
}

impl<'a> Encode for OutputDatumChunk<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + self.chunk.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }
        sized_chunk_enc(self.chunk, buff)
    }
}

impl<'a> Decode<'a> for OutputDatumChunk<'a> {
    type Output = Self;

    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        let (chunk, n) = sized_chunk_dec(buff)?;
        Ok((Self { chunk }, n))
    }
}

impl<'a> ApduStatic for OutputDatumChunk<'a> {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_OUTPUTS
    }

    fn p2(&self) -> u8 {
        P2_OUTPUT_DATUM_CHUNK
    }
}

/// Output REF_SCRIPT APDU, first chunk with the declared total size
#[derive(Clone, Debug, PartialEq)]
pub struct OutputRefScript<'a> {
    pub total: u32,
    pub chunk: &'a [u8],
}

impl<'a> Encode for OutputRefScript<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + 4 + self.chunk.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = u32be::enc(&self.total, buff)?;
        index += sized_chunk_enc(self.chunk, &mut buff[index..])?;

        Ok(index)
    }
}

impl<'a> Decode<'a> for OutputRefScript<'a> {
    type Output = Self;

    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        let (total, index) = u32be::dec(buff)?;
        let (chunk, n) = sized_chunk_dec(&buff[index..])?;
        Ok((Self { total, chunk }, index + n))
    }
}

impl<'a> ApduStatic for OutputRefScript<'a> {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_OUTPUTS
    }

    fn p2(&self) -> u8 {
        P2_OUTPUT_REF_SCRIPT
    }
}

/// Output REF_SCRIPT_CHUNK APDU, reference script continuation
#[derive(Clone, Debug, PartialEq)]
pub struct OutputRefScriptChunk<'a> {
    pub chunk: &'a [u8],
}

impl<'a> Encode for OutputRefScriptChunk<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + self.chunk.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }
        sized_chunk_enc(self.chunk, buff)
    }
}

impl<'a> Decode<'a> for OutputRefScriptChunk<'a> {
    type Output = Self;

    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        let (chunk, n) = sized_chunk_dec(buff)?;
        Ok((Self { chunk }, n))
    }
}

impl<'a> ApduStatic for OutputRefScriptChunk<'a> {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_OUTPUTS
    }

    fn p2(&self) -> u8 {
        P2_OUTPUT_REF_SCRIPT_CHUNK
    }
}

/// Output CONFIRM APDU, closes the open output
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct OutputConfirm {
    /// Address this confirm under the collateral return P1
    pub collateral: bool,
}

impl Encode for OutputConfirm {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, ApduError> {
        Ok(0)
    }
}

impl DecodeOwned for OutputConfirm {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(_buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        Ok((Self { collateral: false }, 0))
    }
}

impl ApduStatic for OutputConfirm {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        match self.collateral {
            false => P1_OUTPUTS,
            true => P1_COLLATERAL_OUTPUT,
        }
    }

    fn p2(&self) -> u8 {
        P2_OUTPUT_CONFIRM
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn top_level_layout() {
        let apdu = OutputTopLevel {
            format: TxOutputFormat::ArrayLegacy,
            destination: Destination::third_party(&[0x82; 57]).unwrap(),
            amount: 1_500_000,
            num_asset_groups: 0,
            include_datum: false,
            include_ref_script: false,
            collateral: false,
        };

        let mut buff = [0u8; 128];
        let n = encode_decode_apdu(&mut buff, &apdu);

        assert_eq!(buff[0], 0); // format
        assert_eq!(buff[1], 1); // third-party destination tag
        assert_eq!(&buff[2..6], &[0, 0, 0, 57]); // address size
        assert_eq!(n, 1 + 1 + 4 + 57 + 8 + 4 + 1 + 1);
        assert_eq!(&buff[n - 2..n], &[0x01, 0x01]); // datum / script flags
        assert_eq!(apdu.p1(), 0x03);
        assert_eq!(apdu.p2(), 0x30);
    }

    #[test]
    fn collateral_flag_changes_p1_only() {
        let mut apdu = OutputConfirm::default();
        assert_eq!(apdu.p1(), 0x03);

        apdu.collateral = true;
        assert_eq!(apdu.p1(), 0x12);
        assert_eq!(apdu.p2(), 0x33);
        assert_eq!(apdu.encode_len().unwrap(), 0);
    }

    #[test]
    fn asset_group_and_token() {
        let mut buff = [0u8; 64];

        let group = OutputAssetGroup {
            policy_id: [0x1c; POLICY_ID_LEN],
            num_tokens: 2,
            collateral: false,
        };
        let n = encode_decode_apdu(&mut buff, &group);
        assert_eq!(n, 32);
        assert_eq!(group.p2(), 0x31);

        let token = OutputToken {
            asset_name: heapless::Vec::from_slice(b"TestToken").unwrap(),
            amount: 1234,
            collateral: false,
        };
        let n = encode_decode_apdu(&mut buff, &token);
        assert_eq!(&buff[..4], &[0, 0, 0, 9]);
        assert_eq!(&buff[4..13], b"TestToken");
        assert_eq!(n, 4 + 9 + 8);
    }

    #[test]
    fn datum_encodings() {
        let mut buff = [0u8; 255];

        let datum = OutputDatum::Hash([0x3f; 32]);
        let n = encode_decode_apdu(&mut buff, &datum);
        assert_eq!(buff[0], 0);
        assert_eq!(n, 33);

        let body = [0xd8u8; 100];
        let datum = OutputDatum::Inline {
            total: 300,
            chunk: &body,
        };
        let n = encode_decode_apdu(&mut buff, &datum);
        assert_eq!(buff[0], 1);
        assert_eq!(&buff[1..5], &[0, 0, 1, 0x2c]); // total
        assert_eq!(&buff[5..9], &[0, 0, 0, 100]); // chunk size
        assert_eq!(n, 1 + 4 + 4 + 100);

        let chunk = OutputDatumChunk { chunk: &body[..60] };
        let n = encode_decode_apdu(&mut buff, &chunk);
        assert_eq!(&buff[..4], &[0, 0, 0, 60]);
        assert_eq!(n, 64);
    }

    #[test]
    fn ref_script_encodings() {
        let mut buff = [0u8; 255];
        let body = [0x59u8; 80];

        let apdu = OutputRefScript {
            total: 80,
            chunk: &body,
        };
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(&buff[..4], &[0, 0, 0, 80]);
        assert_eq!(&buff[4..8], &[0, 0, 0, 80]);
        assert_eq!(n, 88);
        assert_eq!(apdu.p2(), 0x36);

        let apdu = OutputRefScriptChunk { chunk: &body[..10] };
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, 14);
        assert_eq!(apdu.p2(), 0x37);
    }
}
