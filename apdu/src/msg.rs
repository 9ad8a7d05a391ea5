// Copyright (c) 2022-2023 The MobileCoin Foundation

//! CIP-8 message signing APDUs
//!
//! `INIT -> CHUNK* -> CONFIRM`
//!
//! INIT declares the total message length and the signing identity; the
//! message then streams in size-prefixed chunks sized per
//! [`chunk`][crate::chunk] (the first chunk is smaller as the device
//! previews it on screen). An empty message sends no CHUNK at all, and a
//! message signed without pre-hashing must fit the first chunk.

use encdec::{Decode, DecodeOwned, Encode};

use crate::{
    addr::{AddressParams, MAX_ADDRESS_LEN},
    helpers::*,
    path::DerivationPath,
    ApduError, ApduStatic, Instruction,
};

/// Length of an ed25519 message signature
pub const MSG_SIGNATURE_LEN: usize = 64;

/// Length of the signing public key in the response
pub const MSG_KEY_LEN: usize = 32;

// Step selectors carried in P1
pub(crate) const P1_MSG_INIT: u8 = 0x01;
pub(crate) const P1_MSG_CHUNK: u8 = 0x02;
pub(crate) const P1_MSG_CONFIRM: u8 = 0x03;

// Address field kind tags
const MSG_ADDRESS_FIELD_ADDRESS: u8 = 0x01;
const MSG_ADDRESS_FIELD_KEY_HASH: u8 = 0x02;

/// CIP-8 address field bound into the signed envelope
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MsgAddressField {
    /// Device-derived address from explicit parameters
    Address(AddressParams),

    /// Hash of the signing key itself
    KeyHash,
}

/// Message INIT APDU
#[derive(Clone, Debug, PartialEq)]
pub struct MsgInit {
    /// Total message length in bytes
    pub msg_len: u32,

    /// Path to sign with
    pub path: DerivationPath,

    /// Sign the Blake2b-224 hash instead of the raw message
    pub hash_payload: bool,

    /// Display the message as ASCII rather than hex
    pub ascii_display: bool,

    /// Address field for the signed envelope
    pub address: MsgAddressField,
}

impl Encode for MsgInit {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let addr = match &self.address {
            MsgAddressField::Address(p) => p.encode_len()?,
            MsgAddressField::KeyHash => 0,
        };
        Ok(4 + self.path.wire_len() + 1 + 1 + 1 + addr)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = u32be::enc(&self.msg_len, buff)?;
        index += self.path.encode(&mut buff[index..])?;
        index += flag::enc(&self.hash_payload, &mut buff[index..])?;
        index += flag::enc(&self.ascii_display, &mut buff[index..])?;

        match &self.address {
            MsgAddressField::Address(p) => {
                buff[index] = MSG_ADDRESS_FIELD_ADDRESS;
                index += 1;
                index += p.encode(&mut buff[index..])?;
            }
            MsgAddressField::KeyHash => {
                buff[index] = MSG_ADDRESS_FIELD_KEY_HASH;
                index += 1;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for MsgInit {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let (msg_len, mut index) = u32be::dec(buff)?;

        let (path, n) = DerivationPath::decode_owned(&buff[index..])?;
        index += n;
        let (hash_payload, n) = flag::dec(&buff[index..])?;
        index += n;
        let (ascii_display, n) = flag::dec(&buff[index..])?;
        index += n;

        if buff.len() <= index {
            return Err(ApduError::InvalidLength);
        }

        let kind = buff[index];
        index += 1;

        let address = match kind {
            MSG_ADDRESS_FIELD_ADDRESS => {
                let (p, n) = AddressParams::decode_owned(&buff[index..])?;
                index += n;
                MsgAddressField::Address(p)
            }
            MSG_ADDRESS_FIELD_KEY_HASH => MsgAddressField::KeyHash,
            _ => return Err(ApduError::InvalidEncoding),
        };

        Ok((
            Self {
                msg_len,
                path,
                hash_payload,
                ascii_display,
                address,
            },
            index,
        ))
    }
}

impl ApduStatic for MsgInit {
    const INS: u8 = Instruction::SignMsg as u8;

    fn p1(&self) -> u8 {
        P1_MSG_INIT
    }
}

/// Message CHUNK APDU, size-prefixed piece of the message
#[derive(Clone, Debug, PartialEq)]
pub struct MsgChunk<'a> {
    pub chunk: &'a [u8],
}

impl<'a> Encode for MsgChunk<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + self.chunk.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = u32be::enc(&(self.chunk.len() as u32), buff)?;
        buff[index..][..self.chunk.len()].copy_from_slice(self.chunk);
        index += self.chunk.len();

        Ok(index)
    }
}

impl<'a> Decode<'a> for MsgChunk<'a> {
    type Output = Self;

    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        let (size, index) = u32be::dec(buff)?;
        let size = size as usize;

        if buff.len() < index + size {
            return Err(ApduError::InvalidLength);
        }

        Ok((
            Self {
                chunk: &buff[index..][..size],
            },
            index + size,
        ))
    }
}

impl<'a> ApduStatic for MsgChunk<'a> {
    const INS: u8 = Instruction::SignMsg as u8;

    fn p1(&self) -> u8 {
        P1_MSG_CHUNK
    }
}

/// Message CONFIRM APDU, requests the signature
#[derive(Copy, Clone, Debug, PartialEq, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct MsgConfirm {}

impl ApduStatic for MsgConfirm {
    const INS: u8 = Instruction::SignMsg as u8;

    fn p1(&self) -> u8 {
        P1_MSG_CONFIRM
    }
}

/// Message signing response APDU
///
/// Fixed 228-byte wire struct: signature, signing key, then the address
/// field as `[size:4]` + a [`MAX_ADDRESS_LEN`] byte buffer of which the
/// first `size` bytes are meaningful.
#[derive(Clone, Debug, PartialEq)]
pub struct MsgSignResp {
    /// ed25519 signature over the CIP-8 envelope
    pub signature: [u8; MSG_SIGNATURE_LEN],

    /// Public key of the signing path
    pub key: [u8; MSG_KEY_LEN],

    /// Resolved address field bytes
    pub address: heapless::Vec<u8, MAX_ADDRESS_LEN>,
}

impl Encode for MsgSignResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(MSG_SIGNATURE_LEN + MSG_KEY_LEN + 4 + MAX_ADDRESS_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = arr::enc(&self.signature, buff)?;
        index += arr::enc(&self.key, &mut buff[index..])?;
        index += u32be::enc(&(self.address.len() as u32), &mut buff[index..])?;

        buff[index..][..MAX_ADDRESS_LEN].fill(0);
        buff[index..][..self.address.len()].copy_from_slice(&self.address);
        index += MAX_ADDRESS_LEN;

        Ok(index)
    }
}

impl DecodeOwned for MsgSignResp {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let (signature, mut index) = arr::dec(buff)?;
        let (key, n) = arr::dec(&buff[index..])?;
        index += n;
        let (size, n) = u32be::dec(&buff[index..])?;
        index += n;

        let size = size as usize;
        if size > MAX_ADDRESS_LEN || buff.len() < index + MAX_ADDRESS_LEN {
            return Err(ApduError::InvalidLength);
        }

        let address = heapless::Vec::from_slice(&buff[index..][..size])
            .map_err(|_| ApduError::InvalidLength)?;
        index += MAX_ADDRESS_LEN;

        Ok((
            Self {
                signature,
                key,
                address,
            },
            index,
        ))
    }
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;
    use crate::addr::{AddressType, NetworkInfo, SpendingRef, StakingRef};
    use crate::test::encode_decode_apdu;

    #[test]
    fn msg_init_with_key_hash() {
        let path = DerivationPath::from_str("m/1852'/1815'/0'/0/0").unwrap();
        let apdu = MsgInit {
            msg_len: 12,
            path: path.clone(),
            hash_payload: false,
            ascii_display: true,
            address: MsgAddressField::KeyHash,
        };

        let mut buff = [0u8; 64];
        let n = encode_decode_apdu(&mut buff, &apdu);

        assert_eq!(&buff[..4], &[0, 0, 0, 12]);
        let tail = 4 + path.wire_len();
        assert_eq!(&buff[tail..n], &[0x01, 0x02, 0x02]);
        assert_eq!(apdu.p1(), 0x01);
    }

    #[test]
    fn msg_init_with_address() {
        let path = DerivationPath::from_str("m/1852'/1815'/0'/0/0").unwrap();
        let params = AddressParams {
            address_type: AddressType::EnterpriseKey,
            network: NetworkInfo::MAINNET,
            spending: SpendingRef::Path(path.clone()),
            staking: StakingRef::None,
        };

        let apdu = MsgInit {
            msg_len: 0,
            path,
            hash_payload: false,
            ascii_display: false,
            address: MsgAddressField::Address(params),
        };

        let mut buff = [0u8; 128];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert!(n > 4 + 21 + 3);
    }

    #[test]
    fn msg_chunk_size_prefix() {
        let body = b"hello cardano";
        let apdu = MsgChunk { chunk: body };

        let mut buff = [0u8; 64];
        let n = encode_decode_apdu(&mut buff, &apdu);

        assert_eq!(&buff[..4], &[0, 0, 0, 13]);
        assert_eq!(&buff[4..n], body);
        assert_eq!(apdu.p1(), 0x02);
    }

    #[test]
    fn msg_response_is_fixed_size() {
        let resp = MsgSignResp {
            signature: [0x51; MSG_SIGNATURE_LEN],
            key: [0x52; MSG_KEY_LEN],
            address: heapless::Vec::from_slice(&[0xe1; 29]).unwrap(),
        };

        let mut buff = [0u8; 255];
        let n = resp.encode(&mut buff).unwrap();
        assert_eq!(n, 228);

        // Only the declared prefix of the address buffer is meaningful
        let (decoded, m) = MsgSignResp::decode_owned(&buff[..n]).unwrap();
        assert_eq!(decoded, resp);
        assert_eq!(m, n);
        assert_eq!(decoded.address.len(), 29);
    }
}
