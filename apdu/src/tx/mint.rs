// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Mint stage sub-protocol
//!
//! Mirrors the output asset-group walk under the mint P1, with signed
//! token amounts (negative = burn):
//!
//! `TOP_LEVEL -> (ASSET_GROUP -> TOKEN*)* -> CONFIRM`

use encdec::{Decode, DecodeOwned, Encode};

use super::{output::ASSET_NAME_MAX_LEN, output::POLICY_ID_LEN, P1_MINT};
use crate::{helpers::*, ApduError, ApduStatic, Instruction};

// Sub-protocol step selectors carried in P2
pub(crate) const P2_MINT_TOP_LEVEL: u8 = 0x30;
pub(crate) const P2_MINT_ASSET_GROUP: u8 = 0x31;
pub(crate) const P2_MINT_TOKEN: u8 = 0x32;
pub(crate) const P2_MINT_CONFIRM: u8 = 0x33;

/// Mint TOP_LEVEL APDU, declares the asset group count
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct MintTopLevel {
    #[encdec(with = "u32be")]
    pub num_asset_groups: u32,
}

impl ApduStatic for MintTopLevel {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_MINT
    }

    fn p2(&self) -> u8 {
        P2_MINT_TOP_LEVEL
    }
}

/// Mint ASSET_GROUP APDU, one per policy id
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct MintAssetGroup {
    #[encdec(with = "arr")]
    pub policy_id: [u8; POLICY_ID_LEN],

    #[encdec(with = "u32be")]
    pub num_tokens: u32,
}

impl ApduStatic for MintAssetGroup {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_MINT
    }

    fn p2(&self) -> u8 {
        P2_MINT_ASSET_GROUP
    }
}

/// Mint TOKEN APDU, signed two's-complement amount
#[derive(Clone, Debug, PartialEq)]
pub struct MintToken {
    pub asset_name: heapless::Vec<u8, ASSET_NAME_MAX_LEN>,
    pub amount: i64,
}

impl Encode for MintToken {
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

        index += i64be::enc(&self.amount, &mut buff[index..])?;

        Ok(index)
    }
}

impl DecodeOwned for MintToken {
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

        let (amount, n) = i64be::dec(&buff[index..])?;
        index += n;

        Ok((Self { asset_name, amount }, index))
    }
}

impl ApduStatic for MintToken {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_MINT
    }

    fn p2(&self) -> u8 {
        P2_MINT_TOKEN
    }
}

/// Mint CONFIRM APDU, closes the mint stage
#[derive(Copy, Clone, Debug, PartialEq, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct MintConfirm {}

impl ApduStatic for MintConfirm {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_MINT
    }

    fn p2(&self) -> u8 {
        P2_MINT_CONFIRM
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn mint_stage_apdus() {
        let mut buff = [0u8; 64];

        let apdu = MintTopLevel {
            num_asset_groups: 1,
        };
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(&buff[..n], &[0, 0, 0, 1]);
        assert_eq!(apdu.p1(), 0x0b);
        assert_eq!(apdu.p2(), 0x30);

        let apdu = MintAssetGroup {
            policy_id: [0x6e; POLICY_ID_LEN],
            num_tokens: 1,
        };
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, 32);
        assert_eq!(apdu.p2(), 0x31);
    }

    #[test]
    fn burn_amount_is_twos_complement() {
        let apdu = MintToken {
            asset_name: heapless::Vec::from_slice(b"Burn").unwrap(),
            amount: -1000,
        };

        let mut buff = [0u8; 64];
        let n = encode_decode_apdu(&mut buff, &apdu);

        assert_eq!(&buff[..4], &[0, 0, 0, 4]);
        assert_eq!(
            &buff[8..16],
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfc, 0x18]
        );
        assert_eq!(n, 16);
        assert_eq!(apdu.p2(), 0x32);
    }
}
