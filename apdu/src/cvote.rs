// Copyright (c) 2022-2023 The MobileCoin Foundation

//! CIP-36 vote signing APDUs
//!
//! The vote payload (vote-plan id, proposal index, payload type, opaque
//! here) streams in [`MAX_CHUNK_SIZE`][crate::chunk::MAX_CHUNK_SIZE]
//! pieces; unlike the output datum flow the continuations are raw bytes
//! with no inner size prefix:
//!
//! `INIT -> CHUNK* -> CONFIRM -> WITNESS*`

use encdec::{Decode, DecodeOwned, Encode};

use crate::{helpers::*, path::DerivationPath, ApduError, ApduStatic, Instruction};

/// Length of a votecast hash
pub const VOTECAST_HASH_LEN: usize = 32;

/// Length of an ed25519 vote signature
pub const VOTE_SIGNATURE_LEN: usize = 64;

// Step selectors carried in P1
pub(crate) const P1_VOTE_INIT: u8 = 0x01;
pub(crate) const P1_VOTE_CHUNK: u8 = 0x02;
pub(crate) const P1_VOTE_CONFIRM: u8 = 0x03;
pub(crate) const P1_VOTE_WITNESS: u8 = 0x04;

/// Vote INIT APDU, declared total size + first chunk
#[derive(Clone, Debug, PartialEq)]
pub struct CVoteInit<'a> {
    pub total: u32,
    pub chunk: &'a [u8],
}

impl<'a> Encode for CVoteInit<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + self.chunk.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = u32be::enc(&self.total, buff)?;
        buff[index..][..self.chunk.len()].copy_from_slice(self.chunk);
        index += self.chunk.len();

        Ok(index)
    }
}

impl<'a> Decode<'a> for CVoteInit<'a> {
    type Output = Self;

    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        let (total, index) = u32be::dec(buff)?;
        // First chunk runs to the end of the payload
        let chunk = &buff[index..];

        Ok((Self { total, chunk }, buff.len()))
    }
}

impl<'a> ApduStatic for CVoteInit<'a> {
    const INS: u8 = Instruction::SignCVote as u8;

    fn p1(&self) -> u8 {
        P1_VOTE_INIT
    }
}

/// Vote CHUNK APDU, raw continuation bytes
#[derive(Clone, Debug, PartialEq)]
pub struct CVoteChunk<'a> {
    pub chunk: &'a [u8],
}

impl<'a> Encode for CVoteChunk<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(self.chunk.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.chunk.len() {
            return Err(ApduError::InvalidLength);
        }

        buff[..self.chunk.len()].copy_from_slice(self.chunk);

        Ok(self.chunk.len())
    }
}

impl<'a> Decode<'a> for CVoteChunk<'a> {
    type Output = Self;

    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        Ok((Self { chunk: buff }, buff.len()))
    }
}

impl<'a> ApduStatic for CVoteChunk<'a> {
    const INS: u8 = Instruction::SignCVote as u8;

    fn p1(&self) -> u8 {
        P1_VOTE_CHUNK
    }
}

/// Vote CONFIRM APDU, requests the votecast hash
#[derive(Copy, Clone, Debug, PartialEq, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct CVoteConfirm {}

impl ApduStatic for CVoteConfirm {
    const INS: u8 = Instruction::SignCVote as u8;

    fn p1(&self) -> u8 {
        P1_VOTE_CONFIRM
    }
}

/// Votecast hash response APDU
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct CVoteHashResp {
    /// Blake2b-256 hash of the assembled votecast
    #[encdec(with = "arr")]
    pub votecast_hash: [u8; VOTECAST_HASH_LEN],
}

/// Vote WITNESS APDU, one per signing path
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct CVoteWitness {
    /// Path to sign the votecast hash with
    pub path: DerivationPath,
}

impl ApduStatic for CVoteWitness {
    const INS: u8 = Instruction::SignCVote as u8;

    fn p1(&self) -> u8 {
        P1_VOTE_WITNESS
    }
}

/// Vote witness response APDU
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct CVoteWitnessResp {
    /// ed25519 signature over the votecast hash
    #[encdec(with = "arr")]
    pub signature: [u8; VOTE_SIGNATURE_LEN],
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;
    use crate::test::encode_decode_apdu;
    use crate::ApduReq;

    #[test]
    fn vote_init_apdu() {
        let body = [0x8au8; 48];
        let apdu = CVoteInit {
            total: 48,
            chunk: &body,
        };

        let mut buff = [0u8; 255];
        let n = encode_decode_apdu(&mut buff, &apdu);

        assert_eq!(&buff[..4], &[0, 0, 0, 48]);
        assert_eq!(&buff[4..n], &body);

        let h = apdu.header();
        assert_eq!((h.ins, h.p1), (0x23, 0x01));
    }

    #[test]
    fn vote_chunk_is_raw() {
        let body = [0x17u8; 100];
        let apdu = CVoteChunk { chunk: &body };

        let mut buff = [0u8; 255];
        let n = encode_decode_apdu(&mut buff, &apdu);

        // No size prefix, the frame length bounds the chunk
        assert_eq!(&buff[..n], &body);
        assert_eq!(apdu.p1(), 0x02);
    }

    #[test]
    fn vote_confirm_and_witness() {
        let mut buff = [0u8; 128];

        let apdu = CVoteConfirm::default();
        assert_eq!(apdu.encode_len().unwrap(), 0);
        assert_eq!(apdu.p1(), 0x03);

        let apdu = CVoteWitness {
            path: DerivationPath::from_str("m/1694'/1815'/0'/0/0").unwrap(),
        };
        encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(apdu.p1(), 0x04);

        encode_decode_apdu(
            &mut buff,
            &CVoteHashResp {
                votecast_hash: [0x3c; VOTECAST_HASH_LEN],
            },
        );
        encode_decode_apdu(
            &mut buff,
            &CVoteWitnessResp {
                signature: [0x4d; VOTE_SIGNATURE_LEN],
            },
        );
    }
}
