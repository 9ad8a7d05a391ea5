// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Extended public key export APDUs
//!
//! A batch export starts with [`PubKeyInitReq`] carrying the first path and
//! the number of keys still to come, followed by one [`PubKeyNextReq`] per
//! remaining path. Each request is answered with an [`ExtPubKeyResp`].

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};

use crate::{helpers::*, path::DerivationPath, ApduError, ApduStatic, Instruction};

/// Length of an ed25519 public key
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of a BIP32 chain code
pub const CHAIN_CODE_LEN: usize = 32;

/// P1 for the first request of a batch
const P1_INIT: u8 = 0x00;

/// P1 for each following request
const P1_NEXT: u8 = 0x01;

/// Initial public key request APDU
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                       DERIVATION PATH...                      /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         REMAINING KEYS (4B, only when more than one)          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PubKeyInitReq {
    /// Path of the first key to export
    pub path: DerivationPath,

    /// Number of keys following this one
    pub remaining: u32,
}

impl ApduStatic for PubKeyInitReq {
    const INS: u8 = Instruction::GetPublicKeys as u8;

    fn p1(&self) -> u8 {
        P1_INIT
    }
}

impl Encode for PubKeyInitReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let mut len = self.path.wire_len();
        if self.remaining > 0 {
            len += 4;
        }
        Ok(len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = self.path.encode(buff)?;

        // Single-key requests omit the count entirely
        if self.remaining > 0 {
            BigEndian::write_u32(&mut buff[index..], self.remaining);
            index += 4;
        }

        Ok(index)
    }
}

impl DecodeOwned for PubKeyInitReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let (path, mut index) = DerivationPath::decode_owned(buff)?;

        let remaining = match buff.len() - index {
            0 => 0,
            _ => {
                if buff.len() < index + 4 {
                    return Err(ApduError::InvalidLength);
                }
                let r = BigEndian::read_u32(&buff[index..]);
                index += 4;
                r
            }
        };

        Ok((Self { path, remaining }, index))
    }
}

/// Subsequent public key request APDU, one per remaining path
#[derive(Clone, Debug, PartialEq)]
pub struct PubKeyNextReq {
    /// Path of the key to export
    pub path: DerivationPath,
}

impl ApduStatic for PubKeyNextReq {
    const INS: u8 = Instruction::GetPublicKeys as u8;

    fn p1(&self) -> u8 {
        P1_NEXT
    }
}

impl Encode for PubKeyNextReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(self.path.wire_len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        self.path.encode(buff)
    }
}

impl DecodeOwned for PubKeyNextReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let (path, n) = DerivationPath::decode_owned(buff)?;
        Ok((Self { path }, n))
    }
}

/// Extended public key response APDU
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        PUBLIC KEY (32B)                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        CHAIN CODE (32B)                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct ExtPubKeyResp {
    /// Public key bytes
    #[encdec(with = "arr")]
    pub public_key: [u8; PUBLIC_KEY_LEN],

    /// Chain code bytes
    #[encdec(with = "arr")]
    pub chain_code: [u8; CHAIN_CODE_LEN],
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn pub_key_init_apdu() {
        let path = DerivationPath::from_str("m/1852'/1815'/0'").unwrap();

        // Batched request carries the remaining count
        let req = PubKeyInitReq {
            path: path.clone(),
            remaining: 2,
        };

        let mut buff = [0u8; 64];
        let n = encode_decode_apdu(&mut buff, &req);
        assert_eq!(
            &buff[..n],
            &[
                0x03, 0x80, 0x00, 0x07, 0x3c, 0x80, 0x00, 0x07, 0x17, 0x80, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x00, 0x02,
            ]
        );

        // Single requests omit it
        let req = PubKeyInitReq { path, remaining: 0 };
        let n = encode_decode_apdu(&mut buff, &req);
        assert_eq!(n, 13);
    }

    #[test]
    fn pub_key_next_apdu() {
        let req = PubKeyNextReq {
            path: DerivationPath::from_str("m/1852'/1815'/1'").unwrap(),
        };

        let mut buff = [0u8; 64];
        encode_decode_apdu(&mut buff, &req);
    }

    #[test]
    fn ext_pub_key_resp_apdu() {
        let resp = ExtPubKeyResp {
            public_key: [0xaa; PUBLIC_KEY_LEN],
            chain_code: [0xbb; CHAIN_CODE_LEN],
        };

        let mut buff = [0u8; 128];
        encode_decode_apdu(&mut buff, &resp);
    }
}
