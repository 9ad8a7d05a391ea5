// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Application version and device serial number APDUs
//!
//! Both requests carry no payload. The version response is four bytes,
//! the serial response is the seven byte device serial.

use bitflags::bitflags;
use encdec::{Decode, DecodeOwned, Encode};

use crate::{helpers::*, ApduError, ApduStatic, Instruction};

/// Length of the device serial number
pub const SERIAL_LEN: usize = 7;

/// Version request APDU
#[derive(Copy, Clone, Debug, PartialEq, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct VersionReq {}

impl ApduStatic for VersionReq {
    const INS: u8 = Instruction::GetVersion as u8;
}

bitflags! {
    /// Application feature flags reported with the version
    pub struct VersionFlags: u8 {
        /// Development build
        const DEVEL = 1 << 0;

        /// Reduced feature (XS) build
        const APP_XS = 1 << 2;
    }
}

/// Version response APDU
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     MAJOR     |     MINOR     |     PATCH     |     FLAGS     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VersionResp {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub flags: VersionFlags,
}

impl VersionResp {
    pub fn is_devel(&self) -> bool {
        self.flags.contains(VersionFlags::DEVEL)
    }
}

impl core::fmt::Display for VersionResp {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Encode for VersionResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.major;
        buff[1] = self.minor;
        buff[2] = self.patch;
        buff[3] = self.flags.bits();

        Ok(4)
    }
}

impl DecodeOwned for VersionResp {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        Ok((
            Self {
                major: buff[0],
                minor: buff[1],
                patch: buff[2],
                // Unknown flag bits from newer firmware are dropped
                flags: VersionFlags::from_bits_truncate(buff[3]),
            },
            4,
        ))
    }
}

/// Serial number request APDU
#[derive(Copy, Clone, Debug, PartialEq, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct SerialReq {}

impl ApduStatic for SerialReq {
    const INS: u8 = Instruction::GetSerial as u8;
}

/// Serial number response APDU
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct SerialResp {
    /// Device serial number
    #[encdec(with = "arr")]
    pub serial: [u8; SERIAL_LEN],
}

#[cfg(test)]
mod test {
    use std::string::ToString;

    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn version_apdus() {
        let mut buff = [0u8; 16];

        let req = VersionReq::default();
        encode_decode_apdu(&mut buff, &req);

        let resp = VersionResp {
            major: 6,
            minor: 1,
            patch: 2,
            flags: VersionFlags::DEVEL,
        };
        let n = resp.encode(&mut buff).unwrap();
        assert_eq!(&buff[..n], &[6, 1, 2, 1]);

        let (decoded, _) = VersionResp::decode_owned(&buff[..n]).unwrap();
        assert_eq!(decoded, resp);
        assert!(decoded.is_devel());
        assert_eq!(decoded.to_string(), "6.1.2");
    }

    #[test]
    fn serial_apdus() {
        let mut buff = [0u8; 16];

        let req = SerialReq::default();
        encode_decode_apdu(&mut buff, &req);

        let resp = SerialResp {
            serial: [0x32, 0x33, 0x30, 0x30, 0x31, 0x37, 0x34],
        };
        encode_decode_apdu(&mut buff, &resp);
    }
}
