// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Address derivation APDUs
//!
//! [`DeriveAddressReq`] returns the derived address bytes to the host,
//! [`ShowAddressReq`] displays the address on the device for verification
//! and returns an empty payload. Both carry [`AddressParams`] and differ
//! only in the parameter byte.

use encdec::{DecodeOwned, Encode};

use crate::{
    addr::{AddressParams, MAX_ADDRESS_LEN},
    ApduError, ApduStatic, Instruction,
};

/// P1 requesting the address bytes in the response
const P1_RETURN: u8 = 0x01;

/// P1 requesting on-device display
const P1_DISPLAY: u8 = 0x02;

/// Derive an address and return it to the host
#[derive(Clone, Debug, PartialEq)]
pub struct DeriveAddressReq {
    pub params: AddressParams,
}

impl ApduStatic for DeriveAddressReq {
    const INS: u8 = Instruction::DeriveAddress as u8;

    fn p1(&self) -> u8 {
        P1_RETURN
    }
}

impl Encode for DeriveAddressReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        self.params.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        self.params.encode(buff)
    }
}

impl DecodeOwned for DeriveAddressReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let (params, n) = AddressParams::decode_owned(buff)?;
        Ok((Self { params }, n))
    }
}

/// Derive an address and show it on the device
#[derive(Clone, Debug, PartialEq)]
pub struct ShowAddressReq {
    pub params: AddressParams,
}

impl ApduStatic for ShowAddressReq {
    const INS: u8 = Instruction::DeriveAddress as u8;

    fn p1(&self) -> u8 {
        P1_DISPLAY
    }
}

impl Encode for ShowAddressReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        self.params.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        self.params.encode(buff)
    }
}

impl DecodeOwned for ShowAddressReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let (params, n) = AddressParams::decode_owned(buff)?;
        Ok((Self { params }, n))
    }
}

/// Derived address response APDU, the raw address bytes
#[derive(Clone, Debug, PartialEq)]
pub struct DeriveAddressResp {
    pub address: heapless::Vec<u8, MAX_ADDRESS_LEN>,
}

impl Encode for DeriveAddressResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(self.address.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.address.len() {
            return Err(ApduError::InvalidLength);
        }

        buff[..self.address.len()].copy_from_slice(&self.address);

        Ok(self.address.len())
    }
}

impl DecodeOwned for DeriveAddressResp {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        // The whole payload is the address
        let address =
            heapless::Vec::from_slice(buff).map_err(|_| ApduError::InvalidLength)?;

        Ok((Self { address }, buff.len()))
    }
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;
    use crate::addr::{AddressType, NetworkInfo, SpendingRef, StakingRef};
    use crate::path::DerivationPath;
    use crate::test::encode_decode_apdu;

    fn params() -> AddressParams {
        AddressParams {
            address_type: AddressType::BasePaymentKeyStakeKey,
            network: NetworkInfo::MAINNET,
            spending: SpendingRef::Path(
                DerivationPath::from_str("m/1852'/1815'/0'/0/0").unwrap(),
            ),
            staking: StakingRef::Path(DerivationPath::from_str("m/1852'/1815'/0'/2/0").unwrap()),
        }
    }

    #[test]
    fn derive_address_apdus() {
        let mut buff = [0u8; 128];

        let req = DeriveAddressReq { params: params() };
        encode_decode_apdu(&mut buff, &req);
        assert_eq!(req.p1(), 0x01);

        let req = ShowAddressReq { params: params() };
        encode_decode_apdu(&mut buff, &req);
        assert_eq!(req.p1(), 0x02);
    }

    #[test]
    fn derive_address_resp_apdu() {
        let resp = DeriveAddressResp {
            address: heapless::Vec::from_slice(&[0x01, 0x23, 0x45, 0x67]).unwrap(),
        };

        let mut buff = [0u8; 128];
        encode_decode_apdu(&mut buff, &resp);
    }
}
