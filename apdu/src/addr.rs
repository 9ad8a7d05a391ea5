// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Shelley / Byron address parameters
//!
//! [`AddressParams`] describes a device-derived address: the address type,
//! network, a spending reference and a staking reference. The staking kind
//! byte on the wire is not caller-chosen, it is derived from the address
//! type and the staking reference shape (see [`AddressParams::staking_kind`]);
//! combinations outside that table are rejected before anything is sent.
//!
//! ## Encoding
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  ADDRESS_TYPE | NETWORK_ID or PROTOCOL_MAGIC (4B, Byron only) |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /          SPENDING (path, script hash, or nothing)             /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  STAKING_KIND |         STAKING PAYLOAD (per kind)...         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString};

use crate::{helpers::*, path::DerivationPath, ApduError};

/// Length of key hashes and script hashes
pub const KEY_HASH_LEN: usize = 28;

/// Length of script hashes
pub const SCRIPT_HASH_LEN: usize = 28;

/// Maximum raw address length accepted by the device
pub const MAX_ADDRESS_LEN: usize = 128;

/// Mainnet network id
pub const MAINNET_NETWORK_ID: u8 = 1;

/// Mainnet Byron protocol magic
pub const MAINNET_PROTOCOL_MAGIC: u32 = 764824073;

/// Testnet network id
pub const TESTNET_NETWORK_ID: u8 = 0;

/// Address header types
///
/// Numbering matches the Shelley address header nibble (Byron = 8,
/// reward = 14/15).
#[derive(
    Copy, Clone, Debug, PartialEq, Display, EnumString, EnumIter, TryFromPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum AddressType {
    BasePaymentKeyStakeKey = 0,
    BasePaymentScriptStakeKey = 1,
    BasePaymentKeyStakeScript = 2,
    BasePaymentScriptStakeScript = 3,
    PointerKey = 4,
    PointerScript = 5,
    EnterpriseKey = 6,
    EnterpriseScript = 7,
    Byron = 8,
    RewardKey = 14,
    RewardScript = 15,
}

/// Staking kind byte emitted ahead of the staking payload
#[derive(Copy, Clone, Debug, PartialEq, Display, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum StakingKind {
    None = 0x11,
    KeyPath = 0x22,
    KeyHash = 0x33,
    Pointer = 0x44,
    ScriptHash = 0x55,
}

/// Network descriptor carried by INIT and address requests
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkInfo {
    pub network_id: u8,
    pub protocol_magic: u32,
}

impl NetworkInfo {
    pub const MAINNET: Self = Self {
        network_id: MAINNET_NETWORK_ID,
        protocol_magic: MAINNET_PROTOCOL_MAGIC,
    };
}

/// Full network encoding, `[network_id:1][protocol_magic:4]`
///
/// Address parameters carry only one of the two fields, see
/// [`AddressParams::encode`].
impl Encode for NetworkInfo {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(5)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 5 {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.network_id;
        BigEndian::write_u32(&mut buff[1..], self.protocol_magic);

        Ok(5)
    }
}

impl DecodeOwned for NetworkInfo {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.len() < 5 {
            return Err(ApduError::InvalidLength);
        }

        Ok((
            Self {
                network_id: buff[0],
                protocol_magic: BigEndian::read_u32(&buff[1..]),
            },
            5,
        ))
    }
}

/// Pointer to an on-chain stake registration certificate
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[encdec(error = "ApduError")]
pub struct BlockchainPointer {
    #[encdec(with = "u32be")]
    pub block: u32,

    #[encdec(with = "u32be")]
    pub tx: u32,

    #[encdec(with = "u32be")]
    pub certificate: u32,
}

/// Spending reference for an address
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SpendingRef {
    /// Payment key derivation path (device-owned key addresses, Byron)
    Path(DerivationPath),

    /// Payment script hash (script addresses)
    ScriptHash(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; SCRIPT_HASH_LEN]),

    /// No spending payload (reward addresses carry their credential in
    /// the staking part)
    None,
}

/// Staking reference for an address
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StakingRef {
    /// No staking part
    None,

    /// Staking key derivation path
    Path(DerivationPath),

    /// Staking key hash
    KeyHash(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; KEY_HASH_LEN]),

    /// Staking script hash
    ScriptHash(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; SCRIPT_HASH_LEN]),

    /// Pointer to the on-chain registration certificate
    Pointer(BlockchainPointer),
}

/// Parameters for a device-derived address
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddressParams {
    pub address_type: AddressType,
    pub network: NetworkInfo,
    pub spending: SpendingRef,
    pub staking: StakingRef,
}

impl AddressParams {
    /// Derive the staking kind byte from the address type and the staking
    /// reference shape
    ///
    /// Byron and enterprise addresses have no staking part; script-staking
    /// and pointer types force their kind; the remaining key-staking types
    /// take the kind from the reference itself. Any other combination is a
    /// caller contract violation.
    pub fn staking_kind(&self) -> Result<StakingKind, ApduError> {
        use AddressType::*;

        let kind = match self.address_type {
            Byron | EnterpriseKey | EnterpriseScript => StakingKind::None,
            BasePaymentKeyStakeScript | BasePaymentScriptStakeScript | RewardScript => {
                StakingKind::ScriptHash
            }
            PointerKey | PointerScript => StakingKind::Pointer,
            BasePaymentKeyStakeKey | BasePaymentScriptStakeKey | RewardKey => {
                match &self.staking {
                    StakingRef::Path(_) => StakingKind::KeyPath,
                    StakingRef::KeyHash(_) => StakingKind::KeyHash,
                    _ => return Err(ApduError::InvalidStaking),
                }
            }
        };

        // The payload must carry what the kind byte announces
        let consistent = matches!(
            (kind, &self.staking),
            (StakingKind::None, StakingRef::None)
                | (StakingKind::KeyPath, StakingRef::Path(_))
                | (StakingKind::KeyHash, StakingRef::KeyHash(_))
                | (StakingKind::ScriptHash, StakingRef::ScriptHash(_))
                | (StakingKind::Pointer, StakingRef::Pointer(_))
        );

        match consistent {
            true => Ok(kind),
            false => Err(ApduError::InvalidStaking),
        }
    }
}

impl Encode for AddressParams {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let mut len = 1;

        len += match self.address_type {
            AddressType::Byron => 4,
            _ => 1,
        };

        len += match &self.spending {
            SpendingRef::Path(p) => p.wire_len(),
            SpendingRef::ScriptHash(_) => SCRIPT_HASH_LEN,
            SpendingRef::None => 0,
        };

        len += 1;
        len += match &self.staking {
            StakingRef::None => 0,
            StakingRef::Path(p) => p.wire_len(),
            StakingRef::KeyHash(_) | StakingRef::ScriptHash(_) => KEY_HASH_LEN,
            StakingRef::Pointer(_) => 12,
        };

        Ok(len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        // Resolve the staking kind first so invalid combinations are
        // rejected before any bytes are written
        let kind = self.staking_kind()?;

        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.address_type as u8;
        let mut index = 1;

        match self.address_type {
            AddressType::Byron => {
                BigEndian::write_u32(&mut buff[index..], self.network.protocol_magic);
                index += 4;
            }
            _ => {
                buff[index] = self.network.network_id;
                index += 1;
            }
        }

        match &self.spending {
            SpendingRef::Path(p) => index += p.encode(&mut buff[index..])?,
            SpendingRef::ScriptHash(h) => {
                buff[index..][..h.len()].copy_from_slice(h);
                index += h.len();
            }
            SpendingRef::None => (),
        }

        buff[index] = kind as u8;
        index += 1;

        match &self.staking {
            StakingRef::None => (),
            StakingRef::Path(p) => index += p.encode(&mut buff[index..])?,
            StakingRef::KeyHash(h) | StakingRef::ScriptHash(h) => {
                buff[index..][..h.len()].copy_from_slice(h);
                index += h.len();
            }
            StakingRef::Pointer(p) => index += p.encode(&mut buff[index..])?,
        }

        Ok(index)
    }
}

impl DecodeOwned for AddressParams {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        use AddressType::*;

        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let address_type =
            AddressType::try_from(buff[0]).map_err(|_| ApduError::InvalidEncoding)?;
        let mut index = 1;

        let network = match address_type {
            Byron => {
                if buff.len() < index + 4 {
                    return Err(ApduError::InvalidLength);
                }
                let magic = BigEndian::read_u32(&buff[index..]);
                index += 4;
                NetworkInfo {
                    network_id: MAINNET_NETWORK_ID,
                    protocol_magic: magic,
                }
            }
            _ => {
                if buff.len() < index + 1 {
                    return Err(ApduError::InvalidLength);
                }
                let id = buff[index];
                index += 1;
                NetworkInfo {
                    network_id: id,
                    protocol_magic: MAINNET_PROTOCOL_MAGIC,
                }
            }
        };

        // The address type determines the spending shape
        let spending = match address_type {
            BasePaymentKeyStakeKey | BasePaymentKeyStakeScript | PointerKey | EnterpriseKey
            | Byron => {
                let (p, n) = DerivationPath::decode_owned(&buff[index..])?;
                index += n;
                SpendingRef::Path(p)
            }
            BasePaymentScriptStakeKey | BasePaymentScriptStakeScript | PointerScript
            | EnterpriseScript => {
                let (h, n) = arr::dec::<SCRIPT_HASH_LEN>(&buff[index..])?;
                index += n;
                SpendingRef::ScriptHash(h)
            }
            RewardKey | RewardScript => SpendingRef::None,
        };

        if buff.len() < index + 1 {
            return Err(ApduError::InvalidLength);
        }
        let kind = StakingKind::try_from(buff[index]).map_err(|_| ApduError::InvalidEncoding)?;
        index += 1;

        let staking = match kind {
            StakingKind::None => StakingRef::None,
            StakingKind::KeyPath => {
                let (p, n) = DerivationPath::decode_owned(&buff[index..])?;
                index += n;
                StakingRef::Path(p)
            }
            StakingKind::KeyHash => {
                let (h, n) = arr::dec::<KEY_HASH_LEN>(&buff[index..])?;
                index += n;
                StakingRef::KeyHash(h)
            }
            StakingKind::ScriptHash => {
                let (h, n) = arr::dec::<SCRIPT_HASH_LEN>(&buff[index..])?;
                index += n;
                StakingRef::ScriptHash(h)
            }
            StakingKind::Pointer => {
                let (p, n) = BlockchainPointer::decode_owned(&buff[index..])?;
                index += n;
                StakingRef::Pointer(p)
            }
        };

        Ok((
            Self {
                address_type,
                network,
                spending,
                staking,
            },
            index,
        ))
    }
}

/// Transaction output destination
///
/// Either raw (third-party) address bytes or parameters for an address the
/// device derives and checks itself.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Destination {
    /// Raw address bytes, length-prefixed on the wire
    ThirdParty(
        #[cfg_attr(feature = "serde", serde(with = "hex_vec"))]
        heapless::Vec<u8, MAX_ADDRESS_LEN>,
    ),

    /// Device-derived address parameters
    DeviceOwned(AddressParams),
}

/// Destination type tags
const DESTINATION_THIRD_PARTY: u8 = 1;
const DESTINATION_DEVICE_OWNED: u8 = 2;

impl Destination {
    /// Build a third-party destination from raw address bytes
    pub fn third_party(addr: &[u8]) -> Result<Self, ApduError> {
        let v = heapless::Vec::from_slice(addr).map_err(|_| ApduError::InvalidLength)?;
        Ok(Self::ThirdParty(v))
    }
}

impl Encode for Destination {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            Destination::ThirdParty(a) => 1 + 4 + a.len(),
            Destination::DeviceOwned(p) => 1 + p.encode_len()?,
        };
        Ok(len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match self {
            Destination::ThirdParty(a) => {
                buff[0] = DESTINATION_THIRD_PARTY;
                BigEndian::write_u32(&mut buff[index..], a.len() as u32);
                index += 4;
                buff[index..][..a.len()].copy_from_slice(a);
                index += a.len();
            }
            Destination::DeviceOwned(p) => {
                buff[0] = DESTINATION_DEVICE_OWNED;
                index += p.encode(&mut buff[index..])?;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for Destination {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        match buff[0] {
            DESTINATION_THIRD_PARTY => {
                if buff.len() < 5 {
                    return Err(ApduError::InvalidLength);
                }
                let n = BigEndian::read_u32(&buff[1..]) as usize;
                if buff.len() < 5 + n {
                    return Err(ApduError::InvalidLength);
                }
                let v = heapless::Vec::from_slice(&buff[5..][..n])
                    .map_err(|_| ApduError::InvalidLength)?;
                Ok((Destination::ThirdParty(v), 5 + n))
            }
            DESTINATION_DEVICE_OWNED => {
                let (p, n) = AddressParams::decode_owned(&buff[1..])?;
                Ok((Destination::DeviceOwned(p), 1 + n))
            }
            _ => Err(ApduError::InvalidEncoding),
        }
    }
}
