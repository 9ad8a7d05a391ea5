// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Pool registration certificate sub-protocol
//!
//! A pool registration certificate is too large for one frame, so the
//! certificate stage sends only the type byte ([`CertPoolRegistration`])
//! and the body follows as a P2-selected sequence:
//!
//! `INIT -> POOL_KEY -> VRF_KEY -> FINANCIALS -> REWARD_ACCOUNT ->
//! OWNERS* -> RELAYS* -> METADATA -> CONFIRM`

use encdec::{Decode, DecodeOwned, Encode};

use super::{cert::CERT_STAKE_POOL_REGISTRATION, P1_CERTIFICATES};
use crate::{
    addr::KEY_HASH_LEN, helpers::*, path::DerivationPath, ApduError, ApduStatic, Instruction,
};

/// Length of a VRF key hash
pub const VRF_KEY_LEN: usize = 32;

/// Length of a raw reward account address
pub const REWARD_ACCOUNT_LEN: usize = 29;

/// Maximum length of a relay DNS name
pub const DNS_NAME_MAX_LEN: usize = 64;

/// Maximum length of a pool metadata URL
pub const POOL_METADATA_URL_MAX_LEN: usize = 128;

// Sub-protocol step selectors carried in P2
pub(crate) const P2_POOL_INIT: u8 = 0x30;
pub(crate) const P2_POOL_KEY: u8 = 0x31;
pub(crate) const P2_POOL_VRF_KEY: u8 = 0x32;
pub(crate) const P2_POOL_FINANCIALS: u8 = 0x33;
pub(crate) const P2_POOL_REWARD_ACCOUNT: u8 = 0x34;
pub(crate) const P2_POOL_OWNERS: u8 = 0x35;
pub(crate) const P2_POOL_RELAYS: u8 = 0x36;
pub(crate) const P2_POOL_METADATA: u8 = 0x37;
pub(crate) const P2_POOL_CONFIRM: u8 = 0x38;

// Key / account reference tags
const REF_PATH: u8 = 1;
const REF_HASH: u8 = 2;

// Relay kind tags
const RELAY_SINGLE_HOST_IP: u8 = 0;
const RELAY_SINGLE_HOST_NAME: u8 = 1;
const RELAY_MULTI_HOST_NAME: u8 = 2;

/// Pool cold key reference, also used for owners
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PoolKeyRef {
    /// Device-owned key path
    Path(DerivationPath),

    /// Third-party key hash
    Hash(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; KEY_HASH_LEN]),
}

impl PoolKeyRef {
    /// Path for witness collection, `None` for hash references
    pub fn path(&self) -> Option<&DerivationPath> {
        match self {
            PoolKeyRef::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl Encode for PoolKeyRef {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            PoolKeyRef::Path(p) => p.wire_len(),
            PoolKeyRef::Hash(_) => KEY_HASH_LEN,
        };
        Ok(1 + len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match self {
            PoolKeyRef::Path(p) => {
                buff[0] = REF_PATH;
                index += p.encode(&mut buff[index..])?;
            }
            PoolKeyRef::Hash(h) => {
                buff[0] = REF_HASH;
                index += arr::enc(h, &mut buff[index..])?;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for PoolKeyRef {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        match buff[0] {
            REF_PATH => {
                let (p, n) = DerivationPath::decode_owned(&buff[1..])?;
                Ok((PoolKeyRef::Path(p), 1 + n))
            }
            REF_HASH => {
                let (h, n) = arr::dec(&buff[1..])?;
                Ok((PoolKeyRef::Hash(h), 1 + n))
            }
            _ => Err(ApduError::InvalidEncoding),
        }
    }
}

/// Pool reward account reference
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RewardAccountRef {
    /// Device-owned staking key path
    Path(DerivationPath),

    /// Raw third-party reward account address
    Account(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; REWARD_ACCOUNT_LEN]),
}

impl Encode for RewardAccountRef {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            RewardAccountRef::Path(p) => p.wire_len(),
            RewardAccountRef::Account(_) => REWARD_ACCOUNT_LEN,
        };
        Ok(1 + len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match self {
            RewardAccountRef::Path(p) => {
                buff[0] = REF_PATH;
                index += p.encode(&mut buff[index..])?;
            }
            RewardAccountRef::Account(a) => {
                buff[0] = REF_HASH;
                index += arr::enc(a, &mut buff[index..])?;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for RewardAccountRef {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        match buff[0] {
            REF_PATH => {
                let (p, n) = DerivationPath::decode_owned(&buff[1..])?;
                Ok((RewardAccountRef::Path(p), 1 + n))
            }
            REF_HASH => {
                let (a, n) = arr::dec(&buff[1..])?;
                Ok((RewardAccountRef::Account(a), 1 + n))
            }
            _ => Err(ApduError::InvalidEncoding),
        }
    }
}

/// Pool relay description
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Relay {
    /// Relay addressed by IP, any combination of v4 / v6
    SingleHostIp {
        port: Option<u16>,
        ipv4: Option<[u8; 4]>,
        ipv6: Option<[u8; 16]>,
    },

    /// Relay addressed by an A / AAAA DNS name
    SingleHostName {
        port: Option<u16>,
        dns_name: heapless::String<DNS_NAME_MAX_LEN>,
    },

    /// Relay addressed by an SRV DNS name
    MultiHostName {
        dns_name: heapless::String<DNS_NAME_MAX_LEN>,
    },
}

/// encdec-style helper for the optional relay port
mod port_opt {
    use crate::{helpers::*, ApduError};

    pub fn enc(v: &Option<u16>, buff: &mut [u8]) -> Result<usize, ApduError> {
        let mut index = flag::enc(&v.is_some(), buff)?;
        if let Some(p) = v {
            index += u16be::enc(p, &mut buff[index..])?;
        }
        Ok(index)
    }

    pub fn enc_len(v: &Option<u16>) -> Result<usize, ApduError> {
        Ok(match v {
            Some(_) => 3,
            None => 1,
        })
    }

    pub fn dec(buff: &[u8]) -> Result<(Option<u16>, usize), ApduError> {
        let (included, mut index) = flag::dec(buff)?;
        if !included {
            return Ok((None, index));
        }
        let (p, n) = u16be::dec(&buff[index..])?;
        index += n;
        Ok((Some(p), index))
    }
}

fn dns_name_enc(
    name: &heapless::String<DNS_NAME_MAX_LEN>,
    buff: &mut [u8],
) -> Result<usize, ApduError> {
    let b = name.as_bytes();
    if buff.len() < b.len() {
        return Err(ApduError::InvalidLength);
    }
    buff[..b.len()].copy_from_slice(b);
    Ok(b.len())
}

fn dns_name_dec(buff: &[u8]) -> Result<heapless::String<DNS_NAME_MAX_LEN>, ApduError> {
    let s = core::str::from_utf8(buff).map_err(|_| ApduError::Utf8)?;
    heapless::String::try_from(s).map_err(|_| ApduError::InvalidLength)
}

impl Encode for Relay {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            Relay::SingleHostIp { port, ipv4, ipv6 } => {
                port_opt::enc_len(port)?
                    + 1
                    + ipv4.map(|a| a.len()).unwrap_or(0)
                    + 1
                    + ipv6.map(|a| a.len()).unwrap_or(0)
            }
            Relay::SingleHostName { port, dns_name } => {
                port_opt::enc_len(port)? + dns_name.len()
            }
            Relay::MultiHostName { dns_name } => dns_name.len(),
        };
        Ok(1 + len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match self {
            Relay::SingleHostIp { port, ipv4, ipv6 } => {
                buff[0] = RELAY_SINGLE_HOST_IP;
                index += port_opt::enc(port, &mut buff[index..])?;

                index += flag::enc(&ipv4.is_some(), &mut buff[index..])?;
                if let Some(a) = ipv4 {
                    index += arr::enc(a, &mut buff[index..])?;
                }

                index += flag::enc(&ipv6.is_some(), &mut buff[index..])?;
                if let Some(a) = ipv6 {
                    index += arr::enc(a, &mut buff[index..])?;
                }
            }
            Relay::SingleHostName { port, dns_name } => {
                buff[0] = RELAY_SINGLE_HOST_NAME;
                index += port_opt::enc(port, &mut buff[index..])?;
                index += dns_name_enc(dns_name, &mut buff[index..])?;
            }
            Relay::MultiHostName { dns_name } => {
                buff[0] = RELAY_MULTI_HOST_NAME;
                index += dns_name_enc(dns_name, &mut buff[index..])?;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for Relay {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        let relay = match buff[0] {
            RELAY_SINGLE_HOST_IP => {
                let (port, n) = port_opt::dec(&buff[index..])?;
                index += n;

                let (has_v4, n) = flag::dec(&buff[index..])?;
                index += n;
                let ipv4 = match has_v4 {
                    true => {
                        let (a, n) = arr::dec(&buff[index..])?;
                        index += n;
                        Some(a)
                    }
                    false => None,
                };

                let (has_v6, n) = flag::dec(&buff[index..])?;
                index += n;
                let ipv6 = match has_v6 {
                    true => {
                        let (a, n) = arr::dec(&buff[index..])?;
                        index += n;
                        Some(a)
                    }
                    false => None,
                };

                Relay::SingleHostIp { port, ipv4, ipv6 }
            }
            RELAY_SINGLE_HOST_NAME => {
                let (port, n) = port_opt::dec(&buff[index..])?;
                index += n;
                // DNS name runs to the end of the payload
                let dns_name = dns_name_dec(&buff[index..])?;
                index = buff.len();
                Relay::SingleHostName { port, dns_name }
            }
            RELAY_MULTI_HOST_NAME => {
                let dns_name = dns_name_dec(&buff[index..])?;
                index = buff.len();
                Relay::MultiHostName { dns_name }
            }
            _ => return Err(ApduError::InvalidEncoding),
        };

        Ok((relay, index))
    }
}

/// Off-chain pool metadata reference
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolMetadata {
    /// Blake2b-256 hash of the metadata document
    #[cfg_attr(feature = "serde", serde(with = "hex_array"))]
    pub hash: [u8; 32],

    /// Metadata URL, printable ASCII without spaces
    pub url: heapless::String<POOL_METADATA_URL_MAX_LEN>,
}

impl PoolMetadata {
    pub fn new(hash: [u8; 32], url: &str) -> Result<Self, ApduError> {
        if !url.bytes().all(|b| (0x21..=0x7e).contains(&b)) {
            return Err(ApduError::InvalidEncoding);
        }

        let url = heapless::String::try_from(url).map_err(|_| ApduError::InvalidLength)?;

        Ok(Self { hash, url })
    }
}

/// Certificate stage APDU opening a pool registration
///
/// Carries the bare certificate type byte; the body follows via the
/// sub-protocol APDUs below.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct CertPoolRegistration {}

impl Encode for CertPoolRegistration {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }
        buff[0] = CERT_STAKE_POOL_REGISTRATION;
        Ok(1)
    }
}

impl DecodeOwned for CertPoolRegistration {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() || buff[0] != CERT_STAKE_POOL_REGISTRATION {
            return Err(ApduError::InvalidEncoding);
        }
        Ok((Self {}, 1))
    }
}

impl ApduStatic for CertPoolRegistration {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_CERTIFICATES
    }
}

/// Pool INIT APDU, declares owner and relay counts
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct PoolInit {
    #[encdec(with = "u32be")]
    pub num_owners: u32,
    #[encdec(with = "u32be")]
    pub num_relays: u32,
}

impl ApduStatic for PoolInit {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_CERTIFICATES
    }

    fn p2(&self) -> u8 {
        P2_POOL_INIT
    }
}

/// Pool cold key APDU
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct PoolKey {
    pub key: PoolKeyRef,
}

impl ApduStatic for PoolKey {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_CERTIFICATES
    }

    fn p2(&self) -> u8 {
        P2_POOL_KEY
    }
}

/// Pool VRF key APDU
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct PoolVrfKey {
    #[encdec(with = "arr")]
    pub vrf_key_hash: [u8; VRF_KEY_LEN],
}

impl ApduStatic for PoolVrfKey {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_CERTIFICATES
    }

    fn p2(&self) -> u8 {
        P2_POOL_VRF_KEY
    }
}

/// Pool financials APDU, margin is a rational
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct PoolFinancials {
    #[encdec(with = "u64be")]
    pub pledge: u64,
    #[encdec(with = "u64be")]
    pub cost: u64,
    #[encdec(with = "u64be")]
    pub margin_numerator: u64,
    #[encdec(with = "u64be")]
    pub margin_denominator: u64,
}

impl ApduStatic for PoolFinancials {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_CERTIFICATES
    }

    fn p2(&self) -> u8 {
        P2_POOL_FINANCIALS
    }
}

/// Pool reward account APDU
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct PoolRewardAccount {
    pub account: RewardAccountRef,
}

impl ApduStatic for PoolRewardAccount {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_CERTIFICATES
    }

    fn p2(&self) -> u8 {
        P2_POOL_REWARD_ACCOUNT
    }
}

/// Pool owner APDU, one per owner
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct PoolOwner {
    pub owner: PoolKeyRef,
}

impl ApduStatic for PoolOwner {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_CERTIFICATES
    }

    fn p2(&self) -> u8 {
        P2_POOL_OWNERS
    }
}

/// Pool relay APDU, one per relay
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct PoolRelay {
    pub relay: Relay,
}

impl ApduStatic for PoolRelay {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_CERTIFICATES
    }

    fn p2(&self) -> u8 {
        P2_POOL_RELAYS
    }
}

/// Pool metadata APDU, flag byte then hash + URL when present
#[derive(Clone, Debug, PartialEq)]
pub struct TxPoolMetadata {
    pub metadata: Option<PoolMetadata>,
}

impl Encode for TxPoolMetadata {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match &self.metadata {
            None => 1,
            Some(m) => 1 + m.hash.len() + m.url.len(),
        };
        Ok(len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let m = match &self.metadata {
            None => {
                flag::enc(&false, buff)?;
                return Ok(1);
            }
            Some(m) => m,
        };

        let mut index = flag::enc(&true, buff)?;
        index += arr::enc(&m.hash, &mut buff[index..])?;

        let url = m.url.as_bytes();
        buff[index..][..url.len()].copy_from_slice(url);
        index += url.len();

        Ok(index)
    }
}

impl DecodeOwned for TxPoolMetadata {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let (included, mut index) = flag::dec(buff)?;
        if !included {
            return Ok((Self { metadata: None }, index));
        }

        let (hash, n) = arr::dec(&buff[index..])?;
        index += n;

        let url = core::str::from_utf8(&buff[index..]).map_err(|_| ApduError::Utf8)?;
        let metadata = PoolMetadata::new(hash, url)?;

        Ok((
            Self {
                metadata: Some(metadata),
            },
            buff.len(),
        ))
    }
}

impl ApduStatic for TxPoolMetadata {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_CERTIFICATES
    }

    fn p2(&self) -> u8 {
        P2_POOL_METADATA
    }
}

/// Pool CONFIRM APDU, closes the registration
#[derive(Copy, Clone, Debug, PartialEq, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct PoolConfirm {}

impl ApduStatic for PoolConfirm {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_CERTIFICATES
    }

    fn p2(&self) -> u8 {
        P2_POOL_CONFIRM
    }
}
