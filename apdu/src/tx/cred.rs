// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Credential, DRep and anchor primitives shared by certificate,
//! withdrawal and voting stages

use encdec::{Decode, DecodeOwned, Encode};

use crate::{
    addr::{KEY_HASH_LEN, SCRIPT_HASH_LEN},
    helpers::*,
    path::DerivationPath,
    ApduError,
};

/// Length of an anchor document hash
pub const ANCHOR_HASH_LEN: usize = 32;

/// Maximum length of an anchor URL
pub const ANCHOR_URL_MAX_LEN: usize = 128;

// Credential reference tags
const CRED_PATH: u8 = 0;
const CRED_SCRIPT_HASH: u8 = 1;
const CRED_KEY_HASH: u8 = 2;

/// Stake or payment credential reference
///
/// Device-owned credentials are given by path, third-party ones by hash.
/// The encoders never guess the variant from the payload shape.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Credential {
    /// Key derivation path, signable by the device
    Path(DerivationPath),

    /// Script hash
    ScriptHash(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; SCRIPT_HASH_LEN]),

    /// Third-party key hash
    KeyHash(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; KEY_HASH_LEN]),
}

impl Credential {
    /// Path for witness collection, `None` for hash credentials
    pub fn path(&self) -> Option<&DerivationPath> {
        match self {
            Credential::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl Encode for Credential {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            Credential::Path(p) => 1 + p.wire_len(),
            Credential::ScriptHash(_) => 1 + SCRIPT_HASH_LEN,
            Credential::KeyHash(_) => 1 + KEY_HASH_LEN,
        };
        Ok(len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match self {
            Credential::Path(p) => {
                buff[0] = CRED_PATH;
                index += p.encode(&mut buff[index..])?;
            }
            Credential::ScriptHash(h) => {
                buff[0] = CRED_SCRIPT_HASH;
                index += arr::enc(h, &mut buff[index..])?;
            }
            Credential::KeyHash(h) => {
                buff[0] = CRED_KEY_HASH;
                index += arr::enc(h, &mut buff[index..])?;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for Credential {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        match buff[0] {
            CRED_PATH => {
                let (p, n) = DerivationPath::decode_owned(&buff[1..])?;
                Ok((Credential::Path(p), 1 + n))
            }
            CRED_SCRIPT_HASH => {
                let (h, n) = arr::dec(&buff[1..])?;
                Ok((Credential::ScriptHash(h), 1 + n))
            }
            CRED_KEY_HASH => {
                let (h, n) = arr::dec(&buff[1..])?;
                Ok((Credential::KeyHash(h), 1 + n))
            }
            _ => Err(ApduError::InvalidEncoding),
        }
    }
}

// DRep reference tags, path shifted by 100
const DREP_KEY_HASH: u8 = 0;
const DREP_SCRIPT_HASH: u8 = 1;
const DREP_ABSTAIN: u8 = 2;
const DREP_NO_CONFIDENCE: u8 = 3;
const DREP_PATH: u8 = 100;

/// Delegated representative for vote delegation certificates
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DRep {
    /// DRep key hash
    KeyHash(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; KEY_HASH_LEN]),

    /// DRep script hash
    ScriptHash(#[cfg_attr(feature = "serde", serde(with = "hex_array"))] [u8; SCRIPT_HASH_LEN]),

    /// Always-abstain voting option
    Abstain,

    /// No-confidence voting option
    NoConfidence,

    /// Device-owned DRep key path
    Path(DerivationPath),
}

impl DRep {
    /// Path for witness collection, `None` otherwise
    pub fn path(&self) -> Option<&DerivationPath> {
        match self {
            DRep::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl Encode for DRep {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            DRep::KeyHash(_) => 1 + KEY_HASH_LEN,
            DRep::ScriptHash(_) => 1 + SCRIPT_HASH_LEN,
            DRep::Abstain | DRep::NoConfidence => 1,
            DRep::Path(p) => 1 + p.wire_len(),
        };
        Ok(len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        match self {
            DRep::KeyHash(h) => {
                buff[0] = DREP_KEY_HASH;
                index += arr::enc(h, &mut buff[index..])?;
            }
            DRep::ScriptHash(h) => {
                buff[0] = DREP_SCRIPT_HASH;
                index += arr::enc(h, &mut buff[index..])?;
            }
            DRep::Abstain => buff[0] = DREP_ABSTAIN,
            DRep::NoConfidence => buff[0] = DREP_NO_CONFIDENCE,
            DRep::Path(p) => {
                buff[0] = DREP_PATH;
                index += p.encode(&mut buff[index..])?;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for DRep {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        match buff[0] {
            DREP_KEY_HASH => {
                let (h, n) = arr::dec(&buff[1..])?;
                Ok((DRep::KeyHash(h), 1 + n))
            }
            DREP_SCRIPT_HASH => {
                let (h, n) = arr::dec(&buff[1..])?;
                Ok((DRep::ScriptHash(h), 1 + n))
            }
            DREP_ABSTAIN => Ok((DRep::Abstain, 1)),
            DREP_NO_CONFIDENCE => Ok((DRep::NoConfidence, 1)),
            DREP_PATH => {
                let (p, n) = DerivationPath::decode_owned(&buff[1..])?;
                Ok((DRep::Path(p), 1 + n))
            }
            _ => Err(ApduError::InvalidEncoding),
        }
    }
}

/// Anchor linking a governance item to an off-chain document
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Anchor {
    /// Blake2b-256 hash of the document
    #[cfg_attr(feature = "serde", serde(with = "hex_array"))]
    pub hash: [u8; ANCHOR_HASH_LEN],

    /// Document URL, printable ASCII without spaces
    pub url: heapless::String<ANCHOR_URL_MAX_LEN>,
}

impl Anchor {
    pub fn new(hash: [u8; ANCHOR_HASH_LEN], url: &str) -> Result<Self, ApduError> {
        if !url.bytes().all(|b| (0x21..=0x7e).contains(&b)) {
            return Err(ApduError::InvalidEncoding);
        }

        let url = heapless::String::try_from(url).map_err(|_| ApduError::InvalidLength)?;

        Ok(Self { hash, url })
    }
}

/// encdec helper for optional anchors
///
/// A presence flag leads, the contents follow. The URL runs to the end of
/// the payload, so an anchor is always the final field of its APDU.
pub(crate) mod anchor_opt {
    use super::{Anchor, ANCHOR_HASH_LEN};
    use crate::{helpers::*, ApduError};

    pub fn enc(v: &Option<Anchor>, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < enc_len(v)? {
            return Err(ApduError::InvalidLength);
        }

        let anchor = match v {
            None => {
                flag::enc(&false, buff)?;
                return Ok(1);
            }
            Some(a) => a,
        };

        let mut index = flag::enc(&true, buff)?;
        index += arr::enc(&anchor.hash, &mut buff[index..])?;

        let url = anchor.url.as_bytes();
        buff[index..][..url.len()].copy_from_slice(url);
        index += url.len();

        Ok(index)
    }

    pub fn enc_len(v: &Option<Anchor>) -> Result<usize, ApduError> {
        let len = match v {
            None => 1,
            Some(a) => 1 + ANCHOR_HASH_LEN + a.url.len(),
        };
        Ok(len)
    }

    pub fn dec(buff: &[u8]) -> Result<(Option<Anchor>, usize), ApduError> {
        let (included, mut index) = flag::dec(buff)?;
        if !included {
            return Ok((None, index));
        }

        let (hash, n) = arr::dec(&buff[index..])?;
        index += n;

        let url = core::str::from_utf8(&buff[index..]).map_err(|_| ApduError::Utf8)?;
        let anchor = Anchor::new(hash, url)?;

        Ok((Some(anchor), buff.len()))
    }
}
