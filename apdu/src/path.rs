// Copyright (c) 2022-2023 The MobileCoin Foundation

//! BIP32 derivation paths
//!
//! Paths are parsed once from the `m/44'/1815'/0'/0/0` syntax at the model
//! boundary and handled as typed index lists from then on. The wire encoding
//! is a count byte followed by one big-endian `u32` per index, hardened
//! indices carrying bit 31.
//!
//! ## Encoding
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     COUNT     |                  INDEX 0...                   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                        INDEX 1..COUNT                         /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use core::fmt;
use core::str::FromStr;

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};
use heapless::Vec;

use crate::ApduError;

/// Hardened derivation marker, set on the raw index
pub const HARDENED: u32 = 1 << 31;

/// Maximum number of path components accepted by the device
pub const MAX_PATH_LEN: usize = 10;

/// Coin type for ADA (`1815'` pre-hardening)
pub const ADA_COIN_TYPE: u32 = 1815;

/// Mark an index as hardened
pub const fn harden(index: u32) -> u32 {
    index | HARDENED
}

/// BIP32 derivation path, at most [`MAX_PATH_LEN`] raw indices
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DerivationPath {
    indices: Vec<u32, MAX_PATH_LEN>,
}

impl DerivationPath {
    /// Create a path from raw indices (hardened bits already applied)
    pub fn new(indices: &[u32]) -> Result<Self, ApduError> {
        let indices = Vec::from_slice(indices).map_err(|_| ApduError::InvalidPath)?;
        Ok(Self { indices })
    }

    /// Fetch raw indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of path components
    pub fn depth(&self) -> usize {
        self.indices.len()
    }

    /// Encoded wire length in bytes
    pub fn wire_len(&self) -> usize {
        1 + 4 * self.indices.len()
    }
}

impl Encode for DerivationPath {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(self.wire_len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.wire_len() {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.indices.len() as u8;

        let mut index = 1;
        for i in &self.indices {
            BigEndian::write_u32(&mut buff[index..], *i);
            index += 4;
        }

        Ok(index)
    }
}

impl DecodeOwned for DerivationPath {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let count = buff[0] as usize;
        if count > MAX_PATH_LEN {
            return Err(ApduError::InvalidPath);
        }
        if buff.len() < 1 + 4 * count {
            return Err(ApduError::InvalidLength);
        }

        let mut indices = Vec::new();
        let mut index = 1;
        for _ in 0..count {
            // count checked against capacity above
            let _ = indices.push(BigEndian::read_u32(&buff[index..]));
            index += 4;
        }

        Ok((Self { indices }, index))
    }
}

/// Parse the `m/44'/1815'/0'/0/0` syntax, trailing `'` marking hardened
impl FromStr for DerivationPath {
    type Err = ApduError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');

        if parts.next() != Some("m") {
            return Err(ApduError::InvalidPath);
        }

        let mut indices = Vec::new();
        for p in parts {
            let (digits, hardened) = match p.strip_suffix('\'') {
                Some(d) => (d, true),
                None => (p, false),
            };

            let v: u32 = digits.parse().map_err(|_| ApduError::InvalidPath)?;
            if v >= HARDENED {
                return Err(ApduError::InvalidPath);
            }

            let v = match hardened {
                true => harden(v),
                false => v,
            };

            indices.push(v).map_err(|_| ApduError::InvalidPath)?;
        }

        Ok(Self { indices })
    }
}

/// Display paths in the parseable `m/…` syntax
impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for i in &self.indices {
            match i & HARDENED {
                0 => write!(f, "/{}", i)?,
                _ => write!(f, "/{}'", i & !HARDENED)?,
            }
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for DerivationPath {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for DerivationPath {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct PathVisitor;

        impl<'de> serde::de::Visitor<'de> for PathVisitor {
            type Value = DerivationPath;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a derivation path string (m/44'/1815'/0'/0/0)")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                DerivationPath::from_str(v).map_err(|_| E::custom("invalid derivation path"))
            }
        }

        d.deserialize_str(PathVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_display() {
        let p = DerivationPath::from_str("m/44'/1815'/1'").unwrap();
        assert_eq!(
            p.indices(),
            &[harden(44), harden(ADA_COIN_TYPE), harden(1)]
        );

        let p = DerivationPath::from_str("m/1852'/1815'/0'/2/0").unwrap();
        assert_eq!(
            p.indices(),
            &[harden(1852), harden(ADA_COIN_TYPE), harden(0), 2, 0]
        );

        // Round-trip through the display form
        let s = "m/1852'/1815'/0'/0/1";
        let p = DerivationPath::from_str(s).unwrap();
        let mut out = heapless::String::<64>::new();
        core::fmt::write(&mut out, format_args!("{p}")).unwrap();
        assert_eq!(out.as_str(), s);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(DerivationPath::from_str("44'/1815'/0'").is_err());
        assert!(DerivationPath::from_str("m/44x'/0").is_err());
        assert!(DerivationPath::from_str("m/2147483648").is_err());
        assert!(DerivationPath::from_str("m/1/2/3/4/5/6/7/8/9/10/11").is_err());
    }

    #[test]
    fn wire_encoding() {
        let p = DerivationPath::from_str("m/44'/1815'/1'").unwrap();

        let mut buff = [0u8; 64];
        let n = p.encode(&mut buff).unwrap();

        assert_eq!(
            &buff[..n],
            &[
                0x03, 0x80, 0x00, 0x00, 0x2c, 0x80, 0x00, 0x07, 0x17, 0x80, 0x00, 0x00, 0x01,
            ]
        );

        let (decoded, m) = DerivationPath::decode_owned(&buff[..n]).unwrap();
        assert_eq!(decoded, p);
        assert_eq!(m, n);
    }

    #[test]
    fn wire_rejects_overlong() {
        let mut buff = [0u8; 64];
        buff[0] = (MAX_PATH_LEN + 1) as u8;

        assert_eq!(
            DerivationPath::decode_owned(&buff),
            Err(ApduError::InvalidPath)
        );
    }
}
