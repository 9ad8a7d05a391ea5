// Copyright (c) 2022-2023 The MobileCoin Foundation

//! encdec field helpers for `#[encdec(with = ...)]` use
//!
//! encdec's derived integer encodings are little-endian; the device firmware
//! reads network order, so big-endian variants live here alongside the
//! tagged-flag and fixed-array helpers.

#![allow(unused)]

/// encdec helper module for fixed-size byte arrays
pub(crate) mod arr {
    use crate::ApduError;

    pub fn enc<const N: usize>(d: &[u8; N], buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < d.len() {
            return Err(ApduError::InvalidLength);
        }

        buff[..d.len()].copy_from_slice(&d[..]);

        Ok(d.len())
    }

    pub fn enc_len<const N: usize>(d: &[u8; N]) -> Result<usize, ApduError> {
        Ok(d.len())
    }

    pub fn dec<const N: usize>(buff: &[u8]) -> Result<([u8; N], usize), ApduError> {
        if buff.len() < N {
            return Err(ApduError::InvalidLength);
        }

        let mut d = [0u8; N];
        d.copy_from_slice(&buff[..N]);

        Ok((d, N))
    }
}

/// encdec helper module for tagged option / boolean flags
///
/// The wire convention is `0x02` for present / true and `0x01` for
/// absent / false, never 0/1.
pub(crate) mod flag {
    use crate::ApduError;

    pub const INCLUDED: u8 = 0x02;
    pub const ABSENT: u8 = 0x01;

    pub fn enc(v: &bool, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = match v {
            true => INCLUDED,
            false => ABSENT,
        };

        Ok(1)
    }

    pub fn enc_len(_v: &bool) -> Result<usize, ApduError> {
        Ok(1)
    }

    pub fn dec(buff: &[u8]) -> Result<(bool, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        match buff[0] {
            INCLUDED => Ok((true, 1)),
            ABSENT => Ok((false, 1)),
            _ => Err(ApduError::InvalidEncoding),
        }
    }
}

/// encdec helper module for big-endian `u16` fields
pub(crate) mod u16be {
    use byteorder::{BigEndian, ByteOrder};

    use crate::ApduError;

    pub fn enc(v: &u16, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 2 {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u16(buff, *v);

        Ok(2)
    }

    pub fn enc_len(_v: &u16) -> Result<usize, ApduError> {
        Ok(2)
    }

    pub fn dec(buff: &[u8]) -> Result<(u16, usize), ApduError> {
        if buff.len() < 2 {
            return Err(ApduError::InvalidLength);
        }

        Ok((BigEndian::read_u16(buff), 2))
    }
}

/// encdec helper module for big-endian `u32` fields
pub(crate) mod u32be {
    use byteorder::{BigEndian, ByteOrder};

    use crate::ApduError;

    pub fn enc(v: &u32, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u32(buff, *v);

        Ok(4)
    }

    pub fn enc_len(_v: &u32) -> Result<usize, ApduError> {
        Ok(4)
    }

    pub fn dec(buff: &[u8]) -> Result<(u32, usize), ApduError> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        Ok((BigEndian::read_u32(buff), 4))
    }
}

/// encdec helper module for big-endian `u64` fields
pub(crate) mod u64be {
    use byteorder::{BigEndian, ByteOrder};

    use crate::ApduError;

    pub fn enc(v: &u64, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 8 {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u64(buff, *v);

        Ok(8)
    }

    pub fn enc_len(_v: &u64) -> Result<usize, ApduError> {
        Ok(8)
    }

    pub fn dec(buff: &[u8]) -> Result<(u64, usize), ApduError> {
        if buff.len() < 8 {
            return Err(ApduError::InvalidLength);
        }

        Ok((BigEndian::read_u64(buff), 8))
    }
}

/// encdec helper module for big-endian signed `i64` fields (mint amounts)
pub(crate) mod i64be {
    use byteorder::{BigEndian, ByteOrder};

    use crate::ApduError;

    pub fn enc(v: &i64, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 8 {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_i64(buff, *v);

        Ok(8)
    }

    pub fn enc_len(_v: &i64) -> Result<usize, ApduError> {
        Ok(8)
    }

    pub fn dec(buff: &[u8]) -> Result<(i64, usize), ApduError> {
        if buff.len() < 8 {
            return Err(ApduError::InvalidLength);
        }

        Ok((BigEndian::read_i64(buff), 8))
    }
}

/// serde helper module for hex-encoded fixed-size byte arrays
#[cfg(feature = "serde")]
pub(crate) mod hex_array {
    use core::fmt;
    use core::marker::PhantomData;

    use serde::{de::Visitor, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        v: &[u8; N],
        s: S,
    ) -> Result<S::Ok, S::Error> {
        // Hashes in this protocol are at most 32 bytes
        let mut buff = [0u8; 64];

        hex::encode_to_slice(v, &mut buff[..N * 2])
            .map_err(|_| serde::ser::Error::custom("hex encode failed"))?;

        let h = core::str::from_utf8(&buff[..N * 2])
            .map_err(|_| serde::ser::Error::custom("hex encode produced invalid utf8"))?;

        s.serialize_str(h)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        d: D,
    ) -> Result<[u8; N], D::Error> {
        struct HexVisitor<const N: usize>(PhantomData<[u8; N]>);

        impl<'de, const N: usize> Visitor<'de> for HexVisitor<N> {
            type Value = [u8; N];

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a {}-character hex string", N * 2)
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                let mut d = [0u8; N];

                hex::decode_to_slice(v, &mut d)
                    .map_err(|_| E::custom("invalid hex string"))?;

                Ok(d)
            }
        }

        d.deserialize_str(HexVisitor(PhantomData))
    }
}

/// serde helper module for hex-encoded variable-size byte vectors
#[cfg(feature = "serde")]
pub(crate) mod hex_vec {
    use core::fmt;
    use core::marker::PhantomData;

    use serde::{de::Visitor, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        v: &heapless::Vec<u8, N>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        // Raw addresses are at most 128 bytes
        let mut buff = [0u8; 256];

        hex::encode_to_slice(v, &mut buff[..v.len() * 2])
            .map_err(|_| serde::ser::Error::custom("hex encode failed"))?;

        let h = core::str::from_utf8(&buff[..v.len() * 2])
            .map_err(|_| serde::ser::Error::custom("hex encode produced invalid utf8"))?;

        s.serialize_str(h)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        d: D,
    ) -> Result<heapless::Vec<u8, N>, D::Error> {
        struct HexVisitor<const N: usize>(PhantomData<[u8; N]>);

        impl<'de, const N: usize> Visitor<'de> for HexVisitor<N> {
            type Value = heapless::Vec<u8, N>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a hex string of at most {} characters", N * 2)
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v.len() % 2 != 0 || v.len() / 2 > N {
                    return Err(E::custom("invalid hex string length"));
                }

                let mut d = heapless::Vec::new();
                d.resize_default(v.len() / 2)
                    .map_err(|_| E::custom("hex string too long"))?;

                hex::decode_to_slice(v, &mut d)
                    .map_err(|_| E::custom("invalid hex string"))?;

                Ok(d)
            }
        }

        d.deserialize_str(HexVisitor(PhantomData))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flag_encoding() {
        let mut buff = [0u8; 1];

        flag::enc(&true, &mut buff).unwrap();
        assert_eq!(buff[0], 0x02);

        flag::enc(&false, &mut buff).unwrap();
        assert_eq!(buff[0], 0x01);

        assert_eq!(flag::dec(&[0x02]), Ok((true, 1)));
        assert_eq!(flag::dec(&[0x01]), Ok((false, 1)));
        assert!(flag::dec(&[0x00]).is_err());
    }

    #[test]
    fn big_endian_fields() {
        let mut buff = [0u8; 8];

        u32be::enc(&0x2D964A09, &mut buff).unwrap();
        assert_eq!(&buff[..4], &[0x2d, 0x96, 0x4a, 0x09]);

        u64be::enc(&42, &mut buff).unwrap();
        assert_eq!(&buff[..8], &[0, 0, 0, 0, 0, 0, 0, 42]);

        i64be::enc(&-1, &mut buff).unwrap();
        assert_eq!(&buff[..8], &[0xff; 8]);
    }
}
