// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / APDU definitions for Cardano app communication
//!
//! This module provides a protocol specification and reference implementation for communication
//! with Cardano hardware wallets.
//!
//! APDUs use a primitive binary encoding to simplify implementation with unsupported languages
//! and platforms. All multi-byte field encodings are big-endian as the device firmware parses
//! them with network-order readers, and all variable-length fields carry explicit length
//! prefixes so the constrained parser never scans ahead.
//!
//! Commands are framed as `[CLA][INS][P1][P2][LEN][PAYLOAD]` with `LEN <= 255`; payloads
//! larger than a single frame are pre-split by the flow-specific chunking in [`chunk`].

#![no_std]

#[cfg(test)]
extern crate std;

use encdec::Encode;
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString};

pub mod addr;
pub mod address;
pub mod chunk;
pub mod cvote;
pub mod keys;
pub mod msg;
pub mod opcert;
pub mod path;
pub mod prelude;
pub mod script;
pub mod tx;
pub mod version;

mod helpers;

/// Cardano APDU class
pub const ADA_APDU_CLA: u8 = 0xd7;

/// Maximum payload length for a single framed APDU
pub const MAX_APDU_DATA_LEN: usize = 255;

/// Length of the frame header preceding each APDU payload
pub const APDU_HEADER_LEN: usize = 5;

/// Cardano APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(u8)]
pub enum Instruction {
    // General instructions
    /// Fetch application version
    GetVersion = 0x00,

    /// Fetch device serial number
    GetSerial = 0x01,

    // Cardano instructions
    /// Export extended public keys
    GetPublicKeys = 0x10,

    /// Derive (and return or display) an address
    DeriveAddress = 0x11,

    /// Derive a native script hash
    DeriveScriptHash = 0x12,

    /// Sign a transaction
    SignTx = 0x21,

    /// Sign an operational certificate
    SignOpCert = 0x22,

    /// Sign a CIP-36 vote
    SignCVote = 0x23,

    /// Sign a message (CIP-8)
    SignMsg = 0x24,
}

/// Status words returned by the device with each response
///
/// Non-success stati abort the active session; the client never retries
/// a rejected command.
#[derive(Copy, Clone, Debug, PartialEq, Display, EnumString, EnumIter, TryFromPrimitive)]
#[repr(u16)]
pub enum Status {
    /// Command accepted
    Success = 0x9000,

    /// Request header malformed
    MalformedHeader = 0x6E01,

    /// Unsupported class byte
    BadCla = 0x6E02,

    /// Unknown instruction
    UnknownInstruction = 0x6E03,

    /// Device is mid-operation and cannot accept a new call
    Busy = 0x6E04,

    /// P1/P2 invalid for the instruction
    InvalidRequestParameters = 0x6E05,

    /// Command valid but illegal in the current session state
    InvalidState = 0x6E06,

    /// Payload rejected by the device parser
    InvalidData = 0x6E07,

    /// Operation rejected by the user
    RejectedByUser = 0x6E09,

    /// Operation rejected by device policy
    RejectedByPolicy = 0x6E10,

    /// Device is locked
    DeviceLocked = 0x6E11,

    /// Swap cross-check failed
    SwapCheckFailure = 0x6E13,
}

impl Status {
    /// Check whether a raw status word signals success
    pub fn is_success(code: u16) -> bool {
        code == Status::Success as u16
    }
}

/// APDU protocol error type, shared by encoders and decoders
#[derive(Copy, Clone, Debug, PartialEq, Display)]
pub enum ApduError {
    /// Buffer too short for the encoded object
    InvalidLength,

    /// Unrecognised tag or malformed field
    InvalidEncoding,

    /// Payload exceeds the single-frame limit (caller must pre-chunk)
    PayloadTooLarge,

    /// Derivation path exceeds the supported depth
    InvalidPath,

    /// Staking reference shape not permitted for the address type
    InvalidStaking,

    /// Invalid UTF-8 in a string field
    Utf8,
}

impl From<encdec::Error> for ApduError {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => ApduError::InvalidLength,
            encdec::Error::Utf8 => ApduError::Utf8,
            _ => ApduError::InvalidEncoding,
        }
    }
}

/// Frame header sent ahead of each APDU payload
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ApduHeader {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
}

/// Static properties for APDU requests
///
/// Request types set the instruction via [`ApduStatic::INS`] and override
/// [`ApduStatic::p1`] / [`ApduStatic::p2`] where the instruction multiplexes
/// sub-commands over the parameter bytes.
pub trait ApduStatic {
    /// APDU class
    const CLA: u8 = ADA_APDU_CLA;

    /// APDU instruction
    const INS: u8;

    /// First parameter byte
    fn p1(&self) -> u8 {
        0
    }

    /// Second parameter byte
    fn p2(&self) -> u8 {
        0
    }
}

/// Encodable APDU request, carrying its own frame header
pub trait ApduReq: Encode<Error = ApduError> {
    /// Fetch the frame header for this request
    fn header(&self) -> ApduHeader;
}

/// [`ApduReq`] is provided for any encodable [`ApduStatic`]
impl<T: ApduStatic + Encode<Error = ApduError>> ApduReq for T {
    fn header(&self) -> ApduHeader {
        ApduHeader {
            cla: T::CLA,
            ins: T::INS,
            p1: self.p1(),
            p2: self.p2(),
        }
    }
}

/// Frame an APDU request into the provided buffer
///
/// Emits `[CLA][INS][P1][P2][LEN][PAYLOAD]` and returns the framed slice.
/// Payloads over [`MAX_APDU_DATA_LEN`] are a caller contract violation,
/// rejected before anything is written.
pub fn frame<'a>(req: &impl ApduReq, buff: &'a mut [u8]) -> Result<&'a [u8], ApduError> {
    let n = req.encode_len()?;

    if n > MAX_APDU_DATA_LEN {
        return Err(ApduError::PayloadTooLarge);
    }
    if buff.len() < APDU_HEADER_LEN + n {
        return Err(ApduError::InvalidLength);
    }

    let h = req.header();
    buff[0] = h.cla;
    buff[1] = h.ins;
    buff[2] = h.p1;
    buff[3] = h.p2;
    buff[4] = n as u8;

    let m = req.encode(&mut buff[APDU_HEADER_LEN..][..n])?;
    debug_assert_eq!(n, m);

    Ok(&buff[..APDU_HEADER_LEN + n])
}
