// Copyright (c) 2022-2023 The MobileCoin Foundation

use core::fmt::Debug;
use std::fmt::Display;

use tokio::time::error::Elapsed;

use ledger_ada_apdu::{ApduError, Status};

/// Ledger Cardano API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error<E: Display + Debug> {
    /// Transport error
    #[error("Transport error {0}")]
    Transport(E),

    /// Device reported a known error status
    #[error("Device error: {0}")]
    Device(Status),

    /// Device reported an unrecognised status word
    #[error("Unknown device status 0x{0:04x}")]
    Status(u16),

    /// APDU encode / decode error
    #[error("APDU encoding failed: {0}")]
    Apdu(ApduError),

    /// Unexpected APDU response
    #[error("Unexpected APDU response")]
    UnexpectedResponse,

    /// Timeout waiting for user
    #[error("Timeout waiting for user interaction")]
    UserTimeout,

    /// Request timeout
    #[error("Timeout waiting for device response")]
    RequestTimeout,

    /// Request rejected before reaching the device
    #[error("Invalid request: {0}")]
    InvalidRequest(&'static str),
}

impl<E: Display + Debug> From<Elapsed> for Error<E> {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}

impl<E: Display + Debug> From<ApduError> for Error<E> {
    fn from(e: ApduError) -> Self {
        Error::Apdu(e)
    }
}

impl<E: Display + Debug> Error<E> {
    /// Map a raw status word to the matching error, `Ok` on success
    pub fn check_status(code: u16) -> Result<(), Self> {
        if Status::is_success(code) {
            return Ok(());
        }

        match Status::try_from(code) {
            Ok(s) => Err(Error::Device(s)),
            Err(_) => Err(Error::Status(code)),
        }
    }
}
