// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Ledger Cardano API Library (and CLI)
//!
//! [`DeviceHandle`] wraps a byte-level [`transport::Exchange`] with the
//! Cardano app protocol: key export, address derivation and the staged
//! signing flows for transactions, CIP-8 messages, CIP-36 votes,
//! operational certificates and native script hashes. Requests are
//! described by the JSON-friendly types in [`model`].

/// Transports for reaching devices (and tests)
pub mod transport;

/// Re-export `ledger-ada-apdu` for consumers
pub use ledger_ada_apdu::{self as apdu};

mod handle;
pub use handle::DeviceHandle;

mod error;
pub use error::Error;

pub mod model;

mod tx;
pub use tx::witness_paths;

mod cvote;

mod msg;

mod script;
