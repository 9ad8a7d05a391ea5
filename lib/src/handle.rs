// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handle for connected ledger devices
//!
//! This provides methods for interacting with the Cardano app and is
//! generic over [`Exchange`] transports

use std::{sync::Arc, time::Duration};

use encdec::DecodeOwned;
use log::debug;
use tokio::{sync::Mutex, time::timeout};

use ledger_ada_apdu::{
    self as apdu,
    addr::AddressParams,
    address::{DeriveAddressReq, DeriveAddressResp, ShowAddressReq},
    keys::{ExtPubKeyResp, PubKeyInitReq, PubKeyNextReq},
    opcert::{OpCertReq, OpCertResp},
    path::DerivationPath,
    script::ScriptHashDisplayFormat,
    version::{SerialReq, SerialResp, VersionReq, VersionResp},
    ApduError, ApduReq, APDU_HEADER_LEN, MAX_APDU_DATA_LEN,
};

use crate::{
    cvote,
    model::{
        MsgSignRequest, NativeScript, SignedMessage, SignedTransaction, SignedVote, Transaction,
    },
    msg, script,
    transport::Exchange,
    tx, Error,
};

/// Default seconds to wait for a device response
pub const DEFAULT_REQUEST_TIMEOUT_S: usize = 2;

/// Default seconds to wait where the user must interact
pub const DEFAULT_USER_TIMEOUT_S: usize = 60;

/// Cardano handle for a connected ledger device
///
/// Wraps an [`Exchange`] transport with APDU framing, status checking and
/// the multi-message sequencing of the signing flows. The transport sits
/// behind a mutex so a flow holds the device exclusively from its first
/// message to its last.
#[derive(Clone)]
pub struct DeviceHandle<T: Exchange> {
    /// Transport for communication
    t: Arc<Mutex<T>>,
    /// Timeout for user acknowledgements
    user_timeout_s: usize,
    /// Timeout for APDU requests
    request_timeout_s: usize,
}

/// Create a [`DeviceHandle`] wrapper from a type implementing [`Exchange`]
impl<T: Exchange> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
            user_timeout_s: DEFAULT_USER_TIMEOUT_S,
            request_timeout_s: DEFAULT_REQUEST_TIMEOUT_S,
        }
    }
}

impl<T: Exchange + Send> DeviceHandle<T> {
    /// Set timeout for interactive requests
    pub fn set_user_timeout(&mut self, user_timeout_s: usize) {
        self.user_timeout_s = user_timeout_s;
    }

    /// Set timeout for non-interactive requests
    pub fn set_request_timeout(&mut self, request_timeout_s: usize) {
        self.request_timeout_s = request_timeout_s;
    }

    /// Shared access to the underlying transport
    pub fn transport(&self) -> Arc<Mutex<T>> {
        self.t.clone()
    }

    fn user_timeout(&self) -> Duration {
        Duration::from_secs(self.user_timeout_s as u64)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_s as u64)
    }

    /// Fetch the application version
    pub async fn app_version(&self) -> Result<VersionResp, Error<T::Error>> {
        debug!("requesting app version");

        let mut t = self.t.lock().await;
        let r = exchange_req(&mut *t, &VersionReq {}, self.request_timeout()).await?;

        decode_resp(r)
    }

    /// Fetch the device serial number
    pub async fn serial(&self) -> Result<SerialResp, Error<T::Error>> {
        debug!("requesting device serial");

        let mut t = self.t.lock().await;
        let r = exchange_req(&mut *t, &SerialReq {}, self.request_timeout()).await?;

        decode_resp(r)
    }

    /// Export extended public keys for a batch of paths
    ///
    /// The user confirms the batch once, then each path round-trips for
    /// its key and chain code.
    pub async fn public_keys(
        &self,
        paths: &[DerivationPath],
    ) -> Result<Vec<ExtPubKeyResp>, Error<T::Error>> {
        let (first, rest) = match paths.split_first() {
            Some(v) => v,
            None => return Err(Error::InvalidRequest("no paths requested")),
        };

        debug!("requesting {} public keys", paths.len());

        let mut t = self.t.lock().await;
        let mut keys = Vec::with_capacity(paths.len());

        let init = PubKeyInitReq {
            path: first.clone(),
            remaining: rest.len() as u32,
        };
        let r = exchange_req(&mut *t, &init, self.user_timeout()).await?;
        keys.push(decode_resp(r)?);

        for path in rest {
            let next = PubKeyNextReq { path: path.clone() };
            let r = exchange_req(&mut *t, &next, self.user_timeout()).await?;
            keys.push(decode_resp(r)?);
        }

        Ok(keys)
    }

    /// Derive an address and return its bytes
    pub async fn derive_address(&self, params: &AddressParams) -> Result<Vec<u8>, Error<T::Error>> {
        debug!("deriving address ({})", params.address_type);

        let mut t = self.t.lock().await;
        let req = DeriveAddressReq {
            params: params.clone(),
        };
        let r = exchange_req(&mut *t, &req, self.user_timeout()).await?;

        let resp: DeriveAddressResp = decode_resp(r)?;
        Ok(resp.address.to_vec())
    }

    /// Derive an address and display it on the device for verification
    pub async fn show_address(&self, params: &AddressParams) -> Result<(), Error<T::Error>> {
        debug!("showing address ({})", params.address_type);

        let mut t = self.t.lock().await;
        let req = ShowAddressReq {
            params: params.clone(),
        };
        let r = exchange_req(&mut *t, &req, self.user_timeout()).await?;

        expect_empty(r)
    }

    /// Sign a transaction
    ///
    /// Streams the transaction body to the device in stage order, then
    /// collects the transaction hash and one witness per implied path.
    pub async fn sign_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<SignedTransaction, Error<T::Error>> {
        debug!("signing transaction ({})", transaction.signing_mode);

        let mut t = self.t.lock().await;
        tx::sign_transaction(&mut *t, transaction, self.user_timeout()).await
    }

    /// Sign a CIP-8 message
    pub async fn sign_message(
        &self,
        request: &MsgSignRequest,
    ) -> Result<SignedMessage, Error<T::Error>> {
        debug!("signing message ({} bytes)", request.message.len());

        let mut t = self.t.lock().await;
        msg::sign_message(&mut *t, request, self.user_timeout()).await
    }

    /// Sign a CIP-36 vote cast
    pub async fn sign_vote(
        &self,
        votecast: &[u8],
        path: &DerivationPath,
    ) -> Result<SignedVote, Error<T::Error>> {
        debug!("signing vote cast ({} bytes)", votecast.len());

        let mut t = self.t.lock().await;
        cvote::sign_vote(&mut *t, votecast, path, self.user_timeout()).await
    }

    /// Sign an operational certificate
    pub async fn sign_op_cert(
        &self,
        kes_public_key: [u8; 32],
        kes_period: u64,
        issue_counter: u64,
        cold_key_path: &DerivationPath,
    ) -> Result<[u8; 64], Error<T::Error>> {
        debug!("signing operational certificate (counter {issue_counter})");

        let mut t = self.t.lock().await;
        let req = OpCertReq {
            kes_public_key,
            kes_period,
            issue_counter,
            cold_key_path: cold_key_path.clone(),
        };
        let r = exchange_req(&mut *t, &req, self.user_timeout()).await?;

        let resp: OpCertResp = decode_resp(r)?;
        Ok(resp.signature)
    }

    /// Derive a native script hash on the device
    pub async fn derive_script_hash(
        &self,
        native_script: &NativeScript,
        format: ScriptHashDisplayFormat,
    ) -> Result<[u8; 28], Error<T::Error>> {
        debug!("deriving native script hash");

        let mut t = self.t.lock().await;
        script::derive_script_hash(&mut *t, native_script, format, self.user_timeout()).await
    }
}

/// Frame and send a request, returning the raw `(status, payload)` pair
///
/// Free function rather than a method so sequencers can drive the
/// transport while the handle's lock is held once for the whole flow.
pub(crate) async fn exchange_req<T: Exchange>(
    t: &mut T,
    req: &impl ApduReq,
    duration: Duration,
) -> Result<(u16, Vec<u8>), Error<T::Error>> {
    let mut buff = [0u8; APDU_HEADER_LEN + MAX_APDU_DATA_LEN];
    let cmd = apdu::frame(req, &mut buff)?;

    let (status, body) = timeout(duration, t.exchange(cmd))
        .await?
        .map_err(Error::Transport)?;

    Ok((status, body))
}

/// Check a response status and decode the payload
pub(crate) fn decode_resp<E, R>((status, body): (u16, Vec<u8>)) -> Result<R, Error<E>>
where
    E: core::fmt::Display + core::fmt::Debug,
    R: DecodeOwned<Output = R, Error = ApduError>,
{
    Error::check_status(status)?;

    let (resp, _n) = R::decode_owned(&body)?;
    Ok(resp)
}

/// Check a response status, expecting an empty payload
pub(crate) fn expect_empty<E>((status, body): (u16, Vec<u8>)) -> Result<(), Error<E>>
where
    E: core::fmt::Display + core::fmt::Debug,
{
    Error::check_status(status)?;

    if !body.is_empty() {
        return Err(Error::UnexpectedResponse);
    }

    Ok(())
}
