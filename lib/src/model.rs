//! Request and response models for signing flows
//!
// Copyright (c) 2022-2023 The MobileCoin Foundation
//
// These are the JSON-facing descriptions a caller hands to
// [`DeviceHandle`][crate::DeviceHandle]. The sequencers in [`tx`][crate::tx],
// [`msg`][crate::msg], [`cvote`][crate::cvote] and [`script`][crate::script]
// decompose them into APDU streams, so the models mirror what the device
// checks rather than the on-chain CBOR.

use serde::{Deserialize, Serialize};

use ledger_ada_apdu::{
    addr::{Destination, NetworkInfo},
    msg::MsgAddressField,
    path::DerivationPath,
    tx::{
        Anchor, CVoteRegFormat, Certificate, Credential, GovActionId, PoolKeyRef, PoolMetadata,
        Relay, RequiredSigner, RewardAccountRef, TransactionSigningMode, TxOutputFormat, UtxoRef,
        Vote, VoteKeyRef, Voter, SIGNATURE_LEN, TX_HASH_LEN,
    },
};

/// Transaction signing request
///
/// Element ordering is preserved on the wire, the device hashes stages in
/// the order they arrive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Network the transaction is bound to
    pub network: NetworkInfo,

    /// Signing mode, fixes witness policy for the whole session
    pub signing_mode: TransactionSigningMode,

    /// Wrap body sets in CBOR tag 258
    #[serde(default)]
    pub tag_cbor_sets: bool,

    pub inputs: Vec<Input>,

    pub outputs: Vec<Output>,

    /// Fee in lovelace
    pub fee: u64,

    #[serde(default)]
    pub ttl: Option<u64>,

    #[serde(default)]
    pub aux_data: Option<AuxData>,

    #[serde(default)]
    pub certificates: Vec<CertificateEntry>,

    #[serde(default)]
    pub withdrawals: Vec<Withdrawal>,

    #[serde(default)]
    pub validity_start: Option<u64>,

    #[serde(default)]
    pub mint: Vec<MintGroup>,

    #[serde(default, with = "hex_opt_arr")]
    pub script_data_hash: Option<[u8; 32]>,

    #[serde(default)]
    pub collateral_inputs: Vec<Input>,

    #[serde(default)]
    pub required_signers: Vec<RequiredSigner>,

    /// Write the network id into the transaction body
    #[serde(default)]
    pub include_network_id: bool,

    #[serde(default)]
    pub collateral_output: Option<Output>,

    #[serde(default)]
    pub total_collateral: Option<u64>,

    #[serde(default)]
    pub reference_inputs: Vec<UtxoRef>,

    #[serde(default)]
    pub voting_procedures: Vec<VoterVotes>,

    #[serde(default)]
    pub treasury: Option<u64>,

    #[serde(default)]
    pub donation: Option<u64>,

    /// Witness paths requested on top of those implied by the body
    #[serde(default)]
    pub additional_witness_paths: Vec<DerivationPath>,
}

/// Transaction input, the path witnesses the spend when given
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub utxo: UtxoRef,

    #[serde(default)]
    pub path: Option<DerivationPath>,
}

/// Transaction output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default = "default_output_format")]
    pub format: TxOutputFormat,

    pub destination: Destination,

    /// Coin amount in lovelace
    pub amount: u64,

    #[serde(default)]
    pub assets: Vec<AssetGroup>,

    #[serde(default)]
    pub datum: Option<Datum>,

    /// Raw reference script bytes, requires the map (Babbage) format
    #[serde(default, with = "hex_opt")]
    pub ref_script: Option<Vec<u8>>,
}

fn default_output_format() -> TxOutputFormat {
    TxOutputFormat::ArrayLegacy
}

/// Multi-asset group under one minting policy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetGroup {
    #[serde(with = "hex::serde")]
    pub policy_id: [u8; 28],

    pub tokens: Vec<Token>,
}

/// One asset within a group
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(with = "hex::serde")]
    pub asset_name: Vec<u8>,

    pub amount: u64,
}

/// Output datum, a hash or the full inline bytes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datum {
    Hash(#[serde(with = "hex::serde")] [u8; 32]),
    Inline(#[serde(with = "hex::serde")] Vec<u8>),
}

/// Transaction auxiliary data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxData {
    /// Pre-computed hash of externally built auxiliary data
    ArbitraryHash(#[serde(with = "hex::serde")] [u8; 32]),

    /// CIP-36 vote registration assembled and signed on the device
    CVoteRegistration(CVoteRegistration),
}

/// CIP-36 (or legacy CIP-15) vote registration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CVoteRegistration {
    pub format: CVoteRegFormat,

    /// Single vote key, CIP-15 or undelegated CIP-36
    #[serde(default)]
    pub vote_key: Option<VoteKeyRef>,

    /// Weighted delegations, CIP-36 only
    #[serde(default)]
    pub delegations: Vec<VoteDelegation>,

    /// Staking key witnessing the registration
    pub staking_path: DerivationPath,

    /// Address receiving voting rewards
    pub payment_destination: Destination,

    pub nonce: u64,

    #[serde(default)]
    pub voting_purpose: Option<u64>,
}

/// One weighted CIP-36 vote key delegation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoteDelegation {
    pub key: VoteKeyRef,
    pub weight: u32,
}

/// Certificate list entry
///
/// Pool registration carries a multi-message body of its own and so sits
/// alongside the single-message certificate kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateEntry {
    Certificate(Certificate),
    PoolRegistration(PoolRegistration),
}

/// Stake pool registration certificate body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolRegistration {
    pub pool_key: PoolKeyRef,

    #[serde(with = "hex::serde")]
    pub vrf_key_hash: [u8; 32],

    pub pledge: u64,

    pub cost: u64,

    pub margin_numerator: u64,

    pub margin_denominator: u64,

    pub reward_account: RewardAccountRef,

    pub owners: Vec<PoolKeyRef>,

    pub relays: Vec<Relay>,

    #[serde(default)]
    pub metadata: Option<PoolMetadata>,
}

/// Reward withdrawal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Amount withdrawn in lovelace
    pub amount: u64,

    /// Reward account credential
    pub credential: Credential,
}

/// Mint / burn group under one policy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MintGroup {
    #[serde(with = "hex::serde")]
    pub policy_id: [u8; 28],

    pub tokens: Vec<MintEntry>,
}

/// One minted (positive) or burned (negative) asset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MintEntry {
    #[serde(with = "hex::serde")]
    pub asset_name: Vec<u8>,

    pub amount: i64,
}

/// Governance votes cast by one voter
///
/// The device accepts exactly one vote per voter, mirroring the ledger
/// rule that later votes by the same voter override earlier ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoterVotes {
    pub voter: Voter,

    pub votes: Vec<VoteEntry>,
}

/// A single vote on a governance action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoteEntry {
    pub gov_action: GovActionId,

    pub vote: Vote,

    #[serde(default)]
    pub anchor: Option<Anchor>,
}

/// Signed transaction, the device-computed hash and one witness per path
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(with = "hex::serde")]
    pub tx_hash: [u8; TX_HASH_LEN],

    pub witnesses: Vec<TransactionWitness>,

    /// Present when the auxiliary data was a CIP-36 registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvote_registration: Option<CVoteRegistrationSignature>,
}

/// Device-built CIP-36 registration, returned within a signed transaction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CVoteRegistrationSignature {
    /// Hash of the registration auxiliary data built on the device
    #[serde(with = "hex::serde")]
    pub aux_data_hash: [u8; 32],

    /// Staking key signature over the registration
    #[serde(with = "hex::serde")]
    pub signature: [u8; SIGNATURE_LEN],
}

/// One transaction witness
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionWitness {
    pub path: DerivationPath,

    #[serde(with = "hex::serde")]
    pub signature: [u8; SIGNATURE_LEN],
}

/// CIP-8 message signing request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgSignRequest {
    #[serde(with = "hex::serde")]
    pub message: Vec<u8>,

    /// Signing key path
    pub path: DerivationPath,

    /// Sign the Blake2b-224 hash of the payload rather than the payload
    #[serde(default)]
    pub hash_payload: bool,

    /// Force hex display even for printable content
    #[serde(default)]
    pub prefer_hex: bool,

    /// Address bound into the CIP-8 envelope
    pub address: MsgAddressField,
}

impl MsgSignRequest {
    /// Whether the device should render the message as ASCII text
    pub fn ascii_display(&self) -> bool {
        !self.prefer_hex
            && !self.message.is_empty()
            && self.message.iter().all(|b| (0x20..=0x7e).contains(b))
    }
}

/// Signed CIP-8 message
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedMessage {
    #[serde(with = "hex::serde")]
    pub signature: [u8; 64],

    /// Public key matching the signing path
    #[serde(with = "hex::serde")]
    pub key: [u8; 32],

    /// Address field bytes bound into the envelope
    #[serde(with = "hex::serde")]
    pub address: Vec<u8>,
}

/// Signed CIP-36 vote cast
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedVote {
    #[serde(with = "hex::serde")]
    pub votecast_hash: [u8; 32],

    #[serde(with = "hex::serde")]
    pub signature: [u8; 64],
}

/// Native script tree for on-device hash derivation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeScript {
    All { scripts: Vec<NativeScript> },

    Any { scripts: Vec<NativeScript> },

    NOfK { required: u32, scripts: Vec<NativeScript> },

    PubkeyPath { path: DerivationPath },

    PubkeyHash {
        #[serde(with = "hex::serde")]
        hash: [u8; 28],
    },

    InvalidBefore { slot: u64 },

    InvalidHereafter { slot: u64 },
}

/// Hex serde shim for optional byte vectors
mod hex_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(v) => s.serialize_some(&hex::encode(v)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let v: Option<String> = Option::deserialize(d)?;
        match v {
            Some(v) => hex::decode(v).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// Hex serde shim for optional fixed-size arrays
mod hex_opt_arr {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        v: &Option<[u8; N]>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match v {
            Some(v) => s.serialize_some(&hex::encode(v)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        d: D,
    ) -> Result<Option<[u8; N]>, D::Error> {
        let v: Option<String> = Option::deserialize(d)?;
        let v = match v {
            Some(v) => v,
            None => return Ok(None),
        };

        let mut buff = [0u8; N];
        hex::decode_to_slice(v, &mut buff).map_err(serde::de::Error::custom)?;
        Ok(Some(buff))
    }
}
