// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Certificate stage APDUs
//!
//! The certificate payload is the type tag followed by a body whose shape
//! is fixed by the tag. Pool registrations send only the tag; their body
//! follows in the nested sub-protocol, see [`pool`][crate::tx::pool].

use encdec::{Decode, DecodeOwned, Encode};

use super::{anchor_opt, Anchor, Credential, DRep, P1_CERTIFICATES};
use crate::{
    addr::KEY_HASH_LEN, helpers::*, path::DerivationPath, ApduError, ApduStatic, Instruction,
};

// Certificate type tags, gaps per the Conway ledger spec
const CERT_STAKE_REGISTRATION: u8 = 0;
const CERT_STAKE_DEREGISTRATION: u8 = 1;
const CERT_STAKE_DELEGATION: u8 = 2;
pub(crate) const CERT_STAKE_POOL_REGISTRATION: u8 = 3;
const CERT_STAKE_POOL_RETIREMENT: u8 = 4;
const CERT_STAKE_REGISTRATION_CONWAY: u8 = 7;
const CERT_STAKE_DEREGISTRATION_CONWAY: u8 = 8;
const CERT_VOTE_DELEGATION: u8 = 9;
const CERT_AUTHORIZE_COMMITTEE_HOT: u8 = 14;
const CERT_RESIGN_COMMITTEE_COLD: u8 = 15;
const CERT_DREP_REGISTRATION: u8 = 16;
const CERT_DREP_DEREGISTRATION: u8 = 17;
const CERT_DREP_UPDATE: u8 = 18;

/// Certificate body, one variant per wire tag
///
/// Pool registration is absent here: its certificate message carries only
/// the type byte and the body arrives via the pool sub-protocol.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Certificate {
    /// Pre-Conway stake key registration
    StakeRegistration { credential: Credential },

    /// Pre-Conway stake key deregistration
    StakeDeregistration { credential: Credential },

    /// Delegation of stake to a pool
    StakeDelegation {
        credential: Credential,
        #[cfg_attr(feature = "serde", serde(with = "hex_array"))]
        pool_key_hash: [u8; KEY_HASH_LEN],
    },

    /// Retirement of a pool operated by the device
    StakePoolRetirement {
        pool_key_path: DerivationPath,
        epoch: u64,
    },

    /// Conway stake registration with explicit deposit
    StakeRegistrationConway { credential: Credential, deposit: u64 },

    /// Conway stake deregistration with deposit refund
    StakeDeregistrationConway { credential: Credential, deposit: u64 },

    /// Delegation of governance votes to a DRep
    VoteDelegation { credential: Credential, drep: DRep },

    /// Authorization of a committee hot credential
    AuthorizeCommitteeHot {
        cold_credential: Credential,
        hot_credential: Credential,
    },

    /// Resignation from the constitutional committee
    ResignCommitteeCold {
        cold_credential: Credential,
        anchor: Option<Anchor>,
    },

    /// DRep registration
    DRepRegistration {
        credential: Credential,
        deposit: u64,
        anchor: Option<Anchor>,
    },

    /// DRep deregistration
    DRepDeregistration { credential: Credential, deposit: u64 },

    /// DRep metadata update
    DRepUpdate {
        credential: Credential,
        anchor: Option<Anchor>,
    },
}

impl Certificate {
    /// Wire type tag for this certificate
    pub fn type_tag(&self) -> u8 {
        match self {
            Certificate::StakeRegistration { .. } => CERT_STAKE_REGISTRATION,
            Certificate::StakeDeregistration { .. } => CERT_STAKE_DEREGISTRATION,
            Certificate::StakeDelegation { .. } => CERT_STAKE_DELEGATION,
            Certificate::StakePoolRetirement { .. } => CERT_STAKE_POOL_RETIREMENT,
            Certificate::StakeRegistrationConway { .. } => CERT_STAKE_REGISTRATION_CONWAY,
            Certificate::StakeDeregistrationConway { .. } => CERT_STAKE_DEREGISTRATION_CONWAY,
            Certificate::VoteDelegation { .. } => CERT_VOTE_DELEGATION,
            Certificate::AuthorizeCommitteeHot { .. } => CERT_AUTHORIZE_COMMITTEE_HOT,
            Certificate::ResignCommitteeCold { .. } => CERT_RESIGN_COMMITTEE_COLD,
            Certificate::DRepRegistration { .. } => CERT_DREP_REGISTRATION,
            Certificate::DRepDeregistration { .. } => CERT_DREP_DEREGISTRATION,
            Certificate::DRepUpdate { .. } => CERT_DREP_UPDATE,
        }
    }
}

impl Encode for Certificate {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let len = match self {
            Certificate::StakeRegistration { credential }
            | Certificate::StakeDeregistration { credential } => credential.encode_len()?,
            Certificate::StakeDelegation { credential, .. } => {
                credential.encode_len()? + KEY_HASH_LEN
            }
            Certificate::StakePoolRetirement { pool_key_path, .. } => {
                pool_key_path.wire_len() + 8
            }
            Certificate::StakeRegistrationConway { credential, .. }
            | Certificate::StakeDeregistrationConway { credential, .. }
            | Certificate::DRepDeregistration { credential, .. } => credential.encode_len()? + 8,
            Certificate::VoteDelegation { credential, drep } => {
                credential.encode_len()? + drep.encode_len()?
            }
            Certificate::AuthorizeCommitteeHot {
                cold_credential,
                hot_credential,
            } => cold_credential.encode_len()? + hot_credential.encode_len()?,
            Certificate::ResignCommitteeCold {
                cold_credential,
                anchor,
            } => cold_credential.encode_len()? + anchor_opt::enc_len(anchor)?,
            Certificate::DRepRegistration {
                credential, anchor, ..
            } => credential.encode_len()? + 8 + anchor_opt::enc_len(anchor)?,
            Certificate::DRepUpdate { credential, anchor } => {
                credential.encode_len()? + anchor_opt::enc_len(anchor)?
            }
        };
        Ok(1 + len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.type_tag();
        let mut index = 1;

        match self {
            Certificate::StakeRegistration { credential }
            | Certificate::StakeDeregistration { credential } => {
                index += credential.encode(&mut buff[index..])?;
            }
            Certificate::StakeDelegation {
                credential,
                pool_key_hash,
            } => {
                index += credential.encode(&mut buff[index..])?;
                index += arr::enc(pool_key_hash, &mut buff[index..])?;
            }
            Certificate::StakePoolRetirement {
                pool_key_path,
                epoch,
            } => {
                index += pool_key_path.encode(&mut buff[index..])?;
                index += u64be::enc(epoch, &mut buff[index..])?;
            }
            Certificate::StakeRegistrationConway {
                credential,
                deposit,
            }
            | Certificate::StakeDeregistrationConway {
                credential,
                deposit,
            }
            | Certificate::DRepDeregistration {
                credential,
                deposit,
            } => {
                index += credential.encode(&mut buff[index..])?;
                index += u64be::enc(deposit, &mut buff[index..])?;
            }
            Certificate::VoteDelegation { credential, drep } => {
                index += credential.encode(&mut buff[index..])?;
                index += drep.encode(&mut buff[index..])?;
            }
            Certificate::AuthorizeCommitteeHot {
                cold_credential,
                hot_credential,
            } => {
                index += cold_credential.encode(&mut buff[index..])?;
                index += hot_credential.encode(&mut buff[index..])?;
            }
            Certificate::ResignCommitteeCold {
                cold_credential,
                anchor,
            } => {
                index += cold_credential.encode(&mut buff[index..])?;
                index += anchor_opt::enc(anchor, &mut buff[index..])?;
            }
            Certificate::DRepRegistration {
                credential,
                deposit,
                anchor,
            } => {
                index += credential.encode(&mut buff[index..])?;
                index += u64be::enc(deposit, &mut buff[index..])?;
                index += anchor_opt::enc(anchor, &mut buff[index..])?;
            }
            Certificate::DRepUpdate { credential, anchor } => {
                index += credential.encode(&mut buff[index..])?;
                index += anchor_opt::enc(anchor, &mut buff[index..])?;
            }
        }

        Ok(index)
    }
}

impl DecodeOwned for Certificate {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 1;
        let cert = match buff[0] {
            CERT_STAKE_REGISTRATION | CERT_STAKE_DEREGISTRATION => {
                let (credential, n) = Credential::decode_owned(&buff[index..])?;
                index += n;
                match buff[0] {
                    CERT_STAKE_REGISTRATION => Certificate::StakeRegistration { credential },
                    _ => Certificate::StakeDeregistration { credential },
                }
            }
            CERT_STAKE_DELEGATION => {
                let (credential, n) = Credential::decode_owned(&buff[index..])?;
                index += n;
                let (pool_key_hash, n) = arr::dec(&buff[index..])?;
                index += n;
                Certificate::StakeDelegation {
                    credential,
                    pool_key_hash,
                }
            }
            CERT_STAKE_POOL_RETIREMENT => {
                let (pool_key_path, n) = DerivationPath::decode_owned(&buff[index..])?;
                index += n;
                let (epoch, n) = u64be::dec(&buff[index..])?;
                index += n;
                Certificate::StakePoolRetirement {
                    pool_key_path,
                    epoch,
                }
            }
            CERT_STAKE_REGISTRATION_CONWAY
            | CERT_STAKE_DEREGISTRATION_CONWAY
            | CERT_DREP_DEREGISTRATION => {
                let (credential, n) = Credential::decode_owned(&buff[index..])?;
                index += n;
                let (deposit, n) = u64be::dec(&buff[index..])?;
                index += n;
                match buff[0] {
                    CERT_STAKE_REGISTRATION_CONWAY => Certificate::StakeRegistrationConway {
                        credential,
                        deposit,
                    },
                    CERT_STAKE_DEREGISTRATION_CONWAY => Certificate::StakeDeregistrationConway {
                        credential,
                        deposit,
                    },
                    _ => Certificate::DRepDeregistration {
                        credential,
                        deposit,
                    },
                }
            }
            CERT_VOTE_DELEGATION => {
                let (credential, n) = Credential::decode_owned(&buff[index..])?;
                index += n;
                let (drep, n) = DRep::decode_owned(&buff[index..])?;
                index += n;
                Certificate::VoteDelegation { credential, drep }
            }
            CERT_AUTHORIZE_COMMITTEE_HOT => {
                let (cold_credential, n) = Credential::decode_owned(&buff[index..])?;
                index += n;
                let (hot_credential, n) = Credential::decode_owned(&buff[index..])?;
                index += n;
                Certificate::AuthorizeCommitteeHot {
                    cold_credential,
                    hot_credential,
                }
            }
            CERT_RESIGN_COMMITTEE_COLD => {
                let (cold_credential, n) = Credential::decode_owned(&buff[index..])?;
                index += n;
                let (anchor, n) = anchor_opt::dec(&buff[index..])?;
                index += n;
                Certificate::ResignCommitteeCold {
                    cold_credential,
                    anchor,
                }
            }
            CERT_DREP_REGISTRATION => {
                let (credential, n) = Credential::decode_owned(&buff[index..])?;
                index += n;
                let (deposit, n) = u64be::dec(&buff[index..])?;
                index += n;
                let (anchor, n) = anchor_opt::dec(&buff[index..])?;
                index += n;
                Certificate::DRepRegistration {
                    credential,
                    deposit,
                    anchor,
                }
            }
            CERT_DREP_UPDATE => {
                let (credential, n) = Credential::decode_owned(&buff[index..])?;
                index += n;
                let (anchor, n) = anchor_opt::dec(&buff[index..])?;
                index += n;
                Certificate::DRepUpdate { credential, anchor }
            }
            _ => return Err(ApduError::InvalidEncoding),
        };

        Ok((cert, index))
    }
}

/// Certificate stage APDU
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct TxCertificate {
    pub certificate: Certificate,
}

impl ApduStatic for TxCertificate {
    const INS: u8 = Instruction::SignTx as u8;

    fn p1(&self) -> u8 {
        P1_CERTIFICATES
    }
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;
    use crate::addr::SCRIPT_HASH_LEN;
    use crate::test::encode_decode_apdu;
    use crate::tx::ANCHOR_HASH_LEN;

    fn stake_path() -> Credential {
        Credential::Path(DerivationPath::from_str("m/1852'/1815'/0'/2/0").unwrap())
    }

    #[test]
    fn stake_registration_layout() {
        let apdu = TxCertificate {
            certificate: Certificate::StakeRegistration {
                credential: stake_path(),
            },
        };

        let mut buff = [0u8; 64];
        let n = encode_decode_apdu(&mut buff, &apdu);

        assert_eq!(buff[0], 0); // type tag
        assert_eq!(buff[1], 0); // credential path tag
        assert_eq!(n, 1 + 1 + 21);
        assert_eq!(apdu.p1(), 0x06);
    }

    #[test]
    fn delegation_layout() {
        let cert = Certificate::StakeDelegation {
            credential: stake_path(),
            pool_key_hash: [0x5b; KEY_HASH_LEN],
        };

        let mut buff = [0u8; 64];
        let n = cert.encode(&mut buff).unwrap();

        assert_eq!(buff[0], 2);
        assert_eq!(&buff[n - KEY_HASH_LEN..n], &[0x5b; KEY_HASH_LEN]);
    }

    #[test]
    fn conway_deposit_layout() {
        let cert = Certificate::StakeRegistrationConway {
            credential: Credential::ScriptHash([0x10; SCRIPT_HASH_LEN]),
            deposit: 2_000_000,
        };

        let mut buff = [0u8; 64];
        let n = cert.encode(&mut buff).unwrap();

        assert_eq!(buff[0], 7);
        // Deposit trails the credential
        assert_eq!(&buff[n - 8..n], &[0, 0, 0, 0, 0, 0x1e, 0x84, 0x80]);
    }

    #[test]
    fn pool_retirement_layout() {
        let cert = Certificate::StakePoolRetirement {
            pool_key_path: DerivationPath::from_str("m/1853'/1815'/0'/0'").unwrap(),
            epoch: 410,
        };

        let mut buff = [0u8; 64];
        let n = cert.encode(&mut buff).unwrap();

        assert_eq!(buff[0], 4);
        assert_eq!(buff[1], 4); // path depth
        assert_eq!(&buff[n - 8..n], &[0, 0, 0, 0, 0, 0, 0x01, 0x9a]);
    }

    #[test]
    fn certificate_round_trips() {
        let anchor =
            Anchor::new([0x61; ANCHOR_HASH_LEN], "https://example.org/meta.json").unwrap();

        let cases = [
            Certificate::StakeDeregistration {
                credential: stake_path(),
            },
            Certificate::StakeDeregistrationConway {
                credential: stake_path(),
                deposit: 2_000_000,
            },
            Certificate::VoteDelegation {
                credential: stake_path(),
                drep: DRep::Abstain,
            },
            Certificate::AuthorizeCommitteeHot {
                cold_credential: Credential::KeyHash([0x18; KEY_HASH_LEN]),
                hot_credential: stake_path(),
            },
            Certificate::ResignCommitteeCold {
                cold_credential: stake_path(),
                anchor: Some(anchor.clone()),
            },
            Certificate::DRepRegistration {
                credential: stake_path(),
                deposit: 500_000_000,
                anchor: Some(anchor.clone()),
            },
            Certificate::DRepDeregistration {
                credential: stake_path(),
                deposit: 500_000_000,
            },
            Certificate::DRepUpdate {
                credential: stake_path(),
                anchor: None,
            },
        ];

        for cert in cases {
            let mut buff = [0u8; 255];
            let n = cert.encode(&mut buff).unwrap();
            assert_eq!(n, cert.encode_len().unwrap());

            let (decoded, m) = Certificate::decode_owned(&buff[..n]).unwrap();
            assert_eq!(decoded, cert);
            assert_eq!(m, n);
        }
    }
}
