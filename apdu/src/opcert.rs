// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Operational certificate signing APDUs
//!
//! Single round-trip: the pool cold key at `cold_key_path` signs the
//! operational certificate body assembled from the KES key, KES period
//! and issue counter.

use encdec::{Decode, DecodeOwned, Encode};

use crate::{helpers::*, path::DerivationPath, ApduError, ApduStatic, Instruction};

/// Length of a KES public key
pub const KES_KEY_LEN: usize = 32;

/// Length of an operational certificate signature
pub const OP_CERT_SIGNATURE_LEN: usize = 64;

/// Operational certificate signing request APDU
#[derive(Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct OpCertReq {
    /// Hot KES public key being certified
    #[encdec(with = "arr")]
    pub kes_public_key: [u8; KES_KEY_LEN],

    /// First KES period the certificate is valid in
    #[encdec(with = "u64be")]
    pub kes_period: u64,

    /// Monotonic certificate issue counter
    #[encdec(with = "u64be")]
    pub issue_counter: u64,

    /// Pool cold key path to sign with
    pub cold_key_path: DerivationPath,
}

impl ApduStatic for OpCertReq {
    const INS: u8 = Instruction::SignOpCert as u8;
}

/// Operational certificate signature response APDU
#[derive(Copy, Clone, Debug, PartialEq, Encode, DecodeOwned)]
#[encdec(error = "ApduError")]
pub struct OpCertResp {
    /// ed25519 cold key signature over the certificate body
    #[encdec(with = "arr")]
    pub signature: [u8; OP_CERT_SIGNATURE_LEN],
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;
    use crate::test::encode_decode_apdu;
    use crate::ApduReq;

    #[test]
    fn op_cert_request_layout() {
        let path = DerivationPath::from_str("m/1853'/1815'/0'/0'").unwrap();
        let apdu = OpCertReq {
            kes_public_key: [0x4b; KES_KEY_LEN],
            kes_period: 420,
            issue_counter: 2,
            cold_key_path: path.clone(),
        };

        let mut buff = [0u8; 128];
        let n = encode_decode_apdu(&mut buff, &apdu);

        assert_eq!(n, 32 + 8 + 8 + path.wire_len());
        assert_eq!(&buff[32..40], &[0, 0, 0, 0, 0, 0, 0x01, 0xa4]);
        assert_eq!(&buff[40..48], &[0, 0, 0, 0, 0, 0, 0, 2]);

        let h = apdu.header();
        assert_eq!((h.ins, h.p1, h.p2), (0x22, 0x00, 0x00));
    }

    #[test]
    fn op_cert_response() {
        let mut buff = [0u8; 128];
        encode_decode_apdu(
            &mut buff,
            &OpCertResp {
                signature: [0x77; OP_CERT_SIGNATURE_LEN],
            },
        );
    }
}
