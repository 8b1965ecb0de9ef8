//! idlock-proto — wire schema for identity cards
//!
//! Every record that crosses the idlock boundary is a length-delimited
//! protobuf message with frozen field numbers. The structs here are written
//! by hand against those numbers; there is no schema compiler in the build
//! (new fields are additive, decoders ignore fields they do not know).
//!
//! # Module layout
//! - `card` — the card-side records: details, access secrets, the inner
//!   card and its signed/encrypted envelopes, certificates, and the
//!   top-level container that travels in the QR code.
//! - `api`  — the caller-side records: issuance input, key sets, and
//!   certificate lists.
//!
//! Encoding is deterministic: for a given message value, repeated encodes
//! produce byte-identical output. Card issuance relies on this.

pub mod api;
pub mod card;

use prost::Message;

pub use api::{CertificateList, Identity, KeyKind, KeySet, PublicKeyEntry};
pub use card::{
    CardAccess, CardBundle, CardDetails, Certificate, Date, Dictionary, InnerCard, Pair,
    PostalAddress, PublicSignedCard, SignedInnerCard,
};

/// Wire-level failure. Anything that goes wrong while decoding caller input
/// is an invalid-input condition for the engine above.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    #[error("malformed message: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Serialize a message to its canonical byte form.
pub fn encode<M: Message>(msg: &M) -> Vec<u8> {
    msg.encode_to_vec()
}

/// Parse a message, ignoring unknown fields.
pub fn decode<M: Message + Default>(buf: &[u8]) -> Result<M, ProtoError> {
    Ok(M::decode(buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_details() -> CardDetails {
        CardDetails {
            surname: "Doe".into(),
            given_name: "John".into(),
            date_of_birth: Some(Date {
                year: 1980,
                month: 6,
                day: 1,
            }),
            place_of_birth: "Aurora".into(),
            created_at: 1_600_000_000,
            extra: vec![Pair {
                key: "color".into(),
                value: "blue".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn encode_is_deterministic() {
        let details = sample_details();
        let a = encode(&details);
        let b = encode(&details);
        assert_eq!(a, b);
        assert_eq!(a, encode(&details.clone()));
    }

    #[test]
    fn roundtrip_preserves_fields() {
        let details = sample_details();
        let back: CardDetails = decode(&encode(&details)).unwrap();
        assert_eq!(back, details);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut buf = encode(&sample_details());
        // Field 1000, varint 7 — a tag this schema has never defined.
        buf.extend_from_slice(&hex::decode("c03e07").unwrap());
        let back: CardDetails = decode(&buf).unwrap();
        assert_eq!(back.surname, "Doe");
    }

    #[test]
    fn truncated_message_is_rejected() {
        let buf = encode(&sample_details());
        assert!(decode::<CardDetails>(&buf[..buf.len() - 1]).is_err());
    }

    #[test]
    fn empty_buffer_decodes_to_default() {
        let ident: Identity = decode(&[]).unwrap();
        assert!(ident.surname.is_empty());
        assert!(ident.photo.is_empty());
    }
}
