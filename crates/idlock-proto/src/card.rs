//! Card-side records — everything that ends up inside the QR container.
//!
//! Container nesting, outermost first:
//!
//! ```text
//! CardBundle
//! ├── PublicSignedCard  (cleartext, issuer-signed)
//! ├── encrypted_card    (nonce ‖ AEAD ciphertext of a SignedInnerCard)
//! └── certificates      (delegation chain, issuance order)
//! ```

/// Calendar date. Zero fields mean "not provided".
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Date {
    #[prost(int32, tag = "1")]
    pub year: i32,
    #[prost(int32, tag = "2")]
    pub month: i32,
    #[prost(int32, tag = "3")]
    pub day: i32,
}

/// Free-form key/value attribute.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pair {
    #[prost(string, tag = "1")]
    pub key: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub value: ::prost::alloc::string::String,
}

/// A bag of pairs, used where a standalone extras list crosses the boundary.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Dictionary {
    #[prost(message, repeated, tag = "1")]
    pub pairs: ::prost::alloc::vec::Vec<Pair>,
}

/// Structured postal address, loosely after the universal postal format.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PostalAddress {
    #[prost(string, tag = "1")]
    pub language_code: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub recipient: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub organization: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "4")]
    pub address_lines: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, tag = "5")]
    pub locality: ::prost::alloc::string::String,
    #[prost(string, tag = "6")]
    pub region: ::prost::alloc::string::String,
    #[prost(string, tag = "7")]
    pub postal_code: ::prost::alloc::string::String,
    #[prost(string, tag = "8")]
    pub country_code: ::prost::alloc::string::String,
}

/// The bearer's biographic record. Appears twice per card: the complete set
/// in the private region, and the mask-selected subset in the public region.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CardDetails {
    #[prost(string, tag = "1")]
    pub surname: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub given_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub date_of_birth: ::core::option::Option<Date>,
    #[prost(string, tag = "4")]
    pub place_of_birth: ::prost::alloc::string::String,
    /// Issuance timestamp, seconds since the Unix epoch.
    #[prost(int64, tag = "5")]
    pub created_at: i64,
    #[prost(message, repeated, tag = "6")]
    pub extra: ::prost::alloc::vec::Vec<Pair>,
    #[prost(string, tag = "7")]
    pub full_name: ::prost::alloc::string::String,
    /// Unique identification number, issuer-assigned.
    #[prost(string, tag = "8")]
    pub uin: ::prost::alloc::string::String,
    #[prost(int32, tag = "9")]
    pub gender: i32,
    #[prost(message, optional, tag = "10")]
    pub postal_address: ::core::option::Option<PostalAddress>,
    /// Raw photo bytes. Only populated in the public region, and only when
    /// the visibility mask explicitly requests it.
    #[prost(bytes = "vec", tag = "11")]
    pub photo: ::prost::alloc::vec::Vec<u8>,
}

/// What it takes to open the card at presentation time.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CardAccess {
    #[prost(string, tag = "1")]
    pub pin: ::prost::alloc::string::String,
    /// Encoded face template: 512 bytes (full) or 128 bytes (half).
    #[prost(bytes = "vec", tag = "2")]
    pub face: ::prost::alloc::vec::Vec<u8>,
}

/// The private half of a card before signing and encryption.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InnerCard {
    #[prost(message, optional, tag = "1")]
    pub access: ::core::option::Option<CardAccess>,
    #[prost(message, optional, tag = "2")]
    pub details: ::core::option::Option<CardDetails>,
    /// Per-card Ed25519 keypair, 64 bytes: seed ‖ public.
    #[prost(bytes = "vec", tag = "3")]
    pub signing_key: ::prost::alloc::vec::Vec<u8>,
}

/// Inner card plus the issuer's detached signature over its encoding.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedInnerCard {
    #[prost(message, optional, tag = "1")]
    pub card: ::core::option::Option<InnerCard>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub signer_public_key: ::prost::alloc::vec::Vec<u8>,
}

/// The cleartext region: masked details plus the issuer's signature.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PublicSignedCard {
    #[prost(message, optional, tag = "1")]
    pub details: ::core::option::Option<CardDetails>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub signer_public_key: ::prost::alloc::vec::Vec<u8>,
}

/// Delegation certificate: the issuer key vouches for the subject key.
/// Self-signed when subject and issuer are the same key.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Certificate {
    #[prost(bytes = "vec", tag = "1")]
    pub subject_public_key: ::prost::alloc::vec::Vec<u8>,
    /// Issuer's Ed25519 signature over the subject public key.
    #[prost(bytes = "vec", tag = "2")]
    pub signature: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub issuer_public_key: ::prost::alloc::vec::Vec<u8>,
}

/// The serialized artifact that travels in the QR code.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CardBundle {
    #[prost(message, optional, tag = "1")]
    pub public_card: ::core::option::Option<PublicSignedCard>,
    /// 12-byte nonce ‖ ChaCha20-Poly1305 ciphertext of a SignedInnerCard.
    #[prost(bytes = "vec", tag = "2")]
    pub encrypted_card: ::prost::alloc::vec::Vec<u8>,
    /// Attached delegation chain, issuance order. Empty for directly
    /// trusted issuers.
    #[prost(message, repeated, tag = "3")]
    pub certificates: ::prost::alloc::vec::Vec<Certificate>,
}
