//! Caller-side records — what an integrator hands the engine.

use crate::card::{Certificate, Date, Pair, PostalAddress};

/// Issuance input: the bearer's attributes, the unlock PIN, and optionally
/// the enrollment photo and extra attributes for either region.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Identity {
    #[prost(string, tag = "1")]
    pub surname: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub given_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub date_of_birth: ::core::option::Option<Date>,
    #[prost(string, tag = "4")]
    pub place_of_birth: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub pin: ::prost::alloc::string::String,
    /// Enrollment photo. Feeds the face template; never stored verbatim in
    /// the private region.
    #[prost(bytes = "vec", tag = "6")]
    pub photo: ::prost::alloc::vec::Vec<u8>,
    /// Extras destined for the public region only.
    #[prost(message, repeated, tag = "7")]
    pub pub_extra: ::prost::alloc::vec::Vec<Pair>,
    /// Extras destined for the private region only.
    #[prost(message, repeated, tag = "8")]
    pub priv_extra: ::prost::alloc::vec::Vec<Pair>,
    #[prost(string, tag = "9")]
    pub full_name: ::prost::alloc::string::String,
    #[prost(string, tag = "10")]
    pub uin: ::prost::alloc::string::String,
    #[prost(int32, tag = "11")]
    pub gender: i32,
    #[prost(message, optional, tag = "12")]
    pub postal_address: ::core::option::Option<PostalAddress>,
}

/// Kind discriminator for caller-supplied public keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum KeyKind {
    Ed25519Pub = 0,
}

/// A typed public key entry in a key set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PublicKeyEntry {
    #[prost(enumeration = "KeyKind", tag = "1")]
    pub kind: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub value: ::prost::alloc::vec::Vec<u8>,
}

/// Context initialization input.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeySet {
    /// 32-byte symmetric key for the private region.
    #[prost(bytes = "vec", tag = "1")]
    pub encryption_key: ::prost::alloc::vec::Vec<u8>,
    /// 64-byte Ed25519 signing key: seed ‖ public.
    #[prost(bytes = "vec", tag = "2")]
    pub signature_key: ::prost::alloc::vec::Vec<u8>,
    /// Trusted verification keys. Must not be empty.
    #[prost(message, repeated, tag = "3")]
    pub verification_keys: ::prost::alloc::vec::Vec<PublicKeyEntry>,
}

/// An ordered list of certificates, as handed to init or add_certificates.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CertificateList {
    #[prost(message, repeated, tag = "1")]
    pub certificates: ::prost::alloc::vec::Vec<Certificate>,
}
