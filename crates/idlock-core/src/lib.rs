//! idlock-core — portable offline identity-card engine
//!
//! Issues, encodes and verifies tamper-evident personal ID credentials
//! small enough to live in a QR code. A card binds biographic attributes
//! and a face template to a fresh per-card keypair, signed by an issuer
//! whose authority may run through a delegation chain rooted in a trust
//! anchor. Verification works fully offline: signatures, chain, decryption
//! and a live factor (face, PIN, or precomputed template).
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Authentication failures are indistinguishable to the caller.
//!
//! # Module layout
//! - `context`  — per-instance state: keys, thresholds, trust configuration
//! - `card`     — issue / verify lifecycle and per-card key operations
//! - `cert`     — delegation certificates and chain validation
//! - `template` — face template codec and distance
//! - `face`     — face-engine seam (+ deterministic stand-in)
//! - `ioctl`    — typed control commands and the byte protocol
//! - `qr`       — QR bit-matrix adapter
//! - `bin16`    — fixed-width packing, half-float codec, constant-time eq
//! - `error`    — unified error type
//!
//! # Example
//! ```
//! use idlock_core::{generate_encryption_key, generate_secret_signature_keypair, Context};
//! use idlock_proto::{Identity, KeyKind, KeySet, PublicKeyEntry};
//!
//! let (public, skpk) = generate_secret_signature_keypair();
//! let keyset = KeySet {
//!     encryption_key: generate_encryption_key().to_vec(),
//!     signature_key: skpk.to_vec(),
//!     verification_keys: vec![PublicKeyEntry {
//!         kind: KeyKind::Ed25519Pub as i32,
//!         value: public.to_vec(),
//!     }],
//! };
//! let ctx = Context::new(keyset, Vec::new()).unwrap();
//!
//! let ident = Identity {
//!     surname: "Doe".into(),
//!     given_name: "Jane".into(),
//!     pin: "12345".into(),
//!     ..Default::default()
//! };
//! let card = ctx.issue(&ident).unwrap();
//! let details = ctx.verify_card_with_pin(&card, "12345").unwrap();
//! assert_eq!(details.surname, "Doe");
//! ```

pub mod bin16;
pub mod card;
pub mod cert;
pub mod context;
pub mod error;
pub mod face;
pub mod ioctl;
pub mod qr;
pub mod template;

pub use card::{decrypt_signed_inner, merge_details};
pub use cert::CertHolder;
pub use context::{
    generate_encryption_key, generate_secret_signature_keypair, Context, DEFAULT_FACEDIFF_FULL,
    DEFAULT_FACEDIFF_HALF,
};
pub use error::CardError;
pub use face::{Descriptor, FaceEngine, HashFaceEngine};
pub use ioctl::{detail, Command, Reply};
pub use qr::{EccLevel, QrMatrix};
pub use template::{distance as compare_templates, TemplateDim};
