//! Per-instance engine state.
//!
//! A [`Context`] owns the issuing keys, the trust configuration, and the
//! tuning knobs. All mutable state sits behind one mutex, so conventional
//! threads can share a context; operations are synchronous and observe a
//! total order. Every buffer handed back to the caller is an owning value
//! — cleanup is `Drop`, and secret material is wiped on the way out.

use std::collections::HashSet;

use ed25519_dalek::{Signature, Signer, SigningKey};
use parking_lot::Mutex;
use rand_core::CryptoRngCore;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use idlock_proto::{self as proto, Certificate, CertificateList, KeyKind, KeySet};

use crate::cert;
use crate::error::CardError;
use crate::face::{FaceEngine, HashFaceEngine};
use crate::ioctl::{Command, Reply};
use crate::qr::{self, EccLevel, QrMatrix};
use crate::template::TemplateDim;

/// Default face-distance thresholds, per template precision.
pub const DEFAULT_FACEDIFF_HALF: f32 = 0.42;
pub const DEFAULT_FACEDIFF_FULL: f32 = 0.60;

pub(crate) struct ContextState {
    pub(crate) encryption_key: Zeroizing<[u8; 32]>,
    pub(crate) signing_key: SigningKey,
    pub(crate) verification_keys: Vec<[u8; 32]>,
    pub(crate) facediff_half: f32,
    pub(crate) facediff_full: f32,
    pub(crate) dim: TemplateDim,
    pub(crate) acl: u64,
    pub(crate) ecc: EccLevel,
    pub(crate) root_certs: Vec<Certificate>,
    pub(crate) intermediate_certs: Vec<Certificate>,
    pub(crate) revoked: HashSet<[u8; 32]>,
}

impl ContextState {
    pub(crate) fn issuer_public(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub(crate) fn threshold(&self, dim: TemplateDim) -> f32 {
        match dim {
            TemplateDim::Half => self.facediff_half,
            TemplateDim::Full => self.facediff_full,
        }
    }

    pub(crate) fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

/// The engine instance. See the crate docs for the lifecycle.
pub struct Context {
    pub(crate) state: Mutex<ContextState>,
    pub(crate) engine: Box<dyn FaceEngine>,
    pub(crate) rng: Mutex<Box<dyn CryptoRngCore + Send>>,
    pub(crate) clock: fn() -> i64,
}

fn wall_clock() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Context {
    /// Initialize from a serialized [`KeySet`] and an optional serialized
    /// root-certificate list. Without roots the context still issues and
    /// verifies directly trusted cards, but has no chain-of-trust
    /// capability.
    pub fn init(keyset: &[u8], root_certs: Option<&[u8]>) -> Result<Self, CardError> {
        let keyset: KeySet = proto::decode(keyset)?;
        let roots = match root_certs {
            Some(buf) => proto::decode::<CertificateList>(buf)?.certificates,
            None => Vec::new(),
        };
        Self::new(keyset, roots)
    }

    /// Typed constructor behind [`Context::init`].
    pub fn new(keyset: KeySet, roots: Vec<Certificate>) -> Result<Self, CardError> {
        if keyset.encryption_key.len() != 32 {
            return Err(CardError::InvalidInput(format!(
                "encryption key must be 32 bytes, got {}",
                keyset.encryption_key.len()
            )));
        }
        let signing_key = signing_key_from_skpk(&keyset.signature_key)?;
        let issuer_public = signing_key.verifying_key().to_bytes();

        if keyset.verification_keys.is_empty() {
            return Err(CardError::InvalidInput(
                "key set must carry at least one verification key".into(),
            ));
        }
        let mut verification_keys = Vec::with_capacity(keyset.verification_keys.len() + 1);
        for entry in &keyset.verification_keys {
            if entry.kind != KeyKind::Ed25519Pub as i32 {
                return Err(CardError::InvalidInput(format!(
                    "unsupported verification key kind {}",
                    entry.kind
                )));
            }
            let key: [u8; 32] = entry.value.as_slice().try_into().map_err(|_| {
                CardError::InvalidInput(format!(
                    "verification key must be 32 bytes, got {}",
                    entry.value.len()
                ))
            })?;
            verification_keys.push(key);
        }
        // Invariant: the issuer's own public half is always a trusted
        // verification key.
        if !verification_keys.contains(&issuer_public) {
            verification_keys.push(issuer_public);
        }

        for root in &roots {
            cert::validate_anchor(root)?;
        }

        let mut encryption_key = Zeroizing::new([0u8; 32]);
        encryption_key.copy_from_slice(&keyset.encryption_key);

        debug!(
            verification_keys = verification_keys.len(),
            roots = roots.len(),
            "context initialized"
        );

        Ok(Context {
            state: Mutex::new(ContextState {
                encryption_key,
                signing_key,
                verification_keys,
                facediff_half: DEFAULT_FACEDIFF_HALF,
                facediff_full: DEFAULT_FACEDIFF_FULL,
                dim: TemplateDim::Half,
                acl: 0,
                ecc: EccLevel::Medium,
                root_certs: roots,
                intermediate_certs: Vec::new(),
                revoked: HashSet::new(),
            }),
            engine: Box::new(HashFaceEngine),
            rng: Mutex::new(Box::new(rand::rngs::OsRng)),
            clock: wall_clock,
        })
    }

    /// Replace the face engine (the default is the deterministic stand-in).
    pub fn with_engine(mut self, engine: impl FaceEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    /// Replace the randomness source. Issuance is byte-reproducible under a
    /// seeded RNG and a fixed clock.
    pub fn with_rng(self, rng: impl CryptoRngCore + Send + 'static) -> Self {
        *self.rng.lock() = Box::new(rng);
        self
    }

    /// Replace the created-at clock (seconds since the Unix epoch).
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    // ── Control channel ─────────────────────────────────────────────────

    /// Execute a typed control command.
    pub fn execute(&self, cmd: Command) -> Reply {
        let mut state = self.state.lock();
        match cmd {
            Command::SetFaceDiff(v) => {
                match state.dim {
                    TemplateDim::Half => state.facediff_half = v,
                    TemplateDim::Full => state.facediff_full = v,
                }
                Reply::None
            }
            Command::GetFaceDiff => Reply::FaceDiff(state.threshold(state.dim)),
            Command::SetDim(dim) => {
                state.dim = dim;
                Reply::None
            }
            Command::GetDim => Reply::Dim(state.dim),
            Command::SetEcc(ecc) => {
                state.ecc = ecc;
                Reply::None
            }
            Command::SetAcl(mask) => {
                state.acl = mask;
                Reply::None
            }
        }
    }

    /// Byte-protocol control entry point. Get-commands write their result
    /// back into the buffer after the opcode.
    pub fn ioctl(&self, buf: &mut [u8]) -> Result<(), CardError> {
        let cmd = Command::parse(buf)?;
        self.execute(cmd).write_back(buf)
    }

    // ── Trust management ────────────────────────────────────────────────

    /// Validate a serialized certificate list as a chain against the
    /// current anchors and append it to the intermediate pool.
    pub fn add_certificates(&self, list: &[u8]) -> Result<(), CardError> {
        let list: CertificateList = proto::decode(list)?;
        self.add_certificate_chain(list.certificates)
    }

    /// Typed variant of [`Context::add_certificates`].
    pub fn add_certificate_chain(&self, chain: Vec<Certificate>) -> Result<(), CardError> {
        let mut state = self.state.lock();
        if state.root_certs.is_empty() {
            warn!("rejected intermediate certificates: context has no trust anchors");
            return Err(CardError::ChainInvalid("context has no trust anchors"));
        }
        let anchors: Vec<Certificate> = state
            .root_certs
            .iter()
            .chain(state.intermediate_certs.iter())
            .cloned()
            .collect();
        cert::validate_chain(&chain, &anchors, &state.revoked)?;
        debug!(added = chain.len(), "intermediate certificates accepted");
        state.intermediate_certs.extend(chain);
        Ok(())
    }

    /// Add a public key to the revocation set. Chains containing it are
    /// invalid from this moment, including chains attached to cards that
    /// were already issued.
    pub fn add_revoked_key(&self, public_key: &[u8]) -> Result<(), CardError> {
        let key: [u8; 32] = public_key.try_into().map_err(|_| {
            CardError::InvalidInput(format!(
                "revoked key must be 32 bytes, got {}",
                public_key.len()
            ))
        })?;
        self.state.lock().revoked.insert(key);
        Ok(())
    }

    /// The issuer's public signing key.
    pub fn issuer_public_key(&self) -> [u8; 32] {
        self.state.lock().issuer_public()
    }

    // ── QR adapter ──────────────────────────────────────────────────────

    /// Render a payload as a QR module matrix at the context's current
    /// error-correction level.
    pub fn qr_bits(&self, payload: &[u8]) -> Result<QrMatrix, CardError> {
        let ecc = self.state.lock().ecc;
        qr::encode(payload, ecc)
    }
}

fn signing_key_from_skpk(skpk: &[u8]) -> Result<SigningKey, CardError> {
    if skpk.len() != 64 {
        return Err(CardError::InvalidInput(format!(
            "signature key must be 64 bytes, got {}",
            skpk.len()
        )));
    }
    let seed: [u8; 32] = skpk[..32].try_into().expect("checked length");
    let key = SigningKey::from_bytes(&seed);
    if key.verifying_key().to_bytes() != skpk[32..] {
        return Err(CardError::InvalidInput(
            "signature key public half does not match its seed".into(),
        ));
    }
    Ok(key)
}

/// Generate a fresh 32-byte symmetric key.
pub fn generate_encryption_key() -> Zeroizing<[u8; 32]> {
    let mut key = Zeroizing::new([0u8; 32]);
    rand_core::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut key[..]);
    key
}

/// Generate a fresh Ed25519 signing keypair. Returns the public half and
/// the 64-byte secret (seed ‖ public).
pub fn generate_secret_signature_keypair() -> ([u8; 32], Zeroizing<[u8; 64]>) {
    let key = SigningKey::generate(&mut rand::rngs::OsRng);
    let public = key.verifying_key().to_bytes();
    let mut skpk = Zeroizing::new([0u8; 64]);
    skpk[..32].copy_from_slice(&key.to_bytes());
    skpk[32..].copy_from_slice(&public);
    (public, skpk)
}
