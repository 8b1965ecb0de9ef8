//! Card lifecycle: assemble, split, sign, encrypt on the way out;
//! verify, decrypt, match on the way back in.
//!
//! Issuance path: identity + photo → face template → private/public detail
//! records split by the visibility mask → issuer signatures over both →
//! AEAD over the private half → one serialized bundle with the delegation
//! chain attached.
//!
//! Verification reverses it: chain first, then signatures, then
//! decryption, then the presented factor (face, PIN, or template). Every
//! authentication failure is reported as the same opaque outcome.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce, XChaCha20Poly1305, XNonce,
};
use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signer, SigningKey};
use hkdf::Hkdf;
use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, warn};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

use idlock_proto::{
    self as proto, CardAccess, CardBundle, CardDetails, Identity, InnerCard, PublicSignedCard,
    SignedInnerCard,
};

use crate::bin16;
use crate::cert;
use crate::context::{Context, ContextState};
use crate::error::CardError;
use crate::face::{self, Descriptor};
use crate::ioctl::detail;
use crate::template::{self, TemplateDim};

const BOX_INFO: &[u8] = b"idlock-card-box-v1";

impl Context {
    // ── Issuance ────────────────────────────────────────────────────────

    /// Issue a card from a serialized [`Identity`]. Returns the serialized
    /// container that goes into the QR code.
    pub fn create_card_with_face(&self, ident: &[u8]) -> Result<Vec<u8>, CardError> {
        let ident: Identity = proto::decode(ident)?;
        self.issue(&ident)
    }

    /// Typed issuance. The identity must carry a photo or a PIN; without a
    /// photo the card is PIN-only and face verification will always fail
    /// on it.
    pub fn issue(&self, ident: &Identity) -> Result<Vec<u8>, CardError> {
        if ident.photo.is_empty() && ident.pin.is_empty() {
            return Err(CardError::InvalidInput(
                "identity must carry a photo or a PIN".into(),
            ));
        }

        // The face engine may be slow; keep it outside the state lock.
        let dim = self.state.lock().dim;
        let face = if ident.photo.is_empty() {
            Vec::new()
        } else {
            let descriptor = face::describe_single(&*self.engine, &ident.photo)?;
            template::encode(&descriptor, dim)
        };

        let state = self.state.lock();
        let created_at = (self.clock)();
        let private = private_details(ident, created_at);
        let public = public_details(ident, state.acl, created_at);

        let mut rng = self.rng.lock();
        let mut seed = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(&mut seed[..]);
        let card_key = SigningKey::from_bytes(&seed);
        let mut skpk = Zeroizing::new([0u8; 64]);
        skpk[..32].copy_from_slice(&seed[..]);
        skpk[32..].copy_from_slice(&card_key.verifying_key().to_bytes());

        let issuer_public = state.issuer_public().to_vec();

        let inner = InnerCard {
            access: Some(CardAccess {
                pin: ident.pin.clone(),
                face,
            }),
            details: Some(private),
            signing_key: skpk.to_vec(),
        };
        let inner_bytes = Zeroizing::new(proto::encode(&inner));
        let signed = SignedInnerCard {
            signature: state.sign(&inner_bytes).to_bytes().to_vec(),
            card: Some(inner),
            signer_public_key: issuer_public.clone(),
        };
        let signed_bytes = Zeroizing::new(proto::encode(&signed));

        let mut nonce = [0u8; 12];
        rng.fill_bytes(&mut nonce);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&state.encryption_key[..]));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), signed_bytes.as_slice())
            .map_err(|_| CardError::Resource("private region encryption failed".into()))?;
        let mut encrypted_card = Vec::with_capacity(12 + ciphertext.len());
        encrypted_card.extend_from_slice(&nonce);
        encrypted_card.extend_from_slice(&ciphertext);

        let public_bytes = proto::encode(&public);
        let public_card = PublicSignedCard {
            signature: state.sign(&public_bytes).to_bytes().to_vec(),
            details: Some(public),
            signer_public_key: issuer_public,
        };

        let bundle = CardBundle {
            public_card: Some(public_card),
            encrypted_card,
            certificates: state.intermediate_certs.clone(),
        };
        debug!(certificates = bundle.certificates.len(), "card issued");
        Ok(proto::encode(&bundle))
    }

    // ── Verification ────────────────────────────────────────────────────

    /// Verify a card against a live photo. On success returns the private
    /// details record.
    pub fn verify_card_with_face(
        &self,
        card: &[u8],
        photo: &[u8],
    ) -> Result<CardDetails, CardError> {
        let signed = self.open_card(card)?;
        let inner = signed.card.ok_or(CardError::NotAuthorized)?;
        let access = inner.access.as_ref().ok_or(CardError::NotAuthorized)?;
        if access.face.is_empty() {
            // PIN-only card: there is no enrolled biometric to match.
            return Err(CardError::NotAuthorized);
        }
        let stored_dim = template::dim_of(&access.face).map_err(|_| CardError::NotAuthorized)?;
        let descriptor = face::describe_single(&*self.engine, photo)?;
        let presented = template::encode(&descriptor, stored_dim);
        let dist =
            template::distance(&access.face, &presented).map_err(|_| CardError::NotAuthorized)?;
        let threshold = self.state.lock().threshold(stored_dim);
        if dist <= threshold {
            inner.details.ok_or(CardError::NotAuthorized)
        } else {
            debug!(distance = dist, threshold, "face distance above threshold");
            Err(CardError::NotAuthorized)
        }
    }

    /// Verify a card against a PIN, compared in constant time.
    pub fn verify_card_with_pin(&self, card: &[u8], pin: &str) -> Result<CardDetails, CardError> {
        let signed = self.open_card(card)?;
        let inner = signed.card.ok_or(CardError::NotAuthorized)?;
        let access = inner.access.as_ref().ok_or(CardError::NotAuthorized)?;
        if access.pin.is_empty() {
            return Err(CardError::NotAuthorized);
        }
        if bin16::ct_eq(access.pin.as_bytes(), pin.as_bytes()) {
            inner.details.ok_or(CardError::NotAuthorized)
        } else {
            Err(CardError::NotAuthorized)
        }
    }

    /// Verify a card against a precomputed template: either a 512-byte
    /// full encoding (which doubles as 128 raw little-endian floats) or a
    /// 128-byte half encoding. The input is re-encoded to the stored
    /// precision; a half input cannot be promoted to full.
    pub fn verify_card_with_template(
        &self,
        card: &[u8],
        input: &[u8],
    ) -> Result<CardDetails, CardError> {
        let input_dim = template::dim_of(input)?;
        let signed = self.open_card(card)?;
        let inner = signed.card.ok_or(CardError::NotAuthorized)?;
        let access = inner.access.as_ref().ok_or(CardError::NotAuthorized)?;
        if access.face.is_empty() {
            return Err(CardError::NotAuthorized);
        }
        let stored_dim = template::dim_of(&access.face).map_err(|_| CardError::NotAuthorized)?;

        let presented = match (input_dim, stored_dim) {
            (TemplateDim::Full, TemplateDim::Half) => {
                let floats = template::decode(input)?;
                let mut descriptor: Descriptor = [0f32; 128];
                descriptor.copy_from_slice(&floats);
                template::encode_half(&descriptor)
            }
            (TemplateDim::Half, TemplateDim::Full) => {
                return Err(CardError::InvalidInput(
                    "cannot promote a half template to full precision".into(),
                ));
            }
            _ => input.to_vec(),
        };

        let dist =
            template::distance(&access.face, &presented).map_err(|_| CardError::NotAuthorized)?;
        let threshold = self.state.lock().threshold(stored_dim);
        if dist <= threshold {
            inner.details.ok_or(CardError::NotAuthorized)
        } else {
            Err(CardError::NotAuthorized)
        }
    }

    /// Validate the attached chain and the public-region signature, and
    /// report how many certificates the card carries. Zero means the card
    /// has no attached chain but is signed by this context's issuer key.
    pub fn verify_certificate_count(&self, card: &[u8]) -> Result<usize, CardError> {
        let bundle: CardBundle = proto::decode(card)?;
        let state = self.state.lock();
        let count = validate_card_chain(&state, &bundle).map_err(CardError::opaque)?;
        verify_public_region(&bundle)?;
        Ok(count)
    }

    // ── Per-card key operations ─────────────────────────────────────────

    /// Sign a payload with the card's own key. Requires the card to fully
    /// verify first.
    pub fn sign_with_card(&self, card: &[u8], payload: &[u8]) -> Result<[u8; 64], CardError> {
        let key = self.card_signing_key(card)?;
        Ok(key.sign(payload).to_bytes())
    }

    /// Verify a payload signature made by a card key.
    pub fn verify_with_card(
        &self,
        payload: &[u8],
        signature: &[u8],
        card_public_key: &[u8],
    ) -> Result<(), CardError> {
        if cert::verify_detached(card_public_key, payload, signature) {
            Ok(())
        } else {
            Err(CardError::NotAuthorized)
        }
    }

    /// Encrypt a payload to the card itself. The card's Ed25519 keypair is
    /// converted to X25519 and the payload sealed with an authenticated
    /// box; output is a 24-byte nonce followed by the ciphertext.
    pub fn encrypt_with_card(&self, card: &[u8], payload: &[u8]) -> Result<Vec<u8>, CardError> {
        let key = self.card_box_key(card)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
        let mut nonce = [0u8; 24];
        self.rng.lock().fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), payload)
            .map_err(|_| CardError::Resource("card box encryption failed".into()))?;
        let mut out = Vec::with_capacity(24 + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Reverse of [`Context::encrypt_with_card`].
    pub fn decrypt_with_card(
        &self,
        card: &[u8],
        data: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CardError> {
        if data.len() < 24 {
            return Err(CardError::NotAuthorized);
        }
        let key = self.card_box_key(card)?;
        let (nonce, ciphertext) = data.split_at(24);
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
        let plaintext = cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CardError::NotAuthorized)?;
        Ok(Zeroizing::new(plaintext))
    }

    // ── Face engine passthroughs ────────────────────────────────────────

    /// Run the face engine on a photo, requiring exactly one face.
    pub fn face_descriptor(&self, photo: &[u8]) -> Result<Descriptor, CardError> {
        face::describe_single(&*self.engine, photo)
    }

    /// Full-precision template of the single face in a photo.
    pub fn face_template_full(&self, photo: &[u8]) -> Result<Vec<u8>, CardError> {
        Ok(template::encode_full(&self.face_descriptor(photo)?))
    }

    /// Half-precision template of the single face in a photo.
    pub fn face_template_half(&self, photo: &[u8]) -> Result<Vec<u8>, CardError> {
        Ok(template::encode_half(&self.face_descriptor(photo)?))
    }

    /// Distance between the faces in two photos, measured at the context's
    /// current template precision.
    pub fn compare_face_photos(&self, a: &[u8], b: &[u8]) -> Result<f32, CardError> {
        let dim = self.state.lock().dim;
        let da = self.face_descriptor(a)?;
        let db = self.face_descriptor(b)?;
        template::distance(&template::encode(&da, dim), &template::encode(&db, dim))
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Full verification short of a presented factor: chain, public
    /// signature, decryption, inner signature, signer consistency.
    fn open_card(&self, card: &[u8]) -> Result<SignedInnerCard, CardError> {
        let bundle: CardBundle = proto::decode(card)?;
        let state = self.state.lock();
        validate_card_chain(&state, &bundle).map_err(CardError::opaque)?;
        verify_public_region(&bundle)?;

        let signed = decrypt_signed_inner(&bundle.encrypted_card, &state.encryption_key[..])
            .map_err(CardError::opaque)?;
        let inner = signed.card.as_ref().ok_or(CardError::NotAuthorized)?;
        let inner_bytes = Zeroizing::new(proto::encode(inner));
        if !cert::verify_detached(&signed.signer_public_key, &inner_bytes, &signed.signature) {
            return Err(CardError::NotAuthorized);
        }
        let public_signer = bundle
            .public_card
            .as_ref()
            .map(|p| p.signer_public_key.as_slice())
            .unwrap_or_default();
        if signed.signer_public_key != public_signer {
            return Err(CardError::NotAuthorized);
        }
        Ok(signed)
    }

    /// The card's own signing key, released only after the card verifies.
    fn card_signing_key(&self, card: &[u8]) -> Result<SigningKey, CardError> {
        let signed = self.open_card(card)?;
        let inner = signed.card.ok_or(CardError::NotAuthorized)?;
        if inner.signing_key.len() != 64 {
            return Err(CardError::NotAuthorized);
        }
        let seed: [u8; 32] = inner.signing_key[..32]
            .try_into()
            .expect("checked length");
        let key = SigningKey::from_bytes(&seed);
        if key.verifying_key().to_bytes() != inner.signing_key[32..] {
            return Err(CardError::NotAuthorized);
        }
        Ok(key)
    }

    /// Symmetric key for the card's sealed-to-self box: X25519 shared
    /// secret of the card key with itself, expanded through HKDF.
    fn card_box_key(&self, card: &[u8]) -> Result<Zeroizing<[u8; 32]>, CardError> {
        let key = self.card_signing_key(card)?;
        let x_secret = ed25519_secret_to_x25519(&key.to_bytes());
        let x_public = ed25519_pub_to_x25519(&key.verifying_key().to_bytes())
            .ok_or(CardError::NotAuthorized)?;
        let shared = x_secret.diffie_hellman(&x_public);
        let mut out = Zeroizing::new([0u8; 32]);
        Hkdf::<Sha256>::new(None, shared.as_bytes())
            .expand(BOX_INFO, &mut out[..])
            .map_err(|_| CardError::Resource("card box key derivation failed".into()))?;
        Ok(out)
    }
}

/// Decrypt and decode a card's private region under an explicitly supplied
/// 32-byte key. Authentication failures are opaque.
pub fn decrypt_signed_inner(blob: &[u8], key: &[u8]) -> Result<SignedInnerCard, CardError> {
    if key.len() != 32 {
        return Err(CardError::InvalidInput(format!(
            "decryption key must be 32 bytes, got {}",
            key.len()
        )));
    }
    if blob.len() <= 12 {
        return Err(CardError::NotAuthorized);
    }
    let (nonce, ciphertext) = blob.split_at(12);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CardError::NotAuthorized)?,
    );
    Ok(proto::decode(&plaintext)?)
}

/// Field-wise union of two detail records; `overlay` wins where both carry
/// a value, extras are unioned by key with `overlay` winning collisions.
pub fn merge_details(base: &CardDetails, overlay: &CardDetails) -> CardDetails {
    let mut out = base.clone();
    if !overlay.surname.is_empty() {
        out.surname = overlay.surname.clone();
    }
    if !overlay.given_name.is_empty() {
        out.given_name = overlay.given_name.clone();
    }
    if overlay.date_of_birth.is_some() {
        out.date_of_birth = overlay.date_of_birth;
    }
    if !overlay.place_of_birth.is_empty() {
        out.place_of_birth = overlay.place_of_birth.clone();
    }
    if overlay.created_at != 0 {
        out.created_at = overlay.created_at;
    }
    if !overlay.full_name.is_empty() {
        out.full_name = overlay.full_name.clone();
    }
    if !overlay.uin.is_empty() {
        out.uin = overlay.uin.clone();
    }
    if overlay.gender != 0 {
        out.gender = overlay.gender;
    }
    if overlay.postal_address.is_some() {
        out.postal_address = overlay.postal_address.clone();
    }
    if !overlay.photo.is_empty() {
        out.photo = overlay.photo.clone();
    }
    for pair in &overlay.extra {
        match out.extra.iter_mut().find(|p| p.key == pair.key) {
            Some(existing) => existing.value = pair.value.clone(),
            None => out.extra.push(pair.clone()),
        }
    }
    out
}

fn private_details(ident: &Identity, created_at: i64) -> CardDetails {
    CardDetails {
        surname: ident.surname.clone(),
        given_name: ident.given_name.clone(),
        date_of_birth: ident.date_of_birth,
        place_of_birth: ident.place_of_birth.clone(),
        created_at,
        extra: ident.priv_extra.clone(),
        full_name: ident.full_name.clone(),
        uin: ident.uin.clone(),
        gender: ident.gender,
        postal_address: ident.postal_address.clone(),
        photo: Vec::new(),
    }
}

fn public_details(ident: &Identity, acl: u64, created_at: i64) -> CardDetails {
    let mut out = CardDetails {
        extra: ident.pub_extra.clone(),
        ..Default::default()
    };
    if acl & detail::SURNAME != 0 {
        out.surname = ident.surname.clone();
    }
    if acl & detail::GIVEN_NAME != 0 {
        out.given_name = ident.given_name.clone();
    }
    if acl & detail::DATE_OF_BIRTH != 0 {
        out.date_of_birth = ident.date_of_birth;
    }
    if acl & detail::PLACE_OF_BIRTH != 0 {
        out.place_of_birth = ident.place_of_birth.clone();
    }
    if acl & detail::CREATED_AT != 0 {
        out.created_at = created_at;
    }
    if acl & detail::FULL_NAME != 0 {
        out.full_name = ident.full_name.clone();
    }
    if acl & detail::UIN != 0 {
        out.uin = ident.uin.clone();
    }
    if acl & detail::GENDER != 0 {
        out.gender = ident.gender;
    }
    if acl & detail::POSTAL_ADDRESS != 0 {
        out.postal_address = ident.postal_address.clone();
    }
    if acl & detail::PHOTO != 0 && !ident.photo.is_empty() {
        warn!("visibility mask exposes the raw photo in the public region");
        out.photo = ident.photo.clone();
    }
    out
}

fn verify_public_region(bundle: &CardBundle) -> Result<(), CardError> {
    let public_card = bundle.public_card.as_ref().ok_or(CardError::NotAuthorized)?;
    let details = public_card.details.as_ref().ok_or(CardError::NotAuthorized)?;
    let details_bytes = proto::encode(details);
    if !cert::verify_detached(
        &public_card.signer_public_key,
        &details_bytes,
        &public_card.signature,
    ) {
        return Err(CardError::NotAuthorized);
    }
    Ok(())
}

/// Chain rules for a presented card. Returns the validated chain length;
/// an empty chain is acceptable only when the card is signed directly by
/// this context's issuer key.
fn validate_card_chain(state: &ContextState, bundle: &CardBundle) -> Result<usize, CardError> {
    let signer = bundle
        .public_card
        .as_ref()
        .map(|p| p.signer_public_key.as_slice())
        .unwrap_or_default();
    let issuer = state.issuer_public();

    if bundle.certificates.is_empty() {
        if signer == issuer.as_slice() {
            return Ok(0);
        }
        return Err(CardError::ChainInvalid(
            "chainless card is not signed by the context issuer",
        ));
    }

    cert::validate_chain(&bundle.certificates, &state.root_certs, &state.revoked)?;

    let leaf = bundle.certificates.last().expect("chain is non-empty");
    if leaf.subject_public_key != signer {
        return Err(CardError::ChainInvalid(
            "card signer does not match the chain leaf",
        ));
    }
    let authorized = signer == issuer.as_slice()
        || <[u8; 32]>::try_from(signer)
            .map(|k| state.verification_keys.contains(&k))
            .unwrap_or(false);
    if !authorized {
        return Err(CardError::ChainInvalid(
            "chain leaf is not a trusted issuer key",
        ));
    }
    Ok(bundle.certificates.len())
}

/// Ed25519 seed → X25519 static secret: SHA-512 expansion clamped per
/// RFC 7748 §5, the canonical construction.
fn ed25519_secret_to_x25519(seed: &[u8; 32]) -> StaticSecret {
    let mut h = Sha512::digest(seed);
    h[0] &= 248;
    h[31] &= 127;
    h[31] |= 64;
    let mut key = [0u8; 32];
    key.copy_from_slice(&h[..32]);
    h.as_mut_slice().zeroize();
    StaticSecret::from(key)
}

/// Ed25519 public key → X25519 public key via the Edwards→Montgomery map.
fn ed25519_pub_to_x25519(ed_pub: &[u8; 32]) -> Option<X25519Public> {
    let point = CompressedEdwardsY::from_slice(ed_pub).ok()?.decompress()?;
    Some(X25519Public::from(point.to_montgomery().to_bytes()))
}
