//! Delegation certificates and chain validation.
//!
//! A certificate binds a subject public key to an issuer's signature over
//! it. Authority flows root → intermediate → leaf: a chain is valid when
//! every signature verifies, every link's issuer appears earlier in the
//! chain, the first link is issued by a trust anchor, and no key in the
//! chain is revoked. Cycles are rejected by a leaf-to-root walk over
//! visited subjects.

use std::collections::HashSet;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand_core::CryptoRngCore;

use idlock_proto::Certificate;

use crate::error::CardError;

/// A certificate together with the secret key behind its subject, able to
/// delegate further by signing child certificates.
pub struct CertHolder {
    secret: SigningKey,
    value: Certificate,
}

impl CertHolder {
    /// Fresh keypair, self-signed.
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    /// Self-signed certificate over a caller-supplied 64-byte signing key
    /// (seed ‖ public). The embedded public half must match the seed.
    pub fn from_secret_key(skpk: &[u8]) -> Result<Self, CardError> {
        if skpk.len() != 64 {
            return Err(CardError::InvalidInput(format!(
                "signing key must be 64 bytes, got {}",
                skpk.len()
            )));
        }
        let seed: [u8; 32] = skpk[..32].try_into().expect("checked length");
        let secret = SigningKey::from_bytes(&seed);
        if secret.verifying_key().to_bytes() != skpk[32..] {
            return Err(CardError::InvalidInput(
                "signing key public half does not match its seed".into(),
            ));
        }
        Ok(Self::from_signing_key(secret))
    }

    fn from_signing_key(secret: SigningKey) -> Self {
        let public = secret.verifying_key().to_bytes().to_vec();
        let signature = secret.sign(&public).to_bytes().to_vec();
        let value = Certificate {
            subject_public_key: public.clone(),
            signature,
            issuer_public_key: public,
        };
        Self { secret, value }
    }

    /// Sign a child certificate: overwrite its issuer with this subject and
    /// its signature with this key's signature over the child subject.
    pub fn sign(&self, child: &mut Certificate) {
        child.issuer_public_key = self.value.subject_public_key.clone();
        child.signature = self
            .secret
            .sign(&child.subject_public_key)
            .to_bytes()
            .to_vec();
    }

    /// The public certificate value, as attached to chains.
    pub fn value(&self) -> &Certificate {
        &self.value
    }

    /// Subject public key bytes.
    pub fn public_key(&self) -> [u8; 32] {
        self.secret.verifying_key().to_bytes()
    }
}

/// Detached Ed25519 verification over raw byte material. Malformed keys or
/// signatures simply fail to verify.
pub(crate) fn verify_detached(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(pk) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(vk) = VerifyingKey::from_bytes(&pk) else {
        return false;
    };
    let Ok(sig) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    vk.verify_strict(message, &Signature::from_bytes(&sig)).is_ok()
}

/// Does the certificate's signature verify under its own issuer key?
pub fn has_valid_signature(cert: &Certificate) -> bool {
    verify_detached(
        &cert.issuer_public_key,
        &cert.subject_public_key,
        &cert.signature,
    )
}

/// Subject and issuer are the same key, and the signature verifies.
pub fn is_self_signed(cert: &Certificate) -> bool {
    cert.subject_public_key == cert.issuer_public_key && has_valid_signature(cert)
}

fn is_revoked(key: &[u8], revoked: &HashSet<[u8; 32]>) -> bool {
    <[u8; 32]>::try_from(key)
        .map(|k| revoked.contains(&k))
        .unwrap_or(false)
}

/// Validate `chain` (issuance order) against the given anchors and
/// revocation set: signatures, revocation, back-references only, anchored
/// root edge, no cycles. The leaf rule — who may sign cards — is applied
/// by the verifier, not here.
pub(crate) fn validate_chain(
    chain: &[Certificate],
    anchors: &[Certificate],
    revoked: &HashSet<[u8; 32]>,
) -> Result<(), CardError> {
    if chain.is_empty() {
        return Err(CardError::ChainInvalid("empty certificate list"));
    }
    let anchor_subjects: HashSet<&[u8]> = anchors
        .iter()
        .map(|c| c.subject_public_key.as_slice())
        .collect();

    for cert in chain {
        if !has_valid_signature(cert) {
            return Err(CardError::ChainInvalid("certificate signature does not verify"));
        }
        // Only anchors may vouch for themselves.
        if cert.subject_public_key == cert.issuer_public_key {
            return Err(CardError::ChainInvalid("chain certificate is self-signed"));
        }
        if is_revoked(&cert.subject_public_key, revoked)
            || is_revoked(&cert.issuer_public_key, revoked)
        {
            return Err(CardError::ChainInvalid("certificate key is revoked"));
        }
    }

    // Ancestors must appear strictly earlier; forward references are cycles
    // in the making.
    for (i, cert) in chain.iter().enumerate().skip(1) {
        let grounded = chain[..i]
            .iter()
            .any(|p| p.subject_public_key == cert.issuer_public_key);
        if !grounded {
            return Err(CardError::ChainInvalid(
                "issuer does not appear earlier in the chain",
            ));
        }
    }

    if !anchor_subjects.contains(chain[0].issuer_public_key.as_slice()) {
        return Err(CardError::ChainInvalid("chain is not rooted in a trust anchor"));
    }

    // Leaf-to-root walk. Anchors terminate the walk and are never part of
    // the attached chain for cycle purposes.
    let mut visited: HashSet<&[u8]> = HashSet::new();
    let mut cur = chain.last().expect("chain is non-empty");
    loop {
        if !visited.insert(cur.subject_public_key.as_slice()) {
            return Err(CardError::ChainInvalid("cycle in certificate chain"));
        }
        if anchor_subjects.contains(cur.issuer_public_key.as_slice()) {
            break;
        }
        cur = chain
            .iter()
            .find(|c| c.subject_public_key == cur.issuer_public_key)
            .ok_or(CardError::ChainInvalid("issuer does not appear in the chain"))?;
    }

    Ok(())
}

/// A usable trust anchor is self-signed with a verifying signature.
pub(crate) fn validate_anchor(cert: &Certificate) -> Result<(), CardError> {
    if !is_self_signed(cert) {
        return Err(CardError::ChainInvalid(
            "trust anchor must be self-signed with a valid signature",
        ));
    }
    Ok(())
}
