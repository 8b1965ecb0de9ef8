use thiserror::Error;

/// Engine-wide error type.
///
/// The variants are deliberately coarse. Every authentication failure —
/// bad signature, AEAD tag mismatch, wrong PIN, face too far — collapses
/// into [`CardError::NotAuthorized`] so a caller (or an attacker driving
/// one) cannot tell which check failed. Chain problems are only reported
/// as [`CardError::ChainInvalid`] from chain-management entry points; at
/// verification time they are folded into `NotAuthorized` too.
#[derive(Debug, Error)]
pub enum CardError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("expected exactly one face, found {found}")]
    FaceCount { found: usize },

    #[error("not authorized")]
    NotAuthorized,

    #[error("certificate chain invalid: {0}")]
    ChainInvalid(&'static str),

    #[error("resource failure: {0}")]
    Resource(String),
}

impl From<idlock_proto::ProtoError> for CardError {
    fn from(err: idlock_proto::ProtoError) -> Self {
        CardError::InvalidInput(err.to_string())
    }
}

impl CardError {
    /// Collapse chain diagnostics into the opaque verification outcome.
    pub(crate) fn opaque(self) -> Self {
        match self {
            CardError::ChainInvalid(_) => CardError::NotAuthorized,
            other => other,
        }
    }
}
