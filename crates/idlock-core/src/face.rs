//! Face-descriptor engine seam.
//!
//! The real recognizer (a neural face embedder) is an external collaborator;
//! the engine only needs "give me one 128-dimensional descriptor per face in
//! this photo". Deployments plug their extractor in through [`FaceEngine`].
//!
//! [`HashFaceEngine`] is the built-in stand-in for development and tests:
//! fully deterministic, no models, no I/O. It reports exactly one face for
//! any non-empty input and none for an empty one, and derives the
//! descriptor from the image bytes alone — identical bytes produce an
//! identical descriptor, different bytes land far apart.

use sha2::{Digest, Sha512};

use crate::error::CardError;

/// Number of dimensions in a face descriptor.
pub const DESCRIPTOR_DIMS: usize = 128;

/// A raw face descriptor as produced by an engine.
pub type Descriptor = [f32; DESCRIPTOR_DIMS];

/// Narrow interface to the face recognizer.
pub trait FaceEngine: Send + Sync {
    /// Detect faces in `photo` and return one descriptor per face.
    ///
    /// An empty vector means no face was found. Errors are reserved for
    /// undecodable input.
    fn describe(&self, photo: &[u8]) -> Result<Vec<Descriptor>, CardError>;
}

/// Run an engine and insist on exactly one face.
pub(crate) fn describe_single(
    engine: &dyn FaceEngine,
    photo: &[u8],
) -> Result<Descriptor, CardError> {
    let faces = engine.describe(photo)?;
    match faces.len() {
        1 => Ok(faces[0]),
        n => Err(CardError::FaceCount { found: n }),
    }
}

/// Deterministic stand-in engine: SHA-512 counter-mode expansion of the
/// photo bytes into 128 floats in [-1, 1).
#[derive(Debug, Default, Clone, Copy)]
pub struct HashFaceEngine;

impl FaceEngine for HashFaceEngine {
    fn describe(&self, photo: &[u8]) -> Result<Vec<Descriptor>, CardError> {
        if photo.is_empty() {
            return Ok(Vec::new());
        }
        let seed = Sha512::digest(photo);
        let mut descriptor = [0f32; DESCRIPTOR_DIMS];
        let mut filled = 0;
        let mut counter = 0u32;
        while filled < DESCRIPTOR_DIMS {
            let mut h = Sha512::new();
            h.update(&seed);
            h.update(counter.to_le_bytes());
            let block = h.finalize();
            for chunk in block.chunks_exact(4) {
                if filled == DESCRIPTOR_DIMS {
                    break;
                }
                let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                // Map the top 24 bits onto [-1, 1).
                descriptor[filled] = (word >> 8) as f32 / (1 << 23) as f32 - 1.0;
                filled += 1;
            }
            counter += 1;
        }
        Ok(vec![descriptor])
    }
}
