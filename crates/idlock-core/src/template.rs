//! Face template codec.
//!
//! A descriptor is stored in one of two encodings, chosen per context:
//!
//! - **full**: all 128 dimensions as 32-bit floats → 512 bytes
//! - **half**: the first 64 dimensions as 16-bit floats → 128 bytes
//!
//! Distance is plain Euclidean over the decoded vectors. Operands must
//! decode to the same dimensionality; everything else is invalid input.

use crate::bin16;
use crate::error::CardError;
use crate::face::Descriptor;

/// Byte length of a full-precision template.
pub const FULL_LEN: usize = 512;
/// Byte length of a half-precision template.
pub const HALF_LEN: usize = 128;

/// Template precision selector, the context's dimension flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateDim {
    /// 64 dimensions, 16-bit floats.
    Half,
    /// 128 dimensions, 32-bit floats.
    Full,
}

impl TemplateDim {
    pub(crate) fn from_byte(b: u8) -> Result<Self, CardError> {
        match b {
            0 => Ok(TemplateDim::Half),
            1 => Ok(TemplateDim::Full),
            other => Err(CardError::InvalidInput(format!(
                "dimension flag must be 0 or 1, got {other}"
            ))),
        }
    }

    pub(crate) fn as_byte(self) -> u8 {
        match self {
            TemplateDim::Half => 0,
            TemplateDim::Full => 1,
        }
    }
}

/// Encode all 128 dimensions at full precision.
pub fn encode_full(descriptor: &Descriptor) -> Vec<u8> {
    bin16::f32s_to_bytes(descriptor)
}

/// Encode the first 64 dimensions at half precision.
pub fn encode_half(descriptor: &Descriptor) -> Vec<u8> {
    bin16::f32s_to_f16_bytes(&descriptor[..64])
}

/// Encode a descriptor in the given precision.
pub fn encode(descriptor: &Descriptor, dim: TemplateDim) -> Vec<u8> {
    match dim {
        TemplateDim::Half => encode_half(descriptor),
        TemplateDim::Full => encode_full(descriptor),
    }
}

/// Decode a stored template into its float vector.
pub fn decode(template: &[u8]) -> Result<Vec<f32>, CardError> {
    match template.len() {
        FULL_LEN => bin16::bytes_to_f32s(template)
            .ok_or_else(|| CardError::InvalidInput("unaligned full template".into())),
        HALF_LEN => bin16::f16_bytes_to_f32s(template)
            .ok_or_else(|| CardError::InvalidInput("unaligned half template".into())),
        n => Err(CardError::InvalidInput(format!(
            "template must be {FULL_LEN} or {HALF_LEN} bytes, got {n}"
        ))),
    }
}

/// Precision of an encoded template, judged by length.
pub fn dim_of(template: &[u8]) -> Result<TemplateDim, CardError> {
    match template.len() {
        FULL_LEN => Ok(TemplateDim::Full),
        HALF_LEN => Ok(TemplateDim::Half),
        n => Err(CardError::InvalidInput(format!(
            "template must be {FULL_LEN} or {HALF_LEN} bytes, got {n}"
        ))),
    }
}

/// Euclidean distance between two encoded templates of equal precision.
pub fn distance(a: &[u8], b: &[u8]) -> Result<f32, CardError> {
    if a.len() != b.len() {
        return Err(CardError::InvalidInput(format!(
            "template lengths differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let va = decode(a)?;
    let vb = decode(b)?;
    let sum: f32 = va.iter().zip(&vb).map(|(x, y)| (x - y) * (x - y)).sum();
    Ok(sum.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(seed: f32) -> Descriptor {
        let mut d = [0f32; 128];
        for (i, v) in d.iter_mut().enumerate() {
            *v = seed + i as f32 * 0.01 - 0.64;
        }
        d
    }

    #[test]
    fn encoded_lengths() {
        let d = descriptor(0.1);
        assert_eq!(encode_full(&d).len(), FULL_LEN);
        assert_eq!(encode_half(&d).len(), HALF_LEN);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let d = descriptor(0.3);
        assert_eq!(distance(&encode_full(&d), &encode_full(&d)).unwrap(), 0.0);
        assert_eq!(distance(&encode_half(&d), &encode_half(&d)).unwrap(), 0.0);
    }

    #[test]
    fn distance_grows_with_perturbation() {
        let a = descriptor(0.0);
        let mut b = a;
        b[0] += 0.5;
        let full = distance(&encode_full(&a), &encode_full(&b)).unwrap();
        assert!((full - 0.5).abs() < 1e-3);
        let half = distance(&encode_half(&a), &encode_half(&b)).unwrap();
        assert!((half - 0.5).abs() < 1e-2);
    }

    #[test]
    fn mixed_precision_is_rejected() {
        let d = descriptor(0.2);
        assert!(distance(&encode_full(&d), &encode_half(&d)).is_err());
    }

    #[test]
    fn bogus_lengths_are_rejected() {
        assert!(decode(&[0u8; 100]).is_err());
        assert!(distance(&[0u8; 100], &[0u8; 100]).is_err());
    }

    #[test]
    fn half_reencode_is_byte_stable() {
        let d = descriptor(0.7);
        let once = encode_half(&d);
        let decoded = decode(&once).unwrap();
        let mut again = [0f32; 128];
        again[..64].copy_from_slice(&decoded);
        assert_eq!(encode_half(&again), once);
    }
}
