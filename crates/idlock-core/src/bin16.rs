//! Fixed-width packing helpers.
//!
//! Face templates store IEEE-754 floats in little-endian byte runs, either
//! 32-bit (full precision) or 16-bit (half precision). The half encoding
//! rounds to nearest-even, flushes subnormal results to signed zero, and
//! preserves infinities and NaN. full→half→full is lossy but deterministic;
//! half→full→half is the identity over everything the encoder can emit.

use subtle::ConstantTimeEq;

/// Convert a 32-bit float to half precision.
pub fn f32_to_f16(x: f32) -> u16 {
    let bits = x.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xff) as i32;
    let mant = bits & 0x007f_ffff;

    if exp == 0xff {
        // Infinity or NaN; keep a payload bit so NaN stays NaN.
        let nan = if mant != 0 { 0x0200 } else { 0 };
        return sign | 0x7c00 | nan;
    }

    let unbiased = exp - 127;
    if unbiased > 15 {
        return sign | 0x7c00; // overflow to infinity
    }
    if unbiased < -14 {
        return sign; // subnormal result: flush to zero
    }

    let half_exp = (unbiased + 15) as u32;
    let mut out = u32::from(sign) | (half_exp << 10) | (mant >> 13);
    // Round to nearest, ties to even. A mantissa carry bumps the exponent,
    // saturating into infinity, which is the rounding we want.
    let dropped = mant & 0x1fff;
    if dropped > 0x1000 || (dropped == 0x1000 && out & 1 == 1) {
        out += 1;
    }
    out as u16
}

/// Convert a half-precision value back to a 32-bit float.
pub fn f16_to_f32(h: u16) -> f32 {
    let sign = (u32::from(h) & 0x8000) << 16;
    let exp = (h >> 10) & 0x1f;
    let mant = u32::from(h) & 0x03ff;

    match exp {
        0 => {
            if mant == 0 {
                f32::from_bits(sign)
            } else {
                // Half subnormal: mant × 2⁻²⁴. Never produced by the
                // encoder above, but decoded faithfully.
                let v = mant as f32 * (-24f32).exp2();
                if sign != 0 {
                    -v
                } else {
                    v
                }
            }
        }
        0x1f => f32::from_bits(sign | 0x7f80_0000 | (mant << 13)),
        _ => f32::from_bits(sign | ((u32::from(exp) + 112) << 23) | (mant << 13)),
    }
}

/// Pack floats as little-endian 4-byte runs.
pub fn f32s_to_bytes(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Unpack little-endian 4-byte runs into floats. The length must be a
/// multiple of four.
pub fn bytes_to_f32s(buf: &[u8]) -> Option<Vec<f32>> {
    if buf.len() % 4 != 0 {
        return None;
    }
    Some(
        buf.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

/// Pack floats as little-endian half-precision 2-byte runs.
pub fn f32s_to_f16_bytes(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 2);
    for v in values {
        out.extend_from_slice(&f32_to_f16(*v).to_le_bytes());
    }
    out
}

/// Unpack little-endian half-precision runs into floats. The length must
/// be a multiple of two.
pub fn f16_bytes_to_f32s(buf: &[u8]) -> Option<Vec<f32>> {
    if buf.len() % 2 != 0 {
        return None;
    }
    Some(
        buf.chunks_exact(2)
            .map(|c| f16_to_f32(u16::from_le_bytes([c[0], c[1]])))
            .collect(),
    )
}

/// Constant-time equality. Slices of different length compare unequal
/// without inspecting contents.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_roundtrip_is_identity_on_encoder_range() {
        for v in [0.0f32, -0.0, 1.0, -1.5, 0.4218, 65504.0, 3.1415926] {
            let h = f32_to_f16(v);
            assert_eq!(f32_to_f16(f16_to_f32(h)), h, "value {v}");
        }
    }

    #[test]
    fn full_half_full_is_deterministic() {
        let v = 0.123_456_79_f32;
        let a = f16_to_f32(f32_to_f16(v));
        let b = f16_to_f32(f32_to_f16(v));
        assert_eq!(a.to_bits(), b.to_bits());
        assert!((a - v).abs() < 1e-3);
    }

    #[test]
    fn specials_are_preserved() {
        assert_eq!(f32_to_f16(f32::INFINITY), 0x7c00);
        assert_eq!(f32_to_f16(f32::NEG_INFINITY), 0xfc00);
        assert!(f16_to_f32(f32_to_f16(f32::NAN)).is_nan());
        assert!(f16_to_f32(0x7c00).is_infinite());
    }

    #[test]
    fn subnormal_results_flush_to_zero() {
        // 2⁻²⁰ is representable in f32 but subnormal in f16.
        let tiny = (-20f32).exp2();
        assert_eq!(f32_to_f16(tiny), 0x0000);
        assert_eq!(f32_to_f16(-tiny), 0x8000);
    }

    #[test]
    fn overflow_saturates_to_infinity() {
        assert_eq!(f32_to_f16(1.0e6), 0x7c00);
        assert_eq!(f32_to_f16(-1.0e6), 0xfc00);
    }

    #[test]
    fn byte_runs_are_little_endian() {
        assert_eq!(hex::encode(f32s_to_bytes(&[1.0])), "0000803f");
        assert_eq!(hex::encode(f32s_to_f16_bytes(&[1.0])), "003c");
    }

    #[test]
    fn byte_runs_roundtrip() {
        let values = [0.25f32, -7.5, 1000.125, 0.0];
        let full = f32s_to_bytes(&values);
        assert_eq!(full.len(), 16);
        assert_eq!(bytes_to_f32s(&full).unwrap(), values);

        let half = f32s_to_f16_bytes(&values);
        assert_eq!(half.len(), 8);
        let back = f16_bytes_to_f32s(&half).unwrap();
        for (orig, dec) in values.iter().zip(&back) {
            assert!((orig - dec).abs() < 0.5);
        }
    }

    #[test]
    fn ragged_byte_runs_are_rejected() {
        assert!(bytes_to_f32s(&[0u8; 7]).is_none());
        assert!(f16_bytes_to_f32s(&[0u8; 3]).is_none());
    }

    #[test]
    fn ct_eq_semantics() {
        assert!(ct_eq(b"12345", b"12345"));
        assert!(!ct_eq(b"12345", b"12346"));
        assert!(!ct_eq(b"1234", b"12345"));
        assert!(ct_eq(b"", b""));
    }
}
