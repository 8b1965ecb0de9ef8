//! QR payload adapter.
//!
//! The engine hands a serialized container to the bit-matrix generator and
//! gets back packed module bits for the caller's renderer. Nothing here
//! knows what the payload means.

use qrcode::{EcLevel, QrCode};

use crate::error::CardError;

/// QR error-correction level, context-configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EccLevel {
    Low,
    Medium,
    Quartile,
    High,
}

impl EccLevel {
    pub(crate) fn from_byte(b: u8) -> Result<Self, CardError> {
        match b {
            0 => Ok(EccLevel::Low),
            1 => Ok(EccLevel::Medium),
            2 => Ok(EccLevel::Quartile),
            3 => Ok(EccLevel::High),
            other => Err(CardError::InvalidInput(format!(
                "error-correction level must be 0..=3, got {other}"
            ))),
        }
    }

    fn as_ec_level(self) -> EcLevel {
        match self {
            EccLevel::Low => EcLevel::L,
            EccLevel::Medium => EcLevel::M,
            EccLevel::Quartile => EcLevel::Q,
            EccLevel::High => EcLevel::H,
        }
    }
}

/// A square module matrix, row-major, bits packed LSB-first.
#[derive(Debug, Clone)]
pub struct QrMatrix {
    /// Modules per side.
    pub side: usize,
    /// `side * side` bits, packed 8 per byte.
    pub bits: Vec<u8>,
}

impl QrMatrix {
    /// Is the module at (x, y) dark?
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        let k = y * self.side + x;
        self.bits[k / 8] & (1 << (k % 8)) != 0
    }
}

/// Render a payload into a module matrix at the given correction level.
pub fn encode(payload: &[u8], ecc: EccLevel) -> Result<QrMatrix, CardError> {
    let code = QrCode::with_error_correction_level(payload, ecc.as_ec_level())
        .map_err(|e| CardError::InvalidInput(format!("payload does not fit a QR code: {e}")))?;
    let side = code.width();
    let colors = code.to_colors();
    let mut bits = vec![0u8; (side * side).div_ceil(8)];
    for (k, color) in colors.iter().enumerate() {
        if *color == qrcode::Color::Dark {
            bits[k / 8] |= 1 << (k % 8);
        }
    }
    Ok(QrMatrix { side, bits })
}
