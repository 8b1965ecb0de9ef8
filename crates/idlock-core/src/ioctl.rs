//! Control channel.
//!
//! Internally every knob is a typed [`Command`]; the classic byte protocol
//! (one opcode byte, little-endian payload, gets written back in place)
//! only exists at the outermost boundary for callers that speak it.

use crate::error::CardError;
use crate::qr::EccLevel;
use crate::template::TemplateDim;

/// Byte-protocol opcodes. Stable.
pub const SET_FACEDIFF: u8 = 0x00;
pub const GET_FACEDIFF: u8 = 0x01;
pub const SET_FDIM: u8 = 0x02;
pub const GET_FDIM: u8 = 0x03;
pub const SET_ECC: u8 = 0x04;
pub const SET_ACL: u8 = 0x05;

/// Visibility mask bits. Bits 10..64 are reserved and ignored.
pub mod detail {
    pub const SURNAME: u64 = 1 << 0;
    pub const GIVEN_NAME: u64 = 1 << 1;
    pub const DATE_OF_BIRTH: u64 = 1 << 2;
    pub const PLACE_OF_BIRTH: u64 = 1 << 3;
    pub const CREATED_AT: u64 = 1 << 4;
    pub const FULL_NAME: u64 = 1 << 5;
    pub const UIN: u64 = 1 << 6;
    pub const GENDER: u64 = 1 << 7;
    pub const POSTAL_ADDRESS: u64 = 1 << 8;
    pub const PHOTO: u64 = 1 << 9;
}

/// A typed control command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Overwrite the threshold matching the current dimension flag.
    SetFaceDiff(f32),
    GetFaceDiff,
    SetDim(TemplateDim),
    GetDim,
    SetEcc(EccLevel),
    SetAcl(u64),
}

/// What a command hands back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    None,
    FaceDiff(f32),
    Dim(TemplateDim),
}

impl Command {
    /// Parse a byte-protocol command buffer.
    pub fn parse(buf: &[u8]) -> Result<Self, CardError> {
        let (&opcode, payload) = buf
            .split_first()
            .ok_or_else(|| CardError::InvalidInput("empty control command".into()))?;
        match opcode {
            SET_FACEDIFF => {
                let raw = payload
                    .get(..4)
                    .ok_or_else(|| CardError::InvalidInput("short SET_FACEDIFF payload".into()))?;
                Ok(Command::SetFaceDiff(f32::from_le_bytes(
                    raw.try_into().expect("checked length"),
                )))
            }
            GET_FACEDIFF => Ok(Command::GetFaceDiff),
            SET_FDIM => {
                let &b = payload
                    .first()
                    .ok_or_else(|| CardError::InvalidInput("short SET_FDIM payload".into()))?;
                Ok(Command::SetDim(TemplateDim::from_byte(b)?))
            }
            GET_FDIM => Ok(Command::GetDim),
            SET_ECC => {
                let &b = payload
                    .first()
                    .ok_or_else(|| CardError::InvalidInput("short SET_ECC payload".into()))?;
                Ok(Command::SetEcc(EccLevel::from_byte(b)?))
            }
            SET_ACL => {
                let raw = payload
                    .get(..8)
                    .ok_or_else(|| CardError::InvalidInput("short SET_ACL payload".into()))?;
                Ok(Command::SetAcl(u64::from_le_bytes(
                    raw.try_into().expect("checked length"),
                )))
            }
            other => Err(CardError::InvalidInput(format!(
                "unknown control opcode {other:#04x}"
            ))),
        }
    }
}

impl Reply {
    /// Write a reply back into the command buffer, after the opcode.
    pub(crate) fn write_back(&self, buf: &mut [u8]) -> Result<(), CardError> {
        match self {
            Reply::None => Ok(()),
            Reply::FaceDiff(v) => {
                let slot = buf
                    .get_mut(1..5)
                    .ok_or_else(|| CardError::InvalidInput("short GET_FACEDIFF buffer".into()))?;
                slot.copy_from_slice(&v.to_le_bytes());
                Ok(())
            }
            Reply::Dim(dim) => {
                let slot = buf
                    .get_mut(1)
                    .ok_or_else(|| CardError::InvalidInput("short GET_FDIM buffer".into()))?;
                *slot = dim.as_byte();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_opcode() {
        let mut buf = vec![SET_FACEDIFF];
        buf.extend_from_slice(&0.43f32.to_le_bytes());
        assert_eq!(Command::parse(&buf).unwrap(), Command::SetFaceDiff(0.43));

        assert_eq!(
            Command::parse(&[SET_FDIM, 1]).unwrap(),
            Command::SetDim(TemplateDim::Full)
        );
        assert_eq!(Command::parse(&[GET_FDIM]).unwrap(), Command::GetDim);
        assert_eq!(
            Command::parse(&[SET_ECC, 2]).unwrap(),
            Command::SetEcc(EccLevel::Quartile)
        );

        let mut acl = vec![SET_ACL];
        acl.extend_from_slice(&(detail::SURNAME | detail::PLACE_OF_BIRTH).to_le_bytes());
        assert_eq!(Command::parse(&acl).unwrap(), Command::SetAcl(0b1001));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Command::parse(&[]).is_err());
        assert!(Command::parse(&[0xff]).is_err());
        assert!(Command::parse(&[SET_FACEDIFF, 1, 2]).is_err());
        assert!(Command::parse(&[SET_FDIM, 7]).is_err());
        assert!(Command::parse(&[SET_ACL, 1, 2, 3]).is_err());
    }

    #[test]
    fn write_back_targets_the_payload() {
        let mut buf = [GET_FACEDIFF, 0, 0, 0, 0];
        Reply::FaceDiff(0.6).write_back(&mut buf).unwrap();
        assert_eq!(f32::from_le_bytes(buf[1..5].try_into().unwrap()), 0.6);

        let mut short = [GET_FACEDIFF];
        assert!(Reply::FaceDiff(0.6).write_back(&mut short).is_err());
    }
}
