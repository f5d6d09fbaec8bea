use std::fmt;

use crate::instruction::Width;

/// A fixed-width integer operand.
///
/// The bit pattern is authoritative: signed literals are stored as their two's-complement
/// encoding truncated to `width`, and `bits` never has bits set above `width`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Operand {
    width: Width,
    bits: u64,
}

impl Operand {
    pub const fn from_unsigned(width: Width, value: u64) -> Self {
        Self {
            width,
            bits: value & width.mask(),
        }
    }

    pub const fn from_signed(width: Width, value: i64) -> Self {
        Self::from_unsigned(width, value as u64)
    }

    pub const fn width(self) -> Width {
        self.width
    }

    pub const fn bits(self) -> u64 {
        self.bits
    }

    /// Sign-extends the stored pattern back to a signed 64-bit value.
    pub const fn as_signed(self) -> i64 {
        let shift = 64 - self.width.bits();
        ((self.bits << shift) as i64) >> shift
    }

    pub const fn is_zero(self) -> bool {
        self.bits == 0
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.width.bytes() * 2;
        write!(f, "{:#0w$x}", self.bits, w = digits + 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_literals_become_twos_complement_patterns() {
        assert_eq!(Operand::from_signed(Width::Qword, -1).bits(), u64::MAX);
        assert_eq!(Operand::from_signed(Width::Dword, -1).bits(), 0xffff_ffff);
        assert_eq!(Operand::from_signed(Width::Word, -32423).bits(), 0x8159);
        assert_eq!(Operand::from_signed(Width::Byte, -33).bits(), 0xdf);
    }

    #[test]
    fn as_signed_sign_extends() {
        assert_eq!(Operand::from_unsigned(Width::Byte, 0xdf).as_signed(), -33);
        assert_eq!(Operand::from_unsigned(Width::Dword, 0x7fff_ffff).as_signed(), i32::MAX as i64);
        assert_eq!(Operand::from_signed(Width::Qword, -5).as_signed(), -5);
    }

    #[test]
    fn unsigned_values_are_truncated_to_width() {
        let op = Operand::from_unsigned(Width::Word, 0x1_2345);
        assert_eq!(op.bits(), 0x2345);
        assert_eq!(op.to_string(), "0x2345");
        assert_eq!(Operand::from_unsigned(Width::Byte, 5).to_string(), "0x05");
    }
}
