//! BSF / BSR.
//!
//! A zero source leaves the destination architecturally undefined. The model follows what the
//! hardware actually does: ZF is set and the destination register keeps its previous value.

use crate::instruction::Width;
use crate::operand::Operand;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitScan {
    /// Destination register after the scan.
    pub dest: u64,
    /// ZF: set when the source was zero.
    pub zf: bool,
}

impl BitScan {
    pub fn is_undefined(&self) -> bool {
        self.zf
    }

    pub fn index(&self) -> Option<u32> {
        (!self.zf).then_some(self.dest as u32)
    }
}

/// Index of the least-significant set bit of `value` truncated to `width`.
pub fn bsf(width: Width, dest: u64, value: u64) -> BitScan {
    let value = value & width.mask();
    if value == 0 {
        return BitScan {
            dest: dest & width.mask(),
            zf: true,
        };
    }
    BitScan {
        dest: u64::from(value.trailing_zeros()),
        zf: false,
    }
}

/// Index of the most-significant set bit of `value` truncated to `width`.
pub fn bsr(width: Width, dest: u64, value: u64) -> BitScan {
    let value = value & width.mask();
    if value == 0 {
        return BitScan {
            dest: dest & width.mask(),
            zf: true,
        };
    }
    BitScan {
        dest: u64::from(63 - value.leading_zeros()),
        zf: false,
    }
}

pub fn bsf32(value: i32) -> BitScan {
    let op = Operand::from_signed(Width::Dword, value.into());
    bsf(Width::Dword, 0, op.bits())
}

pub fn bsf64(value: i64) -> BitScan {
    let op = Operand::from_signed(Width::Qword, value);
    bsf(Width::Qword, 0, op.bits())
}

pub fn bsr32(value: i32) -> BitScan {
    let op = Operand::from_signed(Width::Dword, value.into());
    bsr(Width::Dword, 0, op.bits())
}

pub fn bsr64(value: i64) -> BitScan {
    let op = Operand::from_signed(Width::Qword, value);
    bsr(Width::Qword, 0, op.bits())
}
