use bitflags::bitflags;

use crate::instruction::mask_bits;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct RFlags: u64 {
        const CF = 1 << 0;
        const PF = 1 << 2;
        const AF = 1 << 4;
        const ZF = 1 << 6;
        const SF = 1 << 7;
        const OF = 1 << 11;
    }
}

impl RFlags {
    /// Flags written by CMP/SUB.
    pub const ARITHMETIC: RFlags = RFlags::CF
        .union(RFlags::PF)
        .union(RFlags::AF)
        .union(RFlags::ZF)
        .union(RFlags::SF)
        .union(RFlags::OF);
}

/// Flags produced by `CMP lhs, rhs` (i.e. `lhs - rhs`) at the given operand size.
pub fn cmp_flags(bits: u32, lhs: u64, rhs: u64) -> RFlags {
    let mask = mask_bits(bits);
    let lhs = lhs & mask;
    let rhs = rhs & mask;
    let res = lhs.wrapping_sub(rhs) & mask;
    let sign = bits - 1;

    let mut flags = RFlags::empty();
    flags.set(RFlags::CF, lhs < rhs);
    flags.set(RFlags::PF, (res as u8).count_ones() % 2 == 0);
    flags.set(RFlags::AF, ((lhs ^ rhs ^ res) & 0x10) != 0);
    flags.set(RFlags::ZF, res == 0);
    flags.set(RFlags::SF, (res >> sign) & 1 != 0);
    flags.set(RFlags::OF, (((lhs ^ rhs) & (lhs ^ res)) >> sign) & 1 != 0);
    flags
}
