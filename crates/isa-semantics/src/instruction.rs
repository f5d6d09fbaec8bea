use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Width {
    Byte,
    Word,
    Dword,
    Qword,
}

impl Width {
    pub const fn bits(self) -> u32 {
        match self {
            Width::Byte => 8,
            Width::Word => 16,
            Width::Dword => 32,
            Width::Qword => 64,
        }
    }

    pub const fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }

    pub const fn mask(self) -> u64 {
        mask_bits(self.bits())
    }

    /// AT&T operand-size suffix.
    pub const fn suffix(self) -> char {
        match self {
            Width::Byte => 'b',
            Width::Word => 'w',
            Width::Dword => 'l',
            Width::Qword => 'q',
        }
    }
}

pub const fn mask_bits(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct InstrAttrs: u32 {
        const WRITES_FLAGS = 1 << 0;
        const READS_MEMORY = 1 << 1;
        const WRITES_MEMORY = 1 << 2;
        const LOCKED = 1 << 3;
        /// Result depends on an external time-varying source.
        const NONDETERMINISTIC = 1 << 4;
        /// A zero source operand leaves the result architecturally undefined.
        const UNDEFINED_ON_ZERO = 1 << 5;
    }
}

/// The instruction catalog covered by the semantics model.
///
/// Each variant is one concrete (mnemonic, operand size) pair, named after the AT&T form used
/// in inline assembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instruction {
    Bsf32,
    Bsf64,
    Bsr32,
    Bsr64,
    Crc32B,
    Crc32W,
    Crc32L,
    Crc32Q,
    LockCmpxchgL,
    Rdtsc,
}

impl Instruction {
    pub const ALL: [Instruction; 10] = [
        Instruction::Bsf32,
        Instruction::Bsf64,
        Instruction::Bsr32,
        Instruction::Bsr64,
        Instruction::Crc32B,
        Instruction::Crc32W,
        Instruction::Crc32L,
        Instruction::Crc32Q,
        Instruction::LockCmpxchgL,
        Instruction::Rdtsc,
    ];

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Instruction::Bsf32 => "bsfl",
            Instruction::Bsf64 => "bsfq",
            Instruction::Bsr32 => "bsrl",
            Instruction::Bsr64 => "bsrq",
            Instruction::Crc32B => "crc32b",
            Instruction::Crc32W => "crc32w",
            Instruction::Crc32L => "crc32l",
            Instruction::Crc32Q => "crc32q",
            Instruction::LockCmpxchgL => "lock cmpxchgl",
            Instruction::Rdtsc => "rdtsc",
        }
    }

    /// Width of the source operand. RDTSC reports the width of the assembled counter.
    pub const fn width(self) -> Width {
        match self {
            Instruction::Crc32B => Width::Byte,
            Instruction::Crc32W => Width::Word,
            Instruction::Bsf32
            | Instruction::Bsr32
            | Instruction::Crc32L
            | Instruction::LockCmpxchgL => Width::Dword,
            Instruction::Bsf64 | Instruction::Bsr64 | Instruction::Crc32Q | Instruction::Rdtsc => {
                Width::Qword
            }
        }
    }

    pub const fn attrs(self) -> InstrAttrs {
        match self {
            Instruction::Bsf32 | Instruction::Bsf64 | Instruction::Bsr32 | Instruction::Bsr64 => {
                InstrAttrs::WRITES_FLAGS.union(InstrAttrs::UNDEFINED_ON_ZERO)
            }
            Instruction::Crc32B | Instruction::Crc32W | Instruction::Crc32L | Instruction::Crc32Q => {
                InstrAttrs::empty()
            }
            Instruction::LockCmpxchgL => InstrAttrs::WRITES_FLAGS
                .union(InstrAttrs::READS_MEMORY)
                .union(InstrAttrs::WRITES_MEMORY)
                .union(InstrAttrs::LOCKED),
            Instruction::Rdtsc => InstrAttrs::NONDETERMINISTIC,
        }
    }

    pub const fn is_nondeterministic(self) -> bool {
        self.attrs().contains(InstrAttrs::NONDETERMINISTIC)
    }

    /// Canonical 64-bit mode encoding (register operands, `[rdi]` for memory).
    ///
    /// Only used to disassemble the instruction in diagnostics.
    pub const fn encoding(self) -> &'static [u8] {
        match self {
            Instruction::Bsf32 => &[0x0F, 0xBC, 0xC1],             // bsf eax, ecx
            Instruction::Bsf64 => &[0x48, 0x0F, 0xBC, 0xC1],       // bsf rax, rcx
            Instruction::Bsr32 => &[0x0F, 0xBD, 0xC1],             // bsr eax, ecx
            Instruction::Bsr64 => &[0x48, 0x0F, 0xBD, 0xC1],       // bsr rax, rcx
            Instruction::Crc32B => &[0xF2, 0x0F, 0x38, 0xF0, 0xC1], // crc32 eax, cl
            Instruction::Crc32W => &[0x66, 0xF2, 0x0F, 0x38, 0xF1, 0xC1], // crc32 eax, cx
            Instruction::Crc32L => &[0xF2, 0x0F, 0x38, 0xF1, 0xC1], // crc32 eax, ecx
            Instruction::Crc32Q => &[0xF2, 0x48, 0x0F, 0x38, 0xF1, 0xC1], // crc32 rax, rcx
            Instruction::LockCmpxchgL => &[0xF0, 0x0F, 0xB1, 0x0F], // lock cmpxchg [rdi], ecx
            Instruction::Rdtsc => &[0x0F, 0x31],
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown instruction mnemonic {0:?}")]
pub struct ParseInstructionError(pub String);

impl FromStr for Instruction {
    type Err = ParseInstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept "lock cmpxchgl", "lock;cmpxchgl" and runs of whitespace between prefix and
        // mnemonic.
        let normalized = s
            .trim()
            .to_ascii_lowercase()
            .split(|c: char| c == ';' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Instruction::ALL
            .into_iter()
            .find(|instr| instr.mnemonic() == normalized)
            .ok_or_else(|| ParseInstructionError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_round_trip_through_from_str() {
        for instr in Instruction::ALL {
            assert_eq!(instr.mnemonic().parse::<Instruction>(), Ok(instr));
        }
    }

    #[test]
    fn from_str_accepts_prefix_separators_and_case() {
        assert_eq!(
            "LOCK;cmpxchgl".parse::<Instruction>(),
            Ok(Instruction::LockCmpxchgL)
        );
        assert_eq!(
            "  lock   cmpxchgl ".parse::<Instruction>(),
            Ok(Instruction::LockCmpxchgL)
        );
        assert!("cmpxchgl".parse::<Instruction>().is_err());
        assert!("bsfw".parse::<Instruction>().is_err());
    }

    #[test]
    fn crc32_widths_follow_suffix() {
        for instr in [
            Instruction::Crc32B,
            Instruction::Crc32W,
            Instruction::Crc32L,
            Instruction::Crc32Q,
        ] {
            let suffix = instr.mnemonic().chars().last().unwrap();
            assert_eq!(instr.width().suffix(), suffix, "{instr}");
        }
    }

    #[test]
    fn only_rdtsc_is_nondeterministic() {
        let nondet: Vec<_> = Instruction::ALL
            .into_iter()
            .filter(|i| i.is_nondeterministic())
            .collect();
        assert_eq!(nondet, vec![Instruction::Rdtsc]);
        assert!(Instruction::LockCmpxchgL
            .attrs()
            .contains(InstrAttrs::LOCKED | InstrAttrs::WRITES_MEMORY));
    }

    #[test]
    fn mask_bits_covers_all_widths() {
        assert_eq!(Width::Byte.mask(), 0xff);
        assert_eq!(Width::Word.mask(), 0xffff);
        assert_eq!(Width::Dword.mask(), 0xffff_ffff);
        assert_eq!(Width::Qword.mask(), u64::MAX);
    }
}
