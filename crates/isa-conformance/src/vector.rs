use std::fmt;

use isa_semantics::{Instruction, Operand, Width};

pub use isa_semantics::Inputs;

/// What a vector asserts about the instruction's result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expected {
    /// BSF/BSR found a set bit at this index (ZF clear).
    BitIndex(u64),
    /// Zero source to BSF/BSR: whatever the platform produces is recorded, not asserted.
    Undefined,
    Crc32(u32),
    CmpXchg {
        zf: bool,
        memory: u32,
        accumulator: u32,
    },
    /// RDTSC: a later read must exceed the first one.
    StrictlyIncreasing,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::BitIndex(idx) => write!(f, "dest={idx:#x} zf=0"),
            Expected::Undefined => f.write_str("undefined (zf=1)"),
            Expected::Crc32(crc) => write!(f, "crc={crc:#010x} ({})", *crc as i32),
            Expected::CmpXchg {
                zf,
                memory,
                accumulator,
            } => write!(
                f,
                "zf={} mem={memory:#x} eax={accumulator:#x}",
                u8::from(*zf)
            ),
            Expected::StrictlyIncreasing => f.write_str("second > first"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TestVector {
    pub instruction: Instruction,
    pub inputs: Inputs,
    pub expected: Expected,
}

const fn dword(value: i64) -> u32 {
    Operand::from_signed(Width::Dword, value).bits() as u32
}

impl TestVector {
    pub const fn new(instruction: Instruction, inputs: Inputs, expected: Expected) -> Self {
        Self {
            instruction,
            inputs,
            expected,
        }
    }

    const fn bit_scan(instruction: Instruction, src: u64, index: u64) -> Self {
        Self::new(
            instruction,
            Inputs::BitScan { dest: 0, src },
            Expected::BitIndex(index),
        )
    }

    pub const fn bsf32(value: i32, index: u64) -> Self {
        let src = Operand::from_signed(Width::Dword, value as i64).bits();
        Self::bit_scan(Instruction::Bsf32, src, index)
    }

    pub const fn bsf64(value: i64, index: u64) -> Self {
        let src = Operand::from_signed(Width::Qword, value).bits();
        Self::bit_scan(Instruction::Bsf64, src, index)
    }

    pub const fn bsr32(value: i32, index: u64) -> Self {
        let src = Operand::from_signed(Width::Dword, value as i64).bits();
        Self::bit_scan(Instruction::Bsr32, src, index)
    }

    pub const fn bsr64(value: i64, index: u64) -> Self {
        let src = Operand::from_signed(Width::Qword, value).bits();
        Self::bit_scan(Instruction::Bsr64, src, index)
    }

    /// BSF/BSR with a zero source and a pre-loaded destination.
    pub const fn zero_scan(instruction: Instruction, dest: u64) -> Self {
        Self::new(
            instruction,
            Inputs::BitScan { dest, src: 0 },
            Expected::Undefined,
        )
    }

    /// `crc32{b,w,l,q}` with literals as written in C: `value` is truncated to the source width
    /// and a negative `expected` is read as its 32-bit pattern.
    pub const fn crc32(instruction: Instruction, crc: u32, value: i64, expected: i64) -> Self {
        let value = Operand::from_signed(instruction.width(), value).bits();
        Self::new(
            instruction,
            Inputs::Crc32 { crc, value },
            Expected::Crc32(dword(expected)),
        )
    }

    pub const fn crc32b(crc: u32, value: i64, expected: i64) -> Self {
        Self::crc32(Instruction::Crc32B, crc, value, expected)
    }

    pub const fn crc32w(crc: u32, value: i64, expected: i64) -> Self {
        Self::crc32(Instruction::Crc32W, crc, value, expected)
    }

    pub const fn crc32l(crc: u32, value: i64, expected: i64) -> Self {
        Self::crc32(Instruction::Crc32L, crc, value, expected)
    }

    pub const fn crc32q(crc: u32, value: i64, expected: i64) -> Self {
        Self::crc32(Instruction::Crc32Q, crc, value, expected)
    }

    /// `lock cmpxchgl`: `(memory, eax, src)` before, `(zf, memory, eax)` after.
    pub const fn lock_cmpxchgl(before: (u32, u32, u32), after: (bool, u32, u32)) -> Self {
        let (memory, accumulator, src) = before;
        let (zf, memory_after, accumulator_after) = after;
        Self::new(
            Instruction::LockCmpxchgL,
            Inputs::CmpXchg {
                memory,
                accumulator,
                src,
            },
            Expected::CmpXchg {
                zf,
                memory: memory_after,
                accumulator: accumulator_after,
            },
        )
    }

    pub const fn rdtsc() -> Self {
        Self::new(
            Instruction::Rdtsc,
            Inputs::Rdtsc,
            Expected::StrictlyIncreasing,
        )
    }
}

/// An ordered list of vectors, run front to back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suite {
    pub name: String,
    pub vectors: Vec<TestVector>,
}

impl Suite {
    pub fn new(name: impl Into<String>, vectors: impl Into<Vec<TestVector>>) -> Self {
        Self {
            name: name.into(),
            vectors: vectors.into(),
        }
    }

    /// Concatenates suites in order under a new name.
    pub fn combined<'a>(name: impl Into<String>, parts: impl IntoIterator<Item = &'a Suite>) -> Self {
        let vectors = parts
            .into_iter()
            .flat_map(|s| s.vectors.iter().copied())
            .collect::<Vec<_>>();
        Self::new(name, vectors)
    }

    /// Distinct instruction mnemonics, in order of first appearance.
    pub fn mnemonics(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        for v in &self.vectors {
            let m = v.instruction.mnemonic();
            if !out.contains(&m) {
                out.push(m);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
