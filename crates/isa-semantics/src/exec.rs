use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::atomics::{lock_cmpxchg32, CmpXchgOutcome, MemoryCell};
use crate::bitscan::{bsf, bsr, BitScan};
use crate::crc32c;
use crate::instruction::Instruction;
use crate::tsc::{rdtsc, HostTsc, RdtscValue, TscSource};

/// Operands consumed by one instruction evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inputs {
    /// `bsf/bsr src, dest`; `dest` is the destination's value before the scan.
    BitScan { dest: u64, src: u64 },
    /// `crc32 value, crc`.
    Crc32 { crc: u32, value: u64 },
    /// `lock cmpxchgl src, (mem)` with `accumulator` in EAX and `memory` the cell's prior value.
    CmpXchg { memory: u32, accumulator: u32, src: u32 },
    Rdtsc,
}

impl Inputs {
    pub fn kind(&self) -> &'static str {
        match self {
            Inputs::BitScan { .. } => "bit-scan",
            Inputs::Crc32 { .. } => "crc32",
            Inputs::CmpXchg { .. } => "cmpxchg",
            Inputs::Rdtsc => "rdtsc",
        }
    }

    /// Whether `instr` takes operands of this shape.
    pub fn fits(&self, instr: Instruction) -> bool {
        matches!(
            (instr, self),
            (
                Instruction::Bsf32 | Instruction::Bsf64 | Instruction::Bsr32 | Instruction::Bsr64,
                Inputs::BitScan { .. }
            ) | (
                Instruction::Crc32B | Instruction::Crc32W | Instruction::Crc32L | Instruction::Crc32Q,
                Inputs::Crc32 { .. }
            ) | (Instruction::LockCmpxchgL, Inputs::CmpXchg { .. })
                | (Instruction::Rdtsc, Inputs::Rdtsc)
        )
    }
}

impl fmt::Display for Inputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inputs::BitScan { dest, src } => write!(f, "src={src:#x} dest={dest:#x}"),
            Inputs::Crc32 { crc, value } => write!(f, "crc={crc:#010x} value={value:#x}"),
            Inputs::CmpXchg {
                memory,
                accumulator,
                src,
            } => write!(f, "mem={memory:#x} eax={accumulator:#x} src={src:#x}"),
            Inputs::Rdtsc => f.write_str("-"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    BitScan(BitScan),
    Crc32(u32),
    CmpXchg(CmpXchgOutcome),
    Rdtsc(RdtscValue),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::BitScan(scan) => write!(f, "dest={:#x} zf={}", scan.dest, u8::from(scan.zf)),
            Outcome::Crc32(crc) => write!(f, "crc={crc:#010x} ({})", *crc as i32),
            Outcome::CmpXchg(out) => write!(
                f,
                "zf={} mem={:#x} eax={:#x}",
                u8::from(out.zf),
                out.memory,
                out.accumulator
            ),
            Outcome::Rdtsc(v) => write!(f, "edx:eax={:#x}", v.value()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("{instruction} cannot take {inputs} operands")]
    InputsMismatch {
        instruction: Instruction,
        inputs: &'static str,
    },
}

/// Evaluates catalog instructions one at a time.
///
/// The evaluator owns the TSC source so `RDTSC` readings come from one logical thread, and
/// keeps a per-instruction invocation count.
#[derive(Debug)]
pub struct Evaluator<T: TscSource = HostTsc> {
    tsc: T,
    invocations: BTreeMap<Instruction, u64>,
}

impl Evaluator<HostTsc> {
    pub fn new() -> Self {
        Self::with_tsc(HostTsc::new())
    }
}

impl Default for Evaluator<HostTsc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TscSource> Evaluator<T> {
    pub fn with_tsc(tsc: T) -> Self {
        Self {
            tsc,
            invocations: BTreeMap::new(),
        }
    }

    pub fn tsc_mut(&mut self) -> &mut T {
        &mut self.tsc
    }

    pub fn invocations(&self) -> &BTreeMap<Instruction, u64> {
        &self.invocations
    }

    /// Evaluates a `lock cmpxchgl` against a caller-owned cell.
    pub fn lock_cmpxchg(&mut self, cell: &MemoryCell, accumulator: u32, src: u32) -> CmpXchgOutcome {
        self.count(Instruction::LockCmpxchgL);
        lock_cmpxchg32(cell, accumulator, src)
    }

    /// Evaluates one instruction.
    ///
    /// `CmpXchg` inputs are applied to a cell that lives only for this call.
    pub fn evaluate(&mut self, instr: Instruction, inputs: &Inputs) -> Result<Outcome, EvalError> {
        if !inputs.fits(instr) {
            return Err(EvalError::InputsMismatch {
                instruction: instr,
                inputs: inputs.kind(),
            });
        }

        let width = instr.width();
        let outcome = match (instr, *inputs) {
            (Instruction::Bsf32 | Instruction::Bsf64, Inputs::BitScan { dest, src }) => {
                Outcome::BitScan(bsf(width, dest, src))
            }
            (Instruction::Bsr32 | Instruction::Bsr64, Inputs::BitScan { dest, src }) => {
                Outcome::BitScan(bsr(width, dest, src))
            }
            (_, Inputs::Crc32 { crc, value }) => Outcome::Crc32(crc32c::crc32(width, crc, value)),
            (
                _,
                Inputs::CmpXchg {
                    memory,
                    accumulator,
                    src,
                },
            ) => {
                let cell = MemoryCell::new(memory);
                return Ok(Outcome::CmpXchg(self.lock_cmpxchg(&cell, accumulator, src)));
            }
            (_, Inputs::Rdtsc) => Outcome::Rdtsc(rdtsc(&mut self.tsc)),
            (_, Inputs::BitScan { .. }) => unreachable!("checked by Inputs::fits"),
        };
        self.count(instr);
        Ok(outcome)
    }

    fn count(&mut self, instr: Instruction) {
        *self.invocations.entry(instr).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsc::SteppingTsc;

    #[test]
    fn dispatches_each_family() {
        let mut eval = Evaluator::with_tsc(SteppingTsc::new(10, 1));

        let out = eval
            .evaluate(Instruction::Bsr64, &Inputs::BitScan { dest: 0, src: 123 })
            .unwrap();
        assert_eq!(out, Outcome::BitScan(BitScan { dest: 6, zf: false }));

        let out = eval
            .evaluate(Instruction::Crc32L, &Inputs::Crc32 { crc: 0, value: 34234123 })
            .unwrap();
        assert_eq!(out, Outcome::Crc32(879414913));

        let out = eval
            .evaluate(
                Instruction::LockCmpxchgL,
                &Inputs::CmpXchg {
                    memory: 5,
                    accumulator: 5,
                    src: 123,
                },
            )
            .unwrap();
        let Outcome::CmpXchg(out) = out else {
            panic!("expected cmpxchg outcome, got {out:?}");
        };
        assert_eq!((out.zf, out.memory, out.accumulator), (true, 123, 5));

        let out = eval.evaluate(Instruction::Rdtsc, &Inputs::Rdtsc).unwrap();
        assert_eq!(out, Outcome::Rdtsc(RdtscValue::from_u64(10)));
    }

    #[test]
    fn crc32_width_comes_from_instruction() {
        let mut eval = Evaluator::with_tsc(SteppingTsc::new(0, 1));
        // Upper bits beyond the operand size are ignored.
        let out = eval
            .evaluate(Instruction::Crc32B, &Inputs::Crc32 { crc: 0, value: 0xff00 | 120 })
            .unwrap();
        assert_eq!(out, Outcome::Crc32(0xFB41_0CC2));
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let mut eval = Evaluator::with_tsc(SteppingTsc::new(0, 1));
        let err = eval
            .evaluate(Instruction::Crc32Q, &Inputs::Rdtsc)
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::InputsMismatch {
                instruction: Instruction::Crc32Q,
                inputs: "rdtsc"
            }
        );
        assert!(eval.invocations().is_empty());
    }

    #[test]
    fn counts_invocations() {
        let mut eval = Evaluator::with_tsc(SteppingTsc::new(0, 1));
        for _ in 0..3 {
            eval.evaluate(Instruction::Rdtsc, &Inputs::Rdtsc).unwrap();
        }
        eval.evaluate(Instruction::Bsf32, &Inputs::BitScan { dest: 0, src: 1 })
            .unwrap();
        assert_eq!(eval.invocations().get(&Instruction::Rdtsc), Some(&3));
        assert_eq!(eval.invocations().get(&Instruction::Bsf32), Some(&1));
    }
}
