//! Bit-exact semantics for a small catalog of x86 scalar instructions.
//!
//! Covered: `BSF`/`BSR` (32/64-bit), SSE4.2 `CRC32` (byte/word/dword/qword source),
//! `LOCK CMPXCHG` (dword memory operand) and `RDTSC`.
//!
//! Everything here is a pure function of its operands except `RDTSC`, which reads an injectable
//! [`TscSource`], and `LOCK CMPXCHG`, which performs one atomic read-modify-write on a caller
//! provided [`MemoryCell`].
//!
//! Operands are bit patterns, not mathematical values. Negative literals (as they appear in C
//! fixtures like `val = -1`) are converted with [`Operand::from_signed`] before any bitwise work.

#![deny(unsafe_code)]

pub mod atomics;
pub mod bitscan;
pub mod crc32c;
pub mod exec;
pub mod flags;
pub mod instruction;
pub mod operand;
pub mod tsc;

pub use atomics::{lock_cmpxchg32, CmpXchgOutcome, MemoryCell};
pub use bitscan::BitScan;
pub use exec::{EvalError, Evaluator, Inputs, Outcome};
pub use flags::RFlags;
pub use instruction::{InstrAttrs, Instruction, ParseInstructionError, Width};
pub use operand::Operand;
pub use tsc::{HostTsc, RdtscValue, ScriptedTsc, SteppingTsc, TscSource, VirtualTsc};
