use std::sync::atomic::{AtomicU32, Ordering};

use crate::flags::{cmp_flags, RFlags};

/// The single dword of memory a `lock cmpxchgl` operates on.
#[derive(Debug, Default)]
pub struct MemoryCell(AtomicU32);

impl MemoryCell {
    pub fn new(value: u32) -> Self {
        Self(AtomicU32::new(value))
    }

    pub fn load(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn store(&self, value: u32) {
        self.0.store(value, Ordering::SeqCst)
    }
}

/// Architectural state after a compare-exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmpXchgOutcome {
    /// Set when the exchange happened.
    pub zf: bool,
    /// Memory operand after the instruction.
    pub memory: u32,
    /// EAX after the instruction: unchanged on success, the old memory value on failure.
    pub accumulator: u32,
    /// Flags of `CMP accumulator, old_memory`.
    pub rflags: RFlags,
}

/// `lock cmpxchgl src, (mem)` with `accumulator` in EAX.
///
/// The compare and the conditional store are a single atomic read-modify-write on `cell`.
pub fn lock_cmpxchg32(cell: &MemoryCell, accumulator: u32, src: u32) -> CmpXchgOutcome {
    let (old, swapped) =
        match cell
            .0
            .compare_exchange(accumulator, src, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(old) => (old, true),
            Err(old) => (old, false),
        };

    let rflags = cmp_flags(32, u64::from(accumulator), u64::from(old));
    debug_assert_eq!(rflags.contains(RFlags::ZF), swapped);

    CmpXchgOutcome {
        zf: swapped,
        memory: if swapped { src } else { old },
        accumulator: if swapped { accumulator } else { old },
        rflags,
    }
}
