#![allow(unsafe_code)]

use std::arch::asm;
use std::arch::x86_64::{_mm_crc32_u16, _mm_crc32_u32, _mm_crc32_u64, _mm_crc32_u8, _rdtsc};

use isa_semantics::{BitScan, CmpXchgOutcome, Inputs, Instruction, Outcome, RFlags, RdtscValue};

/// Executes catalog instructions natively on the host CPU.
pub struct ReferenceBackend {
    sse42: bool,
}

impl ReferenceBackend {
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            sse42: std::is_x86_feature_detected!("sse4.2"),
        })
    }

    pub fn execute(&mut self, instr: Instruction, inputs: &Inputs) -> Result<Outcome, &'static str> {
        if !inputs.fits(instr) {
            return Err("inputs do not fit instruction");
        }

        let outcome = match (instr, *inputs) {
            (Instruction::Bsf32, Inputs::BitScan { dest, src }) => {
                Outcome::BitScan(bsf32(dest as u32, src as u32))
            }
            (Instruction::Bsf64, Inputs::BitScan { dest, src }) => {
                Outcome::BitScan(bsf64(dest, src))
            }
            (Instruction::Bsr32, Inputs::BitScan { dest, src }) => {
                Outcome::BitScan(bsr32(dest as u32, src as u32))
            }
            (Instruction::Bsr64, Inputs::BitScan { dest, src }) => {
                Outcome::BitScan(bsr64(dest, src))
            }
            (_, Inputs::Crc32 { crc, value }) => {
                if !self.sse42 {
                    return Err("host CPU lacks SSE4.2");
                }
                // SAFETY: SSE4.2 support was detected at construction.
                Outcome::Crc32(unsafe { crc32(instr, crc, value) })
            }
            (
                _,
                Inputs::CmpXchg {
                    memory,
                    accumulator,
                    src,
                },
            ) => Outcome::CmpXchg(lock_cmpxchg(memory, accumulator, src)),
            // SAFETY: RDTSC is unprivileged on every x86_64 host we run on.
            (_, Inputs::Rdtsc) => Outcome::Rdtsc(RdtscValue::from_u64(unsafe { _rdtsc() })),
            _ => return Err("inputs do not fit instruction"),
        };
        Ok(outcome)
    }
}

fn bsf32(dest: u32, src: u32) -> BitScan {
    let mut out = dest;
    let zf: u8;
    // SAFETY: register-only instruction.
    unsafe {
        asm!(
            "bsf {d:e}, {s:e}",
            "setz {z}",
            d = inout(reg) out,
            s = in(reg) src,
            z = out(reg_byte) zf,
            options(nomem, nostack),
        );
    }
    BitScan {
        dest: u64::from(out),
        zf: zf != 0,
    }
}

fn bsf64(dest: u64, src: u64) -> BitScan {
    let mut out = dest;
    let zf: u8;
    // SAFETY: register-only instruction.
    unsafe {
        asm!(
            "bsf {d}, {s}",
            "setz {z}",
            d = inout(reg) out,
            s = in(reg) src,
            z = out(reg_byte) zf,
            options(nomem, nostack),
        );
    }
    BitScan {
        dest: out,
        zf: zf != 0,
    }
}

fn bsr32(dest: u32, src: u32) -> BitScan {
    let mut out = dest;
    let zf: u8;
    // SAFETY: register-only instruction.
    unsafe {
        asm!(
            "bsr {d:e}, {s:e}",
            "setz {z}",
            d = inout(reg) out,
            s = in(reg) src,
            z = out(reg_byte) zf,
            options(nomem, nostack),
        );
    }
    BitScan {
        dest: u64::from(out),
        zf: zf != 0,
    }
}

fn bsr64(dest: u64, src: u64) -> BitScan {
    let mut out = dest;
    let zf: u8;
    // SAFETY: register-only instruction.
    unsafe {
        asm!(
            "bsr {d}, {s}",
            "setz {z}",
            d = inout(reg) out,
            s = in(reg) src,
            z = out(reg_byte) zf,
            options(nomem, nostack),
        );
    }
    BitScan {
        dest: out,
        zf: zf != 0,
    }
}

#[target_feature(enable = "sse4.2")]
unsafe fn crc32(instr: Instruction, crc: u32, value: u64) -> u32 {
    match instr {
        Instruction::Crc32B => _mm_crc32_u8(crc, value as u8),
        Instruction::Crc32W => _mm_crc32_u16(crc, value as u16),
        Instruction::Crc32L => _mm_crc32_u32(crc, value as u32),
        _ => _mm_crc32_u64(u64::from(crc), value) as u32,
    }
}

fn lock_cmpxchg(memory: u32, accumulator: u32, src: u32) -> CmpXchgOutcome {
    let mut cell = memory;
    let mut eax = accumulator;
    let rflags: u64;
    // SAFETY: `cell` is a live, aligned local for the duration of the asm block. The flags are
    // captured through the stack, so `nostack` is not set.
    unsafe {
        asm!(
            "lock cmpxchg dword ptr [{mem}], {src:e}",
            "pushfq",
            "pop {flags}",
            mem = in(reg) &mut cell as *mut u32,
            src = in(reg) src,
            flags = out(reg) rflags,
            inout("eax") eax,
        );
    }
    let rflags = RFlags::from_bits_truncate(rflags) & RFlags::ARITHMETIC;
    CmpXchgOutcome {
        zf: rflags.contains(RFlags::ZF),
        memory: cell,
        accumulator: eax,
        rflags,
    }
}
