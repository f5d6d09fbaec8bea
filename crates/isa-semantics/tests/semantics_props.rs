#![cfg(not(target_arch = "wasm32"))]

use isa_semantics::bitscan::{bsf, bsr};
use isa_semantics::crc32c::{crc32, crc32_u16, crc32_u32, crc32_u64, crc32_u8, update};
use isa_semantics::{lock_cmpxchg32, MemoryCell, Width};
use proptest::prelude::*;

fn scan_width() -> impl Strategy<Value = Width> {
    prop_oneof![Just(Width::Dword), Just(Width::Qword)]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 2048,
        .. ProptestConfig::default()
    })]

    #[test]
    fn bsf_finds_lowest_set_bit(width in scan_width(), value in any::<u64>(), dest in any::<u64>()) {
        let masked = value & width.mask();
        let scan = bsf(width, dest, value);
        if masked == 0 {
            prop_assert!(scan.zf);
            prop_assert_eq!(scan.dest, dest & width.mask());
        } else {
            prop_assert!(!scan.zf);
            let idx = scan.dest as u32;
            prop_assert!(idx < width.bits());
            prop_assert_eq!((masked >> idx) & 1, 1, "bit {} not set in {:#x}", idx, masked);
            prop_assert_eq!(masked & ((1u64 << idx) - 1), 0, "lower bits set in {:#x}", masked);
        }
    }

    #[test]
    fn bsr_finds_highest_set_bit(width in scan_width(), value in any::<u64>(), dest in any::<u64>()) {
        let masked = value & width.mask();
        let scan = bsr(width, dest, value);
        if masked == 0 {
            prop_assert!(scan.zf);
        } else {
            prop_assert!(!scan.zf);
            let idx = scan.dest as u32;
            prop_assert!(idx < width.bits());
            prop_assert_eq!((masked >> idx) & 1, 1);
            prop_assert_eq!(masked.checked_shr(idx + 1).unwrap_or(0), 0, "higher bits set in {:#x}", masked);
        }
    }

    #[test]
    fn bit_scans_are_pure(width in scan_width(), value in any::<u64>()) {
        prop_assert_eq!(bsf(width, 0, value), bsf(width, 0, value));
        prop_assert_eq!(bsr(width, 0, value), bsr(width, 0, value));
    }

    #[test]
    fn crc32_wide_forms_compose_from_bytes(crc in any::<u32>(), value in any::<u64>()) {
        let [b0, b1, ..] = value.to_le_bytes();
        prop_assert_eq!(crc32_u16(crc, value as u16), crc32_u8(crc32_u8(crc, b0), b1));

        let lo = value as u32;
        let hi = (value >> 32) as u32;
        prop_assert_eq!(crc32_u64(crc, value), crc32_u32(crc32_u32(crc, lo), hi));
        prop_assert_eq!(crc32_u64(crc, value), update(crc, &value.to_le_bytes()));
    }

    #[test]
    fn crc32_generic_width_matches_fixed_forms(crc in any::<u32>(), value in any::<u64>()) {
        prop_assert_eq!(crc32(Width::Byte, crc, value), crc32_u8(crc, value as u8));
        prop_assert_eq!(crc32(Width::Word, crc, value), crc32_u16(crc, value as u16));
        prop_assert_eq!(crc32(Width::Dword, crc, value), crc32_u32(crc, value as u32));
        prop_assert_eq!(crc32(Width::Qword, crc, value), crc32_u64(crc, value));
    }

    #[test]
    fn cmpxchg_three_way_contract(memory in any::<u32>(), accumulator in any::<u32>(), src in any::<u32>()) {
        let cell = MemoryCell::new(memory);
        let out = lock_cmpxchg32(&cell, accumulator, src);
        if memory == accumulator {
            prop_assert!(out.zf);
            prop_assert_eq!(out.memory, src);
            prop_assert_eq!(out.accumulator, accumulator);
        } else {
            prop_assert!(!out.zf);
            prop_assert_eq!(out.memory, memory);
            prop_assert_eq!(out.accumulator, memory);
        }
        prop_assert_eq!(cell.load(), out.memory);
    }
}
