//! The vector tables.
//!
//! Each table mirrors one inline-assembly fixture: same inputs, same expected values, same
//! order. Negative literals are kept exactly as the fixtures spell them. Vectors past the
//! fixture assertions cover the undefined zero-source case and the failing compare-exchange.

use isa_semantics::Instruction;

use crate::vector::{Suite, TestVector};

pub const BSFQ: &[TestVector] = &[
    TestVector::bsf64(1, 0),
    TestVector::bsf64(2, 1),
    TestVector::bsf64(-1, 0),
    TestVector::bsf64(2 << 53, 54),
    TestVector::bsf64(2 << 52 | 2 << 51 | 2 << 50, 51),
    TestVector::zero_scan(Instruction::Bsf64, 0x1234),
];

pub const BSFL: &[TestVector] = &[
    TestVector::bsf32(1, 0),
    TestVector::bsf32(2, 1),
    TestVector::bsf32(-1, 0),
    TestVector::bsf32(i32::MIN, 31),
    TestVector::bsf32(0x50, 4),
    TestVector::zero_scan(Instruction::Bsf32, 0x1234),
];

pub const BSRQ: &[TestVector] = &[
    TestVector::bsr64(1, 0),
    TestVector::bsr64(2, 1),
    TestVector::bsr64(-1, 63),
    TestVector::bsr64(123, 6),
    TestVector::bsr64(23123123123, 34),
    TestVector::zero_scan(Instruction::Bsr64, 0x1234),
];

pub const BSRL: &[TestVector] = &[
    TestVector::bsr32(1, 0),
    TestVector::bsr32(3, 1),
    TestVector::bsr32(-1, 31),
    TestVector::bsr32(1234, 10),
    TestVector::zero_scan(Instruction::Bsr32, 0x1234),
];

pub const CRC32B: &[TestVector] = &[
    TestVector::crc32b(0, 120, -79622974),
    TestVector::crc32b(1, -1, 1595330642),
    TestVector::crc32b(21, -33, -1469116676),
    TestVector::crc32b(0, 0, 0),
];

pub const CRC32W: &[TestVector] = &[
    TestVector::crc32w(0, 34223, -734643102),
    TestVector::crc32w(1, -1, 490532773),
    TestVector::crc32w(21, -32423, 1544870939),
    TestVector::crc32w(0, 0, 0),
];

pub const CRC32L: &[TestVector] = &[
    TestVector::crc32l(0, 34234123, 879414913),
    TestVector::crc32l(1, -1, 1792876160),
    TestVector::crc32l(21, 453451252, 1940977873),
    TestVector::crc32l(0, 0, 0),
];

pub const CRC32Q: &[TestVector] = &[
    TestVector::crc32q(0, 34234123123, 3005937269),
    TestVector::crc32q(1, -1, 2373157994),
    TestVector::crc32q(21, 4534512343452, 1462127879),
    TestVector::crc32q(0, 0, 0),
];

pub const LOCK_CMPXCHG: &[TestVector] = &[
    TestVector::lock_cmpxchgl((5, 5, 123), (true, 123, 5)),
    TestVector::lock_cmpxchgl((7, 5, 123), (false, 7, 7)),
];

pub const RDTSC: &[TestVector] = &[TestVector::rdtsc()];

pub fn bsfq() -> Suite {
    Suite::new("bsfq", BSFQ)
}

pub fn bsfl() -> Suite {
    Suite::new("bsfl", BSFL)
}

pub fn bsrq() -> Suite {
    Suite::new("bsrq", BSRQ)
}

pub fn bsrl() -> Suite {
    Suite::new("bsrl", BSRL)
}

/// Both bit-scan-reverse widths, 64-bit first.
pub fn bsr() -> Suite {
    Suite::combined("bsr", [&bsrq(), &bsrl()])
}

pub fn crc32b() -> Suite {
    Suite::new("crc32b", CRC32B)
}

pub fn crc32w() -> Suite {
    Suite::new("crc32w", CRC32W)
}

pub fn crc32l() -> Suite {
    Suite::new("crc32l", CRC32L)
}

pub fn crc32q() -> Suite {
    Suite::new("crc32q", CRC32Q)
}

/// All CRC32 widths in fixture order: b, l, q, w.
pub fn crc32() -> Suite {
    Suite::combined("crc32", [&crc32b(), &crc32l(), &crc32q(), &crc32w()])
}

pub fn lock_cmpxchg() -> Suite {
    Suite::new("lock cmpxchg", LOCK_CMPXCHG)
}

pub fn rdtsc() -> Suite {
    Suite::new("rdtsc", RDTSC)
}

pub fn all_suites() -> Vec<Suite> {
    vec![
        bsfq(),
        bsfl(),
        bsr(),
        bsrq(),
        bsrl(),
        crc32(),
        crc32b(),
        crc32l(),
        crc32q(),
        crc32w(),
        lock_cmpxchg(),
        rdtsc(),
    ]
}

/// Looks a suite up by exact (case-insensitive) name.
pub fn find_suite(name: &str) -> Option<Suite> {
    all_suites()
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
}
