//! SSE4.2 `CRC32`: CRC-32C (Castagnoli) accumulation.
//!
//! The instruction works on the bit-reflected polynomial and does no pre/post inversion: the
//! destination register is both the running state and the result. Source bytes are consumed in
//! little-endian order, so `crc32q` is exactly eight `crc32b` steps.

use crc::{Algorithm, Crc, CRC_32_ISCSI};

use crate::instruction::Width;

/// Bit-reflected form of 0x1EDC6F41.
pub const POLY_REFLECTED: u32 = 0x82F6_3B78;

/// iSCSI CRC-32C without the `!0` conditioning on either end.
const CASTAGNOLI_RAW: Algorithm<u32> = Algorithm {
    init: 0,
    xorout: 0,
    ..CRC_32_ISCSI
};

static CRC: Crc<u32> = Crc::<u32>::new(&CASTAGNOLI_RAW);

/// Folds `bytes` into the running state `crc`.
pub fn update(crc: u32, bytes: &[u8]) -> u32 {
    // The digest reflects its initial value for reflected algorithms; undo that so `crc` is
    // used as the register contents.
    let mut digest = CRC.digest_with_initial(crc.reverse_bits());
    digest.update(bytes);
    digest.finalize()
}

pub fn crc32_u8(crc: u32, value: u8) -> u32 {
    update(crc, &[value])
}

pub fn crc32_u16(crc: u32, value: u16) -> u32 {
    update(crc, &value.to_le_bytes())
}

pub fn crc32_u32(crc: u32, value: u32) -> u32 {
    update(crc, &value.to_le_bytes())
}

pub fn crc32_u64(crc: u32, value: u64) -> u32 {
    update(crc, &value.to_le_bytes())
}

/// Folds the low `width` bits of `value` into `crc`.
pub fn crc32(width: Width, crc: u32, value: u64) -> u32 {
    let bytes = value.to_le_bytes();
    update(crc, &bytes[..width.bytes()])
}
