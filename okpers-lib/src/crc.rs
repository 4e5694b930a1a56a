// CRC-16 as used by frames, configuration blocks and device responses
// (reflected CCITT polynomial 0x8408, initial value 0xffff, no final xor).

use ::crc::{CRC_16_MCRF4XX, Crc};

use crate::constants::CRC_OK_RESIDUAL;

static CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MCRF4XX);

pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Checksum trailer the device appends to responses: `!crc16(data)`, little endian.
pub fn response_trailer(data: &[u8]) -> [u8; 2] {
    (!crc16(data)).to_le_bytes()
}

/// True if `data` ends with a valid inverted CRC trailer.
pub fn residual_ok(data: &[u8]) -> bool {
    crc16(data) == CRC_OK_RESIDUAL
}
