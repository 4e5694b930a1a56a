use std::fmt;

use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};
use zeroize::Zeroize;

use crate::constants::*;
use crate::crc::crc16;

/// 52-byte slot configuration as the key stores it.
#[derive(Clone, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct ConfigBlock {
    pub fixed: [u8; FIXED_SIZE],
    pub uid: [u8; UID_SIZE],
    pub key: [u8; KEY_SIZE],
    pub acc_code: [u8; ACC_CODE_SIZE],
    pub fixed_size: u8,
    pub ext_flags: u8,
    pub tkt_flags: u8,
    pub cfg_flags: u8,
    pub ctr_offs: [u8; 2],
    pub crc: U16,
}

impl ConfigBlock {
    pub fn zeroed() -> Self {
        Self::new_zeroed()
    }

    /// Store `!crc16` of everything before the checksum field.
    pub fn update_crc(&mut self) {
        let crc = !crc16(&self.as_bytes()[..CONFIG_SIZE - 2]);
        self.crc.set(crc);
    }

    pub fn crc_valid(&self) -> bool {
        crate::crc::residual_ok(self.as_bytes())
    }
}

impl Default for ConfigBlock {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl Drop for ConfigBlock {
    fn drop(&mut self) {
        self.as_mut_bytes().zeroize();
    }
}

// Key material stays out of logs.
impl fmt::Debug for ConfigBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigBlock")
            .field("fixed", &hex::encode(&self.fixed[..self.fixed_size.min(FIXED_SIZE as u8) as usize]))
            .field("fixed_size", &self.fixed_size)
            .field("ext_flags", &format_args!("{:#04x}", self.ext_flags))
            .field("tkt_flags", &format_args!("{:#04x}", self.tkt_flags))
            .field("cfg_flags", &format_args!("{:#04x}", self.cfg_flags))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_is_52_bytes() {
        assert_eq!(std::mem::size_of::<ConfigBlock>(), CONFIG_SIZE);
    }

    #[test]
    fn crc_covers_everything_but_itself() {
        let mut block = ConfigBlock::zeroed();
        block.tkt_flags = 0x20;
        block.update_crc();
        assert!(block.crc_valid(), "freshly computed CRC must validate");
        block.cfg_flags = 0x01;
        assert!(!block.crc_valid(), "modifying the block must invalidate the CRC");
    }
}
