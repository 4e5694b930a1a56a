use num_enum::{IntoPrimitive, TryFromPrimitive};
use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::KeyError;

/// USB interface combination the key presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive, strum_macros::Display)]
#[repr(u8)]
pub enum DeviceMode {
    #[strum(to_string = "OTP")]
    Otp = 0x00,
    #[strum(to_string = "CCID")]
    Ccid = 0x01,
    #[strum(to_string = "OTP+CCID")]
    OtpCcid = 0x02,
    #[strum(to_string = "U2F")]
    U2f = 0x03,
    #[strum(to_string = "OTP+U2F")]
    OtpU2f = 0x04,
    #[strum(to_string = "U2F+CCID")]
    U2fCcid = 0x05,
    #[strum(to_string = "OTP+U2F+CCID")]
    OtpU2fCcid = 0x06,
}

impl DeviceMode {
    /// False for modes that turn the OTP interface off.
    pub fn has_otp(self) -> bool {
        matches!(self, DeviceMode::Otp | DeviceMode::OtpCcid | DeviceMode::OtpU2f | DeviceMode::OtpU2fCcid)
    }
}

pub const MODE_MASK: u8 = 0x07;
pub const MODE_FLAG_EJECT: u8 = 0x80;

/// Device-wide settings: mode(1) cr_timeout(1) auto_eject_time(2, LE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct DeviceConfig {
    pub mode: u8,
    pub cr_timeout: u8,
    pub auto_eject_time: U16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new_zeroed()
    }
}

impl DeviceConfig {
    pub fn set_mode(&mut self, mode: DeviceMode, eject: bool) {
        self.mode = u8::from(mode) | if eject { MODE_FLAG_EJECT } else { 0 };
    }

    pub fn device_mode(&self) -> Result<DeviceMode, KeyError> {
        DeviceMode::try_from(self.mode & MODE_MASK)
            .map_err(|e| KeyError::InvalidArgument(format!("unknown device mode {:#04x}", e.number)))
    }

    pub fn eject_flag(&self) -> bool {
        self.mode & MODE_FLAG_EJECT != 0
    }

    pub fn set_chalresp_timeout(&mut self, seconds: u8) {
        self.cr_timeout = seconds;
    }

    pub fn set_autoeject_time(&mut self, seconds: u16) {
        self.auto_eject_time.set(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_little_endian() {
        let mut config = DeviceConfig::default();
        config.set_mode(DeviceMode::OtpU2fCcid, true);
        config.set_chalresp_timeout(15);
        config.set_autoeject_time(0x0102);
        assert_eq!(config.as_bytes(), &[0x86, 0x0f, 0x02, 0x01]);
        assert_eq!(config.device_mode().expect("valid mode"), DeviceMode::OtpU2fCcid);
        assert!(config.eject_flag());
    }
}
