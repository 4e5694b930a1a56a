use modular_bitfield::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::constants::*;
use crate::error::KeyError;

/// Last byte of every feature report.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportStatus {
    pub sequence: B5,
    pub timeout_wait: bool,
    pub response_pending: bool,
    pub write_pending: bool,
}

impl ReportStatus {
    pub fn of_report(report: &[u8; FEATURE_RPT_SIZE]) -> Self {
        Self::from_bytes([report[REPORT_STATUS_OFFSET]])
    }
}

/// Status report as laid out in report bytes 1..7
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct StatusRaw {
    pub version_major: u8,
    pub version_minor: u8,
    pub version_build: u8,
    pub pgm_seq: u8,
    pub touch_level: U16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
}

impl FirmwareVersion {
    pub const fn new(major: u8, minor: u8, build: u8) -> Self {
        Self { major, minor, build }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

impl std::str::FromStr for FirmwareVersion {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(KeyError::InvalidArgument(format!("firmware version '{s}' is not major.minor.build")));
        }
        let parse = |p: &str| {
            p.parse::<u8>()
                .map_err(|_| KeyError::InvalidArgument(format!("bad version component '{p}' in '{s}'")))
        };
        Ok(Self::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Status {
    pub version_major: u8,
    pub version_minor: u8,
    pub version_build: u8,
    pub pgm_seq: u8,
    pub touch_level: u16,
}

impl From<StatusRaw> for Status {
    fn from(raw: StatusRaw) -> Self {
        Self {
            version_major: raw.version_major,
            version_minor: raw.version_minor,
            version_build: raw.version_build,
            pgm_seq: raw.pgm_seq,
            touch_level: raw.touch_level.get(),
        }
    }
}

impl Status {
    /// Parse a status from a full feature report; byte 0 is ignored.
    pub fn from_report(report: &[u8; FEATURE_RPT_SIZE]) -> Result<Self, KeyError> {
        let raw = StatusRaw::read_from_bytes(&report[1..REPORT_STATUS_OFFSET]).map_err(|_| KeyError::WrongSize {
            expected: std::mem::size_of::<StatusRaw>(),
            actual: REPORT_STATUS_OFFSET - 1,
        })?;
        Ok(Self::from(raw))
    }

    pub fn firmware(&self) -> FirmwareVersion {
        FirmwareVersion::new(self.version_major, self.version_minor, self.version_build)
    }

    pub fn config1_valid(&self) -> bool {
        self.touch_level & CONFIG1_VALID != 0
    }

    pub fn config2_valid(&self) -> bool {
        self.touch_level & CONFIG2_VALID != 0
    }

    /// True if at least one slot holds a configuration.
    pub fn is_programmed(&self) -> bool {
        self.touch_level & (CONFIG1_VALID | CONFIG2_VALID) != 0
    }

    pub fn config1_touch(&self) -> bool {
        self.touch_level & CONFIG1_TOUCH != 0
    }

    pub fn config2_touch(&self) -> bool {
        self.touch_level & CONFIG2_TOUCH != 0
    }

    pub fn led_inverted(&self) -> bool {
        self.touch_level & CONFIG_LED_INV != 0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "firmware {} pgm_seq {} touch_level 0x{:04x}",
            self.firmware(),
            self.pgm_seq,
            self.touch_level
        )
    }
}
