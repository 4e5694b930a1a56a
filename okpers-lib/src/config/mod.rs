//! Version-aware model of a slot configuration.
//!
//! [`KeyConfig`] pairs a [`ConfigBlock`] with the firmware version of the key it
//! is meant for and the command that will write it. Every mutator checks the
//! capability matrix first and leaves the block untouched on failure.

pub mod block;
pub mod capability;
pub mod export;
pub mod flags;
pub mod keygen;

use tracing::debug;

use crate::command::Command;
use crate::constants::*;
use crate::error::KeyError;
use crate::status::{FirmwareVersion, Status};

pub use block::ConfigBlock;
pub use capability::Capability;
pub use export::ExportFormat;
pub use flags::{ConfigMode, FLAGS, Flag, FlagField, FlagDef};

/// Firmware version assumed by [`KeyConfig::new`].
pub const DEFAULT_FIRMWARE: FirmwareVersion = FirmwareVersion::new(1, 3, 0);

/// How the access code of a new configuration was chosen; informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessCodeType {
    #[default]
    None,
    Random,
    Serial,
}

/// Factory defaults for slot 1: output OTP followed by carriage return.
pub fn default_config1() -> ConfigBlock {
    let mut block = ConfigBlock::zeroed();
    block.tkt_flags = Flag::AppendCr.mask();
    block
}

/// Factory defaults for slot 2: a strong static password.
pub fn default_config2() -> ConfigBlock {
    let mut block = ConfigBlock::zeroed();
    block.tkt_flags = Flag::AppendCr.mask();
    block.cfg_flags =
        Flag::StaticTicket.mask() | Flag::StrongPw1.mask() | Flag::StrongPw2.mask() | Flag::ManUpdate.mask();
    block
}

#[derive(Debug, Clone)]
pub struct KeyConfig {
    version: FirmwareVersion,
    command: Command,
    block: ConfigBlock,
    access_code_type: AccessCodeType,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyConfig {
    /// Slot 1 defaults for firmware 1.3.0.
    pub fn new() -> Self {
        Self {
            version: DEFAULT_FIRMWARE,
            command: Command::Config1,
            block: default_config1(),
            access_code_type: AccessCodeType::None,
        }
    }

    /// Empty block targeting slot 1 of a key running `version`.
    pub fn with_version(version: FirmwareVersion) -> Self {
        Self {
            version,
            command: Command::Config1,
            block: ConfigBlock::zeroed(),
            access_code_type: AccessCodeType::None,
        }
    }

    /// Slot defaults for `confnum` (1 or 2) on the key that reported `status`.
    pub fn for_slot(confnum: u8, status: &Status) -> Result<Self, KeyError> {
        let mut config = Self::with_version(status.firmware());
        config.configure_for(confnum)?;
        Ok(config)
    }

    /// Reset the block to the defaults of slot `confnum` and target that slot.
    pub fn configure_for(&mut self, confnum: u8) -> Result<(), KeyError> {
        let (block, command) = match confnum {
            1 => (default_config1(), Command::Config1),
            2 => (default_config2(), Command::Config2),
            _ => return Err(KeyError::InvalidConfigNumber),
        };
        self.block = block;
        self.configure_command(command)
    }

    pub fn configure_version(&mut self, status: &Status) {
        self.version = status.firmware();
    }

    /// Select the command this configuration is written with, if the firmware supports it.
    pub fn configure_command(&mut self, command: Command) -> Result<(), KeyError> {
        let v = self.version;
        match command {
            Command::Config1 => {}
            Command::Config2 => {
                if v.major < 2 {
                    return Err(KeyError::TooOld);
                }
                if capability::is_neo(v) {
                    return Err(KeyError::UnsupportedVersion);
                }
            }
            Command::Update1 | Command::Update2 | Command::Swap => {
                if !((v.major == 2 && v.minor >= 3) || v.major > 2) {
                    return Err(KeyError::TooOld);
                }
            }
            Command::DeviceConfig | Command::ScanMap => {
                // Device configuration additionally ends with the 5.x series.
                if command == Command::DeviceConfig && v.major > 5 {
                    return Err(KeyError::UnsupportedVersion);
                }
                if v.major < 3 {
                    return Err(KeyError::UnsupportedVersion);
                }
            }
            Command::SetDeviceInfo => {
                if v.major < 5 {
                    return Err(KeyError::UnsupportedVersion);
                }
            }
            Command::Ndef2 => {
                if v.major != 3 && v.major != 5 {
                    return Err(KeyError::UnsupportedVersion);
                }
            }
            Command::Ndef1 => {
                if !(capability::is_neo(v) || v.major == 3 || v.major >= 5) {
                    return Err(KeyError::UnsupportedVersion);
                }
            }
            _ => return Err(KeyError::InvalidConfigNumber),
        }
        debug!(%command, firmware = %v, "Configured command");
        self.command = command;
        Ok(())
    }

    pub fn version(&self) -> FirmwareVersion {
        self.version
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn block(&self) -> &ConfigBlock {
        &self.block
    }

    /// Slot number addressed by the current command, if any.
    pub fn config_num(&self) -> Option<u8> {
        self.command.config_num()
    }

    pub fn has(&self, capability: Capability) -> bool {
        capability.is_supported_by(self.version)
    }

    pub fn access_code_type(&self) -> AccessCodeType {
        self.access_code_type
    }

    pub fn set_access_code_type(&mut self, kind: AccessCodeType) {
        self.access_code_type = kind;
    }

    fn field(&self, field: FlagField) -> u8 {
        match field {
            FlagField::Ticket => self.block.tkt_flags,
            FlagField::Config => self.block.cfg_flags,
            FlagField::Extended => self.block.ext_flags,
        }
    }

    fn field_mut(&mut self, field: FlagField) -> &mut u8 {
        match field {
            FlagField::Ticket => &mut self.block.tkt_flags,
            FlagField::Config => &mut self.block.cfg_flags,
            FlagField::Extended => &mut self.block.ext_flags,
        }
    }

    /// True if every bit of `flag` is set. Never fails.
    pub fn flag(&self, flag: Flag) -> bool {
        let def = flag.def();
        self.field(def.field) & def.mask == def.mask
    }

    /// Set or clear `flag`; fails without touching the block if the firmware lacks the capability.
    pub fn set_flag(&mut self, flag: Flag, on: bool) -> Result<(), KeyError> {
        let def = flag.def();
        if !self.has(def.capability) {
            return Err(KeyError::UnsupportedVersion);
        }
        let byte = self.field_mut(def.field);
        if on {
            *byte |= def.mask;
        } else {
            *byte &= !def.mask;
        }
        Ok(())
    }

    /// Zero the ticket, config and extended flag bytes.
    pub fn clear_flags(&mut self) {
        self.block.tkt_flags = 0;
        self.block.cfg_flags = 0;
        self.block.ext_flags = 0;
    }

    /// Operating mode implied by the current flags.
    pub fn mode(&self) -> ConfigMode {
        let cfg = self.block.cfg_flags;
        if self.block.tkt_flags & Flag::OathHotp.mask() == Flag::OathHotp.mask() {
            if cfg & Flag::ChalHmac.mask() == Flag::ChalHmac.mask() {
                ConfigMode::ChalHmac
            } else if cfg & Flag::ChalYubico.mask() == Flag::ChalYubico.mask() {
                ConfigMode::ChalYubico
            } else {
                ConfigMode::OathHotp
            }
        } else if cfg & Flag::StaticTicket.mask() == Flag::StaticTicket.mask() {
            ConfigMode::StaticTicket
        } else {
            ConfigMode::YubicoOtp
        }
    }

    /// Set the flags that select `mode`. Other flags are left as they are.
    pub fn set_mode(&mut self, mode: ConfigMode) -> Result<(), KeyError> {
        match mode {
            ConfigMode::YubicoOtp => Ok(()),
            ConfigMode::OathHotp => self.set_flag(Flag::OathHotp, true),
            ConfigMode::ChalHmac => {
                self.set_flag(Flag::ChalResp, true)?;
                self.set_flag(Flag::ChalHmac, true)
            }
            ConfigMode::ChalYubico => {
                self.set_flag(Flag::ChalResp, true)?;
                self.set_flag(Flag::ChalYubico, true)
            }
            ConfigMode::StaticTicket => self.set_flag(Flag::StaticTicket, true),
        }
    }

    /// Copy up to 16 bytes into `fixed`, zero-fill the rest and record the length.
    pub fn set_fixed(&mut self, fixed: &[u8]) {
        let n = copy_truncated(&mut self.block.fixed, fixed);
        self.block.fixed_size = n as u8;
    }

    pub fn fixed(&self) -> &[u8] {
        &self.block.fixed[..(self.block.fixed_size as usize).min(FIXED_SIZE)]
    }

    pub fn set_uid(&mut self, uid: &[u8]) {
        copy_truncated(&mut self.block.uid, uid);
    }

    pub fn set_access_code(&mut self, code: &[u8]) {
        copy_truncated(&mut self.block.acc_code, code);
    }

    pub fn access_code(&self) -> &[u8; ACC_CODE_SIZE] {
        &self.block.acc_code
    }

    /// Set the OATH initial moving factor, stored as `imf / 16` big endian in `uid[4..6]`.
    pub fn set_oath_imf(&mut self, imf: u32) -> Result<(), KeyError> {
        if !self.has(Capability::OathImf) {
            return Err(KeyError::UnsupportedVersion);
        }
        if imf > OATH_IMF_MAX || imf % 16 != 0 {
            return Err(KeyError::InvalidArgument(format!(
                "OATH IMF {imf} must be a multiple of 16 no larger than {OATH_IMF_MAX}"
            )));
        }
        let stored = (imf / 16) as u16;
        self.block.uid[KEY_EXTENSION_SIZE..].copy_from_slice(&stored.to_be_bytes());
        Ok(())
    }

    /// The OATH initial moving factor, or 0 when the firmware cannot store one.
    pub fn oath_imf(&self) -> u32 {
        if !self.has(Capability::OathImf) {
            return 0;
        }
        let stored = u16::from_be_bytes([self.block.uid[4], self.block.uid[5]]);
        (stored as u32) << 4
    }

    /// Key length in bytes the current mode uses: 20 for OATH-HOTP and HMAC challenge-response, else 16.
    pub fn supported_key_length(&self) -> usize {
        if (self.flag(Flag::OathHotp) && !self.flag(Flag::ChalYubico))
            || (self.flag(Flag::ChalResp) && self.flag(Flag::ChalHmac))
        {
            KEY_SIZE_OATH
        } else {
            KEY_SIZE
        }
    }

    pub(crate) fn block_mut(&mut self) -> &mut ConfigBlock {
        &mut self.block
    }
}

fn copy_truncated(dst: &mut [u8], src: &[u8]) -> usize {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    dst[n..].fill(0);
    n
}
