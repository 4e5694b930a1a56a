use nusb::transfer::TransferError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

/// The primary error type for the `okpers-lib` library.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("no key present. Is the device connected?")]
    DeviceNotFound,

    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),

    #[error("USB transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("wrong size: expected {expected} bytes, got {actual}")]
    WrongSize { expected: usize, actual: usize },

    #[error("write error: the key did not accept the new configuration")]
    WriteError,

    #[error("timeout")]
    Timeout,

    #[error("operation would block")]
    WouldBlock,

    #[error("checksum mismatch")]
    Checksum,

    #[error("invalid command for operation")]
    InvalidCommand,

    #[error("unsupported firmware version")]
    UnsupportedVersion,

    #[error("firmware too old for this operation")]
    TooOld,

    #[error("invalid configuration number")]
    InvalidConfigNumber,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no source of randomness available")]
    NoRandom,

    #[error("not yet implemented")]
    NotYetImplemented,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl KeyError {
    /// Stable numeric classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            KeyError::DeviceNotFound => ErrorCode::NoKey,
            KeyError::Usb(_) | KeyError::Transfer(_) | KeyError::Transport(_) => ErrorCode::Usb,
            KeyError::WrongSize { .. } => ErrorCode::WrongSize,
            KeyError::WriteError => ErrorCode::WriteError,
            KeyError::Timeout => ErrorCode::Timeout,
            KeyError::WouldBlock => ErrorCode::WouldBlock,
            KeyError::Checksum => ErrorCode::Checksum,
            KeyError::InvalidCommand => ErrorCode::InvalidCommand,
            KeyError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            KeyError::TooOld => ErrorCode::TooOld,
            KeyError::InvalidConfigNumber => ErrorCode::InvalidConfigNumber,
            KeyError::InvalidArgument(_) | KeyError::Json(_) | KeyError::Hex(_) => ErrorCode::InvalidArgument,
            KeyError::NoRandom => ErrorCode::NoRandom,
            KeyError::NotYetImplemented => ErrorCode::NotYetImplemented,
        }
    }
}

/// Numeric error codes with a fixed description table.
///
/// Transport-level codes occupy `0x01..=0x0c`, configuration-model codes
/// `0x21..=0x27`. `ErrorCode::try_from(u8)` performs the reverse lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive, strum_macros::Display)]
#[repr(u8)]
pub enum ErrorCode {
    #[strum(to_string = "USB error")]
    Usb = 0x01,
    #[strum(to_string = "wrong size")]
    WrongSize = 0x02,
    #[strum(to_string = "write error")]
    WriteError = 0x03,
    #[strum(to_string = "timeout")]
    Timeout = 0x04,
    #[strum(to_string = "no key present")]
    NoKey = 0x05,
    #[strum(to_string = "unsupported firmware version")]
    UnsupportedVersion = 0x06,
    #[strum(to_string = "not yet implemented")]
    NotYetImplemented = 0x09,
    #[strum(to_string = "checksum mismatch")]
    Checksum = 0x0a,
    #[strum(to_string = "operation would block")]
    WouldBlock = 0x0b,
    #[strum(to_string = "invalid command for operation")]
    InvalidCommand = 0x0c,

    #[strum(to_string = "key too old for this operation")]
    TooOld = 0x24,
    #[strum(to_string = "invalid configuration number (this is a programming error)")]
    InvalidConfigNumber = 0x25,
    #[strum(to_string = "invalid argument")]
    InvalidArgument = 0x26,
    #[strum(to_string = "no randomness source available")]
    NoRandom = 0x27,
}

impl ErrorCode {
    pub fn description(&self) -> String {
        self.to_string()
    }
}
