use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Slot/command numbers understood by the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, strum_macros::Display)]
#[repr(u8)]
pub enum Command {
    #[strum(to_string = "slot 1 configuration")]
    Config1 = 0x01,
    #[strum(to_string = "slot 2 configuration")]
    Config2 = 0x03,
    #[strum(to_string = "slot 1 update")]
    Update1 = 0x04,
    #[strum(to_string = "slot 2 update")]
    Update2 = 0x05,
    #[strum(to_string = "slot swap")]
    Swap = 0x06,
    #[strum(to_string = "NDEF slot 1")]
    Ndef1 = 0x08,
    #[strum(to_string = "NDEF slot 2")]
    Ndef2 = 0x09,
    #[strum(to_string = "device serial")]
    DeviceSerial = 0x10,
    #[strum(to_string = "device configuration")]
    DeviceConfig = 0x11,
    #[strum(to_string = "scan map")]
    ScanMap = 0x12,
    #[strum(to_string = "capabilities")]
    Capabilities = 0x13,
    #[strum(to_string = "set device info")]
    SetDeviceInfo = 0x15,
    #[strum(to_string = "challenge-response OTP slot 1")]
    ChalOtp1 = 0x20,
    #[strum(to_string = "challenge-response OTP slot 2")]
    ChalOtp2 = 0x28,
    #[strum(to_string = "challenge-response HMAC slot 1")]
    ChalHmac1 = 0x30,
    #[strum(to_string = "challenge-response HMAC slot 2")]
    ChalHmac2 = 0x38,
}

impl Command {
    /// Meaningful response bytes of a challenge-response command, `None` for anything else.
    pub fn challenge_response_len(self) -> Option<usize> {
        match self {
            Command::ChalHmac1 | Command::ChalHmac2 => Some(20),
            Command::ChalOtp1 | Command::ChalOtp2 => Some(16),
            _ => None,
        }
    }

    pub fn is_slot_write(self) -> bool {
        matches!(
            self,
            Command::Config1 | Command::Config2 | Command::Update1 | Command::Update2 | Command::Swap
        )
    }

    /// Configuration slot (1 or 2) this command addresses, if any.
    pub fn config_num(self) -> Option<u8> {
        match self {
            Command::Config1 | Command::Update1 | Command::Ndef1 | Command::ChalOtp1 | Command::ChalHmac1 => Some(1),
            Command::Config2 | Command::Update2 | Command::Ndef2 | Command::ChalOtp2 | Command::ChalHmac2 => Some(2),
            _ => None,
        }
    }
}
