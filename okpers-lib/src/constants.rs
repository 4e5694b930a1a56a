// Wire-level constants for the feature-report protocol

use std::time::Duration;

/// Size of one HID feature report (7 payload bytes + 1 status/sequence byte)
pub const FEATURE_RPT_SIZE: usize = 8;

/// Payload bytes carried by a single report
pub const REPORT_DATA_SIZE: usize = FEATURE_RPT_SIZE - 1;

/// Index of the status/sequence byte inside a report
pub const REPORT_STATUS_OFFSET: usize = FEATURE_RPT_SIZE - 1;

/// Host is writing a frame; cleared by the device once a report is consumed
pub const SLOT_WRITE_FLAG: u8 = 0x80;

/// Device has response data queued
pub const RESP_PENDING_FLAG: u8 = 0x40;

/// Device is waiting for the user to touch the key
pub const RESP_TIMEOUT_WAIT_FLAG: u8 = 0x20;

/// Low five bits of the status byte carry the sequence number
pub const SEQUENCE_MASK: u8 = 0x1f;

/// Status byte of the "update only" report that resets the device read state
pub const DUMMY_REPORT_WRITE: u8 = 0x8f;

/// Payload capacity of a frame
pub const FRAME_PAYLOAD_SIZE: usize = 64;

/// payload(64) + slot(1) + crc(2) + filler(3)
pub const FRAME_SIZE: usize = 70;

/// Number of 7-byte chunks a frame is split into
pub const FRAME_CHUNKS: usize = FRAME_SIZE / REPORT_DATA_SIZE;

/// Residual of a CRC-16 run over data followed by its inverted checksum
pub const CRC_OK_RESIDUAL: u16 = 0xf0b8;

// Touch-level bits of the status report
pub const CONFIG1_VALID: u16 = 0x01;
pub const CONFIG2_VALID: u16 = 0x02;
pub const CONFIG1_TOUCH: u16 = 0x04;
pub const CONFIG2_TOUCH: u16 = 0x08;
pub const CONFIG_LED_INV: u16 = 0x10;

/// Budget for the device to consume a written report
pub const WAIT_FOR_WRITE_FLAG: Duration = Duration::from_millis(1150);

/// Budget for a response to become pending
pub const WAIT_FOR_RESPONSE: Duration = Duration::from_millis(1000);

/// One-shot budget extension once the device asks for a touch
pub const USER_INTERACTION_GRACE: Duration = Duration::from_millis(256_000);

/// First poll delay; doubles after every poll
pub const POLL_INITIAL_SLEEP: Duration = Duration::from_millis(1);

/// Upper bound of the poll delay
pub const POLL_MAX_SLEEP: Duration = Duration::from_millis(500);

// Configuration block field sizes
pub const FIXED_SIZE: usize = 16;
pub const UID_SIZE: usize = 6;
pub const KEY_SIZE: usize = 16;
pub const ACC_CODE_SIZE: usize = 6;
pub const KEY_SIZE_OATH: usize = 20;
pub const CONFIG_SIZE: usize = 52;

/// Bytes of the 160-bit HMAC key that spill over into `uid`
pub const KEY_EXTENSION_SIZE: usize = KEY_SIZE_OATH - KEY_SIZE;

/// Largest accepted OATH initial moving factor
pub const OATH_IMF_MAX: u32 = 0xffff * 16;

// NDEF record
pub const NDEF_DATA_SIZE: usize = 54;
pub const NDEF_SIZE: usize = 62;

/// Length of the keyboard scan map
pub const SCAN_MAP_SIZE: usize = 45;

/// Maximum length of a device-info TLV blob
pub const DEVICE_INFO_MAX_SIZE: usize = 64;

/// Salt length used by passphrase key derivation
pub const PASSPHRASE_SALT_SIZE: usize = 8;

/// PBKDF2 iteration count used by passphrase key derivation
pub const PASSPHRASE_ROUNDS: u32 = 1024;

/// Default keyboard scan map
pub const DEFAULT_SCAN_MAP: &[u8; SCAN_MAP_SIZE] = b"cbdefghijklnrtuvCBDEFGHIJKLNRTUV0123456789!\t\r";

// USB identification
pub const PRIMARY_VENDOR_ID: u16 = 0x1050;
pub const FALLBACK_VENDOR_ID: u16 = 0x1d50;
pub const KNOWN_PRODUCT_IDS: &[u16] = &[
    0x0010, 0x0110, 0x0111, 0x0114, 0x0116, 0x0401, 0x0403, 0x0405, 0x0407, 0x0410, 0x60fc,
];

/// Per-transfer timeout for HID control transfers
pub const USB_CONTROL_TIMEOUT: Duration = Duration::from_millis(1000);
