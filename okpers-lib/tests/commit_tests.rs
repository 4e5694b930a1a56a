//! Tests for writes that must be confirmed by the programming sequence

mod common;

use common::*;
use okpers_lib::config::{Flag, KeyConfig};
use okpers_lib::crc::residual_ok;
use okpers_lib::device_config::{DeviceConfig, DeviceMode};
use okpers_lib::ndef::Ndef;
use okpers_lib::tlv::{DeviceInfoBuilder, DeviceInfoTag};

fn slot1_config(key: &mut Key<MockKey>) -> KeyConfig {
    let status = key.status().expect("status read");
    KeyConfig::for_slot(1, &status).expect("slot 1 is always available")
}

#[test]
fn test_write_config_commits() {
    init_tracing();
    let mut key = MockKey::new(2, 2, 3).key();
    let mut config = slot1_config(&mut key);
    config.set_fixed(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    config.set_flag(Flag::TabFirst, true).unwrap();

    key.write_config(&config, None).expect("key accepts the configuration");

    let mock = key.transport();
    assert_eq!(mock.pgm_seq, 2, "programming sequence moves on a committed write");
    let (slot, payload) = &mock.frames[0];
    assert_eq!(*slot, u8::from(Command::Config1));
    assert!(residual_ok(&payload[..CONFIG_SIZE]), "block CRC must be filled in before sending");
    assert_eq!(&payload[..6], &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    assert_eq!(&payload[CONFIG_SIZE..CONFIG_SIZE + ACC_CODE_SIZE], &[0; ACC_CODE_SIZE]);
}

#[test]
fn test_current_access_code_follows_block() {
    let mut key = MockKey::new(2, 2, 3).key();
    let config = slot1_config(&mut key);
    let code = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];

    key.write_config(&config, Some(&code)).expect("write succeeds");

    let payload = &key.transport().frames[0].1;
    assert_eq!(&payload[CONFIG_SIZE..CONFIG_SIZE + ACC_CODE_SIZE], &code);
}

#[test]
fn test_rejected_write_is_write_error() {
    let mut mock = MockKey::new(2, 2, 3);
    mock.ignore_writes = true;
    let mut key = mock.key();
    let config = slot1_config(&mut key);

    let err = key.write_config(&config, None).unwrap_err();

    assert!(matches!(err, KeyError::WriteError), "expected WriteError, got {err:?}");
    assert_eq!(err.code(), ErrorCode::WriteError);
}

#[test]
fn test_erase_last_slot_resets_sequence() {
    let mut mock = MockKey::new(2, 2, 3);
    mock.pgm_seq = 5;
    mock.touch_level = CONFIG1_VALID;
    let mut key = mock.key();

    key.erase_slot(1, None).expect("erase commits");

    let status = key.status().unwrap();
    assert_eq!(status.pgm_seq, 0);
    assert!(!status.config1_valid());
    assert!(!status.is_programmed());
}

#[test]
fn test_unprogrammed_key_with_zero_sequence_counts_as_committed() {
    // sequence cannot move on a key that has nothing programmed
    let mut mock = MockKey::new(2, 2, 3);
    mock.pgm_seq = 0;
    mock.touch_level = 0;
    mock.ignore_writes = true;
    let mut key = mock.key();

    key.erase_slot(2, None).expect("both slots empty and sequence zero is success");
}

#[test]
fn test_unchanged_sequence_on_programmed_key_fails() {
    let mut mock = MockKey::new(2, 2, 3);
    mock.pgm_seq = 3;
    mock.touch_level = CONFIG2_VALID;
    mock.ignore_writes = true;
    let mut key = mock.key();

    let err = key.erase_slot(2, None).unwrap_err();
    assert!(matches!(err, KeyError::WriteError), "expected WriteError, got {err:?}");
}

#[test]
fn test_erase_invalid_slot() {
    let mut key = MockKey::new(2, 2, 3).key();
    let err = key.erase_slot(3, None).unwrap_err();
    assert!(matches!(err, KeyError::InvalidCommand));
    assert!(key.transport().reports_written.is_empty());
}

#[test]
fn test_swap_slots() {
    let mut key = MockKey::new(2, 3, 0).key();

    key.swap_slots(None).expect("swap commits");

    let status = key.status().unwrap();
    assert!(!status.config1_valid());
    assert!(status.config2_valid(), "slot 1 contents moved to slot 2");
    assert_eq!(key.transport().frames[0].0, u8::from(Command::Swap));
}

#[test]
fn test_write_ndef() {
    let mut key = MockKey::new(3, 0, 0).key();
    let mut ndef = Ndef::uri("https://example.com/otp/").unwrap();
    ndef.set_access_code(&[1, 2, 3, 4, 5, 6]);

    key.write_ndef(&ndef, 2).expect("NDEF write commits");

    let (slot, payload) = &key.transport().frames[0];
    assert_eq!(*slot, u8::from(Command::Ndef2));
    assert_eq!(payload[0] as usize, "example.com/otp/".len() + 1);
    assert_eq!(payload[1], b'U');
    assert_eq!(payload[2], 4, "https:// is identifier code 4");
    assert_eq!(&payload[56..62], &[1, 2, 3, 4, 5, 6], "access code closes the record");
}

#[test]
fn test_write_ndef_invalid_slot() {
    let mut key = MockKey::new(3, 0, 0).key();
    let ndef = Ndef::text("hello", "en", false).unwrap();

    let err = key.write_ndef(&ndef, 0).unwrap_err();
    assert!(matches!(err, KeyError::InvalidCommand), "expected InvalidCommand, got {err:?}");
}

#[test]
fn test_write_device_config() {
    let mut key = MockKey::new(3, 3, 0).key();
    let mut config = DeviceConfig::default();
    config.set_mode(DeviceMode::OtpU2fCcid, true);
    config.set_chalresp_timeout(15);
    config.set_autoeject_time(258);

    key.write_device_config(&config).expect("device config commits");

    let (slot, payload) = &key.transport().frames[0];
    assert_eq!(*slot, u8::from(Command::DeviceConfig));
    assert_eq!(&payload[..4], &[0x86, 0x0f, 0x02, 0x01]);
}

#[test]
fn test_write_scan_map() {
    let mut key = MockKey::new(3, 3, 0).key();

    key.write_scan_map(DEFAULT_SCAN_MAP).expect("scan map commits");
    assert_eq!(&key.transport().frames[0].1[..SCAN_MAP_SIZE], DEFAULT_SCAN_MAP);

    let err = key.write_scan_map(&DEFAULT_SCAN_MAP[..40]).unwrap_err();
    assert!(matches!(err, KeyError::WrongSize { expected: 45, actual: 40 }));
}

#[test]
fn test_write_device_info() {
    let mut key = MockKey::new(5, 0, 0).key();
    let blob = DeviceInfoBuilder::new()
        .push(DeviceInfoTag::AutoEjectTimeout, &[0x00, 0x3c])
        .and_then(DeviceInfoBuilder::build)
        .unwrap();

    key.write_device_info(&blob).expect("device info commits");
    assert_eq!(&key.transport().frames[0].1[..blob.len()], blob.as_slice());

    let err = key.write_device_info(&[0u8; 65]).unwrap_err();
    assert!(matches!(err, KeyError::WrongSize { expected: 64, actual: 65 }));
}

#[test]
fn test_key_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Key<MockKey>>();
}
