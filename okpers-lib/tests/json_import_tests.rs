//! Tests for the yubiProdConfig JSON document

use okpers_lib::config::{ConfigMode, ExportFormat, Flag, KeyConfig};
use okpers_lib::error::KeyError;
use okpers_lib::status::Status;

const OATH_SAMPLE: &str = r#"{ "yubiProdConfig": { "mode": "oathHOTP", "options": { "fixedModhex": false, "oathDigits": 6, "fixedSeedvalue": 0, "randomSeed": false, "tabFirst": false, "tabBetween": false, "tabLast": false, "appendDelay1": false, "appendDelay2": false, "appendCR": true, "protectSecond": false, "sendRef": false, "ticketFirst": false, "pacing10MS": false, "pacing20MS": false, "allowHidtrig": false, "serialBtnVisible": true, "serialUsbVisible": false, "serialApiVisible": true, "useNumericKeypad": false, "fastTrig": false, "allowUpdate": false, "dormant": false, "ledInverted": false } } }"#;

fn status(major: u8, minor: u8, build: u8) -> Status {
    Status {
        version_major: major,
        version_minor: minor,
        version_build: build,
        ..Status::default()
    }
}

#[test]
fn test_export_of_fresh_config() {
    let config = KeyConfig::new();

    let text = config.export(ExportFormat::Json).expect("export never fails for a valid config");

    assert!(!text.is_empty());
    assert!(text.contains("yubiProdConfig"));
    assert!(text.contains("\"yubicoOTP\""));
}

#[test]
fn test_import_oath_sample() {
    let mut config = KeyConfig::new();
    config.configure_version(&status(2, 2, 3));

    config.import(OATH_SAMPLE, ExportFormat::Json).expect("sample imports");

    assert!(config.flag(Flag::OathHotp), "mode oathHOTP sets OATH_HOTP");
    assert!(config.flag(Flag::AppendCr));
    assert!(!config.flag(Flag::OathHotp8), "oathDigits 6");
    assert!(config.flag(Flag::SerialBtnVisible));
    assert!(config.flag(Flag::SerialApiVisible));
    assert_eq!(config.mode(), ConfigMode::OathHotp);
    assert_eq!(config.oath_imf(), 0);
}

#[test]
fn test_import_skips_options_the_key_lacks() {
    // useNumericKeypad needs 2.3; on 2.2.3 the option is dropped instead of failing
    let mut config = KeyConfig::with_version(status(2, 2, 3).firmware());
    let doc = r#"{"yubiProdConfig": {"mode": "yubicoOTP", "options": {"useNumericKeypad": true, "tabFirst": true}}}"#;

    config.import(doc, ExportFormat::Json).expect("import succeeds");

    assert!(!config.flag(Flag::UseNumericKeypad));
    assert!(config.flag(Flag::TabFirst));
}

#[test]
fn test_import_target_slot_two_on_old_key() {
    let mut config = KeyConfig::with_version(status(1, 3, 0).firmware());
    let doc = r#"{"yubiProdConfig": {"mode": "yubicoOTP", "targetConfig": 2}}"#;

    let err = config.import(doc, ExportFormat::Json).unwrap_err();

    assert!(matches!(err, KeyError::TooOld), "slot 2 needs firmware 2.x, got {err:?}");
}

#[test]
fn test_import_bad_target() {
    let mut config = KeyConfig::with_version(status(2, 2, 3).firmware());
    let doc = r#"{"yubiProdConfig": {"mode": "yubicoOTP", "targetConfig": 7}}"#;

    let err = config.import(doc, ExportFormat::Json).unwrap_err();
    assert!(matches!(err, KeyError::InvalidConfigNumber));
}

#[test]
fn test_import_non_boolean_option() {
    let mut config = KeyConfig::with_version(status(2, 2, 3).firmware());
    let doc = r#"{"yubiProdConfig": {"mode": "yubicoOTP", "options": {"appendCR": "yes"}}}"#;

    let err = config.import(doc, ExportFormat::Json).unwrap_err();
    assert!(matches!(err, KeyError::InvalidArgument(_)), "expected InvalidArgument, got {err:?}");
}

#[test]
fn test_import_malformed_json() {
    let mut config = KeyConfig::new();
    let err = config.import("{ not json", ExportFormat::Json).unwrap_err();
    assert!(matches!(err, KeyError::Json(_)), "expected Json, got {err:?}");
}

#[test]
fn test_import_key_material() {
    let mut config = KeyConfig::with_version(status(2, 2, 3).firmware());
    let doc = r#"{"yubiProdConfig": {
        "mode": "yubicoOTP",
        "fixed": "0102030405",
        "uid": "a1a2a3a4a5a6",
        "key": "000102030405060708090a0b0c0d0e0f",
        "accCode": "010203040506"
    }}"#;

    config.import(doc, ExportFormat::Json).expect("import succeeds");

    assert_eq!(config.fixed(), &[1, 2, 3, 4, 5]);
    assert_eq!(config.block().uid, [0xa1, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6]);
    assert_eq!(config.block().key[15], 0x0f);
    assert_eq!(config.access_code(), &[1, 2, 3, 4, 5, 6]);
}
