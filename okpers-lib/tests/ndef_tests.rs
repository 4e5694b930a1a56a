//! Tests for NDEF record construction

use okpers_lib::constants::NDEF_DATA_SIZE;
use okpers_lib::error::KeyError;
use okpers_lib::ndef::{NDEF_TYPE_TEXT, NDEF_TYPE_URI, Ndef, URI_PREFIXES};

#[test]
fn test_uri_with_known_prefix() {
    let ndef = Ndef::uri("https://my.yubico.com/neo/").unwrap();

    assert_eq!(ndef.record_type, NDEF_TYPE_URI);
    assert_eq!(ndef.data[0], 0x04);
    assert_eq!(&ndef.data[1..ndef.len as usize], b"my.yubico.com/neo/");
    assert_eq!(ndef.to_text().unwrap(), "https://my.yubico.com/neo/");
}

#[test]
fn test_uri_prefers_www_variant() {
    let ndef = Ndef::uri("http://www.example.org").unwrap();

    assert_eq!(ndef.data[0], 0x01, "http://www. beats http://");
    assert_eq!(ndef.len as usize, "example.org".len() + 1);
}

#[test]
fn test_uri_without_prefix() {
    let ndef = Ndef::uri("example:opaque").unwrap();

    assert_eq!(ndef.data[0], 0x00);
    assert_eq!(ndef.to_text().unwrap(), "example:opaque");
}

#[test]
fn test_uri_too_long() {
    let long = format!("https://{}", "a".repeat(NDEF_DATA_SIZE));
    let err = Ndef::uri(&long).unwrap_err();
    assert!(matches!(err, KeyError::InvalidArgument(_)), "expected InvalidArgument, got {err:?}");

    // exactly fills the record after the identifier byte
    let fits = format!("https://{}", "a".repeat(NDEF_DATA_SIZE - 1));
    assert_eq!(Ndef::uri(&fits).unwrap().len as usize, NDEF_DATA_SIZE);
}

#[test]
fn test_text_record() {
    let ndef = Ndef::text("Hello, key", "en", false).unwrap();

    assert_eq!(ndef.record_type, NDEF_TYPE_TEXT);
    assert_eq!(ndef.data[0], 2, "status byte carries the language length");
    assert_eq!(&ndef.data[1..3], b"en");
    assert_eq!(ndef.len, 13);
    assert!(!ndef.is_utf16());
    assert_eq!(ndef.language().as_deref(), Some("en"));
    assert_eq!(ndef.to_text().unwrap(), "Hello, key");
}

#[test]
fn test_text_record_utf16_flag() {
    let ndef = Ndef::text("abc", "sv-SE", true).unwrap();

    assert_eq!(ndef.data[0], 0x85, "UTF-16 bit on top of the language length");
    assert!(ndef.is_utf16());
    assert_eq!(ndef.language().as_deref(), Some("sv-SE"));
    assert_eq!(ndef.to_text().unwrap(), "abc");
}

#[test]
fn test_text_too_long() {
    let err = Ndef::text(&"x".repeat(NDEF_DATA_SIZE - 2), "en", false).unwrap_err();
    assert!(matches!(err, KeyError::InvalidArgument(_)));
}

#[test]
fn test_language_of_uri_record() {
    let ndef = Ndef::uri("tel:+4612345").unwrap();
    assert_eq!(ndef.language(), None);
    assert_eq!(ndef.to_text().unwrap(), "tel:+4612345");
}

#[test]
fn test_every_uri_prefix_round_trips() {
    for (index, prefix) in URI_PREFIXES.iter().enumerate() {
        let uri = format!("{prefix}x");
        let ndef = Ndef::uri(&uri).unwrap();

        assert_eq!(ndef.data[0] as usize, index + 1, "{prefix} has identifier code {}", index + 1);
        assert_eq!(ndef.len, 2, "{prefix} must be stored as its code");
        assert_eq!(ndef.to_text().unwrap(), uri);
    }
}
