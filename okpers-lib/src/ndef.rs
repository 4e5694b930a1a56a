use std::fmt;

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::constants::*;
use crate::error::KeyError;

/// URI identifier codes from the NFC Forum URI record type definition; code = index + 1.
pub const URI_PREFIXES: [&str; 35] = [
    "http://www.",
    "https://www.",
    "http://",
    "https://",
    "tel:",
    "mailto:",
    "ftp://anonymous:anonymous@",
    "ftp://ftp.",
    "ftps://",
    "sftp://",
    "smb://",
    "nfs://",
    "ftp://",
    "dav://",
    "news:",
    "telnet://",
    "imap:",
    "rtsp://",
    "urn:",
    "pop:",
    "sip:",
    "sips:",
    "tftp:",
    "btspp://",
    "btl2cap://",
    "btgoep://",
    "tcpobex://",
    "irdaobex://",
    "file://",
    "urn:epc:id:",
    "urn:epc:tag:",
    "urn:epc:pat:",
    "urn:epc:raw:",
    "urn:epc:",
    "urn:nfc:",
];

pub const NDEF_TYPE_URI: u8 = b'U';
pub const NDEF_TYPE_TEXT: u8 = b'T';

const TEXT_UTF16_FLAG: u8 = 0x80;

/// NDEF record written to the NFC slot: len(1) type(1) data(54) cur_acc_code(6).
#[derive(Clone, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct Ndef {
    pub len: u8,
    pub record_type: u8,
    pub data: [u8; NDEF_DATA_SIZE],
    pub cur_acc_code: [u8; ACC_CODE_SIZE],
}

impl Ndef {
    /// URI record; the longest matching well-known prefix is replaced by its code.
    pub fn uri(uri: &str) -> Result<Self, KeyError> {
        let (code, rest) = match longest_prefix(uri) {
            Some(index) => (index as u8 + 1, &uri[URI_PREFIXES[index].len()..]),
            None => (0, uri),
        };
        let rest = rest.as_bytes();
        if rest.len() + 1 > NDEF_DATA_SIZE {
            return Err(KeyError::InvalidArgument(format!(
                "URI too long: {} bytes after prefix, at most {}",
                rest.len(),
                NDEF_DATA_SIZE - 1
            )));
        }

        let mut ndef = Self::new_zeroed();
        ndef.data[0] = code;
        ndef.data[1..=rest.len()].copy_from_slice(rest);
        ndef.len = (rest.len() + 1) as u8;
        ndef.record_type = NDEF_TYPE_URI;
        Ok(ndef)
    }

    /// Text record: status byte (language length, 0x80 when UTF-16), language code, text.
    pub fn text(text: &str, lang: &str, utf16: bool) -> Result<Self, KeyError> {
        let text = text.as_bytes();
        let lang = lang.as_bytes();
        if text.len() + lang.len() + 1 > NDEF_DATA_SIZE {
            return Err(KeyError::InvalidArgument(format!(
                "text record too long: {} text + {} language bytes, at most {}",
                text.len(),
                lang.len(),
                NDEF_DATA_SIZE - 1
            )));
        }

        let mut status = lang.len() as u8;
        if utf16 {
            status |= TEXT_UTF16_FLAG;
        }

        let mut ndef = Self::new_zeroed();
        ndef.data[0] = status;
        ndef.data[1..=lang.len()].copy_from_slice(lang);
        ndef.data[lang.len() + 1..lang.len() + 1 + text.len()].copy_from_slice(text);
        ndef.len = (text.len() + lang.len() + 1) as u8;
        ndef.record_type = NDEF_TYPE_TEXT;
        Ok(ndef)
    }

    /// Payload as text: the full URI for URI records, the bare text for text records.
    pub fn to_text(&self) -> Result<String, KeyError> {
        let len = self.len as usize;
        if len == 0 || len > NDEF_DATA_SIZE {
            return Err(KeyError::InvalidArgument(format!("NDEF length {len} out of range")));
        }
        match self.record_type {
            NDEF_TYPE_URI => {
                let prefix = match self.data[0] {
                    0 => "",
                    code => URI_PREFIXES
                        .get(code as usize - 1)
                        .copied()
                        .ok_or_else(|| KeyError::InvalidArgument(format!("unknown URI identifier code {code}")))?,
                };
                Ok(format!("{prefix}{}", String::from_utf8_lossy(&self.data[1..len])))
            }
            NDEF_TYPE_TEXT => {
                let lang_len = (self.data[0] & !TEXT_UTF16_FLAG) as usize;
                if lang_len + 1 > len {
                    return Err(KeyError::InvalidArgument("language code longer than record".to_string()));
                }
                Ok(String::from_utf8_lossy(&self.data[lang_len + 1..len]).into_owned())
            }
            other => Err(KeyError::InvalidArgument(format!("unknown NDEF record type {other:#04x}"))),
        }
    }

    pub fn is_utf16(&self) -> bool {
        self.record_type == NDEF_TYPE_TEXT && self.data[0] & TEXT_UTF16_FLAG != 0
    }

    /// Language code of a text record.
    pub fn language(&self) -> Option<String> {
        if self.record_type != NDEF_TYPE_TEXT {
            return None;
        }
        let lang_len = (self.data[0] & !TEXT_UTF16_FLAG) as usize;
        self.data
            .get(1..1 + lang_len)
            .map(|l| String::from_utf8_lossy(l).into_owned())
    }

    /// Access code currently protecting the key.
    pub fn set_access_code(&mut self, code: &[u8; ACC_CODE_SIZE]) {
        self.cur_acc_code = *code;
    }
}

// Longest prefix wins; among equal lengths the first table entry.
fn longest_prefix(uri: &str) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, prefix) in URI_PREFIXES.iter().enumerate() {
        if uri.starts_with(prefix) && best.is_none_or(|b| prefix.len() > URI_PREFIXES[b].len()) {
            best = Some(index);
        }
    }
    best
}

impl fmt::Debug for Ndef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ndef")
            .field("len", &self.len)
            .field("record_type", &(self.record_type as char))
            .field("text", &self.to_text().ok())
            .finish_non_exhaustive()
    }
}
