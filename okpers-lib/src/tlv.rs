//! Tag-length-value blobs exchanged with 4.x/5.x keys: the device-info
//! payload written with `SetDeviceInfo` and the `Capabilities` reply.

use num_enum::{FromPrimitive, IntoPrimitive};

use crate::constants::DEVICE_INFO_MAX_SIZE;
use crate::error::KeyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum DeviceInfoTag {
    UsbSupported = 0x01,
    Serial = 0x02,
    UsbEnabled = 0x03,
    FormFactor = 0x04,
    Version = 0x05,
    AutoEjectTimeout = 0x06,
    ChalRespTimeout = 0x07,
    DeviceFlags = 0x08,
    ConfigLock = 0x0a,
    Unlock = 0x0b,
    Reboot = 0x0c,
    NfcSupported = 0x0d,
    NfcEnabled = 0x0e,

    #[num_enum(catch_all)]
    Unknown(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvEntry {
    pub tag: DeviceInfoTag,
    pub value: Vec<u8>,
}

/// Builds a length-prefixed device-info blob.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfoBuilder {
    body: Vec<u8>,
}

impl DeviceInfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, tag: DeviceInfoTag, value: &[u8]) -> Result<Self, KeyError> {
        let len = u8::try_from(value.len())
            .map_err(|_| KeyError::InvalidArgument(format!("TLV value of {} bytes", value.len())))?;
        self.body.push(tag.into());
        self.body.push(len);
        self.body.extend_from_slice(value);
        Ok(self)
    }

    pub fn build(self) -> Result<Vec<u8>, KeyError> {
        if self.body.len() + 1 > DEVICE_INFO_MAX_SIZE {
            return Err(KeyError::WrongSize {
                expected: DEVICE_INFO_MAX_SIZE,
                actual: self.body.len() + 1,
            });
        }
        let mut out = Vec::with_capacity(self.body.len() + 1);
        out.push(self.body.len() as u8);
        out.extend_from_slice(&self.body);
        Ok(out)
    }
}

/// Split a TLV body (without the leading length byte) into entries.
pub fn parse_tlv(body: &[u8]) -> Result<Vec<TlvEntry>, KeyError> {
    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < body.len() {
        if body.len() - offset < 2 {
            return Err(KeyError::InvalidArgument(format!("truncated TLV header at offset {offset}")));
        }
        let tag = DeviceInfoTag::from_primitive(body[offset]);
        let len = body[offset + 1] as usize;
        let start = offset + 2;
        let value = body.get(start..start + len).ok_or_else(|| {
            KeyError::InvalidArgument(format!("TLV value at offset {start} overruns {} bytes", body.len()))
        })?;
        entries.push(TlvEntry {
            tag,
            value: value.to_vec(),
        });
        offset = start + len;
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_prefixes_length() {
        let blob = DeviceInfoBuilder::new()
            .push(DeviceInfoTag::AutoEjectTimeout, &[0x00, 0x3c])
            .and_then(|b| b.push(DeviceInfoTag::Reboot, &[]))
            .and_then(DeviceInfoBuilder::build)
            .expect("small blob builds");
        assert_eq!(blob, vec![6, 0x06, 2, 0x00, 0x3c, 0x0c, 0]);

        let entries = parse_tlv(&blob[1..]).expect("own output parses");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].tag, DeviceInfoTag::AutoEjectTimeout);
        assert_eq!(entries[1].value, Vec::<u8>::new());
    }

    #[test]
    fn oversized_blob_is_rejected() {
        let result = DeviceInfoBuilder::new()
            .push(DeviceInfoTag::Unknown(0x7f), &[0u8; 62])
            .and_then(DeviceInfoBuilder::build);
        assert!(matches!(result, Err(KeyError::WrongSize { .. })), "65 bytes exceed the 64-byte limit");
    }

    #[test]
    fn truncated_value_is_an_error() {
        assert!(parse_tlv(&[0x02, 0x04, 0x00]).is_err());
    }
}
