use nusb::transfer::{Control, ControlType, Recipient};
use nusb::{DeviceInfo, Interface};
use serde::Serialize;
use tracing::{debug, info};

use crate::constants::*;
use crate::error::KeyError;
use crate::transport::{Report, ReportTransport};

// HID class requests
const HID_GET_REPORT: u8 = 0x01;
const HID_SET_REPORT: u8 = 0x09;
const HID_REPORT_TYPE_FEATURE: u16 = 0x03;

/// Feature report number used by the key.
const REPORT_NUMBER: u16 = 0;

/// Hex of a report for debug logs. Frame chunks and response data may carry
/// key material, so only their status byte is shown.
fn loggable(report: &Report) -> String {
    let status = report[REPORT_STATUS_OFFSET];
    if status & (SLOT_WRITE_FLAG | RESP_PENDING_FLAG) != 0 {
        format!("<redacted> {status:02x}")
    } else {
        hex::encode(&report[..])
    }
}

/// Summary of an attached key, for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub device_address: u8,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

impl From<&DeviceInfo> for KeyInfo {
    fn from(info: &DeviceInfo) -> Self {
        Self {
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            bus_number: info.bus_number(),
            device_address: info.device_address(),
            product: info.product_string().map(str::to_owned),
            serial_number: info.serial_number().map(str::to_owned),
        }
    }
}

fn is_key(info: &DeviceInfo, vendor_id: u16, product_ids: &[u16]) -> bool {
    info.vendor_id() == vendor_id && product_ids.contains(&info.product_id())
}

/// All attached devices matching the primary or fallback vendor id and a known product id.
pub fn list_keys() -> Result<Vec<KeyInfo>, KeyError> {
    let keys = nusb::list_devices()?
        .filter(|d| {
            is_key(d, PRIMARY_VENDOR_ID, KNOWN_PRODUCT_IDS) || is_key(d, FALLBACK_VENDOR_ID, KNOWN_PRODUCT_IDS)
        })
        .map(|d| KeyInfo::from(&d))
        .collect();
    Ok(keys)
}

/// Feature-report transport over HID class control transfers on interface 0.
pub struct UsbTransport {
    interface: Interface,
    vendor_id: u16,
    product_id: u16,
}

impl UsbTransport {
    /// Open the `index`-th attached device with `vendor_id` and one of `product_ids`.
    pub fn open(vendor_id: u16, product_ids: &[u16], index: usize) -> Result<Self, KeyError> {
        let device_info = nusb::list_devices()?
            .filter(|d| is_key(d, vendor_id, product_ids))
            .nth(index)
            .ok_or(KeyError::DeviceNotFound)?;

        info!(
            "Found key {:04x}:{:04x} on bus {} addr {}",
            device_info.vendor_id(),
            device_info.product_id(),
            device_info.bus_number(),
            device_info.device_address()
        );

        let device = device_info.open()?;
        let interface = device.detach_and_claim_interface(0)?;
        debug!("Interface claimed");

        Ok(Self {
            interface,
            vendor_id: device_info.vendor_id(),
            product_id: device_info.product_id(),
        })
    }

    /// Open the `index`-th key, trying the primary vendor id before the fallback one.
    pub fn open_key(index: usize) -> Result<Self, KeyError> {
        match Self::open(PRIMARY_VENDOR_ID, KNOWN_PRODUCT_IDS, index) {
            Err(KeyError::DeviceNotFound) => Self::open(FALLBACK_VENDOR_ID, KNOWN_PRODUCT_IDS, index),
            other => other,
        }
    }

    fn control(request: u8) -> Control {
        Control {
            control_type: ControlType::Class,
            recipient: Recipient::Interface,
            request,
            value: (HID_REPORT_TYPE_FEATURE << 8) | REPORT_NUMBER,
            index: 0,
        }
    }
}

impl ReportTransport for UsbTransport {
    fn read_report(&mut self, report: &mut Report) -> Result<(), KeyError> {
        let read = self
            .interface
            .control_in_blocking(Self::control(HID_GET_REPORT), report, USB_CONTROL_TIMEOUT)?;
        if read != FEATURE_RPT_SIZE {
            return Err(KeyError::WrongSize {
                expected: FEATURE_RPT_SIZE,
                actual: read,
            });
        }
        debug!(bytes = %loggable(report), "USB read report");
        Ok(())
    }

    fn write_report(&mut self, report: &Report) -> Result<(), KeyError> {
        debug!(bytes = %loggable(report), "USB write report");
        let written = self
            .interface
            .control_out_blocking(Self::control(HID_SET_REPORT), report, USB_CONTROL_TIMEOUT)?;
        if written != FEATURE_RPT_SIZE {
            return Err(KeyError::WrongSize {
                expected: FEATURE_RPT_SIZE,
                actual: written,
            });
        }
        Ok(())
    }

    fn vid_pid(&self) -> (u16, u16) {
        (self.vendor_id, self.product_id)
    }
}
