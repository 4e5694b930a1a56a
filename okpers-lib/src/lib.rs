pub mod command;
pub mod config;
pub mod constants;
pub mod crc;
pub mod device_config;
pub mod error;
pub mod frame;
pub mod key;
pub mod modhex;
pub mod ndef;
pub mod poll;
pub mod status;
pub mod tlv;
pub mod transport;
pub mod usb;


// Re-export the most used types for easy access
pub use command::Command;
pub use config::{ExportFormat, Flag, KeyConfig};
pub use error::{ErrorCode, KeyError};
pub use key::Key;
pub use status::{FirmwareVersion, Status};
pub use transport::ReportTransport;
pub use usb::UsbTransport;
