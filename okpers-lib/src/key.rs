use bytes::BytesMut;
use tracing::{debug, info, warn};
use zerocopy::IntoBytes;
use zeroize::{Zeroize, Zeroizing};

use crate::command::Command;
use crate::config::{ConfigBlock, KeyConfig};
use crate::constants::*;
use crate::crc;
use crate::device_config::DeviceConfig;
use crate::error::KeyError;
use crate::frame::Frame;
use crate::ndef::Ndef;
use crate::poll::{StatusCondition, wait_for_key_status};
use crate::status::{ReportStatus, Status};
use crate::transport::{Report, ReportTransport};
use crate::usb::UsbTransport;

/// Response buffer for challenge-response and serial reads.
const RESPONSE_BUF_SIZE: usize = 64;

/// Response buffer for the capabilities reply.
const CAPABILITIES_BUF_SIZE: usize = 256;

/// Bytes transferred for a response carrying `expect_bytes` of data plus its CRC.
pub fn expected_transfer_len(expect_bytes: usize) -> usize {
    (expect_bytes + 2).div_ceil(REPORT_DATA_SIZE) * REPORT_DATA_SIZE
}

/// A connected key speaking the feature-report protocol.
pub struct Key<T: ReportTransport> {
    transport: T,
}

impl Key<UsbTransport> {
    /// Open the `index`-th attached key and verify it answers a status read.
    pub fn open(index: usize) -> Result<Self, KeyError> {
        let mut key = Self::new(UsbTransport::open_key(index)?);
        let status = key.status()?;
        info!("Opened key, {}", status);
        Ok(key)
    }
}

impl<T: ReportTransport> Key<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the device.
    pub fn close(self) -> T {
        self.transport
    }

    pub fn vid_pid(&self) -> (u16, u16) {
        self.transport.vid_pid()
    }

    pub fn status(&mut self) -> Result<Status, KeyError> {
        let mut report: Report = [0; FEATURE_RPT_SIZE];
        self.transport.read_report(&mut report)?;
        Status::from_report(&report)
    }

    pub fn force_key_update(&mut self) -> Result<(), KeyError> {
        self.transport.force_update()
    }

    /// Send `payload` to `slot` as one CRC-protected frame.
    pub fn write_to_key(&mut self, slot: u8, payload: &[u8]) -> Result<(), KeyError> {
        let frame = Frame::new(slot, payload)?;
        let mut report = Zeroizing::new([0u8; FEATURE_RPT_SIZE]);

        debug!(slot = format!("{slot:#04x}"), len = payload.len(), crc = frame.crc(), "Writing frame");
        for chunk in frame.chunks() {
            wait_for_key_status(
                &mut self.transport,
                false,
                WAIT_FOR_WRITE_FLAG,
                StatusCondition::Cleared(SLOT_WRITE_FLAG),
            )?;
            chunk.to_report(&mut report);
            self.transport.write_report(&report)?;
        }
        Ok(())
    }

    /// Read a pending response into `buf`, returning the number of bytes transferred.
    ///
    /// With `expect_bytes > 0` the first `expect_bytes + 2` bytes must carry a
    /// valid CRC trailer and the transfer must be exactly that length rounded up
    /// to whole reports. The key's read mode is reset on every exit.
    pub fn read_response(&mut self, may_block: bool, buf: &mut [u8], expect_bytes: usize) -> Result<usize, KeyError> {
        let result = self.read_response_inner(may_block, buf, expect_bytes);
        let reset = self.transport.force_update();
        match (result, reset) {
            (Ok(n), Ok(())) => Ok(n),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), reset) => {
                if let Err(reset_err) = reset {
                    warn!("Resetting read mode after failed read: {}", reset_err);
                }
                Err(e)
            }
        }
    }

    fn read_response_inner(&mut self, may_block: bool, buf: &mut [u8], expect_bytes: usize) -> Result<usize, KeyError> {
        if buf.len() < REPORT_DATA_SIZE {
            return Err(KeyError::WrongSize {
                expected: REPORT_DATA_SIZE,
                actual: buf.len(),
            });
        }
        buf.fill(0);

        let first = Zeroizing::new(wait_for_key_status(
            &mut self.transport,
            may_block,
            WAIT_FOR_RESPONSE,
            StatusCondition::Set(RESP_PENDING_FLAG),
        )?);
        buf[..REPORT_DATA_SIZE].copy_from_slice(&first[..REPORT_DATA_SIZE]);
        let mut bytes_read = REPORT_DATA_SIZE;

        let mut report = Zeroizing::new([0u8; FEATURE_RPT_SIZE]);
        while bytes_read + FEATURE_RPT_SIZE <= buf.len() {
            self.transport.read_report(&mut report)?;
            let status = ReportStatus::of_report(&report);

            if !status.response_pending() {
                // The key dropped the response mid-way.
                return Err(KeyError::Transport(format!(
                    "response aborted after {bytes_read} bytes (status {:#04x})",
                    report[REPORT_STATUS_OFFSET]
                )));
            }

            if status.sequence() == 0 {
                if expect_bytes > 0 {
                    let checked = expect_bytes + 2;
                    if checked > bytes_read || !crc::residual_ok(&buf[..checked]) {
                        return Err(KeyError::Checksum);
                    }
                    let expected = expected_transfer_len(expect_bytes);
                    if bytes_read != expected {
                        return Err(KeyError::WrongSize {
                            expected,
                            actual: bytes_read,
                        });
                    }
                }
                debug!(bytes_read, "Response complete");
                return Ok(bytes_read);
            }

            buf[bytes_read..bytes_read + REPORT_DATA_SIZE].copy_from_slice(&report[..REPORT_DATA_SIZE]);
            bytes_read += REPORT_DATA_SIZE;
        }

        Err(KeyError::WrongSize {
            expected: buf.len(),
            actual: bytes_read + FEATURE_RPT_SIZE,
        })
    }

    /// Write `payload` with `command` and verify the key committed it.
    ///
    /// Committed means the programming sequence moved, or both slots are now
    /// empty and the sequence reads zero.
    pub fn commit_write(&mut self, command: Command, payload: &[u8]) -> Result<(), KeyError> {
        let before = self.status()?.pgm_seq;

        self.write_to_key(command.into(), payload)?;
        wait_for_key_status(
            &mut self.transport,
            false,
            WAIT_FOR_WRITE_FLAG,
            StatusCondition::Cleared(SLOT_WRITE_FLAG),
        )?;

        let after = self.status()?;
        if after.pgm_seq != before || (!after.is_programmed() && after.pgm_seq == 0) {
            info!(%command, pgm_seq = after.pgm_seq, "Write committed");
            Ok(())
        } else {
            warn!(%command, pgm_seq = after.pgm_seq, "Key did not accept write");
            Err(KeyError::WriteError)
        }
    }

    /// Write a configuration block (or erase, with `None`) using `command`.
    ///
    /// `acc_code` is the access code currently protecting the slot.
    pub fn write_command(
        &mut self,
        block: Option<&ConfigBlock>,
        command: Command,
        acc_code: Option<&[u8; ACC_CODE_SIZE]>,
    ) -> Result<(), KeyError> {
        let mut buf = Zeroizing::new([0u8; CONFIG_SIZE + ACC_CODE_SIZE]);
        if let Some(block) = block {
            let mut block = block.clone();
            block.update_crc();
            buf[..CONFIG_SIZE].copy_from_slice(block.as_bytes());
        }
        if let Some(code) = acc_code {
            buf[CONFIG_SIZE..].copy_from_slice(code);
        }
        self.commit_write(command, &buf[..])
    }

    /// Write `config` with the command it was configured for.
    pub fn write_config(&mut self, config: &KeyConfig, acc_code: Option<&[u8; ACC_CODE_SIZE]>) -> Result<(), KeyError> {
        self.write_command(Some(config.block()), config.command(), acc_code)
    }

    /// Erase slot `confnum` (1 or 2).
    pub fn erase_slot(&mut self, confnum: u8, acc_code: Option<&[u8; ACC_CODE_SIZE]>) -> Result<(), KeyError> {
        let command = match confnum {
            1 => Command::Config1,
            2 => Command::Config2,
            _ => return Err(KeyError::InvalidCommand),
        };
        self.write_command(None, command, acc_code)
    }

    /// Exchange the contents of slot 1 and slot 2.
    pub fn swap_slots(&mut self, acc_code: Option<&[u8; ACC_CODE_SIZE]>) -> Result<(), KeyError> {
        self.write_command(None, Command::Swap, acc_code)
    }

    pub fn write_ndef(&mut self, ndef: &Ndef, confnum: u8) -> Result<(), KeyError> {
        let command = match confnum {
            1 => Command::Ndef1,
            2 => Command::Ndef2,
            _ => return Err(KeyError::InvalidCommand),
        };
        self.commit_write(command, ndef.as_bytes())
    }

    pub fn write_device_config(&mut self, config: &DeviceConfig) -> Result<(), KeyError> {
        self.commit_write(Command::DeviceConfig, config.as_bytes())
    }

    pub fn write_scan_map(&mut self, scan_map: &[u8]) -> Result<(), KeyError> {
        if scan_map.len() != SCAN_MAP_SIZE {
            return Err(KeyError::WrongSize {
                expected: SCAN_MAP_SIZE,
                actual: scan_map.len(),
            });
        }
        self.commit_write(Command::ScanMap, scan_map)
    }

    pub fn write_device_info(&mut self, info: &[u8]) -> Result<(), KeyError> {
        if info.len() > DEVICE_INFO_MAX_SIZE {
            return Err(KeyError::WrongSize {
                expected: DEVICE_INFO_MAX_SIZE,
                actual: info.len(),
            });
        }
        self.commit_write(Command::SetDeviceInfo, info)
    }

    /// Send `challenge` to a challenge-response slot and return the response.
    ///
    /// HMAC slots answer with 20 bytes, Yubico OTP slots with 16.
    pub fn challenge_response(
        &mut self,
        command: Command,
        may_block: bool,
        challenge: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, KeyError> {
        let expect = command.challenge_response_len().ok_or(KeyError::InvalidCommand)?;

        self.write_to_key(command.into(), challenge)?;

        let mut buf = BytesMut::zeroed(RESPONSE_BUF_SIZE);
        let result = self.read_response(may_block, &mut buf, expect);
        let response = result.map(|_| Zeroizing::new(buf[..expect].to_vec()));
        buf[..].zeroize();
        response
    }

    /// Factory serial number; may be hidden by configuration.
    pub fn serial(&mut self, may_block: bool) -> Result<u32, KeyError> {
        self.write_to_key(Command::DeviceSerial.into(), &[])?;

        let mut buf = [0u8; FEATURE_RPT_SIZE * 2];
        self.read_response(may_block, &mut buf, 4)?;
        Ok(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
    }

    /// Raw capabilities TLV body (without the leading length byte).
    pub fn capabilities(&mut self, may_block: bool) -> Result<Vec<u8>, KeyError> {
        self.write_to_key(Command::Capabilities.into(), &[])?;

        let mut buf = BytesMut::zeroed(CAPABILITIES_BUF_SIZE);
        let read = self.read_response(may_block, &mut buf, 0)?;

        // first byte is the length of what follows
        let total = buf[0] as usize + 1;
        if total > read {
            return Err(KeyError::WrongSize {
                expected: read,
                actual: total,
            });
        }
        Ok(buf[1..total].to_vec())
    }
}
