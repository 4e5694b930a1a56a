//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use hex;
#[allow(unused_imports)]
pub use okpers_lib::command::Command;
#[allow(unused_imports)]
pub use okpers_lib::constants::*;
#[allow(unused_imports)]
pub use okpers_lib::crc::{crc16, response_trailer};
#[allow(unused_imports)]
pub use okpers_lib::error::{ErrorCode, KeyError};
#[allow(unused_imports)]
pub use okpers_lib::key::Key;
#[allow(unused_imports)]
pub use okpers_lib::transport::{Report, ReportTransport};

use std::collections::VecDeque;

/// Route library logs through the test harness; filtered by RUST_LOG.
#[allow(dead_code)]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// In-memory key that speaks the feature-report protocol.
///
/// Frames are reassembled from write reports, checked, and applied to a
/// small amount of state (programming sequence, slot validity). Commands that
/// answer queue their response as CRC-protected report chunks.
#[allow(dead_code)]
pub struct MockKey {
    pub version: (u8, u8, u8),
    pub pgm_seq: u8,
    pub touch_level: u16,
    pub serial: u32,
    pub hmac_response: Vec<u8>,
    pub otp_response: Vec<u8>,
    pub capabilities: Vec<u8>,

    /// Reads that still report the write flag after each written report.
    pub busy_reads_per_report: u32,
    /// Reads that report "waiting for touch" before anything else.
    pub touch_wait_reads: u32,
    /// Accept frames but never bump the programming sequence.
    pub ignore_writes: bool,
    /// Flip a bit in the first response chunk.
    pub corrupt_response: bool,
    /// Extra 7-byte chunks appended after the payload of a response.
    pub extra_response_chunks: usize,
    /// Drop the pending flag after this many response chunks.
    pub abort_response_after: Option<usize>,
    /// Fail every read once this many reads have happened.
    pub fail_reads_after: Option<usize>,

    pub reports_written: Vec<Report>,
    pub frames: Vec<(u8, Vec<u8>)>,
    pub bad_frames: usize,
    pub force_updates: usize,
    pub reads: usize,
    pub last_challenge: Vec<u8>,

    busy: u32,
    frame_buf: [u8; FRAME_SIZE],
    responses: VecDeque<Report>,
    chunks_served: usize,
}

#[allow(dead_code)]
impl MockKey {
    pub fn new(major: u8, minor: u8, build: u8) -> Self {
        Self {
            version: (major, minor, build),
            pgm_seq: 1,
            touch_level: CONFIG1_VALID,
            serial: 12_345_678,
            hmac_response: (0x10u8..0x24).collect(),
            otp_response: (0xa0u8..0xb0).collect(),
            capabilities: vec![0x06, 0x01, 0x02, 0x02, 0x3f, 0x04, 0x00],
            busy_reads_per_report: 0,
            touch_wait_reads: 0,
            ignore_writes: false,
            corrupt_response: false,
            extra_response_chunks: 0,
            abort_response_after: None,
            fail_reads_after: None,
            reports_written: Vec::new(),
            frames: Vec::new(),
            bad_frames: 0,
            force_updates: 0,
            reads: 0,
            last_challenge: Vec::new(),
            busy: 0,
            frame_buf: [0; FRAME_SIZE],
            responses: VecDeque::new(),
            chunks_served: 0,
        }
    }

    pub fn key(self) -> Key<MockKey> {
        Key::new(self)
    }

    /// Sequence numbers (without the write flag) of every data report written.
    pub fn written_sequences(&self) -> Vec<u8> {
        self.reports_written
            .iter()
            .filter(|r| r[REPORT_STATUS_OFFSET] != DUMMY_REPORT_WRITE)
            .map(|r| r[REPORT_STATUS_OFFSET] & SEQUENCE_MASK)
            .collect()
    }

    fn status_report(&self, flags: u8) -> Report {
        let tl = self.touch_level.to_le_bytes();
        [
            0,
            self.version.0,
            self.version.1,
            self.version.2,
            self.pgm_seq,
            tl[0],
            tl[1],
            flags,
        ]
    }

    /// Queue `data` followed by its inverted CRC, split into pending chunks.
    pub fn queue_response(&mut self, data: &[u8], with_crc: bool) {
        let mut bytes = data.to_vec();
        if with_crc {
            bytes.extend_from_slice(&response_trailer(data));
        }
        if self.corrupt_response && !bytes.is_empty() {
            bytes[0] ^= 0x01;
        }
        bytes.extend(std::iter::repeat_n(0u8, self.extra_response_chunks * REPORT_DATA_SIZE));
        while bytes.len() % REPORT_DATA_SIZE != 0 {
            bytes.push(0);
        }

        self.responses.clear();
        self.chunks_served = 0;
        for (seq, chunk) in bytes.chunks(REPORT_DATA_SIZE).enumerate() {
            let mut report = [0u8; FEATURE_RPT_SIZE];
            report[..REPORT_DATA_SIZE].copy_from_slice(chunk);
            report[REPORT_STATUS_OFFSET] = RESP_PENDING_FLAG | (seq as u8 & SEQUENCE_MASK);
            self.responses.push_back(report);
        }
        // sequence wraps back to zero once everything was read
        let mut done = [0u8; FEATURE_RPT_SIZE];
        done[REPORT_STATUS_OFFSET] = RESP_PENDING_FLAG;
        self.responses.push_back(done);
    }

    fn apply_frame(&mut self) {
        let payload = self.frame_buf[..FRAME_PAYLOAD_SIZE].to_vec();
        let slot = self.frame_buf[FRAME_PAYLOAD_SIZE];
        let crc = u16::from_le_bytes([self.frame_buf[FRAME_PAYLOAD_SIZE + 1], self.frame_buf[FRAME_PAYLOAD_SIZE + 2]]);
        if crc16(&payload) != crc {
            self.bad_frames += 1;
            return;
        }
        self.frames.push((slot, payload.clone()));

        match Command::try_from(slot) {
            Ok(Command::DeviceSerial) => {
                let serial = self.serial.to_be_bytes();
                self.queue_response(&serial, true);
            }
            Ok(Command::Capabilities) => {
                let caps = self.capabilities.clone();
                self.queue_response(&caps, false);
            }
            Ok(Command::ChalHmac1 | Command::ChalHmac2) => {
                self.last_challenge = payload;
                let response = self.hmac_response.clone();
                self.queue_response(&response, true);
            }
            Ok(Command::ChalOtp1 | Command::ChalOtp2) => {
                self.last_challenge = payload;
                let response = self.otp_response.clone();
                self.queue_response(&response, true);
            }
            Ok(command) => {
                if self.ignore_writes {
                    return;
                }
                let erase = payload[..CONFIG_SIZE].iter().all(|&b| b == 0);
                let valid_bit = match command {
                    Command::Config1 | Command::Update1 => Some(CONFIG1_VALID),
                    Command::Config2 | Command::Update2 => Some(CONFIG2_VALID),
                    _ => None,
                };
                if let Some(bit) = valid_bit {
                    if erase && command.is_slot_write() {
                        self.touch_level &= !bit;
                    } else {
                        self.touch_level |= bit;
                    }
                }
                if command == Command::Swap {
                    let tl = self.touch_level;
                    self.touch_level = (tl & !0x03) | ((tl & 0x01) << 1) | ((tl & 0x02) >> 1);
                }
                if self.touch_level & (CONFIG1_VALID | CONFIG2_VALID) == 0 {
                    self.pgm_seq = 0;
                } else {
                    self.pgm_seq = self.pgm_seq.wrapping_add(1);
                }
            }
            Err(_) => self.bad_frames += 1,
        }
    }
}

impl ReportTransport for MockKey {
    fn read_report(&mut self, report: &mut Report) -> Result<(), KeyError> {
        self.reads += 1;
        if self.fail_reads_after.is_some_and(|n| self.reads > n) {
            return Err(KeyError::Transport("simulated read failure".to_string()));
        }

        if self.touch_wait_reads > 0 {
            self.touch_wait_reads -= 1;
            *report = self.status_report(RESP_TIMEOUT_WAIT_FLAG);
            return Ok(());
        }

        if self.busy > 0 {
            self.busy -= 1;
            *report = self.status_report(SLOT_WRITE_FLAG);
            return Ok(());
        }

        if let Some(next) = self.responses.front().copied() {
            if self.abort_response_after.is_some_and(|n| self.chunks_served >= n) {
                self.responses.clear();
                *report = self.status_report(0);
                return Ok(());
            }
            self.responses.pop_front();
            self.chunks_served += 1;
            *report = next;
            return Ok(());
        }

        *report = self.status_report(0);
        Ok(())
    }

    fn write_report(&mut self, report: &Report) -> Result<(), KeyError> {
        self.reports_written.push(*report);
        let status = report[REPORT_STATUS_OFFSET];

        if status == DUMMY_REPORT_WRITE {
            self.force_updates += 1;
            self.responses.clear();
            return Ok(());
        }

        if status & SLOT_WRITE_FLAG != 0 {
            let seq = (status & SEQUENCE_MASK) as usize;
            if seq == 0 {
                self.frame_buf = [0; FRAME_SIZE];
            }
            let start = seq * REPORT_DATA_SIZE;
            self.frame_buf[start..start + REPORT_DATA_SIZE].copy_from_slice(&report[..REPORT_DATA_SIZE]);
            self.busy = self.busy_reads_per_report;
            if seq == FRAME_CHUNKS - 1 {
                self.apply_frame();
            }
        }
        Ok(())
    }

    fn vid_pid(&self) -> (u16, u16) {
        (PRIMARY_VENDOR_ID, 0x0010)
    }
}
