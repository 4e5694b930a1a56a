use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::*;
use crate::crc::crc16;
use crate::error::KeyError;

/// 70-byte write frame: payload(64) slot(1) crc(2, LE) filler(3).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Frame {
    bytes: [u8; FRAME_SIZE],
}

impl Frame {
    pub fn new(slot: u8, payload: &[u8]) -> Result<Self, KeyError> {
        if payload.len() > FRAME_PAYLOAD_SIZE {
            return Err(KeyError::WrongSize {
                expected: FRAME_PAYLOAD_SIZE,
                actual: payload.len(),
            });
        }

        let mut bytes = [0u8; FRAME_SIZE];
        bytes[..payload.len()].copy_from_slice(payload);
        bytes[FRAME_PAYLOAD_SIZE] = slot;
        let crc = crc16(&bytes[..FRAME_PAYLOAD_SIZE]);
        bytes[FRAME_PAYLOAD_SIZE + 1..FRAME_PAYLOAD_SIZE + 3].copy_from_slice(&crc.to_le_bytes());

        Ok(Self { bytes })
    }

    pub fn slot(&self) -> u8 {
        self.bytes[FRAME_PAYLOAD_SIZE]
    }

    pub fn crc(&self) -> u16 {
        u16::from_le_bytes([self.bytes[FRAME_PAYLOAD_SIZE + 1], self.bytes[FRAME_PAYLOAD_SIZE + 2]])
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.bytes
    }

    /// Chunks that actually have to go over the wire, with their sequence numbers.
    pub fn chunks(&self) -> FrameChunks<'_> {
        FrameChunks { frame: self, seq: 0 }
    }
}

/// One 7-byte slice of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameChunk<'a> {
    pub seq: u8,
    pub data: &'a [u8],
}

impl FrameChunk<'_> {
    /// Build the feature report for this chunk, sequence tagged with the write flag.
    pub fn to_report(&self, report: &mut [u8; FEATURE_RPT_SIZE]) {
        report[..REPORT_DATA_SIZE].copy_from_slice(self.data);
        report[REPORT_STATUS_OFFSET] = self.seq | SLOT_WRITE_FLAG;
    }
}

/// Iterator over the chunks of a frame.
///
/// An all-zero chunk is skipped unless it is the first or the last one; the key
/// zero-fills its receive buffer, so only the sequence numbers that carry data
/// (plus the terminating chunk) are sent.
pub struct FrameChunks<'a> {
    frame: &'a Frame,
    seq: u8,
}

impl<'a> Iterator for FrameChunks<'a> {
    type Item = FrameChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while (self.seq as usize) < FRAME_CHUNKS {
            let seq = self.seq;
            self.seq += 1;

            let start = seq as usize * REPORT_DATA_SIZE;
            let data = &self.frame.bytes[start..start + REPORT_DATA_SIZE];
            let is_last = seq as usize == FRAME_CHUNKS - 1;
            if seq > 0 && !is_last && data.iter().all(|&b| b == 0) {
                continue;
            }
            return Some(FrameChunk { seq, data });
        }
        None
    }
}
