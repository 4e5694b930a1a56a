//! Polling the status byte of the key until a condition holds.
//!
//! The key signals readiness through the last byte of every feature report.
//! [`wait_for_key_status`] polls with an exponential backoff and understands
//! the "waiting for user touch" flag, which either extends the budget once or
//! aborts immediately for callers that must not block.

use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use crate::constants::*;
use crate::error::KeyError;
use crate::transport::{Report, ReportTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCondition {
    /// Every bit of the mask is set.
    Set(u8),
    /// Every bit of the mask is clear.
    Cleared(u8),
}

impl StatusCondition {
    pub fn matches(&self, status_byte: u8) -> bool {
        match *self {
            StatusCondition::Set(mask) => status_byte & mask == mask,
            StatusCondition::Cleared(mask) => status_byte & mask == 0,
        }
    }
}

/// Poll until `condition` holds on the status byte, returning the matching report.
///
/// Sleeps before each read, starting at 1 ms and doubling up to 500 ms. When the
/// key reports that it waits for the user, `may_block` decides between a single
/// 256 s budget extension and giving up with [`KeyError::WouldBlock`] after
/// resetting the key's read mode.
pub fn wait_for_key_status<T: ReportTransport + ?Sized>(
    transport: &mut T,
    may_block: bool,
    max_time: Duration,
    condition: StatusCondition,
) -> Result<Report, KeyError> {
    let mut budget = max_time;
    let mut slept = Duration::ZERO;
    let mut sleep = POLL_INITIAL_SLEEP;
    let mut blocking = false;
    let mut report: Report = [0; FEATURE_RPT_SIZE];

    while slept < budget {
        thread::sleep(sleep);
        slept += sleep;
        sleep = (sleep * 2).min(POLL_MAX_SLEEP);

        transport.read_report(&mut report)?;
        let status = report[REPORT_STATUS_OFFSET];
        trace!(status = format!("{status:#04x}"), ?slept, "Polled key status");

        if condition.matches(status) {
            return Ok(report);
        }

        if status & RESP_TIMEOUT_WAIT_FLAG != 0 {
            if !may_block {
                debug!("Key waits for user interaction, not blocking");
                transport.force_update()?;
                return Err(KeyError::WouldBlock);
            }
            if !blocking {
                debug!("Key waits for user interaction, extending budget");
                blocking = true;
                budget += USER_INTERACTION_GRACE;
            }
        } else if blocking {
            // The user window closed without the condition being met.
            break;
        }
    }

    Err(KeyError::Timeout)
}
