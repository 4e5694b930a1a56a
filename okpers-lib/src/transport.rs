use tracing::debug;

use crate::constants::{DUMMY_REPORT_WRITE, FEATURE_RPT_SIZE, REPORT_STATUS_OFFSET};
use crate::error::KeyError;

/// One fixed-size feature report.
pub type Report = [u8; FEATURE_RPT_SIZE];

/// Blocking exchange of whole feature reports with a single device.
///
/// A transport failure is a hard error; callers never retry it.
pub trait ReportTransport {
    fn read_report(&mut self, report: &mut Report) -> Result<(), KeyError>;

    fn write_report(&mut self, report: &Report) -> Result<(), KeyError>;

    /// USB vendor and product id of the attached device.
    fn vid_pid(&self) -> (u16, u16);

    /// Send the "update only" report, which also resets the device's read mode.
    fn force_update(&mut self) -> Result<(), KeyError> {
        let mut report: Report = [0; FEATURE_RPT_SIZE];
        report[REPORT_STATUS_OFFSET] = DUMMY_REPORT_WRITE;
        debug!("Forcing key update");
        self.write_report(&report)
    }
}

impl<T: ReportTransport + ?Sized> ReportTransport for Box<T> {
    fn read_report(&mut self, report: &mut Report) -> Result<(), KeyError> {
        (**self).read_report(report)
    }

    fn write_report(&mut self, report: &Report) -> Result<(), KeyError> {
        (**self).write_report(report)
    }

    fn vid_pid(&self) -> (u16, u16) {
        (**self).vid_pid()
    }

    fn force_update(&mut self) -> Result<(), KeyError> {
        (**self).force_update()
    }
}
