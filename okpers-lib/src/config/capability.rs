//! Firmware capability matrix.
//!
//! Every configuration flag is gated by one capability, and every capability
//! is a predicate over the firmware version of the target key.

use crate::status::FirmwareVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    TicketMods,
    Hidtrig,
    TicketFirst,
    Static,
    StaticExtras,
    SlotTwo,
    ChalResp,
    OathImf,
    SerialApi,
    Serial,
    Oath,
    Update,
    Fast,
    Numeric,
    Dormant,
    LedInv,
}

impl Capability {
    pub fn is_supported_by(self, v: FirmwareVersion) -> bool {
        match self {
            Capability::TicketMods => true,
            Capability::Hidtrig | Capability::TicketFirst => is_v1(v),
            Capability::Static => !is_neo_before_5(v),
            Capability::StaticExtras => is_past_v1(v) && !is_neo_before_5(v),
            Capability::SlotTwo => is_past_v1(v) && !is_neo(v),
            Capability::ChalResp | Capability::Serial => is_v22_or_greater(v),
            Capability::OathImf => is_v22_or_greater(v) || is_neo_after_6(v),
            Capability::SerialApi => is_v22_or_greater(v) || is_neo(v),
            Capability::Oath => is_v21_or_greater(v) || is_neo(v),
            Capability::Update | Capability::Fast | Capability::Numeric | Capability::Dormant => {
                is_v23_or_greater(v)
            }
            Capability::LedInv => is_v24_or_greater(v) && !is_v30(v),
        }
    }
}

fn is_v1(v: FirmwareVersion) -> bool {
    v.major == 1
}

fn is_past_v1(v: FirmwareVersion) -> bool {
    v.major > 1
}

// 2.1.4 and later builds of 2.1 are NEO firmware, not "2.1 and above".
fn is_v21_or_greater(v: FirmwareVersion) -> bool {
    (v.major == 2 && v.minor > 1) || (v.major == 2 && v.minor == 1 && v.build <= 3) || v.major > 2
}

fn is_v22_or_greater(v: FirmwareVersion) -> bool {
    (v.major == 2 && v.minor >= 2) || v.major > 2
}

fn is_v23_or_greater(v: FirmwareVersion) -> bool {
    (v.major == 2 && v.minor >= 3) || v.major > 2
}

fn is_v24_or_greater(v: FirmwareVersion) -> bool {
    (v.major == 2 && v.minor >= 4) || v.major > 2
}

fn is_v30(v: FirmwareVersion) -> bool {
    v.major == 3 && v.minor == 0
}

pub(crate) fn is_neo(v: FirmwareVersion) -> bool {
    v.major == 2 && v.minor == 1 && v.build >= 4
}

fn is_neo_before_5(v: FirmwareVersion) -> bool {
    is_neo(v) && v.build < 5
}

fn is_neo_after_6(v: FirmwareVersion) -> bool {
    is_neo(v) && v.build > 6
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(major: u8, minor: u8, build: u8) -> FirmwareVersion {
        FirmwareVersion::new(major, minor, build)
    }

    #[test]
    fn neo_beta_is_not_treated_as_v21() {
        assert!(Capability::Oath.is_supported_by(v(2, 1, 3)));
        assert!(Capability::Oath.is_supported_by(v(2, 1, 4)), "NEO gets OATH through the neo branch");
        assert!(!Capability::SlotTwo.is_supported_by(v(2, 1, 4)), "NEO has no second slot");
        assert!(!Capability::Static.is_supported_by(v(2, 1, 4)), "early NEO lacks static tickets");
        assert!(Capability::Static.is_supported_by(v(2, 1, 5)));
    }

    #[test]
    fn oath_imf_on_late_neo_builds() {
        assert!(!Capability::OathImf.is_supported_by(v(2, 1, 6)));
        assert!(Capability::OathImf.is_supported_by(v(2, 1, 7)));
        assert!(Capability::OathImf.is_supported_by(v(2, 2, 0)));
    }

    #[test]
    fn led_inv_excludes_3_0() {
        assert!(Capability::LedInv.is_supported_by(v(2, 4, 0)));
        assert!(!Capability::LedInv.is_supported_by(v(3, 0, 1)));
        assert!(Capability::LedInv.is_supported_by(v(3, 1, 0)));
        assert!(!Capability::LedInv.is_supported_by(v(2, 3, 9)));
    }

    #[test]
    fn v1_only_capabilities() {
        assert!(Capability::Hidtrig.is_supported_by(v(1, 3, 0)));
        assert!(!Capability::Hidtrig.is_supported_by(v(2, 0, 0)));
        assert!(!Capability::StaticExtras.is_supported_by(v(1, 3, 0)));
    }
}
