use std::fmt;

use super::capability::Capability;

/// Flag byte of the configuration block a flag lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagField {
    Ticket,
    Config,
    Extended,
}

// Mode bits a flag can belong to
pub const MODE_OTP_YUBICO: u8 = 0x01;
pub const MODE_OATH_HOTP: u8 = 0x02;
pub const MODE_CHAL_HMAC: u8 = 0x04;
pub const MODE_CHAL_YUBICO: u8 = 0x08;
pub const MODE_STATIC_TICKET: u8 = 0x10;
pub const MODE_ALL: u8 = 0xff;
pub const MODE_CHAL_RESP: u8 = MODE_CHAL_HMAC | MODE_CHAL_YUBICO;
pub const MODE_OUTPUT: u8 = MODE_OTP_YUBICO | MODE_OATH_HOTP;

/// Operating mode of a slot, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigMode {
    YubicoOtp,
    OathHotp,
    ChalHmac,
    ChalYubico,
    StaticTicket,
}

impl ConfigMode {
    pub const ALL: [ConfigMode; 5] = [
        ConfigMode::YubicoOtp,
        ConfigMode::OathHotp,
        ConfigMode::ChalHmac,
        ConfigMode::ChalYubico,
        ConfigMode::StaticTicket,
    ];

    pub fn bits(self) -> u8 {
        match self {
            ConfigMode::YubicoOtp => MODE_OTP_YUBICO,
            ConfigMode::OathHotp => MODE_OATH_HOTP,
            ConfigMode::ChalHmac => MODE_CHAL_HMAC,
            ConfigMode::ChalYubico => MODE_CHAL_YUBICO,
            ConfigMode::StaticTicket => MODE_STATIC_TICKET,
        }
    }

    pub fn json_name(self) -> &'static str {
        match self {
            ConfigMode::YubicoOtp => "yubicoOTP",
            ConfigMode::OathHotp => "oathHOTP",
            ConfigMode::ChalHmac => "chalHMAC",
            ConfigMode::ChalYubico => "chalYubico",
            ConfigMode::StaticTicket => "staticTicket",
        }
    }

    pub fn from_json_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.json_name() == name)
    }

    /// True if a flag tagged with `modes` is meaningful in this mode.
    pub fn admits(self, modes: u8) -> bool {
        self.bits() & modes == self.bits()
    }
}

/// Static description of one configuration flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagDef {
    pub flag: Flag,
    pub field: FlagField,
    pub mask: u8,
    pub capability: Capability,
    pub modes: u8,
    pub legacy_name: &'static str,
    pub json_name: Option<&'static str>,
}

macro_rules! flag_table {
    ($($variant:ident => ($field:ident, $mask:expr, $cap:ident, $modes:expr, $legacy:literal, $json:expr)),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Flag {
            $($variant),*
        }

        /// Every flag, grouped by field in listing order. Indexed by `Flag as usize`.
        pub const FLAGS: &[FlagDef] = &[
            $(FlagDef {
                flag: Flag::$variant,
                field: FlagField::$field,
                mask: $mask,
                capability: Capability::$cap,
                modes: $modes,
                legacy_name: $legacy,
                json_name: $json,
            }),*
        ];
    };
}

flag_table! {
    TabFirst => (Ticket, 0x01, TicketMods, MODE_OUTPUT, "TAB_FIRST", Some("tabFirst")),
    AppendTab1 => (Ticket, 0x02, TicketMods, MODE_OUTPUT, "APPEND_TAB1", Some("tabBetween")),
    AppendTab2 => (Ticket, 0x04, TicketMods, MODE_OUTPUT, "APPEND_TAB2", Some("tabLast")),
    AppendDelay1 => (Ticket, 0x08, TicketMods, MODE_OUTPUT, "APPEND_DELAY1", Some("appendDelay1")),
    AppendDelay2 => (Ticket, 0x10, TicketMods, MODE_OUTPUT, "APPEND_DELAY2", Some("appendDelay2")),
    AppendCr => (Ticket, 0x20, TicketMods, MODE_OUTPUT, "APPEND_CR", Some("appendCR")),
    ProtectCfg2 => (Ticket, 0x80, SlotTwo, MODE_ALL, "PROTECT_CFG2", Some("protectSecond")),
    OathHotp => (Ticket, 0x40, Oath, MODE_OATH_HOTP, "OATH_HOTP", None),
    ChalResp => (Ticket, 0x40, ChalResp, MODE_CHAL_RESP, "CHAL_RESP", None),

    SendRef => (Config, 0x01, TicketMods, MODE_OUTPUT, "SEND_REF", Some("sendRef")),
    TicketFirst => (Config, 0x02, TicketFirst, MODE_OUTPUT, "TICKET_FIRST", Some("ticketFirst")),
    Pacing10ms => (Config, 0x04, TicketMods, MODE_OUTPUT, "PACING_10MS", Some("pacing10MS")),
    Pacing20ms => (Config, 0x08, TicketMods, MODE_OUTPUT, "PACING_20MS", Some("pacing20MS")),
    AllowHidtrig => (Config, 0x10, Hidtrig, MODE_OUTPUT, "ALLOW_HIDTRIG", Some("allowHidtrig")),
    StaticTicket => (Config, 0x20, Static, MODE_STATIC_TICKET, "STATIC_TICKET", None),
    ShortTicket => (Config, 0x02, StaticExtras, MODE_STATIC_TICKET, "SHORT_TICKET", Some("shortTicket")),
    StrongPw1 => (Config, 0x10, StaticExtras, MODE_STATIC_TICKET, "STRONG_PW1", Some("strongPw1")),
    StrongPw2 => (Config, 0x40, StaticExtras, MODE_STATIC_TICKET, "STRONG_PW2", Some("strongPw2")),
    ManUpdate => (Config, 0x80, StaticExtras, MODE_STATIC_TICKET, "MAN_UPDATE", Some("manualUpdate")),
    OathHotp8 => (Config, 0x02, Oath, MODE_OATH_HOTP, "OATH_HOTP8", None),
    OathFixedModhex => (Config, 0x50, Oath, MODE_OATH_HOTP, "OATH_FIXED_MODHEX", Some("fixedModhex")),
    OathFixedModhex1 => (Config, 0x10, Oath, MODE_OATH_HOTP, "OATH_FIXED_MODHEX1", Some("fixedModhex1")),
    OathFixedModhex2 => (Config, 0x40, Oath, MODE_OATH_HOTP, "OATH_FIXED_MODHEX2", Some("fixedModhex2")),
    ChalYubico => (Config, 0x20, ChalResp, MODE_CHAL_YUBICO, "CHAL_YUBICO", None),
    ChalHmac => (Config, 0x22, ChalResp, MODE_CHAL_HMAC, "CHAL_HMAC", None),
    HmacLt64 => (Config, 0x04, ChalResp, MODE_CHAL_HMAC, "HMAC_LT64", Some("hmacLT64")),
    ChalBtnTrig => (Config, 0x08, ChalResp, MODE_CHAL_RESP, "CHAL_BTN_TRIG", Some("buttonReqd")),

    SerialBtnVisible => (Extended, 0x01, Serial, MODE_ALL, "SERIAL_BTN_VISIBLE", Some("serialBtnVisible")),
    SerialUsbVisible => (Extended, 0x02, Serial, MODE_ALL, "SERIAL_USB_VISIBLE", Some("serialUsbVisible")),
    SerialApiVisible => (Extended, 0x04, SerialApi, MODE_ALL, "SERIAL_API_VISIBLE", Some("serialApiVisible")),
    UseNumericKeypad => (Extended, 0x08, Numeric, MODE_ALL, "USE_NUMERIC_KEYPAD", Some("useNumericKeypad")),
    FastTrig => (Extended, 0x10, Fast, MODE_ALL, "FAST_TRIG", Some("fastTrig")),
    AllowUpdate => (Extended, 0x20, Update, MODE_ALL, "ALLOW_UPDATE", Some("allowUpdate")),
    Dormant => (Extended, 0x40, Dormant, MODE_ALL, "DORMANT", Some("dormant")),
    LedInv => (Extended, 0x80, LedInv, MODE_ALL, "LED_INV", Some("ledInverted")),
}

impl Flag {
    pub fn def(self) -> &'static FlagDef {
        &FLAGS[self as usize]
    }

    pub fn field(self) -> FlagField {
        self.def().field
    }

    pub fn mask(self) -> u8 {
        self.def().mask
    }

    pub fn capability(self) -> Capability {
        self.def().capability
    }

    pub fn from_legacy_name(name: &str) -> Option<Self> {
        FLAGS.iter().find(|s| s.legacy_name == name).map(|s| s.flag)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.def().legacy_name)
    }
}
