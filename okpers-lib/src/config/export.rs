//! Text serializations of a [`KeyConfig`]: the human-readable legacy format
//! (export only) and the `yubiProdConfig` JSON document (both directions).

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::flags::{ConfigMode, FLAGS, Flag, FlagField};
use super::{Capability, KeyConfig};
use crate::command::Command;
use crate::constants::*;
use crate::error::KeyError;
use crate::modhex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ExportFormat {
    Legacy = 1,
    Json = 2,
}

const SEPARATOR: &str = ": ";
const HEX_PREFIX: &str = "h:";
const MODHEX_PREFIX: &str = "m:";

#[derive(Debug, Serialize, Deserialize)]
struct ProdConfigDocument {
    #[serde(rename = "yubiProdConfig")]
    config: ProdConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProdConfig {
    mode: String,
    #[serde(default)]
    options: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_config: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fixed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    acc_code: Option<String>,
}

impl KeyConfig {
    pub fn export(&self, format: ExportFormat) -> Result<String, KeyError> {
        match format {
            ExportFormat::Legacy => Ok(self.export_legacy()),
            ExportFormat::Json => self.export_json(),
        }
    }

    /// Apply a serialized configuration on top of this one. Only JSON can be imported.
    pub fn import(&mut self, text: &str, format: ExportFormat) -> Result<(), KeyError> {
        match format {
            ExportFormat::Legacy => Err(KeyError::NotYetImplemented),
            ExportFormat::Json => self.import_json(text),
        }
    }

    /// Flags of `field` that are set, supported by the firmware and meaningful in the current mode.
    ///
    /// Flags sharing bits are reported once: matched bits are consumed in table order.
    pub fn active_flags(&self, field: FlagField) -> Vec<Flag> {
        let mode = self.mode();
        let mut remaining = match field {
            FlagField::Ticket => self.block().tkt_flags,
            FlagField::Config => self.block().cfg_flags,
            FlagField::Extended => self.block().ext_flags,
        };
        let mut active = Vec::new();
        for def in FLAGS.iter().filter(|s| s.field == field) {
            if remaining & def.mask == def.mask && self.has(def.capability) && mode.admits(def.modes) {
                active.push(def.flag);
                if field == FlagField::Config {
                    remaining &= !def.mask;
                }
            }
        }
        active
    }

    fn export_legacy(&self) -> String {
        let block = self.block();
        let key_bits_in_uid = self.supported_key_length() == KEY_SIZE_OATH;
        let cfg = block.cfg_flags;
        let has_bits = |flag: Flag| cfg & flag.mask() == flag.mask();
        let mut out = String::new();

        if self.flag(Flag::OathHotp) && block.fixed_size > 0 {
            // token id: vendor byte, type byte, then the first four bytes of the MUI
            let vendor_modhex = has_bits(Flag::OathFixedModhex1)
                || has_bits(Flag::OathFixedModhex2)
                || has_bits(Flag::OathFixedModhex);
            let type_modhex = has_bits(Flag::OathFixedModhex2) || has_bits(Flag::OathFixedModhex);
            let mui_modhex = has_bits(Flag::OathFixedModhex);
            let encode = |modhex_wanted: bool, bytes: &[u8]| {
                if modhex_wanted {
                    modhex::encode(bytes)
                } else {
                    hex::encode(bytes)
                }
            };
            let id = format!(
                "{}{}{}",
                encode(vendor_modhex, &block.fixed[..1]),
                encode(type_modhex, &block.fixed[1..2]),
                encode(mui_modhex, &block.fixed[2..6])
            );
            out.push_str(&format!("OATH id{SEPARATOR}{id}\n"));
        } else {
            out.push_str(&format!("fixed{SEPARATOR}{MODHEX_PREFIX}{}\n", modhex::encode(self.fixed())));
        }

        if key_bits_in_uid {
            out.push_str(&format!("uid{SEPARATOR}n/a\n"));
        } else {
            out.push_str(&format!("uid{SEPARATOR}{}\n", hex::encode(block.uid)));
        }

        let mut key = hex::encode(block.key);
        if key_bits_in_uid {
            key.push_str(&hex::encode(&block.uid[..KEY_EXTENSION_SIZE]));
        }
        out.push_str(&format!("key{SEPARATOR}{HEX_PREFIX}{key}\n"));
        out.push_str(&format!("acc_code{SEPARATOR}{HEX_PREFIX}{}\n", hex::encode(block.acc_code)));

        if self.flag(Flag::OathHotp) && self.has(Capability::OathImf) {
            out.push_str(&format!("OATH IMF{SEPARATOR}{HEX_PREFIX}{:x}\n", self.oath_imf()));
        }

        for (label, field) in [
            ("ticket_flags", FlagField::Ticket),
            ("config_flags", FlagField::Config),
            ("extended_flags", FlagField::Extended),
        ] {
            let names: Vec<&str> = self
                .active_flags(field)
                .into_iter()
                .map(|f| f.def().legacy_name)
                .collect();
            out.push_str(&format!("{label}{SEPARATOR}{}\n", names.join("|")));
        }

        out
    }

    fn export_json(&self) -> Result<String, KeyError> {
        let mode = self.mode();
        let mut options = Map::new();

        for def in FLAGS {
            let Some(name) = def.json_name else { continue };
            if self.has(def.capability) && mode.admits(def.modes) {
                options.insert(name.to_string(), Value::Bool(self.flag(def.flag)));
            }
        }
        if mode == ConfigMode::OathHotp {
            let digits = if self.flag(Flag::OathHotp8) { 8 } else { 6 };
            options.insert("oathDigits".to_string(), Value::from(digits));
            options.insert("fixedSeedvalue".to_string(), Value::from(self.oath_imf() / 16));
        }

        let block = self.block();
        let document = ProdConfigDocument {
            config: ProdConfig {
                mode: mode.json_name().to_string(),
                options,
                target_config: self.config_num(),
                fixed: Some(hex::encode(self.fixed())),
                uid: Some(hex::encode(block.uid)),
                key: Some(hex::encode(block.key)),
                acc_code: Some(hex::encode(block.acc_code)),
            },
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    fn import_json(&mut self, text: &str) -> Result<(), KeyError> {
        let document: ProdConfigDocument = serde_json::from_str(text)?;
        let config = document.config;

        let mode = ConfigMode::from_json_name(&config.mode)
            .ok_or_else(|| KeyError::InvalidArgument(format!("unknown mode '{}'", config.mode)))?;

        if let Some(target) = config.target_config {
            let command = match target {
                1 => Command::Config1,
                2 => Command::Config2,
                _ => return Err(KeyError::InvalidConfigNumber),
            };
            self.configure_command(command)?;
        }

        if let Some(fixed) = &config.fixed {
            self.set_fixed(&hex::decode(fixed)?);
        }
        if let Some(uid) = &config.uid {
            self.set_uid(&hex::decode(uid)?);
        }
        if let Some(key) = &config.key {
            self.set_aes_key_hex(key)?;
        }
        if let Some(acc_code) = &config.acc_code {
            self.set_access_code(&hex::decode(acc_code)?);
        }

        self.set_mode(mode)?;

        if mode == ConfigMode::OathHotp {
            if let Some(digits) = config.options.get("oathDigits") {
                match digits.as_u64() {
                    Some(8) => self.set_flag(Flag::OathHotp8, true)?,
                    Some(6) => self.set_flag(Flag::OathHotp8, false)?,
                    _ => return Err(KeyError::InvalidArgument(format!("oathDigits must be 6 or 8, got {digits}"))),
                }
            }
            if let Some(seed) = config.options.get("fixedSeedvalue") {
                let seed = seed
                    .as_u64()
                    .and_then(|s| u32::try_from(s).ok())
                    .ok_or_else(|| KeyError::InvalidArgument(format!("bad fixedSeedvalue {seed}")))?;
                if self.has(Capability::OathImf) {
                    self.set_oath_imf(seed.saturating_mul(16))?;
                }
            }
        }

        for def in FLAGS {
            let Some(name) = def.json_name else { continue };
            let Some(value) = config.options.get(name) else { continue };
            if !self.has(def.capability) || !mode.admits(def.modes) {
                debug!(option = name, "Skipping option not applicable to this key or mode");
                continue;
            }
            let on = value
                .as_bool()
                .ok_or_else(|| KeyError::InvalidArgument(format!("option {name} must be a boolean")))?;
            self.set_flag(def.flag, on)?;
        }

        Ok(())
    }
}
