use std::fs::{self, File};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use okpers_lib::config::{AccessCodeType, ConfigMode, ExportFormat, Flag, KeyConfig};
use okpers_lib::constants::{ACC_CODE_SIZE, DEFAULT_SCAN_MAP, SCAN_MAP_SIZE};
use okpers_lib::device_config::{DeviceConfig, DeviceMode};
use okpers_lib::ndef::Ndef;
use okpers_lib::tlv::{DeviceInfoBuilder, DeviceInfoTag, parse_tlv};
use okpers_lib::transport::ReportTransport;
use okpers_lib::usb::{UsbTransport, list_keys};
use okpers_lib::{Command, FirmwareVersion, Key, KeyError, Status, modhex};

/// Personalize OTP security keys over their HID feature-report interface.
#[derive(Parser, Debug)]
#[command(name = "okpersonalize", author, version, about, long_about = None)]
struct Cli {
    /// Which attached key to use when several are present.
    #[arg(short = 'N', long, default_value_t = 0)]
    key_index: usize,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List attached keys.
    List,
    /// Show firmware version, programming sequence and slot state.
    Status,
    /// Read the serial number.
    Serial,
    /// Write a new configuration to a slot.
    Program(ProgramArgs),
    /// Erase a slot.
    Erase {
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=2))]
        slot: u8,
        #[command(flatten)]
        write: WriteArgs,
    },
    /// Exchange the configurations of slot 1 and slot 2.
    Swap {
        #[command(flatten)]
        write: WriteArgs,
    },
    /// Write an NDEF record for the NFC interface.
    Ndef(NdefArgs),
    /// Send a challenge and print the response.
    Chalresp(ChalrespArgs),
    /// Set the USB interfaces the key presents (firmware 3.x and later).
    UsbMode(UsbModeArgs),
    /// Write the keyboard scan map (firmware 3.x and later).
    ScanMap {
        /// 45 characters in scan map order; the built-in map when absent.
        map: Option<String>,
        #[command(flatten)]
        write: WriteArgs,
    },
    /// Write device-info TLV entries (firmware 5.x and later).
    DeviceInfo {
        /// Entry as TAG:VALUE, both hex (e.g. 06:003c for a 60 s auto-eject timeout).
        #[arg(long = "tlv", value_name = "TAG:HEX", required = true)]
        entries: Vec<String>,
        #[command(flatten)]
        write: WriteArgs,
    },
    /// Read and decode the capabilities reported by the key.
    Info,
    /// Print the configuration `program` would build, without writing it.
    Export {
        #[command(flatten)]
        program: ConfigArgs,
        #[arg(short, long, value_enum, default_value_t = Format::Legacy)]
        format: Format,
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Build for this firmware instead of asking an attached key.
        #[arg(long)]
        firmware: Option<FirmwareVersion>,
    },
    /// Parse a JSON configuration for a firmware version and print the legacy view.
    ImportCheck {
        file: PathBuf,
        #[arg(long)]
        firmware: FirmwareVersion,
    },
}

#[derive(Args, Debug)]
struct WriteArgs {
    /// Access code currently protecting the slot, as 12 hex digits.
    #[arg(short = 'c', long)]
    current_access_code: Option<String>,
    /// Actually write to the key.
    #[arg(short, long)]
    yes: bool,
    /// Show what would be written and stop.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    slot: u8,
    #[arg(short, long, value_enum, default_value_t = Mode::YubicoOtp)]
    mode: Mode,
    /// Use the update command instead of a full slot write.
    #[arg(long)]
    update: bool,
    /// AES key (32 hex digits) or HMAC key (40 hex digits).
    #[arg(short, long, conflicts_with = "passphrase")]
    key: Option<String>,
    /// Derive the key from a passphrase.
    #[arg(long)]
    passphrase: Option<String>,
    /// Salt for passphrase derivation; random when absent.
    #[arg(long, requires = "passphrase")]
    salt: Option<String>,
    /// Public id, modhex or `h:` prefixed hex.
    #[arg(long)]
    fixed: Option<String>,
    /// Private id, 12 hex digits.
    #[arg(long)]
    uid: Option<String>,
    /// New access code: 12 hex digits, `m:` and modhex, or `serial`.
    #[arg(short, long)]
    access_code: Option<String>,
    /// OATH initial moving factor.
    #[arg(long)]
    oath_imf: Option<u32>,
    /// Flags to set, by name (e.g. APPEND_CR).
    #[arg(long = "set", value_name = "FLAG")]
    set_flags: Vec<String>,
    /// Flags to clear, by name.
    #[arg(long = "clear", value_name = "FLAG")]
    clear_flags: Vec<String>,
}

#[derive(Args, Debug)]
struct ProgramArgs {
    #[command(flatten)]
    config: ConfigArgs,
    #[command(flatten)]
    write: WriteArgs,
}

#[derive(Args, Debug)]
struct NdefArgs {
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    slot: u8,
    #[arg(long, conflicts_with = "text", required_unless_present = "text")]
    uri: Option<String>,
    #[arg(long)]
    text: Option<String>,
    #[arg(long, default_value = "en")]
    lang: String,
    /// Mark the text record as UTF-16.
    #[arg(long)]
    utf16: bool,
    #[command(flatten)]
    write: WriteArgs,
}

#[derive(Args, Debug)]
struct ChalrespArgs {
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=2))]
    slot: u8,
    /// Use Yubico OTP challenge-response instead of HMAC-SHA1.
    #[arg(long)]
    otp: bool,
    /// Challenge as hex.
    #[arg(short = 'x', long, conflicts_with = "challenge")]
    hex: Option<String>,
    /// Challenge as text.
    challenge: Option<String>,
    /// Fail instead of waiting when the key asks for a touch.
    #[arg(long)]
    no_wait: bool,
}

#[derive(Args, Debug)]
struct UsbModeArgs {
    #[arg(value_enum)]
    mode: UsbMode,
    /// Eject the smartcard when the button is pressed.
    #[arg(long)]
    eject: bool,
    /// Seconds to wait for a touch during challenge-response.
    #[arg(long, default_value_t = 15)]
    chalresp_timeout: u8,
    /// Seconds before the smartcard is ejected automatically, 0 for never.
    #[arg(long, default_value_t = 0)]
    autoeject_time: u16,
    #[command(flatten)]
    write: WriteArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum UsbMode {
    Otp,
    Ccid,
    OtpCcid,
    U2f,
    OtpU2f,
    U2fCcid,
    OtpU2fCcid,
}

impl From<UsbMode> for DeviceMode {
    fn from(mode: UsbMode) -> Self {
        match mode {
            UsbMode::Otp => DeviceMode::Otp,
            UsbMode::Ccid => DeviceMode::Ccid,
            UsbMode::OtpCcid => DeviceMode::OtpCcid,
            UsbMode::U2f => DeviceMode::U2f,
            UsbMode::OtpU2f => DeviceMode::OtpU2f,
            UsbMode::U2fCcid => DeviceMode::U2fCcid,
            UsbMode::OtpU2fCcid => DeviceMode::OtpU2fCcid,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    YubicoOtp,
    OathHotp,
    ChalHmac,
    ChalYubico,
    StaticTicket,
}

impl From<Mode> for ConfigMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::YubicoOtp => ConfigMode::YubicoOtp,
            Mode::OathHotp => ConfigMode::OathHotp,
            Mode::ChalHmac => ConfigMode::ChalHmac,
            Mode::ChalYubico => ConfigMode::ChalYubico,
            Mode::StaticTicket => ConfigMode::StaticTicket,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Legacy,
    Json,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Legacy => ExportFormat::Legacy,
            Format::Json => ExportFormat::Json,
        }
    }
}

// Verbosity applies to our own crates; USB stack chatter stays at warn.
// RUST_LOG replaces all of this when set.
fn log_directives(level: LevelFilter) -> String {
    format!("warn,okpers_lib={level},okpersonalize={level}")
}

fn setup_logging(log_file_path: Option<PathBuf>, verbosity: &Verbosity<InfoLevel>) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .without_time();

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file = File::create(path).with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_directives(verbosity.tracing_level_filter()))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Logging to file: {:?}", path);
    }

    Ok(guard)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file, &cli.verbose)?;

    if let Err(e) = run(cli.command, cli.key_index) {
        match e.downcast_ref::<KeyError>() {
            Some(key_error) => error!("{:#} (code {:#04x})", e, u8::from(key_error.code())),
            None => error!("{:#}", e),
        }
        process::exit(1);
    }

    Ok(())
}

fn run(command: Commands, key_index: usize) -> Result<()> {
    match command {
        Commands::List => list(),
        Commands::Status => {
            let mut key = open(key_index)?;
            let status = key.status()?;
            let (vid, pid) = key.vid_pid();
            println!("{vid:04x}:{pid:04x} {status}");
            println!(
                "slot 1: {}{}",
                if status.config1_valid() { "programmed" } else { "empty" },
                if status.config1_touch() { ", touch triggered" } else { "" }
            );
            println!(
                "slot 2: {}{}",
                if status.config2_valid() { "programmed" } else { "empty" },
                if status.config2_touch() { ", touch triggered" } else { "" }
            );
            if status.led_inverted() {
                println!("LED inverted");
            }
            Ok(())
        }
        Commands::Serial => {
            let mut key = open(key_index)?;
            let serial = key.serial(false).context("Key did not report a serial number")?;
            println!("{serial}");
            Ok(())
        }
        Commands::Program(args) => program(key_index, &args),
        Commands::Erase { slot, write } => {
            let mut key = open(key_index)?;
            let acc_code = parse_access_code(write.current_access_code.as_deref())?;
            if !confirm(&write, &format!("erase slot {slot}")) {
                return Ok(());
            }
            key.erase_slot(slot, acc_code.as_ref())
                .with_context(|| format!("Failed to erase slot {slot}"))?;
            info!("Slot {} erased", slot);
            Ok(())
        }
        Commands::Swap { write } => {
            let mut key = open(key_index)?;
            let status = key.status()?;
            KeyConfig::with_version(status.firmware()).configure_command(Command::Swap)?;
            let acc_code = parse_access_code(write.current_access_code.as_deref())?;
            if !confirm(&write, "swap slot 1 and slot 2") {
                return Ok(());
            }
            key.swap_slots(acc_code.as_ref()).context("Failed to swap slots")?;
            info!("Slots swapped");
            Ok(())
        }
        Commands::Ndef(args) => ndef(key_index, &args),
        Commands::Chalresp(args) => chalresp(key_index, &args),
        Commands::UsbMode(args) => usb_mode(key_index, &args),
        Commands::ScanMap { map, write } => {
            let map = map.map(String::into_bytes).unwrap_or_else(|| DEFAULT_SCAN_MAP.to_vec());
            if map.len() != SCAN_MAP_SIZE {
                bail!("Scan map must be {} characters, got {}", SCAN_MAP_SIZE, map.len());
            }
            let mut key = open(key_index)?;
            check_command(&mut key, Command::ScanMap)?;
            if !confirm(&write, "write a new scan map") {
                return Ok(());
            }
            key.write_scan_map(&map).context("Failed to write scan map")?;
            info!("Scan map written");
            Ok(())
        }
        Commands::DeviceInfo { entries, write } => {
            let mut builder = DeviceInfoBuilder::new();
            for entry in &entries {
                let (tag, value) = parse_tlv_arg(entry)?;
                builder = builder.push(tag, &value)?;
            }
            let blob = builder.build()?;
            let mut key = open(key_index)?;
            check_command(&mut key, Command::SetDeviceInfo)?;
            info!(blob = hex::encode(&blob), "Prepared device info");
            if !confirm(&write, "write device info") {
                return Ok(());
            }
            key.write_device_info(&blob).context("Failed to write device info")?;
            info!("Device info written");
            Ok(())
        }
        Commands::Info => {
            let mut key = open(key_index)?;
            let body = key.capabilities(false).context("Key did not report its capabilities")?;
            for entry in parse_tlv(&body)? {
                println!("{:?}: {}", entry.tag, hex::encode(&entry.value));
            }
            Ok(())
        }
        Commands::Export {
            program,
            format,
            output,
            firmware,
        } => {
            let (status, serial) = match firmware {
                Some(version) => (status_for(version), None),
                None => {
                    let mut key = open(key_index)?;
                    let serial = serial_if_needed(&mut key, &program)?;
                    (key.status()?, serial)
                }
            };
            let config = build_config(&program, &status, serial)?;
            let text = config.export(format.into())?;
            match output {
                Some(path) => fs::write(&path, text).with_context(|| format!("Failed to write {:?}", path))?,
                None => print!("{text}"),
            }
            Ok(())
        }
        Commands::ImportCheck { file, firmware } => {
            let text = fs::read_to_string(&file).with_context(|| format!("Failed to read {:?}", file))?;
            let mut config = KeyConfig::with_version(firmware);
            config
                .import(&text, ExportFormat::Json)
                .with_context(|| format!("{:?} is not a valid configuration for firmware {}", file, firmware))?;
            print!("{}", config.export(ExportFormat::Legacy)?);
            Ok(())
        }
    }
}

fn list() -> Result<()> {
    let keys = list_keys()?;
    if keys.is_empty() {
        info!("No keys found.");
    }
    for (index, key) in keys.iter().enumerate() {
        println!(
            "#{index}: {:04x}:{:04x} bus {:03} addr {:03} {} {}",
            key.vendor_id,
            key.product_id,
            key.bus_number,
            key.device_address,
            key.product.as_deref().unwrap_or("<unknown product>"),
            key.serial_number.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

fn open(index: usize) -> Result<Key<UsbTransport>> {
    Key::open(index).with_context(|| format!("Failed to open key #{index}"))
}

fn status_for(version: FirmwareVersion) -> Status {
    Status {
        version_major: version.major,
        version_minor: version.minor,
        version_build: version.build,
        ..Status::default()
    }
}

/// Fail early when the attached firmware cannot take `command`.
fn check_command(key: &mut Key<UsbTransport>, command: Command) -> Result<()> {
    let firmware = key.status()?.firmware();
    KeyConfig::with_version(firmware)
        .configure_command(command)
        .with_context(|| format!("Firmware {firmware} does not support {command}"))
}

fn parse_tlv_arg(entry: &str) -> Result<(DeviceInfoTag, Vec<u8>)> {
    let (tag, value) = entry
        .split_once(':')
        .with_context(|| format!("TLV entry '{entry}' is not TAG:HEX"))?;
    let tag = u8::from_str_radix(tag, 16).with_context(|| format!("Bad TLV tag '{tag}'"))?;
    let value = hex::decode(value).with_context(|| format!("Bad TLV value '{value}'"))?;
    Ok((DeviceInfoTag::from(tag), value))
}

/// Access code spelled as the serial number in decimal, read as 12 hex digits.
fn serial_access_code(serial: u32) -> Result<[u8; ACC_CODE_SIZE]> {
    let digits = format!("{serial:012}");
    let bytes = hex::decode(&digits)?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("Serial {serial} does not fit an access code"))
}

fn serial_if_needed(key: &mut Key<UsbTransport>, args: &ConfigArgs) -> Result<Option<u32>> {
    if args.access_code.as_deref() == Some("serial") {
        let serial = key.serial(false).context("Serial access code needs a readable serial number")?;
        Ok(Some(serial))
    } else {
        Ok(None)
    }
}

/// Returns false when the write should not happen.
fn confirm(write: &WriteArgs, what: &str) -> bool {
    if write.dry_run {
        info!("Dry run, would {}", what);
        return false;
    }
    if !write.yes {
        warn!("Refusing to {} without --yes", what);
        return false;
    }
    true
}

/// Access code as 12 hex digits, or `m:` followed by 12 modhex characters.
fn parse_access_code(text: Option<&str>) -> Result<Option<[u8; ACC_CODE_SIZE]>> {
    let Some(text) = text else { return Ok(None) };
    let bytes = match text.strip_prefix("m:") {
        Some(modhex_part) => modhex::decode(modhex_part)?,
        None => hex::decode(text).with_context(|| format!("Access code '{text}' is not hex"))?,
    };
    let code: [u8; ACC_CODE_SIZE] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("Access code must be {} bytes, got {}", ACC_CODE_SIZE, b.len()))?;
    Ok(Some(code))
}

fn parse_flag(name: &str) -> Result<Flag> {
    Flag::from_legacy_name(&name.to_ascii_uppercase()).with_context(|| format!("Unknown flag '{name}'"))
}

fn build_config(args: &ConfigArgs, status: &Status, serial: Option<u32>) -> Result<KeyConfig> {
    let mut config = KeyConfig::for_slot(args.slot, status)
        .with_context(|| format!("Slot {} is not available on firmware {}", args.slot, status.firmware()))?;

    if args.update {
        let command = if args.slot == 1 { Command::Update1 } else { Command::Update2 };
        config.configure_command(command)?;
    }

    config.set_mode(args.mode.into())?;
    for name in &args.set_flags {
        let flag = parse_flag(name)?;
        config.set_flag(flag, true).with_context(|| format!("Cannot set {flag}"))?;
    }
    for name in &args.clear_flags {
        let flag = parse_flag(name)?;
        config.set_flag(flag, false).with_context(|| format!("Cannot clear {flag}"))?;
    }

    if let Some(key) = &args.key {
        match key.len() {
            40 => config.set_hmac_key_hex(key)?,
            _ => config.set_aes_key_hex(key)?,
        }
    }
    if let Some(passphrase) = &args.passphrase {
        config.set_key_from_passphrase(passphrase.as_bytes(), args.salt.as_deref().map(str::as_bytes))?;
    }

    if let Some(fixed) = &args.fixed {
        let bytes = match fixed.strip_prefix("h:") {
            Some(hex_part) => hex::decode(hex_part)?,
            None => modhex::decode(fixed.strip_prefix("m:").unwrap_or(fixed))?,
        };
        config.set_fixed(&bytes);
    }
    if let Some(uid) = &args.uid {
        config.set_uid(&hex::decode(uid)?);
    }
    match args.access_code.as_deref() {
        Some("serial") => {
            let serial = serial.context("Serial access code needs an attached key")?;
            config.set_access_code(&serial_access_code(serial)?);
            config.set_access_code_type(AccessCodeType::Serial);
        }
        other => {
            if let Some(code) = parse_access_code(other)? {
                config.set_access_code(&code);
            }
        }
    }
    if config.access_code_type() != AccessCodeType::None {
        info!("Access code derived from {:?}", config.access_code_type());
    }
    if let Some(imf) = args.oath_imf {
        config.set_oath_imf(imf)?;
    }

    Ok(config)
}

fn program(key_index: usize, args: &ProgramArgs) -> Result<()> {
    let mut key = open(key_index)?;
    let serial = serial_if_needed(&mut key, &args.config)?;
    let status = key.status()?;
    let config = build_config(&args.config, &status, serial)?;
    let acc_code = parse_access_code(args.write.current_access_code.as_deref())?;

    print!("{}", config.export(ExportFormat::Legacy)?);
    if !confirm(&args.write, &format!("write this configuration with {}", config.command())) {
        return Ok(());
    }

    key.write_config(&config, acc_code.as_ref())
        .with_context(|| format!("Failed to write slot {}", args.config.slot))?;
    info!("Configuration written to slot {}", args.config.slot);
    Ok(())
}

fn ndef(key_index: usize, args: &NdefArgs) -> Result<()> {
    let mut key = open(key_index)?;
    let status = key.status()?;

    let command = if args.slot == 1 { Command::Ndef1 } else { Command::Ndef2 };
    KeyConfig::with_version(status.firmware())
        .configure_command(command)
        .with_context(|| format!("Firmware {} has no NDEF slot {}", status.firmware(), args.slot))?;

    let mut ndef = match (&args.uri, &args.text) {
        (Some(uri), _) => Ndef::uri(uri)?,
        (None, Some(text)) => Ndef::text(text, &args.lang, args.utf16)?,
        (None, None) => bail!("Either --uri or --text is required"),
    };
    if let Some(code) = parse_access_code(args.write.current_access_code.as_deref())? {
        ndef.set_access_code(&code);
    }

    info!(record = ?ndef, "Prepared NDEF record");
    if !confirm(&args.write, &format!("write NDEF record to slot {}", args.slot)) {
        return Ok(());
    }
    write_ndef_record(&mut key, &ndef, args.slot)?;
    info!("NDEF record written");
    Ok(())
}

fn write_ndef_record<T: ReportTransport>(key: &mut Key<T>, ndef: &Ndef, slot: u8) -> Result<()> {
    key.write_ndef(ndef, slot)
        .with_context(|| format!("Failed to write NDEF record to slot {slot}"))
}

fn usb_mode(key_index: usize, args: &UsbModeArgs) -> Result<()> {
    let mut config = DeviceConfig::default();
    config.set_mode(args.mode.into(), args.eject);
    config.set_chalresp_timeout(args.chalresp_timeout);
    config.set_autoeject_time(args.autoeject_time);

    let mode = config.device_mode()?;
    if !mode.has_otp() {
        warn!("Mode {} disables the OTP interface; this tool will no longer see the key", mode);
    }

    let mut key = open(key_index)?;
    check_command(&mut key, Command::DeviceConfig)?;
    if !confirm(&args.write, &format!("set USB mode {mode}")) {
        return Ok(());
    }
    key.write_device_config(&config).context("Failed to write device config")?;
    info!("USB mode set to {}", mode);
    Ok(())
}

fn chalresp(key_index: usize, args: &ChalrespArgs) -> Result<()> {
    let challenge = match (&args.hex, &args.challenge) {
        (Some(hex_challenge), _) => hex::decode(hex_challenge).context("Challenge is not hex")?,
        (None, Some(text)) => text.as_bytes().to_vec(),
        (None, None) => bail!("No challenge given"),
    };
    let command = match (args.otp, args.slot) {
        (false, 1) => Command::ChalHmac1,
        (false, _) => Command::ChalHmac2,
        (true, 1) => Command::ChalOtp1,
        (true, _) => Command::ChalOtp2,
    };

    let mut key = open(key_index)?;
    let response = key
        .challenge_response(command, !args.no_wait, &challenge)
        .with_context(|| format!("{command} failed"))?;
    println!("{}", hex::encode(response.as_slice()));
    Ok(())
}
