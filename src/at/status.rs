//! `AT+STATUS` - read-only device, network and radio dump

use super::{AtStatus, CommandTable, PERM_READ};
use crate::Node;
use crate::config;
use crate::interval::PeriodicTimer;
use crate::radio::{NetworkMode, RadioInfo, region_name};
use crate::storage::NvStorage;
use core::fmt::{self, Write};

pub const NAME: &str = "STATUS";
pub const HELP: &str = "Get device information";

/// Add the device status AT command
pub fn init_status_at<S, T, R, const N: usize>(table: &mut CommandTable<Node<S, T, R>, N>) -> bool
where
    S: NvStorage,
    T: PeriodicTimer,
    R: RadioInfo,
{
    table.register(NAME, HELP, NAME, status_handler::<S, T, R>, PERM_READ)
}

/// Renders bytes as unseparated uppercase hex pairs
pub struct HexUpper<'a>(pub &'a [u8]);

impl fmt::Display for HexUpper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

struct AsciiUpper<'a>(&'a str);

impl fmt::Display for AsciiUpper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            f.write_char(c.to_ascii_uppercase())?;
        }
        Ok(())
    }
}

/// Accepts `STATUS` and `STATUS=?` only
pub fn status_handler<S, T, R>(
    node: &mut Node<S, T, R>,
    _cmd: &str,
    args: &[&str],
    out: &mut dyn Write,
) -> AtStatus
where
    S: NvStorage,
    T: PeriodicTimer,
    R: RadioInfo,
{
    let is_query = match args {
        [] => true,
        [arg] => *arg == config::QUERY_TOKEN,
        _ => false,
    };
    if !is_query {
        return AtStatus::ParamError;
    }

    let radio = &node.radio;

    at_printf!(out, "Device Status:");
    at_printf!(out, "Module: {}", AsciiUpper(radio.hardware_model()));
    at_printf!(out, "Version: {}", radio.firmware_version());
    at_printf!(out, "Send time: {} s", node.send_interval_seconds());

    let mode = NetworkMode::from_code(radio.network_mode());
    at_printf!(out, "Network mode {}", mode.map_or("Unknown", NetworkMode::label));

    match mode {
        Some(NetworkMode::LoRaWan) => write_lorawan(radio, out),
        Some(NetworkMode::P2p) => {
            at_printf!(out, "Frequency = {}", radio.p2p_frequency());
            at_printf!(out, "SF = {}", radio.p2p_spreading_factor());
            at_printf!(out, "BW = {}", radio.p2p_bandwidth());
            at_printf!(out, "CR = {}", radio.p2p_coding_rate());
            at_printf!(out, "Preamble length = {}", radio.p2p_preamble_length());
            at_printf!(out, "TX power = {}", radio.p2p_tx_power());
        }
        Some(NetworkMode::Fsk) => {
            at_printf!(out, "Frequency = {}", radio.p2p_frequency());
            at_printf!(out, "Bitrate = {}", radio.fsk_bitrate());
            // label spelling is what host tools parse
            at_printf!(out, "Deviaton = {}", radio.fsk_deviation());
        }
        None => {}
    }

    AtStatus::Ok
}

fn write_lorawan<R: RadioInfo>(radio: &R, out: &mut dyn Write) {
    at_printf!(
        out,
        "Network {}",
        if radio.network_joined() { "joined" } else { "not joined" }
    );

    let region = radio.region();
    at_printf!(out, "Region: {}", region);
    at_printf!(out, "Region: {}", region_name(region));

    if radio.otaa_join() {
        at_printf!(out, "OTAA mode");
        at_printf!(out, "DevEUI={}", HexUpper(&radio.dev_eui()));
        at_printf!(out, "AppEUI={}", HexUpper(&radio.app_eui()));
        at_printf!(out, "AppKey={}", HexUpper(&radio.app_key()));
    } else {
        at_printf!(out, "ABP mode");
        at_printf!(out, "AppsKey={}", HexUpper(&radio.apps_key()));
        at_printf!(out, "NwsKey={}", HexUpper(&radio.nwks_key()));
        at_printf!(out, "DevAddr={}", HexUpper(&radio.dev_addr()));
    }
}
