//! `AT+SENDINT` - get/set the periodic send interval in seconds

use super::{AtStatus, CommandTable, PERM_READ, PERM_WRITE};
use crate::Node;
use crate::config;
use crate::interval::PeriodicTimer;
use crate::radio::RadioInfo;
use crate::storage::NvStorage;
use core::fmt::Write;
use log::warn;

pub const NAME: &str = "SENDINT";
pub const HELP: &str =
    "Set/Get the interval sending time values in seconds 0 = off, max 2,147,483 seconds";

/// Add the send interval AT command
pub fn init_interval_at<S, T, R, const N: usize>(table: &mut CommandTable<Node<S, T, R>, N>) -> bool
where
    S: NvStorage,
    T: PeriodicTimer,
    R: RadioInfo,
{
    table.register(
        NAME,
        HELP,
        NAME,
        interval_send_handler::<S, T, R>,
        PERM_READ | PERM_WRITE,
    )
}

/// `SENDINT=?` prints the interval, `SENDINT=<seconds>` sets it, any other
/// argument count is a parameter error.
pub fn interval_send_handler<S, T, R>(
    node: &mut Node<S, T, R>,
    cmd: &str,
    args: &[&str],
    out: &mut dyn Write,
) -> AtStatus
where
    S: NvStorage,
    T: PeriodicTimer,
    R: RadioInfo,
{
    match args {
        [query] if *query == config::QUERY_TOKEN => {
            at_printf!(out, "{}={}", cmd, node.send_interval_seconds());
            AtStatus::Ok
        }
        [value] => match node.apply_send_interval(value) {
            Ok(()) => AtStatus::Ok,
            Err(e) => {
                warn!("[AT_CMD] Rejected send interval {:?}: {:?}", value, e);
                AtStatus::ParamError
            }
        },
        _ => AtStatus::ParamError,
    }
}
