//! AT command table and console line handling
//!
//! Handlers receive the command name and the `:` separated argument vector and
//! write their response lines to the console writer. The table appends the
//! final status line (`OK`, `AT_PARAM_ERROR`, ...).

/// Write one formatted response line, terminated with `\r\n`
#[macro_export]
macro_rules! at_printf {
    ($out:expr, $($arg:tt)*) => {
        // Console write errors cannot be reported anywhere but the console
        let _ = $crate::at::write_line($out, format_args!($($arg)*));
    };
}

pub mod sendint;
pub mod status;

pub use sendint::init_interval_at;
pub use status::init_status_at;

use crate::config;
use core::fmt::{self, Write};
use heapless::{String, Vec};
use log::{debug, warn};

/// Result code of an AT call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtStatus {
    Ok,
    ParamError,
    CommandNotFound,
}

impl AtStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AtStatus::Ok => "OK",
            AtStatus::ParamError => "AT_PARAM_ERROR",
            AtStatus::CommandNotFound => "AT_COMMAND_NOT_FOUND",
        }
    }
}

/// Command may be queried (`AT+CMD`, `AT+CMD=?`)
pub const PERM_READ: u8 = 1 << 0;
/// Command may be set (`AT+CMD=value`)
pub const PERM_WRITE: u8 = 1 << 1;

/// `handler(ctx, command_name, argv, out)`
pub type AtHandler<Ctx> = fn(&mut Ctx, &str, &[&str], &mut dyn Write) -> AtStatus;

pub struct AtCommand<Ctx> {
    pub name: &'static str,
    pub help: &'static str,
    pub usage: &'static str,
    pub handler: AtHandler<Ctx>,
    pub permissions: u8,
}

pub fn write_line(out: &mut dyn Write, args: fmt::Arguments<'_>) -> fmt::Result {
    out.write_fmt(args)?;
    out.write_str(config::LINE_END)
}

/// Registered commands, at most `N`
pub struct CommandTable<Ctx, const N: usize> {
    commands: Vec<AtCommand<Ctx>, N>,
}

impl<Ctx, const N: usize> CommandTable<Ctx, N> {
    pub const fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Add a command. Returns `false` when the table is full or the name is
    /// already taken.
    pub fn register(
        &mut self,
        name: &'static str,
        help: &'static str,
        usage: &'static str,
        handler: AtHandler<Ctx>,
        permissions: u8,
    ) -> bool {
        if self.find(name).is_some() {
            warn!("[AT] Command {} already registered", name);
            return false;
        }

        let command = AtCommand {
            name,
            help,
            usage,
            handler,
            permissions,
        };
        if self.commands.push(command).is_err() {
            warn!("[AT] Command table full, cannot add {}", name);
            return false;
        }

        debug!("[AT] Registered AT+{}", name);
        true
    }

    pub fn find(&self, name: &str) -> Option<&AtCommand<Ctx>> {
        self.commands
            .iter()
            .find(|command| command.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run one console line and write the response including the status
    /// line. Blank lines produce no output and return `None`.
    pub fn dispatch_line(&self, ctx: &mut Ctx, line: &str, out: &mut dyn Write) -> Option<AtStatus> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let status = self.execute(ctx, line, out);
        at_printf!(out, "{}", status.as_str());
        Some(status)
    }

    fn execute(&self, ctx: &mut Ctx, line: &str, out: &mut dyn Write) -> AtStatus {
        if line.eq_ignore_ascii_case("AT") {
            return AtStatus::Ok;
        }

        let Some(body) = strip_at_prefix(line) else {
            debug!("[AT] Not an AT command: {}", line);
            return AtStatus::CommandNotFound;
        };

        let (name, params) = match body.split_once('=') {
            Some((name, params)) => (name, Some(params)),
            None => (body, None),
        };

        // AT+CMD? prints the help text
        if params.is_none() {
            if let Some(name) = name.strip_suffix('?') {
                return match self.find(name) {
                    Some(command) => {
                        at_printf!(out, "AT+{}: {}", command.usage, command.help);
                        AtStatus::Ok
                    }
                    None => AtStatus::CommandNotFound,
                };
            }
        }

        let Some(command) = self.find(name) else {
            debug!("[AT] Unknown command: {}", name);
            return AtStatus::CommandNotFound;
        };

        let mut args: Vec<&str, { config::AT_MAX_ARGS }> = Vec::new();
        if let Some(params) = params {
            for arg in params.split(':') {
                if args.push(arg).is_err() {
                    warn!("[AT] Too many arguments for AT+{}", command.name);
                    return AtStatus::ParamError;
                }
            }
        }

        let is_query = args.is_empty() || (args.len() == 1 && args[0] == config::QUERY_TOKEN);
        let required = if is_query { PERM_READ } else { PERM_WRITE };
        if command.permissions & required == 0 {
            debug!("[AT] AT+{} does not allow this access", command.name);
            return AtStatus::ParamError;
        }

        (command.handler)(ctx, command.name, &args, out)
    }
}

impl<Ctx, const N: usize> Default for CommandTable<Ctx, N> {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_at_prefix(line: &str) -> Option<&str> {
    let prefix = line.get(..3)?;
    prefix
        .eq_ignore_ascii_case("AT+")
        .then(|| &line[3..])
}

/// Assembles console bytes into lines
pub struct LineBuffer<const N: usize> {
    buf: Vec<u8, N>,
    overflowed: bool,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            overflowed: false,
        }
    }

    /// Feed one byte. Returns the finished line on CR or LF. Lines longer
    /// than `N` bytes and lines that are not UTF-8 are dropped.
    pub fn push(&mut self, byte: u8) -> Option<String<N>> {
        match byte {
            b'\r' | b'\n' => {
                let bytes = core::mem::take(&mut self.buf);
                if self.overflowed {
                    self.overflowed = false;
                    warn!("[AT] Line longer than {} bytes dropped", N);
                    return None;
                }
                if bytes.is_empty() {
                    return None;
                }
                match String::from_utf8(bytes) {
                    Ok(line) => Some(line),
                    Err(_) => {
                        warn!("[AT] Dropping line that is not UTF-8");
                        None
                    }
                }
            }
            // backspace / delete from interactive terminals
            0x08 | 0x7F => {
                self.buf.pop();
                None
            }
            _ => {
                if !self.overflowed && self.buf.push(byte).is_err() {
                    self.overflowed = true;
                }
                None
            }
        }
    }
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
