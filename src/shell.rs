//! Command shell adapter
//!
//! Maps the textual command language onto allocator calls:
//!
//! | Command | Effect |
//! |---|---|
//! | `RESERVAR <size> <name>` | reserve `size` units under `name` |
//! | `LIBERAR <name>` | release `name` |
//! | `MOSTRAR` | render the block tree |
//! | `SALIR` | end the session |
//!
//! Malformed lines are rejected before they reach the allocator.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "log")]
use log::trace;

use crate::buddy::BuddyAllocator;
use crate::{SimError, SimResult};

const RESERVE_USAGE: &str = "RESERVAR <size> <name>";
const FREE_USAGE: &str = "LIBERAR <name>";

/// A parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reserve { units: i64, tag: String },
    Free { tag: String },
    Show,
    Exit,
}

impl Command {
    /// Parse one input line; blank lines yield `Ok(None)`
    pub fn parse(line: &str) -> Result<Option<Self>, ShellError> {
        let mut parts = line.split_whitespace();
        let keyword = match parts.next() {
            Some(keyword) => keyword,
            None => return Ok(None),
        };
        let args: Vec<&str> = parts.collect();

        let command = if keyword.eq_ignore_ascii_case("RESERVAR") {
            let [size, name] = args.as_slice() else {
                return Err(ShellError::Usage(RESERVE_USAGE));
            };
            let units = size
                .parse::<i64>()
                .map_err(|_| ShellError::InvalidNumber(size.to_string()))?;
            Command::Reserve {
                units,
                tag: name.to_string(),
            }
        } else if keyword.eq_ignore_ascii_case("LIBERAR") {
            let [name] = args.as_slice() else {
                return Err(ShellError::Usage(FREE_USAGE));
            };
            Command::Free {
                tag: name.to_string(),
            }
        } else if keyword.eq_ignore_ascii_case("MOSTRAR") {
            Command::Show
        } else if keyword.eq_ignore_ascii_case("SALIR") {
            Command::Exit
        } else {
            return Err(ShellError::UnknownCommand(keyword.to_string()));
        };
        Ok(Some(command))
    }
}

/// Result of executing one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellOutput {
    /// Blank line, nothing to print
    Nothing,
    Print(String),
    /// Farewell text; the session is over
    Exit(String),
}

/// Errors reported back to the shell user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    UnknownCommand(String),
    /// Wrong argument count; carries the expected usage
    Usage(&'static str),
    InvalidNumber(String),
    Alloc(SimError),
}

impl From<SimError> for ShellError {
    fn from(err: SimError) -> Self {
        ShellError::Alloc(err)
    }
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::UnknownCommand(keyword) => write!(
                f,
                "unrecognized action '{}'. Valid actions: RESERVAR, LIBERAR, MOSTRAR, SALIR",
                keyword
            ),
            ShellError::Usage(usage) => write!(f, "wrong format. Usage: {}", usage),
            ShellError::InvalidNumber(text) => write!(f, "'{}' is not an integer", text),
            ShellError::Alloc(err) => write!(f, "{}", err),
        }
    }
}

/// Parse the capacity line read before a session starts
///
/// Non-positive counts are reported as [`SimError::InvalidCapacity`].
pub fn parse_capacity(line: &str) -> Result<usize, ShellError> {
    let text = line.trim();
    let units = text
        .parse::<i64>()
        .map_err(|_| ShellError::InvalidNumber(text.to_string()))?;
    match usize::try_from(units) {
        Ok(capacity) if capacity > 0 => Ok(capacity),
        _ => Err(SimError::InvalidCapacity.into()),
    }
}

/// Interactive session bound to one allocator
pub struct Shell {
    allocator: BuddyAllocator,
}

impl Shell {
    pub fn new(capacity: usize) -> SimResult<Self> {
        Ok(Self {
            allocator: BuddyAllocator::new(capacity)?,
        })
    }

    pub fn allocator(&self) -> &BuddyAllocator {
        &self.allocator
    }

    /// Parse and run one line
    pub fn execute(&mut self, line: &str) -> Result<ShellOutput, ShellError> {
        match Command::parse(line)? {
            Some(command) => self.run(command),
            None => Ok(ShellOutput::Nothing),
        }
    }

    pub fn run(&mut self, command: Command) -> Result<ShellOutput, ShellError> {
        trace!("shell: {:?}", command);
        match command {
            Command::Reserve { units, tag } => {
                let size = usize::try_from(units).map_err(|_| SimError::InvalidSize)?;
                self.allocator.reserve(size, &tag)?;
                Ok(ShellOutput::Print(format!(
                    "reserved {} units for '{}'",
                    units, tag
                )))
            }
            Command::Free { tag } => {
                self.allocator.free(&tag)?;
                Ok(ShellOutput::Print(format!("released '{}'", tag)))
            }
            Command::Show => Ok(ShellOutput::Print(self.allocator.render().to_string())),
            Command::Exit => Ok(ShellOutput::Exit(String::from("bye"))),
        }
    }
}
