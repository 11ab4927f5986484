//! Player commands
//!
//! Turns a line of input into a [`Command`] and runs it for a caller,
//! checking everything the fight core doesn't (is the target here, is it
//! alive, is the caller carrying that item).

pub mod command;
pub mod error;
pub mod handlers;

pub use command::Command;
pub use error::CommandError;
pub use handlers::{check_can_leave, find_carried, find_here, run_command, run_line, CommandContext};
