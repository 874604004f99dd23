//! Terminal side of command results.

use std::io::{self, Write};

use sploit_shell::CommandOutput;

/// ANSI sequence wiping the screen and homing the cursor.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[1;1H";

/// What the shell stack does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange {
    Stay,
    Exit,
    EnterRemote,
}

/// Write `output` to `out` and report the level change it carries, if any.
///
/// A batch is written in order up to its first level change.
pub fn process_command_output(
    output: CommandOutput,
    out: &mut impl Write,
) -> io::Result<LevelChange> {
    match output {
        CommandOutput::Text(text) => writeln!(out, "{text}")?,
        CommandOutput::None => {},
        CommandOutput::Clear => write!(out, "{CLEAR_SCREEN}")?,
        CommandOutput::Exit => return Ok(LevelChange::Exit),
        CommandOutput::EnterRemote => return Ok(LevelChange::EnterRemote),
        CommandOutput::Batch(items) => {
            for item in items {
                let change = process_command_output(item, out)?;
                if change != LevelChange::Stay {
                    return Ok(change);
                }
            }
        },
    }
    Ok(LevelChange::Stay)
}
