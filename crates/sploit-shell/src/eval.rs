//! `eval`: run files or literal strings as shell input.

use std::fs;
use std::path::Path;

use sploit_types::error::{Result, SploitError};

use crate::help::{self, Help};
use crate::interpreter::{Command, CommandOutput, Context, Shell};

/// Build the input `eval` resubmits from its arguments.
///
/// An argument naming a regular file stands for the file's contents, any
/// other argument for itself. Pieces are joined by newlines. A file that
/// exists but cannot be read aborts the whole expansion.
pub fn expand_args(args: &[&str]) -> Result<String> {
    let mut pieces = Vec::with_capacity(args.len());
    for arg in args {
        let path = Path::new(arg);
        if path.is_file() {
            let contents = fs::read_to_string(path).map_err(|source| SploitError::Eval {
                path: arg.to_string(),
                source,
            })?;
            pieces.push(contents);
        } else {
            pieces.push(arg.to_string());
        }
    }
    Ok(pieces.join("\n"))
}

pub(crate) struct EvalCmd;
impl Command for EvalCmd {
    fn name(&self) -> &str {
        "eval"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new(
            "Run sploit command scripts",
            "
SYNOPSIS:
    eval <FILE|STRING> [<FILE|STRING>...]

DESCRIPTION:
    Run each argument as if its lines were typed at the prompt.
    An argument naming a file is replaced by the file contents;
    anything else is taken as a literal command string.
    Arguments run in the order given, blank lines are skipped.

EXAMPLES:
    > eval /tmp/setup.sploit
    > eval \"set REQ_TIMEOUT 30\" \"exploit\"",
        ))
    }
    fn execute(
        &self,
        argv: &[&str],
        shell: &Shell,
        ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        if argv.len() < 2 {
            return Ok(help::usage(shell, "eval"));
        }
        let input = expand_args(&argv[1..])?;
        log::debug!("eval: {} lines", input.lines().count());
        shell.execute_nested(&input, ctx)
    }
}
