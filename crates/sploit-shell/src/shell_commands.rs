//! Commands specific to one shell variant: `exploit` (main), `env` (remote).

use colored::Colorize;
use sploit_types::error::{Result, SploitError};
use sploit_types::session::Session;

use crate::help::{self, Help};
use crate::interpreter::{Command, CommandOutput, Context, Shell, ShellKind};
use crate::retarget::HOST_VAR;
use crate::settings_commands::{columnize, complete_names, joined_value};

/// Register the commands of `shell`'s variant.
pub fn register_shell_commands(shell: &mut Shell) {
    match shell.kind() {
        ShellKind::Main => shell.register(Box::new(ExploitCmd)),
        ShellKind::Remote => shell.register(Box::new(EnvCmd)),
    }
}

// ---------------------------------------------------------------------------
// exploit
// ---------------------------------------------------------------------------

struct ExploitCmd;
impl Command for ExploitCmd {
    fn name(&self) -> &str {
        "exploit"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new(
            "Spawn a shell from the target server",
            "
SYNOPSIS:
    exploit

DESCRIPTION:
    Check that the backdoor planted on TARGET answers, then open
    a remote shell on it. Use 'infect' to get the payload first.",
        ))
    }
    fn execute(
        &self,
        _argv: &[&str],
        _shell: &Shell,
        ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        let link = &ctx.session.link;
        if !link.is_bound() {
            return Err(SploitError::Command(
                "TARGET must be set before exploiting".to_string(),
            ));
        }
        ctx.services.checker.check(link)?;

        let session = &mut *ctx.session;
        session.link_hash = Some(session.link.hash.clone());
        if let Some(host) = session.link.host.clone() {
            session.env.insert(HOST_VAR.to_string(), host);
            session.lock_env(HOST_VAR);
        }
        log::info!("link {} confirmed", session.link.short_hash());
        Ok(CommandOutput::EnterRemote)
    }
}

// ---------------------------------------------------------------------------
// env
// ---------------------------------------------------------------------------

struct EnvCmd;
impl Command for EnvCmd {
    fn name(&self) -> &str {
        "env"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new(
            "View and edit the remote environment",
            "
SYNOPSIS:
    env [<NAME> [<VALUE>]]

DESCRIPTION:
    The environment holds variables describing the remote side.

    > env
      - Display all variables.

    > env <STRING>
      - Display variables whose name starts with STRING.

    > env <NAME> <VALUE>
      - Assign VALUE to NAME, creating it if needed.",
        ))
    }
    fn complete(&self, text: &str, session: &Session) -> Vec<String> {
        complete_names(session.env.keys().map(String::as_str), text)
    }
    fn execute(
        &self,
        argv: &[&str],
        shell: &Shell,
        ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        let env = &ctx.session.env;
        if argv.len() <= 2 {
            let prefix = argv.get(1).map(|p| p.to_ascii_uppercase()).unwrap_or_default();
            let rows: Vec<(&str, &str)> = env
                .iter()
                .filter(|(name, _)| name.starts_with(&prefix))
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect();
            if rows.is_empty() {
                return Ok(help::usage(shell, "env"));
            }
            return Ok(CommandOutput::Text(columnize("Environment variables", &rows)));
        }

        let name = argv[1].to_ascii_uppercase();
        if ctx.session.is_env_locked(&name) {
            return Err(SploitError::LockedEnv(name));
        }
        let value = joined_value(argv);
        let out = format!("{name} ==> {}", value.bold());
        ctx.session.env.insert(name, value);
        Ok(CommandOutput::Text(out))
    }
}
