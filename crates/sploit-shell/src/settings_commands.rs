//! Settings mutation (`set`) and the two-column variable tables.

use colored::Colorize;
use sploit_types::error::{Result, SploitError};
use sploit_types::session::Session;
use sploit_types::settings::TARGET;

use crate::help::{self, Help};
use crate::interpreter::{Command, CommandOutput, Context, Shell, ShellKind};
use crate::retarget::{Rollback, retarget};

/// Render `rows` as a titled `Variable | Value` table.
pub(crate) fn columnize(title: &str, rows: &[(&str, &str)]) -> String {
    let width = rows
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Variable".len());
    let gap = " ".repeat(width - "Variable".len() + 4);

    let mut out = format!("\n{title}\n{}\n\n", "=".repeat(title.chars().count()));
    out.push_str(&format!("    Variable{gap}Value\n"));
    out.push_str(&format!("    --------{gap}-----\n"));
    for (name, value) in rows {
        let pad = " ".repeat(width - name.chars().count() + 4);
        out.push_str(&format!("    {name}{pad}{value}\n"));
    }
    out
}

/// Candidates among `names` for a case-insensitive `text` prefix.
pub(crate) fn complete_names<'a>(
    names: impl Iterator<Item = &'a str>,
    text: &str,
) -> Vec<String> {
    let prefix = text.to_ascii_uppercase();
    names
        .filter(|name| name.starts_with(&prefix))
        .map(|name| format!("{name} "))
        .collect()
}

/// Joined value words of a mutation (`argv[2..]`), trimmed.
pub(crate) fn joined_value(argv: &[&str]) -> String {
    argv.get(2..).unwrap_or_default().join(" ").trim().to_string()
}

/// Change setting `name` to `value` in the session.
///
/// A value the validator rejects is dropped without output. A TARGET
/// change in a remote shell must pass the retarget check, otherwise the
/// setting and the link are restored and the connectivity error returned.
pub fn set_var(
    name: &str,
    value: &str,
    shell: &Shell,
    ctx: &mut Context<'_>,
) -> Result<CommandOutput> {
    let session: &mut Session = ctx.session;
    let backup = session.settings.insert(name, value);

    if !ctx.services.validator.validate(&session.settings) {
        match &backup {
            Some(old) => session.settings.insert(name, old),
            None => session.settings.remove(name),
        };
        log::debug!("{name}: rejected {value:?}, kept {backup:?}");
        return Ok(CommandOutput::None);
    }

    let rebuilt = ctx.services.links.build(&session.settings);
    let previous_link = std::mem::replace(&mut session.link, rebuilt);

    if name == TARGET && shell.kind() == ShellKind::Remote {
        let rollback = Rollback {
            setting: name.to_string(),
            value: backup,
            link: previous_link,
        };
        retarget(session, ctx.services.checker, rollback)?;
        shell.refresh_prompt(session);
        return Ok(CommandOutput::None);
    }

    Ok(CommandOutput::Text(format!("{name} ==> {}", value.bold())))
}

pub(crate) struct SetCmd;
impl Command for SetCmd {
    fn name(&self) -> &str {
        "set"
    }
    fn help(&self) -> Option<Help> {
        Some(Help::new(
            "View and edit settings",
            "
SYNOPSIS:
    set [<NAME> [<VALUE>]]

DESCRIPTION:
    Settings shape the session: the target, the payload, the
    request parameters.

    > set
      - Display all settings.

    > set <STRING>
      - Display settings whose name starts with STRING.

    > set <NAME> <VALUE>
      - Assign VALUE to NAME. Words after NAME are joined by one
        space. Invalid values are ignored and the old value kept.

EXAMPLES:
    > set TARGET http://example.com/index.php
    > set REQ_TIMEOUT 30",
        ))
    }
    fn complete(&self, text: &str, session: &Session) -> Vec<String> {
        complete_names(session.settings.names(), text)
    }
    fn execute(
        &self,
        argv: &[&str],
        shell: &Shell,
        ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        if argv.len() <= 2 {
            let prefix = argv.get(1).copied().unwrap_or("");
            let rows = ctx.session.settings.matching(prefix);
            if rows.is_empty() {
                return Ok(help::usage(shell, "set"));
            }
            return Ok(CommandOutput::Text(columnize("Session settings", &rows)));
        }

        let name = argv[1].to_ascii_uppercase();
        if !ctx.session.settings.contains(&name) {
            return Ok(help::usage(shell, "set"));
        }
        if ctx.session.is_setting_locked(&name) {
            return Err(SploitError::LockedSetting(name));
        }
        set_var(&name, &joined_value(argv), shell, ctx)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use sploit_types::settings::{
        PASSKEY, REQ_TIMEOUT, SAVEPATH, SettingRules, Settings, TEXTEDITOR,
    };

    use super::*;
    use crate::test_support::{Harness, text};

    fn main_shell() -> Shell {
        Shell::new(ShellKind::Main, None)
    }

    #[test]
    fn display_all_and_prefix() {
        let shell = main_shell();
        let mut h = Harness::new();
        let all = text(h.run(&shell, "set"));
        assert!(all.starts_with("\nSession settings\n================\n"));
        let gap = " ".repeat("REQ_USER_AGENT".len() - "PASSKEY".len() + 4);
        assert!(all.contains(&format!("    PASSKEY{gap}phpSpl01t\n")));

        let some = text(h.run(&shell, "set req_"));
        assert!(some.contains("REQ_TIMEOUT"));
        assert!(!some.contains("PASSKEY"));
    }

    #[test]
    fn empty_filter_shows_help() {
        let shell = main_shell();
        let mut h = Harness::new();
        assert_eq!(text(h.run(&shell, "set ZZZ")), help::command_page(&shell, "set"));
    }

    #[test]
    fn unknown_name_shows_help() {
        let shell = main_shell();
        let mut h = Harness::new();
        let before = h.session.clone();
        assert_eq!(text(h.run(&shell, "set NOPE 1")), help::command_page(&shell, "set"));
        assert_eq!(h.session, before);
    }

    #[test]
    fn texteditor_scenario() {
        let shell = main_shell();
        let mut h = Harness::new();
        assert_eq!(text(h.run(&shell, "set texteditor nano -w")), "TEXTEDITOR ==> nano -w");
        assert_eq!(h.session.settings.value(TEXTEDITOR), "nano -w");
    }

    #[test]
    fn invalid_value_is_reverted_silently() {
        let shell = main_shell();
        let mut h = Harness::new();
        let before = h.session.clone();
        assert_eq!(h.run(&shell, "set REQ_TIMEOUT never").unwrap(), CommandOutput::None);
        assert_eq!(h.session, before);
    }

    #[test]
    fn rejecting_validator_keeps_everything() {
        let shell = main_shell();
        let mut h = Harness::new();
        let before = h.session.clone();
        let deny = |_: &Settings| false;
        let out = h.with_validator(&deny, |ctx| shell.execute("set SAVEPATH /tmp/x", ctx));
        assert_eq!(out.unwrap(), CommandOutput::None);
        assert_eq!(h.session, before);
    }

    #[test]
    fn rejected_new_name_is_removed_again() {
        let shell = main_shell();
        let mut h = Harness::new();
        let before = h.session.clone();
        let deny = |_: &Settings| false;
        let out = h.with_validator(&deny, |ctx| set_var("FRESH", "1", &shell, ctx));
        assert_eq!(out.unwrap(), CommandOutput::None);
        assert!(!h.session.settings.contains("FRESH"));
        assert_eq!(h.session, before);
    }

    #[test]
    fn setting_twice_is_idempotent() {
        let shell = main_shell();
        let mut h = Harness::new();
        h.run(&shell, "set SAVEPATH /srv/loot").unwrap();
        let once = h.session.clone();
        h.run(&shell, "set SAVEPATH /srv/loot").unwrap();
        assert_eq!(h.session, once);
        assert_eq!(h.session.settings.value(SAVEPATH), "/srv/loot");
    }

    #[test]
    fn locked_setting_is_refused() {
        let shell = main_shell();
        let mut h = Harness::new();
        h.session.lock_setting(PASSKEY);
        let before = h.session.clone();
        match h.run(&shell, "set passkey other") {
            Err(SploitError::LockedSetting(name)) => assert_eq!(name, "PASSKEY"),
            other => panic!("expected locked setting, got {other:?}"),
        }
        assert_eq!(h.session, before);
    }

    #[test]
    fn accepted_change_rebuilds_link() {
        let shell = main_shell();
        let mut h = Harness::new();
        let old_hash = h.session.link.hash.clone();
        h.run(&shell, "set PASSKEY other_key").unwrap();
        assert_ne!(h.session.link.hash, old_hash);
        assert!(h.session.link.backdoor.contains("HTTP_OTHER_KEY"));
    }

    #[test]
    fn target_in_main_shell_skips_check() {
        let shell = main_shell();
        let mut h = Harness::new();
        let out = text(h.run(&shell, "set TARGET http://victim.test/"));
        assert_eq!(out, "TARGET ==> http://victim.test/");
        assert_eq!(h.checker.calls.get(), 0);
        assert_eq!(h.session.link.host.as_deref(), Some("victim.test"));
    }

    #[test]
    fn remote_retarget_success() {
        let shell = Shell::new(ShellKind::Remote, None);
        let mut h = Harness::new();
        assert_eq!(h.run(&shell, "set TARGET http://victim.test/a.php").unwrap(), CommandOutput::None);
        assert_eq!(h.checker.calls.get(), 1);
        assert!(h.session.link_confirmed());
        assert_eq!(shell.prompt(), "sploit(victim.test) > ");
    }

    #[test]
    fn remote_retarget_failure_is_bit_identical_rollback() {
        let shell = Shell::new(ShellKind::Remote, None);
        let mut h = Harness::new();
        h.run(&shell, "set TARGET http://first.test/").unwrap();
        let before = h.session.clone();
        h.checker.reachable.set(false);

        match h.run(&shell, "set TARGET http://second.test/") {
            Err(SploitError::Connectivity(msg)) => assert!(msg.contains("second.test")),
            other => panic!("expected connectivity error, got {other:?}"),
        }
        assert_eq!(h.session, before);
    }

    #[test]
    fn remote_other_settings_do_not_retarget() {
        let shell = Shell::new(ShellKind::Remote, None);
        let mut h = Harness::new();
        assert_eq!(text(h.run(&shell, "set REQ_TIMEOUT 3")), "REQ_TIMEOUT ==> 3");
        assert_eq!(h.checker.calls.get(), 0);
        assert_eq!(h.session.link.timeout_secs, 3);
        assert_eq!(h.session.settings.value(REQ_TIMEOUT), "3");
    }

    #[test]
    fn completion_appends_space() {
        let h = Harness::new();
        assert_eq!(SetCmd.complete("pass", &h.session), vec!["PASSKEY "]);
        assert!(SetCmd.complete("nothing", &h.session).is_empty());
    }

    #[test]
    fn columnize_widens_for_long_names() {
        let out = columnize("T", &[("A_VERY_LONG_NAME", "1"), ("B", "2")]);
        assert!(out.contains("    A_VERY_LONG_NAME    1\n"));
        assert!(out.contains(&format!("    B{}2\n", " ".repeat(15 + 4))));
    }

    proptest! {
        #[test]
        fn value_words_are_joined_and_trimmed(words in prop::collection::vec("[a-z0-9./-]{1,8}", 1..6)) {
            let shell = main_shell();
            let mut h = Harness::new();
            let line = format!("set SAVEPATH   {}  ", words.join("   "));
            h.run(&shell, &line).unwrap();
            prop_assert_eq!(h.session.settings.value(SAVEPATH), words.join(" "));
            prop_assert!(SettingRules.check(&h.session.settings).is_ok());
        }
    }
}
