//! Read-eval loop over a stack of shell levels.
//!
//! The main shell sits at the bottom. `exploit` pushes a remote shell and
//! `exit` pops the top one; the loop ends once the stack is empty or input
//! runs out. On a terminal lines come from [`LineEditor`], otherwise they
//! are read from any `BufRead`.

use std::io::{self, BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use sploit_shell::{Context, PluginRegistry, Services, Shell, ShellKind};
use sploit_types::session::Session;

use crate::editor::LineEditor;
use crate::output::{LevelChange, process_command_output};

pub struct Repl<'a> {
    session: Session,
    services: Services<'a>,
    plugins: Option<Rc<dyn PluginRegistry>>,
    levels: Vec<Shell>,
}

impl<'a> Repl<'a> {
    pub fn new(
        session: Session,
        services: Services<'a>,
        plugins: Option<Rc<dyn PluginRegistry>>,
    ) -> Self {
        let main = Shell::new(ShellKind::Main, plugins.as_ref().map(Rc::clone));
        main.refresh_prompt(&session);
        Self {
            session,
            services,
            plugins,
            levels: vec![main],
        }
    }

    /// Number of open shell levels.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Prompt of the innermost level, `None` once every level is closed.
    pub fn prompt(&self) -> Option<String> {
        self.levels.last().map(Shell::prompt)
    }

    /// Run one line of input. Returns `false` once no level is left.
    ///
    /// Command errors and panics are reported on `out`; the loop goes on.
    pub fn step(&mut self, line: &str, out: &mut impl Write) -> io::Result<bool> {
        let Some(shell) = self.levels.last() else {
            return Ok(false);
        };
        let mut ctx = Context {
            session: &mut self.session,
            services: self.services,
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| shell.execute(line, &mut ctx)));

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                writeln!(out, "[-] {e}")?;
                return Ok(true);
            },
            Err(_) => {
                log::error!("command panicked: {line:?}");
                writeln!(out, "[-] command aborted unexpectedly")?;
                return Ok(true);
            },
        };

        match process_command_output(output, out)? {
            LevelChange::Stay => {},
            LevelChange::Exit => {
                if let Some(closed) = self.levels.pop() {
                    log::debug!("leaving {} shell", closed.kind().name());
                }
                if let Some(parent) = self.levels.last() {
                    parent.refresh_prompt(&self.session);
                }
            },
            LevelChange::EnterRemote => {
                let remote = Shell::new(ShellKind::Remote, self.plugins.as_ref().map(Rc::clone));
                remote.refresh_prompt(&self.session);
                self.levels.push(remote);
            },
        }
        Ok(!self.levels.is_empty())
    }

    /// Completion candidates for `line` in the innermost level.
    pub fn complete(&self, line: &str) -> Vec<String> {
        self.levels
            .last()
            .map(|shell| shell.complete(line, &self.session))
            .unwrap_or_default()
    }

    /// Prompt, read and run lines until the stack empties or input ends.
    ///
    /// Bytes that are not UTF-8 are replaced, so a garbled line fails as a
    /// command instead of ending the loop.
    pub fn run(&mut self, mut input: impl BufRead, out: &mut impl Write) -> io::Result<()> {
        let mut raw = Vec::new();
        while let Some(prompt) = self.prompt() {
            write!(out, "{prompt}")?;
            out.flush()?;
            raw.clear();
            if input.read_until(b'\n', &mut raw)? == 0 {
                writeln!(out)?;
                break;
            }
            let line = String::from_utf8_lossy(&raw);
            if !self.step(line.trim_end_matches(['\n', '\r']), out)? {
                break;
            }
        }
        Ok(())
    }

    /// Same loop on an interactive terminal, with line editing and Tab
    /// completion against the innermost level.
    pub fn run_terminal(&mut self, out: &mut impl Write) -> io::Result<()> {
        let mut editor = LineEditor::new();
        while let Some(prompt) = self.prompt() {
            let line = editor.read_line(&prompt, out, &|head: &str| self.complete(head))?;
            let Some(line) = line else {
                break;
            };
            if !self.step(&line, out)? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::Cursor;
    use std::path::PathBuf;

    use sploit_types::error::{Result, SploitError};
    use sploit_types::link::{LinkDescriptor, StdLinkBuilder};
    use sploit_types::services::{ReachabilityChecker, SessionPersistence};
    use sploit_types::settings::{SettingRules, Settings, TEXTEDITOR};

    use super::*;

    struct Toggle(Cell<bool>);

    impl ReachabilityChecker for Toggle {
        fn check(&self, _link: &LinkDescriptor) -> Result<()> {
            if self.0.get() {
                Ok(())
            } else {
                Err(SploitError::Connectivity("no answer".into()))
            }
        }
    }

    struct NoSave;

    impl SessionPersistence for NoSave {
        fn save(&self, _session: &Session, _hint: &str) -> Result<PathBuf> {
            Err(SploitError::Session("read-only".into()))
        }
    }

    fn session() -> Session {
        Session::new(Settings::defaults(), &StdLinkBuilder)
    }

    fn services<'a>(checker: &'a Toggle) -> Services<'a> {
        Services {
            validator: &SettingRules,
            links: &StdLinkBuilder,
            checker,
            persistence: &NoSave,
        }
    }

    fn step(repl: &mut Repl<'_>, line: &str) -> (String, bool) {
        let mut out = Vec::new();
        let alive = repl.step(line, &mut out).unwrap();
        (String::from_utf8_lossy(&out).into_owned(), alive)
    }

    #[test]
    fn exit_from_main_ends() {
        let checker = Toggle(Cell::new(true));
        let mut repl = Repl::new(session(), services(&checker), None);
        assert_eq!(repl.prompt().as_deref(), Some("sploit > "));
        assert!(!step(&mut repl, "exit").1);
        assert_eq!(repl.prompt(), None);
    }

    #[test]
    fn exploit_pushes_remote_and_exit_pops() {
        let checker = Toggle(Cell::new(true));
        let mut repl = Repl::new(session(), services(&checker), None);
        step(&mut repl, "set TARGET http://victim.test/x.php");
        assert!(step(&mut repl, "exploit").1);
        assert_eq!(repl.depth(), 2);
        assert_eq!(repl.prompt().as_deref(), Some("sploit(victim.test) > "));

        assert!(step(&mut repl, "exit").1);
        assert_eq!(repl.depth(), 1);
        assert_eq!(repl.prompt().as_deref(), Some("sploit > "));
    }

    #[test]
    fn errors_are_reported_and_loop_continues() {
        let checker = Toggle(Cell::new(false));
        let mut repl = Repl::new(session(), services(&checker), None);
        assert_eq!(step(&mut repl, "bogus"), ("[-] unknown command: bogus\n".into(), true));

        step(&mut repl, "set TARGET http://victim.test/x.php");
        let (out, alive) = step(&mut repl, "exploit");
        assert!(alive);
        assert_eq!(out, "[-] connectivity error: no answer\n");
        assert_eq!(repl.depth(), 1);
        assert!(repl.session.link_hash.is_none());

        let (out, _) = step(&mut repl, "save");
        assert_eq!(out, "[-] session error: read-only\n");
    }

    #[test]
    fn run_until_input_ends() {
        let checker = Toggle(Cell::new(true));
        let mut repl = Repl::new(session(), services(&checker), None);
        let input = Cursor::new("set TARGET http://victim.test/\nexploit\nenv\n");
        let mut out = Vec::new();
        repl.run(input, &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("sploit(victim.test) > "));
        assert!(out.contains("HOST"));
        assert_eq!(repl.depth(), 2);
    }

    #[test]
    fn run_stops_when_last_level_exits() {
        let checker = Toggle(Cell::new(true));
        let mut repl = Repl::new(session(), services(&checker), None);
        let input = Cursor::new("exit\nhelp\n");
        let mut out = Vec::new();
        repl.run(input, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "sploit > ");
    }

    #[test]
    fn invalid_utf8_line_does_not_end_the_loop() {
        let checker = Toggle(Cell::new(true));
        let mut repl = Repl::new(session(), services(&checker), None);
        let mut input = vec![0xff, b'\n'];
        input.extend_from_slice(b"set TEXTEDITOR nano\r\n");
        let mut out = Vec::new();
        repl.run(Cursor::new(input), &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("[-] unknown command: \u{fffd}"));
        assert_eq!(repl.session.settings.value(TEXTEDITOR), "nano");
        assert_eq!(repl.depth(), 1);
    }

    #[test]
    fn completion_follows_innermost_level() {
        let checker = Toggle(Cell::new(true));
        let mut repl = Repl::new(session(), services(&checker), None);
        assert_eq!(repl.complete("expl"), vec!["exploit"]);
        step(&mut repl, "set TARGET http://victim.test/x.php");
        step(&mut repl, "exploit");
        assert!(repl.complete("expl").is_empty());
        assert_eq!(repl.complete("env ho"), vec!["HOST "]);
    }
}
