//! Doubles shared by the shell's unit tests.

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use sploit_types::error::{Result, SploitError};
use sploit_types::link::{LinkDescriptor, StdLinkBuilder};
use sploit_types::services::{ReachabilityChecker, SessionPersistence, Validator};
use sploit_types::session::Session;
use sploit_types::settings::{SettingRules, Settings};

use crate::interpreter::{Command, CommandOutput, Context, Services, Shell};

/// Checker answering with a fixed outcome and counting its calls.
pub struct FakeChecker {
    pub reachable: Cell<bool>,
    pub calls: Cell<usize>,
}

impl ReachabilityChecker for FakeChecker {
    fn check(&self, link: &LinkDescriptor) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.reachable.get() {
            Ok(())
        } else {
            Err(SploitError::Connectivity(format!(
                "{}: unreachable",
                link.url.as_deref().unwrap_or("-")
            )))
        }
    }
}

/// Persistence that records hints instead of touching the disk.
#[derive(Default)]
pub struct MemoryStore {
    pub saved: RefCell<Vec<String>>,
}

impl SessionPersistence for MemoryStore {
    fn save(&self, _session: &Session, hint: &str) -> Result<PathBuf> {
        self.saved.borrow_mut().push(hint.to_string());
        Ok(PathBuf::from("/saved").join(if hint.is_empty() { "sploit.session" } else { hint }))
    }
}

/// A session plus the collaborators a command sees.
pub struct Harness {
    pub session: Session,
    pub checker: FakeChecker,
    pub store: MemoryStore,
}

impl Harness {
    pub fn new() -> Self {
        colored::control::set_override(false);
        Self {
            session: Session::new(Settings::defaults(), &StdLinkBuilder),
            checker: FakeChecker {
                reachable: Cell::new(true),
                calls: Cell::new(0),
            },
            store: MemoryStore::default(),
        }
    }

    /// Run `f` with a context using the stock validator.
    pub fn with_ctx<T>(&mut self, f: impl FnOnce(&mut Context<'_>) -> T) -> T {
        self.with_validator(&SettingRules, f)
    }

    pub fn with_validator<T>(
        &mut self,
        validator: &dyn Validator,
        f: impl FnOnce(&mut Context<'_>) -> T,
    ) -> T {
        let services = Services {
            validator,
            links: &StdLinkBuilder,
            checker: &self.checker,
            persistence: &self.store,
        };
        let mut ctx = Context {
            session: &mut self.session,
            services,
        };
        f(&mut ctx)
    }

    pub fn run(&mut self, shell: &Shell, input: &str) -> Result<CommandOutput> {
        self.with_ctx(|ctx| shell.execute(input, ctx))
    }
}

/// Text of a successful output.
pub fn text(result: Result<CommandOutput>) -> String {
    match result {
        Ok(CommandOutput::Text(text)) => text,
        other => panic!("expected text output, got {other:?}"),
    }
}

/// Command that records every invocation and echoes its argv.
pub struct Recorder {
    name: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn log(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.log)
    }
}

impl Command for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(
        &self,
        argv: &[&str],
        _shell: &Shell,
        _ctx: &mut Context<'_>,
    ) -> Result<CommandOutput> {
        let line = argv.join(" ");
        self.log.borrow_mut().push(line.clone());
        Ok(CommandOutput::Text(line))
    }
}
