//! Command interpreter: registry tiers, dispatch and tokenizing.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use sploit_types::error::{Result, SploitError};
use sploit_types::services::{
    LinkBuilder, ReachabilityChecker, SessionPersistence, Validator,
};
use sploit_types::session::Session;

use crate::help::{self, Help};
use crate::plugins::PluginRegistry;

/// Deepest allowed `eval` nesting.
pub const MAX_EVAL_DEPTH: usize = 16;

/// Output produced by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Text to display.
    Text(String),
    /// No output.
    None,
    /// Signal to clear the terminal.
    Clear,
    /// Leave the current shell level.
    Exit,
    /// Push a remote shell on top of the current one.
    EnterRemote,
    /// Outputs of a multi-unit input, in execution order.
    Batch(Vec<CommandOutput>),
}

impl CommandOutput {
    /// Whether this output ends or changes the current shell level.
    pub fn is_level_change(&self) -> bool {
        matches!(self, Self::Exit | Self::EnterRemote)
    }
}

/// Shell variant a registry is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    /// The local shell the program starts in.
    Main,
    /// Shell opened once a link to the target is confirmed.
    Remote,
}

impl ShellKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Remote => "remote",
        }
    }
}

/// Registry tier selector for [`Shell::get_commands`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Handlers every shell carries.
    Core,
    /// Handlers of the current shell, core included.
    Shell,
}

/// Collaborators reachable from a command.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub validator: &'a dyn Validator,
    pub links: &'a dyn LinkBuilder,
    pub checker: &'a dyn ReachabilityChecker,
    pub persistence: &'a dyn SessionPersistence,
}

/// Per-invocation context handed to every command.
pub struct Context<'a> {
    pub session: &'a mut Session,
    pub services: Services<'a>,
}

/// A single executable command.
pub trait Command {
    /// Name used to invoke this command.
    fn name(&self) -> &str;

    /// Help record shown by `help`. Undocumented commands are still listed.
    fn help(&self) -> Option<Help> {
        None
    }

    /// Candidates for the argument being typed.
    fn complete(&self, _text: &str, _session: &Session) -> Vec<String> {
        Vec::new()
    }

    /// Run with `argv` (`argv[0]` is the command name).
    fn execute(
        &self,
        argv: &[&str],
        shell: &Shell,
        ctx: &mut Context<'_>,
    ) -> Result<CommandOutput>;
}

/// Command registry for one shell level, with dispatch.
pub struct Shell {
    kind: ShellKind,
    core: BTreeMap<String, Box<dyn Command>>,
    /// Variant-specific handlers; a name here shadows the core one.
    commands: BTreeMap<String, Box<dyn Command>>,
    plugins: Option<Rc<dyn PluginRegistry>>,
    prompt: RefCell<String>,
    depth: Cell<usize>,
}

impl Shell {
    /// Build a shell of `kind` with the core and variant commands registered.
    pub fn new(kind: ShellKind, plugins: Option<Rc<dyn PluginRegistry>>) -> Self {
        let mut shell = Self::bare(kind, plugins);
        crate::core_commands::register_core_commands(&mut shell);
        crate::shell_commands::register_shell_commands(&mut shell);
        shell
    }

    /// Build a shell with empty tables.
    pub fn bare(kind: ShellKind, plugins: Option<Rc<dyn PluginRegistry>>) -> Self {
        Self {
            kind,
            core: BTreeMap::new(),
            commands: BTreeMap::new(),
            plugins,
            prompt: RefCell::new(default_prompt(kind, None)),
            depth: Cell::new(0),
        }
    }

    pub fn kind(&self) -> ShellKind {
        self.kind
    }

    pub fn plugins(&self) -> Option<&dyn PluginRegistry> {
        self.plugins.as_deref()
    }

    /// Register a command present in every shell.
    pub fn register_core(&mut self, cmd: Box<dyn Command>) {
        self.core.insert(cmd.name().to_string(), cmd);
    }

    /// Register a command specific to this shell.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    /// Sorted, deduplicated command names for `scope`.
    ///
    /// `None` adds the plugin names; an unavailable plugin registry adds none.
    pub fn get_commands(&self, scope: Option<Scope>) -> Vec<String> {
        let mut names: BTreeSet<String> = self.core.keys().cloned().collect();
        if scope == Some(Scope::Core) {
            return names.into_iter().collect();
        }
        names.extend(self.commands.keys().cloned());
        if scope.is_none()
            && let Some(found) = self.plugins().and_then(|p| p.commands())
        {
            names.extend(found);
        }
        names.into_iter().collect()
    }

    /// The handler `name` resolves to in this shell (shell table, then core).
    pub fn handler(&self, name: &str) -> Option<&dyn Command> {
        self.commands
            .get(name)
            .or_else(|| self.core.get(name))
            .map(|c| c.as_ref())
    }

    /// The core handler for `name`, ignoring any shadowing.
    pub fn core_handler(&self, name: &str) -> Option<&dyn Command> {
        self.core.get(name).map(|c| c.as_ref())
    }

    fn is_plugin(&self, name: &str) -> bool {
        self.plugins()
            .and_then(|p| p.commands())
            .is_some_and(|names| names.iter().any(|n| n == name))
    }

    /// Execute raw input: lines, then `;`-separated units.
    ///
    /// A single unit propagates its error. In a batch each unit's error is
    /// rendered inline and the rest still runs, up to the first level change.
    pub fn execute(&self, input: &str, ctx: &mut Context<'_>) -> Result<CommandOutput> {
        let units = split_units(input);
        if units.len() == 1 {
            let argv = tokenize(&units[0])?;
            let refs: Vec<&str> = argv.iter().map(String::as_str).collect();
            return self.dispatch(&refs, ctx);
        }

        let mut outputs = Vec::new();
        for unit in &units {
            let result = tokenize(unit).and_then(|argv| {
                let refs: Vec<&str> = argv.iter().map(String::as_str).collect();
                self.dispatch(&refs, ctx)
            });
            let output = match result {
                Ok(output) => output,
                Err(e) => CommandOutput::Text(format!("[-] {e}")),
            };
            let stop = stops_batch(&output);
            match output {
                CommandOutput::None => {},
                CommandOutput::Batch(inner) => outputs.extend(inner),
                other => outputs.push(other),
            }
            if stop {
                break;
            }
        }

        Ok(match outputs.len() {
            0 => CommandOutput::None,
            1 => outputs.remove(0),
            _ => CommandOutput::Batch(outputs),
        })
    }

    /// Execute input resubmitted by a running command, bounding the nesting.
    pub fn execute_nested(&self, input: &str, ctx: &mut Context<'_>) -> Result<CommandOutput> {
        let depth = self.depth.get();
        if depth >= MAX_EVAL_DEPTH {
            return Err(SploitError::Command(format!(
                "eval nested deeper than {MAX_EVAL_DEPTH} levels"
            )));
        }
        let _guard = DepthGuard::enter(&self.depth);
        self.execute(input, ctx)
    }

    /// Look up `argv[0]` and run it: shell table, core table, plugins.
    pub fn dispatch(&self, argv: &[&str], ctx: &mut Context<'_>) -> Result<CommandOutput> {
        let Some(&name) = argv.first() else {
            return Ok(CommandOutput::None);
        };
        log::debug!("{} shell: dispatch {name}", self.kind.name());

        if let Some(cmd) = self.handler(name) {
            return cmd.execute(argv, self, ctx);
        }
        if self.is_plugin(name)
            && let Some(plugins) = self.plugins()
        {
            if argv[1..].contains(&"--help") {
                return Ok(CommandOutput::Text(help::command_page(self, name)));
            }
            return plugins.invoke(argv, ctx);
        }
        Err(SploitError::UnknownCommand(name.to_string()))
    }

    /// Completion candidates for a partially typed `line`.
    ///
    /// The first word completes against command names; later words go to
    /// the command's own completer.
    pub fn complete(&self, line: &str, session: &Session) -> Vec<String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let typing_new_word = line.is_empty() || line.ends_with(char::is_whitespace);

        if words.is_empty() || (words.len() == 1 && !typing_new_word) {
            let prefix = words.first().copied().unwrap_or("");
            return self
                .get_commands(None)
                .into_iter()
                .filter(|n| n.starts_with(prefix))
                .collect();
        }

        let text = if typing_new_word {
            ""
        } else {
            words.last().copied().unwrap_or("")
        };
        self.handler(words[0])
            .map(|cmd| cmd.complete(text, session))
            .unwrap_or_default()
    }

    pub fn prompt(&self) -> String {
        self.prompt.borrow().clone()
    }

    /// Recompute the prompt from the session's link.
    pub fn refresh_prompt(&self, session: &Session) {
        *self.prompt.borrow_mut() = default_prompt(self.kind, session.link.host.as_deref());
    }
}

fn default_prompt(kind: ShellKind, host: Option<&str>) -> String {
    match (kind, host) {
        (ShellKind::Remote, Some(host)) => format!("sploit({host}) > "),
        _ => "sploit > ".to_string(),
    }
}

/// Holds one `eval` nesting level; releases it on drop, unwinding included.
struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
    saved: usize,
}

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        let saved = depth.get();
        depth.set(saved + 1);
        Self { depth, saved }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.saved);
    }
}

fn stops_batch(output: &CommandOutput) -> bool {
    match output {
        CommandOutput::Batch(inner) => inner.last().is_some_and(stops_batch),
        other => other.is_level_change(),
    }
}

// ---------------------------------------------------------------------------
// Unit splitting: newlines and `;`
// ---------------------------------------------------------------------------

/// Split input into command units on newlines and unquoted `;`.
///
/// Blank units are dropped.
pub fn split_units(input: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();
    let mut in_single = false;
    let mut in_double = false;

    let mut flush = |current: &mut String| {
        let unit = current.trim();
        if !unit.is_empty() {
            units.push(unit.to_string());
        }
        current.clear();
    };

    while let Some(ch) = chars.next() {
        if in_single {
            current.push(ch);
            if ch == '\'' {
                in_single = false;
            }
            continue;
        }
        if in_double {
            current.push(ch);
            if ch == '"' {
                in_double = false;
            } else if ch == '\\'
                && let Some(next) = chars.next()
            {
                current.push(next);
            }
            continue;
        }

        match ch {
            '\'' => {
                in_single = true;
                current.push(ch);
            },
            '"' => {
                in_double = true;
                current.push(ch);
            },
            '\\' => {
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            },
            ';' | '\n' => flush(&mut current),
            _ => current.push(ch),
        }
    }
    flush(&mut current);

    units
}

// ---------------------------------------------------------------------------
// Tokenizer: single quotes, double quotes, backslash escapes
// ---------------------------------------------------------------------------

/// Split a unit into words.
///
/// - Single quotes keep every character literally.
/// - Inside double quotes a backslash escapes only `"` and `\`.
/// - Outside quotes a backslash escapes the next character.
pub fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;
    let mut quoted = false;

    while let Some(ch) = chars.next() {
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                current.push(ch);
            }
        } else if in_double {
            match ch {
                '"' => in_double = false,
                '\\' if matches!(chars.peek(), Some('"' | '\\')) => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                },
                _ => current.push(ch),
            }
        } else {
            match ch {
                '\'' => {
                    in_single = true;
                    quoted = true;
                },
                '"' => {
                    in_double = true;
                    quoted = true;
                },
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                },
                c if c.is_whitespace() => {
                    if !current.is_empty() || quoted {
                        tokens.push(std::mem::take(&mut current));
                    }
                    quoted = false;
                },
                _ => current.push(ch),
            }
        }
    }

    if in_single {
        return Err(SploitError::Command("unterminated single quote".to_string()));
    }
    if in_double {
        return Err(SploitError::Command("unterminated double quote".to_string()));
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }

    Ok(tokens)
}
