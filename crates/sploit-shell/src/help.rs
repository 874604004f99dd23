//! Help engine: per-command pages and the categorized command listing.
//!
//! Documentation is resolved per name in tier order: the plugin registry's
//! help text, the current shell's handler, then the core handler.

use colored::Colorize;

use crate::interpreter::{CommandOutput, Scope, Shell, ShellKind};

/// Narrowest command-name column in the listing.
pub const MIN_NAME_WIDTH: usize = 13;

/// Help record attached to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Help {
    /// One-line summary shown in listings.
    pub summary: &'static str,
    /// Detailed page body (SYNOPSIS, DESCRIPTION, ...).
    pub body: &'static str,
}

impl Help {
    pub const fn new(summary: &'static str, body: &'static str) -> Self {
        Self { summary, body }
    }

    /// Summary followed by the body, as documentation lines.
    pub fn lines(&self) -> Vec<String> {
        doc_text_lines(&format!("{}\n{}", self.summary, self.body))
    }
}

fn doc_text_lines(text: &str) -> Vec<String> {
    text.trim().lines().map(str::to_string).collect()
}

/// Documentation lines for `name`, empty when nothing documents it.
pub fn doc_lines(shell: &Shell, name: &str) -> Vec<String> {
    if let Some(text) = shell.plugins().and_then(|p| p.help(name)) {
        return doc_text_lines(&text);
    }
    shell
        .handler(name)
        .and_then(|cmd| cmd.help())
        .or_else(|| shell.core_handler(name).and_then(|cmd| cmd.help()))
        .map(|help| help.lines())
        .unwrap_or_default()
}

/// First documentation line, or a highlighted "No description".
pub fn summary(lines: &[String]) -> String {
    match lines.first() {
        Some(line) if !line.trim().is_empty() => line.trim().to_string(),
        _ => "No description".yellow().to_string(),
    }
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Page body from documentation lines, `None` for summary-only docs.
///
/// The leading blank run is dropped, every line loses up to the first body
/// line's indentation, and unindented lines are emphasized.
pub fn format_body(lines: &[String]) -> Option<String> {
    let body: Vec<&str> = lines
        .iter()
        .skip(1)
        .map(String::as_str)
        .skip_while(|l| l.trim().is_empty())
        .collect();
    let margin = indent_of(body.first()?);

    let rendered: Vec<String> = body
        .iter()
        .map(|line| {
            let cut = indent_of(line).min(margin);
            let line = line.chars().skip(cut).collect::<String>();
            let line = line.trim_end();
            if !line.is_empty() && indent_of(line) == 0 {
                line.bold().to_string()
            } else {
                line.to_string()
            }
        })
        .collect();
    Some(rendered.join("\n"))
}

/// Line shown when `name` has no documentation.
pub fn no_help(name: &str) -> String {
    format!("*** No help on '{name}'")
}

/// Full help page of `name`.
pub fn command_page(shell: &Shell, name: &str) -> String {
    let lines = doc_lines(shell, name);
    if lines.is_empty() {
        return no_help(name);
    }
    let mut page = format!("\n[*] {name}: {}\n", summary(&lines));
    if let Some(body) = format_body(&lines) {
        page.push('\n');
        page.push_str(&body);
        page.push('\n');
    }
    page
}

/// Help page of `name` as a command result (usage errors).
pub fn usage(shell: &Shell, name: &str) -> CommandOutput {
    CommandOutput::Text(command_page(shell, name))
}

/// Section title for a plugin category: `web_server` becomes `Web server`.
pub fn plugin_category_title(category: &str) -> String {
    let spaced = category.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Listing sections of `shell`, each a title and its sorted command names.
pub fn categories(shell: &Shell) -> Vec<(String, Vec<String>)> {
    let core = shell.get_commands(Some(Scope::Core));
    let own: Vec<String> = shell
        .get_commands(Some(Scope::Shell))
        .into_iter()
        .filter(|name| !core.contains(name))
        .collect();

    let mut sections = vec![
        ("Core Commands".to_string(), core),
        ("Shell Commands".to_string(), own),
    ];
    if shell.kind() == ShellKind::Remote
        && let Some(plugins) = shell.plugins()
    {
        for category in plugins.categories() {
            let mut names = plugins.list_category(&category);
            names.sort();
            sections.push((format!("{} Plugins", plugin_category_title(&category)), names));
        }
    }
    sections
}

/// The full categorized listing shown by a bare `help`.
pub fn listing(shell: &Shell) -> String {
    let sections = categories(shell);
    let width = sections
        .iter()
        .flat_map(|(_, names)| names)
        .map(|name| name.chars().count())
        .max()
        .unwrap_or(0)
        .max(MIN_NAME_WIDTH);
    let gap = " ".repeat(width - "Command".len() + 2);

    let mut out = String::new();
    for (title, names) in sections {
        out.push_str(&format!("\n{title}\n{}\n", "=".repeat(title.chars().count())));
        out.push_str(&format!("    Command{gap}Description\n"));
        out.push_str(&format!("    -------{gap}-----------\n"));
        for name in names {
            let pad = " ".repeat(width - name.chars().count() + 2);
            let desc = summary(&doc_lines(shell, &name));
            out.push_str(&format!("    {name}{pad}{desc}\n"));
        }
    }
    out
}
