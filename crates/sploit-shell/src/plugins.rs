//! Plugin registry contract and the manifest-backed catalog.
//!
//! ```toml
//! [[plugin]]
//! name = "suidroot"
//! category = "privilege_escalation"
//! help = """
//! Find SUID binaries
//!
//! SYNOPSIS:
//!     suidroot
//! """
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use sploit_types::error::{Result, SploitError};

use crate::interpreter::{CommandOutput, Context};

/// Source of plugin commands, their categories and documentation.
pub trait PluginRegistry {
    /// Every plugin command name, or `None` while the registry is unavailable.
    fn commands(&self) -> Option<Vec<String>>;

    /// Category names, sorted.
    fn categories(&self) -> Vec<String>;

    /// Command names in `category`.
    fn list_category(&self, category: &str) -> Vec<String>;

    /// Raw help text of a plugin command.
    fn help(&self, name: &str) -> Option<String>;

    /// Run a plugin command.
    fn invoke(&self, argv: &[&str], ctx: &mut Context<'_>) -> Result<CommandOutput>;
}

fn default_category() -> String {
    "miscellaneous".to_string()
}

/// One `[[plugin]]` manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub help: Option<String>,
}

impl PluginEntry {
    pub fn new(name: &str, category: &str, help: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            help: help.map(str::to_string),
        }
    }
}

#[derive(Deserialize)]
struct Manifest {
    #[serde(default)]
    plugin: Vec<PluginEntry>,
}

/// Plugin catalog read from a TOML manifest. Lists and documents plugins;
/// running them needs an execution backend this catalog does not carry.
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    entries: Vec<PluginEntry>,
}

impl PluginCatalog {
    pub fn new(entries: Vec<PluginEntry>) -> Self {
        Self { entries }
    }

    /// Parse a manifest.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(toml_str)?;
        let mut seen = BTreeSet::new();
        for entry in &manifest.plugin {
            if !seen.insert(entry.name.as_str()) {
                return Err(SploitError::Plugin(format!(
                    "duplicate plugin '{}'",
                    entry.name
                )));
            }
        }
        Ok(Self::new(manifest.plugin))
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SploitError::Plugin(format!("{}: {e}", path.display())))?;
        let catalog = Self::from_toml_str(&text)?;
        log::info!("loaded {} plugins from {}", catalog.entries.len(), path.display());
        Ok(catalog)
    }

    pub fn entries(&self) -> &[PluginEntry] {
        &self.entries
    }

    fn entry(&self, name: &str) -> Option<&PluginEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

impl PluginRegistry for PluginCatalog {
    fn commands(&self) -> Option<Vec<String>> {
        Some(self.entries.iter().map(|e| e.name.clone()).collect())
    }

    fn categories(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.entries.iter().map(|e| e.category.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    fn list_category(&self, category: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .map(|e| e.name.clone())
            .collect()
    }

    fn help(&self, name: &str) -> Option<String> {
        self.entry(name).and_then(|e| e.help.clone())
    }

    fn invoke(&self, argv: &[&str], _ctx: &mut Context<'_>) -> Result<CommandOutput> {
        let name = argv.first().copied().unwrap_or_default();
        Err(SploitError::Plugin(format!(
            "{name}: no execution backend attached"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{Scope, Shell, ShellKind};
    use crate::test_support::Harness;
    use std::rc::Rc;

    const MANIFEST: &str = r#"
[[plugin]]
name = "suidroot"
category = "privilege_escalation"
help = "Find SUID binaries"

[[plugin]]
name = "mysql"
category = "database"

[[plugin]]
name = "whoami"
"#;

    #[test]
    fn parse_manifest() {
        let catalog = PluginCatalog::from_toml_str(MANIFEST).unwrap();
        assert_eq!(catalog.entries().len(), 3);
        assert_eq!(
            catalog.categories(),
            vec!["database", "miscellaneous", "privilege_escalation"]
        );
        assert_eq!(catalog.list_category("miscellaneous"), vec!["whoami"]);
        assert_eq!(catalog.help("suidroot").as_deref(), Some("Find SUID binaries"));
        assert_eq!(catalog.help("mysql"), None);
    }

    #[test]
    fn empty_manifest() {
        let catalog = PluginCatalog::from_toml_str("").unwrap();
        assert_eq!(catalog.commands(), Some(vec![]));
        assert!(catalog.categories().is_empty());
    }

    #[test]
    fn duplicate_names_rejected() {
        let dup = "[[plugin]]\nname = \"a\"\n[[plugin]]\nname = \"a\"\n";
        assert!(matches!(
            PluginCatalog::from_toml_str(dup),
            Err(SploitError::Plugin(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.toml");
        std::fs::write(&path, MANIFEST).unwrap();
        let catalog = PluginCatalog::load(&path).unwrap();
        assert_eq!(catalog.commands().unwrap().len(), 3);
        assert!(PluginCatalog::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn plugins_join_the_full_listing_only() {
        let catalog: Rc<dyn PluginRegistry> =
            Rc::new(PluginCatalog::from_toml_str(MANIFEST).unwrap());
        let shell = Shell::new(ShellKind::Remote, Some(catalog));
        assert!(shell.get_commands(None).contains(&"mysql".to_string()));
        assert!(!shell.get_commands(Some(Scope::Shell)).contains(&"mysql".to_string()));
    }

    struct Unavailable;

    impl PluginRegistry for Unavailable {
        fn commands(&self) -> Option<Vec<String>> {
            None
        }
        fn categories(&self) -> Vec<String> {
            Vec::new()
        }
        fn list_category(&self, _category: &str) -> Vec<String> {
            Vec::new()
        }
        fn help(&self, _name: &str) -> Option<String> {
            None
        }
        fn invoke(&self, _argv: &[&str], _ctx: &mut Context<'_>) -> Result<CommandOutput> {
            Ok(CommandOutput::None)
        }
    }

    #[test]
    fn unavailable_registry_adds_nothing() {
        let shell = Shell::new(ShellKind::Remote, Some(Rc::new(Unavailable)));
        assert_eq!(shell.get_commands(None), shell.get_commands(Some(Scope::Shell)));
    }

    #[test]
    fn invoke_reports_missing_backend() {
        let catalog: Rc<dyn PluginRegistry> =
            Rc::new(PluginCatalog::from_toml_str(MANIFEST).unwrap());
        let shell = Shell::new(ShellKind::Remote, Some(catalog));
        let mut h = Harness::new();
        match h.run(&shell, "suidroot -v") {
            Err(SploitError::Plugin(msg)) => assert!(msg.starts_with("suidroot:")),
            other => panic!("expected plugin error, got {other:?}"),
        }
    }
}
