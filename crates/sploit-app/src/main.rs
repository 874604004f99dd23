//! sploit: interactive shell driving a PHP backdoor over HTTP.
//!
//! Usage: `sploit [--resume SESSION_FILE] [CONFIG_FILE]`. Commands are
//! read one line at a time, with line editing and Tab completion when stdin
//! is a terminal; `rtfm` prints the manual.

mod editor;
mod output;
mod repl;

use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context as _, Result, bail};

use repl::Repl;
use sploit_net::HttpChecker;
use sploit_shell::{PluginCatalog, PluginRegistry, Services};
use sploit_types::config::ShellConfig;
use sploit_types::link::StdLinkBuilder;
use sploit_types::persist::SessionFile;
use sploit_types::settings::SettingRules;

/// Command-line arguments.
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<PathBuf>,
    /// Session file written by `save` to start from.
    resume: Option<PathBuf>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = OsString>) -> Result<Self> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "--resume" || arg == "-r" {
                let path = args.next().context("--resume needs a session file")?;
                parsed.resume = Some(PathBuf::from(path));
            } else if parsed.config.is_none() {
                parsed.config = Some(PathBuf::from(arg));
            } else {
                bail!("unexpected argument {}", arg.to_string_lossy());
            }
        }
        Ok(parsed)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse(std::env::args_os().skip(1))?;
    let config = ShellConfig::discover(args.config).context("loading configuration")?;

    let plugins: Option<Rc<dyn PluginRegistry>> = match &config.plugins {
        Some(path) => Some(Rc::new(
            PluginCatalog::load(path).context("loading plugin manifest")?,
        )),
        None => None,
    };

    let session = match &args.resume {
        Some(path) => {
            let session = SessionFile::load(path)
                .with_context(|| format!("resuming {}", path.display()))?;
            SettingRules
                .check(&session.settings)
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("resuming {}", path.display()))?;
            session
        },
        None => config
            .into_session(&SettingRules, &StdLinkBuilder)
            .context("building session")?,
    };
    log::info!(
        "session ready (target {}, link {})",
        session.link.url.as_deref().unwrap_or("unset"),
        session.link.short_hash()
    );

    let checker = HttpChecker::new();
    let services = Services {
        validator: &SettingRules,
        links: &StdLinkBuilder,
        checker: &checker,
        persistence: &SessionFile,
    };

    let mut repl = Repl::new(session, services, plugins);
    let stdin = io::stdin();
    if stdin.is_terminal() {
        repl.run_terminal(&mut io::stdout())?;
    } else {
        repl.run(stdin.lock(), &mut io::stdout())?;
    }
    log::info!("bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(OsString::from))
    }

    #[test]
    fn config_and_resume() {
        let args = parse(&["--resume", "/tmp/s.session", "sploit.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("sploit.toml")));
        assert_eq!(args.resume, Some(PathBuf::from("/tmp/s.session")));
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }

    #[test]
    fn resume_needs_a_path() {
        assert!(parse(&["-r"]).is_err());
        assert!(parse(&["a.toml", "b.toml"]).is_err());
    }
}
