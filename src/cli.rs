use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

mod analyze;
mod rules;
mod structure;
mod terminal;

use analyze::Analyze;
use anyhow::Context;
use clap::ArgAction;
use rules::Rules;
use stressspec::rules::{BuiltinRuleSource, FileRuleSource, RuleDocument, RuleSource, RuleStore};
use structure::Structure;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Rule document (.toml, .json, .yaml). Defaults to the built-in rules
    #[arg(long, value_name = "PATH", global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let rules = load_rules(self.rules.as_deref())?;
        self.command.run(&rules)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Analyze a requirements document and report risks
    Analyze(Analyze),

    /// Validate a rule document and summarise what it enables
    Rules(Rules),

    /// Show the structural units found in a document
    ///
    /// Useful for checking how multi-line user stories and requirement
    /// blocks are grouped before analysis.
    Structure(Structure),
}

impl Command {
    fn run(self, rules: &RuleDocument) -> anyhow::Result<()> {
        match self {
            Self::Analyze(command) => command.run(rules)?,
            Self::Rules(command) => command.run(rules),
            Self::Structure(command) => command.run(rules)?,
        }
        Ok(())
    }
}

fn load_rules(path: Option<&Path>) -> anyhow::Result<Arc<RuleDocument>> {
    fn load(source: impl RuleSource) -> anyhow::Result<Arc<RuleDocument>> {
        let origin = source.origin();
        RuleStore::new(source)
            .load()
            .with_context(|| format!("failed to load rules from {origin}"))
    }

    match path {
        Some(path) => load(FileRuleSource::new(path)),
        None => load(BuiltinRuleSource),
    }
}
