use std::path::PathBuf;

use clap::Parser;
use stressspec::{input, rules::RuleDocument, structure::StructureDetector};
use tracing::instrument;

use super::terminal::{Colorize, is_narrow, truncate};

#[derive(Debug, Parser)]
#[command(about = "Show how a document is grouped into requirement units")]
pub struct Structure {
    /// Requirements document (.txt or .md)
    file: PathBuf,

    /// Include units that would be discarded as too short or incomplete
    #[arg(long)]
    all: bool,
}

impl Structure {
    #[instrument(level = "debug", skip(self, rules), fields(file = %self.file.display()))]
    pub fn run(self, rules: &RuleDocument) -> anyhow::Result<()> {
        let lines = input::load_raw_lines(&self.file)?;
        let detector = StructureDetector::from_rules(rules);
        let detected = detector.detect(&lines);
        let total = detected.len();
        let units = if self.all {
            detected
        } else {
            detector.filter_valid(detected)
        };

        if units.is_empty() {
            println!("No requirement units found in {}", self.file.display());
            return Ok(());
        }

        let width = if is_narrow() { 40 } else { 72 };
        for (index, unit) in units.iter().enumerate() {
            let lines = match unit.line_numbers() {
                [only] => format!("line {only}"),
                [first, .., last] => format!("lines {first}-{last}"),
                [] => String::new(),
            };
            println!("{:>3}. {:<16} {}", index + 1, unit.kind().as_str(), lines.dim());
            for line in unit.lines() {
                println!("       {}", truncate(line, width));
            }
        }

        println!();
        let kept = units.len();
        if self.all || kept == total {
            println!("{}", format!("{kept} units").success());
        } else {
            println!(
                "{}",
                format!("{kept} units ({} discarded, use --all to show them)", total - kept).warning()
            );
        }
        Ok(())
    }
}
