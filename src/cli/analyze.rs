use std::{collections::BTreeMap, path::PathBuf, process};

use anyhow::Context;
use clap::Parser;
use stressspec::{
    AnalysisResult, Analyzer, Requirement, Risk, RiskCategory, RiskFactory, ScoreRecord, Scorer,
    SeverityLevel,
    detectors::{ConflictDetector, DetectorRegistry},
    filters::{CategoryFilter, DuplicateRiskFilter, FilterChain, SeverityThreshold},
    input::{self, RequirementParser},
    rules::RuleDocument,
    structure::StructureDetector,
};
use tracing::instrument;

use super::terminal::{Colorize, is_narrow, truncate};

#[derive(Debug, Parser)]
#[command(about = "Analyze a requirements document and report risks")]
pub struct Analyze {
    /// Requirements document (.txt or .md)
    file: PathBuf,

    /// How the document is split into requirements
    #[arg(long, value_name = "MODE", default_value = "structured")]
    mode: Mode,

    /// Only report the N riskiest requirements
    #[arg(long, value_name = "N")]
    top: Option<usize>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Skip the pairwise duplicate scan
    #[arg(long)]
    no_duplicates: bool,

    /// Analyze requirements in parallel
    #[arg(long)]
    parallel: bool,

    /// Only report risks at or above this severity
    #[arg(long, value_name = "SEVERITY")]
    min_severity: Option<SeverityLevel>,

    /// Only report risks of these categories (repeatable or comma separated)
    #[arg(long, value_name = "CATEGORY", value_delimiter = ',')]
    category: Vec<RiskCategory>,

    /// Never report risks of these categories (repeatable or comma separated)
    #[arg(long, value_name = "CATEGORY", value_delimiter = ',')]
    exclude_category: Vec<RiskCategory>,

    /// Exit with code 2 if any reported risk reaches this severity
    #[arg(long, value_name = "SEVERITY")]
    fail_on: Option<SeverityLevel>,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum Mode {
    /// Group user stories and requirement blocks spanning several lines
    #[default]
    Structured,
    /// Treat every non-empty line as one requirement
    Lines,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Summary,
}

impl Analyze {
    #[instrument(level = "debug", skip(self, rules), fields(file = %self.file.display()))]
    pub fn run(self, rules: &RuleDocument) -> anyhow::Result<()> {
        let requirements = self.load_requirements(rules)?;

        let analyzer = Analyzer::from_rules(rules, &DetectorRegistry::default())?;
        let mut risks = RiskFactory::default();
        let mut result = if self.parallel {
            analyzer.analyze_parallel(&requirements, &mut risks)
        } else {
            analyzer.analyze(&requirements, &mut risks)
        };

        if !self.no_duplicates && rules.is_enabled(RiskCategory::Conflict.as_str()) {
            let duplicates = ConflictDetector::new(rules)?;
            analyzer.run_set_detector(&duplicates, &requirements, &mut risks, &mut result);
        }

        let removed = result.apply_filter(&self.filters());
        tracing::debug!(removed, remaining = result.total_risks(), "filtered risks");

        let scorer = Scorer::from_rules(rules);
        let scores = scorer.score(&requirements, &result);
        let shown: Vec<(&Requirement, ScoreRecord)> = match self.top {
            Some(n) => scorer
                .top_n(&requirements, &scores, n)
                .into_iter()
                .map(|ranked| (ranked.requirement, ranked.record))
                .collect(),
            None => requirements
                .iter()
                .map(|requirement| (requirement, scores[requirement.id()]))
                .collect(),
        };

        match self.output {
            OutputFormat::Table => self.output_table(&shown, &result),
            OutputFormat::Json => self.output_json(&shown, &result)?,
            OutputFormat::Summary => Self::output_summary(requirements.len(), &result),
        }

        if self
            .fail_on
            .is_some_and(|threshold| result.count_at_least(threshold) > 0)
        {
            process::exit(2);
        }

        Ok(())
    }

    /// Severity, then category, then duplicate risks.
    fn filters(&self) -> FilterChain {
        let mut chain = FilterChain::new();
        if let Some(min) = self.min_severity {
            chain.push(SeverityThreshold::new(min));
        }
        let categories = CategoryFilter::default()
            .include(self.category.iter().copied())
            .exclude(self.exclude_category.iter().copied());
        if !categories.is_unrestricted() {
            chain.push(categories);
        }
        chain.with(DuplicateRiskFilter)
    }

    fn load_requirements(&self, rules: &RuleDocument) -> anyhow::Result<Vec<Requirement>> {
        let requirements = match self.mode {
            Mode::Structured => {
                let lines = input::load_raw_lines(&self.file)?;
                let units = StructureDetector::from_rules(rules).parse(&lines);
                input::requirements_from_units(&units)
            }
            Mode::Lines => {
                let lines = input::load_lines(&self.file, rules.global_settings().ignore_comments)?;
                RequirementParser::new().parse(&lines)
            }
        }
        .with_context(|| format!("invalid requirement in {}", self.file.display()))?;

        if requirements.is_empty() {
            anyhow::bail!("no requirements found in {}", self.file.display());
        }
        tracing::info!(count = requirements.len(), "loaded requirements");
        Ok(requirements)
    }

    fn output_table(&self, shown: &[(&Requirement, ScoreRecord)], result: &AnalysisResult) {
        let width = if is_narrow() { 40 } else { 72 };

        for (requirement, record) in shown {
            let header = format!(
                "{} (line {})  score {} from {} risks",
                requirement.id(),
                requirement.line_number(),
                record.total_score,
                record.risk_count
            );
            if record.risk_count == 0 {
                println!("{}", header.success());
            } else {
                println!("{header}");
            }
            println!("  {}", truncate(requirement.text(), width).dim());

            for risk in result.get(requirement.id()).unwrap_or_default() {
                let label = format!("{:<10}", format!("[{}]", risk.severity()));
                println!(
                    "  {} {}  {}",
                    label.severity(risk.severity()),
                    risk.category().code(),
                    risk.description()
                );
                if let Some(suggestion) = risk.suggestion() {
                    println!("  {:<10} {}", "", format!("-> {suggestion}").dim());
                }
            }
            println!();
        }

        let total = result.total_risks();
        if total == 0 {
            println!("{}", "No risks found".success());
        } else {
            println!(
                "{}",
                format!("{total} risks across {} requirements", result.len()).warning()
            );
        }
        if let Some(top) = self.top {
            println!("{}", format!("Showing the {top} riskiest requirements").dim());
        }
    }

    fn output_json(
        &self,
        shown: &[(&Requirement, ScoreRecord)],
        result: &AnalysisResult,
    ) -> anyhow::Result<()> {
        use serde_json::json;

        let requirements: Vec<_> = shown
            .iter()
            .map(|(requirement, record)| {
                json!({
                    "id": requirement.id(),
                    "line_number": requirement.line_number(),
                    "text": requirement.text(),
                    "score": record,
                    "risks": result.get(requirement.id()).unwrap_or_default(),
                })
            })
            .collect();

        let output = json!({
            "source": self.file,
            "requirements": requirements,
            "summary": {
                "requirements": result.len(),
                "risks": result.total_risks(),
                "by_severity": count_by(result, |risk| risk.severity().as_str()),
                "by_category": count_by(result, |risk| risk.category().as_str()),
            }
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_summary(requirements: usize, result: &AnalysisResult) {
        let by_severity = count_by(result, |risk| risk.severity().as_str());
        let severities: Vec<String> = SeverityLevel::ALL
            .iter()
            .map(|severity| {
                let count = by_severity.get(severity.as_str()).copied().unwrap_or(0);
                format!("{severity}={count}")
            })
            .collect();
        println!(
            "requirements={requirements} risks={} {}",
            result.total_risks(),
            severities.join(" ")
        );
    }
}

fn count_by(
    result: &AnalysisResult,
    key: impl Fn(&Risk) -> &'static str,
) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for risk in result.risks() {
        *counts.entry(key(risk)).or_insert(0) += 1;
    }
    counts
}
