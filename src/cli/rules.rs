use clap::Parser;
use stressspec::{detectors::DetectorRegistry, rules::RuleDocument};

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Validate a rule document and summarise what it enables")]
pub struct Rules {
    /// Also list the keywords and triggers of every rule
    #[arg(long)]
    detail: bool,
}

impl Rules {
    pub fn run(self, rules: &RuleDocument) {
        println!("{}", "Rule document is valid".success());
        println!();

        println!("Detectors");
        println!("{}", "─────────".dim());
        let registry = DetectorRegistry::default();
        for name in registry.names() {
            let Some(config) = rules.detector_config(name) else {
                println!("  {name:<16} {}", "absent".dim());
                continue;
            };
            if !config.enabled {
                println!("  {name:<16} {}", "disabled".dim());
                continue;
            }
            println!(
                "  {name:<16} {} {} rules",
                format!("{:<8}", config.severity.as_str()).severity(config.severity),
                config.rules.len()
            );
            if self.detail {
                for (rule_name, rule) in &config.rules {
                    let terms: Vec<&str> = rule
                        .keywords
                        .iter()
                        .chain(&rule.patterns)
                        .chain(&rule.triggers)
                        .map(String::as_str)
                        .collect();
                    println!("    {rule_name}: {}", terms.join(", ").dim());
                }
            }
        }

        println!();
        println!("Severity weights");
        println!("{}", "────────────────".dim());
        for (severity, weight) in rules.severity_mapping() {
            println!("  {:<10} {weight}", severity.as_str());
        }

        let settings = rules.global_settings();
        println!();
        println!(
            "{}",
            format!(
                "case_sensitive={} ignore_comments={} min_requirement_length={}",
                settings.case_sensitive, settings.ignore_comments, settings.min_requirement_length
            )
            .dim()
        );
    }
}
