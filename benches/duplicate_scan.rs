//! This bench measures the pairwise duplicate scan over a few hundred
//! requirements, a handful of which are near-duplicates.

#![allow(missing_docs)]

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use stressspec::{
    Requirement, RiskFactory,
    detectors::{ConflictDetector, SetDetector},
    rules::{BuiltinRuleSource, RuleSource},
};

const SUBJECTS: [&str; 6] = ["user", "administrator", "auditor", "operator", "guest", "service"];
const ACTIONS: [&str; 6] = ["export", "archive", "approve", "import", "review", "delete"];

fn requirements(count: usize) -> Vec<Requirement> {
    (1..=count)
        .map(|i| {
            let subject = SUBJECTS[i % SUBJECTS.len()];
            let action = ACTIONS[(i / SUBJECTS.len()) % ACTIONS.len()];
            let text = format!(
                "The system shall allow the {subject} to {action} report batch {} within {} seconds",
                i % 50,
                i % 7 + 1
            );
            Requirement::new(format!("R{i:03}"), i, text).unwrap()
        })
        .collect()
}

fn duplicate_scan(c: &mut Criterion) {
    let rules = BuiltinRuleSource.load().unwrap();
    let detector = ConflictDetector::new(&rules).unwrap();
    let requirements = requirements(300);

    c.bench_function("duplicate scan 300", |b| {
        b.iter_batched(
            RiskFactory::default,
            |mut risks| detector.detect_across(&requirements, &mut risks).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, duplicate_scan);
criterion_main!(benches);
