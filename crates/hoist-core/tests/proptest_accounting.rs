use hoist_core::pacing::FixedPacing;
use hoist_core::{Catalog, ImportReport, ItemLevel, ParentItemSpec, run_import};
use proptest::prelude::*;

use fakes::{FakeTracker, story};

/// A catalog plus the summaries the tracker will reject.
fn arb_scenario() -> impl Strategy<Value = (Catalog, Vec<String>)> {
    let child = (0_u32..13, any::<bool>());
    let parent = (any::<bool>(), prop::collection::vec(child, 0..6));

    prop::collection::vec(parent, 0..8).prop_map(|parents| {
        let mut failing = Vec::new();
        let items = parents
            .into_iter()
            .enumerate()
            .map(|(p, (parent_fails, children))| {
                let summary = format!("epic-{p}");
                if parent_fails {
                    failing.push(summary.clone());
                }
                let mut spec = ParentItemSpec::new(format!("Epic {p}"), summary);
                spec.children = children
                    .into_iter()
                    .enumerate()
                    .map(|(c, (weight, child_fails))| {
                        let summary = format!("story-{p}-{c}");
                        if child_fails {
                            failing.push(summary.clone());
                        }
                        story(&summary, weight)
                    })
                    .collect();
                spec
            })
            .collect();

        (Catalog::new(items).expect("generated catalog is valid"), failing)
    })
}

fn run(catalog: &Catalog, failing: &[String]) -> (ImportReport, FakeTracker) {
    let refs: Vec<&str> = failing.iter().map(String::as_str).collect();
    let mut tracker = FakeTracker::failing(&refs);
    let report = run_import(catalog, &mut tracker, FixedPacing::none());
    (report, tracker)
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn child_calls_match_children_of_created_parents((catalog, failing) in arb_scenario()) {
        let (report, tracker) = run(&catalog, &failing);

        let expected: usize = catalog
            .items()
            .iter()
            .filter(|parent| !failing.contains(&parent.summary))
            .map(|parent| parent.children.len())
            .sum();
        prop_assert_eq!(tracker.child_calls.len(), expected);

        for parent in catalog.items().iter().filter(|p| failing.contains(&p.summary)) {
            for child in &parent.children {
                prop_assert!(!tracker.child_calls.iter().any(|(_, s)| s == &child.summary));
            }
        }
        prop_assert_eq!(report.parents.created, tracker.parent_calls.len() - report.parents.failed);
    }

    #[test]
    fn tallies_partition_the_catalog((catalog, failing) in arb_scenario()) {
        let (report, _) = run(&catalog, &failing);

        prop_assert_eq!(
            report.children.created + report.children.failed + report.children.skipped,
            catalog.child_count()
        );
        prop_assert_eq!(report.parents.created + report.parents.failed, catalog.parent_count());
        prop_assert_eq!(report.parents.skipped, 0);
        prop_assert_eq!(report.outcomes.len(), catalog.parent_count() + catalog.child_count());
    }

    #[test]
    fn points_count_only_created_children((catalog, failing) in arb_scenario()) {
        let (report, _) = run(&catalog, &failing);

        let expected: u64 = report
            .outcomes
            .iter()
            .filter(|o| o.level == ItemLevel::Child && o.result.is_created())
            .map(|o| u64::from(o.weight))
            .sum();
        prop_assert_eq!(report.points_created, expected);
        prop_assert!(report.points_created <= catalog.planned_points());
    }

    #[test]
    fn dropping_a_created_child_subtracts_its_weight((catalog, failing) in arb_scenario()) {
        let (report, _) = run(&catalog, &failing);

        let created_children: Vec<usize> = report
            .outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| o.level == ItemLevel::Child && o.result.is_created())
            .map(|(i, _)| i)
            .collect();

        for index in created_children {
            let weight = u64::from(report.outcomes[index].weight);
            let mut outcomes = report.outcomes.clone();
            outcomes.remove(index);
            let reduced = ImportReport::from_outcomes(outcomes);
            prop_assert_eq!(reduced.points_created + weight, report.points_created);
        }
    }

    #[test]
    fn skipped_children_belong_to_failed_parents((catalog, failing) in arb_scenario()) {
        let (report, _) = run(&catalog, &failing);

        for outcome in report.skipped_items() {
            prop_assert_eq!(outcome.level, ItemLevel::Child);
            prop_assert_eq!(outcome.attempts, 0);
            let parent = &catalog.items()[outcome.parent_index];
            prop_assert!(failing.contains(&parent.summary));
        }
        for outcome in report.failed_items().filter(|o| o.level == ItemLevel::Child) {
            let parent = &catalog.items()[outcome.parent_index];
            prop_assert!(!failing.contains(&parent.summary));
        }
    }
}
