//! Property tests for discovery over generated trees.
//!
//! Trees are up to three levels deep with a random number of tests per
//! context. For every shape discovery terminates, finds every test and
//! context, runs every body once, and is repeatable.

use crate::common::*;
use proptest::prelude::*;

// ============================================================================
// Generated tree shapes
// ============================================================================

/// Tests in the root, then per context its tests and its sub-contexts' tests
#[derive(Debug, Clone)]
struct Shape {
    root_tests: usize,
    contexts: Vec<(usize, Vec<usize>)>,
}

impl Shape {
    fn total_tests(&self) -> usize {
        self.root_tests
            + self
                .contexts
                .iter()
                .map(|(tests, subs)| tests + subs.iter().sum::<usize>())
                .sum::<usize>()
    }

    fn total_contexts(&self) -> usize {
        1 + self
            .contexts
            .iter()
            .map(|(_, subs)| 1 + subs.len())
            .sum::<usize>()
    }

    fn root(&self, journal: &Journal) -> RootContext {
        let shape = self.clone();
        let j = journal.clone();
        RootContext::new("root", move |dsl| {
            declare_tests(dsl, &j, "root", shape.root_tests)?;
            for (c, (tests, subs)) in shape.contexts.iter().enumerate() {
                let j = j.clone();
                let tests = *tests;
                let subs = subs.clone();
                dsl.context(format!("c{}", c), move |dsl| {
                    declare_tests(dsl, &j, &format!("c{}", c), tests)?;
                    for (s, sub_tests) in subs.into_iter().enumerate() {
                        let j = j.clone();
                        dsl.context(format!("s{}", s), move |dsl| {
                            declare_tests(dsl, &j, &format!("c{}s{}", c, s), sub_tests)
                        })?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    }
}

fn declare_tests(
    dsl: &mut ContextDsl<'_>,
    journal: &Journal,
    prefix: &str,
    count: usize,
) -> BuildResult {
    for t in 0..count {
        let j = journal.clone();
        let label = format!("{} t{}", prefix, t);
        dsl.test(format!("t{}", t), move |_| {
            j.record(label);
            Ok(())
        })?;
    }
    Ok(())
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    (
        0usize..4,
        prop::collection::vec((0usize..4, prop::collection::vec(0usize..3, 0..3)), 0..4),
    )
        .prop_map(|(root_tests, contexts)| Shape {
            root_tests,
            contexts,
        })
}

fn arb_policy() -> impl Strategy<Value = StartPolicy> {
    prop_oneof![Just(StartPolicy::Eager), Just(StartPolicy::Lazy)]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(24))]

    /// Every declared test is discovered once and every body runs once.
    #[test]
    fn discovery_finds_every_test_once(shape in arb_shape(), policy in arb_policy()) {
        let journal = Journal::new();
        let result = discover(shape.root(&journal), policy);
        let outcomes = result.wait_all();

        prop_assert_eq!(result.tests.len(), shape.total_tests());
        prop_assert_eq!(result.contexts.len(), shape.total_contexts());
        prop_assert!(outcomes.iter().all(|o| o.is_success()));

        let mut bodies = journal.entries();
        let ran = bodies.len();
        bodies.sort();
        bodies.dedup();
        prop_assert_eq!(bodies.len(), ran);
        prop_assert_eq!(ran, shape.total_tests());
    }

    /// Discovering the same tree twice yields the same tests and contexts in
    /// the same order.
    #[test]
    fn discovery_is_repeatable(shape in arb_shape()) {
        let first = discover(shape.root(&Journal::new()), StartPolicy::Lazy);
        let second = discover(shape.root(&Journal::new()), StartPolicy::Lazy);

        let describe_tests = |result: &DiscoveryResult| -> Vec<String> {
            result.tests.iter().map(|h| h.test().to_string()).collect()
        };
        let describe_contexts = |result: &DiscoveryResult| -> Vec<String> {
            result.contexts.iter().map(|c| c.string_path()).collect()
        };

        prop_assert_eq!(describe_tests(&first), describe_tests(&second));
        prop_assert_eq!(describe_contexts(&first), describe_contexts(&second));
    }
}
