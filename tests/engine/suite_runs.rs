//! Suite Tests
//!
//! Several roots, disabled roots, config files and result summaries.

use crate::common::*;
use std::sync::Arc;
use tempfile::TempDir;

fn passing_root(name: &'static str, tests: usize) -> RootContext {
    RootContext::new(name, move |dsl| {
        for t in 0..tests {
            dsl.test(format!("t{}", t), |_| Ok(()))?;
        }
        dsl.context("nested", |dsl| dsl.test("deep", |_| Ok(())))
    })
}

fn small_config() -> SuiteConfig {
    SuiteConfig {
        worker_threads: Some(2),
        ..SuiteConfig::default()
    }
}

#[test]
fn suite_runs_every_root() {
    init_test_logging();
    let suite = Suite::from_roots(vec![passing_root("one", 2), passing_root("two", 3)])
        .unwrap()
        .with_config(small_config())
        .unwrap()
        .with_listener(Arc::new(TracingListener));

    let result = suite.run().unwrap();
    assert_eq!(result.all_tests.len(), 7);
    assert!(result.all_ok());
    assert_eq!(result.contexts.len(), 4);
    assert_eq!(result.summary(), "7 tests: 7 passed, 0 failed, 0 pending");
}

#[test]
fn roots_can_come_from_providers() {
    struct Catalog;

    impl ContextProvider for Catalog {
        fn root_contexts(&self) -> Vec<RootContext> {
            vec![passing_root("a", 1), passing_root("b", 1)]
        }
    }

    let suite = Suite::new(vec![Catalog]).unwrap();
    assert_eq!(suite.roots().len(), 2);
    let result = suite.with_config(small_config()).unwrap().run().unwrap();
    assert_eq!(result.all_tests.len(), 4);
}

#[test]
fn empty_suites_are_rejected() {
    assert!(matches!(Suite::from_roots(Vec::new()), Err(Error::EmptySuite)));
}

#[test]
fn disabled_roots_are_not_run() {
    let journal = Journal::new();
    let j = journal.clone();
    let skipped = RootContext::new("skipped", move |dsl| {
        j.record("skipped root built");
        dsl.test("t", |_| Ok(()))
    })
    .disabled(true);

    let suite = Suite::from_roots(vec![passing_root("active", 1), skipped])
        .unwrap()
        .with_config(small_config())
        .unwrap();
    let result = suite.run().unwrap();

    assert_eq!(result.all_tests.len(), 2);
    assert!(journal.entries().is_empty());
}

#[test]
fn failures_show_up_in_the_result() {
    let root = RootContext::new("mixed", |dsl| {
        dsl.test("good", |_| Ok(()))?;
        dsl.test("bad", |_| Err(anyhow::anyhow!("expected true")))?;
        dsl.pending("someday")
    });

    let result = Suite::from_roots(vec![root])
        .unwrap()
        .with_config(small_config())
        .unwrap()
        .run()
        .unwrap();

    assert!(!result.all_ok());
    let failed = result.failed_tests();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].test.name, "bad");
    assert_eq!(result.pending_tests()[0].test.name, "someday");
    assert_eq!(result.slowest(1).len(), 1);
}

#[test]
fn after_suite_runs_after_all_tests() {
    let journal = Journal::new();
    let j = journal.clone();
    let root = RootContext::new("root", move |dsl| {
        let done = j.clone();
        dsl.after_suite(move || {
            done.record("after suite");
            Ok(())
        });
        let body = j.clone();
        dsl.test("t1", move |_| {
            body.record("t1");
            Ok(())
        })?;
        let nested = j.clone();
        dsl.context("c", move |dsl| {
            dsl.test("t2", move |_| {
                nested.record("t2");
                Ok(())
            })
        })
    });

    let result = Suite::from_roots(vec![root])
        .unwrap()
        .with_config(small_config())
        .unwrap()
        .run()
        .unwrap();

    assert!(result.all_ok());
    let entries = journal.entries();
    assert_eq!(journal.count("after suite"), 1);
    assert_eq!(entries.last().map(String::as_str), Some("after suite"));
}

#[test]
fn duplicate_in_one_root_fails_the_suite() {
    let broken = RootContext::new("broken", |dsl| {
        dsl.test("same", |_| Ok(()))?;
        dsl.test("same", |_| Ok(()))
    });
    let suite = Suite::from_roots(vec![passing_root("fine", 1), broken])
        .unwrap()
        .with_config(SuiteConfig {
            lazy: true,
            ..small_config()
        })
        .unwrap();

    assert!(matches!(suite.find_tests(), Err(Error::DuplicateName { .. })));
}

#[test]
fn shared_pool_is_reused() {
    let pool = Arc::new(WorkerPool::new(2, "shared").unwrap());
    let suite = Suite::from_roots(vec![passing_root("a", 3)])
        .unwrap()
        .with_pool(Arc::clone(&pool));

    assert!(suite.run().unwrap().all_ok());
    assert!(suite.run().unwrap().all_ok());
    assert!(!pool.is_shut_down());
}

// ============================================================================
// Config files
// ============================================================================

#[test]
fn suite_config_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "lazy = true\nworker_threads = 1\n").unwrap();

    let config = SuiteConfig::from_file(&path).unwrap();
    assert_eq!(config.start_policy(), StartPolicy::Lazy);

    let suite = Suite::from_roots(vec![passing_root("configured", 2)])
        .unwrap()
        .with_config(config)
        .unwrap();
    let discovered = suite.find_tests().unwrap();
    assert!(discovered[0].tests.iter().all(|h| !h.is_finished()));
    assert!(discovered[0].wait_all().iter().all(|o| o.is_success()));
}

#[test]
fn default_config_file_is_written_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    SuiteConfig::write_default_if_missing(&path).unwrap();
    assert_eq!(SuiteConfig::from_file(&path).unwrap(), SuiteConfig::default());

    std::fs::write(&path, "worker_threads = 0\n").unwrap();
    SuiteConfig::write_default_if_missing(&path).unwrap();
    assert!(matches!(
        SuiteConfig::from_file(&path),
        Err(Error::InvalidConfig(_))
    ));
}
