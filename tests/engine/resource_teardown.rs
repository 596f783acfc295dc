//! Resource Teardown Tests
//!
//! Resources registered with `auto_close` are released after the test that
//! owns them, last registered first, whether or not the test passed.

use crate::common::*;

fn two_resources(journal: &Journal, body_fails: bool) -> RootContext {
    let j = journal.clone();
    RootContext::new("root", move |dsl| {
        dsl.auto_close("A", j.closer());
        dsl.auto_close("B", j.closer());
        let body = j.clone();
        dsl.test("uses A and B", move |_| {
            body.record("body");
            if body_fails {
                anyhow::bail!("assertion failed");
            }
            Ok(())
        })
    })
}

#[test]
fn resources_close_in_reverse_order() {
    for policy in [StartPolicy::Eager, StartPolicy::Lazy] {
        let journal = Journal::new();
        let result = discover(two_resources(&journal, false), policy);

        assert!(result.wait_all()[0].is_success());
        assert_eq!(journal.entries(), vec!["body", "close B", "close A"]);
    }
}

#[test]
fn resources_close_in_reverse_order_after_failure() {
    let journal = Journal::new();
    let result = discover(two_resources(&journal, true), StartPolicy::Lazy);

    let outcome = result.wait_all().remove(0);
    assert_eq!(outcome.result.failure().map(|f| f.origin()), Some(FailureOrigin::TestBody));
    assert_eq!(journal.entries(), vec!["body", "close B", "close A"]);
}

#[test]
fn isolated_tests_get_their_own_resources() {
    let journal = Journal::new();
    let j = journal.clone();
    let root = RootContext::new("root", move |dsl| {
        dsl.auto_close("db", j.closer());
        for name in ["first", "second", "third"] {
            let body = j.clone();
            dsl.test(name, move |_| {
                body.record(name);
                Ok(())
            })?;
        }
        Ok(())
    });

    let result = discover(root, StartPolicy::Lazy);
    for handle in &result.tests {
        let before = journal.count("close db");
        assert!(handle.wait().is_success());
        assert_eq!(journal.count("close db"), before + 1);
    }
    assert_eq!(journal.count("close db"), 3);
}

#[test]
fn test_scope_resources_close_before_builder_resources() {
    let journal = Journal::new();
    let j = journal.clone();
    let root = RootContext::new("root", move |dsl| {
        dsl.auto_close("outer", j.closer());
        let scope_journal = j.clone();
        dsl.test("t", move |scope| {
            scope.auto_close("inner", scope_journal.closer());
            let deferred = scope_journal.clone();
            scope.defer(move || {
                deferred.record("deferred");
                Ok(())
            });
            Ok(())
        })
    });

    let result = discover(root, StartPolicy::Lazy);
    assert!(result.wait_all()[0].is_success());
    assert_eq!(journal.entries(), vec!["deferred", "close inner", "close outer"]);
}

#[test]
fn teardown_failure_fails_a_passing_test() {
    let root = RootContext::new("root", |dsl| {
        dsl.auto_close("socket", |_| Err(anyhow::anyhow!("socket already closed")));
        dsl.test("passes", |_| Ok(()))
    });

    let result = discover(root, StartPolicy::Lazy);
    let outcome = result.wait_all().remove(0);
    let failure = outcome.result.failure().unwrap();
    assert_eq!(failure.origin(), FailureOrigin::Teardown);
    assert!(failure.message().contains("socket already closed"));
}

#[test]
fn body_failure_stays_primary_over_teardown() {
    let root = RootContext::new("root", |dsl| {
        dsl.defer(|| Err(anyhow::anyhow!("cleanup failed")));
        dsl.test("fails", |_| Err(anyhow::anyhow!("wrong answer")))
    });

    let result = discover(root, StartPolicy::Lazy);
    let outcome = result.wait_all().remove(0);
    let failure = outcome.result.failure().unwrap();
    assert_eq!(failure.origin(), FailureOrigin::TestBody);
    assert_eq!(failure.message(), "wrong answer");
    assert_eq!(failure.teardown().len(), 1);
    assert!(failure.pretty().contains("cleanup failed"));
}

#[test]
fn panicking_close_is_reported_and_sweep_continues() {
    let journal = Journal::new();
    let j = journal.clone();
    let root = RootContext::new("root", move |dsl| {
        dsl.auto_close("first", j.closer());
        dsl.defer(|| panic!("close exploded"));
        dsl.test("t", |_| Ok(()))
    });

    let result = discover(root, StartPolicy::Lazy);
    let outcome = result.wait_all().remove(0);
    assert_eq!(outcome.result.failure().map(|f| f.origin()), Some(FailureOrigin::Teardown));
    assert_eq!(journal.entries(), vec!["close first"]);
}

#[test]
fn resources_without_a_test_are_released_after_the_pass() {
    let journal = Journal::new();
    let j = journal.clone();
    let root = RootContext::new("root", move |dsl| {
        dsl.auto_close("unused", j.closer());
        dsl.pending("not yet")
    });

    let result = discover(root, StartPolicy::Lazy);
    assert_eq!(journal.entries(), vec!["close unused"]);
    assert!(result.wait_all()[0].is_pending());
}

#[test]
fn cancelled_direct_test_releases_its_resources() {
    let journal = Journal::new();
    let j = journal.clone();
    let root = RootContext::new("root", move |dsl| {
        dsl.auto_close("conn", j.closer());
        let body = j.clone();
        dsl.test("t", move |_| {
            body.record("body");
            Ok(())
        })
    });

    let result = discover(root, StartPolicy::Lazy);
    assert!(journal.entries().is_empty());
    assert_eq!(result.cancel_pending(), 1);
    assert_eq!(journal.entries(), vec!["close conn"]);
    assert_eq!(
        result.wait_all()[0].result.failure().map(|f| f.origin()),
        Some(FailureOrigin::Cancelled)
    );
}
