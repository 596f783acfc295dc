//! Duplicate Name Tests
//!
//! Sibling declarations share one namespace. A collision aborts discovery
//! of the root with `DuplicateName`.

use crate::common::*;

fn duplicate(result: Result<DiscoveryResult>) -> (String, String) {
    match result {
        Err(Error::DuplicateName { name, context }) => (name, context),
        other => panic!("expected a duplicate name error, got {:?}", other),
    }
}

#[test]
fn duplicate_test_names_are_fatal() {
    let root = RootContext::new("root", |dsl| {
        dsl.test("x", |_| Ok(()))?;
        dsl.test("x", |_| Ok(()))
    });

    let (name, context) = duplicate(try_discover(root, StartPolicy::Lazy));
    assert_eq!(name, "x");
    assert_eq!(context, "root");
}

#[test]
fn duplicate_context_names_are_fatal() {
    let root = RootContext::new("root", |dsl| {
        dsl.context("c", |dsl| dsl.test("a", |_| Ok(())))?;
        dsl.context("c", |dsl| dsl.test("b", |_| Ok(())))
    });

    let (name, _) = duplicate(try_discover(root, StartPolicy::Lazy));
    assert_eq!(name, "c");
}

#[test]
fn test_and_context_share_a_namespace() {
    let root = RootContext::new("root", |dsl| {
        dsl.test("shared", |_| Ok(()))?;
        dsl.context("shared", |_| Ok(()))
    });

    let (name, _) = duplicate(try_discover(root, StartPolicy::Lazy));
    assert_eq!(name, "shared");
}

#[test]
fn pending_names_collide_too() {
    let root = RootContext::new("root", |dsl| {
        dsl.pending("later")?;
        dsl.test("later", |_| Ok(()))
    });

    let (name, _) = duplicate(try_discover(root, StartPolicy::Lazy));
    assert_eq!(name, "later");
}

#[test]
fn nested_duplicates_name_their_context() {
    let root = RootContext::new("root", |dsl| {
        dsl.test("t", |_| Ok(()))?;
        dsl.context("outer", |dsl| {
            dsl.context("inner", |dsl| {
                dsl.test("same", |_| Ok(()))?;
                dsl.test("same", |_| Ok(()))
            })
        })
    });

    let (name, context) = duplicate(try_discover(root, StartPolicy::Lazy));
    assert_eq!(name, "same");
    assert_eq!(context, "root > outer > inner");
}

#[test]
fn swallowed_duplicate_still_fails() {
    let root = RootContext::new("root", |dsl| {
        dsl.test("x", |_| Ok(()))?;
        let _ignored = dsl.test("x", |_| Ok(()));
        Ok(())
    });

    let (name, _) = duplicate(try_discover(root, StartPolicy::Lazy));
    assert_eq!(name, "x");
}

#[test]
fn duplicate_cancels_scheduled_tests_and_releases_resources() {
    let journal = Journal::new();
    let j = journal.clone();
    let root = RootContext::new("root", move |dsl| {
        dsl.auto_close("fixture", j.closer());
        let body = j.clone();
        dsl.test("first", move |_| {
            body.record("first ran");
            Ok(())
        })?;
        dsl.test("dup", |_| Ok(()))?;
        dsl.test("dup", |_| Ok(()))
    });

    assert!(try_discover(root, StartPolicy::Lazy).is_err());
    assert!(!journal.contains("first ran"));
    assert_eq!(journal.count("close fixture"), 1);
}

#[test]
fn duplicate_error_is_readable() {
    let root = RootContext::new("root", |dsl| {
        dsl.test("x", |_| Ok(()))?;
        dsl.test("x", |_| Ok(()))
    });

    let error = try_discover(root, StartPolicy::Lazy).unwrap_err();
    assert_eq!(error.to_string(), "duplicate name 'x' in context 'root'");
}
