//! End-to-end ordering of the layered hook sequence.

use std::sync::Arc;

use parking_lot::Mutex;

use latchwork::{Engine, GroupHooks, GroupSpec, SuiteHooks, TestCase};

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, entry: &str) {
    log.lock().push(entry.to_string());
}

fn group_spec(name: &str, test_count: usize, hooks: GroupHooks, suite_opt_in: bool) -> GroupSpec {
    GroupSpec {
        name: name.to_string(),
        test_count,
        hooks,
        suite_opt_in,
    }
}

#[test]
fn test_full_layer_order_for_a_single_test() {
    latchwork::init_logging();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let engine = Engine::new();

    let l = log.clone();
    let suite = SuiteHooks::new()
        .before(move || record(&l, "suite:before"))
        .unwrap();
    let l = log.clone();
    let suite = suite
        .before_each(move |_cx| record(&l, "suite:before_each"))
        .unwrap();
    let l = log.clone();
    let suite = suite
        .after_each(move |_cx, _scratch| record(&l, "suite:after_each"))
        .unwrap();
    engine.register_suite(suite).unwrap();

    let l = log.clone();
    let hooks = GroupHooks::new()
        .before(move || record(&l, "group:before"))
        .unwrap();
    let l = log.clone();
    let hooks = hooks
        .before_each(move |_cx| record(&l, "group:before_each"))
        .unwrap();
    let l = log.clone();
    let hooks = hooks
        .after_each(move |_cx, _scratch| record(&l, "group:after_each"))
        .unwrap();
    let l = log.clone();
    let hooks = hooks.after(move |_cx| record(&l, "group:after")).unwrap();
    let id = engine
        .register_group(group_spec("ordered", 1, hooks, true))
        .unwrap();

    let l = log.clone();
    let report = engine
        .run_test(id, TestCase::new("solo", move |_cx| record(&l, "body")))
        .unwrap();

    assert!(report.outcome.is_passed());
    assert_eq!(
        *log.lock(),
        [
            "suite:before",
            "group:before",
            "suite:before_each",
            "group:before_each",
            "body",
            "group:after_each",
            "suite:after_each",
            "group:after",
        ]
    );
}

#[test]
fn test_scope_hooks_run_once_each_hooks_run_per_test() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let engine = Engine::new();

    let l = log.clone();
    let hooks = GroupHooks::new()
        .before(move || record(&l, "before"))
        .unwrap();
    let l = log.clone();
    let hooks = hooks
        .before_each(move |_cx| record(&l, "each-in"))
        .unwrap();
    let l = log.clone();
    let hooks = hooks
        .after_each(move |_cx, _scratch| record(&l, "each-out"))
        .unwrap();
    let l = log.clone();
    let hooks = hooks.after(move |_cx| record(&l, "after")).unwrap();
    let id = engine
        .register_group(group_spec("pair", 2, hooks, false))
        .unwrap();

    for name in ["first", "second"] {
        let l = log.clone();
        let report = engine
            .run_test(id, TestCase::new(name, move |_cx| record(&l, "body")))
            .unwrap();
        assert!(report.outcome.is_passed());
    }

    assert_eq!(
        *log.lock(),
        [
            "before", "each-in", "body", "each-out", "each-in", "body", "each-out", "after",
        ]
    );
}

#[test]
fn test_group_without_opt_in_skips_the_suite_layer() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let engine = Engine::new();

    let l = log.clone();
    let suite = SuiteHooks::new()
        .before(move || record(&l, "suite:before"))
        .unwrap();
    let l = log.clone();
    let suite = suite
        .before_each(move |_cx| record(&l, "suite:before_each"))
        .unwrap();
    engine.register_suite(suite).unwrap();

    let l = log.clone();
    let hooks = GroupHooks::new()
        .before_each(move |_cx| record(&l, "group:before_each"))
        .unwrap();
    let id = engine
        .register_group(group_spec("standalone", 1, hooks, false))
        .unwrap();

    let l = log.clone();
    let report = engine
        .run_test(id, TestCase::new("local", move |_cx| record(&l, "body")))
        .unwrap();

    assert!(report.outcome.is_passed());
    assert_eq!(*log.lock(), ["group:before_each", "body"]);
}

#[test]
fn test_suite_each_layer_wraps_the_group_each_layer() {
    let tags: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let observed: Arc<Mutex<Vec<Vec<&'static str>>>> = Arc::new(Mutex::new(Vec::new()));
    let engine = Engine::new();

    let t = tags.clone();
    let suite = SuiteHooks::new()
        .before_each(move |_cx| {
            let mut tags = t.lock();
            tags.clear();
            tags.push("S");
        })
        .unwrap();
    engine.register_suite(suite).unwrap();

    let t = tags.clone();
    let hooks = GroupHooks::new()
        .before_each(move |_cx| t.lock().push("G"))
        .unwrap();
    let id = engine
        .register_group(group_spec("nested", 2, hooks, true))
        .unwrap();

    for name in ["one", "two"] {
        let t = tags.clone();
        let o = observed.clone();
        let report = engine
            .run_test(
                id,
                TestCase::new(name, move |_cx| o.lock().push(t.lock().clone())),
            )
            .unwrap();
        assert!(report.outcome.is_passed());
    }

    assert_eq!(*observed.lock(), [vec!["S", "G"], vec!["S", "G"]]);
}
