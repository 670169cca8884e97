//! Failure isolation: teardown still runs and the original failure survives.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use latchwork::{Engine, FailureKind, GroupHooks, GroupSpec, Phase, TestCase};

fn group_spec(name: &str, test_count: usize, hooks: GroupHooks) -> GroupSpec {
    GroupSpec {
        name: name.to_string(),
        test_count,
        hooks,
        suite_opt_in: false,
    }
}

#[test]
fn test_after_each_still_consumes_the_owned_value_when_the_body_panics() {
    let seen = Arc::new(Mutex::new(None::<u32>));
    let engine = Engine::new();

    let hooks = GroupHooks::new().before_each(|_cx| 99_u32).unwrap();
    let s = seen.clone();
    let hooks = hooks
        .after_each(move |_cx, scratch| {
            *s.lock() = Some(scratch.take::<u32>().unwrap());
        })
        .unwrap();
    let id = engine.register_group(group_spec("isolated", 1, hooks)).unwrap();

    let report = engine
        .run_test(
            id,
            TestCase::new("explodes", |cx| {
                assert_eq!(*cx.owned_ref::<u32>().unwrap(), 99);
                panic!("intentional body failure");
            }),
        )
        .unwrap();

    assert_eq!(*seen.lock(), Some(99));
    assert_eq!(report.failed_phase(), Some(Phase::Body));
    assert_eq!(report.outcome.failures().len(), 1);
    assert_eq!(report.outcome.failures()[0].message, "intentional body failure");
    assert_eq!(report.outcome.failures()[0].kind(), FailureKind::Body);
}

#[test]
fn test_after_still_fires_when_a_test_in_the_group_fails() {
    let after_fired = Arc::new(AtomicBool::new(false));
    let sibling_ran = Arc::new(AtomicBool::new(false));
    let engine = Engine::new();

    let hooks = GroupHooks::new().after_each(|_cx, _scratch| {}).unwrap();
    let a = after_fired.clone();
    let hooks = hooks
        .after(move |_cx| a.store(true, Ordering::SeqCst))
        .unwrap();
    let id = engine.register_group(group_spec("resilient", 2, hooks)).unwrap();

    let report = engine
        .run_test(id, TestCase::new("panics", |_cx| panic!("deliberate")))
        .unwrap();
    assert!(!report.outcome.is_passed());
    assert!(!after_fired.load(Ordering::SeqCst));

    let s = sibling_ran.clone();
    let report = engine
        .run_test(
            id,
            TestCase::new("sibling", move |_cx| s.store(true, Ordering::SeqCst)),
        )
        .unwrap();
    assert!(report.outcome.is_passed());

    assert!(sibling_ran.load(Ordering::SeqCst));
    assert!(after_fired.load(Ordering::SeqCst));
}

#[test]
fn test_failing_last_completer_still_triggers_after() {
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let engine = Engine::new();

    let o = order.clone();
    let hooks = GroupHooks::new()
        .after_each(move |_cx, _scratch| o.lock().push("after_each"))
        .unwrap();
    let o = order.clone();
    let hooks = hooks.after(move |_cx| o.lock().push("after")).unwrap();
    let id = engine.register_group(group_spec("last-fails", 1, hooks)).unwrap();

    let report = engine
        .run_test(id, TestCase::new("only", |_cx| panic!("last one down")))
        .unwrap();

    assert!(!report.outcome.is_passed());
    assert_eq!(*order.lock(), ["after_each", "after"]);
}

#[test]
fn test_poisoned_before_fails_every_dependent_test() {
    let bodies_ran = Arc::new(AtomicUsize::new(0));
    let engine = Engine::new();

    let hooks = GroupHooks::new()
        .before(|| -> u32 { panic!("fixture construction failed") })
        .unwrap();
    let id = engine.register_group(group_spec("poisoned", 3, hooks)).unwrap();

    for name in ["a", "b", "c"] {
        let b = bodies_ran.clone();
        let report = engine
            .run_test(
                id,
                TestCase::new(name, move |_cx| {
                    b.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert_eq!(report.failed_phase(), Some(Phase::GroupBefore));
        assert_eq!(report.outcome.failures()[0].kind(), FailureKind::Setup);
        assert_eq!(
            report.outcome.failures()[0].message,
            "fixture construction failed"
        );
    }

    assert_eq!(bodies_ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_after_still_runs_without_context_when_before_poisoned() {
    let after_ran = Arc::new(AtomicBool::new(false));
    let after_had_context = Arc::new(AtomicBool::new(true));
    let engine = Engine::new();

    let hooks = GroupHooks::new()
        .before(|| -> u32 { panic!("setup exploded") })
        .unwrap();
    let a = after_ran.clone();
    let h = after_had_context.clone();
    let hooks = hooks
        .after(move |cx| {
            a.store(true, Ordering::SeqCst);
            h.store(cx.shared::<u32>().is_ok(), Ordering::SeqCst);
        })
        .unwrap();
    let id = engine.register_group(group_spec("wrecked", 1, hooks)).unwrap();

    let report = engine
        .run_test(id, TestCase::new("dependent", |_cx| {}))
        .unwrap();

    assert_eq!(report.failed_phase(), Some(Phase::GroupBefore));
    assert!(after_ran.load(Ordering::SeqCst));
    assert!(!after_had_context.load(Ordering::SeqCst));
}

#[test]
fn test_body_and_teardown_failures_are_both_reported() {
    let engine = Engine::new();

    let hooks = GroupHooks::new()
        .after_each(|_cx, _scratch| panic!("teardown failed"))
        .unwrap();
    let id = engine.register_group(group_spec("doubled", 1, hooks)).unwrap();

    let report = engine
        .run_test(id, TestCase::new("both", |_cx| panic!("body failed")))
        .unwrap();

    let failures = report.outcome.failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].phase, Phase::Body);
    assert_eq!(failures[0].message, "body failed");
    assert_eq!(failures[1].phase, Phase::GroupAfterEach);
    assert_eq!(failures[1].message, "teardown failed");
}

#[test]
fn test_failed_before_each_skips_body_and_its_mirror() {
    let body_ran = Arc::new(AtomicBool::new(false));
    let after_each_ran = Arc::new(AtomicBool::new(false));
    let engine = Engine::new();

    let hooks = GroupHooks::new()
        .before_each(|_cx| -> u32 { panic!("per-test setup failed") })
        .unwrap();
    let a = after_each_ran.clone();
    let hooks = hooks
        .after_each(move |_cx, _scratch| a.store(true, Ordering::SeqCst))
        .unwrap();
    let id = engine.register_group(group_spec("broken-setup", 1, hooks)).unwrap();

    let b = body_ran.clone();
    let report = engine
        .run_test(
            id,
            TestCase::new("skipped", move |_cx| b.store(true, Ordering::SeqCst)),
        )
        .unwrap();

    assert_eq!(report.failed_phase(), Some(Phase::GroupBeforeEach));
    assert!(!body_ran.load(Ordering::SeqCst));
    assert!(!after_each_ran.load(Ordering::SeqCst));
}
