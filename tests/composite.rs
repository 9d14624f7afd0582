mod common;

use std::{sync::Arc, time::Duration};

use common::{Behavior, Journal, RecordingReporter, Unavailable, entries, fields, journal, record};
use faultline::{CompositeConfig, CompositeReporter, FanOutFailed, Reporter, ReporterPanicked};
use serde_json::json;

fn shared(reporter: &Arc<RecordingReporter>) -> Arc<dyn Reporter> {
    Arc::clone(reporter) as Arc<dyn Reporter>
}

fn behaving(name: &str, log: &Journal, behavior: Behavior) -> Arc<RecordingReporter> {
    Arc::new(RecordingReporter::new(name, log).behaving(behavior))
}

fn setters_behaving(name: &str, log: &Journal, behavior: Behavior) -> Arc<RecordingReporter> {
    Arc::new(RecordingReporter::new(name, log).setters_behaving(behavior))
}

fn delayed(name: &str, log: &Journal, millis: u64) -> Arc<RecordingReporter> {
    let delay = Duration::from_millis(millis);
    Arc::new(RecordingReporter::new(name, log).with_delay(delay))
}

fn config(continue_on_failure: bool, parallel: bool) -> CompositeConfig {
    CompositeConfig {
        continue_on_failure,
        parallel,
    }
}

#[tokio::test]
async fn test_parallel_reaches_every_child_despite_failures() {
    let log = journal();
    let ok = Arc::new(RecordingReporter::new("ok", &log));
    let failing = behaving("failing", &log, Behavior::Fail);
    let panicking = behaving("panicking", &log, Behavior::Panic);

    let composite = CompositeReporter::new([shared(&ok), shared(&failing), shared(&panicking)]);

    composite.report(&record()).await.unwrap();
    assert_eq!(ok.report_count(), 1);
    assert_eq!(failing.report_count(), 1);
    assert_eq!(panicking.report_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_parallel_children_run_concurrently() {
    let log = journal();
    let slow = delayed("slow", &log, 100);
    let slower = delayed("slower", &log, 150);
    let composite = CompositeReporter::new([shared(&slow), shared(&slower)]);

    let start = tokio::time::Instant::now();
    composite.report(&record()).await.unwrap();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(150));
    assert!(elapsed < Duration::from_millis(250));
    assert_eq!(
        entries(&log),
        ["slow:start", "slower:start", "slow:end", "slower:end"]
    );
}

#[tokio::test]
async fn test_strict_parallel_returns_every_failure_after_all_children_ran() {
    let log = journal();
    let first = behaving("first", &log, Behavior::Fail);
    let second = Arc::new(RecordingReporter::new("second", &log));
    let third = behaving("third", &log, Behavior::Panic);
    let composite = CompositeReporter::with_config(
        [shared(&first), shared(&second), shared(&third)],
        config(false, true),
    );

    let error = composite.report(&record()).await.unwrap_err();

    assert_eq!(
        error.downcast_current_context::<FanOutFailed>(),
        Some(&FanOutFailed {
            failed: 2,
            total: 3
        })
    );
    assert_eq!(error.children().len(), 2);
    assert_eq!(second.report_count(), 1);
    assert_eq!(third.report_count(), 1);
}

#[tokio::test]
async fn test_strict_sequential_stops_at_first_failure() {
    let log = journal();
    let first = Arc::new(RecordingReporter::new("first", &log));
    let second = behaving("second", &log, Behavior::Fail);
    let third = Arc::new(RecordingReporter::new("third", &log));
    let composite = CompositeReporter::with_config(
        [shared(&first), shared(&second), shared(&third)],
        config(false, false),
    );

    let error = composite.report(&record()).await.unwrap_err();

    let cause = error.downcast_current_context::<Unavailable>().unwrap();
    assert_eq!(cause.0, "second");
    assert_eq!(third.report_count(), 0);
    assert_eq!(
        entries(&log),
        ["first:start", "first:end", "second:start", "second:end"]
    );
}

#[tokio::test]
async fn test_strict_sequential_reports_a_panic_as_failure() {
    let log = journal();
    let panicking = behaving("panicking", &log, Behavior::Panic);
    let after = Arc::new(RecordingReporter::new("after", &log));
    let composite =
        CompositeReporter::with_config([shared(&panicking), shared(&after)], config(false, false));

    let error = composite.report(&record()).await.unwrap_err();

    let panicked = error
        .downcast_current_context::<ReporterPanicked>()
        .unwrap();
    assert_eq!(panicked.reporter, "panicking");
    assert_eq!(panicked.message, "panicking exploded");
    assert_eq!(after.report_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_lenient_sequential_continues_in_order() {
    let log = journal();
    let first = Arc::new(
        RecordingReporter::new("first", &log)
            .behaving(Behavior::Fail)
            .with_delay(Duration::from_millis(20)),
    );
    let second = behaving("second", &log, Behavior::Panic);
    let third = delayed("third", &log, 5);
    let composite = CompositeReporter::with_config(
        [shared(&first), shared(&second), shared(&third)],
        config(true, false),
    );

    composite.report(&record()).await.unwrap();

    assert_eq!(
        entries(&log),
        [
            "first:start",
            "first:end",
            "second:start",
            "second:end",
            "third:start",
            "third:end"
        ]
    );
}

#[tokio::test]
async fn test_extra_context_reaches_every_child() {
    let log = journal();
    let a = Arc::new(RecordingReporter::new("a", &log));
    let b = Arc::new(RecordingReporter::new("b", &log));
    let composite = CompositeReporter::new([shared(&a), shared(&b)]);
    let extra = fields(&[("route", json!("/profile"))]);

    composite
        .report_with_context(&record(), &extra)
        .await
        .unwrap();

    for child in [&a, &b] {
        let reports = child.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "profile view failed to build");
        assert_eq!(reports[0].1, extra);
    }
}

#[test]
fn test_setters_reach_every_child_and_never_fail() {
    let log = journal();
    let ok = Arc::new(RecordingReporter::new("ok", &log));
    let failing = setters_behaving("failing", &log, Behavior::Fail);
    let panicking = setters_behaving("panicking", &log, Behavior::Panic);
    let composite = CompositeReporter::with_config(
        [shared(&ok), shared(&failing), shared(&panicking)],
        config(false, false),
    );

    composite.identify_user("user-3").unwrap();
    composite
        .set_user_properties(&fields(&[("plan", json!("pro")), ("seats", json!(4))]))
        .unwrap();
    composite.clear_user().unwrap();

    for child in [&ok, &failing, &panicking] {
        assert_eq!(
            child.setter_calls(),
            ["identify_user:user-3", "set_user_properties:2", "clear_user"]
        );
    }
}

#[test]
fn test_derived_composites_leave_the_original_untouched() {
    let log = journal();
    let a = Arc::new(RecordingReporter::new("a", &log));
    let b = Arc::new(RecordingReporter::new("b", &log));
    let extra = Arc::new(RecordingReporter::new("extra", &log));
    let original = CompositeReporter::new([shared(&a), shared(&b)]);

    let grown = original.add_reporter(shared(&extra));
    let shrunk = original.remove_reporter(&original.reporters()[0]);
    let resettled = original.with_settings(Some(false), Some(false));

    assert_eq!(grown.reporter_count(), 3);
    assert_eq!(shrunk.reporter_count(), 1);
    assert!(!resettled.parallel());

    assert_eq!(original.reporter_count(), 2);
    assert_eq!(original.config(), CompositeConfig::default());
    let names: Vec<&str> = original.reporters().iter().map(|r| r.name()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn test_add_then_remove_restores_the_list() {
    let log = journal();
    let a = shared(&Arc::new(RecordingReporter::new("a", &log)));
    let b = shared(&Arc::new(RecordingReporter::new("b", &log)));
    let added = shared(&Arc::new(RecordingReporter::new("added", &log)));
    let original = CompositeReporter::with_config(
        [Arc::clone(&a), Arc::clone(&b)],
        config(false, true),
    );

    let restored = original
        .add_reporter(Arc::clone(&added))
        .remove_reporter(&added);

    assert_eq!(restored.reporter_count(), original.reporter_count());
    assert_eq!(restored.config(), original.config());
    for (left, right) in restored.reporters().iter().zip(original.reporters()) {
        assert!(Arc::ptr_eq(left, right));
    }
}

#[test]
fn test_dispose_reaches_nested_children() {
    let log = journal();
    let inner_child = Arc::new(RecordingReporter::new("inner", &log));
    let outer_child = Arc::new(RecordingReporter::new("outer", &log));
    let inner = CompositeReporter::new([shared(&inner_child)]);
    let outer = CompositeReporter::new([
        Arc::new(inner) as Arc<dyn Reporter>,
        shared(&outer_child),
    ]);

    outer.dispose();

    assert_eq!(inner_child.dispose_count(), 1);
    assert_eq!(outer_child.dispose_count(), 1);
}
