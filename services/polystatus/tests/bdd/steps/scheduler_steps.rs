//! BDD step definitions for scheduler ticks and timeout sweeps

use std::sync::Arc;

use cucumber::{given, then, when};

use polystatus::scheduler::TickOutcome;
use polystatus::timeout::TimeoutDetector;

use crate::world::PolyStatusWorld;

#[given(expr = "probes answer with status {int}")]
fn probes_answer_with(world: &mut PolyStatusWorld, status: u16) {
    world.http().set_probe_status(status);
}

#[when(expr = "the scheduler ticks at {int} seconds")]
async fn scheduler_ticks(world: &mut PolyStatusWorld, offset: i64) {
    let now = world.t0() + chrono::Duration::seconds(offset);
    let engine = world.engine();
    let outcome = engine.scheduler().tick_at(now).await;
    engine.scheduler().wait_for_probes().await;
    engine.recorder().flush().await;
    world.last_outcome = Some(outcome);
}

#[when(expr = "the timeout detector sweeps at {int} seconds")]
async fn detector_sweeps(world: &mut PolyStatusWorld, offset: i64) {
    let now = world.t0() + chrono::Duration::seconds(offset);
    let engine = world.engine();
    let detector = TimeoutDetector::new(
        Arc::clone(engine.store()),
        Arc::clone(engine.recorder()),
    );
    let flagged = detector.sweep(now).await.unwrap();
    world.last_swept = Some(flagged);
}

#[then(expr = "the tick should have dispatched {int} probe(s)")]
fn tick_dispatched(world: &mut PolyStatusWorld, expected: usize) {
    match world.last_outcome {
        Some(TickOutcome::Completed(report)) => assert_eq!(report.dispatched, expected),
        other => panic!("expected a completed tick, got {other:?}"),
    }
}

#[then(expr = "{int} monitor(s) should have been flagged")]
fn monitors_flagged(world: &mut PolyStatusWorld, expected: usize) {
    assert_eq!(world.last_swept, Some(expected));
}

#[then(expr = "no request should have been sent to {string}")]
fn no_request_to(world: &mut PolyStatusWorld, prefix: String) {
    let requests = world.http().requests_to(&prefix);
    assert!(requests.is_empty(), "unexpected requests: {requests:?}");
}
