//! BDD step definitions for creating and inspecting monitors

use std::sync::Arc;

use cucumber::{given, then, when};

use polystatus::monitor::{ActiveTarget, MonitorLog, MonitorStatus, Observation};
use polystatus::store::Store;

use super::parse_status;
use crate::world::PolyStatusWorld;

async fn latest_log(world: &mut PolyStatusWorld, name: &str) -> MonitorLog {
    let id = world.monitor_id(name);
    world
        .store()
        .logs(id)
        .await
        .pop()
        .unwrap_or_else(|| panic!("{name} has no log entries"))
}

#[given(expr = "an active monitor {string} probing {string} every {int} seconds")]
async fn active_monitor(world: &mut PolyStatusWorld, name: String, url: String, interval: u64) {
    let mut target = ActiveTarget::new(url);
    target.interval_seconds = interval;
    let monitor = world
        .store()
        .create_active_monitor(1, &name, target, 0)
        .await
        .unwrap();
    world.monitors.insert(name, monitor.id);
}

#[given(expr = "a passive monitor {string} with a timeout of {int} seconds")]
async fn passive_monitor(world: &mut PolyStatusWorld, name: String, timeout: u64) {
    let monitor = world
        .store()
        .create_passive_monitor(1, &name, timeout)
        .await
        .unwrap();
    world.monitors.insert(name, monitor.id);
}

#[given(expr = "a passive monitor {string} in status {string}")]
async fn passive_monitor_in_status(world: &mut PolyStatusWorld, name: String, status: String) {
    let store = world.store();
    let monitor = store.create_passive_monitor(1, &name, 0).await.unwrap();
    assert!(store.set_status(monitor.id, parse_status(&status)).await);
    world.monitors.insert(name, monitor.id);
}

#[given(expr = "monitor {string} is paused")]
async fn monitor_paused(world: &mut PolyStatusWorld, name: String) {
    let id = world.monitor_id(&name);
    assert!(world.store().set_paused(id, true).await);
}

#[given(expr = "monitor {string} is in maintenance")]
async fn monitor_in_maintenance(world: &mut PolyStatusWorld, name: String) {
    let id = world.monitor_id(&name);
    assert!(world.store().set_maintenance(id, true).await);
}

#[given(expr = "{string} reported a heartbeat at {int} seconds")]
async fn reported_heartbeat(world: &mut PolyStatusWorld, name: String, offset: i64) {
    let id = world.monitor_id(&name);
    let at = world.t0() + chrono::Duration::seconds(offset);
    let recorder = Arc::clone(world.engine().recorder());
    recorder
        .record_at(id, Observation::up(0).with_code(200), at)
        .await
        .unwrap();
}

#[when(expr = "{string} observes {string}")]
async fn observes(world: &mut PolyStatusWorld, name: String, status: String) {
    let id = world.monitor_id(&name);
    let recorder = Arc::clone(world.engine().recorder());
    recorder
        .record(id, Observation::new(parse_status(&status), 5))
        .await
        .unwrap();
}

#[then(expr = "{string} should be {string}")]
async fn monitor_status(world: &mut PolyStatusWorld, name: String, expected: String) {
    let id = world.monitor_id(&name);
    let monitor = world.store().get_monitor(id).await.unwrap().unwrap();
    assert_eq!(monitor.status, parse_status(&expected));
}

#[then(expr = "{string} should have {int} log entry/entries")]
async fn log_count(world: &mut PolyStatusWorld, name: String, expected: usize) {
    let id = world.monitor_id(&name);
    let logs = world.store().logs(id).await;
    assert_eq!(logs.len(), expected, "log entries of {name}: {logs:?}");
}

#[then(expr = "{string} should have {int} DOWN log entry/entries")]
async fn down_log_count(world: &mut PolyStatusWorld, name: String, expected: usize) {
    let id = world.monitor_id(&name);
    let down = world
        .store()
        .logs(id)
        .await
        .into_iter()
        .filter(|l| l.status == MonitorStatus::Down)
        .count();
    assert_eq!(down, expected);
}

#[then(expr = "the latest log of {string} should mention {string}")]
async fn latest_log_mentions(world: &mut PolyStatusWorld, name: String, text: String) {
    let log = latest_log(world, &name).await;
    let message = log.message.unwrap_or_default();
    assert!(
        message.contains(&text),
        "expected '{message}' to mention '{text}'"
    );
}

#[then(expr = "the latest log of {string} should have status code {int}")]
async fn latest_log_code(world: &mut PolyStatusWorld, name: String, code: u16) {
    let log = latest_log(world, &name).await;
    assert_eq!(log.status_code, Some(code));
}

#[then(expr = "the latest log of {string} should carry payload {string}")]
async fn latest_log_payload(world: &mut PolyStatusWorld, name: String, payload: String) {
    let log = latest_log(world, &name).await;
    let expected: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(log.payload, Some(expected));
}
