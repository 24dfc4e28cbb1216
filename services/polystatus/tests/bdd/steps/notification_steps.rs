//! BDD step definitions for delivered notifications and channel tests

use std::sync::Arc;

use cucumber::{then, when};

use polystatus::config::NotificationConfig;
use polystatus::notifier::DeliveryRecord;
use polystatus::PolyStatusError;

use crate::world::PolyStatusWorld;

/// Delivery history once every background notice has settled
async fn settled_history(world: &mut PolyStatusWorld) -> Vec<DeliveryRecord> {
    let engine = world.engine();
    engine.recorder().flush().await;
    engine.dispatcher().history().await
}

#[then(expr = "{int} notification(s) should have been delivered")]
async fn notifications_delivered(world: &mut PolyStatusWorld, expected: usize) {
    let delivered = settled_history(world)
        .await
        .into_iter()
        .filter(|r| r.success)
        .count();
    assert_eq!(delivered, expected);
}

#[then(expr = "{int} notification(s) containing {string} should have been delivered")]
async fn notifications_containing(world: &mut PolyStatusWorld, expected: usize, text: String) {
    let history = settled_history(world).await;
    let matching = history
        .iter()
        .filter(|r| r.success && (r.title.contains(&text) || r.message.contains(&text)))
        .count();
    assert_eq!(matching, expected, "history: {history:?}");
}

#[then(expr = "{int} delivery attempt(s) should have been recorded")]
async fn attempts_recorded(world: &mut PolyStatusWorld, expected: usize) {
    assert_eq!(settled_history(world).await.len(), expected);
}

#[then(expr = "{int} delivery attempt(s) should have failed")]
async fn attempts_failed(world: &mut PolyStatusWorld, expected: usize) {
    let failed = settled_history(world)
        .await
        .into_iter()
        .filter(|r| !r.success)
        .count();
    assert_eq!(failed, expected);
}

#[then(expr = "the QQ relay should have received a message for {string}")]
async fn qq_relay_received(world: &mut PolyStatusWorld, target_qq: String) {
    settled_history(world).await;
    let relay = NotificationConfig::default().qq_proxy_url;
    let requests = world.http().requests_to(&relay);
    assert_eq!(requests.len(), 1, "relay requests: {requests:?}");
    let body = requests[0].body.as_ref().expect("relay request without body");
    assert_eq!(requests[0].method, "POST");
    assert_eq!(body["post"]["user_id"], target_qq.as_str());
}

#[when(expr = "owner {int} tests channel {int}")]
async fn owner_tests_channel_id(world: &mut PolyStatusWorld, owner: i64, channel_id: i64) {
    let dispatcher = Arc::clone(world.engine().dispatcher());
    world.last_error = dispatcher.send_test(owner, channel_id).await.err();
}

#[when(expr = "owner {int} tests the channel {string}")]
async fn owner_tests_channel(world: &mut PolyStatusWorld, owner: i64, name: String) {
    let channel_id = *world.channels.get(&name).expect("unknown channel");
    let dispatcher = Arc::clone(world.engine().dispatcher());
    world.last_error = dispatcher.send_test(owner, channel_id).await.err();
    if let Some(e) = &world.last_error {
        panic!("channel test failed: {e}");
    }
}

#[then("the channel test should fail as not found")]
fn channel_test_not_found(world: &mut PolyStatusWorld) {
    assert!(
        matches!(world.last_error, Some(PolyStatusError::NotFound(_))),
        "expected NotFound, got {:?}",
        world.last_error
    );
}
