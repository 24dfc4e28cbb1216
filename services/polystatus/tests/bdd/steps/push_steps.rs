//! BDD step definitions for push ingestion

use std::sync::Arc;

use cucumber::{then, when};

use polystatus::store::Store;
use polystatus::PolyStatusError;

use crate::world::PolyStatusWorld;

async fn push(world: &mut PolyStatusWorld, key: &str, body: &str) {
    let engine = world.engine();
    let store = Arc::clone(engine.store());
    let recorder = Arc::clone(engine.recorder());

    let result = polystatus::push::ingest(store.as_ref(), &recorder, key, body.as_bytes()).await;
    recorder.flush().await;
    world.last_error = result.err();
}

#[when(expr = "{string} pushes {string}")]
async fn monitor_pushes(world: &mut PolyStatusWorld, name: String, body: String) {
    let id = world.monitor_id(&name);
    let monitor = world.store().get_monitor(id).await.unwrap().unwrap();
    let key = monitor.passive_key().expect("not a passive monitor").to_string();
    push(world, &key, &body).await;
    if let Some(e) = &world.last_error {
        panic!("push for {name} failed: {e}");
    }
}

#[when(expr = "the key {string} pushes {string}")]
async fn key_pushes(world: &mut PolyStatusWorld, key: String, body: String) {
    push(world, &key, &body).await;
}

#[then("the push should fail as not found")]
fn push_not_found(world: &mut PolyStatusWorld) {
    assert!(
        matches!(world.last_error, Some(PolyStatusError::NotFound(_))),
        "expected NotFound, got {:?}",
        world.last_error
    );
}
