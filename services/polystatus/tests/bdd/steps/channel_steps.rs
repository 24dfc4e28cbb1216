//! BDD step definitions for notification channels

use cucumber::given;

use polystatus::channel::{BarkConfig, ChannelConfig, NotificationChannel, QqConfig};
use polystatus::monitor::OwnerId;

use crate::world::PolyStatusWorld;

async fn add_channel(
    world: &mut PolyStatusWorld,
    name: String,
    owner_id: OwnerId,
    is_enabled: bool,
    config: ChannelConfig,
) {
    let id = world.channels.len() as i64 + 1;
    world
        .store()
        .insert_channel(NotificationChannel {
            id,
            owner_id,
            name: name.clone(),
            is_enabled,
            config,
        })
        .await
        .unwrap();
    world.channels.insert(name, id);
}

#[given(expr = "a Bark channel {string} at {string} for owner {int}")]
async fn bark_channel(world: &mut PolyStatusWorld, name: String, url: String, owner: OwnerId) {
    let config = ChannelConfig::Bark(BarkConfig::new(url).unwrap());
    add_channel(world, name, owner, true, config).await;
}

#[given(expr = "a disabled Bark channel {string} at {string} for owner {int}")]
async fn disabled_bark_channel(
    world: &mut PolyStatusWorld,
    name: String,
    url: String,
    owner: OwnerId,
) {
    let config = ChannelConfig::Bark(BarkConfig::new(url).unwrap());
    add_channel(world, name, owner, false, config).await;
}

#[given(expr = "a QQ channel {string} for user {string} for owner {int}")]
async fn qq_channel(world: &mut PolyStatusWorld, name: String, target_qq: String, owner: OwnerId) {
    let config = ChannelConfig::Qq(QqConfig::new("bdd-token", target_qq).unwrap());
    add_channel(world, name, owner, true, config).await;
}

#[given(expr = "deliveries to {string} fail")]
fn deliveries_fail(world: &mut PolyStatusWorld, host: String) {
    world.http().break_host(&host);
}
