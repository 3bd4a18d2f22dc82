//! Integration tests for the world core.
//!
//! Exercises the full request surface the packet layer calls into: settling
//! cities, range queries with diplomacy-driven visibility, alliance
//! persistence, and the market matching pass.

use std::sync::Arc;
use std::time::Duration;

use spitfire_core::{
    AllianceStore, CitySummary, ClientProfile, DiplomacyError, MemoryAllianceStore, OrderRequest,
    RecordingNotifier,
};
use spitfire_protocol::{
    CityId, ClientId, OrderSide, Relation, Resource, TileId, ZoneId,
};
use spitfire_server::{spawn_background_tasks, ServerConfig, World};

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

fn test_config() -> ServerConfig {
    ServerConfig {
        map_size: 100,
        rng_seed: 7,
        rescan_interval: Duration::from_millis(50),
        market: spitfire_server::MarketConfig {
            cache_ttl: Duration::from_secs(5),
            matching_interval: Duration::from_millis(50),
        },
        ..ServerConfig::default()
    }
}

fn test_world() -> (Arc<World>, Arc<MemoryAllianceStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(MemoryAllianceStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let world = World::new(test_config(), store.clone(), notifier.clone()).unwrap();
    (Arc::new(world), store, notifier)
}

fn register_client(world: &World, id: u64, name: &str) {
    world.clients().upsert_client(ClientProfile {
        id: ClientId(id),
        name: name.into(),
        prestige: 1500,
        honor: 10,
        flag: "crimson".into(),
        logo_url: format!("faces/{id}.png"),
        status: 1,
        beginner: false,
        alliance: None,
        alliance_name: None,
    });
}

fn city(id: u64, name: &str, level: u8) -> CitySummary {
    CitySummary {
        id: CityId(id),
        name: name.into(),
        status: 0,
        level,
    }
}

/// Settle, rescan, allocate, query: the everyday map loop.
#[test]
fn settlement_and_zone_statistics_flow() {
    let (world, _store, _notifier) = test_world();
    register_client(&world, 1, "Aldric");

    world.rescan();
    let open_before = world.open_flats(ZoneId(0));
    assert_eq!(open_before, 25 * 25);

    // The allocator hands out a random open tile; the settler stamps its
    // claim, then the city arrives.
    let tile = world.allocate_open_tile(ZoneId(0)).expect("zone has open tiles");
    world.reserve_tile(tile, ClientId(1)).unwrap();
    world
        .found_city(tile, ClientId(1), city(11, "Hearthstead", 3))
        .unwrap();
    world.rescan();

    assert_eq!(world.open_flats(ZoneId(0)), open_before - 1);
    let stats = world.zone_stats(ZoneId(0));
    assert_eq!(stats.players, 1);
    assert_eq!(stats.number_cities, 1);

    // The city shows up in a range query over its own position.
    let size = world.config().map_size;
    let x = (tile.0 % size) as i32;
    let y = (tile.0 / size) as i32;
    let view = world.query_range(ClientId(1), x, x, y, y);
    assert_eq!(view.ok, 1);
    assert_eq!(view.castles.len(), 1);
    assert_eq!(view.castles[0].name, "Hearthstead");
    let player = view.castles[0].player.as_ref().unwrap();
    assert_eq!(player.relation, Relation::Own);
    assert!(!player.actions.can_loot && player.actions.can_send);
}

#[test]
fn range_query_rejections_keep_response_shape() {
    let (world, _store, _notifier) = test_world();

    let malformed = world.query_range(ClientId(1), 5, 2, 0, 0);
    assert_eq!(malformed.ok, -1);
    assert!(malformed.error_msg.is_some());
    assert!(malformed.castles.is_empty());

    let oversized = world.query_range(ClientId(1), 0, 24, 0, 24);
    assert_eq!(oversized.ok, -1);

    let wrapped = world.query_range(ClientId(1), -2, 3, 0, 0);
    assert_eq!(wrapped.ok, 1);
    assert_eq!(wrapped.map_str.len(), 6 * 2);
}

/// War flips the action flags a range query reports.
#[test]
fn diplomacy_changes_map_visibility() {
    let (world, store, notifier) = test_world();
    register_client(&world, 1, "Aldric");
    register_client(&world, 2, "Bertram");

    let iron_pact = world.create_alliance("Iron Pact", "Aldric", 1_000).unwrap();
    let red_banner = world.create_alliance("Red Banner", "Bertram", 1_000).unwrap();
    world.join_alliance(iron_pact, ClientId(1), 5).unwrap();
    world.join_alliance(red_banner, ClientId(2), 5).unwrap();

    world
        .found_city(TileId(42), ClientId(2), city(21, "Bastion", 2))
        .unwrap();

    // Strangers may raid but not reinforce.
    let view = world.query_range(ClientId(1), 40, 45, 0, 0);
    let player = view.castles[0].player.as_ref().unwrap();
    assert_eq!(player.relation, Relation::NoRelation);
    assert!(player.actions.can_loot && !player.actions.can_send);
    assert_eq!(player.alliance_name.as_deref(), Some("Red Banner"));

    // One declaration, mutual war, one broadcast.
    world.declare_war(iron_pact, red_banner, 10_000).unwrap();
    assert_eq!(notifier.broadcast_count(), 1);

    let view = world.query_range(ClientId(1), 40, 45, 0, 0);
    let player = view.castles[0].player.as_ref().unwrap();
    assert_eq!(player.relation, Relation::Enemy);
    assert!(player.actions.can_loot && player.actions.can_send);

    // The mirrored side sees the war too.
    let reverse = world.query_range(ClientId(2), 40, 45, 0, 0);
    assert_eq!(
        reverse.castles[0].player.as_ref().unwrap().relation,
        Relation::Own
    );

    // Cooldown blocks an immediate second declaration from the same side.
    let third = world.create_alliance("Sea Wolves", "Cedric", 1_000).unwrap();
    assert_eq!(
        world.declare_war(iron_pact, third, 20_000),
        Err(DiplomacyError::CooldownActive { until: 10_000 + DAY_MS })
    );

    // Persist and reload through the row store.
    world.save_alliance(iron_pact).unwrap();
    let row = store
        .load_all()
        .unwrap()
        .into_iter()
        .find(|r| r.id == Some(iron_pact))
        .unwrap();
    assert_eq!(row.enemies, red_banner.0.to_string());
    assert_eq!(row.members, "1,5");
}

#[test]
fn allied_city_cannot_be_raided_but_accepts_reinforcement() {
    let (world, _store, _notifier) = test_world();
    register_client(&world, 1, "Aldric");
    register_client(&world, 2, "Bertram");

    let a = world.create_alliance("Iron Pact", "Aldric", 0).unwrap();
    let b = world.create_alliance("Red Banner", "Bertram", 0).unwrap();
    world.join_alliance(a, ClientId(1), 5).unwrap();
    world.join_alliance(b, ClientId(2), 5).unwrap();
    world.set_ally(a, b).unwrap();

    world
        .found_city(TileId(7), ClientId(2), city(21, "Bastion", 2))
        .unwrap();

    let view = world.query_range(ClientId(1), 0, 9, 0, 0);
    let player = view.castles[0].player.as_ref().unwrap();
    assert_eq!(player.relation, Relation::Ally);
    assert!(!player.actions.can_loot && player.actions.can_send);

    // The ally declaration was one-sided: Bertram's side still sees a
    // stranger.
    register_client(&world, 3, "Cedric");
    world.join_alliance(a, ClientId(3), 1).unwrap();
    world
        .found_city(TileId(8), ClientId(3), city(31, "Outpost", 1))
        .unwrap();
    let reverse = world.query_range(ClientId(2), 0, 9, 0, 0);
    let outpost = reverse
        .castles
        .iter()
        .find(|c| c.id == TileId(8))
        .and_then(|c| c.player.as_ref())
        .unwrap();
    assert_eq!(outpost.relation, Relation::NoRelation);
}

#[test]
fn dangling_owner_is_healed_by_tile_view() {
    let (world, _store, _notifier) = test_world();
    register_client(&world, 1, "Aldric");
    world
        .found_city(TileId(30), ClientId(1), city(11, "Hearthstead", 2))
        .unwrap();

    // The account disappears out from under its tile.
    world.clients().remove_client(ClientId(1));

    let view = world.tile_view(TileId(30), ClientId(2)).unwrap();
    assert!(view.owner.is_none());
    assert!(view.actions.can_loot && !view.actions.can_send);

    // Healed: the next range query sees an open flat, not a castle.
    let range = world.query_range(ClientId(2), 30, 30, 0, 0);
    assert!(range.castles.is_empty());
    assert_eq!(range.map_str, "a0");
}

#[test]
fn market_orders_cross_at_the_matching_pass() {
    let (world, _store, _notifier) = test_world();

    let buy = OrderRequest {
        resource: Resource::Food,
        side: OrderSide::Buy,
        amount: 10,
        price: 5,
        owner: ClientId(1),
        city: CityId(11),
    };
    let sell = OrderRequest {
        resource: Resource::Food,
        side: OrderSide::Sell,
        amount: 6,
        price: 5,
        owner: ClientId(2),
        city: CityId(21),
    };
    world.place_order(buy, 1_000).unwrap();
    world.place_order(sell, 2_000).unwrap();

    let fills = world.process_market(3_000);
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].amount, 6);
    assert_eq!(fills[0].buyer, ClientId(1));
    assert_eq!(fills[0].seller, ClientId(2));

    // Remaining bid shows up for browsers once the cache refreshes.
    let listings = world.market_listings(Resource::Food, OrderSide::Buy, 10_000);
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].amount, 4);
}

/// Background loops run the rescan without any request traffic.
#[tokio::test]
async fn background_tasks_keep_zone_stats_fresh() {
    let (world, _store, _notifier) = test_world();
    register_client(&world, 1, "Aldric");
    world
        .found_city(TileId(3), ClientId(1), city(11, "Hearthstead", 2))
        .unwrap();

    let tasks = spawn_background_tasks(world.clone());
    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(world.zone_stats(ZoneId(0)).players, 1);
    for task in tasks {
        task.abort();
    }
}
