//! Shared world state and the request-facing surface.
//!
//! One [`World`] per process, shared across request handlers and background
//! tasks. Lock layout: the map behind one `RwLock` (range queries take the
//! read side, rescans and claims the write side), the alliance manager
//! behind another (pair transitions are atomic under its write lock), the
//! market synchronized internally. Persistence calls run outside every
//! lock so no handler blocks on I/O while holding game state.

use std::sync::{Arc, Mutex, RwLock};

use tracing::info;

use spitfire_core::{
    AllianceManager, AllianceRow, AllianceStore, CitySummary, ClientDirectory, DiplomacyError,
    GameRng, MapError, Market, MarketError, MembershipError, Notifier, OrderRequest, PersistError,
    WorldMap, ZoneStats,
};
use spitfire_protocol::{
    AllianceId, AllianceInfo, ClientId, OrderSide, RangeView, Resource, TileId, TileKind,
    TileView, TradeFill, TradeId, TradeListing, ZoneId,
};

use crate::config::ServerConfig;

pub struct World {
    config: ServerConfig,
    map: RwLock<WorldMap>,
    alliances: RwLock<AllianceManager>,
    market: Market,
    clients: ClientDirectory,
    store: Arc<dyn AllianceStore>,
    notifier: Arc<dyn Notifier>,
    rng: Mutex<GameRng>,
}

impl World {
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn AllianceStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<World, MapError> {
        let map = WorldMap::new(config.map_size, TileKind::Flat)?;
        let alliances = AllianceManager::new(
            config.member_limit,
            config.enemy_cooldown.as_millis() as u64,
        );
        let market = Market::new(config.market.cache_ttl.as_millis() as u64);
        let clients = ClientDirectory::new(config.map_size);
        let rng = Mutex::new(GameRng::seed_from_u64(config.rng_seed));
        Ok(World {
            config,
            map: RwLock::new(map),
            alliances: RwLock::new(alliances),
            market,
            clients,
            store,
            notifier,
            rng,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn clients(&self) -> &ClientDirectory {
        &self.clients
    }

    // --- Map surface ---

    pub fn query_range(
        &self,
        requester: ClientId,
        x1: i32,
        x2: i32,
        y1: i32,
        y2: i32,
    ) -> RangeView {
        let map = self.map.read().expect("map lock");
        let alliances = self.alliances.read().expect("alliance lock");
        map.query_range(requester, x1, x2, y1, y2, &self.clients, &alliances)
    }

    pub fn tile_view(&self, field: TileId, requester: ClientId) -> Result<TileView, MapError> {
        // Write side: the dangling-owner self-heal mutates the tile.
        let mut map = self.map.write().expect("map lock");
        let alliances = self.alliances.read().expect("alliance lock");
        map.tile_view(field, requester, &self.clients, &alliances)
    }

    pub fn allocate_open_tile(&self, zone: ZoneId) -> Option<TileId> {
        let mut map = self.map.write().expect("map lock");
        let mut rng = self.rng.lock().expect("rng lock");
        map.allocate_open_tile(zone, &mut rng)
    }

    /// Stamp the settler onto an allocated tile before the city is built.
    pub fn reserve_tile(&self, tile: TileId, owner: ClientId) -> Result<(), MapError> {
        self.map.write().expect("map lock").reserve_tile(tile, owner)
    }

    /// Settle a city: register it with the directory, then claim the tile.
    pub fn found_city(
        &self,
        tile: TileId,
        owner: ClientId,
        city: CitySummary,
    ) -> Result<(), MapError> {
        let city_id = city.id;
        self.clients.upsert_city(city);
        let result = self
            .map
            .write()
            .expect("map lock")
            .found_city(tile, owner, city_id);
        if result.is_err() {
            self.clients.remove_city(city_id);
        }
        result
    }

    pub fn raze_city(&self, tile: TileId) -> Result<(), MapError> {
        let city = self.map.read().expect("map lock").tile(tile).and_then(|t| t.city);
        let result = self.map.write().expect("map lock").raze_city(tile);
        if result.is_ok() {
            if let Some(city) = city {
                self.clients.remove_city(city);
            }
        }
        result
    }

    pub fn rescan(&self) {
        self.map.write().expect("map lock").rescan();
    }

    pub fn zone_stats(&self, zone: ZoneId) -> ZoneStats {
        self.map.read().expect("map lock").zone_stats(zone)
    }

    pub fn open_flats(&self, zone: ZoneId) -> u32 {
        self.map.read().expect("map lock").open_flats(zone)
    }

    // --- Alliance surface ---

    /// Insert the row first (blocking store call, no locks held), then
    /// adopt the alliance in memory.
    pub fn create_alliance(
        &self,
        name: &str,
        founder: &str,
        now: u64,
    ) -> Result<AllianceId, PersistError> {
        let row = AllianceRow {
            id: None,
            name: name.into(),
            founder: founder.into(),
            leader: founder.into(),
            created: now,
            ..AllianceRow::default()
        };
        let id = self.store.insert(&row)?;
        self.alliances
            .write()
            .expect("alliance lock")
            .adopt(id, name, founder, now);
        info!(alliance = id.0, name, "alliance created");
        Ok(id)
    }

    /// Snapshot the row under the read lock, upsert outside it.
    pub fn save_alliance(&self, id: AllianceId) -> Result<(), PersistError> {
        let row = {
            let alliances = self.alliances.read().expect("alliance lock");
            alliances
                .get(id)
                .map(|a| a.to_row())
                .ok_or(PersistError::NotFound(id))?
        };
        self.store.update(&row)
    }

    pub fn disband_alliance(&self, id: AllianceId) -> Result<(), PersistError> {
        self.store.delete(id)?;
        self.alliances.write().expect("alliance lock").remove(id);
        info!(alliance = id.0, "alliance disbanded");
        Ok(())
    }

    pub fn alliance_info(&self, id: AllianceId) -> Option<AllianceInfo> {
        self.alliances
            .read()
            .expect("alliance lock")
            .get(id)
            .map(|a| a.info())
    }

    pub fn join_alliance(
        &self,
        alliance: AllianceId,
        client: ClientId,
        rank: u8,
    ) -> Result<(), MembershipError> {
        let name = {
            let mut alliances = self.alliances.write().expect("alliance lock");
            let entry = alliances
                .get_mut(alliance)
                .ok_or(MembershipError::NotFound(client))?;
            entry.add_member(client, rank)?;
            entry.name.clone()
        };
        self.clients
            .set_client_alliance(client, Some(alliance), Some(name));
        Ok(())
    }

    pub fn leave_alliance(
        &self,
        alliance: AllianceId,
        client: ClientId,
    ) -> Result<(), MembershipError> {
        {
            let mut alliances = self.alliances.write().expect("alliance lock");
            let entry = alliances
                .get_mut(alliance)
                .ok_or(MembershipError::NotFound(client))?;
            entry.remove_member(client)?;
        }
        self.clients.set_client_alliance(client, None, None);
        Ok(())
    }

    pub fn set_ally(&self, id: AllianceId, other: AllianceId) -> Result<(), DiplomacyError> {
        self.alliances
            .write()
            .expect("alliance lock")
            .set_ally(id, other, self.notifier.as_ref())
    }

    pub fn set_neutral(&self, id: AllianceId, other: AllianceId) -> Result<(), DiplomacyError> {
        self.alliances
            .write()
            .expect("alliance lock")
            .set_neutral(id, other, self.notifier.as_ref())
    }

    /// Both sides of the mirror land under one write lock, so no reader
    /// can observe a half-declared war.
    pub fn declare_war(
        &self,
        id: AllianceId,
        other: AllianceId,
        now: u64,
    ) -> Result<(), DiplomacyError> {
        self.alliances
            .write()
            .expect("alliance lock")
            .declare_enemy(id, other, now, self.notifier.as_ref())
    }

    // --- Market surface ---

    pub fn place_order(&self, request: OrderRequest, now: u64) -> Result<TradeId, MarketError> {
        self.market.place_order(request, now)
    }

    pub fn market_listings(
        &self,
        resource: Resource,
        side: OrderSide,
        now: u64,
    ) -> Vec<TradeListing> {
        self.market.listings(resource, side, now)
    }

    pub fn process_market(&self, now: u64) -> Vec<TradeFill> {
        self.market.process(now)
    }
}
