//! World map: tile store, per-zone statistics, and the range query service.
//!
//! The map owns every tile for the lifetime of the world. Zone aggregates
//! and the open-tile allocation pools are rebuilt by [`WorldMap::rescan`],
//! a cold O(size^2) pass driven from a periodic task, never per-request.

use thiserror::Error;
use tracing::warn;

use spitfire_protocol::{
    ActionFlags, CityId, CityView, ClientId, PlayerCityView, RangeView, Relation, TileId, TileKind,
    TileOwnerView, TileView, ZoneId, ZONE_NAMES,
};

use crate::alliance::AllianceManager;
use crate::context::{CitySummary, WorldContext};
use crate::grid::{self, ZONE_COUNT};
use crate::rng::GameRng;
use crate::tile::Tile;

/// Load-protection cap on range queries: spans above this are rejected on
/// every code path, so a response never covers more than 21x21 tiles.
pub const MAX_RANGE_SPAN: i32 = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("map size {0} cannot be split into 4 zone bands per axis")]
    InvalidSize(u32),
    #[error("tile {0:?} is outside the grid")]
    UnknownTile(TileId),
    #[error("tile {0:?} is not open for settlement")]
    NotOpen(TileId),
}

/// Derived per-zone summary shown on the region-select screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZoneStats {
    pub number_cities: u32,
    /// Occupied share of occupiable tiles, integer percent.
    pub player_rate: u32,
    pub players: u32,
}

pub struct WorldMap {
    size: u32,
    tiles: Vec<Tile>,
    occupiable: [u32; ZONE_COUNT],
    total_flats: [u32; ZONE_COUNT],
    open_flats: [u32; ZONE_COUNT],
    occupied: [u32; ZONE_COUNT],
    cities: [u32; ZONE_COUNT],
    npcs: [u32; ZONE_COUNT],
    stats: [ZoneStats; ZONE_COUNT],
    open_pool: [Vec<TileId>; ZONE_COUNT],
}

impl WorldMap {
    /// Build a `size * size` grid of `default_kind` tiles.
    ///
    /// `size` must be positive and divisible by 4 so the 16 zones cover
    /// equal bands on both axes.
    pub fn new(size: u32, default_kind: TileKind) -> Result<WorldMap, MapError> {
        if size == 0 || size % 4 != 0 {
            return Err(MapError::InvalidSize(size));
        }

        let mut tiles = Vec::with_capacity((size * size) as usize);
        for y in 0..size as i32 {
            for x in 0..size as i32 {
                let id = grid::tile_id(x, y, size);
                let zone = grid::zone_of(x, y, size).expect("constructor coords are normalized");
                tiles.push(Tile::new(id, zone, default_kind));
            }
        }

        Ok(WorldMap {
            size,
            tiles,
            occupiable: [0; ZONE_COUNT],
            total_flats: [0; ZONE_COUNT],
            open_flats: [0; ZONE_COUNT],
            occupied: [0; ZONE_COUNT],
            cities: [0; ZONE_COUNT],
            npcs: [0; ZONE_COUNT],
            stats: [ZoneStats::default(); ZONE_COUNT],
            open_pool: std::array::from_fn(|_| Vec::new()),
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.0 as usize)
    }

    pub fn zone_stats(&self, zone: ZoneId) -> ZoneStats {
        self.stats[zone.0 as usize]
    }

    pub fn open_flats(&self, zone: ZoneId) -> u32 {
        self.open_flats[zone.0 as usize]
    }

    pub fn occupiable_tiles(&self, zone: ZoneId) -> u32 {
        self.occupiable[zone.0 as usize]
    }

    pub fn occupied_tiles(&self, zone: ZoneId) -> u32 {
        self.occupied[zone.0 as usize]
    }

    pub fn total_flats(&self, zone: ZoneId) -> u32 {
        self.total_flats[zone.0 as usize]
    }

    /// Paint terrain during world load. City-tier kinds go through
    /// [`WorldMap::found_city`] / [`WorldMap::spawn_npc_camp`] instead.
    pub fn set_terrain(&mut self, id: TileId, kind: TileKind, level: u8) -> Result<(), MapError> {
        let tile = self.tiles.get_mut(id.0 as usize).ok_or(MapError::UnknownTile(id))?;
        tile.kind = kind;
        tile.level = level;
        tile.owner = ClientId::NONE;
        tile.city = None;
        tile.npc = false;
        Ok(())
    }

    /// Stamp an owner onto an allocated flat before its city exists.
    ///
    /// Allocation hands out soft state; claiming the owner immediately is
    /// what keeps a second settler from landing on the same tile between
    /// rescans.
    pub fn reserve_tile(&mut self, id: TileId, owner: ClientId) -> Result<(), MapError> {
        let tile = self.tiles.get_mut(id.0 as usize).ok_or(MapError::UnknownTile(id))?;
        if !tile.is_open_flat() {
            return Err(MapError::NotOpen(id));
        }
        tile.owner = owner;
        Ok(())
    }

    /// Claim a flat for a player city. The tile must be open or already
    /// reserved by the same owner.
    ///
    /// Zone aggregates and the open pool stay stale until the next rescan;
    /// callers that got the id from [`WorldMap::allocate_open_tile`] have
    /// already consumed the pool entry.
    pub fn found_city(&mut self, id: TileId, owner: ClientId, city: CityId) -> Result<(), MapError> {
        let tile = self.tiles.get_mut(id.0 as usize).ok_or(MapError::UnknownTile(id))?;
        if !tile.kind.is_flat() || (!tile.owner.is_none() && tile.owner != owner) {
            return Err(MapError::NotOpen(id));
        }
        tile.kind = TileKind::Castle;
        tile.owner = owner;
        tile.city = Some(city);
        tile.npc = false;
        tile.level = 1;
        Ok(())
    }

    /// Place a barbarian camp on an open flat.
    pub fn spawn_npc_camp(&mut self, id: TileId, city: CityId, level: u8) -> Result<(), MapError> {
        let tile = self.tiles.get_mut(id.0 as usize).ok_or(MapError::UnknownTile(id))?;
        if !tile.is_open_flat() {
            return Err(MapError::NotOpen(id));
        }
        tile.kind = TileKind::NpcCamp;
        tile.city = Some(city);
        tile.npc = true;
        tile.level = level;
        Ok(())
    }

    /// Return a razed city tile to the open pool (effective after rescan).
    pub fn raze_city(&mut self, id: TileId) -> Result<(), MapError> {
        let tile = self.tiles.get_mut(id.0 as usize).ok_or(MapError::UnknownTile(id))?;
        tile.kind = TileKind::Flat;
        tile.level = 0;
        tile.owner = ClientId::NONE;
        tile.city = None;
        tile.npc = false;
        Ok(())
    }

    /// Full O(size^2) pass recomputing every zone aggregate and rebuilding
    /// the open-tile pools.
    pub fn rescan(&mut self) {
        self.occupiable = [0; ZONE_COUNT];
        self.total_flats = [0; ZONE_COUNT];
        self.open_flats = [0; ZONE_COUNT];
        self.occupied = [0; ZONE_COUNT];
        self.cities = [0; ZONE_COUNT];
        self.npcs = [0; ZONE_COUNT];
        for pool in &mut self.open_pool {
            pool.clear();
        }

        for tile in &self.tiles {
            if !tile.kind.is_occupiable() {
                continue;
            }
            let zone = tile.zone.0 as usize;
            self.occupiable[zone] += 1;
            if tile.kind.is_flat() {
                self.total_flats[zone] += 1;
                if tile.owner.is_none() {
                    self.open_flats[zone] += 1;
                    self.open_pool[zone].push(tile.id);
                } else {
                    self.occupied[zone] += 1;
                }
            } else {
                self.occupied[zone] += 1;
                if tile.kind == TileKind::Castle {
                    self.cities[zone] += 1;
                } else {
                    self.npcs[zone] += 1;
                }
            }
        }

        for zone in 0..ZONE_COUNT {
            self.stats[zone] = ZoneStats {
                number_cities: self.cities[zone] + self.npcs[zone],
                player_rate: if self.occupiable[zone] > 0 {
                    self.occupied[zone] * 100 / self.occupiable[zone]
                } else {
                    0
                },
                players: self.cities[zone],
            };
        }
    }

    /// Pop a uniformly random open tile from the zone's pool.
    ///
    /// Handed-out ids are soft state: the caller is expected to claim the
    /// tile immediately, and the pool is only trustworthy again after the
    /// next rescan.
    pub fn allocate_open_tile(&mut self, zone: ZoneId, rng: &mut GameRng) -> Option<TileId> {
        let pool = self.open_pool.get_mut(zone.0 as usize)?;
        if self.open_flats[zone.0 as usize] == 0 || pool.is_empty() {
            return None;
        }
        let index = rng.gen_index(pool.len());
        let id = pool.swap_remove(index);
        self.open_flats[zone.0 as usize] -= 1;
        Some(id)
    }

    /// Answer a rectangular map query for `requester`.
    ///
    /// The rectangle may be out of order (rejected), out of range
    /// (normalized, wrapping around the torus) or too large (rejected on
    /// both the wrap and non-wrap paths). Successful responses carry the
    /// compact two-nibble-per-tile encoding plus one [`CityView`] per
    /// city-tier tile in scan order.
    pub fn query_range(
        &self,
        requester: ClientId,
        x1: i32,
        x2: i32,
        y1: i32,
        y2: i32,
        ctx: &dyn WorldContext,
        alliances: &AllianceManager,
    ) -> RangeView {
        let (ox1, ox2, oy1, oy2) = (x1, x2, y1, y2);
        if x1 > x2 || y1 > y2 {
            return RangeView::error(ox1, ox2, oy1, oy2, "malformed range rectangle");
        }

        let size = self.size as i32;
        let (mut x1, mut x2, mut y1, mut y2) = (x1, x2, y1, y2);

        // Pull each axis back within one wrap of the origin. When both
        // endpoints are out of range the whole window shifts; when only the
        // upper endpoint is, the window straddles the seam and the lower
        // bound goes negative.
        if x1.abs() >= size && x2.abs() >= size {
            x1 %= size;
            x2 %= size;
        } else if x2.abs() >= size {
            x1 -= size;
            x2 %= size;
        }
        if y1.abs() >= size && y2.abs() >= size {
            y1 %= size;
            y2 %= size;
        } else if y2.abs() >= size {
            y1 -= size;
            y2 %= size;
        }

        let width = x2 - x1;
        let height = y2 - y1;
        if x1 < 0 || y1 < 0 {
            if width <= 0 || height <= 0 || width > MAX_RANGE_SPAN || height > MAX_RANGE_SPAN {
                return RangeView::error(ox1, ox2, oy1, oy2, "out of range");
            }
        } else if width > MAX_RANGE_SPAN || height > MAX_RANGE_SPAN {
            return RangeView::error(ox1, ox2, oy1, oy2, "out of range");
        }

        let mut map_str = String::with_capacity(((width + 1) * (height + 1) * 2) as usize);
        let mut castles = Vec::new();

        for y in y1..=y2 {
            for x in x1..=x2 {
                let id = grid::tile_id(x, y, self.size);
                let tile = &self.tiles[id.0 as usize];

                if tile.kind.is_city_tier() {
                    if let Some(city) = tile.city.and_then(|cid| ctx.city(cid)) {
                        castles.push(self.city_view(tile, &city, requester, ctx, alliances));
                        map_str.push(tile.kind.nibble());
                        map_str.push(level_nibble(city.level));
                        continue;
                    }
                    warn!(
                        tile = tile.id.0,
                        "city-tier tile without a resolvable city, encoding as terrain"
                    );
                }
                map_str.push(tile.kind.nibble());
                map_str.push(level_nibble(tile.level));
            }
        }

        RangeView {
            x1: ox1,
            x2: ox2,
            y1: oy1,
            y2: oy2,
            ok: 1,
            error_msg: None,
            map_str,
            castles,
            package_id: 0.0,
        }
    }

    fn city_view(
        &self,
        tile: &Tile,
        city: &CitySummary,
        requester: ClientId,
        ctx: &dyn WorldContext,
        alliances: &AllianceManager,
    ) -> CityView {
        let mut view = CityView {
            id: tile.id,
            name: city.name.clone(),
            status: city.status,
            npc: tile.npc,
            player: None,
        };

        if !tile.npc {
            if let Some(client) = ctx.client(tile.owner) {
                let relation = alliances.relation(requester, tile.owner, ctx);
                view.status = client.status;
                view.player = Some(PlayerCityView {
                    user_name: client.name,
                    prestige: client.prestige,
                    honor: client.honor,
                    flag: client.flag,
                    alliance_name: client.alliance_name,
                    relation,
                    actions: ActionFlags::for_relation(relation),
                    logo_url: client.logo_url,
                    zone_name: ZONE_NAMES[tile.zone.0 as usize].to_string(),
                    furlough: client.beginner,
                });
            } else {
                warn!(
                    tile = tile.id.0,
                    owner = tile.owner.0,
                    "player city with a dangling owner in range view"
                );
            }
        }

        view
    }

    /// Single-tile inspection.
    ///
    /// A tile recording an owner that no longer resolves is healed in place
    /// to an unowned flat (stale persistence rows must not fault a query)
    /// and answered with a neutral view.
    pub fn tile_view(
        &mut self,
        field: TileId,
        requester: ClientId,
        ctx: &dyn WorldContext,
        alliances: &AllianceManager,
    ) -> Result<TileView, MapError> {
        let tile = self
            .tiles
            .get_mut(field.0 as usize)
            .ok_or(MapError::UnknownTile(field))?;
        let zone_name = ZONE_NAMES[tile.zone.0 as usize].to_string();

        if !tile.owner.is_none() {
            let Some(client) = ctx.client(tile.owner) else {
                warn!(
                    tile = field.0,
                    owner = tile.owner.0,
                    "dangling tile owner, downgrading to open flat"
                );
                tile.kind = TileKind::Flat;
                tile.level = 0;
                tile.owner = ClientId::NONE;
                tile.city = None;
                tile.npc = false;
                return Ok(TileView::unowned(field, zone_name));
            };

            let relation = alliances.relation(requester, tile.owner, ctx);
            let (city_name, logo_url) = if tile.kind.is_city_tier() {
                (
                    tile.city.and_then(|cid| ctx.city(cid)).map(|c| c.name),
                    Some(client.logo_url.clone()),
                )
            } else {
                (None, None)
            };

            return Ok(TileView {
                id: field,
                zone_name,
                npc: false,
                alliance_name: client.alliance_name.clone().unwrap_or_default(),
                actions: ActionFlags::for_relation(relation),
                owner: Some(TileOwnerView {
                    user_name: client.name,
                    prestige: client.prestige,
                    honor: client.honor,
                    flag: client.flag,
                    status: client.status,
                    relation,
                    furlough: client.beginner,
                }),
                city_name,
                logo_url,
            });
        }

        if tile.npc {
            return Ok(TileView {
                id: field,
                zone_name,
                npc: true,
                alliance_name: String::new(),
                actions: ActionFlags::for_relation(Relation::NoRelation),
                owner: None,
                city_name: tile.city.and_then(|cid| ctx.city(cid)).map(|c| c.name),
                logo_url: None,
            });
        }

        Ok(TileView::unowned(field, zone_name))
    }
}

#[inline]
fn level_nibble(level: u8) -> char {
    char::from_digit(u32::from(level & 0x0f), 16).expect("masked to one nibble")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CitySummary, ClientDirectory, ClientProfile};

    const DAY_MS: u64 = 24 * 60 * 60 * 1000;

    fn empty_alliances() -> AllianceManager {
        AllianceManager::new(500, DAY_MS)
    }

    fn directory(size: u32) -> ClientDirectory {
        ClientDirectory::new(size)
    }

    fn add_client(directory: &ClientDirectory, id: u64, name: &str) {
        directory.upsert_client(ClientProfile {
            id: ClientId(id),
            name: name.into(),
            prestige: 1200,
            honor: 40,
            flag: "azure".into(),
            logo_url: format!("faces/{id}.png"),
            status: 1,
            beginner: false,
            alliance: None,
            alliance_name: None,
        });
    }

    fn add_city(directory: &ClientDirectory, id: u64, name: &str, level: u8) {
        directory.upsert_city(CitySummary {
            id: CityId(id),
            name: name.into(),
            status: 0,
            level,
        });
    }

    #[test]
    fn size_must_split_into_zone_bands() {
        assert_eq!(WorldMap::new(0, TileKind::Flat).err(), Some(MapError::InvalidSize(0)));
        assert_eq!(WorldMap::new(30, TileKind::Flat).err(), Some(MapError::InvalidSize(30)));
        assert!(WorldMap::new(32, TileKind::Flat).is_ok());
    }

    #[test]
    fn rescan_accounts_every_occupiable_tile() {
        let mut map = WorldMap::new(32, TileKind::Flat).unwrap();
        map.set_terrain(TileId(0), TileKind::Forest, 2).unwrap();
        map.set_terrain(TileId(1), TileKind::Water, 0).unwrap();
        map.found_city(TileId(2), ClientId(7), CityId(1)).unwrap();
        map.spawn_npc_camp(TileId(3), CityId(2), 5).unwrap();
        map.rescan();

        let zone = ZoneId(0);
        // Zone 0 is 8x8 = 64 tiles; two became terrain, two became cities.
        assert_eq!(map.occupiable_tiles(zone), 62);
        assert_eq!(map.total_flats(zone), 60);
        assert_eq!(map.open_flats(zone), 60);
        assert_eq!(map.occupied_tiles(zone), 2);
        assert_eq!(
            map.open_flats(zone) + map.occupied_tiles(zone),
            map.occupiable_tiles(zone)
        );

        let stats = map.zone_stats(zone);
        assert_eq!(stats.number_cities, 2);
        assert_eq!(stats.players, 1);
        assert_eq!(stats.player_rate, 2 * 100 / 62);
    }

    #[test]
    fn reserved_flats_count_as_occupied() {
        let mut map = WorldMap::new(32, TileKind::Flat).unwrap();
        map.rescan();

        let mut rng = GameRng::seed_from_u64(3);
        let tile = map.allocate_open_tile(ZoneId(0), &mut rng).unwrap();
        map.reserve_tile(tile, ClientId(9)).unwrap();
        map.rescan();

        let zone = ZoneId(0);
        assert_eq!(map.total_flats(zone), 64);
        assert_eq!(map.open_flats(zone), 63);
        assert_eq!(map.occupied_tiles(zone), 1);
        assert_eq!(
            map.open_flats(zone) + map.occupied_tiles(zone),
            map.occupiable_tiles(zone)
        );

        // A different settler cannot take the reserved tile, its owner can.
        assert_eq!(
            map.found_city(tile, ClientId(4), CityId(2)),
            Err(MapError::NotOpen(tile))
        );
        map.found_city(tile, ClientId(9), CityId(2)).unwrap();
        assert_eq!(map.tile(tile).unwrap().kind, TileKind::Castle);
    }

    #[test]
    fn player_rate_survives_zone_with_no_occupiable_tiles() {
        let mut map = WorldMap::new(32, TileKind::Water).unwrap();
        map.rescan();
        assert_eq!(map.zone_stats(ZoneId(0)).player_rate, 0);
    }

    #[test]
    fn allocation_is_unique_until_exhausted() {
        let mut map = WorldMap::new(32, TileKind::Water).unwrap();
        // Give zone 0 exactly three open flats.
        for id in [TileId(0), TileId(1), TileId(2)] {
            map.set_terrain(id, TileKind::Flat, 0).unwrap();
        }
        map.rescan();

        let mut rng = GameRng::seed_from_u64(9);
        let mut seen = Vec::new();
        while let Some(id) = map.allocate_open_tile(ZoneId(0), &mut rng) {
            assert!(!seen.contains(&id), "allocator repeated {id:?}");
            seen.push(id);
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(map.allocate_open_tile(ZoneId(0), &mut rng), None);
        assert_eq!(map.open_flats(ZoneId(0)), 0);
    }

    #[test]
    fn rejects_out_of_order_rectangle() {
        let map = WorldMap::new(100, TileKind::Flat).unwrap();
        let view = map.query_range(
            ClientId(1),
            5,
            2,
            0,
            0,
            &directory(100),
            &empty_alliances(),
        );
        assert_eq!(view.ok, -1);
        assert!(view.error_msg.is_some());
        assert!(view.map_str.is_empty());
    }

    #[test]
    fn rejects_window_above_span_cap() {
        let map = WorldMap::new(100, TileKind::Flat).unwrap();
        let view = map.query_range(
            ClientId(1),
            0,
            24,
            0,
            24,
            &directory(100),
            &empty_alliances(),
        );
        assert_eq!(view.ok, -1);

        // Wrapping windows hit the same cap.
        let view = map.query_range(
            ClientId(1),
            -15,
            10,
            0,
            0,
            &directory(100),
            &empty_alliances(),
        );
        assert_eq!(view.ok, -1);
    }

    #[test]
    fn maximum_window_is_accepted() {
        let map = WorldMap::new(100, TileKind::Flat).unwrap();
        let view = map.query_range(
            ClientId(1),
            0,
            20,
            10,
            30,
            &directory(100),
            &empty_alliances(),
        );
        assert_eq!(view.ok, 1);
        assert_eq!(view.map_str.len(), 21 * 21 * 2);
    }

    #[test]
    fn wrap_query_visits_seam_tiles_in_order() {
        let mut map = WorldMap::new(100, TileKind::Flat).unwrap();
        // Mark the expected scan sequence with distinct levels.
        for (level, x) in [98i32, 99, 0, 1, 2, 3].into_iter().enumerate() {
            map.set_terrain(grid::tile_id(x, 0, 100), TileKind::Flat, level as u8 + 1)
                .unwrap();
        }

        let view = map.query_range(
            ClientId(1),
            -2,
            3,
            0,
            0,
            &directory(100),
            &empty_alliances(),
        );
        assert_eq!(view.ok, 1);
        assert_eq!(view.map_str, "a1a2a3a4a5a6");
    }

    #[test]
    fn fully_out_of_range_window_is_shifted_home() {
        let mut map = WorldMap::new(100, TileKind::Flat).unwrap();
        map.set_terrain(TileId(0), TileKind::Hill, 3).unwrap();

        // (100..102) on both axes lands on (0..2).
        let view = map.query_range(
            ClientId(1),
            100,
            102,
            100,
            102,
            &directory(100),
            &empty_alliances(),
        );
        assert_eq!(view.ok, 1);
        assert_eq!(view.map_str.len(), 3 * 3 * 2);
        assert!(view.map_str.starts_with("43"));
    }

    #[test]
    fn range_emits_city_views_with_relation_flags() {
        let mut map = WorldMap::new(100, TileKind::Flat).unwrap();
        let directory = directory(100);
        add_client(&directory, 7, "Roland");
        add_city(&directory, 1, "Hearthstead", 4);
        map.found_city(TileId(5), ClientId(7), CityId(1)).unwrap();

        let view = map.query_range(ClientId(3), 0, 9, 0, 0, &directory, &empty_alliances());
        assert_eq!(view.ok, 1);
        assert_eq!(view.castles.len(), 1);

        let castle = &view.castles[0];
        assert_eq!(castle.id, TileId(5));
        assert_eq!(castle.name, "Hearthstead");
        assert!(!castle.npc);
        let player = castle.player.as_ref().expect("player city carries details");
        assert_eq!(player.user_name, "Roland");
        assert_eq!(player.relation, Relation::NoRelation);
        assert!(player.actions.can_loot && !player.actions.can_send);
        assert_eq!(player.zone_name, "Northreach");

        // Castle kind nibble 'c' and the city's level, not the tile's.
        assert_eq!(&view.map_str[10..12], "c4");
    }

    #[test]
    fn npc_camps_are_flagged_and_carry_no_player() {
        let mut map = WorldMap::new(100, TileKind::Flat).unwrap();
        let directory = directory(100);
        add_city(&directory, 9, "Bandit Camp", 3);
        map.spawn_npc_camp(TileId(2), CityId(9), 3).unwrap();

        let view = map.query_range(ClientId(3), 0, 4, 0, 0, &directory, &empty_alliances());
        assert_eq!(view.castles.len(), 1);
        assert!(view.castles[0].npc);
        assert!(view.castles[0].player.is_none());
        assert_eq!(&view.map_str[4..6], "b3");
    }

    #[test]
    fn own_city_in_view_cannot_be_raided() {
        let mut map = WorldMap::new(100, TileKind::Flat).unwrap();
        let directory = directory(100);
        add_client(&directory, 7, "Roland");
        add_city(&directory, 1, "Hearthstead", 2);
        map.found_city(TileId(0), ClientId(7), CityId(1)).unwrap();

        let view = map.query_range(ClientId(7), 0, 4, 0, 0, &directory, &empty_alliances());
        let player = view.castles[0].player.as_ref().unwrap();
        assert_eq!(player.relation, Relation::Own);
        assert!(!player.actions.can_loot && player.actions.can_send);
    }

    #[test]
    fn tile_view_heals_dangling_owner() {
        let mut map = WorldMap::new(100, TileKind::Flat).unwrap();
        let directory = directory(100);
        add_city(&directory, 1, "Ghost Town", 2);
        // Owner 55 is never registered in the directory.
        map.found_city(TileId(10), ClientId(55), CityId(1)).unwrap();

        let alliances = empty_alliances();
        let view = map
            .tile_view(TileId(10), ClientId(3), &directory, &alliances)
            .unwrap();
        assert!(view.owner.is_none());
        assert_eq!(view.actions, ActionFlags::for_relation(Relation::NoRelation));

        let healed = map.tile(TileId(10)).unwrap();
        assert_eq!(healed.kind, TileKind::Flat);
        assert!(healed.owner.is_none());
        assert!(healed.city.is_none());
    }

    #[test]
    fn tile_view_of_player_city_carries_city_name_and_logo() {
        let mut map = WorldMap::new(100, TileKind::Flat).unwrap();
        let directory = directory(100);
        add_client(&directory, 7, "Roland");
        add_city(&directory, 1, "Hearthstead", 2);
        map.found_city(TileId(10), ClientId(7), CityId(1)).unwrap();

        let alliances = empty_alliances();
        let view = map
            .tile_view(TileId(10), ClientId(3), &directory, &alliances)
            .unwrap();
        assert_eq!(view.city_name.as_deref(), Some("Hearthstead"));
        assert_eq!(view.logo_url.as_deref(), Some("faces/7.png"));
        assert_eq!(view.owner.as_ref().unwrap().user_name, "Roland");
    }

    #[test]
    fn tile_view_rejects_unknown_id() {
        let mut map = WorldMap::new(32, TileKind::Flat).unwrap();
        let directory = directory(32);
        let alliances = empty_alliances();
        let err = map
            .tile_view(TileId(32 * 32), ClientId(1), &directory, &alliances)
            .unwrap_err();
        assert_eq!(err, MapError::UnknownTile(TileId(1024)));
    }
}
