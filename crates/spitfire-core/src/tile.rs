use serde::{Deserialize, Serialize};

use spitfire_protocol::{CityId, ClientId, TileId, TileKind, ZoneId};

/// One grid cell. Allocated once for the grid's lifetime and mutated in
/// place as cities are founded and razed; `id` and `zone` never change.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub zone: ZoneId,
    pub kind: TileKind,
    pub level: u8,
    /// `ClientId::NONE` when unowned.
    pub owner: ClientId,
    /// Non-owning reference; resolved through the world context.
    pub city: Option<CityId>,
    pub npc: bool,
}

impl Tile {
    pub fn new(id: TileId, zone: ZoneId, kind: TileKind) -> Tile {
        Tile {
            id,
            zone,
            kind,
            level: 0,
            owner: ClientId::NONE,
            city: None,
            npc: false,
        }
    }

    #[inline]
    pub fn is_open_flat(&self) -> bool {
        self.kind.is_flat() && self.owner.is_none()
    }
}
