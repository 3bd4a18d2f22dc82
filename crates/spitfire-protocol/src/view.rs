//! Response view objects handed to the external serializer.
//!
//! These are plain data: the packet layer turns them into wire bytes via
//! [`crate::wire`], the core never touches transport framing itself.

use serde::{Deserialize, Serialize};

use crate::{ActionFlags, AllianceId, ClientId, OrderSide, Relation, Resource, TileId, TradeId};

/// Player-owned details of an occupied tile inside a range response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerCityView {
    pub user_name: String,
    pub prestige: i64,
    pub honor: i64,
    pub flag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alliance_name: Option<String>,
    pub relation: Relation,
    pub actions: ActionFlags,
    pub logo_url: String,
    pub zone_name: String,
    /// Beginner-protection / vacation flag; such cities cannot be attacked.
    pub furlough: bool,
}

/// One occupied city inside a range response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CityView {
    pub id: TileId,
    pub name: String,
    pub status: i32,
    pub npc: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerCityView>,
}

/// Result of a rectangular map query.
///
/// `ok == 1` carries `map_str` (two hex nibbles per tile, row-major) plus one
/// [`CityView`] per city-tier tile; `ok == -1` carries `error_msg` and empty
/// payload fields so the response shape survives validation failures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeView {
    pub x1: i32,
    pub x2: i32,
    pub y1: i32,
    pub y2: i32,
    pub ok: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    pub map_str: String,
    pub castles: Vec<CityView>,
    pub package_id: f64,
}

impl RangeView {
    pub fn error(x1: i32, x2: i32, y1: i32, y2: i32, msg: impl Into<String>) -> RangeView {
        RangeView {
            x1,
            x2,
            y1,
            y2,
            ok: -1,
            error_msg: Some(msg.into()),
            map_str: String::new(),
            castles: Vec::new(),
            package_id: 0.0,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok == 1
    }
}

/// Owner details of a single inspected tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileOwnerView {
    pub user_name: String,
    pub prestige: i64,
    pub honor: i64,
    pub flag: String,
    pub status: i32,
    pub relation: Relation,
    pub furlough: bool,
}

/// Single-tile inspection result.
///
/// Unowned tiles and npc camps carry no `owner`; npc camps still expose the
/// camp name. City-tier player tiles additionally expose the city name and
/// owner logo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileView {
    pub id: TileId,
    pub zone_name: String,
    pub npc: bool,
    pub alliance_name: String,
    pub actions: ActionFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<TileOwnerView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl TileView {
    /// Neutral view of an unowned tile: no owner, stranger action flags.
    pub fn unowned(id: TileId, zone_name: impl Into<String>) -> TileView {
        TileView {
            id,
            zone_name: zone_name.into(),
            npc: false,
            alliance_name: String::new(),
            actions: ActionFlags::for_relation(Relation::NoRelation),
            owner: None,
            city_name: None,
            logo_url: None,
        }
    }
}

/// Public summary of an alliance, shown in rankings and embassy screens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllianceInfo {
    pub id: AllianceId,
    pub name: String,
    pub creator_name: String,
    pub leader_name: String,
    pub note: String,
    pub intro: String,
    pub prestige: i64,
    pub rank: u32,
    pub member_count: u32,
    pub member_limit: u32,
}

/// One resting order as shown to market browsers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeListing {
    pub trade_id: TradeId,
    pub resource: Resource,
    pub side: OrderSide,
    pub amount: u64,
    pub price: u64,
    pub placed_at: u64,
}

/// An executed cross between one buy and one sell order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFill {
    pub resource: Resource,
    pub amount: u64,
    /// Execution price: the resting sell-side price.
    pub price: u64,
    pub buyer: ClientId,
    pub seller: ClientId,
    pub buy_trade_id: TradeId,
    pub sell_trade_id: TradeId,
}
