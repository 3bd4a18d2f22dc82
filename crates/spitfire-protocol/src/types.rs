use serde::{Deserialize, Serialize};

/// Tile terrain/occupancy kind. Discriminants are part of the map encoding
/// (one hex nibble per tile) and must stay within `0..=15`.
///
/// Kinds at `Flat` and above are occupiable; kinds above `CITY_TIER_MIN`
/// are improved city tiles that carry a city reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum TileKind {
    Water = 1,
    Forest = 2,
    Desert = 3,
    Hill = 4,
    Swamp = 5,
    Flat = 10,
    NpcCamp = 11,
    Castle = 12,
}

/// Kinds strictly above this value are city-tier.
pub const CITY_TIER_MIN: u8 = 10;

impl TileKind {
    #[inline]
    pub fn is_occupiable(self) -> bool {
        self as u8 >= TileKind::Flat as u8
    }

    #[inline]
    pub fn is_flat(self) -> bool {
        self == TileKind::Flat
    }

    /// Improved/occupied tile carrying a city object.
    #[inline]
    pub fn is_city_tier(self) -> bool {
        self as u8 > CITY_TIER_MIN
    }

    /// Lower hex nibble used by the compact map string.
    #[inline]
    pub fn nibble(self) -> char {
        char::from_digit(self as u32, 16).expect("tile kinds fit in one nibble")
    }
}

/// Diplomatic relation between a requesting client and a tile owner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Relation {
    #[default]
    NoRelation = 0,
    Own = 1,
    SameAlliance = 2,
    Ally = 3,
    Neutral = 4,
    Enemy = 5,
}

/// What the viewer may do against a tile, derived purely from [`Relation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFlags {
    pub can_loot: bool,
    pub can_occupy: bool,
    pub can_scout: bool,
    pub can_send: bool,
    pub can_trans: bool,
}

impl ActionFlags {
    /// Fixed lookup, not per-tile logic: friendly tiles accept reinforcement
    /// and transport but refuse aggression; hostile tiles accept everything;
    /// strangers can be raided but not reinforced.
    pub const fn for_relation(relation: Relation) -> ActionFlags {
        match relation {
            Relation::Own | Relation::Ally | Relation::SameAlliance => ActionFlags {
                can_loot: false,
                can_occupy: false,
                can_scout: false,
                can_send: true,
                can_trans: true,
            },
            Relation::Enemy => ActionFlags {
                can_loot: true,
                can_occupy: true,
                can_scout: true,
                can_send: true,
                can_trans: true,
            },
            Relation::Neutral | Relation::NoRelation => ActionFlags {
                can_loot: true,
                can_occupy: true,
                can_scout: true,
                can_send: false,
                can_trans: false,
            },
        }
    }
}

/// Display names for the 16 map zones, row-major from the north-west corner.
pub const ZONE_NAMES: [&str; 16] = [
    "Northreach",
    "Coldharbor",
    "Ironvale",
    "Stormwatch",
    "Westmere",
    "Silverpine",
    "Midlands",
    "Easterly",
    "Greywater",
    "Thornfield",
    "Goldenplain",
    "Duskmoor",
    "Southmarch",
    "Emberfall",
    "Redcliff",
    "Saltcoast",
];

/// Tradeable resource kinds on the open market.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Food,
    Wood,
    Stone,
    Iron,
}

impl Resource {
    pub const ALL: [Resource; 4] = [Resource::Food, Resource::Wood, Resource::Stone, Resource::Iron];
}

/// Which side of the book an order rests on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}
