mod alliance;
pub mod combat;
mod context;
pub mod grid;
mod map;
mod market;
mod notify;
mod rng;
mod store;
mod tile;

pub use crate::alliance::{
    Alliance, AllianceManager, DiplomacyError, Invite, Member, MembershipError,
    DEFAULT_MEMBER_LIMIT,
};
pub use crate::context::{CitySummary, ClientDirectory, ClientProfile, WorldContext};
pub use crate::map::{MapError, WorldMap, ZoneStats, MAX_RANGE_SPAN};
pub use crate::market::{
    Market, MarketError, MarketOrder, OrderRequest, DEFAULT_CACHE_TTL_MS,
};
pub use crate::notify::{Notifier, NullNotifier, RecordingNotifier};
pub use crate::rng::GameRng;
pub use crate::store::{
    join_ids, join_members, parse_ids, parse_members, AllianceRow, AllianceStore,
    MemoryAllianceStore, PersistError,
};
pub use crate::tile::Tile;
