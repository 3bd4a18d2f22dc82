//! The dependency seam between this core and the rest of the game server.
//!
//! Every operation here needs the grid size and client/city lookup; rather
//! than a process-wide singleton, components receive a [`WorldContext`]
//! reference and resolve ids on demand. Back-references (tile -> owner,
//! client -> alliance) stay non-owning: an id plus a resolver call.

use std::collections::HashMap;
use std::sync::RwLock;

use spitfire_protocol::{AllianceId, CityId, ClientId};

/// Snapshot of a player account, as map views need it.
#[derive(Clone, Debug, Default)]
pub struct ClientProfile {
    pub id: ClientId,
    pub name: String,
    pub prestige: i64,
    pub honor: i64,
    pub flag: String,
    pub logo_url: String,
    pub status: i32,
    /// Beginner protection / vacation mode.
    pub beginner: bool,
    pub alliance: Option<AllianceId>,
    pub alliance_name: Option<String>,
}

/// Snapshot of a city, as map views need it.
#[derive(Clone, Debug)]
pub struct CitySummary {
    pub id: CityId,
    pub name: String,
    pub status: i32,
    pub level: u8,
}

/// World lookups owned by the surrounding server.
///
/// Resolvers return owned snapshots; a miss means the entity is gone (the
/// dangling-owner case map views must survive), never a hard error.
pub trait WorldContext {
    fn grid_size(&self) -> u32;
    fn client(&self, id: ClientId) -> Option<ClientProfile>;
    fn client_by_name(&self, name: &str) -> Option<ClientProfile>;
    fn city(&self, id: CityId) -> Option<CitySummary>;
}

/// In-memory [`WorldContext`] used by the server shell and tests.
#[derive(Debug)]
pub struct ClientDirectory {
    grid_size: u32,
    clients: RwLock<HashMap<ClientId, ClientProfile>>,
    by_name: RwLock<HashMap<String, ClientId>>,
    cities: RwLock<HashMap<CityId, CitySummary>>,
}

impl ClientDirectory {
    pub fn new(grid_size: u32) -> ClientDirectory {
        ClientDirectory {
            grid_size,
            clients: RwLock::new(HashMap::new()),
            by_name: RwLock::new(HashMap::new()),
            cities: RwLock::new(HashMap::new()),
        }
    }

    pub fn upsert_client(&self, profile: ClientProfile) {
        let mut by_name = self.by_name.write().expect("directory lock");
        let mut clients = self.clients.write().expect("directory lock");
        if let Some(previous) = clients.get(&profile.id) {
            by_name.remove(&previous.name);
        }
        by_name.insert(profile.name.clone(), profile.id);
        clients.insert(profile.id, profile);
    }

    pub fn remove_client(&self, id: ClientId) -> Option<ClientProfile> {
        let mut by_name = self.by_name.write().expect("directory lock");
        let removed = self.clients.write().expect("directory lock").remove(&id);
        if let Some(profile) = &removed {
            by_name.remove(&profile.name);
        }
        removed
    }

    pub fn upsert_city(&self, city: CitySummary) {
        self.cities.write().expect("directory lock").insert(city.id, city);
    }

    pub fn remove_city(&self, id: CityId) -> Option<CitySummary> {
        self.cities.write().expect("directory lock").remove(&id)
    }

    /// Record that a client joined or left an alliance, keeping the cached
    /// alliance name in step.
    pub fn set_client_alliance(
        &self,
        id: ClientId,
        alliance: Option<AllianceId>,
        alliance_name: Option<String>,
    ) {
        if let Some(profile) = self.clients.write().expect("directory lock").get_mut(&id) {
            profile.alliance = alliance;
            profile.alliance_name = alliance_name;
        }
    }
}

impl WorldContext for ClientDirectory {
    fn grid_size(&self) -> u32 {
        self.grid_size
    }

    fn client(&self, id: ClientId) -> Option<ClientProfile> {
        self.clients.read().expect("directory lock").get(&id).cloned()
    }

    fn client_by_name(&self, name: &str) -> Option<ClientProfile> {
        let id = *self.by_name.read().expect("directory lock").get(name)?;
        self.client(id)
    }

    fn city(&self, id: CityId) -> Option<CitySummary> {
        self.cities.read().expect("directory lock").get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_updates_name_index() {
        let directory = ClientDirectory::new(100);
        directory.upsert_client(ClientProfile {
            id: ClientId(1),
            name: "Aldric".into(),
            ..ClientProfile::default()
        });
        directory.upsert_client(ClientProfile {
            id: ClientId(1),
            name: "Aldric II".into(),
            ..ClientProfile::default()
        });

        assert!(directory.client_by_name("Aldric").is_none());
        assert_eq!(directory.client_by_name("Aldric II").unwrap().id, ClientId(1));
    }

    #[test]
    fn missing_ids_resolve_to_none() {
        let directory = ClientDirectory::new(100);
        assert!(directory.client(ClientId(9)).is_none());
        assert!(directory.city(CityId(9)).is_none());
    }
}
