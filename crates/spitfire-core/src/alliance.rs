//! Alliance membership, invitations, and diplomacy.
//!
//! Relation lists are kept per alliance and are mutually exclusive: another
//! alliance's id lives in at most one of {allies, neutral, enemies} at any
//! time. Ally and neutral declarations are one-sided (the counterpart is
//! only notified); a war declaration mirrors the hostile state onto the
//! other alliance through an internal call that skips cooldown, broadcast
//! and further mirroring.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{error, info, warn};

use spitfire_protocol::{AllianceId, AllianceInfo, ClientId, Relation};

use crate::context::WorldContext;
use crate::notify::Notifier;
use crate::store::{
    join_ids, join_members, parse_ids, parse_members, AllianceRow, AllianceStore, PersistError,
};

pub const DEFAULT_MEMBER_LIMIT: u32 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Member {
    pub client: ClientId,
    pub rank: u8,
}

/// Pending join request. Expiry policy belongs to the caller, which is why
/// the request timestamp is stored verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invite {
    pub client: ClientId,
    pub name: String,
    pub requested_at: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MembershipError {
    #[error("client {0:?} is already a member")]
    AlreadyMember(ClientId),
    #[error("alliance is at member capacity")]
    CapacityExceeded,
    #[error("client {0:?} is not a member")]
    NotFound(ClientId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiplomacyError {
    #[error("alliance {0:?} does not exist")]
    UnknownAlliance(AllianceId),
    #[error("an alliance cannot declare a relation to itself")]
    SelfRelation,
    #[error("war declarations are on cooldown until {until}")]
    CooldownActive { until: u64 },
}

#[derive(Clone, Debug)]
pub struct Alliance {
    pub id: AllianceId,
    pub name: String,
    pub founder: String,
    pub leader: String,
    pub created: u64,
    pub note: String,
    pub intro: String,
    pub motd: String,
    pub prestige: i64,
    pub honor: i64,
    pub prestige_rank: u32,
    pub honor_rank: u32,
    pub members_rank: u32,
    pub city_count: u32,
    members: Vec<Member>,
    member_limit: u32,
    invites: Vec<Invite>,
    allies: Vec<AllianceId>,
    neutral: Vec<AllianceId>,
    enemies: Vec<AllianceId>,
    /// No new war declaration is permitted before this timestamp.
    enemy_cooldown_until: u64,
}

impl Alliance {
    pub fn new(
        id: AllianceId,
        name: impl Into<String>,
        founder: impl Into<String>,
        created: u64,
        member_limit: u32,
    ) -> Alliance {
        let founder = founder.into();
        Alliance {
            id,
            name: name.into(),
            leader: founder.clone(),
            founder,
            created,
            note: String::new(),
            intro: String::new(),
            motd: String::new(),
            prestige: 0,
            honor: 0,
            prestige_rank: 0,
            honor_rank: 0,
            members_rank: 0,
            city_count: 0,
            members: Vec::new(),
            member_limit,
            invites: Vec::new(),
            allies: Vec::new(),
            neutral: Vec::new(),
            enemies: Vec::new(),
            enemy_cooldown_until: 0,
        }
    }

    pub fn is_ally(&self, other: AllianceId) -> bool {
        self.allies.contains(&other)
    }

    pub fn is_neutral(&self, other: AllianceId) -> bool {
        self.neutral.contains(&other)
    }

    pub fn is_enemy(&self, other: AllianceId) -> bool {
        self.enemies.contains(&other)
    }

    pub fn allies(&self) -> &[AllianceId] {
        &self.allies
    }

    pub fn neutrals(&self) -> &[AllianceId] {
        &self.neutral
    }

    pub fn enemies(&self) -> &[AllianceId] {
        &self.enemies
    }

    pub fn enemy_cooldown_until(&self) -> u64 {
        self.enemy_cooldown_until
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_count(&self) -> u32 {
        self.members.len() as u32
    }

    pub fn member_ids(&self) -> Vec<ClientId> {
        self.members.iter().map(|m| m.client).collect()
    }

    pub fn has_member(&self, client: ClientId) -> bool {
        self.members.iter().any(|m| m.client == client)
    }

    pub fn add_member(&mut self, client: ClientId, rank: u8) -> Result<(), MembershipError> {
        if self.has_member(client) {
            return Err(MembershipError::AlreadyMember(client));
        }
        if self.member_count() >= self.member_limit {
            return Err(MembershipError::CapacityExceeded);
        }
        self.members.push(Member { client, rank });
        Ok(())
    }

    pub fn remove_member(&mut self, client: ClientId) -> Result<(), MembershipError> {
        let index = self
            .members
            .iter()
            .position(|m| m.client == client)
            .ok_or(MembershipError::NotFound(client))?;
        self.members.remove(index);
        Ok(())
    }

    pub fn request_join(&mut self, client: ClientId, name: impl Into<String>, requested_at: u64) {
        self.invites.push(Invite {
            client,
            name: name.into(),
            requested_at,
        });
    }

    pub fn cancel_join(&mut self, client: ClientId) -> bool {
        let before = self.invites.len();
        self.invites.retain(|invite| invite.client != client);
        self.invites.len() != before
    }

    pub fn cancel_join_by_name(&mut self, name: &str) -> bool {
        let before = self.invites.len();
        self.invites.retain(|invite| invite.name != name);
        self.invites.len() != before
    }

    pub fn invites(&self) -> &[Invite] {
        &self.invites
    }

    /// Public summary for embassy and ranking screens.
    pub fn info(&self) -> AllianceInfo {
        AllianceInfo {
            id: self.id,
            name: self.name.clone(),
            creator_name: self.founder.clone(),
            leader_name: self.leader.clone(),
            note: self.note.clone(),
            intro: self.intro.clone(),
            prestige: self.prestige,
            rank: self.prestige_rank,
            member_count: self.member_count(),
            member_limit: self.member_limit,
        }
    }

    pub fn to_row(&self) -> AllianceRow {
        AllianceRow {
            id: Some(self.id),
            name: self.name.clone(),
            founder: self.founder.clone(),
            leader: self.leader.clone(),
            created: self.created,
            note: self.note.clone(),
            intro: self.intro.clone(),
            motd: self.motd.clone(),
            allies: join_ids(&self.allies),
            neutrals: join_ids(&self.neutral),
            enemies: join_ids(&self.enemies),
            members: join_members(&self.members),
        }
    }

    /// Drop `other` from every relation list.
    fn unrelate(&mut self, other: AllianceId) {
        self.allies.retain(|id| *id != other);
        self.neutral.retain(|id| *id != other);
        self.enemies.retain(|id| *id != other);
    }
}

pub struct AllianceManager {
    alliances: HashMap<AllianceId, Alliance>,
    member_limit: u32,
    enemy_cooldown_ms: u64,
}

impl AllianceManager {
    pub fn new(member_limit: u32, enemy_cooldown_ms: u64) -> AllianceManager {
        AllianceManager {
            alliances: HashMap::new(),
            member_limit,
            enemy_cooldown_ms,
        }
    }

    pub fn get(&self, id: AllianceId) -> Option<&Alliance> {
        self.alliances.get(&id)
    }

    pub fn get_mut(&mut self, id: AllianceId) -> Option<&mut Alliance> {
        self.alliances.get_mut(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Alliance> {
        self.alliances.values().find(|a| a.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alliance> {
        self.alliances.values()
    }

    pub fn len(&self) -> usize {
        self.alliances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alliances.is_empty()
    }

    /// Create an alliance through the persistence store; the store assigns
    /// the id. Failures are logged and abort the creation.
    pub fn create(
        &mut self,
        name: &str,
        founder: &str,
        created: u64,
        store: &dyn AllianceStore,
    ) -> Result<AllianceId, PersistError> {
        let row = AllianceRow {
            id: None,
            name: name.into(),
            founder: founder.into(),
            leader: founder.into(),
            created,
            ..AllianceRow::default()
        };
        let id = store.insert(&row).map_err(|err| {
            error!(name, %err, "unable to create alliance");
            err
        })?;
        self.adopt(id, name, founder, created);
        Ok(id)
    }

    /// Register an alliance whose row the store has already inserted.
    ///
    /// Lets callers that hold the manager behind a lock run the blocking
    /// store insert first and take the lock only for this in-memory step.
    pub fn adopt(&mut self, id: AllianceId, name: &str, founder: &str, created: u64) {
        self.alliances
            .insert(id, Alliance::new(id, name, founder, created, self.member_limit));
    }

    /// Drop an alliance from the in-memory set (the row delete is the
    /// caller's responsibility, performed outside the manager lock).
    pub fn remove(&mut self, id: AllianceId) -> Option<Alliance> {
        self.alliances.remove(&id)
    }

    /// Persist an alliance's current state as a full row upsert.
    pub fn save(&self, id: AllianceId, store: &dyn AllianceStore) -> Result<(), PersistError> {
        let alliance = self.alliances.get(&id).ok_or(PersistError::NotFound(id))?;
        store.update(&alliance.to_row()).map_err(|err| {
            error!(alliance = id.0, %err, "alliance save failed");
            err
        })
    }

    pub fn disband(&mut self, id: AllianceId, store: &dyn AllianceStore) -> Result<(), PersistError> {
        store.delete(id).map_err(|err| {
            error!(alliance = id.0, %err, "alliance delete failed");
            err
        })?;
        self.alliances.remove(&id);
        Ok(())
    }

    /// Rebuild an alliance from a persisted row. Members whose client no
    /// longer resolves are dropped (the same stale-row tolerance the map
    /// applies to tile owners).
    pub fn load_row(
        &mut self,
        row: &AllianceRow,
        ctx: &dyn WorldContext,
    ) -> Result<AllianceId, PersistError> {
        let id = row.id.ok_or(PersistError::MissingId)?;
        let mut alliance = Alliance::new(id, &*row.name, &*row.founder, row.created, self.member_limit);
        alliance.leader = row.leader.clone();
        alliance.note = row.note.clone();
        alliance.intro = row.intro.clone();
        alliance.motd = row.motd.clone();
        alliance.allies = parse_ids(&row.allies);
        alliance.neutral = parse_ids(&row.neutrals);
        alliance.enemies = parse_ids(&row.enemies);

        for member in parse_members(&row.members) {
            if ctx.client(member.client).is_none() {
                warn!(
                    alliance = id.0,
                    client = member.client.0,
                    "dropping persisted member without a live account"
                );
                continue;
            }
            if let Err(err) = alliance.add_member(member.client, member.rank) {
                warn!(alliance = id.0, %err, "skipping persisted member");
            }
        }

        self.alliances.insert(id, alliance);
        Ok(id)
    }

    /// Declare `other` an ally of `id`. One-sided: only the calling side's
    /// relation lists change, the counterpart is merely notified.
    pub fn set_ally(
        &mut self,
        id: AllianceId,
        other: AllianceId,
        notifier: &dyn Notifier,
    ) -> Result<(), DiplomacyError> {
        self.set_friendly(id, other, notifier, true)
    }

    /// Declare `other` neutral to `id`. One-sided, like [`Self::set_ally`].
    pub fn set_neutral(
        &mut self,
        id: AllianceId,
        other: AllianceId,
        notifier: &dyn Notifier,
    ) -> Result<(), DiplomacyError> {
        self.set_friendly(id, other, notifier, false)
    }

    fn set_friendly(
        &mut self,
        id: AllianceId,
        other: AllianceId,
        notifier: &dyn Notifier,
        ally: bool,
    ) -> Result<(), DiplomacyError> {
        if id == other {
            return Err(DiplomacyError::SelfRelation);
        }
        if !self.alliances.contains_key(&other) {
            return Err(DiplomacyError::UnknownAlliance(other));
        }
        let alliance = self
            .alliances
            .get_mut(&id)
            .ok_or(DiplomacyError::UnknownAlliance(id))?;

        let already = if ally {
            alliance.is_ally(other)
        } else {
            alliance.is_neutral(other)
        };
        if already {
            return Ok(());
        }

        alliance.unrelate(other);
        if ally {
            alliance.allies.push(other);
        } else {
            alliance.neutral.push(other);
        }
        let name = alliance.name.clone();

        let counterpart = &self.alliances[&other];
        let stance = if ally { "Ally" } else { "Neutral" };
        notifier.alliance_message(
            &counterpart.member_ids(),
            &format!("Alliance [{name}] recognizes Diplomatic Relationship with us as {stance}."),
        );
        Ok(())
    }

    /// Declare war.
    ///
    /// One declaration produces mutual hostility: the enemy state is
    /// mirrored onto `other` through [`Self::enemy_internal`], which skips
    /// cooldown, broadcast and any further mirroring, so the exchange
    /// terminates after exactly one mirrored application. Re-declaring an
    /// existing war is a silent no-op with no duplicate broadcast.
    pub fn declare_enemy(
        &mut self,
        id: AllianceId,
        other: AllianceId,
        now: u64,
        notifier: &dyn Notifier,
    ) -> Result<(), DiplomacyError> {
        if id == other {
            return Err(DiplomacyError::SelfRelation);
        }
        if !self.alliances.contains_key(&other) {
            return Err(DiplomacyError::UnknownAlliance(other));
        }
        let alliance = self
            .alliances
            .get_mut(&id)
            .ok_or(DiplomacyError::UnknownAlliance(id))?;

        if alliance.is_enemy(other) {
            return Ok(());
        }
        if now < alliance.enemy_cooldown_until {
            return Err(DiplomacyError::CooldownActive {
                until: alliance.enemy_cooldown_until,
            });
        }

        alliance.enemy_cooldown_until = now + self.enemy_cooldown_ms;
        alliance.unrelate(other);
        alliance.enemies.push(other);
        let declarer = alliance.name.clone();

        self.enemy_internal(other, id);

        let counterpart = &self.alliances[&other];
        info!(
            declarer = id.0,
            target = other.0,
            "war declared between alliances"
        );
        notifier.broadcast(&format!(
            "Alliance {declarer} declares war against alliance {}. \
             Diplomatic Relationship between each other alters to Hostile automatically.",
            counterpart.name
        ));
        notifier.alliance_message(
            &counterpart.member_ids(),
            &format!("Alliance [{declarer}] recognizes Diplomatic Relationship with us as Enemy."),
        );
        Ok(())
    }

    /// Mirror half of a war declaration: relation lists only, no cooldown,
    /// no broadcast, no recursion.
    fn enemy_internal(&mut self, id: AllianceId, other: AllianceId) {
        let Some(alliance) = self.alliances.get_mut(&id) else {
            return;
        };
        if alliance.is_enemy(other) {
            return;
        }
        alliance.unrelate(other);
        alliance.enemies.push(other);
    }

    /// Diplomatic relation between two clients, for map visibility flags.
    pub fn relation(&self, viewer: ClientId, owner: ClientId, ctx: &dyn WorldContext) -> Relation {
        if viewer == owner {
            return Relation::Own;
        }

        let viewer_alliance = ctx.client(viewer).and_then(|c| c.alliance);
        let owner_alliance = ctx.client(owner).and_then(|c| c.alliance);
        let (Some(ours), Some(theirs)) = (viewer_alliance, owner_alliance) else {
            return Relation::NoRelation;
        };
        if ours == theirs {
            return Relation::SameAlliance;
        }

        let Some(alliance) = self.alliances.get(&ours) else {
            return Relation::NoRelation;
        };
        if alliance.is_ally(theirs) {
            Relation::Ally
        } else if alliance.is_enemy(theirs) {
            Relation::Enemy
        } else if alliance.is_neutral(theirs) {
            Relation::Neutral
        } else {
            Relation::NoRelation
        }
    }
}
