//! Alliance persistence contract.
//!
//! The real database lives outside this core; alliances are saved as flat
//! rows with comma-joined relation lists and `clientid,rank` member pairs
//! joined by `|`. An in-memory store backs tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

use spitfire_protocol::{AllianceId, ClientId};

use crate::alliance::Member;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersistError {
    #[error("alliance {0:?} not found in store")]
    NotFound(AllianceId),
    #[error("row has no id yet")]
    MissingId,
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Flat persisted form of an alliance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllianceRow {
    /// `None` until the store assigns one on insert.
    pub id: Option<AllianceId>,
    pub name: String,
    pub founder: String,
    pub leader: String,
    pub created: u64,
    pub note: String,
    pub intro: String,
    pub motd: String,
    /// Comma-joined alliance ids.
    pub allies: String,
    pub neutrals: String,
    pub enemies: String,
    /// `clientid,rank` pairs joined by `|`.
    pub members: String,
}

pub trait AllianceStore: Send + Sync {
    fn insert(&self, row: &AllianceRow) -> Result<AllianceId, PersistError>;
    fn update(&self, row: &AllianceRow) -> Result<(), PersistError>;
    fn delete(&self, id: AllianceId) -> Result<(), PersistError>;
    fn load_all(&self) -> Result<Vec<AllianceRow>, PersistError>;
}

pub fn join_ids(ids: &[AllianceId]) -> String {
    let mut out = String::new();
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&id.0.to_string());
    }
    out
}

/// Parse a comma-joined id list, dropping unreadable tokens.
pub fn parse_ids(text: &str) -> Vec<AllianceId> {
    text.split(',')
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.trim().parse::<u32>() {
            Ok(raw) => Some(AllianceId(raw)),
            Err(_) => {
                warn!(token, "skipping unreadable alliance id in persisted row");
                None
            }
        })
        .collect()
}

pub fn join_members(members: &[Member]) -> String {
    let mut out = String::new();
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            out.push('|');
        }
        out.push_str(&member.client.0.to_string());
        out.push(',');
        out.push_str(&member.rank.to_string());
    }
    out
}

/// Parse `clientid,rank` pairs joined by `|`, dropping unreadable entries.
pub fn parse_members(text: &str) -> Vec<Member> {
    text.split('|')
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let (client, rank) = token.split_once(',')?;
            let client = client.trim().parse::<u64>().ok()?;
            let rank = rank.trim().parse::<u8>().ok()?;
            Some(Member {
                client: ClientId(client),
                rank,
            })
        })
        .collect()
}

/// HashMap-backed [`AllianceStore`] with store-assigned sequential ids.
#[derive(Debug, Default)]
pub struct MemoryAllianceStore {
    rows: Mutex<HashMap<AllianceId, AllianceRow>>,
    next_id: AtomicU32,
}

impl MemoryAllianceStore {
    pub fn new() -> MemoryAllianceStore {
        MemoryAllianceStore {
            rows: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().expect("store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AllianceStore for MemoryAllianceStore {
    fn insert(&self, row: &AllianceRow) -> Result<AllianceId, PersistError> {
        let id = AllianceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut stored = row.clone();
        stored.id = Some(id);
        self.rows.lock().expect("store lock").insert(id, stored);
        Ok(id)
    }

    fn update(&self, row: &AllianceRow) -> Result<(), PersistError> {
        let id = row.id.ok_or(PersistError::MissingId)?;
        let mut rows = self.rows.lock().expect("store lock");
        if !rows.contains_key(&id) {
            return Err(PersistError::NotFound(id));
        }
        rows.insert(id, row.clone());
        Ok(())
    }

    fn delete(&self, id: AllianceId) -> Result<(), PersistError> {
        self.rows
            .lock()
            .expect("store lock")
            .remove(&id)
            .map(|_| ())
            .ok_or(PersistError::NotFound(id))
    }

    fn load_all(&self) -> Result<Vec<AllianceRow>, PersistError> {
        Ok(self.rows.lock().expect("store lock").values().cloned().collect())
    }
}
