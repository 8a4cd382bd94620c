//! Per-process handle cache
//!
//! Maps `(process id, location)` to the handle reconstructed from the
//! container header at that location. Entries recorded under another pid
//! (for example by a parent before `fork`) are never returned and are
//! purged when the database notices the pid change. GC evicts every
//! reclaimed location.

use crate::database::Database;
use dashmap::DashMap;
use pongo_core::{ContainerHandle, ContainerKind, Location, PongoResult};
use serde::Serialize;

/// One pidcache entry, as reported by [`Database::pidcache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PidCacheEntry {
    /// Process that cached the handle
    pub pid: u32,
    /// Container header location
    pub location: Location,
    /// Generation recorded in the handle
    pub generation: u64,
    /// Container kind
    pub kind: ContainerKind,
}

/// `(pid, location) -> handle`
#[derive(Debug, Default)]
pub struct PidCache {
    entries: DashMap<(u32, Location), ContainerHandle>,
}

impl PidCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached handle for `location` under `pid`
    pub fn get(&self, pid: u32, location: Location) -> Option<ContainerHandle> {
        self.entries.get(&(pid, location)).map(|e| *e.value())
    }

    /// Record a handle under `pid`
    pub fn insert(&self, pid: u32, handle: ContainerHandle) {
        self.entries.insert((pid, handle.location), handle);
    }

    /// Drop every entry for `location`, whatever the pid; returns the count
    pub fn evict(&self, location: Location) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, loc), _| *loc != location);
        before - self.entries.len()
    }

    /// Drop every entry not recorded under `pid`; returns the count
    pub fn purge_foreign(&self, pid: u32) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(p, _), _| *p == pid);
        before - self.entries.len()
    }

    /// All entries ordered by pid then location
    pub fn snapshot(&self) -> Vec<PidCacheEntry> {
        let mut out: Vec<PidCacheEntry> = self
            .entries
            .iter()
            .map(|e| {
                let (pid, location) = *e.key();
                PidCacheEntry {
                    pid,
                    location,
                    generation: e.value().generation,
                    kind: e.value().kind,
                }
            })
            .collect();
        out.sort_by_key(|e| (e.pid, e.location));
        out
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Database {
    /// Diagnostic snapshot of the pidcache
    pub fn pidcache(&self) -> Vec<PidCacheEntry> {
        self.pidcache.snapshot()
    }

    /// Handle of the container whose header is at `location`
    ///
    /// Served from the pidcache when this process has seen the location
    /// before; otherwise rebuilt from the stored header. A location that
    /// holds no container is `StaleHandle`.
    pub fn handle_at(&self, location: Location) -> PongoResult<ContainerHandle> {
        let mut session = self.session()?;
        if let Some(handle) = self.pidcache.get(session.pid, location) {
            return Ok(handle);
        }
        let record = session.store.read_container(location)?;
        let handle = ContainerHandle::new(location, record.generation, record.kind);
        self.pidcache.insert(session.pid, handle);
        Ok(handle)
    }
}
