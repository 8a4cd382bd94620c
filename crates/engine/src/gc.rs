//! Mark-and-sweep garbage collection
//!
//! Marking starts at the root namespace and `atoms` and follows every `Ref`
//! stored in a container body. Each live container marks its header block
//! and its current body block. Sweeping frees every allocated block left
//! unmarked: unreachable containers, and bodies leaked by a commit that was
//! interrupted between writing the new body and freeing the old one. Freed
//! blocks coalesce with free neighbours as they are released.
//!
//! Handles to reclaimed containers become stale; their pidcache entries are
//! evicted.

use crate::database::{Database, Session};
use chrono::Utc;
use pongo_core::{Location, PongoResult, Value};
use pongo_storage::BlockKind;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of one GC run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcStats {
    /// Allocated blocks before the sweep
    pub blocks_before: usize,
    /// Allocated bytes before the sweep
    pub bytes_before: u64,
    /// Allocated blocks after the sweep
    pub blocks_after: usize,
    /// Allocated bytes after the sweep
    pub bytes_after: u64,
    /// Unreachable containers freed
    pub containers_reclaimed: usize,
    /// Blocks freed (headers and bodies)
    pub blocks_reclaimed: usize,
    /// Wall time of the run
    pub elapsed_micros: u64,
}

impl GcStats {
    /// Bytes returned to the free-list
    pub fn bytes_reclaimed(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

impl<'a> Session<'a> {
    /// Block offsets reachable from the root namespace and `atoms`
    fn mark(&mut self) -> PongoResult<FxHashSet<u64>> {
        let mut marked = FxHashSet::default();
        let mut stack: Vec<Location> = vec![self.db.root().location, self.db.atoms().location];

        while let Some(location) = stack.pop() {
            if marked.contains(&location.0) {
                continue;
            }
            let record = match self.store.read_container(location) {
                Ok(record) => record,
                Err(e) if e.is_stale() => {
                    warn!(target: "pongo::gc", %location, "Reference to a missing container");
                    continue;
                }
                Err(e) => return Err(e),
            };
            marked.insert(location.0);
            marked.insert(record.body);

            let body = self.store.load_body(&record)?;
            for value in body.values() {
                if let Value::Ref(child) = value {
                    if !marked.contains(&child.location.0) {
                        stack.push(child.location);
                    }
                }
            }
        }
        Ok(marked)
    }

    pub(crate) fn gc(&mut self) -> PongoResult<GcStats> {
        let started = Instant::now();
        let before = self.store.stats();

        let marked = self.mark()?;
        let mark_micros = started.elapsed().as_micros() as u64;
        debug!(target: "pongo::gc", live_blocks = marked.len(), mark_micros, "Mark phase complete");

        let sweep_started = Instant::now();
        let garbage: Vec<_> = self
            .store
            .allocated_blocks()
            .into_iter()
            .filter(|(offset, _)| !marked.contains(offset))
            .collect();

        let mut containers_reclaimed = 0;
        for (offset, header) in &garbage {
            if header.kind == BlockKind::Container {
                containers_reclaimed += 1;
                self.db.pidcache.evict(Location(*offset));
            }
            self.store.free(*offset)?;
        }
        debug!(
            target: "pongo::gc",
            freed = garbage.len(),
            sweep_micros = sweep_started.elapsed().as_micros() as u64,
            "Sweep phase complete"
        );

        let pid = self.pid;
        let now = Utc::now().timestamp_micros();
        self.store.update_superblock(|sb| {
            sb.gc_time_micros = now;
            sb.gc_pid = pid;
        })?;

        let after = self.store.stats();
        Ok(GcStats {
            blocks_before: before.allocated_blocks,
            bytes_before: before.allocated_bytes,
            blocks_after: after.allocated_blocks,
            bytes_after: after.allocated_bytes,
            containers_reclaimed,
            blocks_reclaimed: garbage.len(),
            elapsed_micros: started.elapsed().as_micros() as u64,
        })
    }
}

impl Database {
    /// Reclaim every container unreachable from the root namespace and
    /// `atoms`
    ///
    /// Synchronous; holds the database for the whole run.
    pub fn gc(&self) -> PongoResult<GcStats> {
        let stats = self.session()?.gc()?;
        info!(
            target: "pongo::gc",
            containers = stats.containers_reclaimed,
            blocks = stats.blocks_reclaimed,
            bytes = stats.bytes_reclaimed(),
            elapsed_micros = stats.elapsed_micros,
            "Garbage collection complete"
        );
        Ok(stats)
    }
}
