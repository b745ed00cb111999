//! Append-only, per-key ordered record logs.
//!
//! Three interchangeable backends implement [`RecordStore`] with the same
//! observable behavior:
//! - [`MemoryRecordStore`]: map keyed by id, sorted on read (tests, ephemeral clients)
//! - [`JsonlRecordStore`]: newline-delimited JSON file, order rebuilt by full scan
//! - [`SqliteRecordStore`]: shared database with an ordered `(scope_id, ts, seq)` index
//!
//! Ordering key is the timestamp and sequence of the first write of each id.
//! Re-appending an id replaces its content but never moves it.

mod jsonl;
mod memory;
mod sqlite;

pub use jsonl::JsonlRecordStore;
pub use memory::MemoryRecordStore;
pub use sqlite::{SqliteRecordDatabase, SqliteRecordStore};

use chrono::{DateTime, Utc};
use jules_types::Record;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::Result;

/// Lazy, single-pass traversal produced by [`RecordStore::scan`].
pub type RecordIter<R> = Box<dyn Iterator<Item = R> + Send>;

/// Storage contract for one key's ordered record log.
pub trait RecordStore<R: Record>: Send + Sync {
    /// Prepare the backing medium. Idempotent; reopens a closed store.
    fn init(&self) -> Result<()>;

    /// Persist one record. Re-appending an existing id overwrites in place.
    fn append(&self, record: &R) -> Result<()>;

    fn get(&self, id: &str) -> Result<Option<R>>;

    /// Record with the greatest timestamp; equal timestamps resolve to the
    /// one written last.
    fn latest(&self) -> Result<Option<R>>;

    /// All records in ascending timestamp order, as of the moment of the call.
    fn scan(&self) -> Result<RecordIter<R>>;

    /// Release held resources. Safe to call repeatedly.
    fn close(&self) -> Result<()>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.latest()?.is_none())
    }
}

struct Slot<R> {
    ts: DateTime<Utc>,
    seq: u64,
    record: R,
}

/// In-memory ordered view shared by the memory and JSONL backends.
pub(crate) struct OrderedLog<R> {
    slots: HashMap<String, Slot<R>>,
    next_seq: u64,
}

impl<R: Record> OrderedLog<R> {
    pub(crate) fn new() -> Self {
        Self {
            slots: HashMap::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn insert(&mut self, record: R) {
        match self.slots.entry(record.record_id().to_string()) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().record = record;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    ts: record.timestamp(),
                    seq: self.next_seq,
                    record,
                });
                self.next_seq += 1;
            }
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&R> {
        self.slots.get(id).map(|slot| &slot.record)
    }

    pub(crate) fn latest(&self) -> Option<&R> {
        self.slots
            .values()
            .max_by_key(|slot| (slot.ts, slot.seq))
            .map(|slot| &slot.record)
    }

    pub(crate) fn into_sorted(self) -> Vec<R> {
        let mut slots: Vec<Slot<R>> = self.slots.into_values().collect();
        slots.sort_by_key(|slot| (slot.ts, slot.seq));
        slots.into_iter().map(|slot| slot.record).collect()
    }

    pub(crate) fn sorted(&self) -> Vec<R> {
        let mut slots: Vec<&Slot<R>> = self.slots.values().collect();
        slots.sort_by_key(|slot| (slot.ts, slot.seq));
        slots.into_iter().map(|slot| slot.record.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
