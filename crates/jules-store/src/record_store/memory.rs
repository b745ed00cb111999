use jules_types::Record;
use std::sync::Mutex;

use super::{OrderedLog, RecordIter, RecordStore};
use crate::error::lock;
use crate::{Error, Result};

struct State<R> {
    open: bool,
    log: OrderedLog<R>,
}

/// Volatile backend: records live in a map keyed by id, sorted on read.
///
/// Contents survive `close()`/`init()` cycles for the lifetime of the value.
pub struct MemoryRecordStore<R> {
    scope_id: String,
    state: Mutex<State<R>>,
}

impl<R: Record> MemoryRecordStore<R> {
    pub fn new(scope_id: impl Into<String>) -> Self {
        Self {
            scope_id: scope_id.into(),
            state: Mutex::new(State {
                open: false,
                log: OrderedLog::new(),
            }),
        }
    }

    fn with_open<T>(&self, f: impl FnOnce(&mut OrderedLog<R>) -> T) -> Result<T> {
        let mut state = lock(&self.state, "memory record store")?;
        if !state.open {
            return Err(Error::StoreClosed(format!("memory:{}", self.scope_id)));
        }
        Ok(f(&mut state.log))
    }
}

impl<R: Record> RecordStore<R> for MemoryRecordStore<R> {
    fn init(&self) -> Result<()> {
        lock(&self.state, "memory record store")?.open = true;
        Ok(())
    }

    fn append(&self, record: &R) -> Result<()> {
        self.with_open(|log| log.insert(record.clone()))
    }

    fn get(&self, id: &str) -> Result<Option<R>> {
        self.with_open(|log| log.get(id).cloned())
    }

    fn latest(&self) -> Result<Option<R>> {
        self.with_open(|log| log.latest().cloned())
    }

    fn scan(&self) -> Result<RecordIter<R>> {
        let records = self.with_open(|log| log.sorted())?;
        Ok(Box::new(records.into_iter()))
    }

    fn close(&self) -> Result<()> {
        lock(&self.state, "memory record store")?.open = false;
        Ok(())
    }
}
