use jules_types::Record;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{OrderedLog, RecordIter, RecordStore};
use crate::error::lock;
use crate::{Error, Result};

/// Durable local backend: one newline-delimited JSON file per key.
///
/// Appends go to the end of the file; order is rebuilt by a full scan on
/// every read. Lines that do not parse (a torn write after a crash, manual
/// edits) are skipped with a warning instead of failing the read.
///
/// The file is opened per operation and never held between calls, so an
/// open store costs no file descriptor.
pub struct JsonlRecordStore<R> {
    path: PathBuf,
    open: Mutex<bool>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> JsonlRecordStore<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            open: Mutex::new(false),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> Result<()> {
        if !*lock(&self.open, "jsonl record store")? {
            return Err(Error::StoreClosed(self.path.display().to_string()));
        }
        Ok(())
    }

    fn load(&self) -> Result<OrderedLog<R>> {
        self.ensure_open()?;

        let mut log = OrderedLog::new();
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(log),
            Err(e) => return Err(e.into()),
        };

        let mut skipped = 0usize;
        for (line_index, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<R>(&line) {
                Ok(record) => log.insert(record),
                Err(e) => {
                    skipped += 1;
                    warn!(
                        path = %self.path.display(),
                        line = line_index + 1,
                        error = %e,
                        "skipping malformed record"
                    );
                }
            }
        }

        debug!(
            path = %self.path.display(),
            records = log.len(),
            skipped,
            "rebuilt record log"
        );
        Ok(log)
    }
}

/// Terminate a torn trailing line so the next append starts on a fresh line.
fn repair_tail(file: &mut File) -> std::io::Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}

impl<R: Record> RecordStore<R> for JsonlRecordStore<R> {
    fn init(&self) -> Result<()> {
        let mut open = lock(&self.open, "jsonl record store")?;
        if *open {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::unavailable(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| Error::unavailable(&self.path, e))?;
        repair_tail(&mut file).map_err(|e| Error::unavailable(&self.path, e))?;

        *open = true;
        Ok(())
    }

    fn append(&self, record: &R) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        // Held across the write so appends from one store never interleave.
        let open = lock(&self.open, "jsonl record store")?;
        if !*open {
            return Err(Error::StoreClosed(self.path.display().to_string()));
        }
        let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        file.write_all(&line)?;
        file.sync_data()?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<R>> {
        Ok(self.load()?.get(id).cloned())
    }

    fn latest(&self) -> Result<Option<R>> {
        Ok(self.load()?.latest().cloned())
    }

    fn scan(&self) -> Result<RecordIter<R>> {
        Ok(Box::new(self.load()?.into_sorted().into_iter()))
    }

    fn close(&self) -> Result<()> {
        *lock(&self.open, "jsonl record store")? = false;
        Ok(())
    }
}
