//! [`Store`] backed by a `redb` database.
//!
//! redb tables are flat, so the bucket tree lives in two of them:
//!
//! - `buckets` maps `parent id ++ name` to the id of the nested bucket,
//! - `entries` maps `bucket id ++ key` to the value.
//!
//! Ids are big-endian `u64`s, so the records of one bucket are contiguous and
//! sorted by the byte order of their names. The root has id 0 and `meta`
//! holds the next free id.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use redb::backends::InMemoryBackend;
use redb::{
    Database, ReadOnlyTable, ReadTransaction, ReadableTable, Table, TableDefinition,
    WriteTransaction,
};

use super::{Entries, ReadScope, Store, StoreError, WriteScope};

const BUCKETS: TableDefinition<&[u8], u64> = TableDefinition::new("buckets");
const ENTRIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("entries");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_ID: &str = "next_bucket_id";
const ROOT: u64 = 0;
const ID_LEN: usize = 8;

fn backend(e: impl Into<redb::Error>) -> StoreError {
    StoreError::Backend(e.into())
}

fn record_key(id: u64, name: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN + name.len());
    key.extend_from_slice(&id.to_be_bytes());
    key.extend_from_slice(name);
    key
}

/// Bounds covering every record that belongs to bucket `id`.
fn id_bounds(id: u64) -> ([u8; ID_LEN], [u8; ID_LEN]) {
    (id.to_be_bytes(), (id + 1).to_be_bytes())
}

fn child_id<T>(buckets: &T, parent: u64, name: &[u8]) -> Result<Option<u64>, StoreError>
where
    T: ReadableTable<&'static [u8], u64>,
{
    let key = record_key(parent, name);
    let found = buckets.get(key.as_slice()).map_err(backend)?;
    Ok(found.map(|guard| guard.value()))
}

fn resolve<T>(buckets: &T, path: &[Vec<u8>]) -> Result<Option<u64>, StoreError>
where
    T: ReadableTable<&'static [u8], u64>,
{
    let mut id = ROOT;
    for name in path {
        match child_id(buckets, id, name)? {
            Some(child) => id = child,
            None => return Ok(None),
        }
    }
    Ok(Some(id))
}

fn require<T>(buckets: &T, path: &[Vec<u8>]) -> Result<u64, StoreError>
where
    T: ReadableTable<&'static [u8], u64>,
{
    resolve(buckets, path)?.ok_or(StoreError::BucketNotFound)
}

/// `(name, id)` of every bucket directly under `id`.
fn children<T>(buckets: &T, id: u64) -> Result<Vec<(Vec<u8>, u64)>, StoreError>
where
    T: ReadableTable<&'static [u8], u64>,
{
    let (lo, hi) = id_bounds(id);
    let mut out = Vec::new();
    for item in buckets.range(&lo[..]..&hi[..]).map_err(backend)? {
        let (key, child) = item.map_err(backend)?;
        out.push((key.value()[ID_LEN..].to_vec(), child.value()));
    }
    Ok(out)
}

fn value<B, E>(
    buckets: &B,
    entries: &E,
    path: &[Vec<u8>],
    key: &[u8],
) -> Result<Option<Vec<u8>>, StoreError>
where
    B: ReadableTable<&'static [u8], u64>,
    E: ReadableTable<&'static [u8], &'static [u8]>,
{
    let id = require(buckets, path)?;
    let record = record_key(id, key);
    let found = entries.get(record.as_slice()).map_err(backend)?;
    Ok(found.map(|guard| guard.value().to_vec()))
}

/// Keys of every record under `id` in `table`, prefix included.
fn record_keys<T, V>(table: &T, id: u64) -> Result<Vec<Vec<u8>>, StoreError>
where
    T: ReadableTable<&'static [u8], V>,
    V: redb::Value + 'static,
{
    let (lo, hi) = id_bounds(id);
    let mut keys = Vec::new();
    for item in table.range(&lo[..]..&hi[..]).map_err(backend)? {
        let (key, _) = item.map_err(backend)?;
        keys.push(key.value().to_vec());
    }
    Ok(keys)
}

/// A bucket database in a redb file, or in memory.
pub struct RedbStore {
    db: Database,
    path: Option<PathBuf>,
    writing: Cell<bool>,
}

impl RedbStore {
    /// Open an existing database file. An empty file becomes an empty
    /// database.
    pub fn open(path: impl AsRef<Path>) -> Result<RedbStore, StoreError> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound {
                path: path.to_path_buf(),
            },
            _ => StoreError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let opened = if meta.len() == 0 {
            Database::create(path)
        } else {
            Database::open(path)
        };
        let db = opened.map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "opened database");
        Self::init(db, Some(path.to_path_buf()))
    }

    /// Create a new database file. Fails if the file already exists.
    pub fn create(path: impl AsRef<Path>) -> Result<RedbStore, StoreError> {
        let path = path.as_ref();

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options.open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => StoreError::Exists {
                path: path.to_path_buf(),
            },
            _ => StoreError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let db = Database::create(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "created database");
        Self::init(db, Some(path.to_path_buf()))
    }

    /// A database that lives only in memory.
    pub fn in_memory() -> Result<RedbStore, StoreError> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .map_err(backend)?;
        Self::init(db, None)
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init(db: Database, path: Option<PathBuf>) -> Result<RedbStore, StoreError> {
        let tx = db.begin_write().map_err(backend)?;
        tx.open_table(BUCKETS).map_err(backend)?;
        tx.open_table(ENTRIES).map_err(backend)?;
        tx.open_table(META).map_err(backend)?;
        tx.commit().map_err(backend)?;
        Ok(RedbStore {
            db,
            path,
            writing: Cell::new(false),
        })
    }
}

impl Store for RedbStore {
    fn begin_read(&self) -> Result<Box<dyn ReadScope + '_>, StoreError> {
        let tx = self.db.begin_read().map_err(backend)?;
        Ok(Box::new(ReadView {
            buckets: tx.open_table(BUCKETS).map_err(backend)?,
            entries: tx.open_table(ENTRIES).map_err(backend)?,
            _tx: tx,
        }))
    }

    fn begin_update(&self) -> Result<Box<dyn WriteScope + '_>, StoreError> {
        if self.writing.get() {
            return Err(StoreError::Busy);
        }
        let guard = WriteGuard::new(&self.writing);
        let tx = self.db.begin_write().map_err(backend)?;
        Ok(Box::new(Update { tx, _guard: guard }))
    }
}

struct ReadView {
    buckets: ReadOnlyTable<&'static [u8], u64>,
    entries: ReadOnlyTable<&'static [u8], &'static [u8]>,
    _tx: ReadTransaction,
}

impl ReadScope for ReadView {
    fn has_bucket(&self, path: &[Vec<u8>]) -> Result<bool, StoreError> {
        Ok(resolve(&self.buckets, path)?.is_some())
    }

    fn buckets(&self, path: &[Vec<u8>]) -> Result<Vec<Vec<u8>>, StoreError> {
        let id = require(&self.buckets, path)?;
        Ok(children(&self.buckets, id)?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    fn entries(&self, path: &[Vec<u8>]) -> Result<Entries<'_>, StoreError> {
        let id = require(&self.buckets, path)?;
        let (lo, hi) = id_bounds(id);
        let range = self.entries.range(&lo[..]..&hi[..]).map_err(backend)?;
        Ok(Box::new(range.map(|item| {
            let (key, value) = item.map_err(backend)?;
            Ok((key.value()[ID_LEN..].to_vec(), value.value().to_vec()))
        })))
    }

    fn get(&self, path: &[Vec<u8>], key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        value(&self.buckets, &self.entries, path, key)
    }
}

/// Marks the store as having an open update until dropped.
struct WriteGuard<'s>(&'s Cell<bool>);

impl<'s> WriteGuard<'s> {
    fn new(flag: &'s Cell<bool>) -> Self {
        flag.set(true);
        WriteGuard(flag)
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A redb write transaction. Dropping it without `commit` aborts it.
struct Update<'s> {
    tx: WriteTransaction,
    _guard: WriteGuard<'s>,
}

type BucketTable<'t> = Table<'t, &'static [u8], u64>;
type EntryTable<'t> = Table<'t, &'static [u8], &'static [u8]>;

impl Update<'_> {
    fn bucket_table(&self) -> Result<BucketTable<'_>, StoreError> {
        self.tx.open_table(BUCKETS).map_err(backend)
    }

    fn entry_table(&self) -> Result<EntryTable<'_>, StoreError> {
        self.tx.open_table(ENTRIES).map_err(backend)
    }

    fn next_id(&self) -> Result<u64, StoreError> {
        let mut meta = self.tx.open_table(META).map_err(backend)?;
        let id = meta
            .get(NEXT_ID)
            .map_err(backend)?
            .map(|guard| guard.value())
            .unwrap_or(ROOT + 1);
        meta.insert(NEXT_ID, id + 1).map_err(backend)?;
        Ok(id)
    }
}

impl ReadScope for Update<'_> {
    fn has_bucket(&self, path: &[Vec<u8>]) -> Result<bool, StoreError> {
        Ok(resolve(&self.bucket_table()?, path)?.is_some())
    }

    fn buckets(&self, path: &[Vec<u8>]) -> Result<Vec<Vec<u8>>, StoreError> {
        let table = self.bucket_table()?;
        let id = require(&table, path)?;
        Ok(children(&table, id)?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    fn entries(&self, path: &[Vec<u8>]) -> Result<Entries<'_>, StoreError> {
        let id = require(&self.bucket_table()?, path)?;
        let table = self.entry_table()?;
        let (lo, hi) = id_bounds(id);
        let mut out = Vec::new();
        for item in table.range(&lo[..]..&hi[..]).map_err(backend)? {
            let (key, value) = item.map_err(backend)?;
            out.push(Ok((key.value()[ID_LEN..].to_vec(), value.value().to_vec())));
        }
        Ok(Box::new(out.into_iter()))
    }

    fn get(&self, path: &[Vec<u8>], key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        value(&self.bucket_table()?, &self.entry_table()?, path, key)
    }
}

impl WriteScope for Update<'_> {
    fn create_bucket_if_not_exists(&mut self, path: &[Vec<u8>]) -> Result<(), StoreError> {
        let (name, parent) = match path.split_last() {
            Some((name, parent)) if !name.is_empty() => (name, parent),
            _ => return Err(StoreError::BucketNameRequired),
        };

        let mut buckets = self.bucket_table()?;
        let parent_id = require(&buckets, parent)?;
        if child_id(&buckets, parent_id, name)?.is_some() {
            return Ok(());
        }
        let record = record_key(parent_id, name);
        if self
            .entry_table()?
            .get(record.as_slice())
            .map_err(backend)?
            .is_some()
        {
            return Err(StoreError::IncompatibleValue);
        }

        let id = self.next_id()?;
        buckets.insert(record.as_slice(), id).map_err(backend)?;
        Ok(())
    }

    fn delete_bucket(&mut self, path: &[Vec<u8>]) -> Result<(), StoreError> {
        let (name, parent) = match path.split_last() {
            Some(split) => split,
            None => return Err(StoreError::BucketNameRequired),
        };

        let mut buckets = self.bucket_table()?;
        let mut entries = self.entry_table()?;
        let parent_id = require(&buckets, parent)?;
        let id = child_id(&buckets, parent_id, name)?.ok_or(StoreError::BucketNotFound)?;

        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            pending.extend(children(&buckets, id)?.into_iter().map(|(_, child)| child));
            for key in record_keys(&entries, id)? {
                entries.remove(key.as_slice()).map_err(backend)?;
            }
            for key in record_keys(&buckets, id)? {
                buckets.remove(key.as_slice()).map_err(backend)?;
            }
        }
        buckets
            .remove(record_key(parent_id, name).as_slice())
            .map_err(backend)?;
        Ok(())
    }

    fn put(&mut self, path: &[Vec<u8>], key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::KeyRequired);
        }
        let buckets = self.bucket_table()?;
        let id = require(&buckets, path)?;
        if child_id(&buckets, id, key)?.is_some() {
            return Err(StoreError::IncompatibleValue);
        }
        self.entry_table()?
            .insert(record_key(id, key).as_slice(), value)
            .map_err(backend)?;
        Ok(())
    }

    fn delete(&mut self, path: &[Vec<u8>], key: &[u8]) -> Result<(), StoreError> {
        let buckets = self.bucket_table()?;
        let id = require(&buckets, path)?;
        if child_id(&buckets, id, key)?.is_some() {
            return Err(StoreError::IncompatibleValue);
        }
        self.entry_table()?
            .remove(record_key(id, key).as_slice())
            .map_err(backend)?;
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Update { tx, _guard } = *self;
        tx.commit().map_err(|e| {
            tracing::warn!(error = %e, "update failed to commit");
            backend(e)
        })
    }
}
