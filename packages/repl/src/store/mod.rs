//! The store interface the commands are written against.
//!
//! A store holds named buckets. A bucket holds ordered key/value byte pairs
//! and may nest further buckets; keys and nested bucket names share one
//! namespace per bucket. Buckets are addressed by their path of names from
//! the root, so `[b"users", b"prefs"]` is the bucket `prefs` inside the
//! top-level bucket `users`. The root itself holds only buckets.
//!
//! Every access happens inside a scope. [`Store::begin_read`] opens a
//! consistent read-only scope; [`Store::begin_update`] opens a read-write
//! scope whose changes become visible only on [`WriteScope::commit`].
//! Dropping a write scope without committing discards everything it did.

mod embedded;

pub use embedded::RedbStore;

use std::io;
use std::path::PathBuf;

/// Errors raised by a store and its scopes.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database file {} does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("database file {} already exists", .path.display())]
    Exists { path: PathBuf },

    #[error("cannot open database file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: redb::DatabaseError,
    },

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Backend(#[from] redb::Error),

    #[error("bucket not found")]
    BucketNotFound,

    #[error("bucket name required")]
    BucketNameRequired,

    #[error("key required")]
    KeyRequired,

    #[error("incompatible value")]
    IncompatibleValue,

    #[error("database is busy: another update is still open")]
    Busy,
}

/// Counters describing a bucket and everything below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketStats {
    /// Entries in this bucket and all nested buckets.
    pub key_n: usize,
    /// Nested buckets, counted recursively.
    pub bucket_n: usize,
    /// Nesting depth; a bucket without nested buckets has depth 1.
    pub depth: usize,
}

/// Key/value pairs of one bucket, in byte order of the keys.
pub type Entries<'a> = Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>), StoreError>> + 'a>;

/// Read access inside a scope.
pub trait ReadScope {
    /// Whether `path` names an existing bucket. The empty path is the root.
    fn has_bucket(&self, path: &[Vec<u8>]) -> Result<bool, StoreError>;

    /// Names of the buckets directly under `path`, in byte order.
    fn buckets(&self, path: &[Vec<u8>]) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Entries of the bucket at `path`, nested buckets excluded.
    fn entries(&self, path: &[Vec<u8>]) -> Result<Entries<'_>, StoreError>;

    /// Value of `key` in the bucket at `path`. `None` when the key is absent
    /// or names a nested bucket.
    fn get(&self, path: &[Vec<u8>], key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn stats(&self, path: &[Vec<u8>]) -> Result<BucketStats, StoreError> {
        let mut stats = BucketStats {
            key_n: 0,
            bucket_n: 0,
            depth: 1,
        };
        for entry in self.entries(path)? {
            entry?;
            stats.key_n += 1;
        }
        let mut child = path.to_vec();
        for name in self.buckets(path)? {
            child.push(name);
            let s = self.stats(&child)?;
            child.pop();
            stats.key_n += s.key_n;
            stats.bucket_n += s.bucket_n + 1;
            stats.depth = stats.depth.max(s.depth + 1);
        }
        Ok(stats)
    }
}

/// Read-write access inside an update scope.
pub trait WriteScope: ReadScope {
    /// Create the bucket at `path` unless it exists. Its parent must exist.
    fn create_bucket_if_not_exists(&mut self, path: &[Vec<u8>]) -> Result<(), StoreError>;

    /// Delete the bucket at `path` with everything inside it.
    fn delete_bucket(&mut self, path: &[Vec<u8>]) -> Result<(), StoreError>;

    /// Insert or overwrite an entry in the bucket at `path`.
    fn put(&mut self, path: &[Vec<u8>], key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Remove an entry. Removing a key that does not exist is not an error.
    fn delete(&mut self, path: &[Vec<u8>], key: &[u8]) -> Result<(), StoreError>;

    /// Make every change of this scope durable and visible.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Copy every entry and nested bucket of `src` into `dst`, creating `dst`
    /// if needed. Existing entries are overwritten; nested buckets merge.
    fn copy_bucket(&mut self, src: &[Vec<u8>], dst: &[Vec<u8>]) -> Result<(), StoreError> {
        self.create_bucket_if_not_exists(dst)?;
        let entries = self.entries(src)?.collect::<Result<Vec<_>, _>>()?;
        for (key, value) in entries {
            self.put(dst, &key, &value)?;
        }

        let (mut from, mut to) = (src.to_vec(), dst.to_vec());
        for name in self.buckets(src)? {
            from.push(name.clone());
            to.push(name);
            self.copy_bucket(&from, &to)?;
            from.pop();
            to.pop();
        }
        Ok(())
    }
}

/// A database the shell can open scopes on.
pub trait Store {
    fn begin_read(&self) -> Result<Box<dyn ReadScope + '_>, StoreError>;

    fn begin_update(&self) -> Result<Box<dyn WriteScope + '_>, StoreError>;
}

impl dyn Store + '_ {
    /// Run `f` inside a read-only scope.
    pub fn view<T, E>(&self, f: impl FnOnce(&dyn ReadScope) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let scope = self.begin_read()?;
        f(&*scope)
    }

    /// Run `f` inside a read-write scope, committing only when it returns
    /// `Ok`. On `Err` the scope is dropped and nothing changes.
    pub fn update<T, E>(&self, f: impl FnOnce(&mut dyn WriteScope) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut scope = self.begin_update()?;
        let out = f(&mut *scope)?;
        scope.commit()?;
        Ok(out)
    }
}
