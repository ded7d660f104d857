//! Durable [`KvStore`] on an embedded [`redb`] database file.
//!
//! Keys and values are encoded with `MsgPack` (`rmp-serde`). Each logical
//! store owns one table named after `Settings.name`, so several stores can
//! share a database file. redb I/O is blocking and runs on the tokio
//! blocking pool; a batch write commits as a single transaction.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cascade_core::{KvStore, KvStoreError, Result, Settings, StoreContext, StoreKey, StoreValue};
use redb::{Database, TableDefinition, TableError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Backend kind under which [`RedbStore`] is registered.
pub const KIND: &str = "redb";

type Bytes = Vec<u8>;

fn table_definition(table: &str) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
    TableDefinition::new(table)
}

fn read_many(db: &Database, table: &str, keys: &[Bytes]) -> anyhow::Result<Vec<Option<Bytes>>> {
    let txn = db.begin_read()?;
    let table = match txn.open_table(table_definition(table)) {
        Ok(table) => table,
        // Nothing was ever written to this store.
        Err(TableError::TableDoesNotExist(_)) => return Ok(vec![None; keys.len()]),
        Err(err) => return Err(err.into()),
    };

    let mut values = Vec::with_capacity(keys.len());
    for key in keys {
        values.push(table.get(key.as_slice())?.map(|guard| guard.value().to_vec()));
    }
    Ok(values)
}

fn write_many(db: &Database, table: &str, entries: &[(Bytes, Bytes)]) -> anyhow::Result<()> {
    let txn = db.begin_write()?;
    {
        let mut table = txn.open_table(table_definition(table))?;
        for (key, value) in entries {
            table.insert(key.as_slice(), value.as_slice())?;
        }
    }
    txn.commit()?;
    Ok(())
}

fn remove_many(db: &Database, table: &str, keys: &[Bytes]) -> anyhow::Result<()> {
    let txn = db.begin_write()?;
    {
        let mut table = txn.open_table(table_definition(table))?;
        for key in keys {
            table.remove(key.as_slice())?;
        }
    }
    txn.commit()?;
    Ok(())
}

/// Durable tier persisting items in a redb table.
pub struct RedbStore<K, V> {
    name: String,
    table: Arc<str>,
    db: Arc<Database>,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<K, V> RedbStore<K, V>
where
    K: StoreKey + Serialize,
    V: StoreValue + Serialize + DeserializeOwned,
{
    /// Opens (or creates) the database at `Settings.durable.path`.
    ///
    /// # Errors
    ///
    /// [`KvStoreError::InvalidArgument`] when no path is configured,
    /// [`KvStoreError::Backend`] when the file cannot be opened.
    pub fn new(settings: &Settings) -> Result<Self> {
        let path = settings.durable.path.as_ref().ok_or_else(|| {
            KvStoreError::InvalidArgument(format!(
                "store {}: the redb backend requires durable.path",
                settings.name
            ))
        })?;
        let name = format!("{}/{KIND}", settings.name);
        let db = Database::create(path).map_err(|err| KvStoreError::backend(name.clone(), err))?;
        Ok(Self::with_database(Arc::new(db), &settings.name))
    }

    /// Opens (or creates) the database file at `path` for the store `table`.
    ///
    /// # Errors
    ///
    /// [`KvStoreError::Backend`] when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        let db = Database::create(path.as_ref())
            .map_err(|err| KvStoreError::backend(format!("{table}/{KIND}"), err))?;
        Ok(Self::with_database(Arc::new(db), table))
    }

    /// Uses an already opened database; lets several stores share one file.
    #[must_use]
    pub fn with_database(db: Arc<Database>, table: &str) -> Self {
        Self {
            name: format!("{table}/{KIND}"),
            table: Arc::from(table),
            db,
            _types: PhantomData,
        }
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes> {
        rmp_serde::to_vec_named(value).map_err(|err| KvStoreError::serialization(self.name.clone(), err))
    }

    fn decode(&self, bytes: &[u8]) -> Result<V> {
        rmp_serde::from_slice(bytes).map_err(|err| KvStoreError::serialization(self.name.clone(), err))
    }

    /// Runs `op` against the database on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database, &str) -> anyhow::Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        let table = self.table.clone();
        tokio::task::spawn_blocking(move || op(&db, &table))
            .await
            .map_err(|err| KvStoreError::backend(self.name.clone(), err))?
            .map_err(|err| KvStoreError::backend(self.name.clone(), err))
    }

    async fn read(&self, keys: Vec<Bytes>) -> Result<Vec<Option<Bytes>>> {
        self.blocking(move |db, table| read_many(db, table, &keys)).await
    }
}

#[async_trait]
impl<K, V> KvStore<K, V> for RedbStore<K, V>
where
    K: StoreKey + Serialize,
    V: StoreValue + Serialize + DeserializeOwned,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn contains(&self, ctx: &StoreContext, key: &K) -> Result<bool> {
        ctx.check()?;
        let values = self.read(vec![self.encode(key)?]).await?;
        Ok(values.into_iter().next().flatten().is_some())
    }

    async fn get(&self, ctx: &StoreContext, key: &K) -> Result<Option<V>> {
        ctx.check()?;
        let values = self.read(vec![self.encode(key)?]).await?;
        values
            .into_iter()
            .next()
            .flatten()
            .map(|bytes| self.decode(&bytes))
            .transpose()
    }

    async fn get_batch(
        &self,
        ctx: &StoreContext,
        keys: &[K],
        results: &mut HashMap<K, V>,
    ) -> Result<Vec<K>> {
        ctx.check()?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let encoded = keys
            .iter()
            .map(|key| self.encode(key))
            .collect::<Result<Vec<_>>>()?;
        let values = self.read(encoded).await?;

        // Decode everything before touching `results` so a bad value leaves
        // the caller's map as it was.
        let mut found = Vec::with_capacity(keys.len());
        let mut missing = Vec::new();
        for (key, value) in keys.iter().zip(values) {
            match value {
                Some(bytes) => found.push((key.clone(), self.decode(&bytes)?)),
                None => missing.push(key.clone()),
            }
        }
        results.extend(found);
        Ok(missing)
    }

    async fn put(&self, ctx: &StoreContext, key: &K, value: &V) -> Result<()> {
        ctx.check()?;
        let entries = vec![(self.encode(key)?, self.encode(value)?)];
        self.blocking(move |db, table| write_many(db, table, &entries))
            .await
    }

    async fn put_batch(&self, ctx: &StoreContext, items: &HashMap<K, V>) -> Result<()> {
        ctx.check()?;
        if items.is_empty() {
            return Ok(());
        }

        let entries = items
            .iter()
            .map(|(key, value)| Ok((self.encode(key)?, self.encode(value)?)))
            .collect::<Result<Vec<_>>>()?;
        self.blocking(move |db, table| write_many(db, table, &entries))
            .await
    }

    async fn delete(&self, ctx: &StoreContext, key: &K) -> Result<()> {
        ctx.check()?;
        let keys = vec![self.encode(key)?];
        self.blocking(move |db, table| remove_many(db, table, &keys))
            .await
    }

    async fn delete_batch(&self, ctx: &StoreContext, keys: &[K]) -> Result<()> {
        ctx.check()?;
        if keys.is_empty() {
            return Ok(());
        }

        let keys = keys
            .iter()
            .map(|key| self.encode(key))
            .collect::<Result<Vec<_>>>()?;
        self.blocking(move |db, table| remove_many(db, table, &keys))
            .await
    }
}
