//! Recording tier used by the chain tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::context::StoreContext;
use crate::error::{KvStoreError, Result};
use crate::store::KvStore;

/// One call received by a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Contains(String),
    Get(String),
    GetBatch(Vec<String>),
    Put(String, String),
    PutBatch(Vec<(String, String)>),
    Delete(String),
    DeleteBatch(Vec<String>),
}

/// In-memory tier that logs every call and can be told to fail or stall.
pub struct RecordingStore {
    name: String,
    data: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<&'static str>>,
    delay: Mutex<Option<Duration>>,
    /// Shared across tiers to observe cross-tier ordering.
    order_log: Option<std::sync::Arc<Mutex<Vec<String>>>>,
}

impl RecordingStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            delay: Mutex::new(None),
            order_log: None,
        }
    }

    pub fn with_order_log(mut self, log: std::sync::Arc<Mutex<Vec<String>>>) -> Self {
        self.order_log = Some(log);
        self
    }

    pub fn seed(&self, key: &str, value: &str) {
        self.data.lock().insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.data.lock().get(key).cloned()
    }

    /// Makes every subsequent call to `operation` (e.g. `"put"`) fail.
    pub fn fail_on(&self, operation: &'static str) {
        self.failing.lock().insert(operation);
    }

    /// Makes every subsequent call sleep before answering.
    pub fn stall(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    async fn enter(&self, operation: &'static str, call: Call) -> Result<()> {
        self.calls.lock().push(call);
        if let Some(log) = &self.order_log {
            log.lock().push(format!("{}:{operation}", self.name));
        }
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(operation) {
            return Err(KvStoreError::backend(
                self.name.clone(),
                anyhow::anyhow!("injected {operation} failure"),
            ));
        }
        Ok(())
    }
}

fn sorted_pairs(items: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = items
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    pairs.sort();
    pairs
}

#[async_trait]
impl KvStore<String, String> for RecordingStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn contains(&self, _ctx: &StoreContext, key: &String) -> Result<bool> {
        self.enter("contains", Call::Contains(key.clone())).await?;
        Ok(self.data.lock().contains_key(key))
    }

    async fn get(&self, _ctx: &StoreContext, key: &String) -> Result<Option<String>> {
        self.enter("get", Call::Get(key.clone())).await?;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn get_batch(
        &self,
        _ctx: &StoreContext,
        keys: &[String],
        results: &mut HashMap<String, String>,
    ) -> Result<Vec<String>> {
        self.enter("get_batch", Call::GetBatch(keys.to_vec())).await?;
        let data = self.data.lock();
        let mut missing = Vec::new();
        for key in keys {
            match data.get(key) {
                Some(value) => {
                    results.insert(key.clone(), value.clone());
                }
                None => missing.push(key.clone()),
            }
        }
        Ok(missing)
    }

    async fn put(&self, _ctx: &StoreContext, key: &String, value: &String) -> Result<()> {
        self.enter("put", Call::Put(key.clone(), value.clone())).await?;
        self.data.lock().insert(key.clone(), value.clone());
        Ok(())
    }

    async fn put_batch(&self, _ctx: &StoreContext, items: &HashMap<String, String>) -> Result<()> {
        self.enter("put_batch", Call::PutBatch(sorted_pairs(items))).await?;
        self.data
            .lock()
            .extend(items.iter().map(|(key, value)| (key.clone(), value.clone())));
        Ok(())
    }

    async fn delete(&self, _ctx: &StoreContext, key: &String) -> Result<()> {
        self.enter("delete", Call::Delete(key.clone())).await?;
        self.data.lock().remove(key);
        Ok(())
    }

    async fn delete_batch(&self, _ctx: &StoreContext, keys: &[String]) -> Result<()> {
        self.enter("delete_batch", Call::DeleteBatch(keys.to_vec())).await?;
        let mut data = self.data.lock();
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }
}
