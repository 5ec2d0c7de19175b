use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use crate::{
    error::{StoreError, StoreResult},
    model::QueueSnapshot,
    types::GuildId,
};

/// Durable per-guild queue state.
///
/// A missing store or a missing guild entry is not an error, `load` returns
/// `Ok(None)` and the player starts empty. Saving one guild must never
/// disturb the entries of other guilds.
#[async_trait]
pub trait QueueStore: Send + Sync + 'static {
    async fn load(&self, guild_id: GuildId) -> StoreResult<Option<QueueSnapshot>>;
    async fn save(&self, guild_id: GuildId, snapshot: &QueueSnapshot) -> StoreResult<()>;
}

/// Every guild in one JSON document keyed by the guild id as a string.
///
/// Writes through one store are serialized and go through a temporary file that
/// is renamed over the store, so a crash mid-write leaves the previous
/// document intact.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Other guilds are kept as raw values so unknown fields survive a rewrite.
    async fn read_all(&self) -> StoreResult<BTreeMap<String, Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(why) if why.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(why) => return Err(why.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(StoreError::Corrupt(format!(
                "expected an object at the top level of {}, found {}",
                self.path.display(),
                kind_of(&other)
            ))),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");

        self.path.with_file_name(name)
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new("queue_data.json")
    }
}

#[async_trait]
impl QueueStore for JsonFileStore {
    async fn load(&self, guild_id: GuildId) -> StoreResult<Option<QueueSnapshot>> {
        let mut all = self.read_all().await?;

        match all.remove(&guild_id.to_string()) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    async fn save(&self, guild_id: GuildId, snapshot: &QueueSnapshot) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut all = self.read_all().await?;
        all.insert(guild_id.to_string(), serde_json::to_value(snapshot)?);

        let bytes = serde_json::to_vec_pretty(&all)?;
        let temp = self.temp_path();

        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!("Saved queue of guild {} to {}", guild_id, self.path.display());

        Ok(())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Process-local store, state does not survive a restart.
#[derive(Default)]
pub struct MemoryStore {
    snapshots: DashMap<GuildId, QueueSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn load(&self, guild_id: GuildId) -> StoreResult<Option<QueueSnapshot>> {
        Ok(self.snapshots.get(&guild_id).map(|item| item.value().clone()))
    }

    async fn save(&self, guild_id: GuildId, snapshot: &QueueSnapshot) -> StoreResult<()> {
        self.snapshots.insert(guild_id, snapshot.clone());

        Ok(())
    }
}
