use std::{path::PathBuf, sync::Arc};
use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{error, info};
use crate::{
    events::EventHandler,
    player::{MusicPlayer, PlayerConfig},
    store::{JsonFileStore, QueueStore},
    types::GuildId,
};

/// Guild id to player map, at most one player per guild for the lifetime of the registry.
#[non_exhaustive]
pub struct PlayerRegistry {
    pub event_handler: Arc<dyn EventHandler>,
    pub store: Arc<dyn QueueStore>,
    pub config: PlayerConfig,
    players: DashMap<GuildId, Arc<OnceCell<Arc<MusicPlayer>>>>,
}

impl PlayerRegistry {
    pub fn builder<H: EventHandler + 'static>(handler: H) -> RegistryBuilder {
        RegistryBuilder::new(handler)
    }

    fn new(builder: RegistryBuilder) -> Arc<Self> {
        Arc::new(Self {
            event_handler: builder.event_handler,
            store: builder.store,
            config: builder.config,
            players: DashMap::new(),
        })
    }

    /// Returns the guild's player, creating it and loading its persisted state on first access.
    ///
    /// Concurrent first accesses to the same guild wait on a single
    /// initialization. A store that cannot be read is logged and the player
    /// starts empty.
    pub async fn get(&self, guild_id: GuildId) -> Arc<MusicPlayer> {
        let cell = Arc::clone(
            self.players
                .entry(guild_id)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        let player = cell
            .get_or_init(|| async {
                let player = MusicPlayer::new(
                    guild_id,
                    Arc::clone(&self.store),
                    Arc::clone(&self.event_handler),
                    self.config.clone(),
                );

                match player.load().await {
                    Ok(true) => info!("Created player for guild {} from saved state", guild_id),
                    Ok(false) => info!("Created empty player for guild {}", guild_id),
                    Err(why) => error!("Error loading queue for guild {}: {}", guild_id, why),
                }

                player
            })
            .await;

        Arc::clone(player)
    }

    /// The guild's player if it was already created.
    pub fn get_loaded(&self, guild_id: GuildId) -> Option<Arc<MusicPlayer>> {
        self.players
            .get(&guild_id)
            .and_then(|item| item.value().get().cloned())
    }

    pub fn guild_ids(&self) -> Vec<GuildId> {
        self.players.iter().map(|item| *item.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl typemap_rev::TypeMapKey for PlayerRegistry {
    type Value = Arc<PlayerRegistry>;
}

pub struct RegistryBuilder {
    pub event_handler: Arc<dyn EventHandler>,
    pub store: Arc<dyn QueueStore>,
    pub config: PlayerConfig,
}

impl RegistryBuilder {
    pub fn new<H: EventHandler + 'static>(handler: H) -> Self {
        Self {
            event_handler: Arc::new(handler),
            store: Arc::new(JsonFileStore::default()),
            config: PlayerConfig::default(),
        }
    }

    pub fn store<S: QueueStore>(&mut self, store: S) -> &mut Self {
        self.store = Arc::new(store);

        self
    }

    pub fn shared_store(&mut self, store: Arc<dyn QueueStore>) -> &mut Self {
        self.store = store;

        self
    }

    /// Shortcut for a [`JsonFileStore`] at `path`.
    pub fn store_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.store(JsonFileStore::new(path))
    }

    pub fn page_size(&mut self, page_size: usize) -> &mut Self {
        self.config.page_size = page_size.max(1);

        self
    }

    pub fn ingest_batch_size(&mut self, batch_size: usize) -> &mut Self {
        self.config.ingest_batch_size = batch_size.max(1);

        self
    }

    pub fn build(self) -> Arc<PlayerRegistry> {
        PlayerRegistry::new(self)
    }
}
