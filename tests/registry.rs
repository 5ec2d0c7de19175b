mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use async_trait::async_trait;
use futures::future::join_all;
use typemap_rev::TypeMap;
use guildtune::{
    error::StoreResult,
    events::DefaultHandler,
    model::QueueSnapshot,
    registry::PlayerRegistry,
    store::{JsonFileStore, MemoryStore, QueueStore},
    types::GuildId,
};
use common::*;

/// Counts loads so tests can tell how many players were initialized.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    loads: AtomicUsize,
}

#[async_trait]
impl QueueStore for CountingStore {
    async fn load(&self, guild_id: GuildId) -> StoreResult<Option<QueueSnapshot>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        self.inner.load(guild_id).await
    }

    async fn save(&self, guild_id: GuildId, snapshot: &QueueSnapshot) -> StoreResult<()> {
        self.inner.save(guild_id, snapshot).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_access_creates_one_player() {
    let store = Arc::new(CountingStore::default());
    let mut builder = PlayerRegistry::builder(DefaultHandler);
    builder.shared_store(store.clone());
    let registry = builder.build();

    let tasks = (0..16).map(|_| {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move { registry.get(1).await })
    });

    let players: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|player| player.unwrap())
        .collect();

    assert!(players.iter().all(|player| Arc::ptr_eq(player, &players[0])));
    assert_eq!(store.loads.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn guilds_get_separate_players() {
    let registry = PlayerRegistry::builder(DefaultHandler).build();

    let first = registry.get(1).await;
    let second = registry.get(2).await;
    first.enqueue(Some(track("only-first")), None).await;

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.queue_len().await, 0);
    assert!(registry.get_loaded(3).is_none());

    let mut ids = registry.guild_ids();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn restores_saved_state_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue_data.json");

    {
        let mut builder = PlayerRegistry::builder(DefaultHandler);
        builder.store_path(&path);
        let registry = builder.build();

        let player = registry.get(5).await;
        player.enqueue(vec![track("a"), track("b")], Some(3)).await;
        player.toggle_loop_queue().await;
    }

    let mut builder = PlayerRegistry::builder(DefaultHandler);
    builder.store(JsonFileStore::new(&path));
    let registry = builder.build();

    let snapshot = registry.get(5).await.snapshot().await;

    assert!(snapshot.loop_queue);
    assert_eq!(titles(&snapshot.queue), vec!["a", "b"]);
    assert_eq!(titles(&snapshot.original_queue), vec!["a", "b"]);
    assert_eq!(snapshot.queue[1].requester_id, Some(3));
}

#[tokio::test]
async fn unreadable_store_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue_data.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let mut builder = PlayerRegistry::builder(DefaultHandler);
    builder.store_path(&path);
    let registry = builder.build();

    let player = registry.get(5).await;

    assert!(player.snapshot().await.is_empty());
    assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "{ not json");
}

#[tokio::test]
async fn shared_through_type_map() {
    let mut builder = PlayerRegistry::builder(DefaultHandler);
    builder.store(MemoryStore::new()).page_size(0);
    let registry = builder.build();

    let mut data = TypeMap::new();
    data.insert::<PlayerRegistry>(Arc::clone(&registry));

    let stored = data.get::<PlayerRegistry>().unwrap();

    assert!(Arc::ptr_eq(stored, &registry));
    assert_eq!(stored.config.page_size, 1);
}
