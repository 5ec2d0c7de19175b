use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use guildtune::{
    error::PlayerError,
    model::{QueueSnapshot, TrackRef},
    state::QueueState,
    store::{JsonFileStore, QueueStore},
};

fn track_strategy() -> impl Strategy<Value = TrackRef> {
    (
        "[a-z0-9]{1,10}",
        "[A-Za-z ]{0,16}",
        0u64..20_000,
        proptest::option::of("[a-z]{3,8}"),
        proptest::option::of(any::<u64>()),
    )
        .prop_map(|(id, title, duration, thumbnail, requester)| {
            let mut track = TrackRef::new(format!("https://youtu.be/{}", id), title).duration(duration);
            track.thumbnail_url = thumbnail.map(|t| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", t));
            track.requester_id = requester;
            track
        })
}

fn tracks(max: usize) -> impl Strategy<Value = Vec<TrackRef>> {
    proptest::collection::vec(track_strategy(), 0..max)
}

#[derive(Debug, Clone)]
enum Toggle {
    Song,
    Queue,
    Advance,
    Enqueue(TrackRef),
}

fn toggle_strategy() -> impl Strategy<Value = Toggle> {
    prop_oneof![
        Just(Toggle::Song),
        Just(Toggle::Queue),
        Just(Toggle::Advance),
        track_strategy().prop_map(Toggle::Enqueue),
    ]
}

proptest! {
    #[test]
    fn enqueue_counts_add_up(batches in proptest::collection::vec(tracks(8), 0..6), loop_queue in any::<bool>()) {
        let mut state = QueueState::new();
        if loop_queue {
            state.toggle_loop_queue();
        }

        let added: usize = batches.into_iter().map(|batch| state.enqueue(batch, None)).sum();

        prop_assert_eq!(state.len(), added);
    }

    #[test]
    fn tiny_queues_refuse_to_shuffle(queue in tracks(2), seed in any::<u64>()) {
        let mut state = QueueState::new();
        state.enqueue(queue, None);
        let before = state.clone();

        let result = state.shuffle_with(&mut StdRng::seed_from_u64(seed));

        prop_assert!(matches!(result, Err(PlayerError::InvalidOperation(_))));
        prop_assert_eq!(state, before);
    }

    #[test]
    fn shuffle_rebuilds_loop_snapshot(queue in tracks(20), start in any::<bool>(), seed in any::<u64>()) {
        prop_assume!(queue.len() >= 3);

        let mut state = QueueState::new();
        state.enqueue(queue, None);
        if start {
            state.next_step(true);
        }
        state.toggle_loop_queue();

        state.shuffle_with(&mut StdRng::seed_from_u64(seed)).unwrap();

        let expected: Vec<TrackRef> = state.current().into_iter().chain(state.queue().iter()).cloned().collect();
        prop_assert_eq!(state.original_queue(), expected.as_slice());
    }

    #[test]
    fn loops_are_mutually_exclusive(steps in proptest::collection::vec(toggle_strategy(), 0..30)) {
        let mut state = QueueState::new();

        for step in steps {
            match step {
                Toggle::Song => {
                    let enabled = state.toggle_loop_song();
                    prop_assert_eq!(enabled, state.loop_song());
                },
                Toggle::Queue => {
                    let enabled = state.toggle_loop_queue();
                    prop_assert_eq!(enabled, state.loop_queue());
                },
                Toggle::Advance => {
                    state.next_step(true);
                },
                Toggle::Enqueue(track) => {
                    state.enqueue(Some(track), None);
                },
            }

            prop_assert!(!(state.loop_song() && state.loop_queue()));

            let snapshot = state.snapshot();
            prop_assert!(!(snapshot.loop_song && snapshot.loop_queue));
        }
    }

    #[test]
    fn paging_is_stable(queue in tracks(40), page in 0usize..6, per_page in 0usize..12) {
        let mut state = QueueState::new();
        state.enqueue(queue, None);

        let first = state.page(page, per_page);
        let second = state.page(page, per_page);

        prop_assert_eq!(&first, &second);
        prop_assert!(first.tracks.len() <= per_page.max(1));
        prop_assert!(first.total_pages >= 1);
    }

    #[test]
    fn file_store_round_trips(queue in tracks(6), original in tracks(6), current in proptest::option::of(track_strategy()), song in any::<bool>()) {
        let snapshot = QueueSnapshot {
            queue,
            original_queue: original,
            current,
            loop_song: song,
            loop_queue: !song,
        };

        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("queue_data.json"));
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

        let loaded = runtime.block_on(async {
            store.save(9, &snapshot).await.unwrap();
            store.load(9).await.unwrap()
        });

        prop_assert_eq!(loaded, Some(snapshot));
    }
}
