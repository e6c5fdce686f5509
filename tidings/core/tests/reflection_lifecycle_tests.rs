// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end tests for the reflection lifecycle.
//!
//! The extractor and the gate share one store over an in-memory cache. A
//! counting cache wrapper records every read and write so tests can assert
//! that short-circuited paths never touch storage.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use tidings_core::application::{ReflectionExtractor, ReflectionGate};
use tidings_core::domain::action::PendingAction;
use tidings_core::domain::agent_config::ReflectionsConfig;
use tidings_core::domain::cache::{CacheError, CacheStore};
use tidings_core::domain::conversation::{ConversationMessage, RoomId};
use tidings_core::domain::extraction::{ExtractionError, ExtractionModel};
use tidings_core::domain::reflection::{Reflection, ReflectionQueue};
use tidings_core::domain::repository::ReflectionStore;
use tidings_core::infrastructure::cache::InMemoryCacheStore;
use tidings_core::infrastructure::conversation::InMemoryConversationStore;
use tidings_core::infrastructure::repositories::CacheReflectionStore;
use tidings_core::infrastructure::settings::ConfigSettings;

const FLAG: &str = "TWITTER_USE_DEFAULT_REFLECTIONS";

#[derive(Default)]
struct CountingCache {
    inner: InMemoryCacheStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingCache {
    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }
}

struct FixedModel(Value);

#[async_trait]
impl ExtractionModel for FixedModel {
    async fn extract(&self, _prompt: &str) -> Result<Value, ExtractionError> {
        Ok(self.0.clone())
    }
}

/// Signals when it is called, then waits to be released before answering
struct BlockingModel {
    answer: Value,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl ExtractionModel for BlockingModel {
    async fn extract(&self, _prompt: &str) -> Result<Value, ExtractionError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.answer.clone())
    }
}

struct Harness {
    cache: Arc<CountingCache>,
    store: Arc<CacheReflectionStore>,
    conversations: Arc<InMemoryConversationStore>,
    settings: Arc<ConfigSettings>,
    room: RoomId,
}

impl Harness {
    async fn new(enabled: bool, message_count: usize) -> Self {
        let cache = Arc::new(CountingCache::default());
        let store = Arc::new(CacheReflectionStore::new(cache.clone(), "Herald/reflections"));
        let conversations = Arc::new(InMemoryConversationStore::new());
        let room = RoomId::new();
        for i in 0..message_count {
            conversations
                .record(room, ConversationMessage::new(format!("user{}", i % 2), format!("turn {}", i)))
                .await;
        }
        let settings = Arc::new(ConfigSettings::isolated(HashMap::from([(
            FLAG.to_string(),
            if enabled { "true" } else { "false" }.to_string(),
        )])));

        Self {
            cache,
            store,
            conversations,
            settings,
            room,
        }
    }

    async fn seed(&self, records: &[(&str, bool)]) {
        let queue: ReflectionQueue = records
            .iter()
            .map(|(text, used)| Reflection::from_parts(*text, *used))
            .collect::<Vec<_>>()
            .into();
        self.store.set(&queue).await.unwrap();
    }

    async fn queue(&self) -> Vec<(String, bool)> {
        self.store
            .get()
            .await
            .unwrap()
            .unwrap_or_default()
            .iter()
            .map(|r| (r.text().to_string(), r.is_used()))
            .collect()
    }

    fn extractor(&self, model: Arc<dyn ExtractionModel>) -> ReflectionExtractor {
        ReflectionExtractor::new(
            self.store.clone(),
            self.conversations.clone(),
            model,
            self.settings.clone(),
            "Herald",
            ReflectionsConfig::default(),
        )
    }

    fn gate(&self) -> ReflectionGate {
        ReflectionGate::new(self.store.clone(), self.settings.clone(), FLAG)
    }
}

fn owned(records: &[(&str, bool)]) -> Vec<(String, bool)> {
    records.iter().map(|(t, u)| (t.to_string(), *u)).collect()
}

#[tokio::test]
async fn test_empty_queue_gate_returns_nothing_and_writes_nothing() {
    let harness = Harness::new(true, 0).await;

    let text = harness.gate().surface(&PendingAction::post()).await.unwrap();

    assert_eq!(text, "");
    assert_eq!(harness.cache.writes(), 0);
    assert!(harness.store.get().await.unwrap().is_none());
}

#[tokio::test]
async fn test_gate_surfaces_unused_and_flips_all() {
    let harness = Harness::new(true, 0).await;
    harness.seed(&[("X", false), ("Y", true)]).await;

    let text = harness.gate().surface(&PendingAction::post()).await.unwrap();

    assert_eq!(text, "X");
    assert_eq!(harness.queue().await, owned(&[("X", true), ("Y", true)]));
}

#[tokio::test]
async fn test_extractor_appends_on_eighth_turn() {
    let harness = Harness::new(true, 8).await;
    harness.seed(&[("A", true), ("B", false)]).await;

    let outcome = harness
        .extractor(Arc::new(FixedModel(json!([{ "text": "Z", "used": false }]))))
        .on_turn(harness.room)
        .await
        .unwrap()
        .expect("trigger fires on turn 8");

    assert_eq!(outcome.appended, 1);
    assert_eq!(
        harness.queue().await,
        owned(&[("A", true), ("B", false), ("Z", false)])
    );
}

#[tokio::test]
async fn test_disabled_flag_extractor_never_touches_store() {
    let harness = Harness::new(false, 8).await;

    let outcome = harness
        .extractor(Arc::new(FixedModel(json!([{ "text": "Z", "used": false }]))))
        .on_turn(harness.room)
        .await
        .unwrap();

    assert_eq!(outcome, None);
    assert_eq!(harness.cache.reads(), 0);
    assert_eq!(harness.cache.writes(), 0);
}

#[tokio::test]
async fn test_forced_run_with_disabled_flag_touches_nothing() {
    let harness = Harness::new(false, 3).await;

    let outcome = harness
        .extractor(Arc::new(FixedModel(json!([{ "text": "Z", "used": false }]))))
        .run(harness.room)
        .await
        .unwrap();

    assert_eq!(outcome, None);
    assert_eq!(harness.cache.reads(), 0);
    assert_eq!(harness.cache.writes(), 0);
    assert!(harness.store.get().await.unwrap().is_none());
}

#[tokio::test]
async fn test_disabled_flag_gate_never_touches_store() {
    let harness = Harness::new(false, 0).await;
    harness.seed(&[("X", false)]).await;
    let writes = harness.cache.writes();
    let reads = harness.cache.reads();

    assert_eq!(harness.gate().surface(&PendingAction::post()).await.unwrap(), "");
    assert_eq!(harness.cache.reads(), reads);
    assert_eq!(harness.cache.writes(), writes);
}

#[tokio::test]
async fn test_trigger_fires_on_multiples_of_four() {
    for count in 0..=9 {
        let harness = Harness::new(true, count).await;
        let fired = harness
            .extractor(Arc::new(FixedModel(json!([]))))
            .on_turn(harness.room)
            .await
            .unwrap()
            .is_some();
        assert_eq!(fired, count % 4 == 0, "message count {}", count);
        if !fired {
            assert_eq!(harness.cache.writes(), 0);
        }
    }
}

#[tokio::test]
async fn test_gate_only_reacts_to_posts() {
    let harness = Harness::new(true, 0).await;
    harness.seed(&[("X", false)]).await;
    let gate = harness.gate();

    for name in ["REPLY", "LIKE", "FOLLOW", "RETWEET"] {
        assert_eq!(gate.surface(&PendingAction::named(name)).await.unwrap(), "");
    }
    assert_eq!(harness.queue().await, owned(&[("X", false)]));

    assert_eq!(gate.surface(&PendingAction::named("tweet")).await.unwrap(), "X");
}

#[tokio::test]
async fn test_gate_is_idempotent() {
    let harness = Harness::new(true, 0).await;
    harness.seed(&[("X", false), ("Y", false)]).await;
    let gate = harness.gate();

    assert_eq!(gate.surface(&PendingAction::post()).await.unwrap(), "X\nY");
    let after_first = harness.queue().await;
    let writes = harness.cache.writes();

    assert_eq!(gate.surface(&PendingAction::post()).await.unwrap(), "");
    assert_eq!(harness.queue().await, after_first);
    assert_eq!(harness.cache.writes(), writes);
}

#[tokio::test]
async fn test_lifecycle_conserves_records_and_used_is_monotonic() {
    let harness = Harness::new(true, 0).await;
    let gate = harness.gate();
    let mut previous: Vec<(String, bool)> = Vec::new();

    for round in 0..3 {
        let answer = json!([
            { "text": format!("fact {}a", round), "used": false },
            { "text": format!("fact {}b", round), "used": false },
        ]);
        harness
            .extractor(Arc::new(FixedModel(answer)))
            .run(harness.room)
            .await
            .unwrap()
            .expect("flag enabled");
        let after_extract = harness.queue().await;
        assert_eq!(after_extract.len(), previous.len() + 2);
        assert_eq!(&after_extract[..previous.len()], &previous[..]);

        gate.surface(&PendingAction::post()).await.unwrap();
        let after_gate = harness.queue().await;
        assert_eq!(after_gate.len(), after_extract.len());
        for ((text_before, used_before), (text_after, used_after)) in
            after_extract.iter().zip(after_gate.iter())
        {
            assert_eq!(text_before, text_after);
            assert!(*used_after);
            assert!(!*used_before || *used_after);
        }
        previous = after_gate;
    }
}

#[tokio::test]
async fn test_surfaced_records_stay_used_when_extraction_overlaps_gate() {
    let harness = Harness::new(true, 0).await;
    harness.seed(&[("X", false)]).await;

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let extractor = Arc::new(harness.extractor(Arc::new(BlockingModel {
        answer: json!([{ "text": "Z", "used": false }]),
        entered: entered.clone(),
        release: release.clone(),
    })));

    let room = harness.room;
    let running = {
        let extractor = extractor.clone();
        tokio::spawn(async move { extractor.run(room).await })
    };

    // The extractor has read its snapshot and is waiting on the model
    entered.notified().await;
    assert_eq!(harness.gate().surface(&PendingAction::post()).await.unwrap(), "X");

    release.notify_one();
    let outcome = running.await.unwrap().unwrap().expect("flag enabled");
    assert_eq!(outcome.queue_len, 2);

    assert_eq!(harness.queue().await, owned(&[("X", true), ("Z", false)]));
    assert_eq!(harness.gate().surface(&PendingAction::post()).await.unwrap(), "Z");
}

#[tokio::test]
async fn test_concurrent_gates_surface_each_record_once() {
    let harness = Harness::new(true, 0).await;
    harness
        .seed(&[("A", false), ("B", false), ("C", false), ("D", false)])
        .await;
    let gate = Arc::new(harness.gate());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gate = gate.clone();
            tokio::spawn(async move { gate.surface(&PendingAction::post()).await.unwrap() })
        })
        .collect();

    let mut surfaced = Vec::new();
    for handle in handles {
        let text = handle.await.unwrap();
        surfaced.extend(text.lines().map(str::to_string).filter(|l| !l.is_empty()));
    }

    let unique: HashSet<_> = surfaced.iter().cloned().collect();
    assert_eq!(surfaced.len(), 4);
    assert_eq!(unique.len(), 4);
}
