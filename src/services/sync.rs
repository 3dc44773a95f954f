use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::board::gesture::MoveCommit;
use crate::config::Config;
use crate::domain::{Board, BoardError, BoardList, Card, CardPatch, NewCard};

use super::store::BoardStore;

/// Board contents as read from the durable store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadedBoard {
    pub lists: Vec<BoardList>,
    pub cards_by_list: HashMap<String, Vec<Card>>,
}

impl LoadedBoard {
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

/// How hard a commit tries before it gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl CommitPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.commit_max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.commit_backoff_ms),
        }
    }
}

impl Default for CommitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BoardEvent {
    MoveCommitted {
        card_id: String,
        list_id: String,
        position: f64,
        attempts: u32,
    },
    CommitFailed {
        card_id: String,
        error: String,
        attempts: u32,
    },
    /// A newer move of the same card was queued while this one was backing
    /// off, so the older write was dropped.
    CommitSuperseded {
        card_id: String,
    },
    CardCreated {
        card_id: String,
        list_id: String,
    },
    CardDeleted {
        card_id: String,
    },
}

/// Reads lists and cards of a board. Lookup failures degrade to an empty
/// board (or an empty list) and are logged, never returned.
pub async fn load_board(store: &dyn BoardStore, board_id: &str) -> LoadedBoard {
    let lists = match store.lists_for_board(board_id).await {
        Ok(lists) => lists,
        Err(e) => {
            tracing::warn!(board_id, error = %e, "Failed to load lists, showing empty board");
            return LoadedBoard::default();
        }
    };

    let results = join_all(lists.iter().map(|list| store.cards_for_list(&list.id))).await;

    let mut cards_by_list = HashMap::with_capacity(lists.len());
    for (list, result) in lists.iter().zip(results) {
        let cards = result.unwrap_or_else(|e| {
            tracing::warn!(list_id = list.id.as_str(), error = %e, "Failed to load cards for list");
            Vec::new()
        });
        cards_by_list.insert(list.id.clone(), cards);
    }

    LoadedBoard {
        lists,
        cards_by_list,
    }
}

/// Outcome of writing one row of a commit.
enum RowWrite {
    Written(u32),
    Superseded,
}

pub struct Synchronizer {
    store: Arc<dyn BoardStore>,
    policy: CommitPolicy,
    events: broadcast::Sender<BoardEvent>,
    next_generation: AtomicU64,
    /// Latest generation registered per card, one entry per card ever moved.
    /// A row is only written while its commit still owns the card.
    generations: Mutex<HashMap<String, u64>>,
    /// Held for the duration of a single store write, never across a backoff.
    write_lock: tokio::sync::Mutex<()>,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn BoardStore>, policy: CommitPolicy) -> Self {
        let (events, _rx) = broadcast::channel(100);
        Self {
            store,
            policy,
            events,
            next_generation: AtomicU64::new(1),
            generations: Mutex::new(HashMap::new()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    pub fn policy(&self) -> CommitPolicy {
        self.policy
    }

    pub async fn load(&self, board_id: &str) -> LoadedBoard {
        let loaded = load_board(self.store.as_ref(), board_id).await;
        tracing::debug!(
            board_id,
            lists = loaded.lists.len(),
            "Board loaded"
        );
        loaded
    }

    /// Project → board → lists → cards.
    pub async fn load_project(&self, project_id: &str) -> (Option<Board>, LoadedBoard) {
        match self.store.board_for_project(project_id).await {
            Ok(Some(board)) => {
                let loaded = self.load(&board.id).await;
                (Some(board), loaded)
            }
            Ok(None) => {
                tracing::info!(project_id, "Project has no board, showing empty board");
                (None, LoadedBoard::default())
            }
            Err(e) => {
                tracing::warn!(project_id, error = %e, "Failed to resolve project board");
                (None, LoadedBoard::default())
            }
        }
    }

    /// Claims every card a commit touches and returns the generation the
    /// writes must carry. Call it in gesture order, before the commit is
    /// spawned; a later registration for the same card supersedes this one.
    pub fn register(&self, commit: &MoveCommit) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let mut generations = self.generations.lock().unwrap_or_else(|e| e.into_inner());
        for card_id in commit
            .renumbered
            .iter()
            .map(|(id, _)| id)
            .chain(std::iter::once(&commit.card_id))
        {
            generations.insert(card_id.clone(), generation);
        }
        generation
    }

    /// Registers and persists a gesture in one step.
    pub async fn commit_move(&self, commit: &MoveCommit) -> Result<(), BoardError> {
        let generation = self.register(commit);
        self.commit_registered(commit, generation).await
    }

    /// Persists a completed gesture: renumbered neighbours first, then the
    /// moved card itself. Each row is its own write; there is no transaction
    /// and no version check, so concurrent writers resolve last-write-wins.
    /// Rows claimed by a newer commit from this synchronizer are skipped.
    pub async fn commit_registered(&self, commit: &MoveCommit, generation: u64) -> Result<(), BoardError> {
        let mut attempts = 0;

        for (card_id, position) in &commit.renumbered {
            let patch = CardPatch {
                board_list_id: None,
                position: Some(*position),
            };
            match self.update_with_retry(card_id, &patch, generation).await {
                Ok(RowWrite::Written(n)) => attempts += n,
                Ok(RowWrite::Superseded) => {
                    tracing::debug!(card_id = card_id.as_str(), "Renumber row superseded by a newer move");
                }
                Err((n, e)) => return Err(self.report_failure(commit, attempts + n, e)),
            }
        }

        let patch = CardPatch {
            board_list_id: Some(commit.dest_list_id.clone()),
            position: Some(commit.position),
        };
        match self.update_with_retry(&commit.card_id, &patch, generation).await {
            Ok(RowWrite::Written(n)) => {
                attempts += n;
                tracing::debug!(
                    card_id = commit.card_id.as_str(),
                    list_id = commit.dest_list_id.as_str(),
                    position = commit.position,
                    attempts,
                    "Move committed"
                );
                let _ = self.events.send(BoardEvent::MoveCommitted {
                    card_id: commit.card_id.clone(),
                    list_id: commit.dest_list_id.clone(),
                    position: commit.position,
                    attempts,
                });
                Ok(())
            }
            Ok(RowWrite::Superseded) => {
                tracing::debug!(
                    card_id = commit.card_id.as_str(),
                    generation,
                    "Move superseded by a newer move, dropping it"
                );
                let _ = self.events.send(BoardEvent::CommitSuperseded {
                    card_id: commit.card_id.clone(),
                });
                Ok(())
            }
            Err((n, e)) => Err(self.report_failure(commit, attempts + n, e)),
        }
    }

    fn is_current(&self, card_id: &str, generation: u64) -> bool {
        let generations = self.generations.lock().unwrap_or_else(|e| e.into_inner());
        generations.get(card_id).map_or(true, |g| *g == generation)
    }

    fn report_failure(&self, commit: &MoveCommit, attempts: u32, error: BoardError) -> BoardError {
        tracing::error!(
            card_id = commit.card_id.as_str(),
            attempts,
            error = %error,
            "Move commit failed; board is ahead of the store until reload"
        );
        let _ = self.events.send(BoardEvent::CommitFailed {
            card_id: commit.card_id.clone(),
            error: error.to_string(),
            attempts,
        });
        error
    }

    /// Returns the number of attempts used, alongside the error on failure.
    /// Each attempt re-checks that no newer commit has claimed the card.
    async fn update_with_retry(
        &self,
        card_id: &str,
        patch: &CardPatch,
        generation: u64,
    ) -> Result<RowWrite, (u32, BoardError)> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.initial_backoff;
        let mut attempt = 1;

        loop {
            let outcome = {
                let _guard = self.write_lock.lock().await;
                if !self.is_current(card_id, generation) {
                    return Ok(RowWrite::Superseded);
                }
                self.store.update_card(card_id, patch).await
            };

            match outcome {
                Ok(()) => return Ok(RowWrite::Written(attempt)),
                Err(e) if attempt < max_attempts && is_transient(&e) => {
                    tracing::warn!(card_id, attempt, error = %e, "Card update failed, retrying");
                    let jitter_ms = rand::thread_rng().gen_range(0..=delay.as_millis() as u64 / 4);
                    tokio::time::sleep(delay + Duration::from_millis(jitter_ms)).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err((attempt, e)),
            }
        }
    }

    pub async fn create_card(
        &self,
        list_id: &str,
        title: &str,
        creator_id: &str,
        position: f64,
    ) -> Result<Card, BoardError> {
        let card = self
            .store
            .insert_card(&NewCard {
                board_list_id: list_id.to_string(),
                title: title.to_string(),
                created_by: creator_id.to_string(),
                position,
            })
            .await?;

        tracing::info!(card_id = card.id.as_str(), list_id, position, "Card created");
        let _ = self.events.send(BoardEvent::CardCreated {
            card_id: card.id.clone(),
            list_id: list_id.to_string(),
        });

        Ok(card)
    }

    pub async fn delete_card(&self, card_id: &str) -> Result<(), BoardError> {
        self.store.delete_card(card_id).await?;

        tracing::info!(card_id, "Card deleted");
        let _ = self.events.send(BoardEvent::CardDeleted {
            card_id: card_id.to_string(),
        });

        Ok(())
    }
}

/// Missing rows and rejected input will not get better on a second try.
fn is_transient(err: &BoardError) -> bool {
    !matches!(err, BoardError::NotFound(_) | BoardError::BadRequest(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    use async_trait::async_trait;

    /// In-memory store whose card updates fail a configurable number of times.
    #[derive(Default)]
    struct ScriptedStore {
        failures_left: AtomicU32,
        updates: Mutex<Vec<(String, CardPatch)>>,
        calls: AtomicU32,
        broken_list: Option<String>,
    }

    #[async_trait]
    impl BoardStore for ScriptedStore {
        async fn board_for_project(&self, project_id: &str) -> Result<Option<Board>, BoardError> {
            Ok((project_id == "p1").then(|| Board {
                id: "b1".into(),
                project_id: "p1".into(),
                name: "Main".into(),
            }))
        }

        async fn lists_for_board(&self, board_id: &str) -> Result<Vec<BoardList>, BoardError> {
            if board_id != "b1" {
                return Err(BoardError::NotFound(format!("Board not found: {}", board_id)));
            }
            Ok(["todo", "done"]
                .iter()
                .enumerate()
                .map(|(i, id)| BoardList {
                    id: id.to_string(),
                    board_id: "b1".into(),
                    name: id.to_string(),
                    position: i as f64,
                })
                .collect())
        }

        async fn cards_for_list(&self, list_id: &str) -> Result<Vec<Card>, BoardError> {
            if self.broken_list.as_deref() == Some(list_id) {
                return Err(BoardError::Internal("list read failed".into()));
            }
            Ok(vec![Card {
                id: format!("{}-1", list_id),
                board_list_id: list_id.into(),
                title: "Card".into(),
                description: None,
                due_at: None,
                position: 100.0,
                created_by: "u1".into(),
                created_at: String::new(),
                updated_at: String::new(),
            }])
        }

        async fn update_card(&self, card_id: &str, patch: &CardPatch) -> Result<(), BoardError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if card_id == "gone" {
                return Err(BoardError::NotFound(format!("Card not found: {}", card_id)));
            }
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(BoardError::Internal("connection reset".into()));
            }
            self.updates
                .lock()
                .unwrap()
                .push((card_id.to_string(), patch.clone()));
            Ok(())
        }

        async fn insert_card(&self, card: &NewCard) -> Result<Card, BoardError> {
            Ok(Card {
                id: "new".into(),
                board_list_id: card.board_list_id.clone(),
                title: card.title.clone(),
                description: None,
                due_at: None,
                position: card.position,
                created_by: card.created_by.clone(),
                created_at: String::new(),
                updated_at: String::new(),
            })
        }

        async fn delete_card(&self, _card_id: &str) -> Result<(), BoardError> {
            Ok(())
        }
    }

    fn fast_policy(max_attempts: u32) -> CommitPolicy {
        CommitPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
        }
    }

    fn commit(card_id: &str) -> MoveCommit {
        MoveCommit {
            card_id: card_id.into(),
            dest_list_id: "done".into(),
            position: 150.0,
            renumbered: vec![],
        }
    }

    #[tokio::test]
    async fn load_reads_lists_and_cards() {
        let sync = Synchronizer::new(Arc::new(ScriptedStore::default()), fast_policy(1));
        let loaded = sync.load("b1").await;
        assert_eq!(loaded.lists.len(), 2);
        assert_eq!(loaded.cards_by_list["todo"][0].id, "todo-1");
    }

    #[tokio::test]
    async fn load_of_missing_board_is_empty() {
        let sync = Synchronizer::new(Arc::new(ScriptedStore::default()), fast_policy(1));
        assert!(sync.load("nope").await.is_empty());
        let (board, loaded) = sync.load_project("nope").await;
        assert!(board.is_none());
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn load_keeps_other_lists_when_one_fails() {
        let store = ScriptedStore {
            broken_list: Some("done".into()),
            ..Default::default()
        };
        let sync = Synchronizer::new(Arc::new(store), fast_policy(1));
        let (board, loaded) = sync.load_project("p1").await;
        assert_eq!(board.unwrap().id, "b1");
        assert_eq!(loaded.cards_by_list["todo"].len(), 1);
        assert!(loaded.cards_by_list["done"].is_empty());
    }

    #[tokio::test]
    async fn commit_retries_transient_failures() {
        let store = Arc::new(ScriptedStore {
            failures_left: AtomicU32::new(2),
            ..Default::default()
        });
        let sync = Synchronizer::new(store.clone(), fast_policy(3));
        let mut rx = sync.subscribe();

        sync.commit_move(&commit("c1")).await.unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        let updates = store.updates.lock().unwrap().clone();
        assert_eq!(
            updates,
            vec![(
                "c1".to_string(),
                CardPatch {
                    board_list_id: Some("done".into()),
                    position: Some(150.0)
                }
            )]
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            BoardEvent::MoveCommitted {
                card_id: "c1".into(),
                list_id: "done".into(),
                position: 150.0,
                attempts: 3
            }
        );
    }

    #[tokio::test]
    async fn commit_gives_up_after_max_attempts() {
        let store = Arc::new(ScriptedStore {
            failures_left: AtomicU32::new(10),
            ..Default::default()
        });
        let sync = Synchronizer::new(store.clone(), fast_policy(3));
        let mut rx = sync.subscribe();

        let err = sync.commit_move(&commit("c1")).await.unwrap_err();
        assert!(matches!(err, BoardError::Internal(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        match rx.recv().await.unwrap() {
            BoardEvent::CommitFailed { card_id, attempts, .. } => {
                assert_eq!(card_id, "c1");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_card_is_not_retried() {
        let store = Arc::new(ScriptedStore::default());
        let sync = Synchronizer::new(store.clone(), fast_policy(5));

        let err = sync.commit_move(&commit("gone")).await.unwrap_err();
        assert!(matches!(err, BoardError::NotFound(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn renumbered_rows_are_written_before_the_move() {
        let store = Arc::new(ScriptedStore::default());
        let sync = Synchronizer::new(store.clone(), fast_policy(1));
        let mut c = commit("c1");
        c.position = 200.0;
        c.renumbered = vec![("c0".into(), 100.0), ("c2".into(), 300.0)];

        sync.commit_move(&c).await.unwrap();

        let ids: Vec<_> = store
            .updates
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect();
        assert_eq!(ids, vec!["c0", "c2", "c1"]);
    }

    #[tokio::test]
    async fn retry_is_dropped_once_a_newer_move_of_the_card_lands() {
        let store = Arc::new(ScriptedStore {
            failures_left: AtomicU32::new(1),
            ..Default::default()
        });
        let sync = Arc::new(Synchronizer::new(
            store.clone(),
            CommitPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(200),
            },
        ));
        let mut rx = sync.subscribe();

        let mut first = commit("c1");
        first.dest_list_id = "todo".into();
        let first_generation = sync.register(&first);
        let retrying = {
            let sync = Arc::clone(&sync);
            tokio::spawn(async move { sync.commit_registered(&first, first_generation).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        sync.commit_move(&commit("c1")).await.unwrap();
        retrying.await.unwrap().unwrap();

        let updates = store.updates.lock().unwrap().clone();
        assert_eq!(
            updates,
            vec![(
                "c1".to_string(),
                CardPatch {
                    board_list_id: Some("done".into()),
                    position: Some(150.0)
                }
            )]
        );
        assert!(matches!(rx.recv().await.unwrap(), BoardEvent::MoveCommitted { .. }));
        assert_eq!(
            rx.recv().await.unwrap(),
            BoardEvent::CommitSuperseded { card_id: "c1".into() }
        );
    }

    #[tokio::test]
    async fn newer_move_skips_stale_renumber_row() {
        let store = Arc::new(ScriptedStore::default());
        let sync = Synchronizer::new(store.clone(), fast_policy(1));

        let mut older = commit("c1");
        older.renumbered = vec![("c2".into(), 300.0)];
        let older_generation = sync.register(&older);
        sync.commit_move(&commit("c2")).await.unwrap();
        sync.commit_registered(&older, older_generation).await.unwrap();

        let ids: Vec<_> = store
            .updates
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect();
        assert_eq!(ids, vec!["c2", "c1"]);
    }

    #[tokio::test]
    async fn create_card_broadcasts_event() {
        let sync = Synchronizer::new(Arc::new(ScriptedStore::default()), fast_policy(1));
        let mut rx = sync.subscribe();
        let card = sync.create_card("todo", "Write docs", "u1", 200.0).await.unwrap();
        assert_eq!(card.position, 200.0);
        assert_eq!(
            rx.recv().await.unwrap(),
            BoardEvent::CardCreated {
                card_id: "new".into(),
                list_id: "todo".into()
            }
        );
    }
}
