use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::board::gesture::{DragController, DragState, DropOutcome, MoveCommit};
use crate::board::state::BoardState;
use crate::domain::position;
use crate::domain::{BoardError, Card, GestureError};
use crate::services::sync::LoadedBoard;
use crate::services::Synchronizer;

/// Handle for a commit running in the background.
pub type CommitHandle = JoinHandle<Result<(), BoardError>>;

/// One client's view of a board: the rendered snapshot, the gesture in
/// progress and the channel back to the durable store.
pub struct BoardSession {
    board: BoardState,
    drag: DragController,
    sync: Arc<Synchronizer>,
    board_id: Option<String>,
}

impl BoardSession {
    pub fn new(sync: Arc<Synchronizer>) -> Self {
        Self {
            board: BoardState::new(),
            drag: DragController::new(),
            sync,
            board_id: None,
        }
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn board_id(&self) -> Option<&str> {
        self.board_id.as_deref()
    }

    pub fn drag_state(&self) -> &DragState {
        self.drag.state()
    }

    pub async fn load(&mut self, board_id: &str) {
        let loaded = self.sync.load(board_id).await;
        self.install(Some(board_id.to_string()), loaded);
    }

    pub async fn load_project(&mut self, project_id: &str) {
        let (board, loaded) = self.sync.load_project(project_id).await;
        self.install(board.map(|b| b.id), loaded);
    }

    /// Re-reads the current board from the store, discarding local state.
    pub async fn reload(&mut self) {
        if let Some(board_id) = self.board_id.clone() {
            self.load(&board_id).await;
        }
    }

    fn install(&mut self, board_id: Option<String>, loaded: LoadedBoard) {
        self.drag = DragController::new();
        self.board.load(loaded.lists, loaded.cards_by_list);
        self.board_id = board_id;
    }

    pub fn drag_start(&mut self, card_id: &str) -> Result<(), GestureError> {
        self.drag.start(&self.board, card_id)
    }

    pub fn drag_over(&mut self, target_id: &str) -> Result<bool, GestureError> {
        self.drag.over(&mut self.board, target_id)
    }

    /// Drops the card. On a valid target the commit is spawned and its handle
    /// returned; the board already shows the result.
    pub fn drag_end(&mut self, target_id: Option<&str>) -> Result<Option<CommitHandle>, GestureError> {
        match self.drag.end(&mut self.board, target_id)? {
            DropOutcome::Commit(commit) => Ok(Some(self.spawn_commit(commit))),
            DropOutcome::Cancelled => Ok(None),
        }
    }

    pub fn drag_cancel(&mut self) -> Result<(), GestureError> {
        self.drag.cancel(&mut self.board).map(|_| ())
    }

    /// Programmatic move, equivalent to a gesture with no previews.
    pub fn move_card(&mut self, card_id: &str, target_id: &str) -> Result<Option<CommitHandle>, GestureError> {
        self.drag_start(card_id)?;
        self.drag_end(Some(target_id))
    }

    /// Registration happens here, in gesture order, so a retrying commit can
    /// tell that a later move of the same card has overtaken it.
    fn spawn_commit(&self, commit: MoveCommit) -> CommitHandle {
        let generation = self.sync.register(&commit);
        let sync = Arc::clone(&self.sync);
        tokio::spawn(async move { sync.commit_registered(&commit, generation).await })
    }

    /// Creates a card at the end of a list and shows it once the store has
    /// assigned its id.
    pub async fn add_card(&mut self, list_id: &str, title: &str, creator_id: &str) -> Result<Card, BoardError> {
        if self.board.list_index(list_id).is_none() {
            return Err(BoardError::NotFound(format!("List not found: {}", list_id)));
        }

        let positions = self.board.positions_excluding(list_id, "");
        let position = position::next_position(&positions);
        let card = self.sync.create_card(list_id, title, creator_id, position).await?;

        self.board.insert_card(card.clone());
        Ok(card)
    }

    pub async fn delete_card(&mut self, card_id: &str) -> Result<(), BoardError> {
        if self.drag.active_card() == Some(card_id) {
            self.drag.cancel(&mut self.board).ok();
        }
        self.sync.delete_card(card_id).await?;
        self.board.remove_card(card_id);
        Ok(())
    }
}
