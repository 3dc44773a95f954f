use crate::board::state::{BoardState, DropTarget};
use crate::domain::position::{self, Allocation};
use crate::domain::GestureError;

/// Where the dragged card sat when the gesture began.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    pub list_id: String,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { card_id: String, origin: Origin },
}

/// Resolved drop point, already corrected for same-list moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub list_id: String,
    pub index: usize,
}

/// Everything the synchronizer needs to persist one completed gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveCommit {
    pub card_id: String,
    pub dest_list_id: String,
    pub position: f64,
    /// Other cards of the destination list that received fresh positions
    /// because the gap ran out. Empty on the common path.
    pub renumbered: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    Commit(MoveCommit),
    Cancelled,
}

/// A gesture is `start`, any number of `over` previews, then one `end` or
/// `cancel`. Previews only splice the card in the board; `end` is where the
/// durable position is allocated.
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn active_card(&self) -> Option<&str> {
        match &self.state {
            DragState::Idle => None,
            DragState::Dragging { card_id, .. } => Some(card_id),
        }
    }

    pub fn start(&mut self, board: &BoardState, card_id: &str) -> Result<(), GestureError> {
        if let DragState::Dragging { card_id: active, .. } = &self.state {
            return Err(GestureError::AlreadyDragging(active.clone()));
        }

        let (card, location) = board
            .card(card_id)
            .zip(board.locate(card_id))
            .ok_or_else(|| GestureError::UnknownCard(card_id.to_string()))?;

        self.state = DragState::Dragging {
            card_id: card_id.to_string(),
            origin: Origin {
                list_id: card.board_list_id.clone(),
                index: location.card_index,
            },
        };

        tracing::debug!(card_id, "Drag started");
        Ok(())
    }

    /// Live preview. Returns whether the board changed.
    pub fn over(&mut self, board: &mut BoardState, target_id: &str) -> Result<bool, GestureError> {
        let card_id = self
            .active_card()
            .ok_or(GestureError::NotDragging)?
            .to_string();

        let Some(dest) = resolve_destination(board, &card_id, target_id) else {
            return Ok(false);
        };

        if is_current_location(board, &card_id, &dest) {
            return Ok(false);
        }

        tracing::trace!(
            card_id = card_id.as_str(),
            list_id = dest.list_id.as_str(),
            index = dest.index,
            "Drag preview"
        );
        Ok(board.apply_move(&card_id, &dest.list_id, dest.index))
    }

    /// Finishes the gesture. A target that resolves to nothing is treated as
    /// a cancel. The controller is idle afterwards in every case.
    pub fn end(
        &mut self,
        board: &mut BoardState,
        target_id: Option<&str>,
    ) -> Result<DropOutcome, GestureError> {
        let DragState::Dragging { card_id, origin } = std::mem::take(&mut self.state) else {
            return Err(GestureError::NotDragging);
        };

        let Some(dest) = target_id.and_then(|t| resolve_destination(board, &card_id, t)) else {
            revert(board, &card_id, &origin);
            return Ok(DropOutcome::Cancelled);
        };

        board.apply_move(&card_id, &dest.list_id, dest.index);

        let siblings = board.positions_excluding(&dest.list_id, &card_id);
        let (position, renumbered) = match position::allocate(&siblings, dest.index) {
            Allocation::At(p) => {
                board.set_position(&card_id, p);
                (p, Vec::new())
            }
            Allocation::Renumber => {
                tracing::info!(
                    list_id = dest.list_id.as_str(),
                    cards = siblings.len() + 1,
                    "Position gap exhausted, renumbering list"
                );
                let mut rows = board.renumber(&dest.list_id);
                let idx = rows.iter().position(|(id, _)| *id == card_id);
                let p = idx.map(|i| rows.remove(i).1).unwrap_or(position::BASE_POSITION);
                (p, rows)
            }
        };

        tracing::debug!(
            card_id = card_id.as_str(),
            from_list = origin.list_id.as_str(),
            to_list = dest.list_id.as_str(),
            index = dest.index,
            position,
            "Drag ended"
        );

        Ok(DropOutcome::Commit(MoveCommit {
            card_id,
            dest_list_id: dest.list_id,
            position,
            renumbered,
        }))
    }

    /// Abandons the gesture and puts the card back where it started.
    pub fn cancel(&mut self, board: &mut BoardState) -> Result<DropOutcome, GestureError> {
        let DragState::Dragging { card_id, origin } = std::mem::take(&mut self.state) else {
            return Err(GestureError::NotDragging);
        };
        revert(board, &card_id, &origin);
        Ok(DropOutcome::Cancelled)
    }
}

/// Hovering a card at index k means "insert before k"; hovering a list means
/// "append". Within the same list a later index is shifted down by one,
/// because taking the card out first moves everything after it up a slot.
pub fn resolve_destination(
    board: &BoardState,
    card_id: &str,
    target_id: &str,
) -> Option<Destination> {
    let source = board.locate(card_id)?;
    let source_list = board.card(card_id)?.board_list_id.clone();

    let (list_id, index) = match board.resolve_target(target_id)? {
        DropTarget::List(list_id) => {
            let len = board.cards_in(&list_id).len();
            (list_id, len)
        }
        DropTarget::Card(other) if other == card_id => (source_list.clone(), source.card_index),
        DropTarget::Card(other) => {
            let list_id = board.card(&other)?.board_list_id.clone();
            (list_id, board.locate(&other)?.card_index)
        }
    };

    let index = if list_id == source_list && index > source.card_index {
        index - 1
    } else {
        index
    };

    Some(Destination { list_id, index })
}

fn is_current_location(board: &BoardState, card_id: &str, dest: &Destination) -> bool {
    match (board.card(card_id), board.locate(card_id)) {
        (Some(card), Some(loc)) => card.board_list_id == dest.list_id && loc.card_index == dest.index,
        _ => false,
    }
}

fn revert(board: &mut BoardState, card_id: &str, origin: &Origin) {
    if board.apply_move(card_id, &origin.list_id, origin.index) {
        tracing::debug!(card_id, list_id = origin.list_id.as_str(), "Drag cancelled, preview reverted");
    }
}
