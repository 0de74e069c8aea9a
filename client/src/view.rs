use std::collections::HashMap;

use minesweeper_common::{
    board::Board,
    models::{CellState, Point},
    protocol::Event,
};

use crate::sync::Mirror;

/// Local key input, before it becomes an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Up,
    Down,
    Left,
    Right,
    Open,
    Mark,
}

/// Player-local annotation. Never leaves this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Flagged,
    Guessed,
}

/// This player's cursor and markers, layered over the server's board.
///
/// Markers live here rather than in the mirrored board so a wholesale
/// snapshot replacement does not wipe them.
#[derive(Debug, Clone, Default)]
pub struct LocalView {
    cursor: Point,
    markers: HashMap<Point, Marker>,
    epoch: Option<u64>,
}

impl LocalView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn marker(&self, point: Point) -> Option<Marker> {
        self.markers.get(&point).copied()
    }

    /// Applies one key press. Returns the event to send, if any; marking
    /// is handled locally and never produces one.
    pub fn apply(&mut self, input: Input, board: &Board) -> Option<Event> {
        let dims = board.dimensions();
        let Point { row, col } = self.cursor;

        let moved = match input {
            Input::Up if row > 0 => Point::new(row - 1, col),
            Input::Down if row + 1 < dims.rows => Point::new(row + 1, col),
            Input::Left if col > 0 => Point::new(row, col - 1),
            Input::Right if col + 1 < dims.cols => Point::new(row, col + 1),
            Input::Up | Input::Down | Input::Left | Input::Right => return None,
            Input::Open => return Some(Event::open_cell(self.cursor)),
            Input::Mark => {
                self.cycle_marker(board);
                return None;
            }
        };

        self.cursor = moved;
        Some(Event::cursor_move(moved))
    }

    // hidden -> flagged -> guessed -> hidden
    fn cycle_marker(&mut self, board: &Board) {
        if board.state(self.cursor) != Some(CellState::Hidden) {
            return;
        }
        match self.markers.get(&self.cursor) {
            None => {
                self.markers.insert(self.cursor, Marker::Flagged);
            }
            Some(Marker::Flagged) => {
                self.markers.insert(self.cursor, Marker::Guessed);
            }
            Some(Marker::Guessed) => {
                self.markers.remove(&self.cursor);
            }
        }
    }

    /// What to draw at `point`: the server's state, with this player's
    /// markers on cells that are still hidden.
    pub fn cell(&self, board: &Board, point: Point) -> Option<CellState> {
        match (board.state(point)?, self.marker(point)) {
            (CellState::Hidden, Some(Marker::Flagged)) => Some(CellState::Flagged),
            (CellState::Hidden, Some(Marker::Guessed)) => Some(CellState::Guessed),
            (state, _) => Some(state),
        }
    }

    /// Brings the view in line with `mirror`. On the first sync against a new
    /// connection the cursor is taken from the server, which opens cells at
    /// its own copy. Markers on cells since revealed are forgotten.
    pub fn sync(&mut self, mirror: &Mirror) {
        if self.epoch != Some(mirror.epoch()) {
            if let Some(cursor) = mirror.own_cursor() {
                self.cursor = cursor;
            }
            self.epoch = Some(mirror.epoch());
        }

        let board = mirror.board();
        self.markers
            .retain(|point, _| board.state(*point) == Some(CellState::Hidden));

        let dims = board.dimensions();
        self.cursor = Point::new(
            self.cursor.row.min(dims.rows - 1),
            self.cursor.col.min(dims.cols - 1),
        );
    }
}

#[cfg(test)]
mod tests {
    use minesweeper_common::{
        models::{PlayerView, Slot},
        protocol::{EventKind, Snapshot},
    };

    use super::*;

    fn board() -> Board {
        Board::from_mines(3, 3, &[Point::new(0, 0)]).unwrap()
    }

    fn mirror(board: Board, own_cursor: Point, epoch: u64) -> Mirror {
        Mirror::new(
            Snapshot {
                board,
                active: Slot::P1,
                you: Slot::P2,
                players: vec![PlayerView {
                    slot: Slot::P2,
                    online: true,
                    cursor: own_cursor,
                }],
            },
            epoch,
        )
    }

    #[test]
    fn arrows_move_within_bounds() {
        let board = board();
        let mut view = LocalView::new();

        assert_eq!(view.apply(Input::Up, &board), None);
        assert_eq!(view.apply(Input::Left, &board), None);
        assert_eq!(
            view.apply(Input::Down, &board),
            Some(Event::cursor_move(Point::new(1, 0)))
        );
        view.apply(Input::Right, &board);
        view.apply(Input::Right, &board);
        assert_eq!(view.apply(Input::Right, &board), None);
        assert_eq!(view.cursor(), Point::new(1, 2));
    }

    #[test]
    fn open_sends_current_cursor() {
        let board = board();
        let mut view = LocalView::new();
        view.apply(Input::Down, &board);

        let event = view.apply(Input::Open, &board).unwrap();
        assert_eq!(event.kind, EventKind::OpenCell);
        assert_eq!(event.position, Point::new(1, 0));
    }

    #[test]
    fn marking_cycles_locally() {
        let board = board();
        let mut view = LocalView::new();

        assert_eq!(view.apply(Input::Mark, &board), None);
        assert_eq!(view.cell(&board, Point::ORIGIN), Some(CellState::Flagged));
        view.apply(Input::Mark, &board);
        assert_eq!(view.cell(&board, Point::ORIGIN), Some(CellState::Guessed));
        view.apply(Input::Mark, &board);
        assert_eq!(view.cell(&board, Point::ORIGIN), Some(CellState::Hidden));
    }

    #[test]
    fn revealed_cells_drop_markers() {
        let mut board = board();
        let mut view = LocalView::new();
        view.apply(Input::Right, &board);
        view.apply(Input::Mark, &board);
        assert_eq!(view.marker(Point::new(0, 1)), Some(Marker::Flagged));

        board.reveal(Point::new(0, 1)).unwrap();
        view.sync(&mirror(board.clone(), Point::new(0, 1), 1));

        assert_eq!(view.marker(Point::new(0, 1)), None);
        assert_eq!(view.cell(&board, Point::new(0, 1)), Some(CellState::Revealed(1)));
        // revealed cells cannot be marked
        view.apply(Input::Mark, &board);
        assert_eq!(view.marker(Point::new(0, 1)), None);
    }

    #[test]
    fn new_connection_adopts_server_cursor() {
        let board = board();
        let mut view = LocalView::new();
        view.sync(&mirror(board.clone(), Point::ORIGIN, 1));
        view.apply(Input::Down, &board);
        view.apply(Input::Down, &board);

        // same connection: the local cursor is ahead of the echoes
        view.sync(&mirror(board.clone(), Point::new(1, 0), 1));
        assert_eq!(view.cursor(), Point::new(2, 0));

        view.sync(&mirror(board.clone(), Point::new(0, 2), 2));
        assert_eq!(view.cursor(), Point::new(0, 2));
        assert_eq!(
            view.apply(Input::Open, &board),
            Some(Event::open_cell(Point::new(0, 2)))
        );
    }
}
