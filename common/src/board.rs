use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::BoardError,
    models::{CellState, Content, Dimensions, LossCause, Phase, Point},
};

/// Result of a single accepted reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealOutcome {
    /// Cells that changed from hidden to shown, not counting the win-time
    /// force reveal.
    pub revealed: usize,
    pub phase: Phase,
}

/// The authoritative game board.
///
/// Mine layout is fixed at creation; reveal state only changes through
/// [`Board::reveal`] and phase only moves forward.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(try_from = "RawBoard")]
pub struct Board {
    dimensions: Dimensions,
    contents: Vec<Content>,
    states: Vec<CellState>,
    remaining: usize,
    phase: Phase,
}

/// Wire shape of [`Board`], checked before it becomes one.
#[derive(Deserialize)]
struct RawBoard {
    dimensions: Dimensions,
    contents: Vec<Content>,
    states: Vec<CellState>,
    remaining: usize,
    phase: Phase,
}

impl TryFrom<RawBoard> for Board {
    type Error = BoardError;

    fn try_from(raw: RawBoard) -> Result<Self, Self::Error> {
        let Dimensions { rows, cols } = raw.dimensions;
        let area = match rows.checked_mul(cols) {
            Some(area) if area > 0 => area,
            _ => return Err(BoardError::InvalidDimensions { rows, cols }),
        };
        if raw.contents.len() != area || raw.states.len() != area {
            return Err(BoardError::GridMismatch {
                area,
                contents: raw.contents.len(),
                states: raw.states.len(),
            });
        }

        let actual = raw
            .contents
            .iter()
            .zip(&raw.states)
            .filter(|(content, state)| {
                **content == Content::Adjacent(0) && **state != CellState::Empty
            })
            .count();
        if actual != raw.remaining {
            return Err(BoardError::RemainingMismatch {
                reported: raw.remaining,
                actual,
            });
        }

        Ok(Self {
            dimensions: raw.dimensions,
            contents: raw.contents,
            states: raw.states,
            remaining: raw.remaining,
            phase: raw.phase,
        })
    }
}

fn validate_dimensions(rows: usize, cols: usize) -> Result<Dimensions, BoardError> {
    if rows == 0 || cols == 0 {
        return Err(BoardError::InvalidDimensions { rows, cols });
    }
    Ok(Dimensions::new(rows, cols))
}

fn count_adjacent_mines(mines: &[bool], dims: Dimensions, point: Point) -> u8 {
    dims.neighbours(point)
        .filter(|&n| mines[dims.index(n)])
        .count() as u8
}

impl Board {
    /// Random board with `mines` mines over distinct cells.
    pub fn create(rows: usize, cols: usize, mines: usize) -> Result<Self, BoardError> {
        Self::create_with_rng(rows, cols, mines, &mut rand::rng())
    }

    pub fn create_with_rng<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        mines: usize,
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        let dims = validate_dimensions(rows, cols)?;
        let area = dims.area();
        if mines == 0 || mines >= area {
            return Err(BoardError::InvalidMineCount {
                mines,
                max: area - 1,
            });
        }

        let mut layout = vec![false; area];
        let mut placed = 0;
        while placed < mines {
            let index = rng.random_range(0..area);
            if !layout[index] {
                layout[index] = true;
                placed += 1;
            }
        }

        debug!("Placed {} mines on a {}x{} board", mines, rows, cols);
        Ok(Self::from_layout(dims, &layout))
    }

    /// Board with mines at exactly the given points. Unlike [`Board::create`]
    /// this accepts a mine-free layout.
    pub fn from_mines(rows: usize, cols: usize, mines: &[Point]) -> Result<Self, BoardError> {
        let dims = validate_dimensions(rows, cols)?;
        let mut layout = vec![false; dims.area()];
        for &mine in mines {
            if !dims.contains(mine) {
                return Err(BoardError::OutOfBounds(mine));
            }
            layout[dims.index(mine)] = true;
        }

        let placed = layout.iter().filter(|mine| **mine).count();
        if placed >= dims.area() {
            return Err(BoardError::InvalidMineCount {
                mines: placed,
                max: dims.area() - 1,
            });
        }

        Ok(Self::from_layout(dims, &layout))
    }

    fn from_layout(dims: Dimensions, layout: &[bool]) -> Self {
        let contents: Vec<Content> = (0..dims.area())
            .map(|index| {
                if layout[index] {
                    Content::Mine
                } else {
                    Content::Adjacent(count_adjacent_mines(layout, dims, dims.point(index)))
                }
            })
            .collect();

        let remaining = contents
            .iter()
            .filter(|content| **content == Content::Adjacent(0))
            .count();

        Self {
            dimensions: dims,
            states: vec![CellState::Hidden; contents.len()],
            contents,
            remaining,
            phase: Phase::InProgress,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Zero-adjacency cells not yet revealed.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn mine_count(&self) -> usize {
        self.contents
            .iter()
            .filter(|content| **content == Content::Mine)
            .count()
    }

    pub fn content(&self, point: Point) -> Option<Content> {
        self.dimensions
            .contains(point)
            .then(|| self.contents[self.dimensions.index(point)])
    }

    pub fn state(&self, point: Point) -> Option<CellState> {
        self.dimensions
            .contains(point)
            .then(|| self.states[self.dimensions.index(point)])
    }

    /// Reveal grid in row-major order.
    pub fn states(&self) -> &[CellState] {
        &self.states
    }

    /// Mine grid in row-major order.
    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    pub fn reveal(&mut self, point: Point) -> Result<RevealOutcome, BoardError> {
        if !self.dimensions.contains(point) {
            return Err(BoardError::OutOfBounds(point));
        }
        if !self.phase.is_in_progress() {
            return Err(BoardError::Finished);
        }

        let index = self.dimensions.index(point);
        let revealed = match self.contents[index] {
            Content::Mine => {
                self.states[index] = CellState::Mine;
                self.phase = Phase::Lost(LossCause::Mine);
                debug!("Mine revealed at {}", point);
                1
            }
            Content::Adjacent(0) => self.flood_fill(point),
            Content::Adjacent(count) => {
                if self.states[index].is_revealed() {
                    0
                } else {
                    self.states[index] = CellState::Revealed(count);
                    1
                }
            }
        };

        if self.remaining == 0 && self.phase.is_in_progress() {
            self.phase = Phase::Won;
            self.reveal_all();
            debug!("Board cleared");
        }

        Ok(RevealOutcome {
            revealed,
            phase: self.phase,
        })
    }

    /// Ends an in-progress game because a player left. Returns whether the
    /// phase changed.
    pub fn abandon(&mut self) -> bool {
        if !self.phase.is_in_progress() {
            return false;
        }
        self.phase = Phase::Lost(LossCause::Abandoned);
        true
    }

    fn flood_fill(&mut self, start: Point) -> usize {
        let dims = self.dimensions;
        let mut stack = vec![start];
        let mut revealed = 0;

        while let Some(point) = stack.pop() {
            let index = dims.index(point);
            match (self.contents[index], self.states[index]) {
                (_, CellState::Empty) => {}
                (Content::Adjacent(0), _) => {
                    self.states[index] = CellState::Empty;
                    self.remaining -= 1;
                    revealed += 1;
                    stack.extend(
                        dims.neighbours(point)
                            .filter(|&n| self.states[dims.index(n)] != CellState::Empty),
                    );
                }
                (Content::Adjacent(count), state) => {
                    if !state.is_revealed() {
                        self.states[index] = CellState::Revealed(count);
                        revealed += 1;
                    }
                }
                // a zero cell never borders a mine
                (Content::Mine, _) => {}
            }
        }

        revealed
    }

    fn reveal_all(&mut self) {
        for (state, content) in self.states.iter_mut().zip(&self.contents) {
            if state.is_revealed() {
                continue;
            }
            *state = match content {
                Content::Mine => CellState::Mine,
                Content::Adjacent(0) => CellState::Empty,
                Content::Adjacent(count) => CellState::Revealed(*count),
            };
        }
    }
}
