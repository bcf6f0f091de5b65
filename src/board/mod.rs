use std::collections::VecDeque;

use rand::Rng;

use crate::{
    error::{GameError, Result},
    model::{BoardSettings, CellView, Pos},
};

/// Upper bound on board sides accepted by [`Board::new`].
pub const MAX_SIDE: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Hidden,
    Flagged,
    Revealed,
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub mine: bool,
    pub adjacent: u8,
    pub state: CellState,
}

impl Cell {
    fn covered() -> Self {
        Self {
            mine: false,
            adjacent: 0,
            state: CellState::Hidden,
        }
    }
}

impl From<&Cell> for CellView {
    fn from(cell: &Cell) -> Self {
        match cell.state {
            CellState::Hidden => Self::Hidden,
            CellState::Flagged => Self::Flagged,
            CellState::Revealed if cell.mine => Self::Mine,
            CellState::Revealed => Self::Revealed {
                adjacent: cell.adjacent,
            },
        }
    }
}

/// Row-major grid for one game. A freshly configured board has no mines yet;
/// placement is deferred until the first reveal so the opening click can be
/// kept safe.
#[derive(Debug, Clone)]
pub struct Board {
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
    pub placed: bool,
    pub revealed: usize,
    pub flagged: usize,
    pub cells: Vec<Cell>,
}

impl Board {
    pub fn new(settings: &BoardSettings) -> Result<Self> {
        let BoardSettings { rows, cols, mines } = *settings;

        if rows == 0 || cols == 0 || rows > MAX_SIDE || cols > MAX_SIDE {
            return Err(GameError::InvalidConfiguration);
        }
        // at least one safe cell must exist
        if mines == 0 || mines > rows * cols - 1 {
            return Err(GameError::InvalidConfiguration);
        }

        Ok(Self {
            rows,
            cols,
            mines,
            placed: false,
            revealed: 0,
            flagged: 0,
            cells: vec![Cell::covered(); rows * cols],
        })
    }

    /// Board with an explicit mine layout, for callers that need full control
    /// over placement instead of the random scatter.
    pub fn with_mines(rows: usize, cols: usize, mines: &[Pos]) -> Result<Self> {
        let settings = BoardSettings {
            rows,
            cols,
            mines: mines.len(),
        };
        let mut board = Self::new(&settings)?;

        for pos in mines {
            let index = board.index_of(*pos)?;
            if board.cells[index].mine {
                return Err(GameError::InvalidConfiguration);
            }
            board.cells[index].mine = true;
        }

        board.count_adjacent();
        board.placed = true;
        Ok(board)
    }

    pub fn index_of(&self, pos: Pos) -> Result<usize> {
        if pos.row < self.rows && pos.col < self.cols {
            Ok(pos.row * self.cols + pos.col)
        } else {
            Err(GameError::InvalidCoordinate)
        }
    }

    fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let row = index / self.cols;
        let col = index % self.cols;

        (-1..=1)
            .flat_map(move |dr: isize| (-1..=1).map(move |dc: isize| (dr, dc)))
            .filter(|&(dr, dc)| dr != 0 || dc != 0)
            .filter_map(move |(dr, dc)| {
                let r = row.checked_add_signed(dr)?;
                let c = col.checked_add_signed(dc)?;
                (r < self.rows && c < self.cols).then_some(r * self.cols + c)
            })
    }

    /// Scatter the configured number of mines, shielding the first-revealed
    /// cell and its neighbors so the opening click lands on a zero cell. On
    /// boards too dense for the full shield only the clicked cell is spared.
    pub fn place_mines(&mut self, first: usize) {
        let mut shielded = vec![false; self.cells.len()];
        shielded[first] = true;
        for neighbor in self.neighbors(first) {
            shielded[neighbor] = true;
        }

        let mut open = self.cells.len() - shielded.iter().filter(|&&s| s).count();
        if open < self.mines {
            shielded.fill(false);
            shielded[first] = true;
            open = self.cells.len() - 1;
        }

        let mut rng = rand::rng();
        let mut left = self.mines;
        for index in 0..self.cells.len() {
            if shielded[index] {
                continue;
            }
            if left > 0 && rng.random_ratio(left as u32, open as u32) {
                self.cells[index].mine = true;
                left -= 1;
            }
            open -= 1;
        }

        self.count_adjacent();
        self.placed = true;
    }

    fn count_adjacent(&mut self) {
        for index in 0..self.cells.len() {
            let count = self.neighbors(index).filter(|&n| self.cells[n].mine).count();
            self.cells[index].adjacent = count as u8;
        }
    }

    /// Reveal `start` and, when it has no adjacent mines, the whole connected
    /// zero region plus its numbered border. Flagged cells swallowed by the
    /// flood are unflagged so the flag count stays in sync; mines are never
    /// reached, a mine is never adjacent to a zero cell.
    pub fn reveal_flood(&mut self, start: usize) {
        let mut queue = VecDeque::from([start]);

        while let Some(index) = queue.pop_front() {
            if self.cells[index].state == CellState::Revealed {
                continue;
            }

            if self.cells[index].state == CellState::Flagged {
                self.flagged -= 1;
            }
            self.cells[index].state = CellState::Revealed;
            self.revealed += 1;

            if self.cells[index].adjacent == 0 {
                queue.extend(
                    self.neighbors(index)
                        .filter(|&n| self.cells[n].state != CellState::Revealed),
                );
            }
        }
    }

    /// Expose every mine for the end-of-game projection.
    pub fn reveal_mines(&mut self) {
        for cell in &mut self.cells {
            if cell.mine {
                if cell.state == CellState::Flagged {
                    self.flagged -= 1;
                }
                cell.state = CellState::Revealed;
            }
        }
    }

    /// Toggles the flag on a covered cell; revealed cells are left untouched.
    /// Returns whether anything changed.
    pub fn toggle_flag(&mut self, index: usize) -> bool {
        match self.cells[index].state {
            CellState::Hidden => {
                self.cells[index].state = CellState::Flagged;
                self.flagged += 1;
                true
            }
            CellState::Flagged => {
                self.cells[index].state = CellState::Hidden;
                self.flagged -= 1;
                true
            }
            CellState::Revealed => false,
        }
    }

    pub fn has_won(&self) -> bool {
        self.revealed + self.mines == self.rows * self.cols
    }

    /// Signed: over-flagging drives this below zero.
    pub fn mines_remaining(&self) -> i64 {
        self.mines as i64 - self.flagged as i64
    }

    pub fn view(&self) -> Vec<Vec<CellView>> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(CellView::from).collect())
            .collect()
    }

    pub fn flag_view(&self) -> Vec<Vec<bool>> {
        self.cells
            .chunks(self.cols)
            .map(|row| {
                row.iter()
                    .map(|cell| cell.state == CellState::Flagged)
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: usize, col: usize) -> Pos {
        Pos { row, col }
    }

    fn settings(rows: usize, cols: usize, mines: usize) -> BoardSettings {
        BoardSettings { rows, cols, mines }
    }

    #[test]
    fn rejects_impossible_configurations() {
        assert_eq!(
            Board::new(&settings(0, 5, 1)).unwrap_err(),
            GameError::InvalidConfiguration
        );
        assert_eq!(
            Board::new(&settings(5, 0, 1)).unwrap_err(),
            GameError::InvalidConfiguration
        );
        assert_eq!(
            Board::new(&settings(5, 5, 0)).unwrap_err(),
            GameError::InvalidConfiguration
        );
        assert_eq!(
            Board::new(&settings(5, 5, 25)).unwrap_err(),
            GameError::InvalidConfiguration
        );
        assert_eq!(
            Board::new(&settings(300, 5, 3)).unwrap_err(),
            GameError::InvalidConfiguration
        );
        assert!(Board::new(&settings(5, 5, 24)).is_ok());
    }

    #[test]
    fn neighbor_counts_respect_the_grid_edges() {
        let board = Board::new(&settings(3, 3, 1)).unwrap();
        assert_eq!(board.neighbors(0).count(), 3); // corner
        assert_eq!(board.neighbors(1).count(), 5); // edge
        assert_eq!(board.neighbors(4).count(), 8); // center
    }

    #[test]
    fn adjacency_counts_match_the_mine_layout() {
        let board = Board::with_mines(3, 3, &[pos(0, 0), pos(2, 2)]).unwrap();

        let adjacent =
            |row, col| board.cells[board.index_of(pos(row, col)).unwrap()].adjacent;
        assert_eq!(adjacent(1, 1), 2);
        assert_eq!(adjacent(0, 1), 1);
        assert_eq!(adjacent(2, 1), 1);
        assert_eq!(adjacent(2, 0), 0);
    }

    #[test]
    fn placement_spares_the_opening_and_places_the_requested_count() {
        for _ in 0..50 {
            let mut board = Board::new(&settings(8, 8, 10)).unwrap();
            board.place_mines(board.index_of(pos(0, 0)).unwrap());

            assert!(board.placed);
            assert_eq!(board.cells.iter().filter(|cell| cell.mine).count(), 10);
            for row in 0..2 {
                for col in 0..2 {
                    assert!(!board.cells[row * 8 + col].mine);
                }
            }
        }
    }

    #[test]
    fn dense_boards_fall_back_to_shielding_only_the_clicked_cell() {
        for _ in 0..20 {
            let mut board = Board::new(&settings(2, 2, 3)).unwrap();
            board.place_mines(0);

            assert!(!board.cells[0].mine);
            assert_eq!(board.cells.iter().filter(|cell| cell.mine).count(), 3);
        }
    }

    #[test]
    fn flood_opens_the_zero_region_and_stops_at_the_numbered_border() {
        let mut board = Board::with_mines(1, 7, &[pos(0, 3)]).unwrap();
        board.reveal_flood(0);

        assert_eq!(board.revealed, 3);
        assert_eq!(board.cells[0].state, CellState::Revealed);
        assert_eq!(board.cells[1].state, CellState::Revealed);
        assert_eq!(board.cells[2].state, CellState::Revealed);
        assert_eq!(board.cells[4].state, CellState::Hidden);
        assert_eq!(board.cells[5].state, CellState::Hidden);
    }

    #[test]
    fn flood_clears_flags_it_rolls_over() {
        let mut board = Board::with_mines(1, 7, &[pos(0, 3)]).unwrap();
        board.toggle_flag(1);
        assert_eq!(board.mines_remaining(), 0);

        board.reveal_flood(0);

        assert_eq!(board.cells[1].state, CellState::Revealed);
        assert_eq!(board.mines_remaining(), 1);
    }

    #[test]
    fn reveal_mines_exposes_only_mines() {
        let mut board = Board::with_mines(2, 2, &[pos(0, 1), pos(1, 0)]).unwrap();
        board.reveal_mines();

        assert_eq!(board.cells[1].state, CellState::Revealed);
        assert_eq!(board.cells[2].state, CellState::Revealed);
        assert_eq!(board.cells[0].state, CellState::Hidden);
        assert_eq!(board.cells[3].state, CellState::Hidden);
    }

    #[test]
    fn flags_never_attach_to_revealed_cells() {
        let mut board = Board::with_mines(2, 2, &[pos(1, 1)]).unwrap();
        board.reveal_flood(0);

        assert!(!board.toggle_flag(0));
        assert_eq!(board.flagged, 0);
    }

    #[test]
    fn with_mines_rejects_duplicates_and_out_of_bounds() {
        assert_eq!(
            Board::with_mines(2, 2, &[pos(0, 0), pos(0, 0)]).unwrap_err(),
            GameError::InvalidConfiguration
        );
        assert_eq!(
            Board::with_mines(2, 2, &[pos(5, 5)]).unwrap_err(),
            GameError::InvalidCoordinate
        );
    }
}
