use std::{sync::Arc, time::Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::{
    board::{Board, CellState},
    error::{GameError, Result},
    model::{BoardSettings, CellView, Pos},
};

/// All live sessions, keyed by the public id handed to the client.
pub type Sessions = Arc<DashMap<String, Arc<Mutex<GameSession>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Configured, mines not placed yet. Ends with the first reveal.
    NotStarted,
    InProgress,
    Won,
    Lost,
}

impl GameStatus {
    pub const fn is_over(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Wall-clock seconds for one game. Starts on demand and freezes for good
/// once the game ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameTimer {
    started: Option<Instant>,
    frozen: Option<u64>,
}

impl GameTimer {
    /// Idempotent: a second start keeps the original origin, and a frozen
    /// timer stays frozen.
    pub fn start(&mut self) {
        if self.started.is_none() && self.frozen.is_none() {
            self.started = Some(Instant::now());
        }
    }

    pub fn freeze(&mut self) {
        if self.frozen.is_none() {
            self.frozen = Some(self.elapsed_seconds());
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        match (self.frozen, self.started) {
            (Some(frozen), _) => frozen,
            (None, Some(started)) => started.elapsed().as_secs(),
            (None, None) => 0,
        }
    }
}

/// What a reveal did to the session, with the projection the request layer
/// serializes back to the client.
#[derive(Debug)]
pub struct RevealOutcome {
    pub field: Vec<Vec<CellView>>,
    pub won: bool,
    pub lost: bool,
    pub elapsed: u64,
}

#[derive(Debug)]
pub struct FlagOutcome {
    pub flags: Vec<Vec<bool>>,
    pub mines_remaining: i64,
    pub won: bool,
}

/// One game: a board, its lifecycle status, and the clock. Mutations are
/// serialized by the per-session mutex in [`Sessions`]; every method here
/// runs to completion without suspension.
pub struct GameSession {
    board: Board,
    status: GameStatus,
    timer: GameTimer,
    last_activity: Instant,
}

impl GameSession {
    pub fn new(settings: &BoardSettings) -> Result<Self> {
        info!(
            "creating session: {}x{} with {} mines",
            settings.rows, settings.cols, settings.mines
        );
        Ok(Self {
            board: Board::new(settings)?,
            status: GameStatus::NotStarted,
            timer: GameTimer::default(),
            last_activity: Instant::now(),
        })
    }

    /// Session over a board built with [`Board::with_mines`]; skips deferred
    /// placement since the layout is already fixed.
    pub fn with_board(board: Board) -> Self {
        let status = if board.placed {
            GameStatus::InProgress
        } else {
            GameStatus::NotStarted
        };
        Self {
            board,
            status,
            timer: GameTimer::default(),
            last_activity: Instant::now(),
        }
    }

    /// Throw the current game away and start over with `settings`. Board,
    /// flags, and timer are all fresh afterwards; the old state is untouched
    /// if validation fails.
    #[instrument(level = "trace", skip(self))]
    pub fn reconfigure(&mut self, settings: &BoardSettings) -> Result<()> {
        self.board = Board::new(settings)?;
        self.status = GameStatus::NotStarted;
        self.timer = GameTimer::default();
        self.touch();
        info!(
            "session reconfigured: {}x{} with {} mines",
            settings.rows, settings.cols, settings.mines
        );
        Ok(())
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn settings(&self) -> BoardSettings {
        BoardSettings {
            rows: self.board.rows,
            cols: self.board.cols,
            mines: self.board.mines,
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed_seconds()
    }

    pub fn mines_remaining(&self) -> i64 {
        self.board.mines_remaining()
    }

    pub fn field(&self) -> Vec<Vec<CellView>> {
        self.board.view()
    }

    pub fn start_timer(&mut self) {
        self.touch();
        self.timer.start();
    }

    #[instrument(level = "trace", skip(self), fields(row = pos.row, col = pos.col))]
    pub fn reveal(&mut self, pos: Pos) -> Result<RevealOutcome> {
        let index = self.board.index_of(pos)?;
        self.check_playable()?;
        self.touch();
        self.timer.start();

        if self.status == GameStatus::NotStarted {
            self.board.place_mines(index);
            self.status = GameStatus::InProgress;
            debug!(
                "placed {} mines after first reveal at ({}, {})",
                self.board.mines, pos.row, pos.col
            );
        }

        match self.board.cells[index].state {
            CellState::Revealed | CellState::Flagged => {
                debug!("ignoring reveal on a non-hidden cell ({}, {})", pos.row, pos.col);
                return Ok(self.reveal_outcome());
            }
            CellState::Hidden => {}
        }

        if self.board.cells[index].mine {
            warn!("mine hit at ({}, {}), game over", pos.row, pos.col);
            self.board.reveal_mines();
            self.status = GameStatus::Lost;
            self.timer.freeze();
            return Ok(self.reveal_outcome());
        }

        self.board.reveal_flood(index);
        if self.board.has_won() {
            self.status = GameStatus::Won;
            self.timer.freeze();
            info!(
                "all safe cells revealed, won in {}s",
                self.timer.elapsed_seconds()
            );
        }

        Ok(self.reveal_outcome())
    }

    #[instrument(level = "trace", skip(self), fields(row = pos.row, col = pos.col))]
    pub fn toggle_flag(&mut self, pos: Pos) -> Result<FlagOutcome> {
        let index = self.board.index_of(pos)?;
        self.check_playable()?;
        self.touch();
        self.timer.start();

        if !self.board.toggle_flag(index) {
            debug!("ignoring flag on revealed cell ({}, {})", pos.row, pos.col);
        }

        Ok(FlagOutcome {
            flags: self.board.flag_view(),
            mines_remaining: self.board.mines_remaining(),
            won: self.status == GameStatus::Won,
        })
    }

    /// Eviction predicate for the cleanup task. Finished games linger for a
    /// shorter grace period than games someone may come back to.
    pub fn should_evict(&self, idle_timeout_secs: u64, finished_timeout_secs: u64) -> bool {
        let idle_secs = self.last_activity.elapsed().as_secs();
        if self.status.is_over() {
            idle_secs > finished_timeout_secs
        } else {
            idle_secs > idle_timeout_secs
        }
    }

    fn reveal_outcome(&self) -> RevealOutcome {
        RevealOutcome {
            field: self.board.view(),
            won: self.status == GameStatus::Won,
            lost: self.status == GameStatus::Lost,
            elapsed: self.timer.elapsed_seconds(),
        }
    }

    fn check_playable(&self) -> Result<()> {
        if self.status.is_over() {
            Err(GameError::SessionTerminated)
        } else {
            Ok(())
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}
