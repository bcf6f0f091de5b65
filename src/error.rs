use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("invalid board configuration")]
    InvalidConfiguration,
    #[error("coordinates outside the board")]
    InvalidCoordinate,
    #[error("game already finished, apply new settings to play again")]
    SessionTerminated,
}

pub type Result<T> = std::result::Result<T, GameError>;
