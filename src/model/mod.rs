use serde::{Deserialize, Serialize};

pub mod api;

/// Player-visible state of a single cell, as serialized to the browser.
/// Unrevealed cells never leak whether they hold a mine; the `mine` variant
/// only appears once the game is lost and the field is exposed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum CellView {
    #[serde(rename = "hidden")]
    Hidden,
    #[serde(rename = "flagged")]
    Flagged,
    #[serde(rename = "revealed")]
    Revealed { adjacent: u8 },
    #[serde(rename = "mine")]
    Mine,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
#[serde(default)]
pub struct BoardSettings {
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            mines: 10,
        }
    }
}
