use serde::{Deserialize, Serialize};

use super::CellView;

#[derive(Serialize, Deserialize)]
pub struct CreateResponse {
    pub id: String,
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
}

#[derive(Serialize, Deserialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
}

/// `success` is false exactly when the click hit a mine. The `field` grid
/// carries the revealed mask and the display values in one projection.
#[derive(Serialize, Deserialize)]
pub struct RevealResponse {
    pub success: bool,
    pub field: Vec<Vec<CellView>>,
    pub won: bool,
    pub lost: bool,
    pub time: u64,
}

#[derive(Serialize, Deserialize)]
pub struct FlagResponse {
    pub flags: Vec<Vec<bool>>,
    #[serde(rename = "minesRemaining")]
    pub mines_remaining: i64,
    pub won: bool,
}

#[derive(Serialize, Deserialize)]
pub struct TimeResponse {
    pub time: u64,
}
