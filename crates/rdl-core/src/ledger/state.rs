//! Piece lifecycle state and its numeric record encoding.

use serde::{Deserialize, Serialize};

/// Lifecycle of a piece within one attempt: `Pending -> InProgress -> Done`.
///
/// Stored in the record file as an integer code (0, 1, 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PieceState {
    #[default]
    Pending,
    InProgress,
    Done,
}

/// Returned when a record file carries an unknown state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid piece state code {0} (expected 0, 1 or 2)")]
pub struct InvalidPieceState(pub u8);

impl TryFrom<u8> for PieceState {
    type Error = InvalidPieceState;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(PieceState::Pending),
            1 => Ok(PieceState::InProgress),
            2 => Ok(PieceState::Done),
            other => Err(InvalidPieceState(other)),
        }
    }
}

impl From<PieceState> for u8 {
    fn from(state: PieceState) -> u8 {
        match state {
            PieceState::Pending => 0,
            PieceState::InProgress => 1,
            PieceState::Done => 2,
        }
    }
}
