//! Piece ledger: which byte ranges of the resource exist and their state.
//!
//! The ledger is the persisted record of a download. Pieces are addressed by
//! their start offset, are `block_size` bytes long (the last one may be
//! shorter) and are kept sorted by `start`. Pieces are created lazily by the
//! scheduler (`find_next`) and never removed.

mod schedule;
mod state;

pub use schedule::find_next;
pub use state::{InvalidPieceState, PieceState};

use serde::{Deserialize, Deserializer, Serialize};

/// One addressable piece of the resource: `[start, start + block_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    #[serde(rename = "Start")]
    pub start: u64,
    #[serde(rename = "State")]
    pub state: PieceState,
}

impl Piece {
    pub fn pending(start: u64) -> Self {
        Piece {
            start,
            state: PieceState::Pending,
        }
    }
}

/// Persisted download record. Mutated only by the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Content length of the remote resource (0 until first probed).
    #[serde(rename = "TotalSize")]
    pub total_size: u64,
    /// Piece length in bytes, fixed when the record is first created.
    #[serde(rename = "BlockSize")]
    pub block_size: u64,
    #[serde(rename = "DonePieces", default, deserialize_with = "null_as_empty")]
    pieces: Vec<Piece>,
}

/// A loaded record whose pieces cannot describe this resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("piece start {0} appears more than once")]
    DuplicateStart(u64),
    #[error("piece start {start} is not a multiple of block size {block_size}")]
    Misaligned { start: u64, block_size: u64 },
    #[error("piece start {start} is not below total size {total_size}")]
    OutOfRange { start: u64, total_size: u64 },
}

/// Older records may carry `"DonePieces": null` for an empty list.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Piece>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Piece>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Ledger {
    pub fn new(total_size: u64, block_size: u64) -> Self {
        Ledger {
            total_size,
            block_size,
            pieces: Vec::new(),
        }
    }

    /// Restores `start` order after loading a record written in any order.
    /// Duplicate starts are rejected since their states cannot be merged.
    pub(crate) fn normalize(&mut self) -> Result<(), LayoutError> {
        self.pieces.sort_by_key(|p| p.start);
        match self.pieces.windows(2).find(|w| w[0].start == w[1].start) {
            Some(w) => Err(LayoutError::DuplicateStart(w[0].start)),
            None => Ok(()),
        }
    }

    /// Checks that every piece sits on a block boundary inside
    /// `[0, total_size)`. Only meaningful once both sizes are known.
    pub fn check_layout(&self) -> Result<(), LayoutError> {
        for piece in &self.pieces {
            if self.block_size == 0 || piece.start % self.block_size != 0 {
                return Err(LayoutError::Misaligned {
                    start: piece.start,
                    block_size: self.block_size,
                });
            }
            if piece.start >= self.total_size {
                return Err(LayoutError::OutOfRange {
                    start: piece.start,
                    total_size: self.total_size,
                });
            }
        }
        Ok(())
    }

    /// Pieces in ascending `start` order.
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn get(&self, index: usize) -> Option<&Piece> {
        self.pieces.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Inserts `piece` keeping the ledger sorted by `start` and returns the
    /// index of that `start`. If a piece with the same `start` already exists
    /// nothing is added and the existing index is returned.
    pub fn insert(&mut self, piece: Piece) -> usize {
        match self.pieces.binary_search_by_key(&piece.start, |p| p.start) {
            Ok(index) => index,
            Err(index) => {
                self.pieces.insert(index, piece);
                index
            }
        }
    }

    /// Index of the piece starting at `start`, if it exists.
    pub fn position(&self, start: u64) -> Option<usize> {
        self.pieces.binary_search_by_key(&start, |p| p.start).ok()
    }

    /// Sets the state of the piece at `index`. A `Done` piece stays `Done`.
    /// Returns false if `index` is out of bounds or the transition was refused.
    pub fn mark(&mut self, index: usize, state: PieceState) -> bool {
        match self.pieces.get_mut(index) {
            Some(piece) if piece.state == PieceState::Done && state != PieceState::Done => false,
            Some(piece) => {
                piece.state = state;
                true
            }
            None => false,
        }
    }

    /// Resets every piece that is not `Done` back to `Pending`.
    pub fn reset_incomplete(&mut self) {
        for piece in self.pieces.iter_mut() {
            if piece.state != PieceState::Done {
                piece.state = PieceState::Pending;
            }
        }
    }

    /// Length in bytes of the piece starting at `start` (the final piece may
    /// be shorter than `block_size`).
    pub fn piece_len(&self, start: u64) -> u64 {
        self.block_size.min(self.total_size.saturating_sub(start))
    }

    /// Bytes covered by `Done` pieces, clipped to `total_size`.
    pub fn done_byte_total(&self) -> u64 {
        self.pieces
            .iter()
            .filter(|p| p.state == PieceState::Done)
            .map(|p| self.piece_len(p.start))
            .sum()
    }

    /// Number of pieces needed to cover `[0, total_size)`.
    pub fn expected_piece_count(&self) -> usize {
        if self.block_size == 0 {
            return 0;
        }
        self.total_size.div_ceil(self.block_size) as usize
    }

    pub fn count_in(&self, state: PieceState) -> usize {
        self.pieces.iter().filter(|p| p.state == state).count()
    }

    /// True when every piece covering the resource exists and is `Done`.
    pub fn is_complete(&self) -> bool {
        self.pieces.len() == self.expected_piece_count()
            && self.pieces.iter().all(|p| p.state == PieceState::Done)
    }
}
