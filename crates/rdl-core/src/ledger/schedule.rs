//! Next-piece selection over a ledger.

use super::{Ledger, Piece, PieceState};

/// Picks the next piece to hand to a worker, creating it if needed.
///
/// Scans offsets `0, block_size, 2 * block_size, ...` below `total_size`:
/// an existing `Pending` piece is returned, an existing `Done` or `InProgress`
/// piece is skipped, and a missing offset is inserted as `Pending` and
/// returned. The lowest unfinished offset always wins, so two calls on the
/// same ledger return the same index. Returns `None` once every offset is
/// `Done` or `InProgress`.
pub fn find_next(ledger: &mut Ledger) -> Option<usize> {
    if ledger.total_size == 0 || ledger.block_size == 0 {
        return None;
    }
    if ledger.is_empty() {
        return Some(ledger.insert(Piece::pending(0)));
    }

    // Pieces are sorted by start, so walk them alongside the offsets.
    let mut cursor = 0usize;
    let mut offset = 0u64;
    while offset < ledger.total_size {
        while cursor < ledger.pieces.len() && ledger.pieces[cursor].start < offset {
            cursor += 1;
        }
        match ledger.pieces.get(cursor) {
            Some(piece) if piece.start == offset => {
                if piece.state == PieceState::Pending {
                    return Some(cursor);
                }
            }
            _ => return Some(ledger.insert(Piece::pending(offset))),
        }
        offset = offset.saturating_add(ledger.block_size);
    }
    None
}
