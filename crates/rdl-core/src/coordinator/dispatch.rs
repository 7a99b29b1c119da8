//! Turning a scheduling decision into a work signal.

use crate::ledger::{find_next, Ledger, PieceState};
use crate::worker::{PieceTask, WorkSignal};

/// Schedules the next piece, marks it `InProgress` and describes it for a
/// worker; `Exit` when nothing is left to hand out.
pub(super) fn next_signal(ledger: &mut Ledger) -> WorkSignal {
    let Some(index) = find_next(ledger) else {
        return WorkSignal::Exit;
    };
    ledger.mark(index, PieceState::InProgress);
    let start = ledger.pieces()[index].start;
    let task = PieceTask {
        index,
        start,
        len: ledger.piece_len(start),
    };
    tracing::trace!(index, start, len = task.len, "dispatch");
    WorkSignal::Fetch(task)
}
