//! Syzygy tablebase seam. The search consumes WDL results through
//! [`probe_wdl`]; the probing backend itself is optional, and without the
//! `syzygy` feature (no Fathom bindings compiled in) every probe misses and
//! the gate count stays at zero, so the search never detours.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::chess::board::{Board, CastlingRights};

/// Win/draw/loss from the side to move's perspective, with the 50-move-rule
/// qualifications the format distinguishes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Wdl {
    Loss,
    BlessedLoss,
    Draw,
    CursedWin,
    Win,
}

impl Wdl {
    /// The signed value the search works with: ±2 decisive, ±1 only
    /// decisive when the 50-move rule is off.
    pub const fn signed(self) -> i32 {
        match self {
            Self::Loss => -2,
            Self::BlessedLoss => -1,
            Self::Draw => 0,
            Self::CursedWin => 1,
            Self::Win => 2,
        }
    }
}

static MAX_PIECES: AtomicU32 = AtomicU32::new(0);

/// Points the prober at a tablebase directory. This build carries no
/// probing backend, so the only effect is the diagnostic.
pub fn init(path: &str) {
    println!("info string no tablebase backend compiled in, ignoring SyzygyPath {path}");
    MAX_PIECES.store(0, Ordering::Relaxed);
}

/// Largest piece count the loaded tables cover; 0 disables probing.
pub fn max_pieces() -> u32 {
    MAX_PIECES.load(Ordering::Relaxed)
}

/// WDL for the position, or None when the position is out of table range,
/// carries castling rights, or no backend is loaded.
pub fn probe_wdl(board: &Board) -> Option<Wdl> {
    if board.castling_rights() != CastlingRights::NONE
        || board.halfmove_clock() != 0
        || board.piece_count() > max_pieces()
    {
        return None;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probing_is_disabled_without_a_backend() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/KQ6 w - - 0 1").unwrap();
        assert_eq!(max_pieces(), 0);
        assert_eq!(probe_wdl(&board), None);
    }
}
