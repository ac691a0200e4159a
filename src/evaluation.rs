//! Score constants and the static evaluation: tapered material plus
//! piece-square tables, from the side to move's point of view.

use crate::chess::{
    board::Board,
    piece::{Colour, Piece, PieceType},
};

/// The best possible score for white: mate at the root.
pub const MATE_SCORE: i32 = 30_000;
/// Scores above this magnitude are forced mates.
pub const MATE_BOUND: i32 = 29_500;
/// A tablebase win found at the root, decaying by a point per ply.
pub const TB_WIN_SCORE: i32 = 29_000;
/// Scores at or above this magnitude are game-theoretic (mate or tablebase)
/// and get ply-corrected at the transposition table boundary.
pub const MINIMUM_WIN_SCORE: i32 = 28_000;
pub const DRAW_SCORE: i32 = 0;
/// Sentinel for "no value yet"; below every reachable score.
pub const NO_SCORE: i32 = -32_001;
/// Full aspiration window bound.
pub const INFINITY_SCORE: i32 = 32_767;

/// Bonus for being the one to move, folded into the static evaluation.
pub const TEMPO: i32 = 15;

pub const fn is_mate_score(score: i32) -> bool {
    score.abs() > MATE_BOUND
}

pub const fn is_game_theoretic_score(score: i32) -> bool {
    score.abs() >= MINIMUM_WIN_SCORE
}

pub const fn mated_in(ply: usize) -> i32 {
    -MATE_SCORE + ply as i32
}

pub const fn see_value(pt: PieceType) -> i32 {
    const VALUES: [i32; 6] = [100, 320, 330, 500, 900, 20_000];
    VALUES[pt.index()]
}

pub const fn material_value(pt: PieceType) -> i32 {
    see_value(pt)
}

#[rustfmt::skip]
static PAWN_PST: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    50, 50, 50, 50, 50, 50, 50, 50,
    10, 10, 20, 30, 30, 20, 10, 10,
     5,  5, 10, 25, 25, 10,  5,  5,
     0,  0,  0, 20, 20,  0,  0,  0,
     5, -5,-10,  0,  0,-10, -5,  5,
     5, 10, 10,-20,-20, 10, 10,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
static KNIGHT_PST: [i32; 64] = [
   -50,-40,-30,-30,-30,-30,-40,-50,
   -40,-20,  0,  0,  0,  0,-20,-40,
   -30,  0, 10, 15, 15, 10,  0,-30,
   -30,  5, 15, 20, 20, 15,  5,-30,
   -30,  0, 15, 20, 20, 15,  0,-30,
   -30,  5, 10, 15, 15, 10,  5,-30,
   -40,-20,  0,  5,  5,  0,-20,-40,
   -50,-40,-30,-30,-30,-30,-40,-50,
];

#[rustfmt::skip]
static BISHOP_PST: [i32; 64] = [
   -20,-10,-10,-10,-10,-10,-10,-20,
   -10,  0,  0,  0,  0,  0,  0,-10,
   -10,  0,  5, 10, 10,  5,  0,-10,
   -10,  5,  5, 10, 10,  5,  5,-10,
   -10,  0, 10, 10, 10, 10,  0,-10,
   -10, 10, 10, 10, 10, 10, 10,-10,
   -10,  5,  0,  0,  0,  0,  5,-10,
   -20,-10,-10,-10,-10,-10,-10,-20,
];

#[rustfmt::skip]
static ROOK_PST: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10, 10, 10, 10, 10,  5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     0,  0,  0,  5,  5,  0,  0,  0,
];

#[rustfmt::skip]
static QUEEN_PST: [i32; 64] = [
   -20,-10,-10, -5, -5,-10,-10,-20,
   -10,  0,  0,  0,  0,  0,  0,-10,
   -10,  0,  5,  5,  5,  5,  0,-10,
    -5,  0,  5,  5,  5,  5,  0, -5,
     0,  0,  5,  5,  5,  5,  0, -5,
   -10,  5,  5,  5,  5,  5,  0,-10,
   -10,  0,  5,  0,  0,  0,  0,-10,
   -20,-10,-10, -5, -5,-10,-10,-20,
];

#[rustfmt::skip]
static KING_MG_PST: [i32; 64] = [
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -20,-30,-30,-40,-40,-30,-30,-20,
   -10,-20,-20,-20,-20,-20,-20,-10,
    20, 20,  0,  0,  0,  0, 20, 20,
    20, 30, 10,  0,  0, 10, 30, 20,
];

#[rustfmt::skip]
static KING_EG_PST: [i32; 64] = [
   -50,-40,-30,-20,-20,-30,-40,-50,
   -30,-20,-10,  0,  0,-10,-20,-30,
   -30,-10, 20, 30, 30, 20,-10,-30,
   -30,-10, 30, 40, 40, 30,-10,-30,
   -30,-10, 30, 40, 40, 30,-10,-30,
   -30,-10, 20, 30, 30, 20,-10,-30,
   -30,-30,  0,  0,  0,  0,-30,-30,
   -50,-30,-30,-30,-30,-30,-50,-50,
];

const PIECE_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 0];

/// Static evaluation in centipawns from the side to move's perspective,
/// including the tempo bonus.
pub fn evaluate(board: &Board) -> i32 {
    let phase = board.phase();
    let mut score = 0;

    for piece in Piece::all() {
        let pt = piece.piece_type();
        let sign = if piece.colour() == Colour::White { 1 } else { -1 };
        for sq in board.piece_set(piece) {
            // tables are laid out from white's point of view with rank 8
            // first, so white squares index through a vertical flip
            let idx = if piece.colour() == Colour::White {
                sq.flip_rank().index()
            } else {
                sq.index()
            };
            let positional = match pt {
                PieceType::Pawn => PAWN_PST[idx],
                PieceType::Knight => KNIGHT_PST[idx],
                PieceType::Bishop => BISHOP_PST[idx],
                PieceType::Rook => ROOK_PST[idx],
                PieceType::Queen => QUEEN_PST[idx],
                PieceType::King => {
                    (KING_MG_PST[idx] * (240 - phase) + KING_EG_PST[idx] * phase) / 240
                }
            };
            score += sign * (PIECE_VALUES[pt.index()] + positional);
        }
    }

    let stm_sign = if board.turn() == Colour::White { 1 } else { -1 };
    stm_sign * score + TEMPO
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::board::Board;

    #[test]
    fn startpos_is_balanced() {
        let board = Board::default();
        assert_eq!(evaluate(&board), TEMPO);
    }

    #[test]
    fn evaluation_is_symmetric_in_side_to_move() {
        let white = Board::from_fen("4k3/8/8/8/8/8/PP6/4K3 w - - 0 1").unwrap();
        let black = Board::from_fen("4k3/pp6/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        assert_eq!(evaluate(&white), evaluate(&black));
        assert!(evaluate(&white) > 0);
    }

    #[test]
    fn material_advantage_shows() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/Q3K3 b - - 0 1").unwrap();
        assert!(evaluate(&board) < -700);
    }

    #[test]
    fn mate_score_predicates() {
        assert!(is_mate_score(MATE_SCORE - 5));
        assert!(is_mate_score(-MATE_SCORE + 9));
        assert!(!is_mate_score(TB_WIN_SCORE - 3));
        assert!(is_game_theoretic_score(TB_WIN_SCORE - 3));
        assert!(!is_game_theoretic_score(2000));
    }
}
