use std::ops::{Deref, DerefMut, Index, IndexMut, RangeFrom};

use arrayvec::ArrayVec;

use crate::chess::{
    attacks::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks},
    board::{Board, CastlingRights},
    chessmove::Move,
    piece::{Colour, Piece, PieceType},
    squareset::SquareSet,
    types::{Rank, Square},
};

pub const MAX_POSITION_MOVES: usize = 220;

#[derive(Clone, Copy, Debug)]
pub struct MoveListEntry {
    pub mov: Move,
    pub score: i32,
}

/// A fixed-capacity list of scored moves.
#[derive(Clone, Default)]
pub struct MoveList {
    inner: ArrayVec<MoveListEntry, MAX_POSITION_MOVES>,
}

impl MoveList {
    pub fn new() -> Self {
        Self { inner: ArrayVec::new() }
    }

    pub fn push(&mut self, mov: Move) {
        self.inner.push(MoveListEntry { mov, score: 0 });
    }

    pub fn push_entry(&mut self, entry: MoveListEntry) {
        self.inner.push(entry);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter_moves(&self) -> impl Iterator<Item = Move> + '_ {
        self.inner.iter().map(|e| e.mov)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl Deref for MoveList {
    type Target = [MoveListEntry];

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for MoveList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Index<usize> for MoveList {
    type Output = MoveListEntry;

    fn index(&self, index: usize) -> &Self::Output {
        &self.inner[index]
    }
}

impl IndexMut<usize> for MoveList {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.inner[index]
    }
}

impl Index<RangeFrom<usize>> for MoveList {
    type Output = [MoveListEntry];

    fn index(&self, index: RangeFrom<usize>) -> &Self::Output {
        &self.inner[index]
    }
}

impl IndexMut<RangeFrom<usize>> for MoveList {
    fn index_mut(&mut self, index: RangeFrom<usize>) -> &mut Self::Output {
        &mut self.inner[index]
    }
}

const PROMO_TYPES: [PieceType; 4] =
    [PieceType::Queen, PieceType::Rook, PieceType::Bishop, PieceType::Knight];

impl Board {
    /// Captures, en-passant, and promotions, pseudo-legally. The enemy king
    /// is never a capture target, so a malformed position cannot send the
    /// search after it.
    pub fn generate_tactical(&self, list: &mut MoveList) {
        let us = self.turn();
        let them = !us;
        let our_occ = self.colour_occupancy(us);
        let their_occ = self.colour_occupancy(them);
        let occ = our_occ | their_occ;
        let victims = their_occ.remove_square(self.king_sq(them));
        let promo_rank = if us == Colour::White { Rank::Eight } else { Rank::One };
        let push = if us == Colour::White { 8i8 } else { -8i8 };

        let our_pawn = Piece::new(us, PieceType::Pawn);
        for from in self.piece_set(our_pawn) {
            for to in pawn_attacks(us, from) & victims {
                let victim = self.piece_at(to).unwrap();
                if to.rank() == promo_rank {
                    for promo in PROMO_TYPES {
                        list.push(Move::new(from, to, our_pawn, Some(victim), Some(promo)));
                    }
                } else {
                    list.push(Move::new(from, to, our_pawn, Some(victim), None));
                }
            }
            // non-capture promotions are tactical too
            if let Some(to) = from.offset(push) {
                if to.rank() == promo_rank && !occ.contains_square(to) {
                    for promo in PROMO_TYPES {
                        list.push(Move::new(from, to, our_pawn, None, Some(promo)));
                    }
                }
            }
        }
        if let Some(ep_sq) = self.ep_square() {
            let their_pawn = Piece::new(them, PieceType::Pawn);
            for from in pawn_attacks(them, ep_sq) & self.piece_set(our_pawn) {
                list.push(Move::new_ep(from, ep_sq, our_pawn, their_pawn));
            }
        }

        self.generate_piece_moves(list, victims, occ, their_occ);
    }

    /// Non-capturing, non-promoting moves, pseudo-legally.
    pub fn generate_quiets(&self, list: &mut MoveList) {
        let us = self.turn();
        let our_occ = self.colour_occupancy(us);
        let their_occ = self.colour_occupancy(!us);
        let occ = our_occ | their_occ;
        let promo_rank = if us == Colour::White { Rank::Eight } else { Rank::One };
        let double_rank = if us == Colour::White { Rank::Two } else { Rank::Seven };
        let push = if us == Colour::White { 8i8 } else { -8i8 };

        let our_pawn = Piece::new(us, PieceType::Pawn);
        for from in self.piece_set(our_pawn) {
            let Some(to) = from.offset(push) else { continue };
            if occ.contains_square(to) || to.rank() == promo_rank {
                continue;
            }
            list.push(Move::new(from, to, our_pawn, None, None));
            if from.rank() == double_rank {
                let to2 = to.offset(push).unwrap();
                if !occ.contains_square(to2) {
                    list.push(Move::new_double_push(from, to2, our_pawn));
                }
            }
        }

        self.generate_piece_moves(list, !occ, occ, their_occ);
        self.generate_castling(list, occ);
    }

    pub fn generate_all(&self, list: &mut MoveList) {
        self.generate_tactical(list);
        self.generate_quiets(list);
    }

    /// Knight, bishop, rook, queen, and king moves whose destinations fall
    /// in `targets`.
    fn generate_piece_moves(
        &self,
        list: &mut MoveList,
        targets: SquareSet,
        occ: SquareSet,
        their_occ: SquareSet,
    ) {
        let us = self.turn();
        let captures = targets & their_occ;
        debug_assert!(captures == targets || captures.is_empty());

        for pt in [
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Rook,
            PieceType::Queen,
            PieceType::King,
        ] {
            let piece = Piece::new(us, pt);
            for from in self.piece_set(piece) {
                let attacks = match pt {
                    PieceType::Knight => knight_attacks(from),
                    PieceType::Bishop => bishop_attacks(from, occ),
                    PieceType::Rook => rook_attacks(from, occ),
                    PieceType::Queen => bishop_attacks(from, occ) | rook_attacks(from, occ),
                    PieceType::King => king_attacks(from),
                    PieceType::Pawn => unreachable!(),
                };
                for to in attacks & targets {
                    list.push(Move::new(from, to, piece, self.piece_at(to), None));
                }
            }
        }
    }

    pub(crate) fn generate_castling(&self, list: &mut MoveList, occ: SquareSet) {
        if self.in_check() {
            return;
        }
        let us = self.turn();
        let them = !us;
        let rights = self.castling_rights();

        let lanes: &[(CastlingRights, Square, Square, [Square; 2], &[Square])] =
            if us == Colour::White {
                &[
                    (
                        CastlingRights::WK,
                        Square::E1,
                        Square::G1,
                        [Square::F1, Square::G1],
                        &[Square::F1, Square::G1],
                    ),
                    (
                        CastlingRights::WQ,
                        Square::E1,
                        Square::C1,
                        [Square::D1, Square::C1],
                        &[Square::D1, Square::C1, Square::B1],
                    ),
                ]
            } else {
                &[
                    (
                        CastlingRights::BK,
                        Square::E8,
                        Square::G8,
                        [Square::F8, Square::G8],
                        &[Square::F8, Square::G8],
                    ),
                    (
                        CastlingRights::BQ,
                        Square::E8,
                        Square::C8,
                        [Square::D8, Square::C8],
                        &[Square::D8, Square::C8, Square::B8],
                    ),
                ]
            };

        let king = Piece::new(us, PieceType::King);
        for &(flag, from, to, path, empty) in lanes {
            if !rights.contains(flag) {
                continue;
            }
            if empty.iter().any(|&sq| occ.contains_square(sq)) {
                continue;
            }
            // the king may not pass through an attacked square; the
            // destination is re-checked by make_move, but testing it here
            // keeps castling fully legal at generation time.
            if path.iter().any(|&sq| self.square_attacked(sq, them, occ)) {
                continue;
            }
            list.push(Move::new_castle(from, to, king));
        }
    }
}
