pub mod movegen;

use std::fmt::{self, Display};

use crate::{
    chess::{
        attacks::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks},
        chessmove::{short_from, short_promoted, short_to, Move, ShortMove},
        piece::{Colour, Piece, PieceType},
        squareset::SquareSet,
        types::{File, Rank, Square},
    },
    errors::{FenParseError, MoveParseError},
    evaluation::see_value,
    lookups::ZOBRIST,
};

use self::movegen::MoveList;

/// Castling permissions, one bit per side/wing.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: Self = Self(0);
    pub const WK: Self = Self(1);
    pub const WQ: Self = Self(2);
    pub const BK: Self = Self(4);
    pub const BQ: Self = Self(8);
    pub const ALL: Self = Self(15);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    const fn masked(self, mask: u8) -> Self {
        Self(self.0 & mask)
    }
}

/// Everything needed to restore the previous position exactly.
#[derive(Clone, Copy)]
struct Undo {
    /// None marks a null move.
    m: Option<Move>,
    castle: CastlingRights,
    ep_sq: Option<Square>,
    halfmove_clock: u8,
    fullmove: u16,
    key: u64,
    checkers: SquareSet,
}

/// Castling-right bits that survive a move touching each square.
static CASTLE_MASK: [u8; 64] = {
    let mut table = [15u8; 64];
    table[Square::A1.index()] = 15 - 2;
    table[Square::E1.index()] = 15 - 3;
    table[Square::H1.index()] = 15 - 1;
    table[Square::A8.index()] = 15 - 8;
    table[Square::E8.index()] = 15 - 12;
    table[Square::H8.index()] = 15 - 4;
    table
};

#[derive(Clone)]
pub struct Board {
    /// Occupancy by piece type, both colours merged.
    pieces: [SquareSet; 6],
    /// Occupancy by colour.
    colours: [SquareSet; 2],
    mailbox: [Option<Piece>; 64],
    side: Colour,
    ep_sq: Option<Square>,
    castle_perm: CastlingRights,
    halfmove_clock: u8,
    fullmove: u16,
    key: u64,
    /// Opposing pieces currently giving check to the side to move.
    checkers: SquareSet,
    /// Distance from the search root.
    height: usize,
    undo_stack: Vec<Undo>,
}

impl Board {
    pub const STARTING_FEN: &'static str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    pub fn new() -> Self {
        Self {
            pieces: [SquareSet::EMPTY; 6],
            colours: [SquareSet::EMPTY; 2],
            mailbox: [None; 64],
            side: Colour::White,
            ep_sq: None,
            castle_perm: CastlingRights::NONE,
            halfmove_clock: 0,
            fullmove: 1,
            key: 0,
            checkers: SquareSet::EMPTY,
            height: 0,
            undo_stack: Vec::with_capacity(256),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenParseError> {
        let mut board = Self::new();
        board.set_from_fen(fen)?;
        Ok(board)
    }

    pub fn set_startpos(&mut self) {
        self.set_from_fen(Self::STARTING_FEN).expect("startpos FEN is valid");
    }

    pub fn set_from_fen(&mut self, fen: &str) -> Result<(), FenParseError> {
        let mut parts = fen.split_ascii_whitespace();
        let placement = parts.next().ok_or(FenParseError::MissingBoard)?;
        let side = parts.next().ok_or(FenParseError::MissingSide)?;
        let castling = parts.next().ok_or(FenParseError::MissingCastling)?;
        let ep = parts.next().ok_or(FenParseError::MissingEnPassant)?;
        let halfmove = parts.next().unwrap_or("0");
        let fullmove = parts.next().unwrap_or("1");

        let mut fresh = Self::new();

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenParseError::BoardSegments(ranks.len()));
        }
        for (i, segment) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for c in segment.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as u8;
                } else {
                    let piece =
                        Piece::from_char(c).ok_or(FenParseError::UnexpectedCharacter(c))?;
                    if file >= 8 {
                        return Err(FenParseError::BadSquaresInSegment);
                    }
                    let sq = Square::new(rank * 8 + file)
                        .ok_or(FenParseError::BadSquaresInSegment)?;
                    fresh.add_piece(piece, sq);
                    file += 1;
                }
            }
            if file != 8 {
                return Err(FenParseError::BadSquaresInSegment);
            }
        }

        fresh.side = match side {
            "w" => Colour::White,
            "b" => Colour::Black,
            other => return Err(FenParseError::InvalidSide(other.to_string())),
        };

        if castling != "-" {
            for c in castling.chars() {
                let flag = match c {
                    'K' => CastlingRights::WK,
                    'Q' => CastlingRights::WQ,
                    'k' => CastlingRights::BK,
                    'q' => CastlingRights::BQ,
                    _ => return Err(FenParseError::InvalidCastling(castling.to_string())),
                };
                fresh.castle_perm = CastlingRights(fresh.castle_perm.0 | flag.0);
            }
        }

        if ep != "-" {
            let sq = parse_square(ep).ok_or_else(|| FenParseError::InvalidEnPassant(ep.to_string()))?;
            let expected = if fresh.side == Colour::White { Rank::Six } else { Rank::Three };
            if sq.rank() != expected {
                return Err(FenParseError::InvalidEnPassant(ep.to_string()));
            }
            fresh.ep_sq = Some(sq);
        }

        fresh.halfmove_clock = halfmove
            .parse()
            .map_err(|_| FenParseError::InvalidHalfmoveClock(halfmove.to_string()))?;
        fresh.fullmove = fullmove
            .parse()
            .map_err(|_| FenParseError::InvalidFullmoveNumber(fullmove.to_string()))?;

        for colour in [Colour::White, Colour::Black] {
            let kings = fresh.piece_set(Piece::new(colour, PieceType::King));
            if kings.count() != 1 {
                return Err(FenParseError::WrongKingCount { colour });
            }
        }

        fresh.key = fresh.generate_key();
        fresh.checkers = fresh.compute_checkers();
        *self = fresh;
        Ok(())
    }

    pub fn fen(&self) -> String {
        let mut out = String::with_capacity(90);
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                let sq = Square::new(rank * 8 + file).unwrap();
                match self.piece_at(sq) {
                    Some(piece) => {
                        if empty > 0 {
                            out.push(char::from_digit(empty, 10).unwrap());
                            empty = 0;
                        }
                        out.push(piece.char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push(char::from_digit(empty, 10).unwrap());
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out.push(' ');
        out.push(if self.side == Colour::White { 'w' } else { 'b' });
        out.push(' ');
        if self.castle_perm == CastlingRights::NONE {
            out.push('-');
        } else {
            for (flag, c) in [
                (CastlingRights::WK, 'K'),
                (CastlingRights::WQ, 'Q'),
                (CastlingRights::BK, 'k'),
                (CastlingRights::BQ, 'q'),
            ] {
                if self.castle_perm.contains(flag) {
                    out.push(c);
                }
            }
        }
        out.push(' ');
        match self.ep_sq {
            Some(sq) => out.push_str(&sq.to_string()),
            None => out.push('-'),
        }
        out.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove));
        out
    }

    fn generate_key(&self) -> u64 {
        let mut key = 0;
        for sq in Square::all() {
            if let Some(piece) = self.piece_at(sq) {
                key ^= ZOBRIST.piece[piece.index()][sq.index()];
            }
        }
        key ^= ZOBRIST.castle[self.castle_perm.index()];
        if let Some(ep) = self.ep_sq {
            key ^= ZOBRIST.ep_file[ep.file().index()];
        }
        if self.side == Colour::Black {
            key ^= ZOBRIST.side;
        }
        key
    }

    pub const fn turn(&self) -> Colour {
        self.side
    }

    pub const fn hashkey(&self) -> u64 {
        self.key
    }

    pub const fn halfmove_clock(&self) -> u8 {
        self.halfmove_clock
    }

    pub const fn ep_square(&self) -> Option<Square> {
        self.ep_sq
    }

    pub const fn castling_rights(&self) -> CastlingRights {
        self.castle_perm
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub fn in_check(&self) -> bool {
        self.checkers.non_empty()
    }

    pub const fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.mailbox[sq.index()]
    }

    pub fn piece_set(&self, piece: Piece) -> SquareSet {
        self.pieces[piece.piece_type().index()] & self.colours[piece.colour().index()]
    }

    pub fn piece_type_set(&self, pt: PieceType) -> SquareSet {
        self.pieces[pt.index()]
    }

    pub fn colour_occupancy(&self, colour: Colour) -> SquareSet {
        self.colours[colour.index()]
    }

    pub fn occupied(&self) -> SquareSet {
        self.colours[0] | self.colours[1]
    }

    pub fn king_sq(&self, colour: Colour) -> Square {
        self.piece_set(Piece::new(colour, PieceType::King)).first()
    }

    /// Marks the current position as the search root.
    pub fn zero_height(&mut self) {
        self.height = 0;
    }

    fn add_piece(&mut self, piece: Piece, sq: Square) {
        self.pieces[piece.piece_type().index()] =
            self.pieces[piece.piece_type().index()].add_square(sq);
        self.colours[piece.colour().index()] =
            self.colours[piece.colour().index()].add_square(sq);
        self.mailbox[sq.index()] = Some(piece);
    }

    fn remove_piece(&mut self, piece: Piece, sq: Square) {
        self.pieces[piece.piece_type().index()] =
            self.pieces[piece.piece_type().index()].remove_square(sq);
        self.colours[piece.colour().index()] =
            self.colours[piece.colour().index()].remove_square(sq);
        self.mailbox[sq.index()] = None;
    }

    /// All pieces of either colour attacking `sq`, given an occupancy that
    /// may differ from the board's (callers mask out removed pieces).
    pub fn attackers_to(&self, sq: Square, occ: SquareSet) -> SquareSet {
        let knights = self.pieces[PieceType::Knight.index()];
        let kings = self.pieces[PieceType::King.index()];
        let diag = self.pieces[PieceType::Bishop.index()] | self.pieces[PieceType::Queen.index()];
        let orth = self.pieces[PieceType::Rook.index()] | self.pieces[PieceType::Queen.index()];
        let pawns = self.pieces[PieceType::Pawn.index()];

        pawn_attacks(Colour::White, sq) & pawns & self.colours[Colour::Black.index()]
            | pawn_attacks(Colour::Black, sq) & pawns & self.colours[Colour::White.index()]
            | knight_attacks(sq) & knights
            | king_attacks(sq) & kings
            | bishop_attacks(sq, occ) & diag
            | rook_attacks(sq, occ) & orth
    }

    pub fn square_attacked(&self, sq: Square, by: Colour, occ: SquareSet) -> bool {
        (self.attackers_to(sq, occ) & self.colours[by.index()] & occ).non_empty()
    }

    fn compute_checkers(&self) -> SquareSet {
        let ksq = self.king_sq(self.side);
        let occ = self.occupied();
        self.attackers_to(ksq, occ) & self.colours[self.side.flip().index()]
    }

    /// Applies `m`. Returns `false` (with the position fully restored) when
    /// the move leaves the mover's own king in check.
    pub fn make_move(&mut self, m: Move) -> bool {
        let from = m.from();
        let to = m.to();
        let piece = m.piece();
        let us = self.side;
        let them = us.flip();
        debug_assert_eq!(self.piece_at(from), Some(piece), "bad mover in {m:?}");

        self.undo_stack.push(Undo {
            m: Some(m),
            castle: self.castle_perm,
            ep_sq: self.ep_sq,
            halfmove_clock: self.halfmove_clock,
            fullmove: self.fullmove,
            key: self.key,
            checkers: self.checkers,
        });

        let mut key = self.key;
        if let Some(ep) = self.ep_sq {
            key ^= ZOBRIST.ep_file[ep.file().index()];
        }
        self.ep_sq = None;

        if let Some(victim) = m.captured() {
            let cap_sq = if m.is_ep() {
                // the captured pawn sits behind the destination
                to.offset(if us == Colour::White { -8 } else { 8 }).unwrap()
            } else {
                to
            };
            debug_assert_eq!(self.piece_at(cap_sq), Some(victim), "bad victim in {m:?}");
            self.remove_piece(victim, cap_sq);
            key ^= ZOBRIST.piece[victim.index()][cap_sq.index()];
        }

        self.remove_piece(piece, from);
        key ^= ZOBRIST.piece[piece.index()][from.index()];
        let placed = m.promoted().map_or(piece, |pt| Piece::new(us, pt));
        self.add_piece(placed, to);
        key ^= ZOBRIST.piece[placed.index()][to.index()];

        if m.is_castle() {
            let (rook_from, rook_to) = match to {
                Square::G1 => (Square::H1, Square::F1),
                Square::C1 => (Square::A1, Square::D1),
                Square::G8 => (Square::H8, Square::F8),
                _ => (Square::A8, Square::D8),
            };
            let rook = Piece::new(us, PieceType::Rook);
            self.remove_piece(rook, rook_from);
            self.add_piece(rook, rook_to);
            key ^= ZOBRIST.piece[rook.index()][rook_from.index()]
                ^ ZOBRIST.piece[rook.index()][rook_to.index()];
        }

        if m.is_double_push() {
            let ep = from.offset(if us == Colour::White { 8 } else { -8 }).unwrap();
            // only record an en-passant square a pawn could actually use,
            // so that shuffled repetitions hash identically
            let their_pawns = self.piece_set(Piece::new(them, PieceType::Pawn));
            if (pawn_attacks(us, ep) & their_pawns).non_empty() {
                self.ep_sq = Some(ep);
                key ^= ZOBRIST.ep_file[ep.file().index()];
            }
        }

        let new_perm = self
            .castle_perm
            .masked(CASTLE_MASK[from.index()])
            .masked(CASTLE_MASK[to.index()]);
        if new_perm != self.castle_perm {
            key ^= ZOBRIST.castle[self.castle_perm.index()] ^ ZOBRIST.castle[new_perm.index()];
            self.castle_perm = new_perm;
        }

        self.halfmove_clock = if piece.piece_type() == PieceType::Pawn || m.is_capture() {
            0
        } else {
            self.halfmove_clock.saturating_add(1)
        };
        if us == Colour::Black {
            self.fullmove += 1;
        }
        self.side = them;
        key ^= ZOBRIST.side;
        self.key = key;
        self.height += 1;

        let our_king = self.king_sq(us);
        if self.square_attacked(our_king, them, self.occupied()) {
            self.unmake_move();
            return false;
        }
        self.checkers = self.compute_checkers();
        true
    }

    pub fn unmake_move(&mut self) {
        let undo = self.undo_stack.pop().expect("unmake_move with empty stack");
        let m = undo.m.expect("unmake_move across a null move");
        let us = self.side.flip();

        let placed = m.promoted().map_or(m.piece(), |pt| Piece::new(us, pt));
        self.remove_piece(placed, m.to());
        self.add_piece(m.piece(), m.from());

        if let Some(victim) = m.captured() {
            let cap_sq = if m.is_ep() {
                m.to().offset(if us == Colour::White { -8 } else { 8 }).unwrap()
            } else {
                m.to()
            };
            self.add_piece(victim, cap_sq);
        }

        if m.is_castle() {
            let (rook_from, rook_to) = match m.to() {
                Square::G1 => (Square::H1, Square::F1),
                Square::C1 => (Square::A1, Square::D1),
                Square::G8 => (Square::H8, Square::F8),
                _ => (Square::A8, Square::D8),
            };
            let rook = Piece::new(us, PieceType::Rook);
            self.remove_piece(rook, rook_to);
            self.add_piece(rook, rook_from);
        }

        self.side = us;
        self.castle_perm = undo.castle;
        self.ep_sq = undo.ep_sq;
        self.halfmove_clock = undo.halfmove_clock;
        self.fullmove = undo.fullmove;
        self.key = undo.key;
        self.checkers = undo.checkers;
        self.height -= 1;
    }

    /// Passes the turn. Only valid when not in check.
    pub fn make_null_move(&mut self) {
        debug_assert!(!self.in_check());
        self.undo_stack.push(Undo {
            m: None,
            castle: self.castle_perm,
            ep_sq: self.ep_sq,
            halfmove_clock: self.halfmove_clock,
            fullmove: self.fullmove,
            key: self.key,
            checkers: self.checkers,
        });
        if let Some(ep) = self.ep_sq {
            self.key ^= ZOBRIST.ep_file[ep.file().index()];
        }
        self.ep_sq = None;
        self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        self.side = self.side.flip();
        self.key ^= ZOBRIST.side;
        self.height += 1;
        self.checkers = SquareSet::EMPTY;
    }

    pub fn unmake_null_move(&mut self) {
        let undo = self.undo_stack.pop().expect("unmake_null_move with empty stack");
        debug_assert!(undo.m.is_none());
        self.side = self.side.flip();
        self.castle_perm = undo.castle;
        self.ep_sq = undo.ep_sq;
        self.halfmove_clock = undo.halfmove_clock;
        self.fullmove = undo.fullmove;
        self.key = undo.key;
        self.checkers = undo.checkers;
        self.height -= 1;
    }

    pub fn last_move_was_null(&self) -> bool {
        matches!(self.undo_stack.last(), Some(Undo { m: None, .. }))
    }

    /// The (piece, to) pair of the move made `back + 1` plies ago, for
    /// continuation-history indexing. Reaches into pre-root game history.
    pub fn conthist_index(&self, back: usize) -> Option<(Piece, Square)> {
        let n = self.undo_stack.len();
        if back >= n {
            return None;
        }
        self.undo_stack[n - 1 - back].m.map(|m| (m.piece(), m.to()))
    }

    /// How many times the current position occurred before, within the
    /// fifty-move window.
    pub fn repetition_count(&self) -> u32 {
        let n = self.undo_stack.len();
        let lookback = (self.halfmove_clock as usize).min(n);
        let mut count = 0;
        for undo in &self.undo_stack[n - lookback..] {
            if undo.key == self.key {
                count += 1;
            }
        }
        count
    }

    pub fn has_legal_moves(&mut self) -> bool {
        let mut list = MoveList::new();
        self.generate_all(&mut list);
        for i in 0..list.len() {
            let m = list[i].mov;
            if self.make_move(m) {
                self.unmake_move();
                return true;
            }
        }
        false
    }

    /// Total men on the board, for the tablebase piece-count gate.
    pub fn piece_count(&self) -> u32 {
        self.occupied().count()
    }

    /// Game phase in [0, 240]: 0 with full material, growing as material
    /// comes off. Feeds the sudden-death time allocation.
    pub fn phase(&self) -> i32 {
        let npm = 4 * self.pieces[PieceType::Queen.index()].count()
            + 2 * self.pieces[PieceType::Rook.index()].count()
            + self.pieces[PieceType::Bishop.index()].count()
            + self.pieces[PieceType::Knight.index()].count();
        let npm = npm.min(24) as i32;
        (256 * (24 - npm) / 24).min(240)
    }

    /// Reconstructs a full move from its 16-bit transposition table form,
    /// returning None unless the result is pseudo-legal here.
    pub fn short_move_to_full(&self, short: ShortMove) -> Option<Move> {
        if short == 0 {
            return None;
        }
        let from = short_from(short)?;
        let to = short_to(short)?;
        if from == to {
            return None;
        }
        let promo = short_promoted(short);
        let piece = self.piece_at(from)?;
        if piece.colour() != self.side {
            return None;
        }
        let occ = self.occupied();
        let target = self.piece_at(to);
        if target.is_some_and(|t| t.colour() == self.side || t.piece_type() == PieceType::King) {
            return None;
        }

        let pt = piece.piece_type();
        if pt == PieceType::Pawn {
            let us = self.side;
            let push = if us == Colour::White { 8i8 } else { -8i8 };
            let promo_rank = if us == Colour::White { Rank::Eight } else { Rank::One };
            let double_rank = if us == Colour::White { Rank::Two } else { Rank::Seven };
            if (to.rank() == promo_rank) != promo.is_some() {
                return None;
            }
            if promo.is_some_and(|p| !p.legal_promo()) {
                return None;
            }
            // diagonal: capture or en passant
            if pawn_attacks(us, from).contains_square(to) {
                if let Some(victim) = target {
                    return Some(Move::new(from, to, piece, Some(victim), promo));
                }
                if self.ep_sq == Some(to) {
                    let victim = Piece::new(us.flip(), PieceType::Pawn);
                    return Some(Move::new_ep(from, to, piece, victim));
                }
                return None;
            }
            // straight: pushes must land on empty squares
            if target.is_some() {
                return None;
            }
            let single = from.offset(push)?;
            if to == single {
                return Some(Move::new(from, to, piece, None, promo));
            }
            if from.rank() == double_rank
                && to == single.offset(push)?
                && !occ.contains_square(single)
            {
                return Some(Move::new_double_push(from, to, piece));
            }
            return None;
        }

        if promo.is_some() {
            return None;
        }

        // castling travels two files from the home square
        if pt == PieceType::King && !king_attacks(from).contains_square(to) {
            let mut list = MoveList::new();
            self.generate_castling(&mut list, occ);
            return list.iter_moves().find(|m| m.from() == from && m.to() == to);
        }

        let attacks = match pt {
            PieceType::Knight => knight_attacks(from),
            PieceType::Bishop => bishop_attacks(from, occ),
            PieceType::Rook => rook_attacks(from, occ),
            PieceType::Queen => bishop_attacks(from, occ) | rook_attacks(from, occ),
            PieceType::King => king_attacks(from),
            PieceType::Pawn => unreachable!(),
        };
        if !attacks.contains_square(to) {
            return None;
        }
        Some(Move::new(from, to, piece, target, None))
    }

    /// Whether a move produced under a different position is playable here.
    /// Reconstruction through the short form re-derives every flag, so a
    /// stale move (wrong mover, wrong victim, vanished castling) fails the
    /// equality.
    pub fn is_pseudo_legal(&self, m: Move) -> bool {
        self.short_move_to_full(m.short()) == Some(m)
    }

    /// Parses a UCI long-algebraic move against this position.
    pub fn parse_uci(&self, text: &str) -> Result<Move, MoveParseError> {
        let bytes = text.as_bytes();
        if !text.is_ascii() || !(4..=5).contains(&bytes.len()) {
            return Err(MoveParseError::InvalidLength(bytes.len()));
        }
        let from = parse_square(&text[0..2])
            .ok_or_else(|| MoveParseError::InvalidSquare(text[0..2].to_string()))?;
        let to = parse_square(&text[2..4])
            .ok_or_else(|| MoveParseError::InvalidSquare(text[2..4].to_string()))?;
        let promo = if bytes.len() == 5 {
            let pt = match bytes[4] {
                b'n' => PieceType::Knight,
                b'b' => PieceType::Bishop,
                b'r' => PieceType::Rook,
                b'q' => PieceType::Queen,
                c => return Err(MoveParseError::InvalidPromotionPiece(c as char)),
            };
            pt.index() as u16
        } else {
            0
        };
        let short = from.index() as u16 | (to.index() as u16) << 6 | promo << 12;
        self.short_move_to_full(short)
            .ok_or_else(|| MoveParseError::IllegalMove(text.to_string()))
    }

    /// Whether `m`, not yet made, would give check: direct attacks from the
    /// destination plus discovered attacks through the vacated square.
    pub fn move_gives_check(&self, m: Move) -> bool {
        let us = self.side;
        let them = us.flip();
        let ksq = self.king_sq(them);
        let from = m.from();
        let to = m.to();

        let mut occ = self.occupied().remove_square(from).add_square(to);
        if m.is_ep() {
            let cap_sq = to.offset(if us == Colour::White { -8 } else { 8 }).unwrap();
            occ = occ.remove_square(cap_sq);
        }

        let pt = m.promoted().unwrap_or(m.piece().piece_type());
        let direct = match pt {
            PieceType::Pawn => pawn_attacks(us, to).contains_square(ksq),
            PieceType::Knight => knight_attacks(to).contains_square(ksq),
            PieceType::Bishop => bishop_attacks(to, occ).contains_square(ksq),
            PieceType::Rook => rook_attacks(to, occ).contains_square(ksq),
            PieceType::Queen => {
                (bishop_attacks(to, occ) | rook_attacks(to, occ)).contains_square(ksq)
            }
            PieceType::King => false,
        };
        if direct {
            return true;
        }

        if m.is_castle() {
            let rook_to = match to {
                Square::G1 => Square::F1,
                Square::C1 => Square::D1,
                Square::G8 => Square::F8,
                _ => Square::D8,
            };
            if rook_attacks(rook_to, occ).contains_square(ksq) {
                return true;
            }
        }

        // discovered check through the vacated squares
        let ours = self.colours[us.index()].remove_square(from);
        let diag = (self.pieces[PieceType::Bishop.index()]
            | self.pieces[PieceType::Queen.index()])
            & ours;
        let orth = (self.pieces[PieceType::Rook.index()] | self.pieces[PieceType::Queen.index()])
            & ours;
        (bishop_attacks(ksq, occ) & diag).non_empty()
            || (rook_attacks(ksq, occ) & orth).non_empty()
    }

    /// Swap-based static exchange evaluation: does the exchange initiated by
    /// `m` net at least `threshold` centipawns?
    pub fn see_ge(&self, m: Move, threshold: i32) -> bool {
        if m.is_castle() {
            return threshold <= 0;
        }
        let from = m.from();
        let to = m.to();

        let mut swap = m.captured().map_or(0, |c| see_value(c.piece_type())) - threshold;
        if let Some(p) = m.promoted() {
            swap += see_value(p) - see_value(PieceType::Pawn);
        }
        if swap < 0 {
            return false;
        }
        let mover = m.promoted().unwrap_or(m.piece().piece_type());
        swap = see_value(mover) - swap;
        if swap <= 0 {
            return true;
        }

        let mut occ = self.occupied().remove_square(from).add_square(to);
        if m.is_ep() {
            let cap_sq = to
                .offset(if self.side == Colour::White { -8 } else { 8 })
                .unwrap();
            occ = occ.remove_square(cap_sq);
        }
        let mut attackers = self.attackers_to(to, occ) & occ;
        let diag = self.pieces[PieceType::Bishop.index()] | self.pieces[PieceType::Queen.index()];
        let orth = self.pieces[PieceType::Rook.index()] | self.pieces[PieceType::Queen.index()];

        let mut stm = self.side;
        let mut res = true;
        loop {
            stm = stm.flip();
            attackers &= occ;
            let stm_attackers = attackers & self.colours[stm.index()];
            if stm_attackers.is_empty() {
                break;
            }
            res = !res;

            let mut captured = None;
            for pt in [
                PieceType::Pawn,
                PieceType::Knight,
                PieceType::Bishop,
                PieceType::Rook,
                PieceType::Queen,
                PieceType::King,
            ] {
                let subset = stm_attackers & self.pieces[pt.index()];
                if subset.non_empty() {
                    captured = Some((pt, subset.first()));
                    break;
                }
            }
            let (pt, sq) = captured.unwrap();

            if pt == PieceType::King {
                // the king can only join the exchange if it cannot be
                // recaptured
                if (attackers & self.colours[stm.flip().index()]).non_empty() {
                    res = !res;
                }
                break;
            }

            swap = see_value(pt) - swap;
            if swap < i32::from(res) {
                break;
            }
            occ = occ.remove_square(sq);
            if matches!(pt, PieceType::Pawn | PieceType::Bishop | PieceType::Queen) {
                attackers |= bishop_attacks(to, occ) & diag;
            }
            if matches!(pt, PieceType::Rook | PieceType::Queen) {
                attackers |= rook_attacks(to, occ) & orth;
            }
        }
        res
    }

    /// Value of the most valuable enemy piece on the board, plus promotion
    /// potential. Upper-bounds any single capture for delta pruning.
    pub fn best_possible_capture(&self) -> i32 {
        let them = self.side.flip();
        let their_occ = self.colours[them.index()];
        let mut best = 0;
        for pt in [PieceType::Queen, PieceType::Rook, PieceType::Bishop, PieceType::Knight] {
            if (self.pieces[pt.index()] & their_occ).non_empty() {
                best = see_value(pt);
                break;
            }
        }
        if best == 0 && (self.pieces[PieceType::Pawn.index()] & their_occ).non_empty() {
            best = see_value(PieceType::Pawn);
        }
        let seventh = if self.side == Colour::White { SquareSet::RANK_7 } else { SquareSet::RANK_2 };
        let our_pawns = self.piece_set(Piece::new(self.side, PieceType::Pawn));
        if (our_pawns & seventh).non_empty() {
            best += see_value(PieceType::Queen) - see_value(PieceType::Pawn);
        }
        best
    }
}

impl Default for Board {
    fn default() -> Self {
        let mut board = Self::new();
        board.set_startpos();
        board
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8 {
                let sq = Square::new(rank * 8 + file).unwrap();
                match self.piece_at(sq) {
                    Some(piece) => write!(f, "{piece} ")?,
                    None => write!(f, ". ")?,
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "  a b c d e f g h")?;
        writeln!(f, "FEN: {}", self.fen())
    }
}

fn parse_square(text: &str) -> Option<Square> {
    let bytes = text.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = bytes[0].checked_sub(b'a')?;
    let rank = bytes[1].checked_sub(b'1')?;
    let _ = File::from_index(file)?;
    let _ = Rank::from_index(rank)?;
    Square::new(rank * 8 + file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(board: &Board) -> (Vec<SquareSet>, Vec<SquareSet>, Vec<Option<Piece>>, u64, u8) {
        (
            board.pieces.to_vec(),
            board.colours.to_vec(),
            board.mailbox.to_vec(),
            board.key,
            board.halfmove_clock,
        )
    }

    fn walk(board: &mut Board, depth: u32) {
        if depth == 0 {
            return;
        }
        let mut list = MoveList::new();
        board.generate_all(&mut list);
        for i in 0..list.len() {
            let m = list[i].mov;
            let before = snapshot(board);
            let fen_before = board.fen();
            if board.make_move(m) {
                walk(board, depth - 1);
                board.unmake_move();
            }
            assert_eq!(snapshot(board), before, "unmake failed for {m:?} in {fen_before}");
            assert_eq!(board.fen(), fen_before);
        }
    }

    #[test]
    fn make_unmake_round_trip() {
        let fens = [
            Board::STARTING_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        ];
        for fen in fens {
            let mut board = Board::from_fen(fen).unwrap();
            walk(&mut board, 2);
        }
    }

    #[test]
    fn fen_round_trip() {
        let fens = [
            Board::STARTING_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1",
        ];
        for fen in fens {
            let board = Board::from_fen(fen).unwrap();
            assert_eq!(board.fen(), fen);
        }
    }

    #[test]
    fn incremental_key_matches_recomputation() {
        let mut board = Board::default();
        for text in ["e2e4", "c7c5", "g1f3", "d7d6", "f1b5", "c8d7", "e1g1"] {
            let m = board.parse_uci(text).unwrap();
            assert!(board.make_move(m));
            assert_eq!(board.hashkey(), board.generate_key(), "key drift after {text}");
        }
    }

    #[test]
    fn repetition_counting() {
        let mut board = Board::default();
        for text in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"] {
            let m = board.parse_uci(text).unwrap();
            assert!(board.make_move(m));
        }
        assert_eq!(board.repetition_count(), 2);
    }

    #[test]
    fn illegal_moves_are_rejected_and_restored() {
        // the king is pinned against moving into e-file danger: Ke2 is illegal
        let mut board =
            Board::from_fen("4r3/8/8/8/8/8/4K3/8 w - - 0 1").unwrap();
        let fen = board.fen();
        let m = board.parse_uci("e2e3").unwrap();
        assert!(!board.make_move(m));
        assert_eq!(board.fen(), fen);
    }

    #[test]
    fn see_simple_exchanges() {
        // pawn takes defended pawn: PxP, then NxP leaves us a pawn down
        let board = Board::from_fen("4k3/8/2n5/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let m = board.parse_uci("e4d5").unwrap();
        assert!(board.see_ge(m, 0));
        assert!(!board.see_ge(m, 50));

        // rook takes defended pawn is losing
        let board = Board::from_fen("4k3/4r3/8/4p3/8/8/4R3/4K3 w - - 0 1").unwrap();
        let m = board.parse_uci("e2e5").unwrap();
        assert!(!board.see_ge(m, 0));
        assert!(board.see_ge(m, see_value(PieceType::Pawn) - see_value(PieceType::Rook)));
    }

    #[test]
    fn gives_check_detection() {
        let board = Board::from_fen("7k/6Q1/6K1/8/8/8/8/8 w - - 0 1").unwrap();
        let mate = board.parse_uci("g7g8").unwrap();
        assert!(board.move_gives_check(mate));

        // discovered check: bishop uncovered by the knight
        let board = Board::from_fen("7k/8/8/4N3/3B4/8/8/K7 w - - 0 1").unwrap();
        let disco = board.parse_uci("e5c6").unwrap();
        assert!(board.move_gives_check(disco));
        let quiet = board.parse_uci("a1b1").unwrap();
        assert!(!board.move_gives_check(quiet));
    }
}
