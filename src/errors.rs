use thiserror::Error;

use crate::chess::piece::Colour;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenParseError {
    #[error("FEN string is missing board part")]
    MissingBoard,
    #[error("board part of FEN has {0} segments, expected 8")]
    BoardSegments(usize),
    #[error("wrong number of squares in board segment")]
    BadSquaresInSegment,
    #[error("unexpected character in piece placement: '{0}'")]
    UnexpectedCharacter(char),
    #[error("expected side part")]
    MissingSide,
    #[error("expected side to be 'w' or 'b', got \"{0}\"")]
    InvalidSide(String),
    #[error("expected castling part")]
    MissingCastling,
    #[error("invalid castling format: \"{0}\"")]
    InvalidCastling(String),
    #[error("expected en passant part")]
    MissingEnPassant,
    #[error("invalid en passant square: \"{0}\"")]
    InvalidEnPassant(String),
    #[error("invalid halfmove clock: \"{0}\"")]
    InvalidHalfmoveClock(String),
    #[error("invalid fullmove number: \"{0}\"")]
    InvalidFullmoveNumber(String),
    #[error("{colour} must have exactly one king")]
    WrongKingCount { colour: Colour },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("invalid move length {0}")]
    InvalidLength(usize),
    #[error("invalid square \"{0}\"")]
    InvalidSquare(String),
    #[error("invalid promotion piece {0}")]
    InvalidPromotionPiece(char),
    #[error("illegal move {0}")]
    IllegalMove(String),
}

/// Top-level UCI errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UciError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("failed to parse FEN: {0}")]
    Fen(#[from] FenParseError),
    #[error("failed to parse move: {0}")]
    Move(#[from] MoveParseError),
    #[error("bad go command: {0}")]
    ParseGo(String),
    #[error("bad setoption command: {0}")]
    ParseOption(String),
    #[error("command ended unexpectedly: {0}")]
    UnexpectedTermination(String),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}
