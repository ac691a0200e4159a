pub mod attacks;
pub mod board;
pub mod chessmove;
pub mod piece;
pub mod squareset;
pub mod types;
