use std::fmt::{self, Display};

use arrayvec::ArrayVec;

use crate::{chess::chessmove::Move, util::MAX_PLY};

/// A principal variation and its score.
#[derive(Clone, Debug)]
pub struct PVariation {
    pub(crate) score: i32,
    pub(crate) moves: ArrayVec<Move, MAX_PLY>,
}

impl Default for PVariation {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl PVariation {
    pub const EMPTY: Self = Self { score: 0, moves: ArrayVec::new_const() };

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub const fn score(&self) -> i32 {
        self.score
    }

    pub fn first(&self) -> Option<Move> {
        self.moves.first().copied()
    }

    pub fn clear(&mut self) {
        self.moves.clear();
    }

    /// Prepends `m` to `rest`, storing the result in self.
    pub(crate) fn load_from(&mut self, m: Move, rest: &Self) {
        self.moves.clear();
        self.moves.push(m);
        let spare = self.moves.capacity() - 1;
        self.moves
            .try_extend_from_slice(&rest.moves[..rest.moves.len().min(spare)])
            .expect("pv assembly cannot overflow");
    }
}

impl Display for PVariation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, m) in self.moves.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{m}")?;
        }
        Ok(())
    }
}
