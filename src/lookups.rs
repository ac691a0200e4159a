//! Compile-time lookup tables: Zobrist keys and capture-ordering scores.

use crate::rng::XorShiftState;

pub struct ZobristKeys {
    /// One key per (piece, square).
    pub piece: [[u64; 64]; 12],
    /// One key per castling-rights bitmask.
    pub castle: [u64; 16],
    /// One key per en-passant file.
    pub ep_file: [u64; 8],
    /// Applied when black is to move.
    pub side: u64,
}

pub static ZOBRIST: ZobristKeys = {
    let mut keys = ZobristKeys {
        piece: [[0; 64]; 12],
        castle: [0; 16],
        ep_file: [0; 8],
        side: 0,
    };
    let mut rng = XorShiftState::new();
    let mut piece = 0;
    while piece < 12 {
        let mut sq = 0;
        while sq < 64 {
            let (key, next) = rng.next_self();
            rng = next;
            keys.piece[piece][sq] = key;
            sq += 1;
        }
        piece += 1;
    }
    let mut i = 0;
    while i < 16 {
        let (key, next) = rng.next_self();
        rng = next;
        keys.castle[i] = key;
        i += 1;
    }
    let mut i = 0;
    while i < 8 {
        let (key, next) = rng.next_self();
        rng = next;
        keys.ep_file[i] = key;
        i += 1;
    }
    let (key, _) = rng.next_self();
    keys.side = key;
    keys
};

/// Most-valuable-victim / least-valuable-attacker capture ordering scores,
/// indexed `[victim][attacker]` by piece type.
pub static MVV_LVA_SCORE: [[i32; 6]; 6] = {
    const VICTIM_SCORE: [i32; 6] = [100, 200, 300, 400, 500, 600];
    let mut table = [[0; 6]; 6];
    let mut victim = 0;
    while victim < 6 {
        let mut attacker = 0;
        while attacker < 6 {
            table[victim][attacker] = VICTIM_SCORE[victim] + 6 - VICTIM_SCORE[attacker] / 100;
            attacker += 1;
        }
        victim += 1;
    }
    table
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zobrist_keys_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for piece in &ZOBRIST.piece {
            for &key in piece {
                assert!(seen.insert(key));
            }
        }
        for &key in &ZOBRIST.castle {
            assert!(seen.insert(key));
        }
        for &key in &ZOBRIST.ep_file {
            assert!(seen.insert(key));
        }
        assert!(seen.insert(ZOBRIST.side));
    }

    #[test]
    fn mvv_lva_prefers_valuable_victims_and_cheap_attackers() {
        // PxQ should outrank QxQ, which should outrank PxP.
        assert!(MVV_LVA_SCORE[4][0] > MVV_LVA_SCORE[4][4]);
        assert!(MVV_LVA_SCORE[4][4] > MVV_LVA_SCORE[0][0]);
    }
}
