//! Shared transposition table. Entries are stored as two atomics per bucket,
//! with the data word XOR-ed into the key slot so that a torn concurrent
//! write decodes as a key mismatch rather than as a wrong entry. Probes and
//! stores are wait-free.

use std::{
    mem::size_of,
    sync::atomic::{AtomicU64, AtomicU8, Ordering},
};

use crate::{
    chess::chessmove::ShortMove,
    evaluation::{MINIMUM_WIN_SCORE, NO_SCORE},
};

const MAX_GENERATION: u8 = 1 << 6;
const GENERATION_MASK: u8 = MAX_GENERATION - 1;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Bound {
    None = 0,
    /// Upper bound: the true score is at most the stored score.
    Alpha = 1,
    /// Lower bound: the true score is at least the stored score.
    Beta = 2,
    Exact = 3,
}

impl Bound {
    const fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            1 => Self::Alpha,
            2 => Self::Beta,
            3 => Self::Exact,
            _ => Self::None,
        }
    }
}

/// Unpacked entry payload:
///
/// ```text
/// bits  0..16  move (short form)
/// bits 16..32  score
/// bits 32..48  static eval
/// bits 48..56  depth
/// bits 56..58  bound
/// bits 58..64  generation
/// ```
#[derive(Clone, Copy)]
struct EntryData {
    mov: ShortMove,
    score: i16,
    eval: i16,
    depth: u8,
    bound: Bound,
    generation: u8,
}

impl EntryData {
    fn unpack(bits: u64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self {
            mov: bits as u16,
            score: (bits >> 16) as u16 as i16,
            eval: (bits >> 32) as u16 as i16,
            depth: (bits >> 48) as u8,
            bound: Bound::from_bits((bits >> 56) as u8),
            generation: (bits >> 58) as u8 & GENERATION_MASK,
        }
    }

    fn pack(self) -> u64 {
        u64::from(self.mov)
            | u64::from(self.score as u16) << 16
            | u64::from(self.eval as u16) << 32
            | u64::from(self.depth) << 48
            | u64::from(self.bound as u8) << 56
            | u64::from(self.generation & GENERATION_MASK) << 58
    }
}

#[derive(Default)]
struct Bucket {
    /// Holds `hash ^ data`.
    key: AtomicU64,
    data: AtomicU64,
}

/// The result of a probe. `score`/`eval`/`mov` are filled in whenever the
/// key matched, even when no depth/bound-justified cutoff (`hit`) exists;
/// callers use them for move ordering and static-eval caching.
#[derive(Clone, Copy)]
pub struct TTProbe {
    pub hit: bool,
    pub score: i32,
    pub eval: i32,
    pub mov: ShortMove,
    pub depth: i32,
    pub bound: Bound,
}

impl TTProbe {
    const MISS: Self = Self {
        hit: false,
        score: NO_SCORE,
        eval: NO_SCORE,
        mov: 0,
        depth: 0,
        bound: Bound::None,
    };
}

pub struct TransTable {
    buckets: Vec<Bucket>,
    generation: AtomicU8,
}

impl TransTable {
    pub const fn new() -> Self {
        Self { buckets: Vec::new(), generation: AtomicU8::new(0) }
    }

    pub fn resize(&mut self, megabytes: usize) {
        let len = megabytes * 1024 * 1024 / size_of::<Bucket>();
        let len = len.max(1);
        self.buckets = Vec::new();
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(len).expect("transposition table allocation failed");
        buckets.resize_with(len, Bucket::default);
        self.buckets = buckets;
    }

    pub fn size_bytes(&self) -> usize {
        self.buckets.len() * size_of::<Bucket>()
    }

    pub fn clear(&self, threads: usize) {
        let chunk_size = self.buckets.len() / threads.max(1) + 1;
        std::thread::scope(|s| {
            for chunk in self.buckets.chunks(chunk_size) {
                s.spawn(move || {
                    for bucket in chunk {
                        bucket.key.store(0, Ordering::Relaxed);
                        bucket.data.store(0, Ordering::Relaxed);
                    }
                });
            }
        });
    }

    /// Advances the age used to prefer evicting entries from older searches.
    pub fn next_search(&self) {
        let next = (self.generation.load(Ordering::Relaxed) + 1) & GENERATION_MASK;
        self.generation.store(next, Ordering::Relaxed);
    }

    fn bucket_for(&self, hash: u64) -> &Bucket {
        // fixed-point multiplication maps the hash uniformly onto the table
        let index = ((u128::from(hash) * self.buckets.len() as u128) >> 64) as usize;
        &self.buckets[index]
    }

    /// Probes for `hash`. The returned `hit` is true only when the stored
    /// depth reaches `depth` and the stored bound justifies a cutoff against
    /// `(alpha, beta)`; mate and tablebase scores are re-anchored to `ply`.
    pub fn probe(&self, hash: u64, depth: i32, alpha: i32, beta: i32, ply: usize) -> TTProbe {
        if self.buckets.is_empty() {
            return TTProbe::MISS;
        }
        let bucket = self.bucket_for(hash);
        let data = bucket.data.load(Ordering::Relaxed);
        let key = bucket.key.load(Ordering::Relaxed);
        if key ^ data != hash || data == 0 {
            return TTProbe::MISS;
        }
        let entry = EntryData::unpack(data);
        let score = reconstruct_mate_score(i32::from(entry.score), ply);
        let cutoff = i32::from(entry.depth) >= depth
            && match entry.bound {
                Bound::Exact => true,
                Bound::Beta => score >= beta,
                Bound::Alpha => score <= alpha,
                Bound::None => false,
            };
        TTProbe {
            hit: cutoff,
            score,
            eval: i32::from(entry.eval),
            mov: entry.mov,
            depth: i32::from(entry.depth),
            bound: entry.bound,
        }
    }

    /// The stored move for `hash`, if any.
    pub fn probe_move(&self, hash: u64) -> ShortMove {
        if self.buckets.is_empty() {
            return 0;
        }
        let bucket = self.bucket_for(hash);
        let data = bucket.data.load(Ordering::Relaxed);
        let key = bucket.key.load(Ordering::Relaxed);
        if key ^ data != hash {
            return 0;
        }
        EntryData::unpack(data).mov
    }

    pub fn store(
        &self,
        hash: u64,
        ply: usize,
        score: i32,
        eval: i32,
        bound: Bound,
        depth: i32,
        mov: ShortMove,
    ) {
        if self.buckets.is_empty() {
            return;
        }
        let generation = self.generation.load(Ordering::Relaxed);
        let bucket = self.bucket_for(hash);
        let old_data = bucket.data.load(Ordering::Relaxed);
        let old_key = bucket.key.load(Ordering::Relaxed);

        #[allow(clippy::cast_possible_truncation)]
        let depth8 = depth.clamp(0, 255) as u8;
        let replace = if old_data == 0 {
            true
        } else {
            let old = EntryData::unpack(old_data);
            let same_position = old_key ^ old_data == hash;
            if old.generation != generation {
                // older searches are evicted first
                true
            } else if old.bound == Bound::Exact && bound != Bound::Exact && depth8 < old.depth {
                // a shallow non-exact result (e.g. a singular-exclusion
                // probe) never displaces an exact entry from this search
                false
            } else {
                same_position || depth8 >= old.depth
            }
        };
        if !replace {
            return;
        }

        let mut mov = mov;
        if mov == 0 && old_key ^ old_data == hash {
            // keep the known-good move when the new result has none
            mov = EntryData::unpack(old_data).mov;
        }

        let score = normalise_mate_score(score, ply).clamp(i32::from(i16::MIN), i32::from(i16::MAX));
        let eval = eval.clamp(i32::from(i16::MIN), i32::from(i16::MAX));
        #[allow(clippy::cast_possible_truncation)]
        let entry = EntryData {
            mov,
            score: score as i16,
            eval: eval as i16,
            depth: depth8,
            bound,
            generation,
        };
        let data = entry.pack();
        bucket.key.store(hash ^ data, Ordering::Relaxed);
        bucket.data.store(data, Ordering::Relaxed);
    }

    /// Estimate of table fullness in permill, sampled from the first
    /// thousand buckets.
    pub fn used_permill(&self) -> usize {
        let generation = self.generation.load(Ordering::Relaxed);
        let sample = self.buckets.len().min(1000);
        let mut hits = 0;
        for bucket in &self.buckets[..sample] {
            let data = bucket.data.load(Ordering::Relaxed);
            if data != 0 && EntryData::unpack(data).generation == generation {
                hits += 1;
            }
        }
        if sample == 0 {
            0
        } else {
            hits * 1000 / sample
        }
    }
}

/// Converts a score to its table form: mate and tablebase scores become
/// relative to the storing node by adding the distance already travelled.
pub const fn normalise_mate_score(mut score: i32, ply: usize) -> i32 {
    if score >= MINIMUM_WIN_SCORE {
        score += ply as i32;
    } else if score <= -MINIMUM_WIN_SCORE {
        score -= ply as i32;
    }
    score
}

/// The inverse of [`normalise_mate_score`], applied on every probe.
pub const fn reconstruct_mate_score(mut score: i32, ply: usize) -> i32 {
    if score >= MINIMUM_WIN_SCORE {
        score -= ply as i32;
    } else if score <= -MINIMUM_WIN_SCORE {
        score += ply as i32;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::MATE_SCORE;

    fn small_tt() -> TransTable {
        let mut tt = TransTable::new();
        tt.resize(1);
        tt
    }

    #[test]
    fn store_probe_round_trip() {
        let tt = small_tt();
        tt.store(0xDEAD_BEEF, 0, 57, 31, Bound::Exact, 9, 0x1234);
        let probe = tt.probe(0xDEAD_BEEF, 9, -100, 100, 0);
        assert!(probe.hit);
        assert_eq!(probe.score, 57);
        assert_eq!(probe.eval, 31);
        assert_eq!(probe.mov, 0x1234);
        assert_eq!(probe.bound, Bound::Exact);

        // deeper requirement misses, but the move and eval still come back
        let probe = tt.probe(0xDEAD_BEEF, 10, -100, 100, 0);
        assert!(!probe.hit);
        assert_eq!(probe.mov, 0x1234);
        assert_eq!(probe.eval, 31);
    }

    #[test]
    fn bounds_justify_cutoffs() {
        let tt = small_tt();
        tt.store(1, 0, 80, 0, Bound::Beta, 5, 0);
        assert!(tt.probe(1, 5, 0, 50, 0).hit, "lower bound 80 cuts beta 50");
        assert!(!tt.probe(1, 5, 0, 100, 0).hit, "lower bound 80 cannot cut beta 100");

        tt.store(2, 0, -80, 0, Bound::Alpha, 5, 0);
        assert!(tt.probe(2, 5, -50, 50, 0).hit, "upper bound -80 cuts alpha -50");
        assert!(!tt.probe(2, 5, -100, 50, 0).hit);
    }

    #[test]
    fn mate_scores_are_ply_relative() {
        let tt = small_tt();
        let score = MATE_SCORE - 4;
        tt.store(99, 2, score, 0, Bound::Exact, 3, 0);
        // probing from a deeper node sees a mate that is further away
        let probe = tt.probe(99, 3, -32000, 32000, 6);
        assert_eq!(probe.score, MATE_SCORE - (4 + (6 - 2)));
        // and from the same ply, the same distance
        let probe = tt.probe(99, 3, -32000, 32000, 2);
        assert_eq!(probe.score, score);
    }

    #[test]
    fn exact_entries_resist_shallow_overwrites() {
        let tt = small_tt();
        tt.store(7, 0, 10, 0, Bound::Exact, 10, 0x42);
        tt.store(7, 0, 500, 0, Bound::Beta, 3, 0x99);
        let probe = tt.probe(7, 0, -32000, 32000, 0);
        assert_eq!(probe.mov, 0x42);
        assert_eq!(probe.depth, 10);
    }

    #[test]
    fn generation_ages_entries_out() {
        let tt = small_tt();
        tt.store(7, 0, 10, 0, Bound::Exact, 20, 0x42);
        tt.next_search();
        tt.store(7, 0, 20, 0, Bound::Alpha, 1, 0x17);
        let probe = tt.probe(7, 1, -32000, 32000, 0);
        assert_eq!(probe.mov, 0x17);
    }

    #[test]
    fn mate_encoding_is_symmetric() {
        for score in [MATE_SCORE - 3, -(MATE_SCORE - 7), 1234, -17, 0] {
            for ply in [0, 1, 5, 90] {
                assert_eq!(
                    reconstruct_mate_score(normalise_mate_score(score, ply), ply),
                    score
                );
            }
        }
    }
}
