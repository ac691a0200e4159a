//! Time management: a soft deadline (`endtime1`, checked between
//! iterations) and a hard deadline (`endtime2`, enforced by the guide),
//! recomputed as the search's opinion of the root stabilises or shifts.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use crate::chess::{chessmove::Move, piece::Colour};

const UNSET: u64 = u64::MAX;

/// Everything `go` told us about how long and deep to think.
#[derive(Clone, Debug, Default)]
pub struct SearchLimits {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: u64,
    pub binc: u64,
    pub movestogo: Option<u64>,
    pub movetime: Option<u64>,
    pub depth: Option<i32>,
    pub nodes: Option<u64>,
    pub mate: Option<i32>,
    pub infinite: bool,
    pub ponder: bool,
    pub searchmoves: Vec<Move>,
}

pub struct TimeManager {
    pub limits: SearchLimits,
    start: Instant,
    /// Milliseconds from `start` at which the measuring clock was last
    /// (re)started; a ponderhit moves it.
    base_ms: AtomicU64,
    soft_ms: AtomicU64,
    hard_ms: AtomicU64,
    /// Side-to-move clock and increment; movetime mode is encoded as
    /// `time == 0, inc == movetime`.
    time: u64,
    inc: u64,
    movestogo: Option<u64>,
    overhead: u64,
    phase: i32,
}

impl TimeManager {
    pub fn new(
        limits: SearchLimits,
        stm: Colour,
        move_overhead: u64,
        threads: usize,
        phase: i32,
    ) -> Self {
        let (clock, inc) = match stm {
            Colour::White => (limits.wtime, limits.winc),
            Colour::Black => (limits.btime, limits.binc),
        };
        let (time, inc) = if let Some(movetime) = limits.movetime {
            (0, movetime)
        } else {
            (clock.unwrap_or(0), if clock.is_some() { inc } else { 0 })
        };
        let tm = Self {
            movestogo: limits.movestogo,
            limits,
            start: Instant::now(),
            base_ms: AtomicU64::new(0),
            soft_ms: AtomicU64::new(UNSET),
            hard_ms: AtomicU64::new(UNSET),
            time,
            inc,
            overhead: move_overhead + 8 * threads as u64,
            phase,
        };
        tm.reset_deadlines(0, true);
        tm
    }

    /// Recomputes the deadlines. `constant_root_moves` counts how many
    /// iterations the best root move has survived; a stable move shortens
    /// the budget, a fresh one restores it. The soft deadline is only
    /// touched on `complete` resets.
    pub fn reset_deadlines(&self, constant_root_moves: i32, complete: bool) {
        let base = self.base_ms.load(Ordering::Relaxed);
        let crm = u64::try_from(constant_root_moves).unwrap_or(0);
        let (soft, hard) = if let Some(mtg) = self.movestogo.filter(|_| self.time > 0) {
            // x/y time controls: stop soon at 0.9..1.9 and at the latest at
            // 1.5..2.5 times the average move time
            let f1 = 19u64.saturating_sub(2 * crm).max(9);
            let f2 = 25u64.saturating_sub(2 * crm).max(15);
            let soft = self.time * f1 / ((mtg + 1) * 10);
            let hard = (f2 * self.time / ((mtg + 1) * 10))
                .min(self.time.saturating_sub(self.overhead * mtg));
            (soft, hard)
        } else if self.time > 0 {
            if self.inc > 0 {
                // sudden death with increment: split the remaining time
                // into (256 - phase) slots
                let f1 = 15u64.saturating_sub(2 * crm).max(5);
                let f2 = 25u64.saturating_sub(2 * crm).max(15);
                let slots = (256 - self.phase) as u64;
                let soft = self.inc.max(f1 * (self.time + self.inc) / slots);
                let hard = self
                    .inc
                    .max(f2 * (self.time + self.inc) / slots)
                    .min(self.time.saturating_sub(self.overhead));
                (soft, hard)
            } else {
                // sudden death: plan for another 32..42 moves
                let f1 = (32 + 2 * crm).min(42);
                let f2 = (12 + 2 * crm).min(22);
                (
                    self.time / f1,
                    (self.time / f2).min(self.time.saturating_sub(self.overhead)),
                )
            }
        } else if self.inc > 0 {
            // movetime: exactly this long, no early stop
            (self.inc, self.inc)
        } else {
            if complete {
                self.soft_ms.store(UNSET, Ordering::Relaxed);
            }
            self.hard_ms.store(UNSET, Ordering::Relaxed);
            return;
        };
        if complete {
            self.soft_ms.store(base + soft, Ordering::Relaxed);
        }
        self.hard_ms.store(base + hard, Ordering::Relaxed);
    }

    /// A ponderhit starts the clock from now; the time already spent
    /// pondering was the opponent's.
    pub fn restart_after_ponderhit(&self) {
        self.base_ms.store(self.elapsed_ms(), Ordering::Relaxed);
        self.reset_deadlines(0, false);
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Whether clock-based stopping applies at all.
    pub fn is_timed(&self) -> bool {
        self.hard_ms.load(Ordering::Relaxed) != UNSET
    }

    pub fn soft_deadline_passed(&self) -> bool {
        let soft = self.soft_ms.load(Ordering::Relaxed);
        soft != UNSET && self.elapsed_ms() >= soft
    }

    pub fn hard_deadline_passed(&self) -> bool {
        let hard = self.hard_ms.load(Ordering::Relaxed);
        hard != UNSET && self.elapsed_ms() >= hard
    }

    pub fn max_depth(&self) -> Option<i32> {
        self.limits.mate.map(|m| 2 * m).or(self.limits.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(tm: &TimeManager) -> (u64, u64) {
        (tm.soft_ms.load(Ordering::Relaxed), tm.hard_ms.load(Ordering::Relaxed))
    }

    #[test]
    fn movetime_sets_both_deadlines_equal() {
        let limits = SearchLimits { movetime: Some(500), ..Default::default() };
        let tm = TimeManager::new(limits, Colour::White, 10, 1, 0);
        assert_eq!(millis(&tm), (500, 500));
    }

    #[test]
    fn infinite_search_has_no_deadline() {
        let limits = SearchLimits { infinite: true, ..Default::default() };
        let tm = TimeManager::new(limits, Colour::White, 10, 1, 0);
        assert!(!tm.is_timed());
        assert!(!tm.soft_deadline_passed());
        assert!(!tm.hard_deadline_passed());
    }

    #[test]
    fn movestogo_budget_is_a_clock_fraction() {
        let limits = SearchLimits {
            wtime: Some(60_000),
            movestogo: Some(19),
            ..Default::default()
        };
        let tm = TimeManager::new(limits, Colour::White, 10, 1, 0);
        let (soft, hard) = millis(&tm);
        // f1 = 19, f2 = 25 at constant_root_moves = 0
        assert_eq!(soft, 60_000 * 19 / 200);
        assert_eq!(hard, 25 * 60_000 / 200);
        assert!(soft <= hard);
    }

    #[test]
    fn stable_best_move_shrinks_the_budget() {
        let limits = SearchLimits {
            wtime: Some(60_000),
            movestogo: Some(19),
            ..Default::default()
        };
        let tm = TimeManager::new(limits, Colour::White, 10, 1, 0);
        let (soft0, hard0) = millis(&tm);
        tm.reset_deadlines(4, true);
        let (soft4, hard4) = millis(&tm);
        assert!(soft4 < soft0);
        assert!(hard4 < hard0);
    }

    #[test]
    fn black_uses_its_own_clock() {
        let limits = SearchLimits {
            wtime: Some(1),
            btime: Some(90_000),
            winc: 0,
            binc: 1000,
            ..Default::default()
        };
        let tm = TimeManager::new(limits, Colour::Black, 10, 1, 128);
        assert!(tm.is_timed());
        let (soft, _) = millis(&tm);
        assert!(soft >= 1000, "increment is the floor of the budget");
    }
}
