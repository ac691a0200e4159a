use crate::{
    chess::chessmove::{Move, ShortMove},
    evaluation::NO_SCORE,
    historytable::{ContinuationHistory, CounterMoveTable, HistoryTable},
    search::pv::PVariation,
    util::MAX_PLY,
};

/// A root move with its ordering value, re-scored each iteration.
#[derive(Clone, Copy, Debug)]
pub struct RootMove {
    pub mov: Move,
    pub value: i32,
}

/// Per-worker search state. The histories survive from search to search;
/// everything else is reset by `new_search`.
pub struct ThreadData {
    pub thread_id: usize,

    pub main_history: HistoryTable,
    pub counter_moves: CounterMoveTable,
    pub cont_history: ContinuationHistory,

    pub killers: [[Option<Move>; 2]; MAX_PLY + 2],
    /// Static evaluations along the current line, indexed by height.
    pub evals: [i32; MAX_PLY + 2],
    /// Move excluded at each height by a singular-extension probe
    /// (0 = none).
    pub excluded: [ShortMove; MAX_PLY + 2],

    /// Null-move verification guards.
    pub nullmove_ply: usize,
    pub nullmove_side: usize,

    pub nodes: u64,
    pub seldepth: i32,
    pub depth: i32,
    pub last_complete_depth: i32,

    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
    /// Best root move of a failed-low iteration, kept for move ordering
    /// but never reported.
    pub best_failing_low: Option<Move>,

    pub root_moves: Vec<RootMove>,
    /// Scores and lines for the k best root moves, descending.
    pub multipv_scores: Vec<i32>,
    pub multipv_lines: Vec<PVariation>,
    pub last_pv: PVariation,
    /// Score of the previous completed search, reported on instamoves.
    pub last_best_root_score: i32,

    /// The root is decided by tablebases; root-move values carry TB ranks.
    pub tb_position: bool,
    pub use_root_move_score: bool,
}

impl ThreadData {
    pub fn new(thread_id: usize) -> Self {
        Self {
            thread_id,
            main_history: HistoryTable::new(),
            counter_moves: CounterMoveTable::new(),
            cont_history: ContinuationHistory::new(),
            killers: [[None; 2]; MAX_PLY + 2],
            evals: [0; MAX_PLY + 2],
            excluded: [0; MAX_PLY + 2],
            nullmove_ply: 0,
            nullmove_side: 0,
            nodes: 0,
            seldepth: 0,
            depth: 0,
            last_complete_depth: 0,
            best_move: None,
            ponder_move: None,
            best_failing_low: None,
            root_moves: Vec::new(),
            multipv_scores: Vec::new(),
            multipv_lines: Vec::new(),
            last_pv: PVariation::default(),
            last_best_root_score: NO_SCORE,
            tb_position: false,
            use_root_move_score: false,
        }
    }

    /// Resets the per-search state, keeping the learned histories.
    pub fn new_search(&mut self, multipv: usize) {
        self.killers = [[None; 2]; MAX_PLY + 2];
        self.evals = [0; MAX_PLY + 2];
        self.excluded = [0; MAX_PLY + 2];
        self.nullmove_ply = 0;
        self.nullmove_side = 0;
        self.nodes = 0;
        self.seldepth = 0;
        self.depth = 0;
        self.last_complete_depth = 0;
        self.best_move = None;
        self.ponder_move = None;
        self.best_failing_low = None;
        self.root_moves.clear();
        self.multipv_scores = vec![NO_SCORE; multipv];
        self.multipv_lines = vec![PVariation::default(); multipv];
        self.last_pv = PVariation::default();
        self.tb_position = false;
        self.use_root_move_score = false;
    }

    /// Wipes the learned state as well; `ucinewgame` does this.
    pub fn clear_for_new_game(&mut self) {
        self.main_history.clear();
        self.counter_moves.clear();
        self.cont_history.clear();
        self.last_best_root_score = NO_SCORE;
    }

    pub fn insert_killer(&mut self, height: usize, m: Move) {
        debug_assert!(height < MAX_PLY);
        if self.killers[height][0] == Some(m) {
            return;
        }
        self.killers[height][1] = self.killers[height][0];
        self.killers[height][0] = Some(m);
    }
}
