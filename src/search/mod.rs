//! The search proper: a principal-variation alpha-beta with a quiescence
//! tail, driven per worker by iterative deepening under aspiration windows.

pub mod parameters;
pub mod pv;

use arrayvec::ArrayVec;

use crate::{
    chess::{
        board::{
            movegen::{MoveList, MAX_POSITION_MOVES},
            Board,
        },
        chessmove::Move,
    },
    evaluation::{
        evaluate, is_mate_score, material_value, mated_in, DRAW_SCORE, INFINITY_SCORE, MATE_BOUND,
        MATE_SCORE, NO_SCORE, TB_WIN_SCORE, TEMPO,
    },
    historytable::{update_history, ContinuationHistory, CMPLIES},
    lookups::MVV_LVA_SCORE,
    movepicker::{MoveSelector, Stage},
    searchinfo::{EngineOptions, SharedSearchState, StopLevel},
    tablebases,
    threadlocal::ThreadData,
    timemgmt::TimeManager,
    transpositiontable::{Bound, TransTable},
    util::{MAX_DEPTH, MAX_PLY},
};

use self::{parameters::SearchParams, pv::PVariation};
use self::parameters::{MAX_LMP_DEPTH, SKIP_DEPTHS, SKIP_SIZE};

// root-ordering values: PV move, then killers, then captures, then history
const PV_VALUE: i32 = 1 << 30;
const KILLER1_VALUE: i32 = 1 << 29;
const KILLER2_VALUE: i32 = (1 << 29) - (1 << 10);
const CAPTURE_VALUE: i32 = 1 << 20;

/// How the search went, as collected from one worker.
#[derive(Clone, Debug, Default)]
pub struct SearchReport {
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
    pub score: i32,
    pub depth: i32,
    pub pv: Vec<Move>,
    pub multipv: Vec<(i32, Vec<Move>)>,
    pub nodes: u64,
}

/// One worker's view of a running search.
pub struct SearchContext<'a> {
    pub board: Board,
    pub td: &'a mut ThreadData,
    pub tt: &'a TransTable,
    pub params: &'a SearchParams,
    pub shared: &'a SharedSearchState,
    pub tm: &'a TimeManager,
    pub options: &'a EngineOptions,
    /// Probe tablebases at or below this many men.
    pub use_tb: u32,
    /// Thread 0 talks to the GUI.
    pub report: bool,
    last_report_ms: u64,
}

impl<'a> SearchContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        board: Board,
        td: &'a mut ThreadData,
        tt: &'a TransTable,
        params: &'a SearchParams,
        shared: &'a SharedSearchState,
        tm: &'a TimeManager,
        options: &'a EngineOptions,
    ) -> Self {
        let use_tb = options.syzygy_probe_limit.min(tablebases::max_pieces());
        Self {
            board,
            td,
            tt,
            params,
            shared,
            tm,
            options,
            use_tb,
            report: false,
            last_report_ms: 0,
        }
    }

    fn bump_node(&mut self) {
        self.td.nodes += 1;
        if self.td.nodes % 1024 == 0 {
            self.shared.publish_nodes(self.td.thread_id, self.td.nodes);
        }
    }

    fn stop_requested(&self) -> bool {
        self.shared.stop_level() >= StopLevel::StopImmediately
    }

    /// History score for move ordering and reduction adjustment: butterfly
    /// plus every live continuation plane.
    fn get_history(&self, m: Move) -> i32 {
        let mut value =
            i32::from(self.td.main_history.get(self.board.turn(), m.from(), m.to()));
        for i in 0..CMPLIES {
            if let Some((prev_piece, prev_to)) = self.board.conthist_index(i) {
                let plane = ContinuationHistory::plane_index(prev_piece, prev_to);
                value += i32::from(self.td.cont_history.get(plane, m.piece(), m.to()));
            }
        }
        value
    }

    /// Applies a history delta to the butterfly table and the live
    /// continuation planes.
    fn apply_history(&mut self, m: Move, bonus: i32) {
        let stm = self.board.turn();
        update_history(self.td.main_history.get_mut(stm, m.from(), m.to()), bonus);
        for i in 0..CMPLIES {
            if let Some((prev_piece, prev_to)) = self.board.conthist_index(i) {
                let plane = ContinuationHistory::plane_index(prev_piece, prev_to);
                update_history(
                    self.td.cont_history.get_mut(plane, m.piece(), m.to()),
                    bonus,
                );
            }
        }
    }

    /// Rewards the cutoff move, penalises the quiets tried before it, and
    /// records killer and counter moves.
    fn update_quiet_stats(&mut self, m: Move, quiets_tried: &[Move], depth: i32) {
        let bonus = depth * depth;
        self.apply_history(m, bonus);
        for &quiet in quiets_tried {
            self.apply_history(quiet, -bonus);
        }
        let height = self.board.height();
        self.td.insert_killer(height, m);
        if let Some((prev_piece, prev_to)) = self.board.conthist_index(0) {
            self.td.counter_moves.add(prev_piece, prev_to, m);
        }
    }

    /// Capture-only extension of the evaluation; resolves hanging tactics
    /// before the static eval is trusted.
    fn quiescence(&mut self, pv: &mut PVariation, mut alpha: i32, beta: i32, depth: i32) -> i32 {
        pv.clear();
        let height = self.board.height();
        let in_check = self.board.in_check();

        if height >= MAX_PLY - 1 {
            return evaluate(&self.board);
        }

        let probe = self.tt.probe(self.board.hashkey(), depth, alpha, beta, height);
        if probe.hit {
            return probe.score;
        }

        let mut best_score = -INFINITY_SCORE;
        let mut static_eval = NO_SCORE;
        if !in_check {
            static_eval = probe.eval;
            if static_eval == NO_SCORE {
                static_eval = if self.board.last_move_was_null() {
                    -self.td.evals[height - 1] + 2 * TEMPO
                } else {
                    evaluate(&self.board)
                };
            }
            best_score = static_eval;
            if static_eval >= beta {
                return static_eval;
            }
            if static_eval > alpha {
                alpha = static_eval;
            }
            // no capture can recover a position this far gone
            if static_eval + self.params.delta_margin + self.board.best_possible_capture() < alpha
            {
                return static_eval;
            }
        }

        let hash_move = self
            .board
            .short_move_to_full(probe.mov)
            .filter(|m| in_check || m.is_tactical());
        let mut selector = MoveSelector::new_quiescence(hash_move, in_check);
        let mut legal = 0;
        let mut l_pv = PVariation::default();
        while let Some(m) = selector.next(&self.board, self.td) {
            // per-move delta pruning
            if !in_check {
                if let Some(victim) = m.captured() {
                    if static_eval
                        + material_value(victim.piece_type())
                        + self.params.delta_margin
                        <= alpha
                    {
                        continue;
                    }
                }
            }
            if !self.board.make_move(m) {
                continue;
            }
            legal += 1;
            let score = -self.quiescence(&mut l_pv, -beta, -alpha, depth - 1);
            self.board.unmake_move();
            if score > best_score {
                best_score = score;
                if score >= beta {
                    return score;
                }
                if score > alpha {
                    alpha = score;
                    pv.load_from(m, &l_pv);
                }
            }
        }

        if in_check && legal == 0 {
            return mated_in(height);
        }
        best_score
    }

    /// The recursive PVS search.
    #[allow(clippy::too_many_lines)]
    fn alpha_beta(&mut self, pv: &mut PVariation, mut alpha: i32, beta: i32, depth: i32) -> i32 {
        let pv_node = alpha != beta - 1;
        self.bump_node();
        pv.clear();
        let height = self.board.height();
        let in_check = self.board.in_check();

        let rep = self.board.repetition_count();
        if rep >= 2 {
            return DRAW_SCORE;
        }
        if self.board.halfmove_clock() >= 100 {
            if !in_check {
                return DRAW_SCORE;
            }
            // mate outranks the 50-move rule
            return if self.board.has_legal_moves() {
                DRAW_SCORE
            } else {
                mated_in(height)
            };
        }

        if self.stop_requested() {
            return beta;
        }

        if depth <= 0 {
            self.td.seldepth = self.td.seldepth.max(height as i32 + 1);
            return self.quiescence(pv, alpha, beta, depth);
        }
        if height >= MAX_PLY - 1 {
            return evaluate(&self.board);
        }

        // a partial search with a move excluded keys the table apart from
        // the full search of the same position
        let exclude = self.td.excluded[height];
        self.td.excluded[height + 1] = 0;
        let newhash = self.board.hashkey() ^ u64::from(exclude);

        let probe = self.tt.probe(newhash, depth, alpha, beta, height);
        let mut hash_move_code = probe.mov;
        let hash_score = probe.score;
        let mut static_eval = probe.eval;
        if probe.hit && rep == 0 {
            if let Some(full) = self.board.short_move_to_full(hash_move_code) {
                pv.load_from(full, &PVariation::EMPTY);
            }
            return probe.score;
        }

        // interior tablebase probe; only once the position is reset by a
        // capture or pawn move, so WDL-only tables stay sound
        if self.use_tb > 0
            && self.board.piece_count() <= self.use_tb
            && self.board.halfmove_clock() == 0
        {
            if let Some(wdl) = tablebases::probe_wdl(&self.board) {
                self.shared.add_tbhit();
                let decisive = 1 + i32::from(self.options.syzygy_50_move_rule);
                let v = wdl.signed();
                let (bound, score) = if v <= -decisive {
                    (Bound::Alpha, -TB_WIN_SCORE + height as i32)
                } else if v >= decisive {
                    (Bound::Beta, TB_WIN_SCORE - height as i32)
                } else {
                    (Bound::Exact, DRAW_SCORE + v)
                };
                if bound == Bound::Exact
                    || (bound == Bound::Alpha && score <= alpha)
                    || (bound == Bound::Beta && score >= beta)
                {
                    self.tt.store(
                        self.board.hashkey(),
                        height,
                        score,
                        static_eval,
                        bound,
                        MAX_DEPTH,
                        0,
                    );
                }
                return score;
            }
        }

        let extend_all = i32::from(in_check);

        if static_eval == NO_SCORE {
            static_eval = if self.board.last_move_was_null() {
                // a null move flips the perspective and forfeits the tempo
                -self.td.evals[height - 1] + 2 * TEMPO
            } else {
                evaluate(&self.board)
            };
        }
        self.td.evals[height] = static_eval;
        let improving = height >= 2 && self.td.evals[height] > self.td.evals[height - 2];

        // razoring: a static eval far below alpha at the frontier must
        // prove itself tactically
        if !pv_node && !in_check && depth <= self.params.razor_max_depth {
            let ralpha = alpha - self.params.razor_base - depth * self.params.razor_depth_mul;
            if static_eval < ralpha {
                if depth == 1 && ralpha < alpha {
                    return self.quiescence(pv, alpha, beta, depth);
                }
                let mut scratch = PVariation::default();
                let value = self.quiescence(&mut scratch, ralpha, ralpha + 1, depth);
                if value <= ralpha {
                    return value;
                }
            }
        }

        let mut futility = false;
        if depth <= self.params.futility_max_depth {
            // reverse futility: comfortably above beta on static eval alone
            let margin =
                depth * (self.params.rfp_margin - self.params.rfp_improving_margin * i32::from(improving));
            if !in_check && static_eval - margin > beta {
                return static_eval;
            }
            futility = static_eval
                < alpha - (self.params.futility_base + self.params.futility_depth_mul * depth);
        }

        // null-move pruning with Stockfish-style verification
        let best_known = if hash_score != NO_SCORE { hash_score } else { static_eval };
        if !in_check
            && depth >= self.params.nmp_min_depth
            && best_known >= beta
            && (height >= self.td.nullmove_ply || height % 2 != self.td.nullmove_side)
        {
            let r = self.params.nmp_base_reduction
                + depth / 6
                + (best_known - beta) / self.params.nmp_eval_divisor
                + i32::from(!pv_node) * 2;
            self.board.make_null_move();
            let mut scratch = PVariation::default();
            let mut score = -self.alpha_beta(&mut scratch, -beta, -beta + 1, depth - r);
            self.board.unmake_null_move();
            if score >= beta {
                if score > MATE_BOUND {
                    score = beta;
                }
                if beta.abs() < 5000
                    && (depth < self.params.nmp_verification_depth || self.td.nullmove_ply != 0)
                {
                    return score;
                }
                // verification search with null moves disabled for our side
                // over the reduced horizon
                self.td.nullmove_ply = height + (3 * (depth - r) / 4).max(0) as usize;
                self.td.nullmove_side = height % 2;
                let verification = self.alpha_beta(&mut scratch, beta - 1, beta, depth - r);
                self.td.nullmove_ply = 0;
                self.td.nullmove_side = 0;
                if verification >= beta {
                    return score;
                }
            }
        }

        // ProbCut: a tactical move clearing an inflated beta at reduced
        // depth is good enough to cut now
        if !pv_node && depth >= self.params.probcut_min_depth && beta.abs() < MATE_SCORE {
            let rbeta = (beta + self.params.probcut_margin).min(MATE_SCORE);
            let mut tacticals = MoveList::new();
            self.board.generate_tactical(&mut tacticals);
            let mut scratch = PVariation::default();
            for i in 0..tacticals.len() {
                let m = tacticals[i].mov;
                if !self.board.see_ge(m, rbeta - static_eval) {
                    continue;
                }
                if self.board.make_move(m) {
                    let score = -self.alpha_beta(
                        &mut scratch,
                        -rbeta,
                        -rbeta + 1,
                        depth - self.params.probcut_reduction,
                    );
                    self.board.unmake_move();
                    if score >= rbeta {
                        return score;
                    }
                }
            }
        }

        // internal iterative deepening to find a move worth trying first
        if pv_node && hash_move_code == 0 && depth >= self.params.iid_min_depth {
            let mut scratch = PVariation::default();
            self.alpha_beta(&mut scratch, alpha, beta, depth - self.params.iid_reduction);
            hash_move_code = self.tt.probe_move(newhash);
        }

        let counter = self
            .board
            .conthist_index(0)
            .and_then(|(piece, to)| self.td.counter_moves.get(piece, to));

        self.td.killers[height + 1] = [None; 2];

        let hash_move = self.board.short_move_to_full(hash_move_code);
        let mut selector = MoveSelector::new(hash_move, self.td.killers[height], counter);

        let mut legal = 0i32;
        let mut quiets_tried: ArrayVec<Move, MAX_POSITION_MOVES> = ArrayVec::new();
        let mut best_score = NO_SCORE;
        let mut best_move: Option<Move> = None;
        let mut eval_type = Bound::Alpha;
        let mut l_pv = PVariation::default();

        while let Some(m) = selector.next(&self.board, self.td) {
            if exclude != 0 && m.short() == exclude {
                continue;
            }
            let tactical = m.is_tactical();

            // late move pruning: past the move-count limit, quiets are out
            if depth < MAX_LMP_DEPTH
                && !tactical
                && best_score > NO_SCORE
                && quiets_tried.len() as i32 > self.params.lmp_limit(improving, depth)
            {
                selector.skip_remaining_quiets();
                continue;
            }

            let futility_prune = futility
                && !tactical
                && !in_check
                && alpha <= 900
                && !self.board.move_gives_check(m);
            if futility_prune {
                if legal > 0 {
                    continue;
                }
                if static_eval > best_score {
                    // the static eval stands in for the pruned moves
                    best_score = static_eval;
                }
            }

            // losing captures with badly negative SEE are not worth a search
            // at shallow depth
            if !in_check
                && depth < self.params.bad_see_prune_depth
                && best_score > NO_SCORE
                && selector.stage >= Stage::BadTactical
                && !self.board.see_ge(m, -self.params.bad_see_margin_mul * depth * depth)
            {
                continue;
            }

            let stats = self.get_history(m);
            let mut extend_move = 0;

            // singular extension: if every alternative fails a reduced
            // search below the hash score, the hash move is the position
            if hash_move_code != 0
                && m.short() == hash_move_code
                && depth > self.params.singular_min_depth
                && exclude == 0
            {
                // fresh probe with fresh locals; the node's cached values
                // stay intact
                let singular_probe = self.tt.probe(newhash, depth - 3, alpha, beta, height);
                if singular_probe.hit && singular_probe.score > alpha {
                    let s_beta = (singular_probe.score - self.params.singular_margin_mul * depth)
                        .max(-MATE_SCORE);
                    self.td.excluded[height] = hash_move_code;
                    let mut scratch = PVariation::default();
                    let reduced_score =
                        self.alpha_beta(&mut scratch, s_beta - 1, s_beta, depth / 2);
                    self.td.excluded[height] = 0;
                    if reduced_score < s_beta {
                        extend_move = 1;
                    } else if best_known >= beta && s_beta >= beta {
                        // multicut: two moves beat beta at reduced depth
                        return s_beta;
                    }
                }
            }

            let mut reduction = 0;
            if depth > 2 && !tactical {
                reduction = self.params.lmr_reduction(improving, depth, legal + 1);
                reduction -= stats / self.params.history_lmr_divisor;
                reduction -= i32::from(pv_node);
                reduction = reduction.clamp(0, depth);
            }

            let mut effective_depth = depth + extend_all - reduction + extend_move;

            // both continuation planes despising a quiet move is a cheap
            // reason to skip it near the leaves
            if !tactical && effective_depth < 4 {
                let plane0 = self.board.conthist_index(0);
                let plane1 = self.board.conthist_index(1);
                if let (Some(p0), Some(p1)) = (plane0, plane1) {
                    let v0 = self.td.cont_history.get(
                        ContinuationHistory::plane_index(p0.0, p0.1),
                        m.piece(),
                        m.to(),
                    );
                    let v1 = self.td.cont_history.get(
                        ContinuationHistory::plane_index(p1.0, p1.1),
                        m.piece(),
                        m.to(),
                    );
                    if v0 < 0 && v1 < 0 {
                        continue;
                    }
                }
            }

            if !self.board.make_move(m) {
                continue;
            }
            legal += 1;

            // futility still applies now that a legal move exists
            if futility_prune {
                self.board.unmake_move();
                continue;
            }

            let mut score;
            if eval_type != Bound::Exact {
                score = -self.alpha_beta(&mut l_pv, -beta, -alpha, effective_depth - 1);
                if reduction > 0 && score > alpha {
                    // the reduction was too optimistic
                    effective_depth += reduction;
                    score = -self.alpha_beta(&mut l_pv, -beta, -alpha, effective_depth - 1);
                }
            } else {
                score = -self.alpha_beta(&mut l_pv, -alpha - 1, -alpha, effective_depth - 1);
                if score > alpha && score < beta {
                    score = -self.alpha_beta(&mut l_pv, -beta, -alpha, effective_depth - 1);
                }
            }
            self.board.unmake_move();

            if self.stop_requested() {
                return beta;
            }

            if score > best_score {
                best_score = score;
                best_move = Some(m);
                if score >= beta {
                    if !tactical {
                        self.update_quiet_stats(m, &quiets_tried, depth);
                    }
                    if exclude == 0 {
                        self.tt.store(
                            newhash,
                            height,
                            score,
                            static_eval,
                            Bound::Beta,
                            effective_depth,
                            m.short(),
                        );
                    }
                    return score;
                }
                if score > alpha {
                    alpha = score;
                    eval_type = Bound::Exact;
                    pv.load_from(m, &l_pv);
                }
            }

            if !tactical {
                quiets_tried.push(m);
            }
        }

        if legal == 0 {
            if exclude != 0 {
                return alpha;
            }
            return if in_check { mated_in(height) } else { DRAW_SCORE };
        }

        if let Some(best) = best_move {
            if exclude == 0 {
                self.tt.store(
                    newhash,
                    height,
                    best_score,
                    static_eval,
                    eval_type,
                    depth,
                    best.short(),
                );
            }
        }
        best_score
    }

    /// The specialised top-of-tree search: maintains the root move list and
    /// the MultiPV table, and fails hard into the aspiration loop.
    #[allow(clippy::too_many_lines)]
    fn root_search(
        &mut self,
        root_pv: &mut PVariation,
        mut alpha: i32,
        beta: i32,
        depth: i32,
    ) -> i32 {
        let is_multipv = self.options.multipv > 1;
        let do_ponder = self.options.ponder;
        self.bump_node();
        root_pv.clear();

        let max_move_index = if is_multipv {
            self.options.multipv.min(self.td.root_moves.len())
        } else {
            1
        };
        let mut last_move_index = 0usize;
        if is_multipv {
            for i in 0..max_move_index {
                self.td.multipv_scores[i] = -INFINITY_SCORE;
                self.td.multipv_lines[i].clear();
            }
        }

        let mut hash_move_code = 0;
        let mut static_eval = NO_SCORE;
        if !is_multipv && !self.td.use_root_move_score {
            let probe = self.tt.probe(self.board.hashkey(), depth, alpha, beta, 0);
            hash_move_code = probe.mov;
            static_eval = probe.eval;
            if probe.hit && self.board.repetition_count() == 0 {
                // trust the table unless a repetition could skew the score
                if let Some(full) = self.board.short_move_to_full(probe.mov) {
                    if self.td.best_move != Some(full) {
                        self.td.best_move = Some(full);
                        if do_ponder {
                            self.td.ponder_move = None;
                        }
                    }
                    root_pv.load_from(full, &PVariation::EMPTY);
                    if probe.score > alpha {
                        self.td.multipv_scores[0] = probe.score;
                    }
                    return probe.score;
                }
            }
        }

        let extend_all = i32::from(self.board.in_check());

        if !self.td.tb_position {
            let killers = self.td.killers[0];
            let best_failing_low = self.td.best_failing_low;
            let stm = self.board.turn();
            for i in 0..self.td.root_moves.len() {
                let m = self.td.root_moves[i].mov;
                self.td.root_moves[i].value = if m.short() == hash_move_code && hash_move_code != 0
                {
                    PV_VALUE
                } else if best_failing_low == Some(m) {
                    KILLER2_VALUE - 1
                } else if killers[0] == Some(m) {
                    KILLER1_VALUE
                } else if killers[1] == Some(m) {
                    KILLER2_VALUE
                } else if let Some(victim) = m.captured() {
                    CAPTURE_VALUE
                        + MVV_LVA_SCORE[victim.piece_type().index()]
                            [m.piece().piece_type().index()]
                } else {
                    i32::from(self.td.main_history.get(stm, m.from(), m.to()))
                };
            }
        }

        if static_eval == NO_SCORE {
            static_eval = evaluate(&self.board);
        }
        self.td.evals[0] = static_eval;

        let mut quiets_tried: ArrayVec<Move, MAX_POSITION_MOVES> = ArrayVec::new();
        let mut best_score = NO_SCORE;
        let mut eval_type = Bound::Alpha;
        let mut l_pv = PVariation::default();
        let show_currmove = self.report && self.tm.elapsed_ms() > 3000;

        for i in 0..self.td.root_moves.len() {
            // selection sort: pick the most promising remaining root move
            let mut best_idx = i;
            for j in i + 1..self.td.root_moves.len() {
                if self.td.root_moves[j].value > self.td.root_moves[best_idx].value {
                    best_idx = j;
                }
            }
            self.td.root_moves.swap(i, best_idx);
            let m = self.td.root_moves[i].mov;

            let made = self.board.make_move(m);
            debug_assert!(made, "root moves are legal by construction");

            if show_currmove {
                println!(
                    "info depth {depth} currmove {m} currmovenumber {}",
                    i + 1
                );
            }

            let mut reduction = 0;
            if extend_all == 0 && depth > 2 && !m.is_tactical() {
                reduction = self.params.lmr_reduction(false, depth, i as i32 + 1);
            }

            let mut effective_depth;
            let mut score;
            if eval_type != Bound::Exact {
                effective_depth = depth + extend_all - reduction;
                score = -self.alpha_beta(&mut l_pv, -beta, -alpha, effective_depth - 1);
                if reduction > 0 && score > alpha {
                    effective_depth += reduction;
                    score = -self.alpha_beta(&mut l_pv, -beta, -alpha, effective_depth - 1);
                }
            } else {
                effective_depth = depth + extend_all;
                score = -self.alpha_beta(&mut l_pv, -alpha - 1, -alpha, effective_depth - 1);
                if score > alpha && score < beta {
                    score = -self.alpha_beta(&mut l_pv, -beta, -alpha, effective_depth - 1);
                }
            }
            self.board.unmake_move();

            if self.stop_requested() {
                return best_score;
            }

            if !m.is_tactical() {
                quiets_tried.push(m);
            }

            if (is_multipv && score <= self.td.multipv_scores[last_move_index])
                || (!is_multipv && score <= best_score)
            {
                continue;
            }

            best_score = score;
            self.td.best_failing_low = Some(m);

            if is_multipv && score > self.td.multipv_scores[last_move_index] {
                // bubble the new line into its slot in the sorted table
                let mut new_index = last_move_index;
                while new_index > 0 && score > self.td.multipv_scores[new_index - 1] {
                    self.td.multipv_scores[new_index] = self.td.multipv_scores[new_index - 1];
                    self.td.multipv_lines[new_index] =
                        self.td.multipv_lines[new_index - 1].clone();
                    new_index -= 1;
                }
                self.td.multipv_lines[new_index].load_from(m, &l_pv);
                self.td.multipv_scores[new_index] = score;
                if last_move_index < max_move_index - 1 {
                    last_move_index += 1;
                }
                // alpha only rises to the worst of the k best lines, so
                // every slot keeps getting searched for real
                if self.td.multipv_scores[max_move_index - 1] > alpha {
                    alpha = self.td.multipv_scores[max_move_index - 1];
                }
                eval_type = Bound::Exact;
            }

            if score > alpha {
                if !is_multipv {
                    root_pv.load_from(m, &l_pv);
                    if self.td.best_move != root_pv.first() {
                        self.td.best_move = root_pv.first();
                        if do_ponder {
                            self.td.ponder_move = root_pv.moves().get(1).copied();
                        }
                    } else if do_ponder && root_pv.moves().len() > 1 {
                        self.td.ponder_move = root_pv.moves().get(1).copied();
                    }
                    alpha = score;
                    self.td.multipv_scores[0] = score;
                    eval_type = Bound::Exact;
                }
                if score >= beta {
                    if !m.is_tactical() {
                        // at the root the continuation planes have no
                        // context, so only the butterfly table learns
                        let stm = self.board.turn();
                        update_history(
                            self.td.main_history.get_mut(stm, m.from(), m.to()),
                            depth * depth,
                        );
                        for &quiet in
                            quiets_tried.iter().take(quiets_tried.len().saturating_sub(1))
                        {
                            update_history(
                                self.td.main_history.get_mut(stm, quiet.from(), quiet.to()),
                                -(depth * depth),
                            );
                        }
                        self.td.insert_killer(0, m);
                    }
                    self.tt.store(
                        self.board.hashkey(),
                        0,
                        beta,
                        static_eval,
                        Bound::Beta,
                        effective_depth,
                        m.short(),
                    );
                    // fail hard at the root; the aspiration loop reopens
                    return beta;
                }
            } else if !is_multipv && self.td.best_move.is_none() {
                // never leave the root without some move to play
                self.td.best_move = Some(m);
            }
        }

        if is_multipv {
            if eval_type == Bound::Exact {
                return self.td.multipv_scores[max_move_index - 1];
            }
            return alpha;
        }
        self.tt.store(
            self.board.hashkey(),
            0,
            alpha,
            static_eval,
            eval_type,
            depth,
            self.td.best_move.map_or(0, Move::short),
        );
        alpha
    }

    /// One worker's iterative-deepening loop with aspiration windows and
    /// lazy-SMP depth skipping.
    pub fn iterative_deepening(&mut self) {
        let is_multipv = self.options.multipv > 1;
        let do_ponder = self.options.ponder;
        let max_depth = self.tm.max_depth().unwrap_or(MAX_DEPTH).clamp(1, MAX_DEPTH);
        self.report = self.td.thread_id == 0;

        self.td.depth = if self.tm.limits.mate.is_some() { max_depth } else { 1 };
        let mut alpha = -INFINITY_SCORE;
        let mut beta = INFINITY_SCORE;
        let mut delta_alpha = self.params.aspiration_delta;
        let mut delta_beta = self.params.aspiration_delta;
        let mut last_best_move: Option<Move> = None;
        let mut constant_root_moves = 0i32;
        let mut reported_this_depth = false;
        let mut root_pv = PVariation::default();

        loop {
            let mut in_window = 1;
            self.td.seldepth = self.td.depth;
            let score;
            if self.td.root_moves.is_empty() {
                // mate or stalemate at the root
                self.td.best_move = None;
                score = if self.board.in_check() { -MATE_SCORE } else { DRAW_SCORE };
                self.td.multipv_scores[0] = score;
                self.shared.raise_stop(StopLevel::Stopped);
            } else if self.board.repetition_count() >= 2 || self.board.halfmove_clock() >= 100 {
                self.td.best_move = None;
                if do_ponder {
                    self.td.ponder_move = None;
                }
                score = DRAW_SCORE;
                self.td.multipv_scores[0] = score;
                self.shared.raise_stop(StopLevel::Stopped);
            } else {
                score = self.root_search(&mut root_pv, alpha, beta, self.td.depth);

                if score == alpha {
                    // fail low: drop alpha, and pull beta in to keep the
                    // re-search cheap
                    beta = (alpha + beta) / 2;
                    alpha = (alpha - delta_alpha).max(-INFINITY_SCORE);
                    delta_alpha += delta_alpha / 4 + 2;
                    if alpha.abs() > 1000 {
                        delta_alpha = i32::from(i16::MAX) * 2;
                    }
                    in_window = 0;
                    reported_this_depth = false;
                } else if score == beta {
                    beta = (beta + delta_beta).min(INFINITY_SCORE);
                    delta_beta += delta_beta / 4 + 2;
                    if beta.abs() > 1000 {
                        delta_beta = i32::from(i16::MAX) * 2;
                    }
                    in_window = 2;
                    reported_this_depth = false;
                } else {
                    self.td.last_complete_depth = self.td.depth;
                    if self.td.depth > self.params.aspiration_min_depth {
                        delta_alpha = self.params.aspiration_delta;
                        delta_beta = self.params.aspiration_delta;
                        alpha = if is_multipv {
                            self.td.multipv_scores
                                [self.options.multipv.min(self.td.root_moves.len()) - 1]
                                - delta_alpha
                        } else {
                            score - delta_alpha
                        };
                        beta = score + delta_beta;
                    }
                }
            }

            // keep the longest PV that is still consistent with the latest
            if !root_pv.moves().is_empty()
                && !self.td.last_pv.moves().starts_with(root_pv.moves())
            {
                self.td.last_pv = root_pv.clone();
            }

            if score > NO_SCORE && self.report {
                if is_multipv {
                    if in_window == 1 {
                        let count = self.options.multipv.min(self.td.root_moves.len());
                        for index in 0..count {
                            self.uci_report(index, in_window);
                        }
                    }
                } else {
                    if self.td.best_move.is_none() {
                        // alpha-beta hit the table or a tablebase at the
                        // root; recover the move from there
                        self.td.best_move = self
                            .board
                            .short_move_to_full(self.tt.probe_move(self.board.hashkey()));
                        if do_ponder {
                            self.td.ponder_move = None;
                        }
                    }
                    if self.td.best_move.is_none() {
                        self.td.best_move = self.td.root_moves.first().map(|rm| rm.mov);
                    }
                    if self.td.root_moves.len() == 1
                        && !self.td.tb_position
                        && self.tm.is_timed()
                        && !self.shared.is_pondering()
                        && self.td.last_best_root_score != NO_SCORE
                    {
                        // an instamove's shallow score would be noise;
                        // report the previous search's instead
                        self.td.multipv_scores[0] = self.td.last_best_root_score;
                    }
                    if self.td.use_root_move_score {
                        self.td.multipv_scores[0] = self.td.root_moves[0].value;
                    }
                    self.uci_report(0, in_window);
                }
            }

            if in_window == 1 {
                // de-synchronise the helper threads across depths
                let cycle = self.td.thread_id % 16;
                if self.td.thread_id != 0
                    && (self.td.depth + cycle as i32) % SKIP_DEPTHS[cycle] == 0
                {
                    self.td.depth += SKIP_SIZE[cycle];
                }
                self.td.depth += 1;
                if do_ponder && self.shared.is_pondering() && self.td.depth > max_depth {
                    // hold at the target depth while pondering
                    self.td.depth -= 1;
                }
                reported_this_depth = true;
                constant_root_moves += 1;
            }

            if last_best_move != self.td.best_move {
                last_best_move = self.td.best_move;
                constant_root_moves = 0;
            }

            if self.td.thread_id == 0 && (in_window == 1 || constant_root_moves == 0) {
                self.tm.reset_deadlines(constant_root_moves, true);
            }

            let stop = self.shared.stop_level();
            // a forced move needs no deliberation
            let mut exit = self.td.root_moves.len() == 1
                && self.tm.is_timed()
                && !self.shared.is_pondering();
            // a tablebase-decided root is not going to change its mind
            exit = exit
                || (self.td.tb_position
                    && score.abs() >= TB_WIN_SCORE - 100
                    && !self.shared.is_pondering());
            exit = exit || (stop >= StopLevel::WantStop && in_window == 1);
            exit = exit || stop >= StopLevel::StopImmediately;
            exit = exit || self.td.depth > max_depth;
            if exit {
                break;
            }
        }

        if self.report && !reported_this_depth && self.td.best_move.is_some() {
            self.uci_report(0, 1);
        }
        self.shared.publish_nodes(self.td.thread_id, self.td.nodes);
    }

    /// Prints one `info` line, bit-exact to the wire format GUIs parse.
    fn uci_report(&mut self, mpv_index: usize, in_window: i32) {
        let elapsed = self.tm.elapsed_ms();
        if in_window != 1 && elapsed.saturating_sub(self.last_report_ms) < 200 {
            return;
        }
        self.last_report_ms = elapsed;
        self.shared.publish_nodes(self.td.thread_id, self.td.nodes);

        let score = self.td.multipv_scores[mpv_index];
        let bound = match in_window {
            0 => " upperbound",
            2 => " lowerbound",
            _ => "",
        };
        let score_text = if is_mate_score(score) {
            let mate_in = if score > 0 {
                (MATE_SCORE - score + 1) / 2
            } else {
                (-MATE_SCORE - score) / 2
            };
            format!("mate {mate_in}")
        } else {
            format!("cp {score}")
        };
        let nodes = self.shared.total_nodes();
        let nps = if elapsed > 0 { nodes * 1000 / elapsed } else { nodes };
        let pv = if mpv_index == 0 && self.options.multipv == 1 {
            self.td.last_pv.to_string()
        } else {
            self.td.multipv_lines[mpv_index].to_string()
        };
        println!(
            "info depth {} seldepth {} multipv {} time {} score {}{} nodes {} nps {} tbhits {} hashfull {} pv {}",
            self.td.depth,
            self.td.seldepth,
            mpv_index + 1,
            elapsed,
            score_text,
            bound,
            nodes,
            nps,
            self.shared.total_tbhits(),
            self.tt.used_permill(),
            pv,
        );
    }
}

/// Seeds the root move list: every legal move, optionally filtered by
/// `searchmoves`.
pub fn seed_root_moves(board: &mut Board, searchmoves: &[Move]) -> Vec<crate::threadlocal::RootMove> {
    let mut list = MoveList::new();
    board.generate_all(&mut list);
    let mut out = Vec::new();
    for i in 0..list.len() {
        let m = list[i].mov;
        if !searchmoves.is_empty() && !searchmoves.contains(&m) {
            continue;
        }
        if board.make_move(m) {
            board.unmake_move();
            out.push(crate::threadlocal::RootMove { mov: m, value: 0 });
        }
    }
    out
}
