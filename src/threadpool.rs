//! Engine state and the search guide: spawns the workers, watches the
//! clock and the stop conditions at a 10 ms cadence, and collects the best
//! answer across threads when they come to rest.

use std::{sync::mpsc, time::Duration};

use crate::{
    chess::{board::Board, chessmove::Move},
    search::{seed_root_moves, SearchContext, SearchReport},
    search::parameters::SearchParams,
    searchinfo::{EngineOptions, SharedSearchState, StopLevel},
    threadlocal::ThreadData,
    timemgmt::{SearchLimits, TimeManager},
    transpositiontable::TransTable,
};

const GUIDE_POLL: Duration = Duration::from_millis(10);

pub struct Engine {
    pub board: Board,
    pub tt: TransTable,
    pub params: SearchParams,
    pub options: EngineOptions,
    pub thread_data: Vec<ThreadData>,
    /// Set when a `quit` arrives mid-search.
    pub quit: bool,
    /// Commands that arrived mid-search and still need handling.
    pub pending_commands: Vec<String>,
}

impl Engine {
    pub fn new() -> Self {
        let options = EngineOptions::default();
        let mut tt = TransTable::new();
        tt.resize(options.hash_mb);
        Self {
            board: Board::default(),
            tt,
            params: SearchParams::new(),
            options,
            thread_data: vec![ThreadData::new(0)],
            quit: false,
            pending_commands: Vec::new(),
        }
    }

    pub fn set_thread_count(&mut self, threads: usize) {
        self.options.threads = threads.max(1);
        let threads = self.options.threads;
        while self.thread_data.len() < threads {
            self.thread_data.push(ThreadData::new(self.thread_data.len()));
        }
        self.thread_data.truncate(threads);
    }

    pub fn resize_hash(&mut self, megabytes: usize) {
        self.options.hash_mb = megabytes.max(1);
        self.tt.resize(self.options.hash_mb);
    }

    pub fn new_game(&mut self) {
        self.board.set_startpos();
        self.tt.clear(self.options.threads);
        for td in &mut self.thread_data {
            td.clear_for_new_game();
        }
    }

    /// Runs a full search: spawn workers, guide them, join them, pick the
    /// best answer, and announce it. Blocks until the search is over; the
    /// stdin receiver keeps `stop`/`ponderhit`/`quit` live meanwhile.
    pub fn search(
        &mut self,
        limits: SearchLimits,
        stdin_rx: Option<&mpsc::Receiver<String>>,
    ) -> SearchReport {
        let threads = self.options.threads.max(1);
        self.set_thread_count(threads);
        self.tt.next_search();

        let shared = SharedSearchState::new(threads, limits.ponder);
        let max_nodes = limits.nodes;
        let tm = TimeManager::new(
            limits,
            self.board.turn(),
            self.options.move_overhead,
            threads,
            self.board.phase(),
        );

        self.board.zero_height();
        let root_moves = seed_root_moves(&mut self.board, &tm.limits.searchmoves);
        let multipv = self.options.multipv;
        for td in &mut self.thread_data {
            td.new_search(multipv);
            td.root_moves = root_moves.clone();
        }

        let board = &self.board;
        let tt = &self.tt;
        let params = &self.params;
        let options = &self.options;
        let shared_ref = &shared;
        let tm_ref = &tm;
        let mut quit = false;
        let mut pending = Vec::new();

        std::thread::scope(|s| {
            let mut handles = Vec::new();
            for td in &mut self.thread_data {
                let worker_board = board.clone();
                handles.push(s.spawn(move || {
                    let mut ctx = SearchContext::new(
                        worker_board,
                        td,
                        tt,
                        params,
                        shared_ref,
                        tm_ref,
                        options,
                    );
                    ctx.iterative_deepening();
                }));
            }

            loop {
                if handles.iter().all(|handle| handle.is_finished()) {
                    break;
                }
                if let Some(rx) = stdin_rx {
                    while let Ok(line) = rx.try_recv() {
                        match line.trim() {
                            "stop" => shared_ref.raise_stop(StopLevel::StopImmediately),
                            "ponderhit" => shared_ref.ponderhit(),
                            "isready" => println!("readyok"),
                            "quit" => {
                                quit = true;
                                shared_ref.raise_stop(StopLevel::StopImmediately);
                            }
                            other => pending.push(other.to_string()),
                        }
                    }
                }
                if shared_ref.is_pondering() {
                    // thinking on the opponent's time; deadlines do not
                    // apply until the ponderhit converts the search
                    std::thread::sleep(GUIDE_POLL);
                    continue;
                }
                if shared_ref.take_ponderhit() {
                    tm_ref.restart_after_ponderhit();
                } else if tm_ref.hard_deadline_passed() {
                    shared_ref.raise_stop(StopLevel::StopImmediately);
                } else if max_nodes.is_some_and(|limit| shared_ref.total_nodes() >= limit) {
                    shared_ref.raise_stop(StopLevel::StopImmediately);
                } else if tm_ref.soft_deadline_passed() {
                    shared_ref.raise_stop(StopLevel::StopSoon);
                }
                std::thread::sleep(GUIDE_POLL);
            }

            shared_ref.raise_stop(StopLevel::StopImmediately);
            for handle in handles {
                handle.join().expect("search worker panicked");
            }
        });
        shared.raise_stop(StopLevel::Stopped);

        self.quit = self.quit || quit;
        self.pending_commands.extend(pending);

        // select the best score among the threads that reached the highest
        // completed depth
        let top_depth = self
            .thread_data
            .iter()
            .map(|td| td.last_complete_depth)
            .max()
            .unwrap_or(0);
        let mut best = 0;
        for i in 0..self.thread_data.len() {
            let contender = &self.thread_data[i];
            if contender.last_complete_depth == top_depth
                && (self.thread_data[best].last_complete_depth < top_depth
                    || contender.multipv_scores[0] > self.thread_data[best].multipv_scores[0])
            {
                best = i;
            }
        }

        if best != 0 {
            // a helper thread outsearched the main one: adopt and re-report
            let (main, rest) = self.thread_data.split_at_mut(1);
            let winner = &rest[best - 1];
            main[0].best_move = winner.best_move;
            main[0].ponder_move = winner.ponder_move;
            main[0].multipv_scores[0] = winner.multipv_scores[0];
            main[0].last_pv = winner.last_pv.clone();
            main[0].last_complete_depth = winner.last_complete_depth;
            self.print_adopted_info(&shared, &tm, best);
        }

        let td0 = &self.thread_data[0];
        let mut best_move = td0.best_move;
        let mut ponder_move = td0.ponder_move;
        if best_move.is_none() {
            best_move = td0.root_moves.first().map(|rm| rm.mov);
        }

        if self.options.ponder && ponder_move.is_none() {
            if let Some(bm) = best_move {
                // dig the reply out of the table
                if self.board.make_move(bm) {
                    ponder_move =
                        self.board.short_move_to_full(self.tt.probe_move(self.board.hashkey()));
                    self.board.unmake_move();
                }
            }
        }

        match (best_move, self.options.ponder.then_some(ponder_move).flatten()) {
            (Some(bm), Some(pm)) => println!("bestmove {bm} ponder {pm}"),
            (Some(bm), None) => println!("bestmove {bm}"),
            (None, _) => println!("bestmove 0000"),
        }

        let score = self.thread_data[0].multipv_scores[0];
        for td in &mut self.thread_data {
            td.last_best_root_score = score;
        }

        let td0 = &self.thread_data[0];
        SearchReport {
            best_move,
            ponder_move,
            score,
            depth: td0.last_complete_depth,
            pv: td0.last_pv.moves().to_vec(),
            multipv: td0
                .multipv_scores
                .iter()
                .zip(&td0.multipv_lines)
                .map(|(&s, line)| (s, line.moves().to_vec()))
                .collect(),
            nodes: shared.total_nodes(),
        }
    }

    fn print_adopted_info(&self, shared: &SharedSearchState, tm: &TimeManager, winner: usize) {
        let td = &self.thread_data[winner];
        let elapsed = tm.elapsed_ms();
        let nodes = shared.total_nodes();
        let nps = if elapsed > 0 { nodes * 1000 / elapsed } else { nodes };
        let score = td.multipv_scores[0];
        let score_text = if crate::evaluation::is_mate_score(score) {
            let mate_in = if score > 0 {
                (crate::evaluation::MATE_SCORE - score + 1) / 2
            } else {
                (-crate::evaluation::MATE_SCORE - score) / 2
            };
            format!("mate {mate_in}")
        } else {
            format!("cp {score}")
        };
        println!(
            "info depth {} seldepth {} multipv 1 time {} score {} nodes {} nps {} tbhits {} hashfull {} pv {}",
            td.last_complete_depth,
            td.seldepth,
            elapsed,
            score_text,
            nodes,
            nps,
            shared.total_tbhits(),
            self.tt.used_permill(),
            td.last_pv,
        );
    }

    /// The move the engine would play instantly, used when the search ends
    /// before producing anything.
    pub fn first_legal_move(&mut self) -> Option<Move> {
        let moves = seed_root_moves(&mut self.board, &[]);
        moves.first().map(|rm| rm.mov)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
