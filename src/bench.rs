//! Fixed-depth benchmark over a small FEN suite; the node counts double as
//! a regression fingerprint for the search.

use std::time::Instant;

use crate::{threadpool::Engine, timemgmt::SearchLimits};

pub const BENCH_DEPTH: i32 = 10;

static BENCH_FENS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r1bq1rk1/pp2ppbp/2np1np1/8/3NP3/2N1BP2/PPPQ2PP/R3KB1R w KQ - 4 9",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "2kr3r/ppp1qppp/2n1bn2/2b1p3/4P3/2NPBN2/PPP1BPPP/R2QK2R w KQ - 5 8",
    "8/5pk1/6p1/4p2p/4P2P/3R2P1/r4PK1/8 w - - 0 40",
    "6k1/5p2/6p1/8/7p/8/6PP/6K1 b - - 0 1",
    "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
    "7k/5Q2/6K1/8/8/8/8/8 w - - 0 1",
    "r2q1rk1/ppp2ppp/3bbn2/3p4/8/1P1P2P1/PBPN1PBP/R2Q1RK1 b - - 3 11",
];

pub fn run(depth: i32, threads: usize) {
    let mut engine = Engine::new();
    engine.set_thread_count(threads);
    let depth = if depth > 0 { depth } else { BENCH_DEPTH };

    let mut total_nodes = 0u64;
    let start = Instant::now();
    for (i, fen) in BENCH_FENS.iter().enumerate() {
        engine.new_game();
        engine.board.set_from_fen(fen).expect("bench FEN is valid");
        let limits = SearchLimits { depth: Some(depth), ..Default::default() };
        let report = engine.search(limits, None);
        println!("position {:>2}: {:>10} nodes, best {}", i + 1, report.nodes, report
            .best_move
            .map_or_else(|| "0000".to_string(), |m| m.to_string()));
        total_nodes += report.nodes;
    }
    let millis = start.elapsed().as_millis().max(1) as u64;
    println!("{total_nodes} nodes {} nps", total_nodes * 1000 / millis);
}
