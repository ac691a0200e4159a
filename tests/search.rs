//! End-to-end search scenarios, driven through the engine front door the
//! way a UCI session would.

use rubicon::{
    chess::board::movegen::MoveList,
    evaluation::{DRAW_SCORE, MATE_SCORE},
    threadpool::Engine,
    timemgmt::SearchLimits,
};

fn depth_limits(depth: i32) -> SearchLimits {
    SearchLimits { depth: Some(depth), ..Default::default() }
}

fn set_position(engine: &mut Engine, fen: &str) {
    engine.board.set_from_fen(fen).expect("test FEN is valid");
}

#[test]
fn finds_mate_in_one() {
    let mut engine = Engine::new();
    set_position(&mut engine, "7k/6Q1/6K1/8/8/8/8/8 w - - 0 1");
    let report = engine.search(depth_limits(4), None);
    assert_eq!(report.score, MATE_SCORE - 1, "mate in one half-move");

    // the chosen move must actually deliver the mate
    let m = report.best_move.expect("a mating move exists");
    assert!(engine.board.make_move(m));
    assert!(engine.board.in_check());
    assert!(!engine.board.has_legal_moves());
}

#[test]
fn startpos_sanity() {
    let mut engine = Engine::new();
    engine.board.set_startpos();
    let report = engine.search(depth_limits(6), None);
    assert!(report.best_move.is_some());
    assert!(report.score.abs() < 80, "startpos is near-balanced, got {}", report.score);
    assert!(report.pv.len() >= 2, "pv too short: {:?}", report.pv);
    assert!(report.nodes > 1000, "only {} nodes searched", report.nodes);
}

#[test]
fn stalemate_is_draw() {
    let mut engine = Engine::new();
    set_position(&mut engine, "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
    let report = engine.search(depth_limits(5), None);
    assert_eq!(report.score, DRAW_SCORE);
    assert_eq!(report.best_move, None, "no legal move in stalemate");
}

#[test]
fn fifty_move_rule_is_draw() {
    let mut engine = Engine::new();
    set_position(&mut engine, "r3k3/8/8/8/8/8/8/R3K3 w - - 100 80");
    let report = engine.search(depth_limits(5), None);
    assert_eq!(report.score, DRAW_SCORE);
}

#[test]
fn shuffled_repetition_is_draw() {
    let mut engine = Engine::new();
    engine.board.set_startpos();
    for text in [
        "g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8",
    ] {
        let m = engine.board.parse_uci(text).unwrap();
        assert!(engine.board.make_move(m));
    }
    engine.board.zero_height();
    let report = engine.search(depth_limits(4), None);
    assert_eq!(report.score, DRAW_SCORE);
    assert!(report.best_move.is_some(), "a legal default move is still reported");
}

#[test]
fn single_thread_node_counts_are_deterministic() {
    let fen = "r1bq1rk1/pp2ppbp/2np1np1/8/3NP3/2N1BP2/PPPQ2PP/R3KB1R w KQ - 4 9";
    let mut nodes = Vec::new();
    for _ in 0..2 {
        let mut engine = Engine::new();
        set_position(&mut engine, fen);
        let report = engine.search(depth_limits(5), None);
        nodes.push(report.nodes);
    }
    assert_eq!(nodes[0], nodes[1], "same search, same tree");
}

#[test]
fn warm_table_reproduces_the_score() {
    let mut engine = Engine::new();
    engine.board.set_startpos();
    let first = engine.search(depth_limits(6), None);
    let second = engine.search(depth_limits(6), None);
    assert_eq!(first.score, second.score);
    assert_eq!(first.best_move, second.best_move);
}

#[test]
fn multi_thread_result_is_playable() {
    let mut engine = Engine::new();
    engine.set_thread_count(2);
    set_position(
        &mut engine,
        "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    );
    let report = engine.search(depth_limits(6), None);
    let m = report.best_move.expect("search must produce a move");

    let mut legal = MoveList::new();
    let mut board = engine.board.clone();
    board.generate_all(&mut legal);
    let playable = legal.iter_moves().any(|lm| lm == m) && board.make_move(m);
    assert!(playable, "bestmove {m} is not legal here");
    assert!(report.score.abs() < MATE_SCORE, "score {} out of range", report.score);
}

#[test]
fn multipv_reports_distinct_descending_lines() {
    let mut engine = Engine::new();
    engine.options.multipv = 3;
    set_position(
        &mut engine,
        "r2q1rk1/ppp2ppp/3bbn2/3p4/8/1P1P2P1/PBPN1PBP/R2Q1RK1 b - - 3 11",
    );
    let report = engine.search(depth_limits(5), None);
    assert_eq!(report.multipv.len(), 3);

    let first_moves: Vec<_> = report
        .multipv
        .iter()
        .map(|(_, line)| line.first().copied().expect("each line has a move"))
        .collect();
    for i in 0..first_moves.len() {
        for j in i + 1..first_moves.len() {
            assert_ne!(first_moves[i], first_moves[j], "multipv lines must differ");
        }
    }
    for pair in report.multipv.windows(2) {
        assert!(pair[0].0 >= pair[1].0, "multipv scores must descend");
    }
}

#[test]
fn movetime_search_terminates() {
    let mut engine = Engine::new();
    engine.board.set_startpos();
    let limits = SearchLimits { movetime: Some(100), ..Default::default() };
    let report = engine.search(limits, None);
    assert!(report.best_move.is_some());
}

#[test]
fn node_limit_is_respected_loosely() {
    let mut engine = Engine::new();
    engine.board.set_startpos();
    let limits = SearchLimits { nodes: Some(20_000), ..Default::default() };
    let report = engine.search(limits, None);
    assert!(report.best_move.is_some());
    // the guide polls every 10ms, so allow generous overshoot
    assert!(report.nodes < 20_000_000, "node limit had no effect: {}", report.nodes);
}
