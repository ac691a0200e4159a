//! The UCI front end: command parsing, option plumbing, and the main loop.
//! Search output lives with the search; this module owns everything the GUI
//! says to us.

use std::{
    collections::VecDeque,
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
};

use crate::{
    bench,
    errors::UciError,
    evaluation::evaluate,
    perft,
    tablebases,
    threadpool::Engine,
    timemgmt::SearchLimits,
    NAME, VERSION,
};

static KEEP_RUNNING: AtomicBool = AtomicBool::new(true);

/// Forwards stdin lines over a channel so the search guide can see `stop`
/// and `ponderhit` while the main loop is blocked inside a search.
fn stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            let mut buffer = String::with_capacity(128);
            while KEEP_RUNNING.load(Ordering::SeqCst) {
                buffer.clear();
                match stdin.read_line(&mut buffer) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let command = buffer.trim();
                if command.is_empty() {
                    continue;
                }
                if tx.send(command.to_owned()).is_err() {
                    break;
                }
            }
        })
        .expect("couldn't start the stdin reader thread");
    rx
}

fn print_uci_response(engine: &Engine) {
    println!("id name {NAME} {VERSION}");
    println!("id author the Rubicon developers");
    println!(
        "option name Hash type spin default {} min 1 max 65536",
        engine.options.hash_mb
    );
    println!("option name Threads type spin default 1 min 1 max 256");
    println!("option name MultiPV type spin default 1 min 1 max 64");
    println!("option name Ponder type check default false");
    println!("option name MoveOverhead type spin default 10 min 0 max 5000");
    println!("option name SyzygyPath type string default <empty>");
    println!("option name SyzygyProbeLimit type spin default 7 min 0 max 7");
    println!("option name Syzygy50MoveRule type check default true");
    println!("uciok");
}

// position fen <fen> [moves ...] | position startpos [moves ...]
fn parse_position(text: &str, engine: &mut Engine) -> Result<(), UciError> {
    let mut parts = text.split_ascii_whitespace();
    parts.next();
    let determiner = parts
        .next()
        .ok_or_else(|| UciError::UnexpectedTermination("nothing after \"position\"".into()))?;
    match determiner {
        "startpos" => {
            engine.board.set_startpos();
            match parts.next() {
                Some("moves") | None => {}
                Some(other) => {
                    return Err(UciError::InvalidFormat(format!(
                        "expected \"moves\" after \"startpos\", got \"{other}\""
                    )))
                }
            }
        }
        "fen" => {
            let mut fen = String::new();
            for part in parts.by_ref() {
                if part == "moves" {
                    break;
                }
                fen.push_str(part);
                fen.push(' ');
            }
            engine.board.set_from_fen(&fen)?;
        }
        other => {
            return Err(UciError::InvalidFormat(format!(
                "unknown term after \"position\": {other}"
            )))
        }
    }
    for token in parts {
        let m = engine.board.parse_uci(token)?;
        if !engine.board.make_move(m) {
            return Err(UciError::InvalidFormat(format!("illegal move {token}")));
        }
    }
    engine.board.zero_height();
    Ok(())
}

fn parse_number<T>(name: &str, token: Option<&str>) -> Result<T, UciError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let token =
        token.ok_or_else(|| UciError::InvalidFormat(format!("missing value after \"{name}\"")))?;
    token
        .parse()
        .map_err(|e| UciError::InvalidFormat(format!("bad value for {name}: {e}")))
}

fn clock_parse(name: &str, token: Option<&str>) -> Result<u64, UciError> {
    // some GUIs report a clock that has already gone negative
    let raw: i64 = parse_number(name, token)?;
    Ok(raw.max(0) as u64)
}

fn parse_go(text: &str, engine: &Engine) -> Result<SearchLimits, UciError> {
    let mut limits = SearchLimits::default();
    let mut parts = text.split_ascii_whitespace().peekable();
    let command = parts
        .next()
        .ok_or_else(|| UciError::UnexpectedTermination("no command in parse_go".into()))?;
    if command != "go" {
        return Err(UciError::InvalidFormat("expected \"go\"".into()));
    }

    while let Some(part) = parts.next() {
        match part {
            "wtime" => limits.wtime = Some(clock_parse("wtime", parts.next())?),
            "btime" => limits.btime = Some(clock_parse("btime", parts.next())?),
            "winc" => limits.winc = clock_parse("winc", parts.next())?,
            "binc" => limits.binc = clock_parse("binc", parts.next())?,
            "movestogo" => limits.movestogo = Some(parse_number("movestogo", parts.next())?),
            "movetime" => limits.movetime = Some(clock_parse("movetime", parts.next())?),
            "depth" => limits.depth = Some(parse_number("depth", parts.next())?),
            "nodes" => limits.nodes = Some(parse_number("nodes", parts.next())?),
            "mate" => limits.mate = Some(parse_number("mate", parts.next())?),
            "infinite" => limits.infinite = true,
            "ponder" => limits.ponder = true,
            "searchmoves" => {
                while let Some(&token) = parts.peek() {
                    match engine.board.parse_uci(token) {
                        Ok(m) => {
                            limits.searchmoves.push(m);
                            parts.next();
                        }
                        Err(_) => break,
                    }
                }
            }
            // unknown search modifiers are ignored, like everyone ignores
            // them
            _ => {}
        }
    }
    Ok(limits)
}

fn parse_setoption(text: &str, engine: &mut Engine) -> Result<(), UciError> {
    let mut parts = text.split_ascii_whitespace();
    parts.next();
    match parts.next() {
        Some("name") => {}
        _ => return Err(UciError::ParseOption("expected \"name\" after setoption".into())),
    }
    let mut name = String::new();
    let mut value = String::new();
    let mut in_value = false;
    for part in parts {
        if part == "value" && !in_value {
            in_value = true;
            continue;
        }
        let target = if in_value { &mut value } else { &mut name };
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(part);
    }
    if name.is_empty() {
        return Err(UciError::ParseOption("no option name given".into()));
    }

    match name.as_str() {
        "Hash" => {
            let mb: usize = value
                .parse()
                .map_err(|_| UciError::ParseOption(format!("bad Hash value \"{value}\"")))?;
            engine.resize_hash(mb.clamp(1, 65536));
        }
        "Threads" => {
            let threads: usize = value
                .parse()
                .map_err(|_| UciError::ParseOption(format!("bad Threads value \"{value}\"")))?;
            engine.set_thread_count(threads.clamp(1, 256));
        }
        "MultiPV" => {
            let k: usize = value
                .parse()
                .map_err(|_| UciError::ParseOption(format!("bad MultiPV value \"{value}\"")))?;
            engine.options.multipv = k.clamp(1, 64);
        }
        "Ponder" => {
            engine.options.ponder = value.eq_ignore_ascii_case("true");
        }
        "MoveOverhead" => {
            let ms: u64 = value
                .parse()
                .map_err(|_| UciError::ParseOption(format!("bad MoveOverhead value \"{value}\"")))?;
            engine.options.move_overhead = ms.min(5000);
        }
        "SyzygyPath" => {
            if !value.is_empty() && value != "<empty>" {
                tablebases::init(&value);
                engine.options.syzygy_path = Some(value);
            }
        }
        "SyzygyProbeLimit" => {
            let limit: u32 = value.parse().map_err(|_| {
                UciError::ParseOption(format!("bad SyzygyProbeLimit value \"{value}\""))
            })?;
            engine.options.syzygy_probe_limit = limit.min(7);
        }
        "Syzygy50MoveRule" => {
            engine.options.syzygy_50_move_rule = value.eq_ignore_ascii_case("true");
        }
        other => eprintln!("info string ignoring unknown option {other}"),
    }
    Ok(())
}

pub fn main_loop() -> anyhow::Result<()> {
    let mut engine = Engine::new();
    print_uci_response(&engine);

    let stdin = stdin_reader();
    let mut queue: VecDeque<String> = VecDeque::new();

    loop {
        std::io::stdout().flush()?;
        let line = match queue.pop_front() {
            Some(line) => line,
            None => match stdin.recv() {
                Ok(line) => line,
                Err(_) => break,
            },
        };
        let input = line.trim();

        let res = match input {
            "uci" => {
                print_uci_response(&engine);
                Ok(())
            }
            "isready" => {
                println!("readyok");
                Ok(())
            }
            "ucinewgame" => {
                engine.new_game();
                Ok(())
            }
            "quit" => break,
            // only meaningful while a search is running; harmless here
            "stop" | "ponderhit" => Ok(()),
            "d" => {
                print!("{}", engine.board);
                Ok(())
            }
            "eval" => {
                println!("{}", evaluate(&engine.board));
                Ok(())
            }
            "bench" => {
                bench::run(0, 1);
                Ok(())
            }
            "perft" => {
                perft::gamut();
                Ok(())
            }
            input if input.starts_with("perft ") => {
                match parse_number::<u32>("perft", input.split_ascii_whitespace().nth(1)) {
                    Ok(depth) => {
                        let mut board = engine.board.clone();
                        let start = std::time::Instant::now();
                        let nodes = perft::perft(&mut board, depth);
                        println!(
                            "perft({depth}) = {nodes} in {} ms",
                            start.elapsed().as_millis()
                        );
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            input if input.starts_with("setoption") => parse_setoption(input, &mut engine),
            input if input.starts_with("position") => parse_position(input, &mut engine),
            input if input.starts_with("go") => parse_go(input, &engine).map(|limits| {
                engine.search(limits, Some(&stdin));
            }),
            other => Err(UciError::UnknownCommand(other.to_string())),
        };

        if let Err(e) = res {
            eprintln!("Error: {e}");
        }

        if engine.quit {
            break;
        }
        for pending in engine.pending_commands.drain(..).collect::<Vec<_>>() {
            queue.push_back(pending);
        }
    }
    KEEP_RUNNING.store(false, Ordering::SeqCst);
    Ok(())
}
