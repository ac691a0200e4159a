#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! Rubicon, a UCI chess engine written in Rust.

pub mod bench;
pub mod chess;
pub mod cli;
pub mod errors;
pub mod evaluation;
pub mod historytable;
pub mod lookups;
pub mod movepicker;
pub mod perft;
pub mod rng;
pub mod search;
pub mod searchinfo;
pub mod tablebases;
pub mod threadlocal;
pub mod threadpool;
pub mod timemgmt;
pub mod transpositiontable;
pub mod uci;
pub mod util;

/// The name of the engine.
pub static NAME: &str = "Rubicon";
/// The version of the engine.
pub static VERSION: &str = env!("CARGO_PKG_VERSION");
