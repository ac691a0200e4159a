use clap::Parser;

#[derive(Parser)]
#[command(name = "rubicon", about = "Rubicon, a UCI chess engine.")]
pub struct Cli {
    #[command(subcommand)]
    pub subcommand: Option<Subcommands>,
}

#[derive(clap::Subcommand)]
pub enum Subcommands {
    /// Search a fixed suite of positions and report the node counts.
    Bench {
        /// Depth to search each position to.
        #[arg(long, default_value_t = crate::bench::BENCH_DEPTH)]
        depth: i32,
        /// Worker thread count.
        #[arg(long, default_value_t = 1)]
        threads: usize,
    },
    /// Run the perft validation suite.
    Perft,
}
