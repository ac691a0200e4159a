use rubicon::cli::{
    self,
    Subcommands::{Bench, Perft},
};
use rubicon::{bench, perft, uci};

fn main() -> anyhow::Result<()> {
    if std::env::args_os().len() == 1 {
        // fast path to UCI:
        return uci::main_loop();
    }

    let cli = <cli::Cli as clap::Parser>::parse();

    match cli.subcommand {
        Some(Bench { depth, threads }) => {
            bench::run(depth, threads);
            Ok(())
        }
        Some(Perft) => {
            perft::gamut();
            Ok(())
        }
        None => uci::main_loop(),
    }
}
