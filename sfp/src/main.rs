mod cli;
mod commands;
mod error;
mod util;

use structopt::StructOpt;

use cli::{CliOpts, Commands};

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let opts = CliOpts::from_iter(wild::args_os());
    init_logging(opts.verbose);

    let result = match opts.cmd {
        Commands::Extract(args) => commands::extract(args),
        Commands::List(args) => commands::list(args),
        Commands::Info(args) => commands::info(args),
    };

    if let Err(e) = result {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}
