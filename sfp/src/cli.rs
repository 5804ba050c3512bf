use std::path::PathBuf;

use structopt::clap::AppSettings::*;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct InputArgs {
    #[structopt(
        name = "input",
        parse(from_os_str),
        required = true,
        help = "Archive, directory of archives, or a path ending in `*` or `*.ext`"
    )]
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, StructOpt)]
pub struct ExtractArgs {
    #[structopt(
        short,
        long,
        parse(from_os_str),
        help = "Directory to extract into [default: the archive path without its extension]"
    )]
    pub output: Option<PathBuf>,

    #[structopt(long, help = "Keep files that already exist instead of replacing them")]
    pub no_overwrite: bool,

    #[structopt(
        short,
        long,
        default_value = "1",
        help = "Number of extraction threads; 0 uses one per CPU"
    )]
    pub jobs: usize,

    #[structopt(
        name = "input",
        parse(from_os_str),
        required = true,
        help = "Archive, directory of archives, or a path ending in `*` or `*.ext`"
    )]
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, StructOpt)]
pub enum Commands {
    #[structopt(
        name = "x",
        visible_alias = "extract",
        about = "Extract the contents of archives"
    )]
    Extract(ExtractArgs),

    #[structopt(name = "l", visible_alias = "list", about = "List the entries of archives")]
    List(InputArgs),

    #[structopt(name = "i", visible_alias = "info", about = "Show archive header details")]
    Info(InputArgs),
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "sfp",
    about = "Inspect and extract SFP archives.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands],
)]
pub struct CliOpts {
    #[structopt(short, long, help = "Show debug logging on stderr", global = true)]
    pub verbose: bool,

    #[structopt(subcommand)]
    pub cmd: Commands,
}
