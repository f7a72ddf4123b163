use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod utils;

use cmd::{IdArgs, ListArgs, ParseArgs, RunArgs, TokenizeArgs};

/// termroute - tokenize, resolve and run terminal commands against a catalog.
///
/// Command layout:
///   termroute tokenize "<raw>" [--json]
///   termroute parse    "<raw>" [--json]
///   termroute list     [--json]
///   termroute run      [--batch] [--detach] [--sender-id ID] [--json]   (reads stdin)
///   termroute id       [--short] [-n COUNT]
///
/// Global flags / env:
///   -v / -vv            Increase verbosity (RUST_LOG overrides)
///   -q / --quiet        Errors only
///   -c / --config       Options file, JSON or YAML (or TERMROUTE_CONFIG)
///   -C / --catalog      Command catalog file, JSON or YAML (or TERMROUTE_CATALOG)
///
/// Examples:
///   termroute -C catalog.yaml parse 'root1 grp1 cmd1 "arg one" --opt1 val' --json
///   printf 'root1 grp1\nroot1 grp2\n' | termroute -C catalog.yaml run
#[derive(Parser, Debug)]
#[command(
    name = "termroute",
    version,
    author,
    about = "termroute - terminal command tokenizer, router and request processor",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Options file (grammar, router, processor)
    #[arg(short = 'c', long, global = true, env = "TERMROUTE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Command catalog file
    #[arg(short = 'C', long, global = true, env = "TERMROUTE_CATALOG", value_name = "FILE")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split raw text into tokens and options
    Tokenize(TokenizeArgs),

    /// Resolve raw text against the catalog
    Parse(ParseArgs),

    /// List catalog commands
    List(ListArgs),

    /// Process stdin lines through the request processor
    Run(RunArgs),

    /// Print unique ids
    Id(IdArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    if let Commands::Id(args) = cli.command {
        return cmd::execute_id(args);
    }

    let session = cmd::shared::load_session(cli.config.as_deref(), cli.catalog.as_deref())?;

    match cli.command {
        Commands::Tokenize(args) => cmd::execute_tokenize(args, &session),
        Commands::Parse(args) => cmd::execute_parse(args, &session),
        Commands::List(args) => cmd::execute_list(args, &session),
        Commands::Run(args) => cmd::execute_run(args, &session),
        Commands::Id(args) => cmd::execute_id(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["termroute", "parse", "root1", "-vv", "-C", "cat.yaml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.catalog, Some(PathBuf::from("cat.yaml")));
        assert!(matches!(cli.command, Commands::Parse(_)));
    }

    #[test]
    fn id_subcommand() {
        let cli = Cli::try_parse_from(["termroute", "id", "--short", "-n", "3"]).unwrap();
        match cli.command {
            Commands::Id(args) => {
                assert!(args.short);
                assert_eq!(args.count, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
