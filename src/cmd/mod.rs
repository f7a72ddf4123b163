/*!
Subcommand dispatcher module.

Layout:
  src/cmd/
    mod.rs          (this file: module declarations + re-exports)
    tokenize.rs     (TokenizeArgs + execute_tokenize)
    parse.rs        (ParseArgs    + execute_parse)
    list.rs         (ListArgs     + execute_list)
    run.rs          (RunArgs      + execute_run)
    id.rs           (IdArgs       + execute_id)
    shared.rs       (Session loading, runtime, JSON failure payloads)
    format.rs       (header / table / color helpers for human output)

Conventions:
  - Each subcommand module exposes exactly one public `execute_*` function
    that returns `anyhow::Result<()>`.
  - Argument structs derive `clap::Args` and carry their own `--json` flag.
  - JSON goes to stdout; logs go to stderr.
*/

pub mod format;
pub mod id;
pub mod list;
pub mod parse;
pub mod run;
pub mod shared;
pub mod tokenize;

pub use id::{IdArgs, execute_id};
pub use list::{ListArgs, execute_list};
pub use parse::{ParseArgs, execute_parse};
pub use run::{RunArgs, execute_run};
pub use tokenize::{TokenizeArgs, execute_tokenize};
