//! `termroute id`: print fresh unique ids (request / batch id format).

use anyhow::Result;
use clap::Args;

use termroute::processor::{SHORT_ID_HINT, new_unique_id};

#[derive(Args, Debug)]
pub struct IdArgs {
    /// Compact 12 hex char form, unique within this process
    #[arg(long)]
    pub short: bool,

    /// Number of ids to print
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,
}

pub fn execute_id(args: IdArgs) -> Result<()> {
    let hint = args.short.then_some(SHORT_ID_HINT);
    for _ in 0..args.count {
        println!("{}", new_unique_id(hint));
    }
    Ok(())
}
