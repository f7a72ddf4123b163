/*!
`run.rs`

Implements `termroute run`: a line console over the request processor.

Each stdin line is one ingestion. The processor runs in the background with
the echo executor, so every resolved command comes back as its JSON summary.

Behavior:
  - blank lines and lines starting with `#` are skipped
  - `--batch` turns batch framing on (delimiters come from the options file)
  - `--detach` queues lines without waiting (results are only logged)
  - at end of input the queue is drained; if that takes longer than
    `--stop-timeout-ms` the session is canceled
  - `--json` prints one JSON document per line (JSON Lines)
*/

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use termroute::processor::{
    EchoExecutor, LoggingExceptionHandler, ProcessingContext, RequestProcessor, Response,
};

use crate::cmd::format::{Role, StyleOptions, color};
use crate::cmd::shared::{Session, block_on, error_json};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Require batch framing on every line
    #[arg(long)]
    pub batch: bool,

    /// Sender id attached to every request
    #[arg(long, value_name = "ID")]
    pub sender_id: Option<String>,

    /// Sender endpoint attached to every request
    #[arg(long, value_name = "ENDPOINT")]
    pub sender_endpoint: Option<String>,

    /// Queue lines without waiting for their results
    #[arg(long)]
    pub detach: bool,

    /// Drain timeout at end of input, in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub stop_timeout_ms: u64,

    /// Output JSON Lines instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

pub fn execute_run(args: RunArgs, session: &Session) -> Result<()> {
    let mut options = session.options.clone();
    if args.batch {
        options.processor.batch_enabled = true;
    }
    let processor = RequestProcessor::new(
        &options,
        session.catalog.clone(),
        Arc::new(EchoExecutor),
        Arc::new(LoggingExceptionHandler),
    )?;
    block_on(console(processor, args))?
}

#[derive(Debug, Default)]
struct Tally {
    ok: usize,
    failed: usize,
}

async fn console(processor: RequestProcessor, args: RunArgs) -> Result<()> {
    let cancellation = CancellationToken::new();
    processor
        .start_processing(ProcessingContext::new(cancellation.clone()), true)
        .await?;
    info!(detach = args.detach, "reading commands from stdin");

    let style = StyleOptions::detect();
    let sender_id = args.sender_id.as_deref();
    let endpoint = args.sender_endpoint.as_deref();
    let mut tally = Tally::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if args.detach {
            match processor.add_request(line, sender_id, endpoint).await {
                Ok(batch_id) => {
                    tally.ok += 1;
                    if args.json {
                        println!("{}", serde_json::json!({ "status": "queued", "batch_id": batch_id }));
                    } else {
                        println!("{}", color(Role::Dim, format!("queued {batch_id}"), &style));
                    }
                }
                Err(err) => {
                    tally.failed += 1;
                    print_error(&err.into(), args.json, &style);
                }
            }
            continue;
        }

        match processor.process_request(line, sender_id, endpoint).await {
            Ok(response) => {
                for item in &response.items {
                    if item.error.is_some() {
                        tally.failed += 1;
                    } else {
                        tally.ok += 1;
                    }
                }
                print_response(&response, args.json, &style);
            }
            Err(err) => {
                tally.failed += 1;
                print_error(&err.into(), args.json, &style);
            }
        }
    }

    let timed_out = processor
        .stop_processing(Some(Duration::from_millis(args.stop_timeout_ms)))
        .await;
    if timed_out {
        warn!(timeout_ms = args.stop_timeout_ms, "queue did not drain in time, canceling");
        cancellation.cancel();
        processor.stop_processing(None).await;
    }
    info!(ok = tally.ok, failed = tally.failed, "console finished");
    Ok(())
}

fn print_response(response: &Response, json: bool, style: &StyleOptions) {
    if json {
        println!("{}", response.to_json());
        return;
    }
    for item in &response.items {
        match (&item.error, &item.result) {
            (Some(error), _) => println!(
                "{} {}  {}",
                color(Role::Error, "✖", style),
                item.request.raw,
                color(Role::Error, error, style)
            ),
            (None, Some(result)) => {
                let command = result
                    .get("command")
                    .and_then(|v| v.as_str())
                    .unwrap_or("-");
                println!(
                    "{} {}  {}",
                    color(Role::Success, "✔", style),
                    item.request.raw,
                    color(Role::Secondary, format!("-> {command}"), style)
                );
            }
            (None, None) => println!("{} {}", color(Role::Success, "✔", style), item.request.raw),
        }
    }
}

fn print_error(err: &anyhow::Error, json: bool, style: &StyleOptions) {
    if json {
        println!("{}", error_json(err));
    } else {
        eprintln!("{} {err:#}", color(Role::Error, "✖", style));
    }
}
