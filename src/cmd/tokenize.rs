/*!
`tokenize.rs`

Implements `termroute tokenize "<raw>"`: run only the tokenizer and show the
ordered tokens plus the option table, without touching the catalog.

JSON Output Shape:
{
  "status": "ok",
  "request_id": "...",
  "raw": "root1 grp1 --opt1 val",
  "tokens": ["root1", "grp1"],
  "options": [ { "key": "--opt1", "value": "val", "by_alias": false } ]
}
*/

use anyhow::Result;
use clap::Args;

use termroute::model::{ParsedRequest, Request};

use crate::cmd::format::{Role, StyleOptions, box_header, color, table};
use crate::cmd::shared::{Session, fail};

#[derive(Args, Debug)]
pub struct TokenizeArgs {
    /// Raw command text (quote it for your shell)
    pub raw: String,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

pub fn execute_tokenize(args: TokenizeArgs, session: &Session) -> Result<()> {
    let request = Request::new(args.raw.as_str());
    let parsed = match session.parser().tokenize(&request) {
        Ok(parsed) => parsed,
        Err(err) => return fail(err.into(), args.json),
    };

    if args.json {
        println!("{}", tokens_json(&parsed));
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(
            &format!("Tokens ({})", parsed.tokens.len()),
            Some(&args.raw),
            &style
        )
    );
    if parsed.tokens.is_empty() {
        println!("{}", color(Role::Dim, "(no tokens)", &style));
    } else {
        let rows: Vec<Vec<String>> = parsed
            .tokens
            .iter()
            .enumerate()
            .map(|(i, t)| vec![(i + 1).to_string(), t.clone()])
            .collect();
        println!("{}", table(&["#", "TOKEN"], &rows, &style));
    }

    let options = sorted_options(&parsed);
    if !options.is_empty() {
        println!();
        let rows: Vec<Vec<String>> = options
            .iter()
            .map(|(key, value, by_alias)| {
                vec![
                    key.to_string(),
                    value.to_string(),
                    if *by_alias { "alias" } else { "id" }.to_string(),
                ]
            })
            .collect();
        println!("{}", table(&["OPTION", "VALUE", "BY"], &rows, &style));
    }
    Ok(())
}

fn sorted_options(parsed: &ParsedRequest) -> Vec<(&str, &str, bool)> {
    let mut options: Vec<_> = parsed
        .options
        .iter()
        .map(|(k, o)| (k.as_str(), o.value.as_str(), o.by_alias))
        .collect();
    options.sort_by(|a, b| a.0.cmp(b.0));
    options
}

fn tokens_json(parsed: &ParsedRequest) -> serde_json::Value {
    let options: Vec<_> = sorted_options(parsed)
        .into_iter()
        .map(|(key, value, by_alias)| {
            serde_json::json!({ "key": key, "value": value, "by_alias": by_alias })
        })
        .collect();
    serde_json::json!({
        "status": "ok",
        "request_id": parsed.request.id,
        "raw": parsed.request.raw,
        "tokens": parsed.tokens,
        "options": options,
    })
}
