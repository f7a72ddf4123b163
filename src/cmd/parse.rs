/*!
`parse.rs`

Implements `termroute parse "<raw>"`: tokenize and resolve the text against
the catalog, then show the bound command.

Human output: a header with the command and its route, then one table for
the bound arguments and one for the bound options (each option once, even
when it is reachable by alias).

JSON output: `ParsedCommand::to_json()` plus `"status": "ok"`.
*/

use anyhow::Result;
use clap::Args;

use termroute::model::{ParsedCommand, Request};

use crate::cmd::format::{Role, StyleOptions, box_header, color, table};
use crate::cmd::shared::{Session, block_on, fail};

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Raw command text (quote it for your shell)
    pub raw: String,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

pub fn execute_parse(args: ParseArgs, session: &Session) -> Result<()> {
    let parser = session.parser();
    let parsed = match block_on(parser.parse(Request::new(args.raw.as_str())))? {
        Ok(parsed) => parsed,
        Err(err) => return fail(err.into(), args.json),
    };

    if args.json {
        println!("{}", parsed_json(&parsed));
        return Ok(());
    }

    let style = StyleOptions::detect();
    let route = parsed
        .hierarchy
        .as_ref()
        .map(|h| h.path().join(" > "))
        .unwrap_or_else(|| parsed.command.id().to_string());
    println!(
        "{}",
        box_header(
            &format!(
                "Command {} ({})",
                parsed.command.id(),
                parsed.command.descriptor.command_type
            ),
            Some(&route),
            &style
        )
    );
    if !parsed.command.descriptor.description.is_empty() {
        println!("{}", color(Role::Dim, &parsed.command.descriptor.description, &style));
    }

    let arguments: Vec<Vec<String>> = parsed
        .command
        .arguments
        .iter()
        .map(|a| {
            vec![
                a.descriptor.order.to_string(),
                a.id().to_string(),
                a.descriptor.data_type.as_str().to_string(),
                a.value.clone(),
            ]
        })
        .collect();
    if !arguments.is_empty() {
        println!();
        println!("{}", table(&["#", "ARGUMENT", "TYPE", "VALUE"], &arguments, &style));
    }

    let mut options = parsed.command.distinct_options();
    options.sort_by(|a, b| a.id().cmp(b.id()));
    let options: Vec<Vec<String>> = options
        .iter()
        .map(|o| {
            vec![
                o.id().to_string(),
                o.descriptor.alias.clone().unwrap_or_else(|| "-".into()),
                o.descriptor.data_type.as_str().to_string(),
                o.value(),
                if o.by_alias { "alias" } else { "id" }.to_string(),
            ]
        })
        .collect();
    if !options.is_empty() {
        println!();
        println!(
            "{}",
            table(&["OPTION", "ALIAS", "TYPE", "VALUE", "BY"], &options, &style)
        );
    }

    if arguments.is_empty() && options.is_empty() {
        println!("{}", color(Role::Dim, "(no arguments or options)", &style));
    }
    Ok(())
}

fn parsed_json(parsed: &ParsedCommand) -> serde_json::Value {
    let mut value = parsed.to_json();
    if let Some(map) = value.as_object_mut() {
        map.insert("status".into(), serde_json::Value::from("ok"));
    }
    value
}
