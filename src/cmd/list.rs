/*!
`list.rs`

Implements `termroute list`: show every command in the catalog, sorted by id.

JSON Output Shape:
{
  "status": "ok",
  "catalog": "<path or null>",
  "count": 2,
  "commands": [
    { "id": "root1", "type": "root", "owner": null, "arguments": 0, "options": 1,
      "obsolete": false, "description": "" }
  ]
}
*/

use anyhow::Result;
use clap::Args;

use termroute::model::CommandDescriptor;

use crate::cmd::format::{Role, StyleOptions, box_header, color, table, truncate_ellipsis};
use crate::cmd::shared::Session;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

pub fn execute_list(args: ListArgs, session: &Session) -> Result<()> {
    let commands = session.catalog.sorted();
    let catalog = session
        .catalog_path
        .as_ref()
        .map(|p| p.display().to_string());

    if args.json {
        let items: Vec<_> = commands.iter().map(|c| command_json(c)).collect();
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "catalog": catalog,
                "count": items.len(),
                "commands": items,
            })
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    let subtitle = catalog.map(|c| format!("catalog={c}"));
    println!(
        "{}",
        box_header(
            &format!("Commands ({})", commands.len()),
            subtitle.as_deref(),
            &style
        )
    );
    if commands.is_empty() {
        println!(
            "{}",
            color(Role::Dim, "(none) - pass --catalog or set TERMROUTE_CATALOG", &style)
        );
        return Ok(());
    }

    let rows: Vec<Vec<String>> = commands
        .iter()
        .map(|c| {
            let mut id = c.id.clone();
            if c.flags.obsolete {
                id.push_str(" (obsolete)");
            }
            vec![
                id,
                c.command_type.to_string(),
                c.owner().unwrap_or("-").to_string(),
                c.arguments.len().to_string(),
                c.options.len().to_string(),
                truncate_ellipsis(&c.description.replace('\n', " "), 60),
            ]
        })
        .collect();
    println!(
        "{}",
        table(
            &["ID", "TYPE", "OWNER", "ARGS", "OPTIONS", "DESCRIPTION"],
            &rows,
            &style
        )
    );
    Ok(())
}

fn command_json(command: &CommandDescriptor) -> serde_json::Value {
    serde_json::json!({
        "id": command.id,
        "type": command.command_type.to_string(),
        "owner": command.owner(),
        "arguments": command.arguments.len(),
        "options": command.options.len(),
        "obsolete": command.flags.obsolete,
        "description": command.description,
    })
}
