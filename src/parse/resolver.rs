/*!
Route resolver.

Walks the token stream against the catalog:
  1. the leading tokens that resolve to commands form the path; each one
     after the first must be owned by the one before it
  2. the first token that does not resolve starts the argument list of the
     last path node
  3. options bind against the last path node, canonical id first, then
     alias; canonical id and alias share one bound value
  4. with hierarchy tracking on, the path is recorded root -> leaf, and a
     path that does not start at a root is placed under a synthesized
     default root (implicit root mode) or rejected

Any failure aborts the whole resolution.
*/

use std::sync::Arc;

use tracing::{trace, warn};

use crate::catalog::CommandCatalog;
use crate::config::{GrammarOptions, RouterOptions};
use crate::error::{
    Result, invalid_command, invalid_option, missing_argument, missing_command, missing_option,
    unsupported_argument, unsupported_option,
};
use crate::model::{
    BoundArgument, BoundCommand, BoundOption, CommandDescriptor, HierarchyNode, ParsedCommand,
    ParsedRequest,
};
use crate::text::TextHandler;

#[derive(Debug, Clone)]
pub struct RouteResolver {
    grammar: GrammarOptions,
    router: RouterOptions,
    text: TextHandler,
}

impl RouteResolver {
    pub fn new(grammar: GrammarOptions, router: RouterOptions, text: TextHandler) -> Self {
        Self {
            grammar,
            router,
            text,
        }
    }

    pub async fn resolve(
        &self,
        parsed: ParsedRequest,
        catalog: &dyn CommandCatalog,
    ) -> Result<ParsedCommand> {
        let (path, arg_start) = self.resolve_path(&parsed.tokens, catalog).await?;
        let Some(leaf) = path.last().cloned() else {
            return Err(missing_command(
                "The command is missing in the request.",
                &[("request", &parsed.request.id)],
            ));
        };
        if leaf.flags.obsolete {
            warn!(command = %leaf.id, "resolved an obsolete command");
        }

        let mut command = BoundCommand::new(Arc::clone(&leaf), self.text);
        command.arguments = self.bind_arguments(&leaf, &parsed.tokens[arg_start..])?;
        self.bind_options(&mut command, &parsed)?;

        let hierarchy = if self.router.enable_hierarchy {
            Some(self.build_hierarchy(&path)?)
        } else {
            None
        };

        trace!(
            request = %parsed.request.id,
            command = %leaf.id,
            arguments = command.arguments.len(),
            "route resolved"
        );

        Ok(ParsedCommand {
            command,
            hierarchy,
            request: parsed.request,
        })
    }

    /// Returns the accepted path and the index of the first argument token.
    async fn resolve_path(
        &self,
        tokens: &[String],
        catalog: &dyn CommandCatalog,
    ) -> Result<(Vec<Arc<CommandDescriptor>>, usize)> {
        let Some(first) = tokens.first() else {
            return Err(missing_command("The command is missing in the request.", &[]));
        };

        let Some(head) = catalog.try_find_by_id(first).await? else {
            return Err(invalid_command(
                "The command is not found.",
                &[("command", first)],
            ));
        };
        if let Some(owner) = head.owner() {
            return Err(missing_command(
                "The command owner is missing.",
                &[("command", &head.id), ("owner", owner)],
            ));
        }

        let mut path = vec![head];
        let mut idx = 1;
        while let Some(token) = tokens.get(idx) {
            let Some(next) = catalog.try_find_by_id(token).await? else {
                break;
            };
            let Some(current) = path.last() else {
                break;
            };
            let owned = next
                .owner()
                .is_some_and(|owner| self.text.equals(owner, &current.id));
            if !owned || self.text.equals(&next.id, &current.id) {
                return Err(invalid_command(
                    "The command owner is not valid.",
                    &[("owner", &current.id), ("command", &next.id)],
                ));
            }
            path.push(next);
            idx += 1;
        }
        Ok((path, idx))
    }

    fn bind_arguments(
        &self,
        command: &CommandDescriptor,
        values: &[String],
    ) -> Result<Vec<BoundArgument>> {
        if command.arguments.is_empty() {
            if !values.is_empty() {
                let joined = values.join(&self.grammar.separator);
                return Err(unsupported_argument(
                    "The command does not support any arguments.",
                    &[("command", &command.id), ("arguments", &joined)],
                ));
            }
            return Ok(Vec::new());
        }

        if values.len() > command.arguments.len() {
            let max = command.arguments.len().to_string();
            let joined = values.join(&self.grammar.separator);
            return Err(unsupported_argument(
                "The command does not support the specified number of arguments.",
                &[
                    ("command", &command.id),
                    ("max", &max),
                    ("arguments", &joined),
                ],
            ));
        }

        if let Some(missing) = command
            .arguments
            .iter()
            .skip(values.len())
            .find(|a| a.required)
        {
            return Err(missing_argument(
                "The required argument is missing.",
                &[("command", &command.id), ("argument", &missing.id)],
            ));
        }

        Ok(command
            .arguments
            .iter()
            .zip(values)
            .map(|(descriptor, value)| BoundArgument {
                descriptor: descriptor.clone(),
                value: value.clone(),
            })
            .collect())
    }

    fn bind_options(&self, command: &mut BoundCommand, parsed: &ParsedRequest) -> Result<()> {
        let descriptor = Arc::clone(&command.descriptor);

        // Sort so the first failing key is deterministic.
        let mut keys: Vec<&String> = parsed.options.keys().collect();
        keys.sort();

        for key in keys {
            let written = &parsed.options[key];
            let prefix = if written.by_alias {
                &self.grammar.option_alias_prefix
            } else {
                &self.grammar.option_prefix
            };
            let name = key.strip_prefix(prefix.as_str()).unwrap_or(key);

            let option = if written.by_alias {
                match descriptor.find_option_by_alias(name, &self.text) {
                    Some(o) => o,
                    None if descriptor.find_option(name, &self.text).is_some() => {
                        return Err(invalid_option(
                            "The alias prefix is not valid for an option.",
                            &[("option", key)],
                        ));
                    }
                    None => return Err(self.unsupported(&descriptor, key)),
                }
            } else {
                match descriptor.find_option(name, &self.text) {
                    Some(o) => o,
                    None if descriptor.find_option_by_alias(name, &self.text).is_some() => {
                        return Err(invalid_option(
                            "The option prefix is not valid for an alias.",
                            &[("option", key)],
                        ));
                    }
                    None => return Err(self.unsupported(&descriptor, key)),
                }
            };

            if option.disabled {
                return Err(unsupported_option(
                    "The option is disabled.",
                    &[("command", &descriptor.id), ("option", key)],
                ));
            }
            if option.obsolete {
                warn!(command = %descriptor.id, option = %option.id, "option is obsolete");
            }
            if command.option(&option.id).is_some() {
                return Err(invalid_option(
                    "The option is specified more than once.",
                    &[("command", &descriptor.id), ("option", &option.id)],
                ));
            }
            command.bind_option(BoundOption::new(
                option.clone(),
                written.value.clone(),
                written.by_alias,
            ));
        }

        if let Some(missing) = descriptor
            .options
            .iter()
            .find(|o| o.required && command.option(&o.id).is_none())
        {
            return Err(missing_option(
                "The required option is missing.",
                &[("command", &descriptor.id), ("option", &missing.id)],
            ));
        }
        Ok(())
    }

    fn unsupported(&self, descriptor: &CommandDescriptor, key: &str) -> crate::error::TermError {
        unsupported_option(
            "The command does not support option or its alias.",
            &[("command", &descriptor.id), ("option", key)],
        )
    }

    fn build_hierarchy(&self, path: &[Arc<CommandDescriptor>]) -> Result<HierarchyNode> {
        let Some(node) = HierarchyNode::from_path(path) else {
            return Err(missing_command("The command is missing in the request.", &[]));
        };
        if node.command.is_root() {
            return Ok(node);
        }
        if !self.router.implicit_root {
            return Err(missing_command(
                "The root command is missing.",
                &[("command", &node.command.id)],
            ));
        }
        Ok(node.under_default_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::error::{ErrorKind, TermError};
    use crate::model::{ArgumentDescriptor, CommandType, DataType, OptionDescriptor, Request};
    use crate::parse::tokenizer::RequestTokenizer;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new(
            vec![
                CommandDescriptor::root("root1"),
                CommandDescriptor::root("root2"),
                CommandDescriptor::group("grp1", "root1"),
                CommandDescriptor::group("grp2", "grp1"),
                CommandDescriptor::sub_command("cmd1", "grp1"),
                CommandDescriptor::sub_command("cmd2", "grp1")
                    .with_argument(ArgumentDescriptor::new(1, "arg1", DataType::Text).required())
                    .with_argument(ArgumentDescriptor::new(2, "arg2", DataType::Integer))
                    .with_option(OptionDescriptor::new("opt1", DataType::Text).with_alias("o1"))
                    .with_option(OptionDescriptor::new("opt2", DataType::Boolean))
                    .with_option(OptionDescriptor::new("opt3", DataType::Text).with_alias("o3"))
                    .with_option(OptionDescriptor::new("old", DataType::Text).disabled())
                    .with_option(
                        OptionDescriptor::new("legacy", DataType::Text)
                            .with_alias("lg")
                            .obsolete(),
                    ),
                CommandDescriptor::sub_command("cmd3", "root1")
                    .with_option(OptionDescriptor::new("must", DataType::Text).required()),
                CommandDescriptor::new("solo", CommandType::SubCommand),
            ],
            TextHandler::default(),
        )
        .unwrap()
    }

    async fn resolve_with(
        grammar: GrammarOptions,
        router: RouterOptions,
        raw: &str,
    ) -> Result<ParsedCommand> {
        let parsed = RequestTokenizer::new(grammar.clone()).tokenize(&Request::with_id("r1", raw))?;
        RouteResolver::new(grammar, router, TextHandler::default())
            .resolve(parsed, &catalog())
            .await
    }

    async fn resolve(raw: &str) -> Result<ParsedCommand> {
        resolve_with(GrammarOptions::default(), RouterOptions::default(), raw).await
    }

    async fn resolve_err(raw: &str) -> TermError {
        match resolve(raw).await {
            Ok(cmd) => panic!("expected failure, resolved {}", cmd.command.id()),
            Err(e) => e,
        }
    }

    #[tokio::test]
    async fn full_path_without_hierarchy() {
        let parsed = resolve("root1 grp1 cmd1").await.unwrap();
        assert_eq!(parsed.command.id(), "cmd1");
        assert!(parsed.hierarchy.is_none());
        assert!(parsed.command.arguments.is_empty());
        assert_eq!(parsed.command.option_key_count(), 0);
        assert_eq!(parsed.request.id, "r1");
    }

    #[tokio::test]
    async fn extra_token_on_argless_command() {
        let err = resolve_err("root1 grp1 cmd1 extra").await;
        assert_eq!(err.kind(), ErrorKind::UnsupportedArgument);
        assert_eq!(
            err.to_string(),
            "The command does not support any arguments. command=cmd1 arguments=extra"
        );
    }

    #[tokio::test]
    async fn too_many_arguments() {
        let err = resolve_err("root1 grp1 cmd2 a 2 c d").await;
        assert_eq!(err.kind(), ErrorKind::UnsupportedArgument);
        assert_eq!(
            err.to_string(),
            "The command does not support the specified number of arguments. command=cmd2 max=2 arguments=a 2 c d"
        );
    }

    #[tokio::test]
    async fn arguments_bind_in_order() {
        let parsed = resolve(r#"root1 grp1 cmd2 "hello world" 42"#).await.unwrap();
        let args = &parsed.command.arguments;
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].id(), "arg1");
        assert_eq!(args[0].value, "hello world");
        assert_eq!(args[1].typed(), serde_json::json!(42));
        assert_eq!(parsed.command.argument("ARG2").unwrap().value, "42");
    }

    #[tokio::test]
    async fn missing_required_argument() {
        let err = resolve_err("root1 grp1 cmd2").await;
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
        assert_eq!(
            err.to_string(),
            "The required argument is missing. command=cmd2 argument=arg1"
        );
    }

    #[tokio::test]
    async fn owner_mismatch() {
        let err = resolve_err("root2 grp1").await;
        assert_eq!(err.kind(), ErrorKind::InvalidCommand);
        assert_eq!(
            err.to_string(),
            "The command owner is not valid. owner=root2 command=grp1"
        );
    }

    #[tokio::test]
    async fn duplicate_segment_cannot_own_itself() {
        let err = resolve_err("root1 grp1 cmd1 cmd1").await;
        assert_eq!(err.kind(), ErrorKind::InvalidCommand);
        assert_eq!(
            err.to_string(),
            "The command owner is not valid. owner=cmd1 command=cmd1"
        );
    }

    #[tokio::test]
    async fn unknown_first_token() {
        let err = resolve_err("nope grp1").await;
        assert_eq!(err.kind(), ErrorKind::InvalidCommand);
        assert_eq!(err.to_string(), "The command is not found. command=nope");
    }

    #[tokio::test]
    async fn owned_command_without_owner() {
        let err = resolve_err("cmd1").await;
        assert_eq!(err.kind(), ErrorKind::MissingCommand);
        assert_eq!(
            err.to_string(),
            "The command owner is missing. command=cmd1 owner=grp1"
        );
    }

    #[tokio::test]
    async fn empty_request_has_no_command() {
        let err = resolve_err("   ").await;
        assert_eq!(err.kind(), ErrorKind::MissingCommand);
    }

    #[tokio::test]
    async fn options_share_canonical_and_alias() {
        let parsed = resolve("root1 grp1 cmd2 a --opt1 v1 -o3 v3 --opt2")
            .await
            .unwrap();
        let cmd = &parsed.command;
        assert_eq!(cmd.option_key_count(), 5);

        let canonical = cmd.option("opt1").unwrap();
        let alias = cmd.option("o1").unwrap();
        assert!(Arc::ptr_eq(canonical, alias));
        assert_eq!(alias.value(), "v1");
        assert!(!alias.by_alias);

        let o3 = cmd.option("opt3").unwrap();
        assert!(o3.by_alias);
        assert_eq!(o3.value(), "v3");

        canonical.set_value("changed");
        assert_eq!(cmd.option("o1").unwrap().value(), "changed");
        assert_eq!(cmd.option("opt2").unwrap().typed(), serde_json::json!(true));
    }

    #[tokio::test]
    async fn unknown_option() {
        let err = resolve_err("root1 grp1 cmd2 a --opt9 x").await;
        assert_eq!(err.kind(), ErrorKind::UnsupportedOption);
        assert_eq!(
            err.to_string(),
            "The command does not support option or its alias. command=cmd2 option=--opt9"
        );
    }

    #[tokio::test]
    async fn alias_prefix_on_canonical_name() {
        let err = resolve_err("root1 grp1 cmd2 a -opt1 x").await;
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
        assert_eq!(
            err.to_string(),
            "The alias prefix is not valid for an option. option=-opt1"
        );
    }

    #[tokio::test]
    async fn option_prefix_on_alias() {
        let err = resolve_err("root1 grp1 cmd2 a --o1 x").await;
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
        assert_eq!(
            err.to_string(),
            "The option prefix is not valid for an alias. option=--o1"
        );
    }

    #[tokio::test]
    async fn canonical_and_alias_together_rejected() {
        let err = resolve_err("root1 grp1 cmd2 a --opt1 x -o1 y").await;
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
        assert_eq!(
            err.to_string(),
            "The option is specified more than once. command=cmd2 option=opt1"
        );
    }

    #[tokio::test]
    async fn disabled_option_rejected() {
        let err = resolve_err("root1 grp1 cmd2 a --old x").await;
        assert_eq!(err.kind(), ErrorKind::UnsupportedOption);
        assert_eq!(
            err.to_string(),
            "The option is disabled. command=cmd2 option=--old"
        );
    }

    #[tokio::test]
    async fn required_option_missing() {
        let err = resolve_err("root1 cmd3").await;
        assert_eq!(err.kind(), ErrorKind::MissingOption);
        assert_eq!(
            err.to_string(),
            "The required option is missing. command=cmd3 option=must"
        );
        assert!(resolve("root1 cmd3 --must yes").await.is_ok());
    }

    #[tokio::test]
    async fn option_with_repeated_value_separator() {
        let grammar = GrammarOptions::default().with_option_value_separator("=");
        let parsed = resolve_with(
            grammar,
            RouterOptions::default(),
            r#"root1 grp1 cmd2 a --opt3====="val""#,
        )
        .await
        .unwrap();
        assert_eq!(parsed.command.option("opt3").unwrap().value(), "val");
        assert_eq!(parsed.command.option("o3").unwrap().value(), "val");
    }

    #[tokio::test]
    async fn equals_as_the_only_separator() {
        let grammar = GrammarOptions::default().with_separator("=");
        let parsed = resolve_with(
            grammar,
            RouterOptions::default(),
            r#"root1=grp1=cmd2=a=--opt3====="val""#,
        )
        .await
        .unwrap();
        assert_eq!(parsed.command.id(), "cmd2");
        assert_eq!(parsed.command.arguments[0].value, "a");
        assert_eq!(parsed.command.option("opt3").unwrap().value(), "val");
    }

    #[tokio::test]
    async fn obsolete_option_still_binds() {
        let parsed = resolve("root1 grp1 cmd2 a -lg old-value").await.unwrap();
        let legacy = parsed.command.option("legacy").unwrap();
        assert!(legacy.descriptor.obsolete);
        assert_eq!(legacy.value(), "old-value");
        assert_eq!(parsed.command.option("lg").unwrap().value(), "old-value");
    }

    #[tokio::test]
    async fn hierarchy_tracks_full_path() {
        let router = RouterOptions::default().with_hierarchy(true);
        let parsed = resolve_with(GrammarOptions::default(), router, "root1 grp1 grp2")
            .await
            .unwrap();
        let h = parsed.hierarchy.unwrap();
        assert!(!h.is_default);
        assert_eq!(h.path(), vec!["root1", "grp1", "grp2"]);
        assert!(h.child_group.as_deref().unwrap().child_group.is_some());
    }

    #[tokio::test]
    async fn lone_sub_command_gets_default_root() {
        let router = RouterOptions::default().with_hierarchy(true);
        let parsed = resolve_with(GrammarOptions::default(), router, "solo")
            .await
            .unwrap();
        let h = parsed.hierarchy.unwrap();
        assert!(h.is_default);
        assert_eq!(h.command.id, crate::model::DEFAULT_ROOT_ID);
        assert_eq!(h.child_subcommand.as_deref().unwrap().command.id, "solo");
    }

    #[tokio::test]
    async fn lone_sub_command_without_hierarchy() {
        let parsed = resolve("solo").await.unwrap();
        assert!(parsed.hierarchy.is_none());
    }

    #[tokio::test]
    async fn implicit_root_disabled() {
        let router = RouterOptions::default()
            .with_hierarchy(true)
            .with_implicit_root(false);
        let err = resolve_with(GrammarOptions::default(), router, "solo")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCommand);
        assert_eq!(err.to_string(), "The root command is missing. command=solo");
    }

    #[tokio::test]
    async fn ids_compare_case_insensitively() {
        let parsed = resolve("ROOT1 Grp1 CMD2 a --OPT1 x").await.unwrap();
        assert_eq!(parsed.command.id(), "cmd2");
        assert_eq!(parsed.command.option("opt1").unwrap().value(), "x");
    }
}
