//! Command parser façade: tokenizer -> resolver against a shared catalog.

use std::sync::Arc;

use crate::catalog::CommandCatalog;
use crate::config::TerminalOptions;
use crate::error::Result;
use crate::model::{ParsedCommand, ParsedRequest, Request};

use super::resolver::RouteResolver;
use super::tokenizer::RequestTokenizer;

#[derive(Clone)]
pub struct CommandParser {
    tokenizer: RequestTokenizer,
    resolver: RouteResolver,
    catalog: Arc<dyn CommandCatalog>,
}

impl CommandParser {
    pub fn new(options: &TerminalOptions, catalog: Arc<dyn CommandCatalog>) -> Self {
        Self {
            tokenizer: RequestTokenizer::new(options.grammar.clone()),
            resolver: RouteResolver::new(
                options.grammar.clone(),
                options.router.clone(),
                options.text_handler(),
            ),
            catalog,
        }
    }

    pub fn tokenize(&self, request: &Request) -> Result<ParsedRequest> {
        self.tokenizer.tokenize(request)
    }

    pub async fn parse(&self, request: Request) -> Result<ParsedCommand> {
        let parsed = self.tokenizer.tokenize(&request)?;
        self.resolver.resolve(parsed, self.catalog.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::error::ErrorKind;
    use crate::model::CommandDescriptor;

    fn parser() -> CommandParser {
        let options = TerminalOptions::default();
        let catalog = InMemoryCatalog::new(
            vec![
                CommandDescriptor::root("root1"),
                CommandDescriptor::group("grp1", "root1"),
            ],
            options.text_handler(),
        )
        .unwrap();
        CommandParser::new(&options, Arc::new(catalog))
    }

    #[tokio::test]
    async fn parse_end_to_end() {
        let parsed = parser().parse(Request::with_id("r1", "root1 grp1")).await.unwrap();
        assert_eq!(parsed.command.id(), "grp1");
        assert_eq!(parsed.request.raw, "root1 grp1");
    }

    #[tokio::test]
    async fn tokenizer_failure_stops_before_resolution() {
        let err = parser()
            .parse(Request::with_id("r1", r#"root1 "grp1"#))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
