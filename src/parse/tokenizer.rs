/*!
Request tokenizer.

Turns one raw request into ordered tokens plus an option table, under the
active [`GrammarOptions`]:

  root1 grp1 cmd1 "a b" --opt1 val -o2 --flag
  └────┴────┴────┴─────┘ tokens   └──────┴──┴─────┘ options

Rules:
  - separators split tokens; runs collapse; leading/trailing are dropped
  - a value delimiter toggles a quoted span; the delimiter itself is dropped
    and separators inside the span are kept. Spans do not nest: the next
    delimiter always closes the open span, so `"a "b c" d"` yields `a b`
    and `c d`
  - the longer of the two option prefixes is matched first
  - after an option key, runs of value separators / separators are skipped;
    the following text is the value unless it is another option (or the end
    of input), in which case the value is `"true"`
  - a key written twice keeps its last value
*/

use std::collections::HashMap;

use crate::config::GrammarOptions;
use crate::error::{Result, invalid_argument, invalid_command, invalid_option};
use crate::model::{ParsedOption, ParsedRequest, Request};

/// Value written for an option that has no explicit value.
pub const IMPLICIT_OPTION_VALUE: &str = "true";

#[derive(Debug, Clone, Default)]
pub struct RequestTokenizer {
    grammar: GrammarOptions,
}

impl RequestTokenizer {
    pub fn new(grammar: GrammarOptions) -> Self {
        Self { grammar }
    }

    pub fn tokenize(&self, request: &Request) -> Result<ParsedRequest> {
        if request.id.trim().is_empty() {
            return Err(invalid_command(
                "The request id is missing.",
                &[("raw", &request.raw)],
            ));
        }

        let mut cursor = Cursor::new(&request.raw, &self.grammar);
        let mut tokens = Vec::new();
        let mut options = HashMap::new();

        loop {
            cursor.skip_separators();
            if cursor.at_end() {
                break;
            }

            let Some(by_alias) = cursor.option_prefix() else {
                tokens.push(cursor.read_value(ValueOwner::Argument)?);
                continue;
            };

            let key = cursor.read_option_key(by_alias)?;
            cursor.skip_value_separators();
            let value = if cursor.at_end() || cursor.option_prefix().is_some() {
                IMPLICIT_OPTION_VALUE.to_string()
            } else {
                cursor.read_value(ValueOwner::Option(&key))?
            };
            options.insert(key, ParsedOption { value, by_alias });
        }

        Ok(ParsedRequest {
            request: request.clone(),
            tokens,
            options,
        })
    }
}

enum ValueOwner<'k> {
    Argument,
    Option(&'k str),
}

/// Byte cursor over the raw text.
struct Cursor<'a> {
    raw: &'a str,
    pos: usize,
    grammar: &'a GrammarOptions,
}

impl<'a> Cursor<'a> {
    fn new(raw: &'a str, grammar: &'a GrammarOptions) -> Self {
        Self {
            raw,
            pos: 0,
            grammar,
        }
    }

    fn rest(&self) -> &'a str {
        &self.raw[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.raw.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self, ch: char) {
        self.pos += ch.len_utf8();
    }

    fn skip(&mut self, pat: &str) -> bool {
        if !pat.is_empty() && self.rest().starts_with(pat) {
            self.pos += pat.len();
            true
        } else {
            false
        }
    }

    fn skip_separators(&mut self) {
        let grammar = self.grammar;
        while self.skip(&grammar.separator) {}
    }

    fn skip_value_separators(&mut self) {
        let grammar = self.grammar;
        while self.skip(grammar.value_separator()) || self.skip(&grammar.separator) {}
    }

    fn at_separator(&self) -> bool {
        self.rest().starts_with(self.grammar.separator.as_str())
    }

    fn at_key_end(&self) -> bool {
        self.at_separator()
            || self.rest().starts_with(self.grammar.value_separator())
    }

    /// `Some(by_alias)` when the cursor sits on an option prefix.
    fn option_prefix(&self) -> Option<bool> {
        let name = self.grammar.option_prefix.as_str();
        let alias = self.grammar.option_alias_prefix.as_str();
        let rest = self.rest();
        if name.len() >= alias.len() {
            if rest.starts_with(name) {
                Some(false)
            } else if rest.starts_with(alias) {
                Some(true)
            } else {
                None
            }
        } else if rest.starts_with(alias) {
            Some(true)
        } else if rest.starts_with(name) {
            Some(false)
        } else {
            None
        }
    }

    /// Read `<prefix><name>`; the name ends at a separator or value separator.
    fn read_option_key(&mut self, by_alias: bool) -> Result<String> {
        let grammar = self.grammar;
        let prefix = if by_alias {
            &grammar.option_alias_prefix
        } else {
            &grammar.option_prefix
        };
        let start = self.pos;
        self.pos += prefix.len();
        let name_start = self.pos;
        while let Some(ch) = self.peek() {
            if self.at_key_end() {
                break;
            }
            self.bump(ch);
        }
        if self.pos == name_start {
            return Err(invalid_option(
                "The option name is missing.",
                &[("token", prefix)],
            ));
        }
        Ok(self.raw[start..self.pos].to_string())
    }

    /// Read one value up to the next separator outside a delimited span.
    fn read_value(&mut self, owner: ValueOwner<'_>) -> Result<String> {
        let delimiter = self.grammar.value_delimiter;
        let start = self.pos;
        let mut out = String::new();
        let mut open = false;

        while let Some(ch) = self.peek() {
            if !open && self.at_separator() {
                break;
            }
            self.bump(ch);
            if ch == delimiter {
                open = !open;
            } else {
                out.push(ch);
            }
        }

        if open {
            let written = &self.raw[start..self.pos];
            return Err(match owner {
                ValueOwner::Argument => invalid_argument(
                    "The argument value is missing the closing delimiter.",
                    &[("argument", written)],
                ),
                ValueOwner::Option(key) => invalid_option(
                    "The option value is missing the closing delimiter.",
                    &[("option", key), ("value", written)],
                ),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn tokenize(raw: &str) -> Result<ParsedRequest> {
        RequestTokenizer::default().tokenize(&Request::with_id("id1", raw))
    }

    fn tokenize_with(grammar: GrammarOptions, raw: &str) -> Result<ParsedRequest> {
        RequestTokenizer::new(grammar).tokenize(&Request::with_id("id1", raw))
    }

    #[test]
    fn splits_and_collapses_separators() {
        let parsed = tokenize("   root1    grp1  cmd1   ").unwrap();
        assert_eq!(parsed.tokens, vec!["root1", "grp1", "cmd1"]);
        assert!(parsed.options.is_empty());
    }

    #[test]
    fn plain_text_matches_naive_split() {
        for raw in ["a b c", "  x  ", "one", "p1   p2 p3   p4", "", "   "] {
            let expected: Vec<&str> = raw.split(' ').filter(|s| !s.is_empty()).collect();
            assert_eq!(tokenize(raw).unwrap().tokens, expected, "raw={raw:?}");
        }
    }

    #[test]
    fn delimited_span_keeps_separators() {
        let parsed = tokenize(r#""a b c""#).unwrap();
        assert_eq!(parsed.tokens, vec!["a b c"]);

        let parsed = tokenize(r#"cmd1 "  spaced  out  " tail"#).unwrap();
        assert_eq!(parsed.tokens, vec!["cmd1", "  spaced  out  ", "tail"]);
    }

    #[test]
    fn empty_delimited_span_is_an_empty_token() {
        let parsed = tokenize(r#"cmd1 """#).unwrap();
        assert_eq!(parsed.tokens, vec!["cmd1", ""]);
    }

    #[test]
    fn nested_delimiters_close_nearest_span() {
        let parsed = tokenize(r#"root1 "a "b c" d""#).unwrap();
        assert_eq!(parsed.tokens, vec!["root1", "a b", "c d"]);
    }

    #[test]
    fn unterminated_argument_span_fails() {
        let err = tokenize(r#"root1 "a b"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            err.to_string(),
            r#"The argument value is missing the closing delimiter. argument="a b"#
        );
    }

    #[test]
    fn unterminated_option_span_fails() {
        let err = tokenize(r#"root1 --opt1 "val"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
        assert_eq!(
            err.to_string(),
            r#"The option value is missing the closing delimiter. option=--opt1 value="val"#
        );
    }

    #[test]
    fn options_by_name_and_alias() {
        let parsed = tokenize("cmd1 arg1 --opt1 v1 -o2 v2").unwrap();
        assert_eq!(parsed.tokens, vec!["cmd1", "arg1"]);

        let opt1 = parsed.option("--opt1").unwrap();
        assert_eq!(opt1.value, "v1");
        assert!(!opt1.by_alias);

        let o2 = parsed.option("-o2").unwrap();
        assert_eq!(o2.value, "v2");
        assert!(o2.by_alias);
    }

    #[test]
    fn option_without_value_is_true() {
        let parsed = tokenize("cmd1 --flag1 --flag2 -f3").unwrap();
        assert_eq!(parsed.option("--flag1").unwrap().value, "true");
        assert_eq!(parsed.option("--flag2").unwrap().value, "true");
        assert_eq!(parsed.option("-f3").unwrap().value, "true");
    }

    #[test]
    fn option_value_delimited() {
        let parsed = tokenize(r#"cmd1 --opt1 "hello   world" --opt2 x"#).unwrap();
        assert_eq!(parsed.option("--opt1").unwrap().value, "hello   world");
        assert_eq!(parsed.option("--opt2").unwrap().value, "x");
    }

    #[test]
    fn repeated_value_separators_are_ignored() {
        let grammar = GrammarOptions::default().with_option_value_separator("=");
        let parsed = tokenize_with(grammar, r#"root1 grp1 cmd1 --opt3====="val""#).unwrap();
        assert_eq!(parsed.tokens, vec!["root1", "grp1", "cmd1"]);
        assert_eq!(parsed.option("--opt3").unwrap().value, "val");
    }

    #[test]
    fn equals_as_the_only_separator() {
        let grammar = GrammarOptions::default().with_separator("=");
        let parsed = tokenize_with(grammar, r#"root1=grp1=cmd1=--opt3====="val""#).unwrap();
        assert_eq!(parsed.tokens, vec!["root1", "grp1", "cmd1"]);
        assert_eq!(parsed.option("--opt3").unwrap().value, "val");
    }

    #[test]
    fn value_separator_defaults_to_custom_separator() {
        let grammar = GrammarOptions::default().with_separator(",");
        let parsed = tokenize_with(grammar, "root1,--opt1 x,arg").unwrap();
        assert_eq!(parsed.tokens, vec!["root1"]);
        assert_eq!(parsed.options.len(), 1);
        assert_eq!(parsed.option("--opt1 x").unwrap().value, "arg");
    }

    #[test]
    fn custom_separator_and_value_separator() {
        let grammar = GrammarOptions::default()
            .with_separator("::")
            .with_option_value_separator("=");
        let parsed = tokenize_with(grammar, "::root1::::grp1::--opt1=a b::-o2").unwrap();
        assert_eq!(parsed.tokens, vec!["root1", "grp1"]);
        assert_eq!(parsed.option("--opt1").unwrap().value, "a b");
        assert_eq!(parsed.option("-o2").unwrap().value, "true");
    }

    #[test]
    fn custom_delimiter() {
        let grammar = GrammarOptions::default().with_value_delimiter('\'');
        let parsed = tokenize_with(grammar, r#"cmd1 'a "b" c'"#).unwrap();
        assert_eq!(parsed.tokens, vec!["cmd1", r#"a "b" c"#]);
    }

    #[test]
    fn longer_prefix_wins_when_alias_prefix_is_longer() {
        let grammar = GrammarOptions::default()
            .with_option_prefix("-")
            .with_option_alias_prefix("--");
        let parsed = tokenize_with(grammar, "cmd1 -opt1 a --o2 b").unwrap();
        assert!(!parsed.option("-opt1").unwrap().by_alias);
        assert!(parsed.option("--o2").unwrap().by_alias);
    }

    #[test]
    fn duplicate_option_last_write_wins() {
        let parsed = tokenize("cmd1 --opt1 first --opt1 second").unwrap();
        assert_eq!(parsed.options.len(), 1);
        assert_eq!(parsed.option("--opt1").unwrap().value, "second");
    }

    #[test]
    fn prefix_without_name_fails() {
        let err = tokenize("cmd1 -- value").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
        assert_eq!(err.to_string(), "The option name is missing. token=--");
    }

    #[test]
    fn missing_request_id_fails() {
        let err = RequestTokenizer::default()
            .tokenize(&Request::with_id("  ", "root1"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCommand);
        assert_eq!(err.to_string(), "The request id is missing. raw=root1");
    }

    #[test]
    fn unicode_text_is_kept() {
        let parsed = tokenize(r#"cmd1 "héllo wörld" ünï"#).unwrap();
        assert_eq!(parsed.tokens, vec!["cmd1", "héllo wörld", "ünï"]);
    }
}
