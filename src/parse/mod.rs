//! Raw text -> bound command.

pub mod parser;
pub mod resolver;
pub mod tokenizer;

pub use parser::CommandParser;
pub use resolver::RouteResolver;
pub use tokenizer::{IMPLICIT_OPTION_VALUE, RequestTokenizer};
