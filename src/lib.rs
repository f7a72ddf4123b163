/*!
termroute - text command routing for terminal front ends.

Pipeline:
  raw text --tokenizer--> ParsedRequest --resolver (catalog)--> ParsedCommand
  many producers --bounded queue--> one consumer --> CommandExecutor

Modules:
  - config     : grammar, router and processor options (JSON / YAML)
  - text       : case-sensitivity rules shared by every comparison
  - model      : descriptors, requests, bound commands, hierarchy
  - catalog    : command lookup trait + in-memory catalog
  - parse      : tokenizer, route resolver, parser façade
  - processor  : batch framing, request queue, consumer loop
  - error      : error kinds and the crate error type
*/

pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod parse;
pub mod processor;
pub mod text;

pub use catalog::{CommandCatalog, InMemoryCatalog};
pub use config::TerminalOptions;
pub use error::{ErrorKind, Result, TermError};
pub use parse::CommandParser;
pub use processor::{
    CommandExecutor, ExceptionHandler, ProcessingContext, RequestProcessor, Response,
    RoutingContext,
};
pub use text::TextHandler;
