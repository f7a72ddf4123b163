//! Raw requests and their tokenized form.

use std::collections::HashMap;

use crate::processor::ids::new_unique_id;

/// One raw command as received from a transport or API caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: String,
    pub raw: String,
    pub sender_id: Option<String>,
    pub sender_endpoint: Option<String>,
    pub batch_id: Option<String>,
}

impl Request {
    /// New request with a generated id.
    pub fn new(raw: impl Into<String>) -> Self {
        Self::with_id(new_unique_id(None), raw)
    }

    pub fn with_id(id: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            raw: raw.into(),
            sender_id: None,
            sender_endpoint: None,
            batch_id: None,
        }
    }

    pub fn with_sender(mut self, sender_id: Option<String>, sender_endpoint: Option<String>) -> Self {
        self.sender_id = sender_id;
        self.sender_endpoint = sender_endpoint;
        self
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }
}

/// An option as written in the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOption {
    pub value: String,
    pub by_alias: bool,
}

/// Tokenizer output: ordered tokens plus the option table.
///
/// `options` is keyed by the option token as written, prefix included
/// (`--opt1`, `-o1`). A key written twice keeps the last value.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub request: Request,
    pub tokens: Vec<String>,
    pub options: HashMap<String, ParsedOption>,
}

impl ParsedRequest {
    pub fn option(&self, key: &str) -> Option<&ParsedOption> {
        self.options.get(key)
    }
}
