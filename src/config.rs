//! Configuration for the tokenizer grammar, router and request processor.
//!
//! All sections deserialize with per-field defaults, so a config file only
//! needs the keys it overrides. Files are JSON or YAML (chosen by extension).

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Result, invalid_configuration};
use crate::text::TextHandler;

/// Top-level options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerminalOptions {
    #[serde(default)]
    pub text: TextOptions,
    #[serde(default)]
    pub grammar: GrammarOptions,
    #[serde(default)]
    pub router: RouterOptions,
    #[serde(default)]
    pub processor: ProcessorOptions,
}

/// Text comparison rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextOptions {
    /// Compare command and option ids case-sensitively
    #[serde(default)]
    pub case_sensitive: bool,
}

/// Tokenizer grammar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarOptions {
    /// Splits raw input into tokens (repeats collapse)
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Marks an option written by its canonical id
    #[serde(default = "default_option_prefix")]
    pub option_prefix: String,

    /// Marks an option written by its alias
    #[serde(default = "default_option_alias_prefix")]
    pub option_alias_prefix: String,

    /// Joins an option to its value; falls back to `separator` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_value_separator: Option<String>,

    /// Quotes a value so separators inside it are kept verbatim
    #[serde(default = "default_value_delimiter")]
    pub value_delimiter: char,
}

fn default_separator() -> String {
    " ".to_string()
}

fn default_option_prefix() -> String {
    "--".to_string()
}

fn default_option_alias_prefix() -> String {
    "-".to_string()
}

fn default_value_delimiter() -> char {
    '"'
}

impl Default for GrammarOptions {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            option_prefix: default_option_prefix(),
            option_alias_prefix: default_option_alias_prefix(),
            option_value_separator: None,
            value_delimiter: default_value_delimiter(),
        }
    }
}

impl GrammarOptions {
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_option_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.option_prefix = prefix.into();
        self
    }

    pub fn with_option_alias_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.option_alias_prefix = prefix.into();
        self
    }

    pub fn with_option_value_separator(mut self, separator: impl Into<String>) -> Self {
        self.option_value_separator = Some(separator.into());
        self
    }

    /// Effective option value separator.
    pub fn value_separator(&self) -> &str {
        self.option_value_separator
            .as_deref()
            .unwrap_or(self.separator.as_str())
    }

    pub fn with_value_delimiter(mut self, delimiter: char) -> Self {
        self.value_delimiter = delimiter;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("separator", self.separator.as_str()),
            ("option_prefix", self.option_prefix.as_str()),
            ("option_alias_prefix", self.option_alias_prefix.as_str()),
            ("option_value_separator", self.value_separator()),
        ] {
            if value.is_empty() {
                return Err(invalid_configuration(
                    "The grammar setting cannot be empty.",
                    &[("setting", name)],
                ));
            }
        }
        if self.option_prefix == self.option_alias_prefix {
            return Err(invalid_configuration(
                "The option prefix and the alias prefix cannot be the same.",
                &[("prefix", &self.option_prefix)],
            ));
        }
        let delimiter = self.value_delimiter.to_string();
        if self.separator.contains(self.value_delimiter)
            || self.value_separator().contains(self.value_delimiter)
        {
            return Err(invalid_configuration(
                "The value delimiter cannot be part of a separator.",
                &[("delimiter", &delimiter)],
            ));
        }
        Ok(())
    }
}

/// Route resolution behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterOptions {
    /// Record the root -> leaf ancestry chain on every parsed command
    #[serde(default)]
    pub enable_hierarchy: bool,

    /// Synthesize a default root when a route does not start at one
    #[serde(default = "default_true")]
    pub implicit_root: bool,

    /// Execution time after which a timeout is reported (milliseconds)
    #[serde(default = "default_router_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_router_timeout_ms() -> u64 {
    30000 // 30 seconds
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            enable_hierarchy: false,
            implicit_root: default_true(),
            timeout_ms: default_router_timeout_ms(),
        }
    }
}

impl RouterOptions {
    pub fn with_hierarchy(mut self, enabled: bool) -> Self {
        self.enable_hierarchy = enabled;
        self
    }

    pub fn with_implicit_root(mut self, enabled: bool) -> Self {
        self.implicit_root = enabled;
        self
    }

    pub fn with_timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout_ms = timeout;
        self
    }
}

/// Request ingestion and queueing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorOptions {
    /// Require batch framing on every ingested string
    #[serde(default)]
    pub batch_enabled: bool,

    /// Terminates a batch (exactly once, at the end)
    #[serde(default = "default_batch_delimiter")]
    pub batch_delimiter: String,

    /// Separates commands inside a batch
    #[serde(default = "default_command_delimiter")]
    pub command_delimiter: String,

    /// Maximum raw length in characters
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Queue capacity; producers wait when it is full
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Upper bound for the final drain after cancellation (milliseconds)
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

fn default_batch_delimiter() -> String {
    "$b$".to_string()
}

fn default_command_delimiter() -> String {
    "$c$".to_string()
}

fn default_max_length() -> usize {
    64 * 1024
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_drain_timeout_ms() -> u64 {
    5000
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            batch_enabled: false,
            batch_delimiter: default_batch_delimiter(),
            command_delimiter: default_command_delimiter(),
            max_length: default_max_length(),
            queue_capacity: default_queue_capacity(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

impl ProcessorOptions {
    /// Builder pattern: enable batch framing with the given delimiters
    pub fn with_batch(
        mut self,
        batch_delimiter: impl Into<String>,
        command_delimiter: impl Into<String>,
    ) -> Self {
        self.batch_enabled = true;
        self.batch_delimiter = batch_delimiter.into();
        self.command_delimiter = command_delimiter.into();
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_drain_timeout_ms(mut self, timeout: u64) -> Self {
        self.drain_timeout_ms = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_delimiter.is_empty() || self.command_delimiter.is_empty() {
            return Err(invalid_configuration(
                "The batch and command delimiters cannot be empty.",
                &[],
            ));
        }
        if self.queue_capacity == 0 {
            return Err(invalid_configuration(
                "The queue capacity must be greater than zero.",
                &[],
            ));
        }
        if self.max_length == 0 {
            return Err(invalid_configuration(
                "The maximum request length must be greater than zero.",
                &[],
            ));
        }
        Ok(())
    }
}

impl TerminalOptions {
    pub fn with_grammar(mut self, grammar: GrammarOptions) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn with_router(mut self, router: RouterOptions) -> Self {
        self.router = router;
        self
    }

    pub fn with_processor(mut self, processor: ProcessorOptions) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.text.case_sensitive = case_sensitive;
        self
    }

    pub fn text_handler(&self) -> TextHandler {
        TextHandler::new(self.text.case_sensitive)
    }

    pub fn validate(&self) -> Result<()> {
        self.grammar.validate()?;
        self.processor.validate()
    }

    /// Load options from a JSON or YAML file and validate them.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let options: TerminalOptions = load_structured(path)?;
        options.validate()?;
        Ok(options)
    }
}

/// Read a JSON or YAML file (by extension) into `T`.
pub(crate) fn load_structured<T>(path: &Path) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    let lower = path.to_string_lossy().to_ascii_lowercase();
    if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse YAML file: {}", path.display()))
    } else {
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse JSON file: {}", path.display()))
    }
}
