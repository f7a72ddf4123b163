/*!
Command, argument and option descriptors.

Descriptors are owned by the catalog and read-only to the rest of the
crate. They deserialize from catalog files:

```yaml
commands:
  - id: root1
    type: root
  - id: grp1
    type: group
    owners: [root1]
  - id: cmd1
    type: subcommand
    owners: [grp1]
    arguments:
      - { order: 1, id: arg1, data_type: integer, required: true }
    options:
      - { id: opt1, alias: o1, data_type: boolean }
```
*/

use serde::{Deserialize, Serialize};

use crate::text::TextHandler;

/// Position of a command in the ownership hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Root,
    Group,
    SubCommand,
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CommandType::Root => "root",
            CommandType::Group => "group",
            CommandType::SubCommand => "subcommand",
        };
        f.write_str(s)
    }
}

/// Declared type of an argument or option value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Text,
    Integer,
    Number,
    Boolean,
    List,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Integer => "integer",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::List => "list",
        }
    }

    /// Coerce a raw bound value into JSON. Values that do not parse stay strings.
    pub fn coerce(&self, raw: &str) -> serde_json::Value {
        match self {
            DataType::Integer => raw
                .parse::<i64>()
                .map(|n| serde_json::Value::Number(n.into()))
                .unwrap_or_else(|_| serde_json::Value::String(raw.to_string())),
            DataType::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(raw.to_string())),
            DataType::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "y" => serde_json::Value::Bool(true),
                "false" | "0" | "no" | "n" => serde_json::Value::Bool(false),
                _ => serde_json::Value::String(raw.to_string()),
            },
            DataType::List => serde_json::Value::Array(
                raw.split(',')
                    .map(|s| serde_json::Value::String(s.trim().to_string()))
                    .collect(),
            ),
            DataType::Text => serde_json::Value::String(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandFlags {
    #[serde(default)]
    pub obsolete: bool,
}

/// Positional argument slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDescriptor {
    pub order: u32,
    pub id: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl ArgumentDescriptor {
    pub fn new(order: u32, id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            order,
            id: id.into(),
            data_type,
            description: String::new(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Named option, optionally reachable through an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDescriptor {
    pub id: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub obsolete: bool,
}

impl OptionDescriptor {
    pub fn new(id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            data_type,
            description: String::new(),
            alias: None,
            required: false,
            disabled: false,
            obsolete: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn obsolete(mut self) -> Self {
        self.obsolete = true;
        self
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    #[serde(default)]
    pub flags: CommandFlags,
    #[serde(default, rename = "owners")]
    pub owner_ids: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<ArgumentDescriptor>,
    #[serde(default)]
    pub options: Vec<OptionDescriptor>,
}

/// Id of the synthesized root used when a route has no explicit root.
pub const DEFAULT_ROOT_ID: &str = "$root$";

impl CommandDescriptor {
    pub fn new(id: impl Into<String>, command_type: CommandType) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            command_type,
            flags: CommandFlags::default(),
            owner_ids: Vec::new(),
            arguments: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn root(id: impl Into<String>) -> Self {
        Self::new(id, CommandType::Root)
    }

    pub fn group(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::new(id, CommandType::Group).with_owner(owner)
    }

    pub fn sub_command(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::new(id, CommandType::SubCommand).with_owner(owner)
    }

    /// The root synthesized for routes that do not start at a root.
    pub fn default_root() -> Self {
        let mut root = Self::root(DEFAULT_ROOT_ID);
        root.name = "default".to_string();
        root.description = "Default root command".to_string();
        root
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner_ids.push(owner.into());
        self
    }

    pub fn with_argument(mut self, argument: ArgumentDescriptor) -> Self {
        self.arguments.push(argument);
        self.arguments.sort_by_key(|a| a.order);
        self
    }

    pub fn with_option(mut self, option: OptionDescriptor) -> Self {
        self.options.push(option);
        self
    }

    pub fn obsolete(mut self) -> Self {
        self.flags.obsolete = true;
        self
    }

    pub fn is_root(&self) -> bool {
        self.command_type == CommandType::Root
    }

    /// The single owner of a group or sub-command.
    pub fn owner(&self) -> Option<&str> {
        self.owner_ids.first().map(String::as_str)
    }

    pub fn find_option(&self, id: &str, text: &TextHandler) -> Option<&OptionDescriptor> {
        self.options.iter().find(|o| text.equals(&o.id, id))
    }

    pub fn find_option_by_alias(&self, alias: &str, text: &TextHandler) -> Option<&OptionDescriptor> {
        self.options
            .iter()
            .find(|o| o.alias.as_deref().is_some_and(|a| text.equals(a, alias)))
    }
}
