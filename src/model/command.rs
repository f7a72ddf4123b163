//! Resolved commands: bound arguments/options and the optional hierarchy.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::descriptor::{ArgumentDescriptor, CommandDescriptor, CommandType, OptionDescriptor};
use super::request::Request;
use crate::text::TextHandler;

/// A positional value bound to its argument slot.
#[derive(Debug, Clone)]
pub struct BoundArgument {
    pub descriptor: ArgumentDescriptor,
    pub value: String,
}

impl BoundArgument {
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn typed(&self) -> serde_json::Value {
        self.descriptor.data_type.coerce(&self.value)
    }
}

/// An option value bound to its descriptor.
///
/// Shared between the canonical id and the alias key of a [`BoundCommand`],
/// so the value is interior-mutable: a write through one key is read back
/// through the other.
#[derive(Debug)]
pub struct BoundOption {
    pub descriptor: OptionDescriptor,
    pub by_alias: bool,
    value: RwLock<String>,
}

impl BoundOption {
    pub fn new(descriptor: OptionDescriptor, value: impl Into<String>, by_alias: bool) -> Self {
        Self {
            descriptor,
            by_alias,
            value: RwLock::new(value.into()),
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn value(&self) -> String {
        self.value.read().clone()
    }

    pub fn set_value(&self, value: impl Into<String>) {
        *self.value.write() = value.into();
    }

    pub fn typed(&self) -> serde_json::Value {
        self.descriptor.data_type.coerce(&self.value.read())
    }
}

/// A descriptor with its resolved arguments and options.
#[derive(Debug, Clone)]
pub struct BoundCommand {
    pub descriptor: Arc<CommandDescriptor>,
    pub arguments: Vec<BoundArgument>,
    options: HashMap<String, Arc<BoundOption>>,
    text: TextHandler,
}

impl BoundCommand {
    pub fn new(descriptor: Arc<CommandDescriptor>, text: TextHandler) -> Self {
        Self {
            descriptor,
            arguments: Vec::new(),
            options: HashMap::new(),
            text,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Insert an option under its canonical id and, if present, its alias.
    /// Both keys hold the same `Arc`.
    pub fn bind_option(&mut self, option: BoundOption) -> Arc<BoundOption> {
        let shared = Arc::new(option);
        self.options
            .insert(self.text.normalize(&shared.descriptor.id), Arc::clone(&shared));
        if let Some(alias) = shared.descriptor.alias.as_deref() {
            self.options
                .insert(self.text.normalize(alias), Arc::clone(&shared));
        }
        shared
    }

    /// Look up an option by canonical id or alias (no prefix).
    pub fn option(&self, key: &str) -> Option<&Arc<BoundOption>> {
        self.options.get(&self.text.normalize(key))
    }

    pub fn argument(&self, id: &str) -> Option<&BoundArgument> {
        self.arguments.iter().find(|a| self.text.equals(a.id(), id))
    }

    /// Distinct bound options (each alias pair counted once), sorted by id.
    pub fn distinct_options(&self) -> Vec<Arc<BoundOption>> {
        let mut seen: Vec<Arc<BoundOption>> = Vec::new();
        for opt in self.options.values() {
            if !seen.iter().any(|s| Arc::ptr_eq(s, opt)) {
                seen.push(Arc::clone(opt));
            }
        }
        seen.sort_by(|a, b| a.id().cmp(b.id()));
        seen
    }

    /// Number of option keys (canonical + alias).
    pub fn option_key_count(&self) -> usize {
        self.options.len()
    }
}

/// One node of the root -> leaf ancestry chain.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub command: Arc<CommandDescriptor>,
    pub child_group: Option<Box<HierarchyNode>>,
    pub child_subcommand: Option<Box<HierarchyNode>>,
    pub is_default: bool,
}

impl HierarchyNode {
    pub fn new(command: Arc<CommandDescriptor>) -> Self {
        Self {
            command,
            child_group: None,
            child_subcommand: None,
            is_default: false,
        }
    }

    /// Build the chain from an ordered root -> leaf path. Returns `None` for
    /// an empty path.
    pub fn from_path(path: &[Arc<CommandDescriptor>]) -> Option<Self> {
        path.iter().rev().fold(None, |child, command| {
            let mut node = HierarchyNode::new(Arc::clone(command));
            node.attach(child);
            Some(node)
        })
    }

    /// Wrap `self` under a synthesized default root.
    pub fn under_default_root(self) -> Self {
        let mut root = HierarchyNode::new(Arc::new(CommandDescriptor::default_root()));
        root.is_default = true;
        root.attach(Some(self));
        root
    }

    fn attach(&mut self, child: Option<HierarchyNode>) {
        let Some(child) = child else {
            return;
        };
        match child.command.command_type {
            CommandType::SubCommand => self.child_subcommand = Some(Box::new(child)),
            _ => self.child_group = Some(Box::new(child)),
        }
    }

    pub fn child(&self) -> Option<&HierarchyNode> {
        self.child_group
            .as_deref()
            .or(self.child_subcommand.as_deref())
    }

    /// Command ids from this node down to the leaf.
    pub fn path(&self) -> Vec<&str> {
        let mut out = vec![self.command.id.as_str()];
        let mut cur = self.child();
        while let Some(node) = cur {
            out.push(node.command.id.as_str());
            cur = node.child();
        }
        out
    }
}

/// Immutable result of one resolution.
#[derive(Debug, Clone)]
pub struct ParsedCommand {
    pub command: BoundCommand,
    pub hierarchy: Option<HierarchyNode>,
    pub request: Request,
}

impl ParsedCommand {
    /// JSON summary for CLI output and the default executor.
    pub fn to_json(&self) -> serde_json::Value {
        let arguments: Vec<serde_json::Value> = self
            .command
            .arguments
            .iter()
            .map(|a| {
                serde_json::json!({
                    "id": a.id(),
                    "type": a.descriptor.data_type.as_str(),
                    "value": a.typed(),
                })
            })
            .collect();
        let options: Vec<serde_json::Value> = self
            .command
            .distinct_options()
            .iter()
            .map(|o| {
                serde_json::json!({
                    "id": o.id(),
                    "alias": o.descriptor.alias,
                    "type": o.descriptor.data_type.as_str(),
                    "by_alias": o.by_alias,
                    "value": o.typed(),
                })
            })
            .collect();
        serde_json::json!({
            "request_id": self.request.id,
            "raw": self.request.raw,
            "command": self.command.id(),
            "type": self.command.descriptor.command_type.to_string(),
            "arguments": arguments,
            "options": options,
            "hierarchy": self.hierarchy.as_ref().map(|h| h.path()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::descriptor::DataType;

    #[test]
    fn alias_and_canonical_share_one_value() {
        let desc = Arc::new(CommandDescriptor::root("r"));
        let mut cmd = BoundCommand::new(desc, TextHandler::default());
        cmd.bind_option(BoundOption::new(
            OptionDescriptor::new("opt1", DataType::Text).with_alias("o1"),
            "a",
            false,
        ));

        let canonical = cmd.option("opt1").unwrap();
        let alias = cmd.option("o1").unwrap();
        assert!(Arc::ptr_eq(canonical, alias));

        alias.set_value("b");
        assert_eq!(cmd.option("opt1").unwrap().value(), "b");
        assert_eq!(cmd.option_key_count(), 2);
        assert_eq!(cmd.distinct_options().len(), 1);
    }

    #[test]
    fn hierarchy_from_path_links_by_type() {
        let root = Arc::new(CommandDescriptor::root("root1"));
        let grp = Arc::new(CommandDescriptor::group("grp1", "root1"));
        let cmd = Arc::new(CommandDescriptor::sub_command("cmd1", "grp1"));
        let h = HierarchyNode::from_path(&[root, grp, cmd]).unwrap();

        assert_eq!(h.path(), vec!["root1", "grp1", "cmd1"]);
        let g = h.child_group.as_deref().unwrap();
        assert!(h.child_subcommand.is_none());
        assert_eq!(g.child_subcommand.as_deref().unwrap().command.id, "cmd1");
        assert!(!h.is_default);
    }

    #[test]
    fn default_root_wraps_chain() {
        let cmd = Arc::new(CommandDescriptor::new("cmd1", CommandType::SubCommand));
        let h = HierarchyNode::from_path(&[cmd]).unwrap().under_default_root();
        assert!(h.is_default);
        assert!(h.command.is_root());
        assert_eq!(h.child_subcommand.as_deref().unwrap().command.id, "cmd1");
    }
}
