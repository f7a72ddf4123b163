/*!
Command catalog.

The resolver only needs id lookups, so the collaborator interface is the
narrow [`CommandCatalog`] trait. [`InMemoryCatalog`] is the implementation
the CLI and the tests use; it loads from a JSON or YAML file of the form
`{ "commands": [ <CommandDescriptor>, ... ] }` and checks the ownership rules
when it is built:
  - ids are unique (under the active text rules)
  - a root has no owners
  - a group or sub-command has at most one owner, and the owner exists
  - a sub-command owns nothing
*/

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Result, invalid_command, invalid_configuration};
use crate::model::{CommandDescriptor, CommandType};
use crate::text::TextHandler;

/// Read-only command lookup.
#[async_trait]
pub trait CommandCatalog: Send + Sync {
    async fn try_find_by_id(&self, id: &str) -> Result<Option<Arc<CommandDescriptor>>>;

    async fn all(&self) -> Result<HashMap<String, Arc<CommandDescriptor>>>;
}

/// Catalog held in memory, keyed by normalized id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    commands: HashMap<String, Arc<CommandDescriptor>>,
    text: TextHandler,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    commands: Vec<CommandDescriptor>,
}

impl InMemoryCatalog {
    pub fn new(commands: Vec<CommandDescriptor>, text: TextHandler) -> Result<Self> {
        let mut map: HashMap<String, Arc<CommandDescriptor>> = HashMap::new();
        for mut desc in commands {
            if desc.id.trim().is_empty() {
                return Err(invalid_configuration("The command id cannot be empty.", &[]));
            }
            if desc.name.is_empty() {
                desc.name = desc.id.clone();
            }
            desc.arguments.sort_by_key(|a| a.order);
            let key = text.normalize(&desc.id);
            if map.contains_key(&key) {
                return Err(invalid_configuration(
                    "The command is already registered.",
                    &[("command", &desc.id)],
                ));
            }
            map.insert(key, Arc::new(desc));
        }

        let catalog = Self {
            commands: map,
            text,
        };
        catalog.check_ownership()?;
        Ok(catalog)
    }

    /// Load `{ commands: [...] }` from a JSON or YAML file.
    pub fn load(path: impl AsRef<Path>, text: TextHandler) -> anyhow::Result<Self> {
        let file: CatalogFile = crate::config::load_structured(path.as_ref())?;
        Ok(Self::new(file.commands, text)?)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Arc<CommandDescriptor>> {
        self.commands.get(&self.text.normalize(id)).cloned()
    }

    /// Descriptors sorted by id.
    pub fn sorted(&self) -> Vec<Arc<CommandDescriptor>> {
        let mut all: Vec<_> = self.commands.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    fn check_ownership(&self) -> Result<()> {
        for desc in self.commands.values() {
            match desc.command_type {
                CommandType::Root => {
                    if !desc.owner_ids.is_empty() {
                        return Err(invalid_command(
                            "The root command cannot have an owner.",
                            &[("command", &desc.id)],
                        ));
                    }
                }
                CommandType::Group | CommandType::SubCommand => {
                    if desc.owner_ids.len() > 1 {
                        let owners = desc.owner_ids.join(",");
                        return Err(invalid_command(
                            "The command cannot have more than one owner.",
                            &[("command", &desc.id), ("owners", &owners)],
                        ));
                    }
                    if let Some(owner_id) = desc.owner() {
                        let Some(owner) = self.get(owner_id) else {
                            return Err(invalid_command(
                                "The command owner is not registered.",
                                &[("command", &desc.id), ("owner", owner_id)],
                            ));
                        };
                        if owner.command_type == CommandType::SubCommand {
                            return Err(invalid_command(
                                "The sub-command cannot own a command.",
                                &[("owner", &owner.id), ("command", &desc.id)],
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CommandCatalog for InMemoryCatalog {
    async fn try_find_by_id(&self, id: &str) -> Result<Option<Arc<CommandDescriptor>>> {
        Ok(self.get(id))
    }

    async fn all(&self) -> Result<HashMap<String, Arc<CommandDescriptor>>> {
        Ok(self
            .commands
            .values()
            .map(|d| (d.id.clone(), Arc::clone(d)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn lookup_is_case_insensitive_by_default() {
        let catalog = InMemoryCatalog::new(
            vec![CommandDescriptor::root("Root1")],
            TextHandler::default(),
        )
        .unwrap();
        let found = catalog.try_find_by_id("root1").await.unwrap();
        assert_eq!(found.unwrap().id, "Root1");
        assert!(catalog.try_find_by_id("root2").await.unwrap().is_none());
        assert_eq!(catalog.all().await.unwrap().len(), 1);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = InMemoryCatalog::new(
            vec![CommandDescriptor::root("r"), CommandDescriptor::root("R")],
            TextHandler::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert_eq!(err.to_string(), "The command is already registered. command=R");
    }

    #[test]
    fn unknown_owner_rejected() {
        let err = InMemoryCatalog::new(
            vec![CommandDescriptor::group("grp1", "nope")],
            TextHandler::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The command owner is not registered. command=grp1 owner=nope"
        );
    }

    #[test]
    fn root_with_owner_rejected() {
        let err = InMemoryCatalog::new(
            vec![
                CommandDescriptor::root("r1"),
                CommandDescriptor::root("r2").with_owner("r1"),
            ],
            TextHandler::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCommand);
    }

    #[test]
    fn sub_command_cannot_own() {
        let err = InMemoryCatalog::new(
            vec![
                CommandDescriptor::new("leaf", CommandType::SubCommand),
                CommandDescriptor::sub_command("child", "leaf"),
            ],
            TextHandler::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The sub-command cannot own a command. owner=leaf command=child"
        );
    }

    #[test]
    fn load_yaml_catalog() {
        let path = std::env::temp_dir().join("termroute_catalog_test.yaml");
        std::fs::write(
            &path,
            "commands:\n  - id: root1\n    type: root\n  - id: grp1\n    type: group\n    owners: [root1]\n",
        )
        .unwrap();
        let catalog = InMemoryCatalog::load(&path, TextHandler::default()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("grp1").unwrap().name, "grp1");
    }
}
