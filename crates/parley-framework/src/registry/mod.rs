//! The command registry.
//!
//! [`CommandRegistry`] indexes loaded [`Command`]s by primary name and by
//! alias. It is a cheap [`Clone`] handle; every clone sees the same commands.
//! The name map and alias map sit behind one lock, so a concurrent lookup
//! sees a command either fully loaded or fully gone.

mod alias;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::command::Command;
use crate::error::{RegistryError, RegistryResult};

pub(crate) use alias::{AliasTable, TableError};

impl From<TableError> for RegistryError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::DuplicateName(name) => RegistryError::DuplicateName(name),
            TableError::DuplicateAlias { alias, owner } => {
                RegistryError::DuplicateAlias { alias, owner }
            }
            TableError::NotFound(key) => RegistryError::NotFound(key),
            TableError::NotAnAlias(key) => RegistryError::NotAnAlias(key),
        }
    }
}

/// Loaded commands, indexed by name and alias.
///
/// Lookups fold case unless the registry was built with
/// [`case_sensitive`](Self::case_sensitive).
#[derive(Clone)]
pub struct CommandRegistry {
    table: Arc<RwLock<AliasTable<Arc<Command>>>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::with_case_sensitivity(false)
    }

    /// Creates a registry whose keys are matched exactly.
    pub fn case_sensitive() -> Self {
        Self::with_case_sensitivity(true)
    }

    pub fn with_case_sensitivity(case_sensitive: bool) -> Self {
        Self {
            table: Arc::new(RwLock::new(AliasTable::new(case_sensitive))),
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.table.read().is_case_sensitive()
    }

    /// Loads a command under its name and aliases.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] or [`RegistryError::DuplicateAlias`]
    /// if any trigger is taken. The registry is unchanged on error.
    pub fn load(&self, command: Command) -> RegistryResult<Arc<Command>> {
        let command = Arc::new(command);
        self.table
            .write()
            .insert(command.name(), command.aliases(), command.clone())?;
        debug!(command = %command.name(), aliases = ?command.aliases(), "Command loaded");
        Ok(command)
    }

    /// Unloads the command answering to `key` and releases all its aliases.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if nothing answers to `key`.
    pub fn unload(&self, key: &str) -> RegistryResult<Arc<Command>> {
        let (name, command) = self.table.write().remove(key)?;
        debug!(command = %name, "Command unloaded");
        Ok(command)
    }

    /// Looks up a command by name or alias.
    pub fn get(&self, key: &str) -> Option<Arc<Command>> {
        self.table.read().get(key).cloned()
    }

    /// Returns the primary name `key` resolves to.
    pub fn resolve(&self, key: &str) -> Option<String> {
        self.table.read().resolve(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.table.read().contains(key)
    }

    /// Adds an alias to the command answering to `key`.
    pub fn add_alias(&self, key: &str, alias: &str) -> RegistryResult<()> {
        self.table.write().add_alias(key, alias)?;
        Ok(())
    }

    /// Removes an alias, returning the name it pointed to.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotAnAlias`] if `alias` is a primary name.
    pub fn remove_alias(&self, alias: &str) -> RegistryResult<String> {
        Ok(self.table.write().remove_alias(alias)?)
    }

    /// Current aliases of a command, including ones added after loading.
    pub fn aliases_of(&self, key: &str) -> Option<Vec<String>> {
        self.table.read().aliases_of(key).map(<[String]>::to_vec)
    }

    /// Primary names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.table.read().names()
    }

    /// Every loaded command, sorted by name.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        let mut commands: Vec<Arc<Command>> =
            self.table.read().values().map(|(_, c)| c.clone()).collect();
        commands.sort_by(|a, b| a.name().cmp(b.name()));
        commands
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}
