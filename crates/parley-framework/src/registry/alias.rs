use std::collections::HashMap;

/// A rejected table mutation. Callers map it onto their own error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TableError {
    DuplicateName(String),
    DuplicateAlias { alias: String, owner: String },
    NotFound(String),
    NotAnAlias(String),
}

struct Entry<T> {
    value: T,
    aliases: Vec<String>,
}

/// Entries keyed by a primary name, each owning a set of aliases.
///
/// Every mutation is checked in full before anything is written, so a
/// rejected call leaves both maps untouched and a successful one updates them
/// together.
pub(crate) struct AliasTable<T> {
    entries: HashMap<String, Entry<T>>,
    aliases: HashMap<String, String>,
    case_sensitive: bool,
}

impl<T> AliasTable<T> {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            entries: HashMap::new(),
            aliases: HashMap::new(),
            case_sensitive,
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn key(&self, key: &str) -> String {
        if self.case_sensitive {
            key.to_string()
        } else {
            key.to_lowercase()
        }
    }

    /// Returns the primary name owning `key`, whether `key` is itself a name
    /// or an alias.
    fn owner_of(&self, key: &str) -> Option<&str> {
        if let Some((name, _)) = self.entries.get_key_value(key) {
            return Some(name);
        }
        self.aliases.get(key).map(String::as_str)
    }

    pub fn insert<I, S>(&mut self, name: &str, aliases: I, value: T) -> Result<(), TableError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = self.key(name);
        if let Some(owner) = self.owner_of(&name) {
            return Err(if owner == name {
                TableError::DuplicateName(name)
            } else {
                TableError::DuplicateAlias {
                    alias: name.clone(),
                    owner: owner.to_string(),
                }
            });
        }

        let mut owned: Vec<String> = Vec::new();
        for alias in aliases {
            let alias = self.key(alias.as_ref());
            if alias == name || owned.contains(&alias) {
                continue;
            }
            if let Some(owner) = self.owner_of(&alias) {
                return Err(TableError::DuplicateAlias {
                    alias,
                    owner: owner.to_string(),
                });
            }
            owned.push(alias);
        }

        for alias in &owned {
            self.aliases.insert(alias.clone(), name.clone());
        }
        self.entries.insert(
            name,
            Entry {
                value,
                aliases: owned,
            },
        );
        Ok(())
    }

    /// Removes the entry answering to `key` together with all its aliases.
    pub fn remove(&mut self, key: &str) -> Result<(String, T), TableError> {
        let key = self.key(key);
        let name = self
            .owner_of(&key)
            .map(str::to_string)
            .ok_or_else(|| TableError::NotFound(key.clone()))?;
        let entry = self
            .entries
            .remove(&name)
            .ok_or(TableError::NotFound(key))?;
        for alias in &entry.aliases {
            self.aliases.remove(alias);
        }
        Ok((name, entry.value))
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        let key = self.key(key);
        let name = self.owner_of(&key)?;
        self.entries.get(name).map(|e| &e.value)
    }

    pub fn resolve(&self, key: &str) -> Option<String> {
        self.owner_of(&self.key(key)).map(str::to_string)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.owner_of(&self.key(key)).is_some()
    }

    /// Adds `alias` to the entry answering to `key`.
    pub fn add_alias(&mut self, key: &str, alias: &str) -> Result<(), TableError> {
        let key = self.key(key);
        let alias = self.key(alias);
        let name = self
            .owner_of(&key)
            .map(str::to_string)
            .ok_or_else(|| TableError::NotFound(key))?;
        if let Some(owner) = self.owner_of(&alias) {
            return Err(TableError::DuplicateAlias {
                alias,
                owner: owner.to_string(),
            });
        }
        let entry = self
            .entries
            .get_mut(&name)
            .ok_or_else(|| TableError::NotFound(name.clone()))?;
        entry.aliases.push(alias.clone());
        self.aliases.insert(alias, name);
        Ok(())
    }

    /// Removes one alias; the owning entry stays.
    pub fn remove_alias(&mut self, alias: &str) -> Result<String, TableError> {
        let alias = self.key(alias);
        if self.entries.contains_key(&alias) {
            return Err(TableError::NotAnAlias(alias));
        }
        let name = self
            .aliases
            .remove(&alias)
            .ok_or_else(|| TableError::NotFound(alias.clone()))?;
        if let Some(entry) = self.entries.get_mut(&name) {
            entry.aliases.retain(|a| *a != alias);
        }
        Ok(name)
    }

    /// Current aliases of the entry answering to `key`.
    pub fn aliases_of(&self, key: &str) -> Option<&[String]> {
        let name = self.owner_of(&self.key(key))?;
        self.entries.get(name).map(|e| e.aliases.as_slice())
    }

    /// Primary names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, e)| (name.as_str(), &e.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
