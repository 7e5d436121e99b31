//! Unit definition lookup for build commands.

use std::collections::HashMap;

/// Maps unit definition ids to unit definition names.
///
/// The table is supplied by the caller and may be incomplete, typically
/// for old replays whose unit list changed since. Lookups that miss fall
/// back to the raw command id.
///
/// # Examples
///
/// ```
/// use sdfz_command::UnitDefTable;
///
/// let table = UnitDefTable::from_names(["armcom", "armpw", "corcom"]);
/// assert_eq!(table.get(2), Some("armpw"));
/// assert_eq!(table.resolve(-3), "corcom");
/// assert_eq!(table.resolve(-99), "-99");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitDefTable {
    names: HashMap<u32, String>,
}

impl UnitDefTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from names in engine order. Ids are assigned from 1,
    /// matching the engine's 1-based unit definition ids.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names
            .into_iter()
            .zip(1u32..)
            .map(|(name, id)| (id, name.into()))
            .collect();
        Self { names }
    }

    /// Register or replace a single entry.
    pub fn insert(&mut self, id: u32, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    /// Name for a unit definition id.
    pub fn get(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Resolve the unit definition of a build command id.
    ///
    /// Uses the magnitude of `command_id`; when the table has no entry the
    /// raw id is returned as a string.
    pub fn resolve(&self, command_id: i32) -> String {
        match self.get(command_id.unsigned_abs()) {
            Some(name) => name.to_owned(),
            None => command_id.to_string(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(u32, String)> for UnitDefTable {
    fn from_iter<T: IntoIterator<Item = (u32, String)>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
