//! Ship registry: read-only table of ship stats loaded once at startup.
//! Shared by reference (or `Arc`) with every fleet build and batch worker; never mutated after load.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::data::ship::ShipStats;

/// Reference table could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("unable to read ship table '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed ship table row {row}: {source}")]
    Malformed {
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("ship table row {row} has an empty name")]
    EmptyName { row: usize },
    #[error("ship '{name}' has invalid {field} {value} (must be a finite number >= 0)")]
    InvalidStat {
        name: String,
        field: &'static str,
        value: f64,
    },
    #[error("duplicate ship name '{name}' at row {row}")]
    DuplicateName { name: String, row: usize },
}

/// Lookup of a name the registry does not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ship '{name}' not found in registry")]
pub struct NotFoundError {
    pub name: String,
}

/// Normalize a ship name for lookup: lowercase, collapse spaces/underscores.
pub fn normalize_lookup(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '_' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Rows are numbered from 1 with the header as row 1, matching what a spreadsheet shows.
const FIRST_DATA_ROW: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct ShipRegistry {
    ships: Vec<Arc<ShipStats>>,
    by_key: HashMap<String, usize>,
}

impl ShipRegistry {
    /// Load a registry from CSV with a header row. Fails on the first malformed row.
    pub fn load<R: Read>(source: R) -> Result<Self, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);

        let mut registry = Self::default();
        for (index, row) in reader.deserialize::<ShipStats>().enumerate() {
            let row_number = index + FIRST_DATA_ROW;
            let stats = row.map_err(|source| DataError::Malformed {
                row: row_number,
                source,
            })?;
            registry.insert(stats, row_number)?;
        }

        tracing::info!(ships = registry.len(), "ship registry loaded");
        Ok(registry)
    }

    pub fn load_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load(file)
    }

    /// Build from already-parsed stats, applying the same checks as [ShipRegistry::load].
    pub fn from_stats(stats: impl IntoIterator<Item = ShipStats>) -> Result<Self, DataError> {
        let mut registry = Self::default();
        for (index, ship) in stats.into_iter().enumerate() {
            registry.insert(ship, index + FIRST_DATA_ROW)?;
        }
        Ok(registry)
    }

    fn insert(&mut self, stats: ShipStats, row: usize) -> Result<(), DataError> {
        let key = normalize_lookup(&stats.name);
        if key.is_empty() {
            return Err(DataError::EmptyName { row });
        }
        if let Some((field, value)) = stats.invalid_field() {
            return Err(DataError::InvalidStat {
                name: stats.name,
                field,
                value,
            });
        }
        if self.by_key.contains_key(&key) {
            return Err(DataError::DuplicateName {
                name: stats.name,
                row,
            });
        }
        self.by_key.insert(key, self.ships.len());
        self.ships.push(Arc::new(stats));
        Ok(())
    }

    /// Resolve a ship by name (case-insensitive, spaces and underscores equivalent).
    pub fn lookup(&self, name: &str) -> Result<Arc<ShipStats>, NotFoundError> {
        self.by_key
            .get(&normalize_lookup(name))
            .map(|&index| Arc::clone(&self.ships[index]))
            .ok_or_else(|| NotFoundError {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    /// Ships in table order.
    pub fn ships(&self) -> impl Iterator<Item = &ShipStats> {
        self.ships.iter().map(Arc::as_ref)
    }
}
