//! Lookup table loaders
//!
//! Reads the entity allow-set and the page to entity map into memory.
//! Both tables are loaded once per run and never mutated afterwards.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::{info, warn};

use linkds_core::{normalize_id, EntityId, JsonId, LinkdsError, PageId, Result};

// ============================================================================
// Allow-set
// ============================================================================

/// Entities eligible to appear as labels in the dataset
#[derive(Debug, Clone, Default)]
pub struct AllowSet {
    entities: HashSet<EntityId>,
}

impl AllowSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, entity: &EntityId) -> bool {
        self.entities.contains(entity)
    }

    pub fn insert(&mut self, entity: EntityId) -> bool {
        self.entities.insert(entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FromIterator<EntityId> for AllowSet {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        Self {
            entities: iter.into_iter().collect(),
        }
    }
}

/// Load the allow-set, choosing the reader from the file extension
///
/// `.csv` files are read as a table with `columns` merged together;
/// anything else is treated as a pre-serialized set.
pub fn load_allow_set(path: &Path, columns: &[String]) -> Result<AllowSet> {
    if has_extension(path, "csv") {
        load_allow_set_csv(path, columns)
    } else {
        load_allow_set_serialized(path)
    }
}

/// Load the allow-set from a table, merging every non-empty cell of `columns`
pub fn load_allow_set_csv(path: &Path, columns: &[String]) -> Result<AllowSet> {
    let mut reader = open_table(path)?;
    let headers = reader
        .headers()
        .map_err(|e| table_error(path, e))?
        .clone();

    let positions = columns
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| LinkdsError::MissingColumn {
                    path: path.to_path_buf(),
                    column: column.clone(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut allow_set = AllowSet::new();
    for row in reader.records() {
        let row = row.map_err(|e| table_error(path, e))?;
        for &position in &positions {
            let id = row.get(position).map(normalize_id).unwrap_or_default();
            if !id.is_empty() {
                allow_set.insert(EntityId::new(id));
            }
        }
    }

    info!(
        "Loaded {} allowed entities from {}",
        allow_set.len(),
        path.display()
    );
    Ok(allow_set)
}

/// Load a pre-serialized set of entity ids
///
/// `.json` files hold an array of ids (strings or numbers); other files are
/// a bincode-encoded sequence of strings.
pub fn load_allow_set_serialized(path: &Path) -> Result<AllowSet> {
    let bytes = std::fs::read(path).map_err(|e| LinkdsError::io(path, e))?;

    let ids: Vec<String> = if has_extension(path, "json") {
        serde_json::from_slice::<Vec<JsonId>>(&bytes)
            .map_err(|e| LinkdsError::Serialization(format!("{}: {e}", path.display())))?
            .into_iter()
            .map(JsonId::into_text)
            .collect()
    } else {
        bincode::deserialize(&bytes)
            .map_err(|e| LinkdsError::Serialization(format!("{}: {e}", path.display())))?
    };

    let allow_set: AllowSet = ids
        .iter()
        .map(|id| normalize_id(id))
        .filter(|id| !id.is_empty())
        .map(EntityId::new)
        .collect();
    info!(
        "Loaded {} allowed entities from {}",
        allow_set.len(),
        path.display()
    );
    Ok(allow_set)
}

// ============================================================================
// Page map
// ============================================================================

/// Outcome of resolving a page through the page map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLookup<'a> {
    /// Page is not in the map at all
    Missing,
    /// Page row exists but has no entity
    Unmapped,
    /// Page resolves to an entity
    Mapped(&'a EntityId),
}

/// Page id to entity id mapping
#[derive(Debug, Clone, Default)]
pub struct PageMap {
    pages: HashMap<PageId, Option<EntityId>>,
}

impl PageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `page` to `entity`, returning `true` if the page was already present
    pub fn insert(&mut self, page: PageId, entity: Option<EntityId>) -> bool {
        self.pages.insert(page, entity).is_some()
    }

    pub fn lookup(&self, page: &PageId) -> PageLookup<'_> {
        match self.pages.get(page) {
            None => PageLookup::Missing,
            Some(None) => PageLookup::Unmapped,
            Some(Some(entity)) => PageLookup::Mapped(entity),
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl FromIterator<(PageId, EntityId)> for PageMap {
    fn from_iter<I: IntoIterator<Item = (PageId, EntityId)>>(iter: I) -> Self {
        Self {
            pages: iter
                .into_iter()
                .map(|(page, entity)| (page, Some(entity)))
                .collect(),
        }
    }
}

/// Load the page map: first column is the page id, `entity_column` the entity
///
/// Rows repeating an earlier page id replace it.
pub fn load_page_map(path: &Path, entity_column: &str) -> Result<PageMap> {
    let mut reader = open_table(path)?;
    let headers = reader
        .headers()
        .map_err(|e| table_error(path, e))?
        .clone();

    let entity_position = headers
        .iter()
        .position(|h| h == entity_column)
        .ok_or_else(|| LinkdsError::MissingColumn {
            path: path.to_path_buf(),
            column: entity_column.to_string(),
        })?;

    let mut page_map = PageMap::new();
    let mut duplicates = 0usize;

    for row in reader.records() {
        let row = row.map_err(|e| table_error(path, e))?;
        let page = row.get(0).map(normalize_id).unwrap_or_default();
        let entity = row
            .get(entity_position)
            .map(normalize_id)
            .filter(|id| !id.is_empty())
            .map(EntityId::new);

        if page_map.insert(PageId::new(page), entity) {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        warn!(
            "{} duplicate page ids in {}; later rows replaced earlier ones",
            duplicates,
            path.display()
        );
    }

    info!("Loaded {} pages from {}", page_map.len(), path.display());
    Ok(page_map)
}

// ============================================================================
// Helpers
// ============================================================================

fn open_table(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).map_err(|e| LinkdsError::io(path, e))?;
    Ok(csv::Reader::from_reader(BufReader::new(file)))
}

fn table_error(path: &Path, err: csv::Error) -> LinkdsError {
    LinkdsError::Table {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

// ============================================================================
// Tests
// ============================================================================
