use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::CatalogError;
use crate::key::MarkerKey;

/// On-disk catalog layout.
///
/// ```toml
/// section = "Resources"   # optional
///
/// [items]
/// bismor = "00112233445566778899aabbccddeeff"
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    items: BTreeMap<String, String>,
}

/// Read-only mapping from item name to marker key.
///
/// Supplied by the caller at lookup time; nothing in the scanner hard-codes
/// item identifiers.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    section: Option<String>,
    items: BTreeMap<String, MarkerKey>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(src: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(src)?;
        let mut items = BTreeMap::new();
        for (item, hex) in file.items {
            let key = hex
                .parse::<MarkerKey>()
                .map_err(|source| CatalogError::InvalidKey {
                    item: item.clone(),
                    source,
                })?;
            items.insert(item, key);
        }
        Ok(Self {
            section: file.section,
            items,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_toml_str(&src)?;
        debug!(path = %path.display(), items = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Section marker the catalog's keys live under, if it names one.
    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    pub fn set_section(&mut self, section: Option<String>) {
        self.section = section;
    }

    pub fn insert(&mut self, name: impl Into<String>, key: MarkerKey) -> Option<MarkerKey> {
        self.items.insert(name.into(), key)
    }

    /// Exact name match first, then ASCII case-insensitive.
    pub fn get(&self, name: &str) -> Option<&MarkerKey> {
        self.items.get(name).or_else(|| {
            self.items
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    /// Items in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MarkerKey)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
