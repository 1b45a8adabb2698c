//! Static registry of the bridged collection.
//!
//! Loaded once at startup from a JSON array of `{id, meta}` objects. Token
//! ids are positional: the nth surviving item mints token n. Items with an
//! empty id, or an id already seen earlier in the file, are dropped.

use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("failed to read collection file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid collection json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCollectionItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub meta: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct CollectionItem {
    pub inscription_id: String,
    pub token_id: u64,
    pub meta: serde_json::Value,
}

pub struct CollectionRegistry {
    items: Vec<CollectionItem>,
    by_id: HashMap<String, usize>,
}

impl CollectionRegistry {
    pub fn load(path: &Path) -> Result<Self, CollectionError> {
        let raw = fs::read(path).map_err(|source| CollectionError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let items: Vec<RawCollectionItem> = serde_json::from_slice(&raw)?;
        Ok(Self::from_raw(items))
    }

    pub fn from_raw(raw: Vec<RawCollectionItem>) -> Self {
        let mut items = Vec::with_capacity(raw.len());
        let mut by_id = HashMap::with_capacity(raw.len());

        for entry in raw {
            if entry.id.is_empty() {
                warn!("skipping collection item with empty id");
                continue;
            }
            if by_id.contains_key(&entry.id) {
                warn!(id = %entry.id, "skipping duplicate collection item");
                continue;
            }
            let token_id = items.len() as u64;
            by_id.insert(entry.id.clone(), items.len());
            items.push(CollectionItem {
                inscription_id: entry.id,
                token_id,
                meta: entry.meta,
            });
        }

        Self { items, by_id }
    }

    pub fn by_inscription_id(&self, inscription_id: &str) -> Option<&CollectionItem> {
        self.by_id.get(inscription_id).map(|&i| &self.items[i])
    }

    pub fn by_token_id(&self, token_id: u64) -> Option<&CollectionItem> {
        self.items.get(token_id as usize)
    }

    pub fn contains(&self, inscription_id: &str) -> bool {
        self.by_id.contains_key(inscription_id)
    }

    pub fn items(&self) -> &[CollectionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
