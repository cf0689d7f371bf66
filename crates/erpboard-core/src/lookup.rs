//! id → display name maps for reference data

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{Id, Reference};

/// Display names by id, falling back to the raw id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NameMap {
    names: HashMap<Id, String>,
}

impl NameMap {
    pub fn from_references(references: &[Reference]) -> Self {
        let names = references
            .iter()
            .filter(|r| !r.name.is_empty())
            .map(|r| (r.id, r.name.clone()))
            .collect();
        Self { names }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (Id, String)>) -> Self {
        Self {
            names: pairs.into_iter().collect(),
        }
    }

    pub fn get(&self, id: Id) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Name for `id`, or the id itself when unknown
    pub fn name_or_id(&self, id: Id) -> String {
        self.get(id).map(str::to_string).unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Name maps derived from the reference datasets
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NameMaps {
    pub contacts: NameMap,
    pub users: NameMap,
    pub companies: NameMap,
    pub payment_methods: NameMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_or_id_fallback() {
        let map = NameMap::from_references(&[Reference::new(1, "Ana"), Reference::new(2, "")]);
        assert_eq!(map.name_or_id(1), "Ana");
        assert_eq!(map.name_or_id(2), "2");
        assert_eq!(map.name_or_id(99), "99");
        assert_eq!(map.len(), 1);
    }
}
