// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class id to label mapping for the leaf disease detector

use serde::Serialize;
use std::collections::BTreeMap;

/// Labels the custom-trained leaf model was trained on, indexed by class id
pub const LEAF_DISEASE_CLASSES: [(u32, &str); 3] =
    [(0, "Die Back"), (1, "Healthy"), (2, "Powder Mildew")];

/// Immutable class registry
///
/// Built once at startup and shared read-only. There are no mutating
/// methods; a different label set means a new registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassRegistry {
    classes: BTreeMap<u32, String>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::from_pairs(LEAF_DISEASE_CLASSES)
    }
}

impl ClassRegistry {
    /// Build a registry from `(id, label)` pairs
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, &'a str)>,
    {
        Self {
            classes: pairs
                .into_iter()
                .map(|(id, name)| (id, name.to_string()))
                .collect(),
        }
    }

    /// Resolve a class id to its label
    ///
    /// Ids outside the registry get a synthesized `Unknown_<id>` label.
    pub fn resolve(&self, class_id: u32) -> String {
        self.classes
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| format!("Unknown_{}", class_id))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.classes.iter().map(|(id, name)| (*id, name.as_str()))
    }
}
