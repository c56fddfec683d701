//! Canonical cache-key derivation for all five key families.
//!
//! Two logically equivalent requests MUST derive byte-identical keys, or
//! the cache hit rate collapses. [`KeyCoder`] is the single place that
//! concatenates user-controlled values into a key, and it never does so
//! without hashing first.

use crate::models::graph::RelationDirection;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;

/// Separator joining canonicalised components before hashing. Chosen to be
/// unlikely to appear inside a criterion value, bounding (not eliminating)
/// accidental collisions between differently-shaped inputs.
const HASH_JOIN: &str = "\u{2225}";

/// Derives canonical keys for the five cached-entity/ID-list families.
///
/// Every key is prefixed with the per-deployment [`RepositoryConfig::cache_prefix`](crate::config::RepositoryConfig::cache_prefix).
#[derive(Debug, Clone)]
pub struct KeyCoder {
    prefix: String,
}

impl KeyCoder {
    /// Creates a coder using `prefix` as the per-deployment namespace.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Key for a single cached `Node`.
    #[must_use]
    pub fn node(&self, id: &str) -> String {
        format!("{}:node:{id}", self.prefix)
    }

    /// Key for a single cached `Relation`.
    #[must_use]
    pub fn relation(&self, id: &str) -> String {
        format!("{}:relation:{id}", self.prefix)
    }

    /// Key for a `SearchNodes` ID-list.
    #[must_use]
    pub fn search_nodes(
        &self,
        criteria: &HashMap<String, String>,
        type_tag: &str,
        limit: usize,
        offset: usize,
    ) -> String {
        let digest = hash_one(&canonical_criteria(criteria));
        format!(
            "{}:search:nodes:ids:{digest}:{type_tag}:{limit}:{offset}",
            self.prefix
        )
    }

    /// Key for a `GetNetwork` ID-list.
    #[must_use]
    pub fn network<R: Display, N: Display>(
        &self,
        criteria: &HashMap<String, String>,
        rel_types: &[R],
        node_types: &[N],
        depth: u32,
        limit: usize,
        offset: usize,
    ) -> String {
        let digest = hash_many(&[
            &canonical_criteria(criteria),
            &canonical_enum_slice(rel_types),
            &canonical_enum_slice(node_types),
        ]);
        format!(
            "{}:network:graph:ids:{digest}:{depth}:{limit}:{offset}",
            self.prefix
        )
    }

    /// Key for a `GetPath` ID-list.
    #[must_use]
    pub fn path<R: Display>(
        &self,
        source_id: &str,
        target_id: &str,
        max_depth: u32,
        rel_types: &[R],
    ) -> String {
        let digest = hash_one(&canonical_enum_slice(rel_types));
        format!(
            "{}:network:path:ids:{source_id}:{target_id}:{max_depth}:{digest}",
            self.prefix
        )
    }

    /// Key for a `GetNodeRelations` ID-list.
    #[must_use]
    pub fn node_relations<T: Display>(
        &self,
        node_id: &str,
        direction: RelationDirection,
        types: &[T],
        limit: usize,
        offset: usize,
    ) -> String {
        let digest = hash_one(&canonical_enum_slice(types));
        format!(
            "{}:relation:list:ids:{node_id}:{}:{digest}:{limit}:{offset}",
            self.prefix,
            direction.as_key_tag()
        )
    }
}

/// The enum-name tag used in `SearchNodes` keys: the type name when a
/// filter is set, otherwise the literal `ANY`.
#[must_use]
pub fn type_tag<T: Display>(filter: Option<T>) -> String {
    filter.map_or_else(|| "ANY".to_string(), |t| t.to_string())
}

/// Sorts criteria by key and joins as `k=v` pairs separated by `|`.
fn canonical_criteria(criteria: &HashMap<String, String>) -> String {
    let mut pairs: Vec<(&String, &String)> = criteria.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("|")
}

/// Stringifies, deduplicates, and sorts an enum slice before joining.
fn canonical_enum_slice<T: Display>(items: &[T]) -> String {
    let set: BTreeSet<String> = items.iter().map(ToString::to_string).collect();
    set.into_iter().collect::<Vec<_>>().join(",")
}

fn hash_one(part: &str) -> String {
    hex::encode(Sha256::digest(part.as_bytes()))
}

fn hash_many(parts: &[&str]) -> String {
    hash_one(&parts.join(HASH_JOIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::graph::RelationType;

    fn coder() -> KeyCoder {
        KeyCoder::new("gc")
    }

    #[test]
    fn node_key_is_stable() {
        assert_eq!(coder().node("n1"), "gc:node:n1");
    }

    #[test]
    fn search_key_is_order_independent_over_criteria() {
        let mut a = HashMap::new();
        a.insert("name".to_string(), "Ali".to_string());
        a.insert("profession".to_string(), "Engineer".to_string());

        let mut b = HashMap::new();
        b.insert("profession".to_string(), "Engineer".to_string());
        b.insert("name".to_string(), "Ali".to_string());

        assert_eq!(
            coder().search_nodes(&a, "ANY", 10, 0),
            coder().search_nodes(&b, "ANY", 10, 0)
        );
    }

    #[test]
    fn network_key_is_order_independent_over_type_slices() {
        let criteria = HashMap::new();
        let rel_a = [RelationType::Colleague, RelationType::Friend];
        let rel_b = [RelationType::Friend, RelationType::Colleague];
        let node_types: [crate::models::graph::NodeType; 0] = [];

        assert_eq!(
            coder().network(&criteria, &rel_a, &node_types, 1, 100, 0),
            coder().network(&criteria, &rel_b, &node_types, 1, 100, 0)
        );
    }

    #[test]
    fn network_key_dedupes_type_slices() {
        let criteria = HashMap::new();
        let rel_a = [RelationType::Colleague];
        let rel_b = [RelationType::Colleague, RelationType::Colleague];
        let node_types: [crate::models::graph::NodeType; 0] = [];

        assert_eq!(
            coder().network(&criteria, &rel_a, &node_types, 1, 100, 0),
            coder().network(&criteria, &rel_b, &node_types, 1, 100, 0)
        );
    }

    #[test]
    fn different_criteria_produce_different_keys() {
        let mut a = HashMap::new();
        a.insert("name".to_string(), "Ali".to_string());
        let mut b = HashMap::new();
        b.insert("name".to_string(), "Bob".to_string());

        assert_ne!(
            coder().search_nodes(&a, "ANY", 10, 0),
            coder().search_nodes(&b, "ANY", 10, 0)
        );
    }

    #[test]
    fn type_tag_is_any_when_no_filter() {
        assert_eq!(type_tag::<crate::models::graph::NodeType>(None), "ANY");
    }
}
