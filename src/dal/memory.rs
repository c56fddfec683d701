//! In-process reference implementation of [`GraphDal`], backed by
//! `RwLock`-guarded maps with breadth-first traversal for `GetNetwork` and
//! `GetPath`.
//!
//! This exists so the Entity Repository and Composite Query Engine are
//! exercised by tests without a live graph database. It is not a
//! production Cypher/Bolt driver.

use crate::dal::traits::GraphDal;
use crate::models::graph::{
    CreateNodeRequest, CreateRelationRequest, Node, NodeType, Relation, RelationType,
    UpdateNodeRequest, UpdateRelationRequest, strip_reserved_keys,
};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;
use uuid::Uuid;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn node_matches_one(node: &Node, key: &str, value: &str) -> bool {
    match key {
        "name" => node.name.contains(value),
        "profession" => node.profession.as_deref() == Some(value),
        other => node
            .properties
            .as_ref()
            .and_then(|props| props.get(other))
            .is_some_and(|v| v == value),
    }
}

fn node_matches_all(node: &Node, criteria: &HashMap<String, String>) -> bool {
    criteria.iter().all(|(k, v)| node_matches_one(node, k, v))
}

fn paginate<T: Clone>(items: &[T], limit: usize, offset: usize) -> Vec<T> {
    items.iter().skip(offset).take(limit).cloned().collect()
}

/// `RwLock`-guarded in-memory graph store.
#[derive(Default)]
pub struct InMemoryGraphDal {
    nodes: RwLock<HashMap<String, Node>>,
    relations: RwLock<HashMap<String, Relation>>,
}

impl InMemoryGraphDal {
    /// Creates an empty in-memory graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned(operation: &str) -> Error {
        Error::DalFailure {
            operation: operation.to_string(),
            cause: "lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl GraphDal for InMemoryGraphDal {
    async fn create_node(&self, request: CreateNodeRequest) -> Result<Node> {
        if request.name.trim().is_empty() {
            return Err(Error::InvalidParameter("node name is required".to_string()));
        }
        let Some(node_type) = request.node_type else {
            return Err(Error::InvalidParameter("node type is required".to_string()));
        };

        let timestamp = now();
        let mut node = Node::new(node_type, request.name).with_id(Uuid::new_v4().to_string());
        node.avatar = request.avatar;
        node.profession = request.profession;
        node.properties = request.properties.filter(|p| !p.is_empty());
        node.created_at = timestamp;
        node.updated_at = timestamp;

        let mut nodes = self.nodes.write().map_err(|_| Self::poisoned("create_node"))?;
        nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    async fn get_node_by_id(&self, id: &str) -> Result<Node> {
        let nodes = self.nodes.read().map_err(|_| Self::poisoned("get_node_by_id"))?;
        nodes
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("node {id}")))
    }

    async fn update_node(&self, request: UpdateNodeRequest) -> Result<Node> {
        let mut nodes = self.nodes.write().map_err(|_| Self::poisoned("update_node"))?;
        let node = nodes
            .get_mut(&request.id)
            .ok_or_else(|| Error::NotFound(format!("node {}", request.id)))?;

        if let Some(name) = request.name {
            node.name = name;
        }
        if let Some(avatar) = request.avatar {
            node.avatar = Some(avatar);
        }
        if let Some(profession) = request.profession {
            node.profession = Some(profession);
        }
        if let Some(mut updates) = request.properties {
            strip_reserved_keys(&mut updates);
            let mut merged = node.properties.clone().unwrap_or_default();
            merged.extend(updates);
            node.properties = (!merged.is_empty()).then_some(merged);
        }
        node.updated_at = now();
        Ok(node.clone())
    }

    async fn delete_node(&self, id: &str) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(|_| Self::poisoned("delete_node"))?;
        if nodes.remove(id).is_none() {
            return Err(Error::NotFound(format!("node {id}")));
        }
        drop(nodes);
        let mut relations = self
            .relations
            .write()
            .map_err(|_| Self::poisoned("delete_node"))?;
        relations.retain(|_, rel| rel.source_id != id && rel.target_id != id);
        Ok(())
    }

    async fn search_nodes(
        &self,
        criteria: &HashMap<String, String>,
        type_filter: Option<NodeType>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Node>, usize)> {
        if criteria.is_empty() {
            return Ok((Vec::new(), 0));
        }
        let nodes = self.nodes.read().map_err(|_| Self::poisoned("search_nodes"))?;
        let mut matches: Vec<Node> = nodes
            .values()
            .filter(|n| type_filter.is_none_or(|t| n.node_type == t))
            .filter(|n| node_matches_all(n, criteria))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        let total = matches.len();
        Ok((paginate(&matches, limit, offset), total))
    }

    async fn get_network(
        &self,
        start_criteria: &HashMap<String, String>,
        depth: u32,
        limit: usize,
        offset: usize,
        rel_types: Option<&[RelationType]>,
        node_types: Option<&[NodeType]>,
    ) -> Result<(Vec<Node>, Vec<Relation>)> {
        let nodes = self.nodes.read().map_err(|_| Self::poisoned("get_network"))?;
        let relations = self
            .relations
            .read()
            .map_err(|_| Self::poisoned("get_network"))?;

        let mut start_ids: Vec<String> = nodes
            .values()
            .filter(|n| node_matches_all(n, start_criteria))
            .map(|n| n.id.clone())
            .collect();
        start_ids.sort();

        if start_ids.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        if depth == 0 {
            let mut result: Vec<Node> = start_ids
                .iter()
                .filter_map(|id| nodes.get(id).cloned())
                .collect();
            result.sort_by(|a, b| a.id.cmp(&b.id));
            return Ok((paginate(&result, limit, offset), Vec::new()));
        }

        // Every node on a path, including its own start node, must satisfy
        // `node_types` when set: a start node whose label fails the filter
        // seeds no valid path at all, so it's dropped before traversal
        // rather than merely excluded from the result afterward.
        let traversal_start_ids: Vec<String> = start_ids
            .iter()
            .filter(|id| {
                node_types.is_none_or(|types| {
                    nodes.get(id.as_str()).is_some_and(|n| types.contains(&n.node_type))
                })
            })
            .cloned()
            .collect();

        if traversal_start_ids.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let mut adjacency: HashMap<&str, Vec<&Relation>> = HashMap::new();
        for rel in relations.values() {
            adjacency.entry(rel.source_id.as_str()).or_default().push(rel);
            adjacency.entry(rel.target_id.as_str()).or_default().push(rel);
        }

        let mut visited_nodes: HashSet<String> = traversal_start_ids.iter().cloned().collect();
        let mut visited_rels: HashSet<String> = HashSet::new();
        let mut frontier = traversal_start_ids.clone();

        for _ in 0..depth {
            let mut next_frontier = Vec::new();
            for node_id in &frontier {
                let Some(edges) = adjacency.get(node_id.as_str()) else {
                    continue;
                };
                for rel in edges {
                    if rel_types.is_some_and(|types| !types.contains(&rel.relation_type)) {
                        continue;
                    }
                    let other_id = if rel.source_id == *node_id {
                        &rel.target_id
                    } else {
                        &rel.source_id
                    };
                    let Some(other_node) = nodes.get(other_id) else {
                        continue;
                    };
                    if node_types.is_some_and(|types| !types.contains(&other_node.node_type)) {
                        continue;
                    }
                    visited_rels.insert(rel.id.clone());
                    if visited_nodes.insert(other_id.clone()) {
                        next_frontier.push(other_id.clone());
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }

        let mut result_nodes: Vec<Node> = visited_nodes
            .iter()
            .filter_map(|id| nodes.get(id).cloned())
            .collect();
        result_nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let paged_nodes = paginate(&result_nodes, limit, offset);
        let paged_ids: HashSet<&str> = paged_nodes.iter().map(|n| n.id.as_str()).collect();

        let mut result_rels: Vec<Relation> = visited_rels
            .iter()
            .filter_map(|id| relations.get(id).cloned())
            .filter(|r| {
                paged_ids.contains(r.source_id.as_str()) && paged_ids.contains(r.target_id.as_str())
            })
            .collect();
        result_rels.sort_by(|a, b| a.id.cmp(&b.id));

        Ok((paged_nodes, result_rels))
    }

    async fn get_path(
        &self,
        source_id: &str,
        target_id: &str,
        max_depth: u32,
        rel_types: Option<&[RelationType]>,
    ) -> Result<(Vec<Node>, Vec<Relation>)> {
        let nodes = self.nodes.read().map_err(|_| Self::poisoned("get_path"))?;
        let relations = self
            .relations
            .read()
            .map_err(|_| Self::poisoned("get_path"))?;

        if !nodes.contains_key(source_id) || !nodes.contains_key(target_id) {
            return Err(Error::NotFound(format!(
                "path {source_id} -> {target_id}"
            )));
        }

        let mut adjacency: HashMap<&str, Vec<&Relation>> = HashMap::new();
        for rel in relations.values() {
            if rel_types.is_some_and(|types| !types.is_empty() && !types.contains(&rel.relation_type))
            {
                continue;
            }
            adjacency.entry(rel.source_id.as_str()).or_default().push(rel);
        }

        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(source_id);
        let mut queue: VecDeque<(&str, u32)> = VecDeque::new();
        queue.push_back((source_id, 0));
        let mut predecessor: HashMap<&str, (&str, &Relation)> = HashMap::new();
        let mut found = false;

        'bfs: while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            if let Some(edges) = adjacency.get(current) {
                for rel in edges {
                    let next = rel.target_id.as_str();
                    if visited.contains(next) {
                        continue;
                    }
                    visited.insert(next);
                    predecessor.insert(next, (current, rel));
                    if next == target_id {
                        found = true;
                        break 'bfs;
                    }
                    queue.push_back((next, depth + 1));
                }
            }
        }

        if !found {
            return Err(Error::NotFound(format!(
                "no path from {source_id} to {target_id} within {max_depth} hops"
            )));
        }

        let mut path_node_ids: Vec<&str> = vec![target_id];
        let mut path_rels: Vec<Relation> = Vec::new();
        let mut cursor = target_id;
        while cursor != source_id {
            let (prev, rel) = predecessor.get(cursor).ok_or_else(|| Error::DalFailure {
                operation: "get_path".to_string(),
                cause: "predecessor chain broken".to_string(),
            })?;
            path_rels.push((*rel).clone());
            path_node_ids.push(prev);
            cursor = prev;
        }
        path_node_ids.reverse();
        path_rels.reverse();

        let mut path_nodes = Vec::with_capacity(path_node_ids.len());
        for id in path_node_ids {
            let node = nodes
                .get(id)
                .cloned()
                .ok_or_else(|| Error::DalFailure {
                    operation: "get_path".to_string(),
                    cause: format!("node {id} vanished mid-reconstruction"),
                })?;
            path_nodes.push(node);
        }

        Ok((path_nodes, path_rels))
    }

    async fn create_relation(&self, request: CreateRelationRequest) -> Result<Relation> {
        let nodes = self
            .nodes
            .read()
            .map_err(|_| Self::poisoned("create_relation"))?;
        if !nodes.contains_key(&request.source_id) {
            return Err(Error::NotFound(format!("node {}", request.source_id)));
        }
        if !nodes.contains_key(&request.target_id) {
            return Err(Error::NotFound(format!("node {}", request.target_id)));
        }
        drop(nodes);

        let timestamp = now();
        let mut relation = Relation::new(
            request.relation_type,
            request.source_id,
            request.target_id,
        )
        .with_id(Uuid::new_v4().to_string());
        relation.label = request.label;
        relation.properties = request.properties.filter(|p| !p.is_empty());
        relation.created_at = timestamp;
        relation.updated_at = timestamp;

        let mut relations = self
            .relations
            .write()
            .map_err(|_| Self::poisoned("create_relation"))?;
        relations.insert(relation.id.clone(), relation.clone());
        Ok(relation)
    }

    async fn get_relation_by_id(&self, id: &str) -> Result<Relation> {
        let relations = self
            .relations
            .read()
            .map_err(|_| Self::poisoned("get_relation_by_id"))?;
        relations
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("relation {id}")))
    }

    async fn update_relation(&self, request: UpdateRelationRequest) -> Result<Relation> {
        let mut relations = self
            .relations
            .write()
            .map_err(|_| Self::poisoned("update_relation"))?;
        let relation = relations
            .get_mut(&request.id)
            .ok_or_else(|| Error::NotFound(format!("relation {}", request.id)))?;

        if let Some(label) = request.label {
            relation.label = Some(label);
        }
        if let Some(mut updates) = request.properties {
            strip_reserved_keys(&mut updates);
            let mut merged = relation.properties.clone().unwrap_or_default();
            merged.extend(updates);
            relation.properties = (!merged.is_empty()).then_some(merged);
        }
        relation.updated_at = now();
        Ok(relation.clone())
    }

    async fn delete_relation(&self, id: &str) -> Result<()> {
        let mut relations = self
            .relations
            .write()
            .map_err(|_| Self::poisoned("delete_relation"))?;
        if relations.remove(id).is_none() {
            return Err(Error::NotFound(format!("relation {id}")));
        }
        Ok(())
    }

    async fn get_node_relations(
        &self,
        node_id: &str,
        types: Option<&[RelationType]>,
        outgoing: bool,
        incoming: bool,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Relation>, usize)> {
        if !outgoing && !incoming {
            return Ok((Vec::new(), 0));
        }
        let relations = self
            .relations
            .read()
            .map_err(|_| Self::poisoned("get_node_relations"))?;

        let mut matches: Vec<Relation> = relations
            .values()
            .filter(|r| {
                (outgoing && r.source_id == node_id) || (incoming && r.target_id == node_id)
            })
            .filter(|r| types.is_none_or(|t| t.is_empty() || t.contains(&r.relation_type)))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matches.len();
        Ok((paginate(&matches, limit, offset), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::graph::RelationType;

    fn node_request(node_type: NodeType, name: &str) -> CreateNodeRequest {
        CreateNodeRequest {
            node_type: Some(node_type),
            name: name.to_string(),
            avatar: None,
            profession: None,
            properties: None,
        }
    }

    #[tokio::test]
    async fn create_and_get_node_round_trips() {
        let dal = InMemoryGraphDal::new();
        let created = dal.create_node(node_request(NodeType::Person, "Alice")).await.unwrap();
        let fetched = dal.get_node_by_id(&created.id).await.unwrap();
        assert_eq!(fetched.name, "Alice");
    }

    #[tokio::test]
    async fn get_node_by_id_not_found() {
        let dal = InMemoryGraphDal::new();
        assert!(dal.get_node_by_id("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn delete_node_cascades_to_incident_relations() {
        let dal = InMemoryGraphDal::new();
        let a = dal.create_node(node_request(NodeType::Person, "A")).await.unwrap();
        let b = dal.create_node(node_request(NodeType::Person, "B")).await.unwrap();
        let rel = dal
            .create_relation(CreateRelationRequest {
                relation_type: RelationType::Friend,
                source_id: a.id.clone(),
                target_id: b.id.clone(),
                label: None,
                properties: None,
            })
            .await
            .unwrap();

        dal.delete_node(&a.id).await.unwrap();
        assert!(dal.get_relation_by_id(&rel.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn search_nodes_with_empty_criteria_returns_empty() {
        let dal = InMemoryGraphDal::new();
        dal.create_node(node_request(NodeType::Person, "Alice")).await.unwrap();
        let (nodes, total) = dal
            .search_nodes(&HashMap::new(), None, 10, 0)
            .await
            .unwrap();
        assert!(nodes.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn search_nodes_name_is_substring_match() {
        let dal = InMemoryGraphDal::new();
        dal.create_node(node_request(NodeType::Person, "Alice")).await.unwrap();
        dal.create_node(node_request(NodeType::Person, "Alicia")).await.unwrap();
        dal.create_node(node_request(NodeType::Person, "Bob")).await.unwrap();

        let mut criteria = HashMap::new();
        criteria.insert("name".to_string(), "Ali".to_string());
        let (nodes, total) = dal.search_nodes(&criteria, None, 10, 0).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(nodes.len(), 2);
    }

    #[tokio::test]
    async fn get_network_depth_zero_returns_only_start_nodes() {
        let dal = InMemoryGraphDal::new();
        let mut p1 = node_request(NodeType::Person, "p1");
        p1.profession = Some("Engineer".to_string());
        let mut p2 = node_request(NodeType::Person, "p2");
        p2.profession = Some("Engineer".to_string());
        let mut p3 = node_request(NodeType::Person, "p3");
        p3.profession = Some("Manager".to_string());

        let p1 = dal.create_node(p1).await.unwrap();
        let p2 = dal.create_node(p2).await.unwrap();
        let p3 = dal.create_node(p3).await.unwrap();

        dal.create_relation(CreateRelationRequest {
            relation_type: RelationType::Colleague,
            source_id: p1.id.clone(),
            target_id: p2.id.clone(),
            label: None,
            properties: None,
        })
        .await
        .unwrap();
        dal.create_relation(CreateRelationRequest {
            relation_type: RelationType::Colleague,
            source_id: p2.id.clone(),
            target_id: p3.id.clone(),
            label: None,
            properties: None,
        })
        .await
        .unwrap();

        let mut criteria = HashMap::new();
        criteria.insert("profession".to_string(), "Engineer".to_string());

        let (nodes, rels) = dal
            .get_network(&criteria, 0, 100, 0, None, None)
            .await
            .unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(rels.is_empty());

        let (nodes, rels) = dal
            .get_network(
                &criteria,
                1,
                100,
                0,
                Some(&[RelationType::Colleague]),
                Some(&[NodeType::Person]),
            )
            .await
            .unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(rels.len(), 2);
    }

    #[tokio::test]
    async fn get_network_node_types_filter_excludes_start_node_of_wrong_type() {
        let dal = InMemoryGraphDal::new();
        let p1 = dal.create_node(node_request(NodeType::Person, "p1")).await.unwrap();
        let c1 = dal.create_node(node_request(NodeType::Company, "c1")).await.unwrap();
        dal.create_relation(CreateRelationRequest {
            relation_type: RelationType::Colleague,
            source_id: p1.id.clone(),
            target_id: c1.id.clone(),
            label: None,
            properties: None,
        })
        .await
        .unwrap();

        let mut criteria = HashMap::new();
        criteria.insert("name".to_string(), "c1".to_string());

        // c1 matches start_criteria but its label isn't in node_types, so it
        // seeds no valid path and the result is empty rather than {c1}.
        let (nodes, rels) = dal
            .get_network(&criteria, 1, 100, 0, None, Some(&[NodeType::Person]))
            .await
            .unwrap();
        assert!(nodes.is_empty());
        assert!(rels.is_empty());
    }

    #[tokio::test]
    async fn get_path_prefers_shortest_and_respects_type_filter() {
        let dal = InMemoryGraphDal::new();
        let a = dal.create_node(node_request(NodeType::Person, "A")).await.unwrap();
        let b = dal.create_node(node_request(NodeType::Person, "B")).await.unwrap();
        let c = dal.create_node(node_request(NodeType::Person, "C")).await.unwrap();
        let d = dal.create_node(node_request(NodeType::Person, "D")).await.unwrap();

        for (rel_type, src, dst) in [
            (RelationType::Friend, &a, &b),
            (RelationType::Colleague, &b, &c),
            (RelationType::Schoolmate, &c, &d),
            (RelationType::Visited, &a, &c),
        ] {
            dal.create_relation(CreateRelationRequest {
                relation_type: rel_type,
                source_id: src.id.clone(),
                target_id: dst.id.clone(),
                label: None,
                properties: None,
            })
            .await
            .unwrap();
        }

        let (nodes, rels) = dal.get_path(&a.id, &d.id, 3, None).await.unwrap();
        assert_eq!(nodes.iter().map(|n| n.id.clone()).collect::<Vec<_>>(), vec![a.id.clone(), c.id.clone(), d.id.clone()]);
        assert_eq!(rels.len(), 2);

        let types = [RelationType::Friend, RelationType::Colleague, RelationType::Schoolmate];
        let (nodes, rels) = dal.get_path(&a.id, &d.id, 3, Some(&types)).await.unwrap();
        assert_eq!(
            nodes.iter().map(|n| n.id.clone()).collect::<Vec<_>>(),
            vec![a.id.clone(), b.id.clone(), c.id.clone(), d.id.clone()]
        );
        assert_eq!(rels.len(), 3);
    }

    #[tokio::test]
    async fn get_path_not_found_beyond_max_depth() {
        let dal = InMemoryGraphDal::new();
        let a = dal.create_node(node_request(NodeType::Person, "A")).await.unwrap();
        let b = dal.create_node(node_request(NodeType::Person, "B")).await.unwrap();
        assert!(dal.get_path(&a.id, &b.id, 1, None).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn get_node_relations_both_flags_false_is_empty_without_querying() {
        let dal = InMemoryGraphDal::new();
        let a = dal.create_node(node_request(NodeType::Person, "A")).await.unwrap();
        let (rels, total) = dal
            .get_node_relations(&a.id, None, false, false, 10, 0)
            .await
            .unwrap();
        assert!(rels.is_empty());
        assert_eq!(total, 0);
    }
}
