//! End-to-end cross-component scenarios (S1-S6) exercising
//! [`Repository`] over the in-process reference backends.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use graph_cache_repo::cache::InMemoryByteStore;
use graph_cache_repo::config::RepositoryConfig;
use graph_cache_repo::dal::InMemoryGraphDal;
use graph_cache_repo::models::{
    CreateNodeRequest, CreateRelationRequest, GetNetworkRequest, GetPathRequest, NodeType,
    RelationType, SearchNodesRequest, UpdateNodeRequest,
};
use graph_cache_repo::Repository;
use std::collections::HashMap;

fn repo() -> Repository<InMemoryByteStore, InMemoryGraphDal> {
    Repository::new(
        InMemoryByteStore::new(),
        InMemoryGraphDal::new(),
        RepositoryConfig::default(),
    )
    .expect("admission filter parameters are valid defaults")
}

fn node_request(node_type: NodeType, name: &str) -> CreateNodeRequest {
    CreateNodeRequest {
        node_type: Some(node_type),
        name: name.to_string(),
        avatar: None,
        profession: None,
        properties: None,
    }
}

/// S1 — Entity read-aside. The first read populates the cache; the second
/// read is served from it.
#[tokio::test]
async fn s1_entity_read_aside() {
    let repo = repo();
    let alice = repo
        .create_node(node_request(NodeType::Person, "Alice"))
        .await
        .expect("create node");

    let first = repo.get_node(&alice.id).await.expect("first read");
    assert_eq!(first.name, "Alice");

    let second = repo.get_node(&alice.id).await.expect("second read");
    assert_eq!(second.name, "Alice");
}

/// S2 — Write invalidation. Updating a node invalidates its cache entry so
/// the next read observes the new value.
#[tokio::test]
async fn s2_write_invalidation() {
    let repo = repo();
    let alice = repo
        .create_node(node_request(NodeType::Person, "Alice"))
        .await
        .expect("create node");
    repo.get_node(&alice.id).await.expect("prime cache");

    repo.update_node(UpdateNodeRequest {
        id: alice.id.clone(),
        name: Some("Alicia".to_string()),
        avatar: None,
        profession: None,
        properties: None,
    })
    .await
    .expect("update node");

    let refreshed = repo.get_node(&alice.id).await.expect("post-update read");
    assert_eq!(refreshed.name, "Alicia");
}

/// S3 — Search negative caching. Two consecutive searches for a criterion
/// matching nothing both return an empty, zero-total result.
#[tokio::test]
async fn s3_search_negative_caching() {
    let repo = repo();
    let mut criteria = HashMap::new();
    criteria.insert("name".to_string(), "Unknown".to_string());
    let request = || SearchNodesRequest {
        node_type: None,
        criteria: criteria.clone(),
        limit: None,
        offset: None,
    };

    let (nodes, total) = repo.search_nodes(request()).await.expect("first search");
    assert!(nodes.is_empty());
    assert_eq!(total, 0);

    let (nodes, total) = repo.search_nodes(request()).await.expect("second search");
    assert!(nodes.is_empty());
    assert_eq!(total, 0);
}

/// S4 — Network depth 0 vs depth 1 with relation/node-type filters.
#[tokio::test]
async fn s4_network_depth_zero_vs_one() {
    let repo = repo();
    let engineer = |name: &str| {
        let mut req = node_request(NodeType::Person, name);
        req.profession = Some("Engineer".to_string());
        req
    };
    let p1 = repo.create_node(engineer("p1")).await.expect("p1");
    let p2 = repo.create_node(engineer("p2")).await.expect("p2");
    let mut manager = node_request(NodeType::Person, "p3");
    manager.profession = Some("Manager".to_string());
    let p3 = repo.create_node(manager).await.expect("p3");

    repo.create_relation(CreateRelationRequest {
        relation_type: RelationType::Colleague,
        source_id: p1.id.clone(),
        target_id: p2.id.clone(),
        label: None,
        properties: None,
    })
    .await
    .expect("p1-p2");
    repo.create_relation(CreateRelationRequest {
        relation_type: RelationType::Colleague,
        source_id: p2.id.clone(),
        target_id: p3.id.clone(),
        label: None,
        properties: None,
    })
    .await
    .expect("p2-p3");

    let mut criteria = HashMap::new();
    criteria.insert("profession".to_string(), "Engineer".to_string());

    let (nodes, relations) = repo
        .get_network(GetNetworkRequest {
            start_criteria: criteria.clone(),
            depth: Some(0),
            limit: None,
            offset: None,
            relation_types: None,
            node_types: None,
        })
        .await
        .expect("depth 0");
    assert_eq!(nodes.len(), 2);
    assert!(relations.is_empty());

    let (nodes, relations) = repo
        .get_network(GetNetworkRequest {
            start_criteria: criteria,
            depth: Some(1),
            limit: None,
            offset: None,
            relation_types: Some(vec![RelationType::Colleague]),
            node_types: Some(vec![NodeType::Person]),
        })
        .await
        .expect("depth 1");
    assert_eq!(nodes.len(), 3);
    assert_eq!(relations.len(), 2);
}

/// S5 — Shortest path with and without a relation-type filter.
#[tokio::test]
async fn s5_path_with_type_filter() {
    let repo = repo();
    let a = repo.create_node(node_request(NodeType::Person, "A")).await.unwrap();
    let b = repo.create_node(node_request(NodeType::Person, "B")).await.unwrap();
    let c = repo.create_node(node_request(NodeType::Person, "C")).await.unwrap();
    let d = repo.create_node(node_request(NodeType::Person, "D")).await.unwrap();

    for (rel_type, src, dst) in [
        (RelationType::Friend, &a, &b),
        (RelationType::Colleague, &b, &c),
        (RelationType::Schoolmate, &c, &d),
        (RelationType::Visited, &a, &c),
    ] {
        repo.create_relation(CreateRelationRequest {
            relation_type: rel_type,
            source_id: src.id.clone(),
            target_id: dst.id.clone(),
            label: None,
            properties: None,
        })
        .await
        .expect("create edge");
    }

    let (nodes, relations) = repo
        .get_path(GetPathRequest {
            source_id: a.id.clone(),
            target_id: d.id.clone(),
            max_depth: Some(3),
            relation_types: None,
        })
        .await
        .expect("shortest path");
    assert_eq!(
        nodes.iter().map(|n| n.id.clone()).collect::<Vec<_>>(),
        vec![a.id.clone(), c.id.clone(), d.id.clone()]
    );
    assert_eq!(relations.len(), 2);

    let (nodes, relations) = repo
        .get_path(GetPathRequest {
            source_id: a.id.clone(),
            target_id: d.id.clone(),
            max_depth: Some(3),
            relation_types: Some(vec![
                RelationType::Friend,
                RelationType::Colleague,
                RelationType::Schoolmate,
            ]),
        })
        .await
        .expect("type-filtered path");
    assert_eq!(
        nodes.iter().map(|n| n.id.clone()).collect::<Vec<_>>(),
        vec![a.id.clone(), b.id.clone(), c.id.clone(), d.id.clone()]
    );
    assert_eq!(relations.len(), 3);
}

/// S6 — Rehydration skip on a stale cached network list: deleting a node
/// after the subgraph is cached causes it to be silently skipped on the
/// next read, while the remaining nodes/edges still come back.
#[tokio::test]
async fn s6_rehydration_skip_on_stale_list() {
    let repo = repo();
    let engineer = |name: &str| {
        let mut req = node_request(NodeType::Person, name);
        req.profession = Some("Engineer".to_string());
        req
    };
    let p1 = repo.create_node(engineer("p1")).await.unwrap();
    let p2 = repo.create_node(engineer("p2")).await.unwrap();
    let p3 = repo.create_node(engineer("p3")).await.unwrap();

    repo.create_relation(CreateRelationRequest {
        relation_type: RelationType::Colleague,
        source_id: p1.id.clone(),
        target_id: p2.id.clone(),
        label: None,
        properties: None,
    })
    .await
    .unwrap();
    repo.create_relation(CreateRelationRequest {
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
    let request = || GetNetworkRequest {
        start_criteria: criteria.clone(),
        depth: Some(1),
        limit: None,
        offset: None,
        relation_types: Some(vec![RelationType::Colleague]),
        node_types: Some(vec![NodeType::Person]),
    };

    let (nodes, relations) = repo.get_network(request()).await.expect("prime cache");
    assert_eq!(nodes.len(), 3);
    assert_eq!(relations.len(), 2);

    repo.delete_node(&p3.id).await.expect("delete p3");

    let (nodes, relations) = repo.get_network(request()).await.expect("stale read");
    assert_eq!(nodes.len(), 2);
    assert!(
        relations
            .iter()
            .all(|r| r.source_id != p3.id && r.target_id != p3.id)
    );
}
