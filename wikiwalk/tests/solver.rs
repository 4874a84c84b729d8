//! Integration tests against an in-memory sqlite fixture, built through the
//! same `sea_orm::Schema::create_table_from_entity` call the teacher's
//! `GraphDB::create_master_db` uses, populated with a small hand-built link
//! graph instead of a real dump.

use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DbBackend, Schema, Set};
use wikiwalk::config::DirectionStrategy;
use wikiwalk::graph_store::schema::{link, page, redirect};
use wikiwalk::{GraphStore, Solver};

/// Builds:
///   A(1) -> B(2) -> D(4)
///   A(1) -> C(3) -> D(4)
///   D(4) -> E(5)
/// and a redirect `Old_Article` -> A(1), so D is reachable from A via two
/// distinct shortest paths and E is reachable from A via only one.
async fn fixture() -> GraphStore {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect in-memory sqlite");

    let schema = Schema::new(DbBackend::Sqlite);
    for stmt in [
        schema.create_table_from_entity(page::Entity),
        schema.create_table_from_entity(redirect::Entity),
        schema.create_table_from_entity(link::Entity),
    ] {
        db.execute(db.get_database_backend().build(&stmt))
            .await
            .expect("create table");
    }

    let pages = [
        (1, "A", false),
        (2, "B", false),
        (3, "C", false),
        (4, "D", false),
        (5, "E", false),
        (6, "Old_Article", true),
    ];
    for (id, title, is_redirect) in pages {
        page::ActiveModel {
            id: Set(id),
            namespace: Set(0),
            title: Set(title.to_owned()),
            is_redirect: Set(is_redirect),
        }
        .insert(&db)
        .await
        .expect("insert page");
    }

    redirect::ActiveModel {
        source_id: Set(6),
        target_id: Set(1),
    }
    .insert(&db)
    .await
    .expect("insert redirect");

    let links = [
        (1, "2|3", "", 2, 0),
        (2, "4", "1", 1, 1),
        (3, "4", "1", 1, 1),
        (4, "5", "2|3", 1, 2),
        (5, "", "4", 0, 1),
        (6, "", "", 0, 0),
    ];
    for (id, outgoing, incoming, out_count, in_count) in links {
        link::ActiveModel {
            id: Set(id),
            outgoing_links: Set(outgoing.to_owned()),
            incoming_links: Set(incoming.to_owned()),
            outgoing_links_count: Set(out_count),
            incoming_links_count: Set(in_count),
        }
        .insert(&db)
        .await
        .expect("insert link row");
    }

    GraphStore::from_connection(db).await
}

#[tokio::test]
async fn resolves_title_to_id_case_insensitively() {
    let store = fixture().await;
    assert_eq!(store.resolve_title("a", 0).await.unwrap(), Some(1));
    assert_eq!(store.resolve_title("A", 0).await.unwrap(), Some(1));
}

#[tokio::test]
async fn resolves_redirect_to_its_target() {
    let store = fixture().await;
    assert_eq!(
        store.resolve_title("Old Article", 0).await.unwrap(),
        Some(1)
    );
}

#[tokio::test]
async fn unknown_title_resolves_to_none() {
    let store = fixture().await;
    assert_eq!(store.resolve_title("Nonexistent", 0).await.unwrap(), None);
}

#[tokio::test]
async fn trivial_path_is_single_page() {
    let store = fixture().await;
    let solver = Solver::new(store, DirectionStrategy::FrontierSize);
    let response = solver.shortest_paths("A", "A").await.unwrap();
    assert_eq!(response.paths, vec![vec!["A".to_owned()]]);
    assert_eq!(response.path_length, 0);
}

#[tokio::test]
async fn finds_both_shortest_paths_in_a_diamond() {
    let store = fixture().await;
    let solver = Solver::new(store, DirectionStrategy::FrontierSize);
    let response = solver.shortest_paths("A", "D").await.unwrap();

    assert_eq!(response.path_length, 2);
    let mut paths = response.paths;
    paths.sort();
    assert_eq!(
        paths,
        vec![
            vec!["A".to_owned(), "B".to_owned(), "D".to_owned()],
            vec!["A".to_owned(), "C".to_owned(), "D".to_owned()],
        ]
    );
}

#[tokio::test]
async fn finds_both_paths_past_the_diamond() {
    let store = fixture().await;
    let solver = Solver::new(store, DirectionStrategy::FrontierSize);
    let response = solver.shortest_paths("A", "E").await.unwrap();
    assert_eq!(response.path_length, 3);
    assert_eq!(response.paths.len(), 2);
}

#[tokio::test]
async fn edge_count_query_strategy_agrees_with_frontier_size() {
    let store = fixture().await;
    let solver = Solver::new(store, DirectionStrategy::EdgeCountQuery);
    let response = solver.shortest_paths("A", "D").await.unwrap();
    assert_eq!(response.path_length, 2);
    assert_eq!(response.paths.len(), 2);
}

#[tokio::test]
async fn repeated_queries_against_the_same_target_reuse_the_cache() {
    let store = fixture().await;
    let solver = Solver::new(store, DirectionStrategy::FrontierSize);
    let first = solver.shortest_paths("A", "D").await.unwrap();
    let second = solver.shortest_paths("B", "D").await.unwrap();
    assert_eq!(first.path_length, 2);
    assert_eq!(second.path_length, 1);
}

#[tokio::test]
async fn no_path_between_disconnected_pages_is_an_error() {
    let store = fixture().await;
    let solver = Solver::new(store, DirectionStrategy::FrontierSize);
    let err = solver.shortest_paths("E", "A").await.unwrap_err();
    assert!(matches!(err, wikiwalk::SolverError::NoPath { .. }));
}

#[tokio::test]
async fn unknown_start_title_is_reported_by_name() {
    let store = fixture().await;
    let solver = Solver::new(store, DirectionStrategy::FrontierSize);
    let err = solver.shortest_paths("Nonexistent", "A").await.unwrap_err();
    assert!(matches!(err, wikiwalk::SolverError::StartPageNotFound(title) if title == "Nonexistent"));
}

#[tokio::test]
async fn unknown_target_title_is_reported_by_name() {
    let store = fixture().await;
    let solver = Solver::new(store, DirectionStrategy::FrontierSize);
    let err = solver.shortest_paths("A", "Nonexistent").await.unwrap_err();
    assert!(matches!(err, wikiwalk::SolverError::TargetPageNotFound(title) if title == "Nonexistent"));
}

#[tokio::test]
async fn start_and_target_resolving_to_the_same_id_is_trivial() {
    let store = fixture().await;
    let solver = Solver::new(store, DirectionStrategy::FrontierSize);
    let response = solver.shortest_paths("Old Article", "A").await.unwrap();
    assert_eq!(response.path_length, 0);
    assert_eq!(response.paths, vec![vec!["A".to_owned()]]);
}
